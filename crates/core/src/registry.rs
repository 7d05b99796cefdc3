//! Type registry: textual type names to constructible type descriptors.
//!
//! The registry is populated once during setup and read-only afterwards,
//! so it can be shared (`Arc`) across independent sessions. Lookups are
//! case-sensitive and scoped: an exact scope-qualified match wins, then
//! the configured default scope, then the global (empty) scope.

use crate::error::SetupError;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Stable handle into the registry's descriptor table.
pub type TypeId = usize;

/// Pluggable parse function for opaque external scalar kinds (vectors,
/// colors, ...). The engine never interprets these formats itself.
pub type ScalarParseFn = fn(&str) -> Option<ScalarValue>;

/// Value produced by a [`ScalarParseFn`]. Opaque to the engine beyond
/// equality and cloning.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

/// Container shape of a collection member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerShape {
    Array,
    List,
    Set,
}

/// The value kind of a member, fixed at registration time.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Text,
    /// Literal of the referenced enum type.
    Enum(TypeId),
    /// Value aggregate of the referenced object type, no polymorphism.
    Struct(TypeId),
    /// Polymorphic object; a type tag on the node may select any
    /// registered subtype of the referenced type.
    Object(TypeId),
    /// A handle to a registered type, not a value of that type.
    TypeRef,
    /// An identifier naming another prototype, resolved after merging.
    PrototypeRef,
    /// Opaque external scalar parsed by a registered [`ScalarParseFn`].
    External(TypeId),
    Collection {
        element: Box<ValueKind>,
        shape: ContainerShape,
    },
}

/// A named, typed member of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDescriptor {
    pub name: String,
    pub kind: ValueKind,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        MemberDescriptor {
            name: name.into(),
            kind,
        }
    }
}

/// What a registered type is.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Object {
        base: Option<TypeId>,
        /// Abstract in the host-type sense: usable as a base and as a
        /// declared member type, never instantiated directly.
        abstract_: bool,
        members: Vec<MemberDescriptor>,
    },
    Enum {
        literals: Vec<String>,
    },
    /// External scalar; `parser` names the registered parse function.
    Scalar {
        parser: String,
    },
}

/// A registered target type: canonical name, scope, and kind.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub scope: String,
    pub kind: TypeKind,
}

impl TypeDescriptor {
    pub fn object(
        name: impl Into<String>,
        scope: impl Into<String>,
        base: Option<TypeId>,
        members: Vec<MemberDescriptor>,
    ) -> Self {
        TypeDescriptor {
            name: name.into(),
            scope: scope.into(),
            kind: TypeKind::Object {
                base,
                abstract_: false,
                members,
            },
        }
    }

    pub fn enumeration(
        name: impl Into<String>,
        scope: impl Into<String>,
        literals: Vec<&str>,
    ) -> Self {
        TypeDescriptor {
            name: name.into(),
            scope: scope.into(),
            kind: TypeKind::Enum {
                literals: literals.into_iter().map(str::to_owned).collect(),
            },
        }
    }

    pub fn external(
        name: impl Into<String>,
        scope: impl Into<String>,
        parser: impl Into<String>,
    ) -> Self {
        TypeDescriptor {
            name: name.into(),
            scope: scope.into(),
            kind: TypeKind::Scalar {
                parser: parser.into(),
            },
        }
    }

    /// Mark an object type as abstract in the host-type sense.
    pub fn abstract_type(mut self) -> Self {
        if let TypeKind::Object { abstract_, .. } = &mut self.kind {
            *abstract_ = true;
        }
        self
    }
}

// ──────────────────────────────────────────────
// Registry
// ──────────────────────────────────────────────

pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_name: HashMap<(String, String), TypeId>,
    parsers: HashMap<String, ScalarParseFn>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            types: Vec::new(),
            by_name: HashMap::new(),
            parsers: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Install a named parse function for external scalar kinds. Must
    /// happen before registering object types whose members use them.
    pub fn register_scalar_parser(&mut self, name: impl Into<String>, f: ScalarParseFn) {
        self.parsers.insert(name.into(), f);
    }

    /// Register a type under its scope. Duplicate names within a scope,
    /// dangling base ids, and members referencing external scalars with
    /// no installed parser are all setup errors, reported here rather
    /// than at parse time.
    pub fn register(&mut self, desc: TypeDescriptor) -> Result<TypeId, SetupError> {
        let key = (desc.scope.clone(), desc.name.clone());
        if self.by_name.contains_key(&key) {
            return Err(SetupError::DuplicateType {
                scope: desc.scope,
                name: desc.name,
            });
        }
        if let TypeKind::Object { base, members, .. } = &desc.kind {
            if let Some(b) = base {
                if *b >= self.types.len() {
                    return Err(SetupError::UnknownTypeId(*b));
                }
            }
            for m in members {
                self.check_member_kind(&desc.name, &m.name, &m.kind)?;
            }
        }
        let id = self.types.len();
        self.by_name.insert(key, id);
        self.types.push(desc);
        Ok(id)
    }

    fn check_member_kind(&self, ty: &str, member: &str, kind: &ValueKind) -> Result<(), SetupError> {
        match kind {
            ValueKind::Enum(t) | ValueKind::Struct(t) | ValueKind::Object(t) => {
                if *t >= self.types.len() {
                    return Err(SetupError::UnknownTypeId(*t));
                }
                Ok(())
            }
            ValueKind::External(t) => {
                let target = self
                    .types
                    .get(*t)
                    .ok_or(SetupError::UnknownTypeId(*t))?;
                match &target.kind {
                    TypeKind::Scalar { parser } if self.parsers.contains_key(parser) => Ok(()),
                    TypeKind::Scalar { parser } => Err(SetupError::MissingScalarParser {
                        ty: ty.to_owned(),
                        member: member.to_owned(),
                        kind: parser.clone(),
                    }),
                    _ => Err(SetupError::BadMemberTarget {
                        ty: ty.to_owned(),
                        member: member.to_owned(),
                        target: *t,
                        expected: "external scalar",
                    }),
                }
            }
            ValueKind::Collection { element, .. } => self.check_member_kind(ty, member, element),
            _ => Ok(()),
        }
    }

    /// Resolve a textual type name. A dotted name (`Scope.Name`) is an
    /// exact qualified lookup; otherwise `scope_hint` is preferred, then
    /// `default_scope`, then the global (empty) scope.
    pub fn resolve(
        &self,
        name: &str,
        scope_hint: Option<&str>,
        default_scope: &str,
    ) -> Option<TypeId> {
        if let Some((scope, bare)) = name.rsplit_once('.') {
            return self
                .by_name
                .get(&(scope.to_owned(), bare.to_owned()))
                .copied();
        }
        if let Some(hint) = scope_hint {
            if let Some(id) = self.by_name.get(&(hint.to_owned(), name.to_owned())) {
                return Some(*id);
            }
        }
        if let Some(id) = self
            .by_name
            .get(&(default_scope.to_owned(), name.to_owned()))
        {
            return Some(*id);
        }
        self.by_name.get(&(String::new(), name.to_owned())).copied()
    }

    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id]
    }

    /// Qualified name for messages.
    pub fn name_of(&self, id: TypeId) -> String {
        let d = &self.types[id];
        if d.scope.is_empty() {
            d.name.clone()
        } else {
            format!("{}.{}", d.scope, d.name)
        }
    }

    pub fn is_abstract(&self, id: TypeId) -> bool {
        matches!(self.types[id].kind, TypeKind::Object { abstract_: true, .. })
    }

    pub fn enum_literals(&self, id: TypeId) -> Option<&[String]> {
        match &self.types[id].kind {
            TypeKind::Enum { literals } => Some(literals),
            _ => None,
        }
    }

    pub fn scalar_parser(&self, id: TypeId) -> Option<ScalarParseFn> {
        match &self.types[id].kind {
            TypeKind::Scalar { parser } => self.parsers.get(parser).copied(),
            _ => None,
        }
    }

    /// Ordered member descriptors including those inherited from the
    /// base chain, deduplicated by name (the most-derived wins, at the
    /// position the base first declared it).
    pub fn members_of(&self, id: TypeId) -> Vec<MemberDescriptor> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(t) = cursor {
            chain.push(t);
            cursor = match &self.types[t].kind {
                TypeKind::Object { base, .. } => *base,
                _ => None,
            };
        }
        let mut out: IndexMap<String, MemberDescriptor> = IndexMap::new();
        for t in chain.into_iter().rev() {
            if let TypeKind::Object { members, .. } = &self.types[t].kind {
                for m in members {
                    out.insert(m.name.clone(), m.clone());
                }
            }
        }
        out.into_values().collect()
    }

    /// Member lookup by name, searching the base chain derived-first.
    pub fn member(&self, id: TypeId, name: &str) -> Option<MemberDescriptor> {
        let mut cursor = Some(id);
        while let Some(t) = cursor {
            match &self.types[t].kind {
                TypeKind::Object { base, members, .. } => {
                    if let Some(m) = members.iter().find(|m| m.name == name) {
                        return Some(m.clone());
                    }
                    cursor = *base;
                }
                _ => return None,
            }
        }
        None
    }

    /// True when `a` is `b` or transitively derives from it.
    pub fn is_subtype_of(&self, a: TypeId, b: TypeId) -> bool {
        let mut cursor = Some(a);
        while let Some(t) = cursor {
            if t == b {
                return true;
            }
            cursor = match &self.types[t].kind {
                TypeKind::Object { base, .. } => *base,
                _ => None,
            };
        }
        false
    }
}
