//! Runtime field values.
//!
//! Values are produced by coercion, merged during inheritance
//! resolution, and carried by the finished prototypes. Prototype
//! references stay as identifier tokens ([`PrototypeHandle`] with no
//! target) until the reference-resolution pass fills in an index into
//! the session's output set.

use crate::registry::{ContainerShape, ScalarValue, TypeId};
use indexmap::IndexMap;

/// Policy for merging a child's collection field with the inherited
/// one. `Combine` (the default) appends child items after parent items;
/// `Replace` discards the parent items entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionAction {
    #[default]
    Combine,
    Replace,
}

/// A prototype-reference slot: the raw identifier plus, after the
/// resolution pass, an index into the session's output set. The index
/// is a weak back-reference, never ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrototypeHandle {
    pub identifier: String,
    pub target: Option<usize>,
}

impl PrototypeHandle {
    pub fn unresolved(identifier: impl Into<String>) -> Self {
        PrototypeHandle {
            identifier: identifier.into(),
            target: None,
        }
    }
}

/// An ordered collection of item values.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionValue {
    pub shape: ContainerShape,
    pub items: Vec<Value>,
}

impl CollectionValue {
    /// Drop later duplicates, keeping first occurrences in order. Used
    /// for set-shaped collections after coercion and after merge.
    pub fn dedup(&mut self) {
        let mut kept: Vec<Value> = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if !kept.contains(&item) {
                kept.push(item);
            }
        }
        self.items = kept;
    }
}

/// A coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Enum { ty: TypeId, literal: String },
    Struct { ty: TypeId, members: IndexMap<String, Value> },
    Object { ty: TypeId, members: IndexMap<String, Value> },
    TypeRef(TypeId),
    Prototype(PrototypeHandle),
    External { ty: TypeId, value: ScalarValue },
    Collection(CollectionValue),
}

impl Value {
    /// Human-readable kind name for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::Text(_) => "Text",
            Value::Enum { .. } => "Enum",
            Value::Struct { .. } => "Struct",
            Value::Object { .. } => "Object",
            Value::TypeRef(_) => "TypeRef",
            Value::Prototype(_) => "PrototypeRef",
            Value::External { .. } => "External",
            Value::Collection(_) => "Collection",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let mut c = CollectionValue {
            shape: ContainerShape::Set,
            items: vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(1),
                Value::Int(3),
                Value::Int(2),
            ],
        };
        c.dedup();
        assert_eq!(c.items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }
}
