//! Value coercion: document nodes to typed field values.
//!
//! Coercion dispatches on the member's declared [`ValueKind`]. A failed
//! coercion reports a diagnostic and yields `None` -- the field stays
//! unset so that inheritance can still supply a value.

use crate::document::DocumentNode;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::registry::{ContainerShape, TypeRegistry, ValueKind};
use crate::value::{CollectionValue, PrototypeHandle, Value};
use indexmap::IndexMap;

/// Attribute naming a polymorphic subtype on object nodes and items.
pub(crate) const ATTR_TYPE: &str = "Type";
/// Node name of collection items.
pub(crate) const ITEM_NODE: &str = "li";

/// Shared context threaded through a coercion run.
pub struct CoerceCtx<'a> {
    pub registry: &'a TypeRegistry,
    pub default_scope: &'a str,
    pub file: &'a str,
    pub prototype: &'a str,
    pub diags: &'a mut Vec<Diagnostic>,
}

impl CoerceCtx<'_> {
    pub(crate) fn report(
        &mut self,
        kind: DiagnosticKind,
        field: &str,
        line: u32,
        message: impl Into<String>,
    ) {
        self.diags.push(Diagnostic::new(
            kind,
            Some(self.prototype),
            Some(field),
            self.file,
            line,
            message,
        ));
    }
}

/// Coerce `node` into a value of `kind`. `field` names the member for
/// diagnostics only.
pub fn coerce(
    ctx: &mut CoerceCtx,
    field: &str,
    kind: &ValueKind,
    node: &DocumentNode,
) -> Option<Value> {
    match kind {
        ValueKind::Int => match node.text.trim().parse::<i64>() {
            Ok(v) => Some(Value::Int(v)),
            Err(_) => {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    field,
                    node.line,
                    format!("expected an integer, got '{}'", node.text.trim()),
                );
                None
            }
        },
        ValueKind::Float => match node.text.trim().parse::<f64>() {
            Ok(v) => Some(Value::Float(v)),
            Err(_) => {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    field,
                    node.line,
                    format!("expected a number, got '{}'", node.text.trim()),
                );
                None
            }
        },
        ValueKind::Bool => {
            let text = node.text.trim();
            if text.eq_ignore_ascii_case("true") {
                Some(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Some(Value::Bool(false))
            } else {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    field,
                    node.line,
                    format!("expected true or false, got '{}'", text),
                );
                None
            }
        }
        ValueKind::Text => Some(Value::Text(node.text.clone())),
        ValueKind::Enum(ty) => {
            let text = node.text.trim();
            let literals = ctx.registry.enum_literals(*ty).unwrap_or(&[]);
            if literals.iter().any(|l| l == text) {
                Some(Value::Enum {
                    ty: *ty,
                    literal: text.to_owned(),
                })
            } else {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    field,
                    node.line,
                    format!(
                        "'{}' is not a literal of enum {}",
                        text,
                        ctx.registry.name_of(*ty)
                    ),
                );
                None
            }
        }
        ValueKind::Struct(ty) => Some(Value::Struct {
            ty: *ty,
            members: coerce_members(ctx, *ty, node),
        }),
        ValueKind::Object(declared) => {
            let concrete = match node.attribute(ATTR_TYPE) {
                Some(tag) => {
                    match ctx.registry.resolve(tag, None, ctx.default_scope) {
                        Some(t) if ctx.registry.is_subtype_of(t, *declared) => t,
                        Some(t) => {
                            ctx.report(
                                DiagnosticKind::ValueFormat,
                                field,
                                node.line,
                                format!(
                                    "type '{}' is not a subtype of {}",
                                    ctx.registry.name_of(t),
                                    ctx.registry.name_of(*declared)
                                ),
                            );
                            return None;
                        }
                        None => {
                            ctx.report(
                                DiagnosticKind::UnknownType,
                                field,
                                node.line,
                                format!("unknown type '{}'", tag),
                            );
                            *declared
                        }
                    }
                }
                None => *declared,
            };
            if ctx.registry.is_abstract(concrete) {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    field,
                    node.line,
                    format!(
                        "cannot instantiate abstract type {}",
                        ctx.registry.name_of(concrete)
                    ),
                );
                return None;
            }
            Some(Value::Object {
                ty: concrete,
                members: coerce_members(ctx, concrete, node),
            })
        }
        ValueKind::TypeRef => {
            let text = node.text.trim();
            match ctx.registry.resolve(text, None, ctx.default_scope) {
                Some(t) => Some(Value::TypeRef(t)),
                None => {
                    ctx.report(
                        DiagnosticKind::UnknownType,
                        field,
                        node.line,
                        format!("unknown type '{}'", text),
                    );
                    None
                }
            }
        }
        ValueKind::PrototypeRef => {
            let text = node.text.trim();
            if text.is_empty() {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    field,
                    node.line,
                    "empty prototype reference",
                );
                return None;
            }
            // No lookup yet: the target may not be declared until a
            // later document in the same session.
            Some(Value::Prototype(PrototypeHandle::unresolved(text)))
        }
        ValueKind::External(ty) => {
            // Parser presence is checked at registration; a miss here
            // means the kind was built outside the registry.
            let Some(parser) = ctx.registry.scalar_parser(*ty) else {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    field,
                    node.line,
                    format!("no parser registered for {}", ctx.registry.name_of(*ty)),
                );
                return None;
            };
            let text = node.text.trim();
            match parser(text) {
                Some(value) => Some(Value::External { ty: *ty, value }),
                None => {
                    ctx.report(
                        DiagnosticKind::ValueFormat,
                        field,
                        node.line,
                        format!(
                            "'{}' is not a valid {}",
                            text,
                            ctx.registry.name_of(*ty)
                        ),
                    );
                    None
                }
            }
        }
        ValueKind::Collection { element, shape } => {
            let mut items = Vec::new();
            for item in &node.children {
                if item.name != ITEM_NODE {
                    ctx.report(
                        DiagnosticKind::ValueFormat,
                        field,
                        item.line,
                        format!("expected '{}' item node, got '{}'", ITEM_NODE, item.name),
                    );
                    continue;
                }
                if let Some(v) = coerce(ctx, field, element, item) {
                    items.push(v);
                }
            }
            let mut collection = CollectionValue {
                shape: *shape,
                items,
            };
            if *shape == ContainerShape::Set {
                collection.dedup();
            }
            Some(Value::Collection(collection))
        }
    }
}

/// Coerce the declared members of `ty` from `node`'s children, matched
/// by name in document order. Members with no matching child stay
/// absent; child nodes matching no member are reported.
fn coerce_members(
    ctx: &mut CoerceCtx,
    ty: crate::registry::TypeId,
    node: &DocumentNode,
) -> IndexMap<String, Value> {
    let mut members = IndexMap::new();
    for child in &node.children {
        match ctx.registry.member(ty, &child.name) {
            Some(m) => {
                if let Some(v) = coerce(ctx, &child.name, &m.kind, child) {
                    members.insert(child.name.clone(), v);
                }
            }
            None => {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    &child.name,
                    child.line,
                    format!(
                        "{} has no member named '{}'",
                        ctx.registry.name_of(ty),
                        child.name
                    ),
                );
            }
        }
    }
    members
}
