//! Inheritance resolution and field merge.
//!
//! Records resolve lazily and memoized: resolving a record first
//! resolves its parent, then lays the record's own fields over the
//! parent's merged set. The walk uses in-progress/done/failed marking
//! so a malformed inheritance graph can neither loop nor overflow the
//! stack on the memoized path.

use crate::document::Provenance;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::registry::{ContainerShape, TypeId, TypeRegistry};
use crate::scan::{PrototypeRecord, RawField};
use crate::value::{CollectionAction, PrototypeHandle, Value};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A finished, fully-merged, typed prototype. Abstract records never
/// produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrototype {
    pub identifier: String,
    pub type_id: TypeId,
    pub fields: IndexMap<String, Value>,
    pub prov: Provenance,
}

impl ResolvedPrototype {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_float(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, field: &str) -> Option<&str> {
        match self.get(field)? {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_items(&self, field: &str) -> Option<&[Value]> {
        match self.get(field)? {
            Value::Collection(c) => Some(&c.items),
            _ => None,
        }
    }

    /// Index of the referenced prototype in the session output, once
    /// the reference pass has run. `None` for absent or unresolved
    /// reference fields.
    pub fn prototype_target(&self, field: &str) -> Option<usize> {
        match self.get(field)? {
            Value::Prototype(h) => h.target,
            _ => None,
        }
    }
}

enum Mark {
    InProgress,
    Done,
    Failed,
}

/// Result of a single recursive resolution step. `Cycle` carries the
/// identifier at which the cycle closes, so unwinding knows when the
/// whole cycle has been marked.
enum Res {
    Done,
    Failed,
    Cycle(String),
}

/// Merge every record of the session and instantiate the non-abstract
/// ones, in declaration order.
pub fn merge_session(
    records: &IndexMap<String, PrototypeRecord>,
    registry: &TypeRegistry,
    diags: &mut Vec<Diagnostic>,
) -> Vec<ResolvedPrototype> {
    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut merged: HashMap<String, IndexMap<String, RawField>> = HashMap::new();

    for id in records.keys() {
        resolve_record(id, records, &mut marks, &mut merged, diags);
    }

    let mut out = Vec::new();
    for (id, record) in records {
        if record.abstract_ {
            continue;
        }
        if !matches!(marks.get(id), Some(Mark::Done)) {
            continue;
        }
        if registry.is_abstract(record.type_id) {
            diags.push(Diagnostic::new(
                DiagnosticKind::Structural,
                Some(id),
                None,
                &record.prov.file,
                record.prov.line,
                format!(
                    "cannot instantiate abstract type {}",
                    registry.name_of(record.type_id)
                ),
            ));
            continue;
        }
        let fields = merged[id]
            .iter()
            .map(|(name, f)| (name.clone(), f.value.clone()))
            .collect();
        out.push(ResolvedPrototype {
            identifier: id.clone(),
            type_id: record.type_id,
            fields,
            prov: record.prov.clone(),
        });
    }
    out
}

fn resolve_record(
    id: &str,
    records: &IndexMap<String, PrototypeRecord>,
    marks: &mut HashMap<String, Mark>,
    merged: &mut HashMap<String, IndexMap<String, RawField>>,
    diags: &mut Vec<Diagnostic>,
) -> Res {
    match marks.get(id) {
        Some(Mark::Done) => return Res::Done,
        Some(Mark::Failed) => return Res::Failed,
        Some(Mark::InProgress) => return Res::Cycle(id.to_owned()),
        None => {}
    }
    marks.insert(id.to_owned(), Mark::InProgress);
    let record = &records[id];

    let mut fields: IndexMap<String, RawField> = match &record.parent {
        None => IndexMap::new(),
        Some(parent) => {
            if !records.contains_key(parent) {
                diags.push(Diagnostic::new(
                    DiagnosticKind::Structural,
                    Some(id),
                    None,
                    &record.prov.file,
                    record.prov.line,
                    format!("unknown parent prototype '{}'", parent),
                ));
                marks.insert(id.to_owned(), Mark::Failed);
                return Res::Failed;
            }
            match resolve_record(parent, records, marks, merged, diags) {
                Res::Done => merged[parent].clone(),
                Res::Failed => {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Structural,
                        Some(id),
                        None,
                        &record.prov.file,
                        record.prov.line,
                        format!("parent prototype '{}' could not be resolved", parent),
                    ));
                    marks.insert(id.to_owned(), Mark::Failed);
                    return Res::Failed;
                }
                Res::Cycle(at) => {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::InheritanceCycle,
                        Some(id),
                        None,
                        &record.prov.file,
                        record.prov.line,
                        format!("prototype '{}' is part of an inheritance cycle", id),
                    ));
                    marks.insert(id.to_owned(), Mark::Failed);
                    if at == id {
                        return Res::Failed;
                    }
                    return Res::Cycle(at);
                }
            }
        }
    };

    for (name, field) in &record.fields {
        merge_field(&mut fields, name, field);
    }
    merged.insert(id.to_owned(), fields);
    marks.insert(id.to_owned(), Mark::Done);
    Res::Done
}

/// Lay one declared field over the inherited set. Scalar, struct,
/// object, and reference kinds replace wholesale; collections follow
/// the declared merge action.
fn merge_field(fields: &mut IndexMap<String, RawField>, name: &str, child: &RawField) {
    if child.action == CollectionAction::Combine {
        if let (Value::Collection(child_c), Some(parent_field)) =
            (&child.value, fields.get_mut(name))
        {
            if let Value::Collection(parent_c) = &parent_field.value {
                let mut combined = parent_c.clone();
                combined.shape = child_c.shape;
                combined.items.extend(child_c.items.iter().cloned());
                if combined.shape == ContainerShape::Set {
                    combined.dedup();
                }
                parent_field.value = Value::Collection(combined);
                parent_field.action = child.action;
                return;
            }
        }
    }
    fields.insert(name.to_owned(), child.clone());
}

/// Walk a merged value tree and apply `f` to every prototype handle.
/// Used by the reference-resolution pass.
pub(crate) fn visit_handles<F: FnMut(&mut PrototypeHandle)>(value: &mut Value, f: &mut F) {
    match value {
        Value::Prototype(h) => f(h),
        Value::Struct { members, .. } | Value::Object { members, .. } => {
            for (_, m) in members.iter_mut() {
                visit_handles(m, f);
            }
        }
        Value::Collection(c) => {
            for item in &mut c.items {
                visit_handles(item, f);
            }
        }
        _ => {}
    }
}
