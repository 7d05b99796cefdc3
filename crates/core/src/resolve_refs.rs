//! Prototype-reference resolution.
//!
//! Runs strictly after all merging completes, so forward references --
//! within one document, across documents, and across `add_root` calls
//! in the same session -- all resolve the same way. Targets are indices
//! into the output set, never owning pointers; abstract prototypes are
//! not in the output set and therefore not valid targets.

use crate::error::{Diagnostic, DiagnosticKind};
use crate::merge::{visit_handles, ResolvedPrototype};
use std::collections::HashMap;

/// Fill in the target index of every prototype handle reachable from
/// any field, recursively through structs, objects, and collections.
/// Unknown identifiers are reported and the handle stays unresolved.
pub fn resolve_references(output: &mut [ResolvedPrototype], diags: &mut Vec<Diagnostic>) {
    let index: HashMap<String, usize> = output
        .iter()
        .enumerate()
        .map(|(i, p)| (p.identifier.clone(), i))
        .collect();

    for i in 0..output.len() {
        let identifier = output[i].identifier.clone();
        let prov = output[i].prov.clone();
        let mut missing: Vec<(String, String)> = Vec::new();
        for (field, value) in output[i].fields.iter_mut() {
            visit_handles(value, &mut |handle| match index.get(&handle.identifier) {
                Some(&target) => handle.target = Some(target),
                None => missing.push((field.clone(), handle.identifier.clone())),
            });
        }
        for (field, target) in missing {
            diags.push(Diagnostic::new(
                DiagnosticKind::UnresolvedReference,
                Some(&identifier),
                Some(&field),
                &prov.file,
                prov.line,
                format!("no prototype named '{}'", target),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Provenance;
    use crate::registry::ContainerShape;
    use crate::value::{CollectionValue, PrototypeHandle, Value};
    use indexmap::IndexMap;

    fn proto(id: &str, fields: Vec<(&str, Value)>) -> ResolvedPrototype {
        ResolvedPrototype {
            identifier: id.to_owned(),
            type_id: 0,
            fields: fields
                .into_iter()
                .map(|(n, v)| (n.to_owned(), v))
                .collect::<IndexMap<_, _>>(),
            prov: Provenance {
                file: "test.xml".into(),
                line: 1,
            },
        }
    }

    fn reference(id: &str) -> Value {
        Value::Prototype(PrototypeHandle::unresolved(id))
    }

    #[test]
    fn forward_and_backward_references_resolve_identically() {
        let mut out = vec![
            proto("First", vec![("other", reference("Second"))]),
            proto("Second", vec![("other", reference("First"))]),
        ];
        let mut diags = Vec::new();
        resolve_references(&mut out, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(out[0].prototype_target("other"), Some(1));
        assert_eq!(out[1].prototype_target("other"), Some(0));
    }

    #[test]
    fn self_reference_resolves() {
        let mut out = vec![proto("Loop", vec![("me", reference("Loop"))])];
        let mut diags = Vec::new();
        resolve_references(&mut out, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(out[0].prototype_target("me"), Some(0));
    }

    #[test]
    fn unresolved_reference_reports_and_leaves_the_field_absent() {
        let mut out = vec![proto("A", vec![("other", reference("Nope"))])];
        let mut diags = Vec::new();
        resolve_references(&mut out, &mut diags);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnresolvedReference);
        assert_eq!(diags[0].prototype.as_deref(), Some("A"));
        assert_eq!(diags[0].field.as_deref(), Some("other"));
        assert_eq!(out[0].prototype_target("other"), None);
    }

    #[test]
    fn references_nested_in_collections_resolve() {
        let mut out = vec![
            proto(
                "A",
                vec![(
                    "refs",
                    Value::Collection(CollectionValue {
                        shape: ContainerShape::Array,
                        items: vec![reference("B"), reference("A")],
                    }),
                )],
            ),
            proto("B", vec![]),
        ];
        let mut diags = Vec::new();
        resolve_references(&mut out, &mut diags);
        assert!(diags.is_empty());
        match out[0].get("refs").unwrap() {
            Value::Collection(c) => {
                match (&c.items[0], &c.items[1]) {
                    (Value::Prototype(b), Value::Prototype(a)) => {
                        assert_eq!(b.target, Some(1));
                        assert_eq!(a.target, Some(0));
                    }
                    other => panic!("expected prototype items, got {:?}", other),
                }
            }
            other => panic!("expected Collection, got {:?}", other),
        }
    }
}
