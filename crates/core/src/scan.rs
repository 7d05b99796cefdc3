//! Declaration scan: one [`PrototypeRecord`] per declaration node.
//!
//! A single top-down pass over a container document. Nothing is merged
//! here; fields are coerced eagerly but inheritance and references are
//! left for later passes.

use crate::coerce::{self, CoerceCtx, ATTR_TYPE};
use crate::document::{DocumentNode, Provenance};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::registry::{TypeId, TypeRegistry, ValueKind};
use crate::session::SessionConfig;
use crate::value::{CollectionAction, Value};
use indexmap::IndexMap;

/// Node name of a prototype declaration inside the container.
const DECL_NODE: &str = "Prototype";
/// Required identifier attribute.
const ATTR_ID: &str = "Id";
/// Explicit inheritance link attribute.
const ATTR_INHERITS: &str = "Inherits";
/// Marks a declaration as inheritance-only.
const ATTR_ABSTRACT: &str = "Abstract";
/// Collection merge directive attribute on collection field nodes.
const ATTR_COLLECTION_ACTION: &str = "CollectionAction";

/// A declared field value plus its collection merge directive (only
/// meaningful for collection kinds; `Combine` otherwise).
#[derive(Debug, Clone)]
pub struct RawField {
    pub value: Value,
    pub action: CollectionAction,
}

/// One prototype declaration, scanned but not yet merged.
#[derive(Debug, Clone)]
pub struct PrototypeRecord {
    pub identifier: String,
    pub parent: Option<String>,
    pub abstract_: bool,
    pub type_id: TypeId,
    pub fields: IndexMap<String, RawField>,
    pub prov: Provenance,
}

/// Scan one container document into `records`, reporting into `diags`.
/// Duplicate identifiers against the already-accumulated session are
/// dropped here; the first declaration wins.
pub fn scan_document(
    root: &DocumentNode,
    origin: &str,
    config: &SessionConfig,
    registry: &TypeRegistry,
    records: &mut IndexMap<String, PrototypeRecord>,
    diags: &mut Vec<Diagnostic>,
) {
    let root_type_name = root
        .attribute(ATTR_TYPE)
        .map(str::to_owned)
        .or_else(|| config.default_root_type.clone());
    let root_type = match root_type_name {
        Some(name) => match registry.resolve(&name, None, &config.default_scope) {
            Some(t) => t,
            None => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::UnknownType,
                    None,
                    None,
                    origin,
                    root.line,
                    format!("container root type '{}' is not registered", name),
                ));
                return;
            }
        },
        None => {
            diags.push(Diagnostic::structural(
                origin,
                root.line,
                "container declares no root type and no default is configured",
            ));
            return;
        }
    };
    let implicit_parent = root.attribute(&config.implicit_parent_attribute);

    for decl in &root.children {
        if decl.name != DECL_NODE {
            diags.push(Diagnostic::structural(
                origin,
                decl.line,
                format!("expected a '{}' declaration, got '{}'", DECL_NODE, decl.name),
            ));
            continue;
        }
        scan_declaration(
            decl,
            origin,
            config,
            registry,
            root_type,
            implicit_parent,
            records,
            diags,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn scan_declaration(
    decl: &DocumentNode,
    origin: &str,
    config: &SessionConfig,
    registry: &TypeRegistry,
    root_type: TypeId,
    implicit_parent: Option<&str>,
    records: &mut IndexMap<String, PrototypeRecord>,
    diags: &mut Vec<Diagnostic>,
) {
    let identifier = match decl.attribute(ATTR_ID) {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => {
            diags.push(Diagnostic::structural(
                origin,
                decl.line,
                format!("declaration is missing a non-empty '{}' attribute", ATTR_ID),
            ));
            return;
        }
    };
    if let Some(first) = records.get(&identifier) {
        diags.push(Diagnostic::new(
            DiagnosticKind::DuplicateIdentifier,
            Some(&identifier),
            None,
            origin,
            decl.line,
            format!(
                "duplicate prototype id '{}': first declared at {}:{}",
                identifier, first.prov.file, first.prov.line
            ),
        ));
        return;
    }

    // Unknown declared types fall back to the container's root type so
    // the prototype is still emitted with whatever fields coerce.
    let type_id = match decl.attribute(ATTR_TYPE) {
        Some(name) => match registry.resolve(name, None, &config.default_scope) {
            Some(t) => t,
            None => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::UnknownType,
                    Some(&identifier),
                    None,
                    origin,
                    decl.line,
                    format!("unknown prototype type '{}'", name),
                ));
                root_type
            }
        },
        None => root_type,
    };

    // Explicit Inherits wins over the container-level default parent. A
    // declaration naming itself as the implicit default stays parentless.
    let parent = decl
        .attribute(ATTR_INHERITS)
        .or(implicit_parent)
        .filter(|p| *p != identifier)
        .map(str::to_owned);

    let abstract_ = decl
        .attribute(ATTR_ABSTRACT)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let mut fields = IndexMap::new();
    let mut ctx = CoerceCtx {
        registry,
        default_scope: &config.default_scope,
        file: origin,
        prototype: &identifier,
        diags,
    };
    for node in &decl.children {
        let member = match registry.member(type_id, &node.name) {
            Some(m) => m,
            None => {
                ctx.report(
                    DiagnosticKind::ValueFormat,
                    &node.name,
                    node.line,
                    format!(
                        "{} has no member named '{}'",
                        registry.name_of(type_id),
                        node.name
                    ),
                );
                continue;
            }
        };
        let action = collection_action(&mut ctx, &member.kind, node);
        if let Some(value) = coerce::coerce(&mut ctx, &node.name, &member.kind, node) {
            fields.insert(node.name.clone(), RawField { value, action });
        }
    }

    records.insert(
        identifier.clone(),
        PrototypeRecord {
            identifier,
            parent,
            abstract_,
            type_id,
            fields,
            prov: Provenance {
                file: origin.to_owned(),
                line: decl.line,
            },
        },
    );
}

fn collection_action(
    ctx: &mut CoerceCtx,
    kind: &ValueKind,
    node: &DocumentNode,
) -> CollectionAction {
    if !matches!(kind, ValueKind::Collection { .. }) {
        return CollectionAction::Combine;
    }
    match node.attribute(ATTR_COLLECTION_ACTION) {
        None | Some("Combine") => CollectionAction::Combine,
        Some("Replace") => CollectionAction::Replace,
        Some(other) => {
            ctx.report(
                DiagnosticKind::ValueFormat,
                &node.name,
                node.line,
                format!(
                    "unknown {} '{}', expected Combine or Replace",
                    ATTR_COLLECTION_ACTION, other
                ),
            );
            CollectionAction::Combine
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ContainerShape, MemberDescriptor, TypeDescriptor};

    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.register(TypeDescriptor::object(
            "TestPrototype",
            "",
            None,
            vec![
                MemberDescriptor::new("someRate", ValueKind::Float),
                MemberDescriptor::new("someInt", ValueKind::Int),
                MemberDescriptor::new(
                    "list",
                    ValueKind::Collection {
                        element: Box::new(ValueKind::Text),
                        shape: ContainerShape::List,
                    },
                ),
            ],
        ))
        .unwrap();
        reg
    }

    fn config() -> SessionConfig {
        SessionConfig::default()
    }

    fn scan(
        root: &DocumentNode,
    ) -> (IndexMap<String, PrototypeRecord>, Vec<Diagnostic>) {
        let reg = registry();
        let mut records = IndexMap::new();
        let mut diags = Vec::new();
        scan_document(root, "test.xml", &config(), &reg, &mut records, &mut diags);
        (records, diags)
    }

    fn container() -> DocumentNode {
        DocumentNode::new("PrototypeContainer", 1).attr(ATTR_TYPE, "TestPrototype")
    }

    #[test]
    fn declaration_without_id_is_structural_and_skipped() {
        let root = container()
            .child(DocumentNode::new(DECL_NODE, 2))
            .child(
                DocumentNode::new(DECL_NODE, 3)
                    .attr(ATTR_ID, "Ok")
                    .child(DocumentNode::new("someInt", 4).with_text("5")),
            );
        let (records, diags) = scan(&root);
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("Ok"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Structural);
    }

    #[test]
    fn duplicate_identifier_keeps_the_first_declaration() {
        let root = container()
            .child(
                DocumentNode::new(DECL_NODE, 2)
                    .attr(ATTR_ID, "Test")
                    .child(DocumentNode::new("someInt", 3).with_text("1")),
            )
            .child(
                DocumentNode::new(DECL_NODE, 4)
                    .attr(ATTR_ID, "Test")
                    .child(DocumentNode::new("someInt", 5).with_text("2")),
            );
        let (records, diags) = scan(&root);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records["Test"].fields["someInt"].value,
            Value::Int(1),
            "first declaration wins"
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::DuplicateIdentifier);
        assert!(diags[0].message.contains("test.xml:2"));
    }

    #[test]
    fn explicit_inherits_wins_over_container_default_parent() {
        let root = container()
            .attr("ParentName", "Base")
            .child(DocumentNode::new(DECL_NODE, 2).attr(ATTR_ID, "Base"))
            .child(DocumentNode::new(DECL_NODE, 3).attr(ATTR_ID, "Implicit"))
            .child(
                DocumentNode::new(DECL_NODE, 4)
                    .attr(ATTR_ID, "Explicit")
                    .attr(ATTR_INHERITS, "Other"),
            );
        let (records, diags) = scan(&root);
        assert!(diags.is_empty(), "{:?}", diags);
        // The default parent does not apply to itself.
        assert_eq!(records["Base"].parent, None);
        assert_eq!(records["Implicit"].parent.as_deref(), Some("Base"));
        assert_eq!(records["Explicit"].parent.as_deref(), Some("Other"));
    }

    #[test]
    fn abstract_attribute_is_parsed_leniently() {
        let root = container()
            .child(
                DocumentNode::new(DECL_NODE, 2)
                    .attr(ATTR_ID, "A")
                    .attr(ATTR_ABSTRACT, "True"),
            )
            .child(
                DocumentNode::new(DECL_NODE, 3)
                    .attr(ATTR_ID, "B")
                    .attr(ATTR_ABSTRACT, "nope"),
            );
        let (records, _) = scan(&root);
        assert!(records["A"].abstract_);
        assert!(!records["B"].abstract_);
    }

    #[test]
    fn unknown_member_is_reported_and_the_rest_still_parses() {
        let root = container().child(
            DocumentNode::new(DECL_NODE, 2)
                .attr(ATTR_ID, "Test")
                .child(DocumentNode::new("bogus", 3).with_text("1"))
                .child(DocumentNode::new("someRate", 4).with_text("2.5")),
        );
        let (records, diags) = scan(&root);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::ValueFormat);
        assert_eq!(records["Test"].fields["someRate"].value, Value::Float(2.5));
    }

    #[test]
    fn collection_action_directive_is_read_from_the_node() {
        let root = container().child(
            DocumentNode::new(DECL_NODE, 2)
                .attr(ATTR_ID, "Test")
                .child(
                    DocumentNode::new("list", 3)
                        .attr(ATTR_COLLECTION_ACTION, "Replace")
                        .child(DocumentNode::new("li", 4).with_text("a")),
                ),
        );
        let (records, diags) = scan(&root);
        assert!(diags.is_empty());
        assert_eq!(
            records["Test"].fields["list"].action,
            CollectionAction::Replace
        );
    }

    #[test]
    fn unresolvable_container_root_type_skips_the_document() {
        let root = DocumentNode::new("PrototypeContainer", 1)
            .attr(ATTR_TYPE, "Nope")
            .child(DocumentNode::new(DECL_NODE, 2).attr(ATTR_ID, "Test"));
        let (records, diags) = scan(&root);
        assert!(records.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnknownType);
    }
}
