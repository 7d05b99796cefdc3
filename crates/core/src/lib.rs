//! protoform-core: declarative prototype data-definition engine.
//!
//! Parses hierarchical prototype documents into typed object graphs:
//! single inheritance between prototypes, combine-or-replace collection
//! merging on override, and deferred cross-prototype references that
//! may point forward within and across documents.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`Session`] -- accumulate documents, then [`Session::finalize`]
//! - [`TypeRegistry`] / [`TypeDescriptor`] -- the type setup surface
//! - [`DocumentNode`] -- the generic attributed node tree the engine
//!   consumes (produced by an external [`DocumentReader`])
//! - [`ResolvedPrototype`] -- the finished, fully-merged output
//! - [`Diagnostic`] -- accumulated structured failure reports
//!
//! The pipeline is: document scan (one [`scan::PrototypeRecord`] per
//! declaration) -> memoized inheritance merge -> instantiation ->
//! cross-reference resolution.

pub mod coerce;
pub mod document;
pub mod error;
pub mod merge;
pub mod reader;
pub mod registry;
pub mod resolve_refs;
pub mod scan;
pub mod session;
pub mod value;

// ── Convenience re-exports: key types ────────────────────────────────

pub use document::{Attribute, DocumentNode, Provenance};
pub use error::{Diagnostic, DiagnosticKind, SetupError, Severity};
pub use merge::ResolvedPrototype;
pub use reader::DocumentReader;
pub use registry::{
    ContainerShape, MemberDescriptor, ScalarParseFn, ScalarValue, TypeDescriptor, TypeId,
    TypeRegistry, ValueKind,
};
pub use session::{Session, SessionConfig};
pub use value::{CollectionAction, CollectionValue, PrototypeHandle, Value};
