//! Parse session: document accumulation, finalization, diagnostics.
//!
//! A session is a sequence of `add_document`/`add_root` calls followed
//! by `finalize`, all on the calling thread. The session exclusively
//! owns its mutable state; the type registry is read-only and shared.

use crate::document::DocumentNode;
use crate::error::{Diagnostic, SetupError};
use crate::merge::{self, ResolvedPrototype};
use crate::reader::DocumentReader;
use crate::registry::TypeRegistry;
use crate::resolve_refs;
use crate::scan::{self, PrototypeRecord};
use indexmap::IndexMap;
use std::ops::Range;
use std::sync::Arc;

/// Recognized session options.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Namespace used when a declaration omits an explicit type-scope
    /// qualifier.
    pub default_scope: String,
    /// Type assumed for containers that omit a `Type` attribute.
    pub default_root_type: Option<String>,
    /// Name of the container attribute carrying the implicit default
    /// parent for its declarations.
    pub implicit_parent_attribute: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            default_scope: String::new(),
            default_root_type: None,
            implicit_parent_attribute: "ParentName".to_owned(),
        }
    }
}

/// An accumulating parse session.
pub struct Session {
    config: SessionConfig,
    registry: Arc<TypeRegistry>,
    reader: Option<Box<dyn DocumentReader>>,
    records: IndexMap<String, PrototypeRecord>,
    diags: Vec<Diagnostic>,
    /// Range of `diags` written by the last finalize run; replaced when
    /// the session is re-finalized after new documents.
    finalize_diags: Range<usize>,
    finalized: Option<Vec<ResolvedPrototype>>,
}

impl Session {
    /// Open a session without a document reader; documents enter via
    /// [`Session::add_root`]. An empty registry is programmer misuse.
    pub fn new(config: SessionConfig, registry: Arc<TypeRegistry>) -> Result<Self, SetupError> {
        if registry.is_empty() {
            return Err(SetupError::EmptyRegistry);
        }
        Ok(Session {
            config,
            registry,
            reader: None,
            records: IndexMap::new(),
            diags: Vec::new(),
            finalize_diags: 0..0,
            finalized: None,
        })
    }

    /// Open a session with a concrete syntax reader for
    /// [`Session::add_document`].
    pub fn with_reader(
        config: SessionConfig,
        registry: Arc<TypeRegistry>,
        reader: Box<dyn DocumentReader>,
    ) -> Result<Self, SetupError> {
        let mut session = Session::new(config, registry)?;
        session.reader = Some(reader);
        Ok(session)
    }

    /// Parse `text` through the configured reader and accumulate its
    /// declarations. Returns the diagnostics discovered by this call;
    /// they are also recorded in the session.
    pub fn add_document(&mut self, text: &str, origin: &str) -> Vec<Diagnostic> {
        let root = match &self.reader {
            Some(reader) => match reader.parse(text, origin) {
                Ok(root) => root,
                Err(diag) => {
                    self.diags.push(diag.clone());
                    return vec![diag];
                }
            },
            None => {
                let diag =
                    Diagnostic::structural(origin, 0, "session has no document reader configured");
                self.diags.push(diag.clone());
                return vec![diag];
            }
        };
        self.add_root(root, origin)
    }

    /// Accumulate a pre-parsed document tree, bypassing the reader.
    pub fn add_root(&mut self, root: DocumentNode, origin: &str) -> Vec<Diagnostic> {
        let before = self.diags.len();
        scan::scan_document(
            &root,
            origin,
            &self.config,
            &self.registry,
            &mut self.records,
            &mut self.diags,
        );
        self.finalized = None;
        self.diags[before..].to_vec()
    }

    /// All diagnostics accumulated so far, in order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diags
    }

    /// Merge the accumulated session and resolve cross-references.
    /// Idempotent while no new documents are added; adding documents
    /// re-finalizes the whole accumulated session on the next call.
    pub fn finalize(&mut self) -> &[ResolvedPrototype] {
        if self.finalized.is_none() {
            // Diagnostics from a superseded finalize run are replaced,
            // not duplicated.
            self.diags.drain(self.finalize_diags.clone());
            let start = self.diags.len();
            let mut out = merge::merge_session(&self.records, &self.registry, &mut self.diags);
            resolve_refs::resolve_references(&mut out, &mut self.diags);
            self.finalize_diags = start..self.diags.len();
            self.finalized = Some(out);
        }
        self.finalized.as_deref().unwrap_or_default()
    }
}
