//! Document reader seam.
//!
//! The concrete syntax (XML, JSON, ...) lives outside this crate. A
//! reader turns raw source text into a [`DocumentNode`] tree with line
//! information; the engine consumes only the tree. Embedders that
//! already hold a node tree can skip the reader entirely via
//! [`crate::session::Session::add_root`].

use crate::document::DocumentNode;
use crate::error::Diagnostic;

/// Turns raw source text into an attributed node tree. A parse failure
/// is reported as a single structural diagnostic for the document.
pub trait DocumentReader {
    fn parse(&self, text: &str, origin: &str) -> Result<DocumentNode, Diagnostic>;
}
