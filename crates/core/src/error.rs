//! Diagnostics and setup errors.
//!
//! Malformed input never aborts a parse: every failure is recorded as a
//! [`Diagnostic`] in the session and parsing continues. Only programmer
//! misuse at configuration time (empty registry, missing scalar parser)
//! is a hard [`SetupError`] returned from the call itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity, inspected by the caller to decide whether a
/// batch counts as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// The failure taxonomy. Each kind has a fixed recovery policy described
/// on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Malformed container or declaration (e.g. missing `Id`); the
    /// declaration is dropped, the scan continues.
    Structural,
    /// Identifier re-declared within the session; the later declaration
    /// is dropped, the first wins.
    DuplicateIdentifier,
    /// A type name did not resolve in the registry.
    UnknownType,
    /// A field value failed to coerce; the field is left at its default
    /// and the prototype is still emitted.
    ValueFormat,
    /// A record is transitively its own inheritance ancestor; every
    /// record in the cycle is dropped.
    InheritanceCycle,
    /// A prototype-reference identifier did not resolve; the single
    /// field is left absent.
    UnresolvedReference,
}

/// A structured diagnostic with source location and prototype/field
/// context where known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        prototype: Option<&str>,
        field: Option<&str>,
        file: &str,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Error,
            prototype: prototype.map(str::to_owned),
            field: field.map(str::to_owned),
            file: file.to_owned(),
            line,
            message: message.into(),
        }
    }

    pub fn structural(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Structural, None, None, file, line, message)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Serialize to JSON with all fields present (null for missing),
    /// for tooling that consumes the diagnostics stream.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind":      format!("{:?}", self.kind),
            "severity":  format!("{:?}", self.severity),
            "prototype": self.prototype,
            "field":     self.field,
            "file":      self.file,
            "line":      self.line,
            "message":   self.message,
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {:?}: {}", self.file, self.line, self.kind, self.message)
    }
}

/// Configuration-time misuse. Unlike [`Diagnostic`], these are returned
/// as `Err` from the offending call immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("type '{scope}.{name}' is already registered")]
    DuplicateType { scope: String, name: String },
    #[error("type id {0} is not registered")]
    UnknownTypeId(usize),
    #[error("member '{member}' of '{ty}' uses external scalar '{kind}' with no registered parser")]
    MissingScalarParser {
        ty: String,
        member: String,
        kind: String,
    },
    #[error("member '{member}' of '{ty}' references type id {target}, which is not a {expected}")]
    BadMemberTarget {
        ty: String,
        member: String,
        target: usize,
        expected: &'static str,
    },
    #[error("type registry is empty; register prototype types before opening a session")]
    EmptyRegistry,
}
