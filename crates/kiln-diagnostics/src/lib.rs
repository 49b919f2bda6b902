// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Kiln compiler diagnostics.
//!
//! Every phase reports through the [`Log`] sink as it runs; nothing is
//! fatal. Callers check [`Log::error_count`] before trusting the tree for a
//! later phase. Phase error types convert to [`Diagnostic`] via
//! [`ToDiagnostic`].

pub mod codes;
pub mod formatter;
pub mod json;
pub mod suggestions;

use kiln_ast::Range;
use serde::Serialize;

// ============================================================================
// Core Types
// ============================================================================

/// A compiler diagnostic with rich context for display.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<ErrorCode>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Option<Help>,
}

/// A labeled source range within a diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub range: Range,
    pub style: LabelStyle,
    pub message: Option<String>,
}

/// How a label should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// Primary error location (red underline).
    Primary,
    /// Related location (blue underline).
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// An error code like E0201.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorCode(pub String);

/// Actionable help attached to a diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct Help {
    pub message: String,
}

// ============================================================================
// Builder API
// ============================================================================

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(ErrorCode(code.into()));
        self
    }

    /// Attach an unlabeled primary range when one is known.
    pub fn at(mut self, range: Option<Range>) -> Self {
        if let Some(range) = range {
            self.labels.push(Label { range, style: LabelStyle::Primary, message: None });
        }
        self
    }

    pub fn with_label(mut self, range: Range, style: LabelStyle, msg: impl Into<String>) -> Self {
        self.labels.push(Label {
            range,
            style,
            message: Some(msg.into()),
        });
        self
    }

    pub fn with_primary(self, range: Range, msg: impl Into<String>) -> Self {
        self.with_label(range, LabelStyle::Primary, msg)
    }

    pub fn with_secondary(self, range: Range, msg: impl Into<String>) -> Self {
        self.with_label(range, LabelStyle::Secondary, msg)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(Help { message: help.into() });
        self
    }

    /// Returns the primary range (first primary label, or first label).
    pub fn primary_range(&self) -> Option<Range> {
        self.labels
            .iter()
            .find(|l| l.style == LabelStyle::Primary)
            .or(self.labels.first())
            .map(|l| l.range)
    }

    pub fn secondary_ranges(&self) -> impl Iterator<Item = Range> + '_ {
        self.labels
            .iter()
            .filter(|l| l.style == LabelStyle::Secondary)
            .map(|l| l.range)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ============================================================================
// Conversion Trait
// ============================================================================

/// Convert a compiler error into a rich diagnostic.
pub trait ToDiagnostic {
    fn to_diagnostic(&self) -> Diagnostic;
}

// ============================================================================
// Sink
// ============================================================================

/// Append-only diagnostic sink shared by lexer, parser and binder.
///
/// Not synchronized: compile each file with its own sink.
pub trait Log {
    fn log(&mut self, diagnostic: Diagnostic);
    fn error_count(&self) -> usize;
    fn warning_count(&self) -> usize;
}

/// A [`Log`] that keeps every diagnostic in arrival order.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl Log for DiagnosticLog {
    fn log(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => {}
        }
        log::trace!("{}: {}", diagnostic.severity, diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    fn error_count(&self) -> usize {
        self.errors
    }

    fn warning_count(&self) -> usize {
        self.warnings
    }
}
