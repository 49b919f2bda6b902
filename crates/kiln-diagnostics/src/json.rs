// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON diagnostic output for machine consumption.
//!
//! Each diagnostic carries exact line/column locations and the source text
//! of the line it points at, so editors can render it without the file.

use kiln_ast::{Range, Source};
use serde::Serialize;

use crate::{codes::ErrorCodeRegistry, Diagnostic, LabelStyle};

/// A complete JSON diagnostic report for one source file.
#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    /// Schema version for forward compatibility.
    pub version: u32,
    pub file: String,
    /// Whether the run produced no errors.
    pub success: bool,
    /// The last phase that ran.
    pub phase: String,
    pub diagnostics: Vec<JsonDiagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
}

/// A single diagnostic in JSON form, enriched with source context.
#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    /// "error", "warning", or "info".
    pub severity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error category (e.g., "Syntax", "Resolution").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub labels: Vec<JsonLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// A source location with line/column (1-based).
#[derive(Debug, Serialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub byte_offset: usize,
    /// The source line text for context.
    pub source_line: String,
}

/// A labeled range in JSON form.
#[derive(Debug, Serialize)]
pub struct JsonLabel {
    /// "primary" or "secondary".
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub start: LineCol,
    pub end: LineCol,
}

/// Line/column pair (1-based).
#[derive(Debug, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
    pub byte_offset: usize,
}

/// Convert diagnostics to a structured JSON report.
pub fn to_json_report(diagnostics: &[Diagnostic], source: &Source, phase: &str) -> DiagnosticReport {
    let registry = ErrorCodeRegistry::default();
    let error_count = diagnostics.iter().filter(|d| d.severity == crate::Severity::Error).count();
    let warning_count = diagnostics.iter().filter(|d| d.severity == crate::Severity::Warning).count();

    DiagnosticReport {
        version: 1,
        file: source.name().to_string(),
        success: error_count == 0,
        phase: phase.to_string(),
        diagnostics: diagnostics
            .iter()
            .map(|d| to_json_diagnostic(d, source, &registry))
            .collect(),
        error_count,
        warning_count,
    }
}

fn to_json_diagnostic(diag: &Diagnostic, source: &Source, registry: &ErrorCodeRegistry) -> JsonDiagnostic {
    let code = diag.code.as_ref().map(|c| c.0.clone());
    let category = code
        .as_ref()
        .and_then(|c| registry.get(c))
        .map(|info| info.category.to_string());

    let location = diag.primary_range().map(|r| SourceLocation {
        line: r.start.line,
        column: r.start.column,
        byte_offset: r.start.pos,
        source_line: first_line(source, r),
    });

    let labels = diag
        .labels
        .iter()
        .map(|l| JsonLabel {
            role: match l.style {
                LabelStyle::Primary => "primary".to_string(),
                LabelStyle::Secondary => "secondary".to_string(),
            },
            message: l.message.clone(),
            start: LineCol {
                line: l.range.start.line,
                column: l.range.start.column,
                byte_offset: l.range.start.pos,
            },
            end: LineCol {
                line: l.range.end.line,
                column: l.range.end.column,
                byte_offset: l.range.end.pos,
            },
        })
        .collect();

    JsonDiagnostic {
        severity: diag.severity.to_string(),
        code,
        category,
        message: diag.message.clone(),
        location,
        labels,
        notes: diag.notes.clone(),
        help: diag.help.as_ref().map(|h| h.message.clone()),
    }
}

fn first_line(source: &Source, range: Range) -> String {
    source
        .covering_lines(range)
        .lines()
        .next()
        .unwrap_or("")
        .to_string()
}

/// Serialize a diagnostic report to pretty JSON.
pub fn to_json_string(report: &DiagnosticReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}
