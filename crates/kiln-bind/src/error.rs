// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Binding error types.

use kiln_ast::Range;
use kiln_diagnostics::{codes, Diagnostic, ToDiagnostic};
use thiserror::Error;

/// A name binding error.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct BindError {
    pub kind: BindErrorKind,
    pub range: Option<Range>,
}

impl BindError {
    pub fn undefined(name: String, suggestion: Option<String>, range: Option<Range>) -> Self {
        Self { kind: BindErrorKind::Undefined { name, suggestion }, range }
    }

    pub fn redefinition(name: String, range: Option<Range>, previous: Option<Range>) -> Self {
        Self { kind: BindErrorKind::Redefinition { name, previous }, range }
    }

    pub fn break_outside_loop(range: Option<Range>) -> Self {
        Self { kind: BindErrorKind::BreakOutsideLoop, range }
    }

    pub fn continue_outside_loop(range: Option<Range>) -> Self {
        Self { kind: BindErrorKind::ContinueOutsideLoop, range }
    }

    pub fn return_outside_function(range: Option<Range>) -> Self {
        Self { kind: BindErrorKind::ReturnOutsideFunction, range }
    }
}

/// The kind of binding error.
#[derive(Debug, Clone, Error)]
pub enum BindErrorKind {
    #[error("undefined identifier '{name}'")]
    Undefined { name: String, suggestion: Option<String> },

    #[error("redefinition of '{name}'")]
    Redefinition { name: String, previous: Option<Range> },

    #[error("'break' used outside a loop")]
    BreakOutsideLoop,

    #[error("'continue' used outside a loop")]
    ContinueOutsideLoop,

    #[error("'return' used outside a function")]
    ReturnOutsideFunction,
}

impl ToDiagnostic for BindError {
    fn to_diagnostic(&self) -> Diagnostic {
        let message = self.kind.to_string();
        match &self.kind {
            BindErrorKind::Undefined { suggestion, .. } => {
                let diag = labeled(Diagnostic::error(message).with_code(codes::UNDEFINED_IDENTIFIER), self.range, "not found in this scope");
                match suggestion {
                    Some(help) => diag.with_help(help),
                    None => diag,
                }
            }
            BindErrorKind::Redefinition { name, previous } => {
                let diag = labeled(Diagnostic::error(message).with_code(codes::REDEFINITION), self.range, "redefined here")
                    .with_help(format!("rename one of the '{}' declarations", name));
                match previous {
                    Some(first) => diag.with_secondary(*first, "first declared here"),
                    None => diag,
                }
            }
            BindErrorKind::BreakOutsideLoop => {
                labeled(Diagnostic::error(message).with_code(codes::BREAK_OUTSIDE_LOOP), self.range, "not inside 'while' or 'for'")
            }
            BindErrorKind::ContinueOutsideLoop => {
                labeled(Diagnostic::error(message).with_code(codes::CONTINUE_OUTSIDE_LOOP), self.range, "not inside 'while' or 'for'")
            }
            BindErrorKind::ReturnOutsideFunction => labeled(
                Diagnostic::error(message).with_code(codes::RETURN_OUTSIDE_FUNCTION),
                self.range,
                "not inside a function or closure",
            ),
        }
    }
}

fn labeled(diag: Diagnostic, range: Option<Range>, label: &str) -> Diagnostic {
    match range {
        Some(range) => diag.with_primary(range, label),
        None => diag,
    }
}
