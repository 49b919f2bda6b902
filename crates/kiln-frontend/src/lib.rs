// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The Kiln front end as one call.
//!
//! Runs lex → parse → bind over a single [`Source`] and hands back the
//! bound program together with every diagnostic the phases reported.
//! Binding only runs on a program that parsed cleanly; a partial tree would
//! mostly produce follow-on "undefined identifier" noise.

use std::fmt;
use std::path::{Path, PathBuf};

use kiln_ast::{Program, Source};
use kiln_bind::BindSummary;
use kiln_diagnostics::formatter::DiagnosticFormatter;
use kiln_diagnostics::json::{self, DiagnosticReport};
use kiln_diagnostics::{DiagnosticLog, Log};
use kiln_lexer::Lexer;
use thiserror::Error;

/// The last phase a compilation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Bind,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Parse => write!(f, "parse"),
            Phase::Bind => write!(f, "bind"),
        }
    }
}

/// Result of running the front end over one source.
#[derive(Debug)]
pub struct Compilation {
    pub program: Program,
    pub log: DiagnosticLog,
    /// Present when binding ran.
    pub summary: Option<BindSummary>,
    pub phase: Phase,
}

impl Compilation {
    /// No errors were reported. Warnings are allowed.
    pub fn is_ok(&self) -> bool {
        !self.log.has_errors()
    }

    /// Render every diagnostic for a terminal.
    pub fn render(&self, source: &Source) -> String {
        DiagnosticFormatter::new(source).format_all(self.log.diagnostics())
    }

    pub fn json_report(&self, source: &Source) -> DiagnosticReport {
        json::to_json_report(self.log.diagnostics(), source, &self.phase.to_string())
    }
}

/// Failure to load a source file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lex and parse `source`. Lexer and parser report into the same log.
pub fn parse_source(source: &Source) -> (Program, DiagnosticLog) {
    let mut log = DiagnosticLog::new();
    let program = kiln_parser::parse(&mut log, Lexer::new(source));
    log::debug!(
        "{}: parsed {} items with {} errors, {} warnings",
        source.name(),
        program.items.len(),
        log.error_count(),
        log.warning_count()
    );
    (program, log)
}

/// Run the whole front end over `source`.
pub fn compile(source: &Source) -> Compilation {
    let (mut program, mut log) = parse_source(source);
    if log.has_errors() {
        log::debug!("{}: skipping bind after parse errors", source.name());
        return Compilation { program, log, summary: None, phase: Phase::Parse };
    }

    let summary = kiln_bind::bind(&mut log, &mut program);
    log::debug!("{}: bind finished with {} errors", source.name(), summary.errors);
    Compilation { program, log, summary: Some(summary), phase: Phase::Bind }
}

/// Read `path` and compile it. The loaded source is returned for rendering.
pub fn compile_path(path: impl AsRef<Path>) -> Result<(Source, Compilation), LoadError> {
    let path = path.as_ref();
    let source = Source::from_path(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    log::debug!("loaded {} ({} bytes)", source.name(), source.len());
    let compilation = compile(&source);
    Ok((source, compilation))
}
