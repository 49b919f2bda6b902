// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal formatter for diagnostics.
//!
//! ```text
//! error[E0201]: redefinition of 'x'
//!   --> main.kn:3:9
//!    |
//!  2 |     var x = 1
//!    |         - first declared here
//!  3 |     var x = 2
//!    |         ^ redefined here
//! ```

use std::collections::BTreeMap;

use colored::Colorize;
use kiln_ast::Source;

use crate::{Diagnostic, LabelStyle, Severity};

/// Formats diagnostics against the source they were reported for.
pub struct DiagnosticFormatter<'a> {
    source: &'a Source,
    file_name: Option<&'a str>,
}

struct Annotation {
    col_start: usize,
    col_end: usize,
    style: LabelStyle,
    message: Option<String>,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(source: &'a Source) -> Self {
        Self { source, file_name: None }
    }

    /// Override the name shown after `-->`; defaults to the source's name.
    pub fn with_file_name(mut self, name: &'a str) -> Self {
        self.file_name = Some(name);
        self
    }

    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics.iter().map(|d| self.format(d)).collect::<Vec<_>>().join("\n")
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        self.format_header(&mut out, diagnostic);

        // Labels grouped by the line they start on.
        let mut lines: BTreeMap<u32, Vec<Annotation>> = BTreeMap::new();
        for label in &diagnostic.labels {
            let start = label.range.start;
            let end = label.range.end;
            let col_end = if end.line == start.line {
                end.column as usize
            } else {
                self.line_text(start.line).len() + 1
            };
            lines.entry(start.line).or_default().push(Annotation {
                col_start: start.column as usize,
                col_end: col_end.max(start.column as usize + 1),
                style: label.style,
                message: label.message.clone(),
            });
        }

        let gutter = lines
            .keys()
            .last()
            .map(|l| l.to_string().len())
            .unwrap_or(1)
            .max(2);

        if let Some(range) = diagnostic.primary_range() {
            let file = self.file_name.unwrap_or(self.source.name());
            out.push_str(&format!(
                "{}{} {}:{}:{}\n",
                " ".repeat(gutter - 1),
                "-->".blue(),
                file,
                range.start.line,
                range.start.column
            ));
            out.push_str(&format!("{} {}\n", " ".repeat(gutter + 1), "|".blue()));
        }

        for (line, annotations) in &lines {
            out.push_str(&format!(
                "{:>width$} {} {}\n",
                line.to_string().blue().bold(),
                "|".blue(),
                self.line_text(*line),
                width = gutter + 1,
            ));
            for ann in annotations {
                let (marker, message) = match ann.style {
                    LabelStyle::Primary => (
                        "^".repeat(ann.col_end - ann.col_start).red().bold().to_string(),
                        ann.message.as_deref().unwrap_or("").red().bold().to_string(),
                    ),
                    LabelStyle::Secondary => (
                        "-".repeat(ann.col_end - ann.col_start).blue().to_string(),
                        ann.message.as_deref().unwrap_or("").blue().to_string(),
                    ),
                };
                out.push_str(&format!(
                    "{} {} {}{} {}\n",
                    " ".repeat(gutter + 1),
                    "|".blue(),
                    " ".repeat(ann.col_start.saturating_sub(1)),
                    marker,
                    message,
                ));
            }
        }

        self.format_footer(&mut out, diagnostic, gutter);
        out
    }

    fn format_header(&self, out: &mut String, diagnostic: &Diagnostic) {
        let severity_str = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };

        if let Some(ref code) = diagnostic.code {
            out.push_str(&format!(
                "{}[{}]: {}\n",
                severity_str,
                code.0.clone().red().bold(),
                diagnostic.message.bold()
            ));
        } else {
            out.push_str(&format!("{}: {}\n", severity_str, diagnostic.message.bold()));
        }
    }

    fn format_footer(&self, out: &mut String, diagnostic: &Diagnostic, gutter: usize) {
        for note in &diagnostic.notes {
            out.push_str(&format!(
                "{} {} {}: {}\n",
                " ".repeat(gutter + 1),
                "=".cyan(),
                "note".cyan().bold(),
                note
            ));
        }
        if let Some(ref help) = diagnostic.help {
            out.push_str(&format!(
                "{} {} {}: {}\n",
                " ".repeat(gutter + 1),
                "=".cyan(),
                "help".cyan().bold(),
                help.message
            ));
        }
    }

    fn line_text(&self, line: u32) -> &str {
        self.source
            .line_map()
            .line_text(self.source.text(), line)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain<T>(f: impl FnOnce() -> T) -> T {
        colored::control::set_override(false);
        f()
    }

    #[test]
    fn renders_labels_under_their_lines() {
        let src = Source::new("main.kn", "var x = 1\nvar x = 2");
        let diag = Diagnostic::error("redefinition of 'x'")
            .with_code("E0201")
            .with_primary(src.range(14, 15), "redefined here")
            .with_secondary(src.range(4, 5), "first declared here");
        let out = plain(|| DiagnosticFormatter::new(&src).format(&diag));

        assert!(out.starts_with("error[E0201]: redefinition of 'x'\n"));
        assert!(out.contains("--> main.kn:2:5"));
        let first = out.find("var x = 1").unwrap();
        let secondary = out.find("- first declared here").unwrap();
        let second = out.find("var x = 2").unwrap();
        let primary = out.find("^ redefined here").unwrap();
        assert!(first < secondary && secondary < second && second < primary);
    }

    #[test]
    fn help_and_notes_without_labels() {
        let src = Source::new("main.kn", "");
        let diag = Diagnostic::warning("odd")
            .with_note("a note")
            .with_help("try this");
        let out = plain(|| DiagnosticFormatter::new(&src).with_file_name("other.kn").format(&diag));
        assert!(out.starts_with("warning: odd\n"));
        assert!(!out.contains("-->"));
        assert!(out.contains("= note: a note"));
        assert!(out.contains("= help: try this"));
    }
}
