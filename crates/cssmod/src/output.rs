//! Output formatting.

use crate::cli::OutputFormat;
use camino::Utf8Path;
use css_modules::{Diagnostic, Severity};
use serde::Serialize;
use source_map::{ByteOffset, LineCol, LineIndex};

/// A formatted diagnostic for output.
#[derive(Debug, Serialize)]
pub struct FormattedDiagnostic {
    /// The diagnostic type (Error, Warning, etc.).
    #[serde(rename = "type")]
    pub diagnostic_type: String,
    /// The file path.
    pub filename: String,
    /// The start position.
    pub start: Position,
    /// The end position.
    pub end: Position,
    /// The message.
    pub message: String,
    /// The diagnostic code.
    pub code: String,
    /// The offending source text, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
}

/// A position in the source.
#[derive(Debug, Serialize)]
pub struct Position {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
    /// Byte offset.
    pub offset: u32,
}

/// Formats diagnostics for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a collection of diagnostics.
    ///
    /// `source_of` returns the text of a diagnostic's file; positions fall
    /// back to 1:1 when it returns `None`.
    pub fn format<F>(&self, diagnostics: &[Diagnostic], source_of: F) -> String
    where
        F: Fn(&Utf8Path) -> Option<String>,
    {
        let formatted: Vec<FormattedDiagnostic> = diagnostics
            .iter()
            .map(|diag| {
                let source = source_of(&diag.file).unwrap_or_default();
                format_diagnostic(diag, &source)
            })
            .collect();

        match self.format {
            OutputFormat::Human => format_human(&formatted),
            OutputFormat::Json => serde_json::to_string_pretty(&formatted)
                .unwrap_or_else(|_| "[]".to_string()),
        }
    }
}

fn format_diagnostic(diag: &Diagnostic, source: &str) -> FormattedDiagnostic {
    let line_index = LineIndex::new(source);
    let position = |offset: ByteOffset| {
        let LineCol { line, col } = line_index
            .char_line_col(offset, source)
            .unwrap_or(LineCol::new(0, 0));
        Position {
            line: line + 1,
            column: col + 1,
            offset: u32::from(offset),
        }
    };

    let diagnostic_type = match diag.severity {
        Severity::Error => "Error",
        Severity::Warning => "Warning",
        Severity::Hint => "Hint",
    };

    FormattedDiagnostic {
        diagnostic_type: diagnostic_type.to_string(),
        filename: diag.file.to_string(),
        start: position(diag.span.start),
        end: position(diag.span.end),
        message: diag.message.clone(),
        code: diag.code.to_string(),
        word: diag.word.clone(),
    }
}

fn format_human(diagnostics: &[FormattedDiagnostic]) -> String {
    let mut output = String::new();
    for diag in diagnostics {
        output.push_str(&format!(
            "{}:{}:{}\n{}: {} ({})\n",
            diag.filename,
            diag.start.line,
            diag.start.column,
            diag.diagnostic_type,
            diag.message,
            diag.code
        ));
        if let Some(word) = &diag.word {
            output.push_str(&format!("  at `{word}`\n"));
        }
        output.push('\n');
    }
    output
}

/// Summary of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Number of stylesheets compiled.
    pub file_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Whether to fail on warnings.
    pub fail_on_warnings: bool,
}

impl RunSummary {
    /// Returns true if the process should exit with an error.
    pub fn failed(&self) -> bool {
        self.fail_on_warnings && self.warning_count > 0
    }

    /// Formats the summary line.
    pub fn format(&self) -> String {
        let warning_word = if self.warning_count == 1 {
            "warning"
        } else {
            "warnings"
        };
        let file_word = if self.file_count == 1 {
            "stylesheet"
        } else {
            "stylesheets"
        };

        format!(
            "cssmod compiled {} {} with {} {}",
            self.file_count, file_word, self.warning_count, warning_word
        )
    }
}
