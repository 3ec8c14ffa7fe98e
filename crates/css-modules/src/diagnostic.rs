//! Diagnostic types.

use camino::{Utf8Path, Utf8PathBuf};
use source_map::Span;

/// A non-fatal problem found while compiling a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic message.
    pub message: String,
    /// The stylesheet the diagnostic belongs to.
    pub file: Utf8PathBuf,
    /// The source location.
    pub span: Span,
    /// The offending text, if narrower than the span.
    pub word: Option<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    pub fn new(
        code: DiagnosticCode,
        message: impl Into<String>,
        file: impl Into<Utf8PathBuf>,
        span: Span,
    ) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            file: file.into(),
            span,
            word: None,
        }
    }

    /// Attaches the offending text.
    pub fn with_word(mut self, word: impl Into<String>) -> Self {
        self.word = Some(word.into());
        self
    }
}

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A hint or suggestion.
    Hint,
    /// A warning that doesn't prevent compilation.
    Warning,
    /// An error that should be fixed.
    Error,
}

impl Severity {
    /// Returns the severity as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Diagnostic codes for all checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// `unknown-class`: a composed or external class does not exist
    UnknownClass,
    /// `composes-leading-dot`: `composes: .name` was written with a dot
    ComposesLeadingDot,
    /// `selector-not-renamed`: one selector of a rule could not be rewritten
    SelectorNotRenamed,
    /// `bare-global`: `:global` without arguments, which was removed
    BareGlobal,
    /// `postprocess`: a post-processing plugin reported a problem
    Postprocess,
}

impl DiagnosticCode {
    /// Returns the default severity for this diagnostic code.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::UnknownClass
            | DiagnosticCode::ComposesLeadingDot
            | DiagnosticCode::SelectorNotRenamed
            | DiagnosticCode::BareGlobal
            | DiagnosticCode::Postprocess => Severity::Warning,
        }
    }

    /// Returns the diagnostic code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnknownClass => "unknown-class",
            DiagnosticCode::ComposesLeadingDot => "composes-leading-dot",
            DiagnosticCode::SelectorNotRenamed => "selector-not-renamed",
            DiagnosticCode::BareGlobal => "bare-global",
            DiagnosticCode::Postprocess => "postprocess",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered collection of diagnostics, deduplicated on insertion.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic unless an identical one was already reported.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.items.contains(&diagnostic) {
            self.items.push(diagnostic);
        }
    }

    /// Reports a warning-level diagnostic.
    pub fn report(
        &mut self,
        code: DiagnosticCode,
        message: impl Into<String>,
        file: &Utf8Path,
        span: Span,
    ) {
        self.push(Diagnostic::new(code, message, file, span));
    }

    /// Returns the diagnostics in report order.
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the collection.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
