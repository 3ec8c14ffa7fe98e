//! Compilation errors.

use crate::namer::NamingCollision;
use camino::{Utf8Path, Utf8PathBuf};
use source_map::{SourceMapError, Span};
use thiserror::Error;

/// A fatal error while compiling a CSS module.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Reading the stylesheet failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The input is not a `.module.css`/`.modules.css` file.
    #[error("{path} is not a CSS module (expected .module.css or .modules.css)")]
    UnsupportedFile { path: Utf8PathBuf },

    /// The stylesheet could not be parsed.
    #[error("{file}: {message}")]
    Parse {
        file: Utf8PathBuf,
        span: Span,
        message: String,
    },

    /// The compiled stylesheet could not be printed.
    #[error("{file}: failed to print stylesheet: {message}")]
    Print { file: Utf8PathBuf, message: String },

    /// Two classes were given the same name.
    #[error(transparent)]
    NamingCollision(#[from] NamingCollision),

    /// `:external(...)` does not have the `class from 'path'` shape.
    #[error("{file}: Wrong format of :external selector in `{word}`")]
    ExternalFormat {
        file: Utf8PathBuf,
        span: Span,
        word: String,
    },

    /// `composes` was used in a rule whose selector is not a plain class.
    #[error("{file}: Only simple singular selectors may use composition (`{word}`)")]
    ComposesOnComplexSelector {
        file: Utf8PathBuf,
        span: Span,
        word: String,
    },

    /// A class ends up composing itself.
    #[error("composition cycle: {}", chain.join(" -> "))]
    CompositionCycle { chain: Vec<String> },

    /// Serializing the source map failed.
    #[error("failed to serialize source map: {0}")]
    SourceMap(#[from] SourceMapError),
}

impl CompileError {
    /// Returns the file and span the error points at, if any.
    pub fn location(&self) -> Option<(&Utf8Path, Span)> {
        match self {
            CompileError::Parse { file, span, .. }
            | CompileError::ExternalFormat { file, span, .. }
            | CompileError::ComposesOnComplexSelector { file, span, .. } => {
                Some((file.as_path(), *span))
            }
            _ => None,
        }
    }
}
