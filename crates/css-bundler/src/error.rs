//! Bundling errors.

use camino::Utf8PathBuf;
use css_modules::CompileError;
use source_map::SourceMapError;
use thiserror::Error;

/// A fatal error while bundling stylesheets.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A stylesheet could not be read.
    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stylesheet failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The post-processing configuration could not be read.
    #[error("failed to read post-processing config {path}")]
    ConfigRead {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The post-processing configuration is not valid JSON.
    #[error("invalid post-processing config {path}: {source}")]
    ConfigParse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A concatenated chunk could not be parsed for post-processing.
    #[error("failed to post-process chunk `{chunk}`: {message}")]
    Postprocess { chunk: String, message: String },

    /// A chunk was declared twice.
    #[error("chunk `{0}` is declared more than once")]
    DuplicateChunk(String),

    /// Serializing a source map failed.
    #[error("failed to serialize source map: {0}")]
    SourceMap(#[from] SourceMapError),
}
