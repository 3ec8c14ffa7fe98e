//! Source positions and source maps for cssmod.
//!
//! This crate provides byte spans and line indexes for diagnostics, map
//! composition for stylesheets that are printed more than once, and the
//! concatenation engine that merges processed stylesheets into one chunk
//! without losing line-accurate mappings.

mod compose;
mod concat;
mod line_index;
mod span;

pub use compose::compose;
pub use concat::Concat;
pub use line_index::{LineCol, LineIndex};
pub use sourcemap::SourceMap;
pub use span::{ByteOffset, Span};
pub use sourcemap::Error as SourceMapError;

/// Serializes a source map to V3 JSON.
pub fn to_json(map: &SourceMap) -> Result<String, SourceMapError> {
    let mut out = Vec::new();
    map.to_writer(&mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Parses a V3 source map from JSON.
pub fn from_json(json: &str) -> Result<SourceMap, SourceMapError> {
    SourceMap::from_slice(json.as_bytes())
}
