//! Stylesheet bundling for cssmod.
//!
//! Groups CSS modules into named chunks. Each chunk is compiled in
//! dependency order, concatenated with a merged source map, run through the
//! configured post-processing plugins and emitted under a content-hashed
//! file name.
//!
//! # Example
//!
//! ```no_run
//! use css_bundler::{BundleOptions, Chunk, StylesheetBundler};
//!
//! let mut bundler = StylesheetBundler::new(BundleOptions::default())?;
//! let output = bundler.bundle(&[Chunk::new("main", ["src/app.module.css"])])?;
//! for (chunk, url) in &output.emitted_stylesheets {
//!     println!("{chunk}: {url}");
//! }
//! # Ok::<(), css_bundler::BundleError>(())
//! ```

mod bundle;
mod error;
mod graph;
mod options;
mod postprocess;

pub use bundle::{content_hash, BundleOutput, Chunk, EmittedAsset, StylesheetBundler, HASH_LENGTH};
pub use error::BundleError;
pub use graph::{Graph, SourceFile};
pub use options::{BundleOptions, FileNamer};
pub use postprocess::{
    Plugin, PluginConfig, PluginWarning, PostprocessConfig, Postprocessor, Processed,
};
