//! Chunk assembly.

use crate::error::BundleError;
use crate::graph::Graph;
use crate::options::{url_join, BundleOptions};
use crate::postprocess::Postprocessor;
use camino::{Utf8Path, Utf8PathBuf};
use css_modules::{Bundler, CompilationContext, Diagnostic, TransformOutput};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use source_map::Concat;
use std::io;

/// Length of the content hash in emitted file names.
pub const HASH_LENGTH: usize = 16;

/// A named group of entry stylesheets bundled into one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    pub entries: Vec<Utf8PathBuf>,
}

impl Chunk {
    pub fn new(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = impl Into<Utf8PathBuf>>,
    ) -> Self {
        Self {
            name: name.into(),
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// A file to write under the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    /// Path relative to the output directory.
    pub file_name: String,
    pub content: String,
}

/// Everything one bundling pass produced.
#[derive(Debug, Default)]
pub struct BundleOutput {
    /// Stylesheets and source maps, in emission order.
    pub assets: Vec<EmittedAsset>,
    /// Chunk name to the public URL of its stylesheet.
    pub emitted_stylesheets: IndexMap<String, String>,
    /// Class maps of every compiled module, by logical path.
    pub modules: IndexMap<String, IndexMap<SmolStr, String>>,
    /// Warnings from compilation and post-processing.
    pub diagnostics: Vec<Diagnostic>,
}

impl BundleOutput {
    /// Writes every asset below `out_dir`, creating directories as needed.
    pub fn write(&self, out_dir: &Utf8Path) -> io::Result<()> {
        for asset in &self.assets {
            let path = out_dir.join(&asset.file_name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &asset.content)?;
        }
        Ok(())
    }
}

/// Bundles CSS modules into chunk stylesheets.
///
/// Compiled modules are cached: a module shared by several chunks is read
/// and compiled once per bundler.
#[derive(Debug)]
pub struct StylesheetBundler {
    options: BundleOptions,
    context: CompilationContext,
    postprocessor: Postprocessor,
    graph: Graph,
    compiled: FxHashMap<Utf8PathBuf, TransformOutput>,
}

impl StylesheetBundler {
    /// Creates a bundler, loading the post-processing configuration.
    pub fn new(options: BundleOptions) -> Result<Self, BundleError> {
        let postprocessor = Postprocessor::load(options.config_path.as_deref())?;
        Ok(Self {
            context: CompilationContext::new(options.namer.clone()),
            options,
            postprocessor,
            graph: Graph::new(),
            compiled: FxHashMap::default(),
        })
    }

    /// The compilation context shared by every chunk.
    pub fn context(&self) -> &CompilationContext {
        &self.context
    }

    /// Bundles every chunk. Chunks without entries are skipped.
    pub fn bundle(&mut self, chunks: &[Chunk]) -> Result<BundleOutput, BundleError> {
        let mut seen = FxHashSet::default();
        for chunk in chunks {
            if !seen.insert(chunk.name.as_str()) {
                return Err(BundleError::DuplicateChunk(chunk.name.clone()));
            }
        }

        let mut output = BundleOutput::default();
        for chunk in chunks {
            if chunk.entries.is_empty() {
                tracing::debug!(chunk = %chunk.name, "skipping empty chunk");
                continue;
            }
            self.bundle_chunk(chunk, &mut output)?;
        }
        Ok(output)
    }

    fn bundle_chunk(
        &mut self,
        chunk: &Chunk,
        output: &mut BundleOutput,
    ) -> Result<(), BundleError> {
        let _span = tracing::debug_span!("chunk", name = %chunk.name).entered();

        let entries: Vec<Utf8PathBuf> = chunk
            .entries
            .iter()
            .map(|entry| self.context.absolute_path(entry))
            .collect();
        self.graph.load(&entries)?;
        let order = self.graph.order(&entries);

        let mut concat = Concat::new(&format!("{}.css", chunk.name));
        for path in &order {
            self.compile(path, output)?;
            if let Some(compiled) = self.compiled.get(path) {
                concat.add(&compiled.css, &compiled.map);
            }
        }
        let (css, map) = concat.finish();

        let processed = self
            .postprocessor
            .run(&chunk.name, css, map, self.context.root())?;
        output.diagnostics.extend(processed.diagnostics);

        let hash = content_hash(&processed.css);
        let file = self.options.file_namer.file_name(&chunk.name, &hash);
        let map_file = format!("{file}.map");

        let mut css = processed.css;
        let mut map = processed.map;
        map.set_file(Some(file.as_str()));
        if self.options.sourcemap {
            let reference = Utf8Path::new(&map_file)
                .file_name()
                .unwrap_or(map_file.as_str());
            css.push_str(&format!("\n/*# sourceMappingURL={reference} */"));
        }
        let map_json = source_map::to_json(&map)?;

        let static_dir = self.options.static_dir.as_str();
        let url = url_join(&[&self.options.public_path, static_dir, &file]);
        tracing::info!(chunk = %chunk.name, %url, files = order.len(), "emitted chunk");

        output.assets.push(EmittedAsset {
            file_name: url_join(&[static_dir, &file]),
            content: css,
        });
        output.assets.push(EmittedAsset {
            file_name: url_join(&[static_dir, &map_file]),
            content: map_json,
        });
        output.emitted_stylesheets.insert(chunk.name.clone(), url);
        Ok(())
    }

    /// Compiles `path` unless an earlier chunk already did.
    fn compile(&mut self, path: &Utf8Path, output: &mut BundleOutput) -> Result<(), BundleError> {
        if self.compiled.contains_key(path) {
            return Ok(());
        }
        let Some(file) = self.graph.file(path) else {
            return Ok(());
        };
        let compiled = self.context.transform(path, &file.source, &Bundler)?;
        output.diagnostics.extend(compiled.diagnostics.iter().cloned());
        output
            .modules
            .insert(compiled.keys.js.clone(), compiled.classes.clone());
        self.compiled.insert(path.to_owned(), compiled);
        Ok(())
    }
}

/// The first [`HASH_LENGTH`] hex digits of the BLAKE3 hash of `css`.
pub fn content_hash(css: &str) -> String {
    let hex = blake3::hash(css.as_bytes()).to_hex();
    hex[..HASH_LENGTH].to_string()
}
