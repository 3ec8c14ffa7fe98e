//! The transform orchestrator.

use crate::context::CompilationContext;
use crate::diagnostic::Diagnostic;
use crate::error::CompileError;
use crate::paths;
use crate::store::{Asset, AssetStore, CSS_CONTENT_TYPE, JS_CONTENT_TYPE, SOURCE_MAP_CONTENT_TYPE};
use crate::strategy::OutputStrategy;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use smol_str::SmolStr;
use source_map::SourceMap;
use std::sync::Arc;

/// Store keys of the three artifacts of a CSS module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetKeys {
    /// The generated module, served under the stylesheet's own path.
    pub js: String,
    /// The processed stylesheet, under `/.virtual/`.
    pub css: String,
    /// The stylesheet's source map.
    pub map: String,
}

impl AssetKeys {
    /// Returns the keys for the module at `logical` (e.g. `/src/a.module.css`).
    pub fn for_module(logical: &str) -> Self {
        let css = paths::virtual_css_path(logical);
        Self {
            js: logical.to_string(),
            map: format!("{css}.map"),
            css,
        }
    }
}

/// Everything produced by compiling one CSS module.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// The absolute path of the stylesheet.
    pub file: Utf8PathBuf,
    /// Where the artifacts are stored.
    pub keys: AssetKeys,
    /// The generated JavaScript module.
    pub js: String,
    /// The processed stylesheet.
    pub css: String,
    /// The source map of `css`.
    pub map: SourceMap,
    /// Each declared class and the full class string it stands for.
    pub classes: IndexMap<SmolStr, String>,
    /// Stylesheets this one composes from or references with `:external`.
    pub dependencies: Vec<Utf8PathBuf>,
    /// Warnings, in report order.
    pub diagnostics: Vec<Diagnostic>,
}

impl TransformOutput {
    /// Returns the source map as JSON.
    pub fn map_json(&self) -> Result<String, CompileError> {
        Ok(source_map::to_json(&self.map)?)
    }

    /// Returns the three store entries for this output.
    pub fn assets(&self) -> Result<Vec<(String, Asset)>, CompileError> {
        let map = self.map_json()?;
        Ok(vec![
            (self.keys.js.clone(), Asset::new(JS_CONTENT_TYPE, &self.js)),
            (
                self.keys.css.clone(),
                Asset::new(CSS_CONTENT_TYPE, &self.css).with_source_map(map.clone()),
            ),
            (self.keys.map.clone(), Asset::new(SOURCE_MAP_CONTENT_TYPE, map)),
        ])
    }
}

/// Compiles CSS modules in one output mode and stores the results.
pub struct Transformer {
    context: CompilationContext,
    strategy: Box<dyn OutputStrategy>,
    store: Arc<dyn AssetStore>,
}

impl Transformer {
    /// Creates an orchestrator writing into `store`.
    pub fn new(
        context: CompilationContext,
        strategy: Box<dyn OutputStrategy>,
        store: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            context,
            strategy,
            store,
        }
    }

    /// The compilation context.
    pub fn context(&self) -> &CompilationContext {
        &self.context
    }

    /// The compilation context, mutably (e.g. to reset a file).
    pub fn context_mut(&mut self) -> &mut CompilationContext {
        &mut self.context
    }

    /// The asset store.
    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    /// Reads and compiles the stylesheet at `path`.
    pub fn transform_file(&mut self, path: &Utf8Path) -> Result<TransformOutput, CompileError> {
        let file = self.context.absolute_path(path);
        if !paths::is_module_stylesheet(&file) {
            return Err(CompileError::UnsupportedFile { path: file });
        }
        let source = std::fs::read_to_string(&file)?;
        self.transform_source(&file, &source)
    }

    /// Compiles `source` as the stylesheet at `path`.
    ///
    /// The three artifacts are written in one store update, replacing
    /// those of any earlier transform of the same file.
    pub fn transform_source(
        &mut self,
        path: &Utf8Path,
        source: &str,
    ) -> Result<TransformOutput, CompileError> {
        let output = self.context.transform(path, source, self.strategy.as_ref())?;
        self.store.put_all(output.assets()?);
        tracing::info!(
            js = %output.keys.js,
            css = %output.keys.css,
            map = %output.keys.map,
            "stored assets"
        );
        Ok(output)
    }
}
