//! Compilation state shared by the transforms of one project.

use crate::collect::collect;
use crate::codegen;
use crate::diagnostic::Diagnostics;
use crate::error::CompileError;
use crate::namer::{Namer, NamerOptions};
use crate::paths;
use crate::registry::{Overlay, Registry};
use crate::rename::rename;
use crate::resolve::{Resolved, Resolver};
use crate::strategy::OutputStrategy;
use crate::stylesheet::{self, Locator, PrintOptions};
use crate::transform::{AssetKeys, TransformOutput};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use smol_str::SmolStr;

/// The namer and class registry of one project.
///
/// Contexts are independent: classes registered in one are invisible to
/// another. [`CompilationContext::transform`] takes `&mut self`, so a file's
/// collect, resolve and rename passes never interleave with another
/// transform on the same context.
#[derive(Debug)]
pub struct CompilationContext {
    namer: Namer,
    registry: Registry,
}

impl CompilationContext {
    /// Creates a context with an empty registry.
    pub fn new(options: NamerOptions) -> Self {
        Self {
            namer: Namer::new(options),
            registry: Registry::new(),
        }
    }

    /// The project root.
    pub fn root(&self) -> &Utf8Path {
        &self.namer.options().root
    }

    /// The class registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Makes `path` absolute against the project root.
    pub fn absolute_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        paths::absolutize(self.root(), path)
    }

    /// Forgets the classes of `file`. Returns true if it had an entry.
    pub fn reset(&mut self, file: &Utf8Path) -> bool {
        let file = self.absolute_path(file);
        self.registry.remove(&file).is_some()
    }

    /// Compiles one CSS module.
    ///
    /// On success the file's registry entry is replaced with the classes
    /// just collected. On failure the registry is left as it was.
    pub fn transform(
        &mut self,
        path: &Utf8Path,
        source: &str,
        strategy: &dyn OutputStrategy,
    ) -> Result<TransformOutput, CompileError> {
        let file = self.absolute_path(path);
        if !paths::is_module_stylesheet(&file) {
            return Err(CompileError::UnsupportedFile { path: file });
        }

        let logical = paths::logical_path(self.root(), &file);
        let keys = AssetKeys::for_module(&logical);
        let _span = tracing::debug_span!("transform", file = %logical, mode = %strategy.mode())
            .entered();

        let mut sheet = stylesheet::parse(source, &logical, &file)?;
        let locator = Locator::new(source);

        let mut diagnostics = Diagnostics::new();
        let collected = collect(&sheet, &locator, &file, &mut self.namer, &mut diagnostics)?;
        let overlay = Overlay::new(&self.registry, &file, &collected.classes);

        let mut resolved: IndexMap<SmolStr, Resolved> = IndexMap::new();
        {
            let mut resolver = Resolver::new(overlay, &mut diagnostics);
            for class in collected.classes.keys() {
                resolved.insert(class.clone(), resolver.resolve(class)?);
            }
        }

        rename(&mut sheet, &locator, overlay, &mut diagnostics);

        let printed = stylesheet::print(
            sheet,
            PrintOptions {
                output: Some(&keys.css),
                source_name: &logical,
                original: source,
            },
            &file,
        )?;
        let js = codegen::generate(&resolved, strategy, &keys.css);

        let classes = resolved
            .iter()
            .map(|(class, resolved)| (class.clone(), resolved.joined()))
            .collect();
        let dependencies = collected.dependencies.iter().cloned().collect();

        tracing::debug!(
            classes = collected.classes.len(),
            warnings = diagnostics.as_slice().len(),
            "compiled"
        );
        self.registry.insert(file.clone(), collected.classes);

        Ok(TransformOutput {
            file,
            keys,
            js,
            css: printed.css,
            map: printed.map,
            classes,
            dependencies,
            diagnostics: diagnostics.into_vec(),
        })
    }
}
