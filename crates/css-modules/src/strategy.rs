//! Output modes of the generated JavaScript module.

use crate::codegen::js_string;
use smol_str::SmolStr;
use std::fmt;

/// Default module that provides the stylesheet collection hook.
pub const DEFAULT_RUNTIME_MODULE: &str = "cssmod/runtime";

/// How the generated module exposes the stylesheet to its importers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    /// The module adopts the stylesheet into the document itself.
    #[default]
    Standalone,
    /// Class accessors report the stylesheet to a render-time collector.
    ModuleLoader,
    /// Plain exports; a bundler collects the stylesheets.
    Bundler,
}

impl OutputMode {
    /// Returns the mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Standalone => "standalone",
            OutputMode::ModuleLoader => "loader",
            OutputMode::Bundler => "bundler",
        }
    }

    /// Builds the strategy for this mode.
    pub fn strategy(self, runtime_module: &str) -> Box<dyn OutputStrategy> {
        match self {
            OutputMode::Standalone => Box::new(Standalone),
            OutputMode::ModuleLoader => Box::new(ModuleLoader::new(runtime_module)),
            OutputMode::Bundler => Box::new(Bundler),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode-specific parts of a generated module.
pub trait OutputStrategy: fmt::Debug + Send + Sync {
    /// The mode this strategy implements.
    fn mode(&self) -> OutputMode;

    /// Lines emitted before the composition imports.
    fn prelude(&self, css_path: &str) -> Vec<String>;

    /// The default export, given `(class, export identifier)` pairs in
    /// declaration order.
    fn default_export(&self, css_path: &str, exports: &[(SmolStr, String)]) -> String;
}

fn plain_default_export(exports: &[(SmolStr, String)]) -> String {
    let entries: Vec<String> = exports
        .iter()
        .map(|(class, ident)| format!("{}:{ident}", js_string(class)))
        .collect();
    format!("export default {{{}}};", entries.join(","))
}

/// Imports the stylesheet as a constructable stylesheet and adopts it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standalone;

impl OutputStrategy for Standalone {
    fn mode(&self) -> OutputMode {
        OutputMode::Standalone
    }

    fn prelude(&self, css_path: &str) -> Vec<String> {
        vec![
            format!(
                "import __styles from {} assert {{ type: 'css' }};",
                js_string(css_path)
            ),
            "document.adoptedStyleSheets = [...document.adoptedStyleSheets, __styles];".to_string(),
        ]
    }

    fn default_export(&self, _css_path: &str, exports: &[(SmolStr, String)]) -> String {
        plain_default_export(exports)
    }
}

/// Exposes classes through getters that record the stylesheet as used.
///
/// The runtime module must export `useStylesheet(path)`, which adds `path`
/// to the stylesheets of the render in progress.
#[derive(Debug, Clone)]
pub struct ModuleLoader {
    runtime_module: String,
}

impl ModuleLoader {
    /// Creates the strategy, importing the hook from `runtime_module`.
    pub fn new(runtime_module: impl Into<String>) -> Self {
        Self {
            runtime_module: runtime_module.into(),
        }
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME_MODULE)
    }
}

impl OutputStrategy for ModuleLoader {
    fn mode(&self) -> OutputMode {
        OutputMode::ModuleLoader
    }

    fn prelude(&self, _css_path: &str) -> Vec<String> {
        vec![format!(
            "import {{ useStylesheet as __useStylesheet }} from {};",
            js_string(&self.runtime_module)
        )]
    }

    fn default_export(&self, css_path: &str, exports: &[(SmolStr, String)]) -> String {
        let path = js_string(css_path);
        let mut out = String::from("export default {\n");
        for (class, ident) in exports {
            out.push_str(&format!(
                "  get {}() {{ __useStylesheet({path}); return {ident}; }},\n",
                js_string(class)
            ));
        }
        out.push_str("};");
        out
    }
}

/// Side-effect free exports for bundling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bundler;

impl OutputStrategy for Bundler {
    fn mode(&self) -> OutputMode {
        OutputMode::Bundler
    }

    fn prelude(&self, _css_path: &str) -> Vec<String> {
        Vec::new()
    }

    fn default_export(&self, _css_path: &str, exports: &[(SmolStr, String)]) -> String {
        plain_default_export(exports)
    }
}
