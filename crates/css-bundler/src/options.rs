//! Bundler options.

use camino::Utf8PathBuf;
use css_modules::NamerOptions;
use std::fmt;
use std::sync::Arc;

/// Chooses the file name of an emitted chunk stylesheet.
#[derive(Clone, Default)]
pub enum FileNamer {
    /// `<chunk>.<hash>.css`
    #[default]
    Default,
    /// A template where `[name]` is the chunk name and `[hash]` the hash.
    Template(String),
    /// A function of the chunk name and the hash.
    Custom(Arc<dyn Fn(&str, &str) -> String + Send + Sync>),
}

impl FileNamer {
    /// Returns the file name for chunk `name` with content hash `hash`.
    pub fn file_name(&self, name: &str, hash: &str) -> String {
        match self {
            FileNamer::Default => format!("{name}.{hash}.css"),
            FileNamer::Template(template) => {
                template.replace("[name]", name).replace("[hash]", hash)
            }
            FileNamer::Custom(f) => f(name, hash),
        }
    }
}

impl fmt::Debug for FileNamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileNamer::Default => f.write_str("Default"),
            FileNamer::Template(template) => f.debug_tuple("Template").field(template).finish(),
            FileNamer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Options for [`crate::StylesheetBundler`].
#[derive(Debug, Clone)]
pub struct BundleOptions {
    /// Naming options, including the project root.
    pub namer: NamerOptions,
    /// Directory, relative to the output, that receives chunk stylesheets.
    pub static_dir: String,
    /// URL prefix under which the output directory is served.
    pub public_path: String,
    /// How chunk stylesheets are named.
    pub file_namer: FileNamer,
    /// JSON file listing post-processing plugins.
    pub config_path: Option<Utf8PathBuf>,
    /// Append a `sourceMappingURL` comment to each chunk stylesheet.
    pub sourcemap: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            namer: NamerOptions::default(),
            static_dir: String::new(),
            public_path: "/".to_string(),
            file_namer: FileNamer::Default,
            config_path: None,
            sourcemap: true,
        }
    }
}

/// Joins URL segments with single slashes, keeping a leading slash.
pub(crate) fn url_join(parts: &[&str]) -> String {
    let leading = parts.first().is_some_and(|first| first.starts_with('/'));
    let joined = parts
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if leading {
        format!("/{joined}")
    } else {
        joined
    }
}
