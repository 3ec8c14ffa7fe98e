//! Configuration loading.

use camino::{Utf8Path, Utf8PathBuf};
use css_bundler::{BundleOptions, Chunk, FileNamer};
use css_modules::{NamerOptions, DEFAULT_RUNTIME_MODULE};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "cssmod.config.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Project configuration from `cssmod.config.json`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory, relative to the output, for chunk stylesheets.
    pub static_dir: String,
    /// URL prefix of the output directory.
    pub public_path: String,
    /// Post-processing configuration, relative to the root.
    pub config_path: Option<Utf8PathBuf>,
    /// Chunk file name template with `[name]` and `[hash]`.
    pub filename: Option<String>,
    pub sourcemap: bool,
    pub development: bool,
    pub file_hash_length: usize,
    pub selector_hash_length: usize,
    pub hash_start: usize,
    /// Module the loader output imports `useStylesheet` from.
    pub runtime_module: String,
    /// Chunk name to entry stylesheets, relative to the root.
    pub chunks: IndexMap<String, Vec<Utf8PathBuf>>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let namer = NamerOptions::default();
        Self {
            static_dir: String::new(),
            public_path: "/".to_string(),
            config_path: None,
            filename: None,
            sourcemap: true,
            development: namer.development,
            file_hash_length: namer.file_hash_len,
            selector_hash_length: namer.selector_hash_len,
            hash_start: namer.hash_start,
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            chunks: IndexMap::new(),
        }
    }
}

impl ProjectConfig {
    /// Loads the configuration for `root`.
    ///
    /// An explicit `path` must exist. Otherwise `<root>/cssmod.config.json`
    /// is used when present, and the defaults when not.
    pub fn load(root: &Utf8Path, path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) if path.is_relative() => root.join(path),
            Some(path) => path.to_owned(),
            None => {
                let default = root.join(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = serde_json::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
        tracing::debug!(%path, "loaded configuration");
        Ok(config)
    }

    /// Applies the `--dev` flag and the `CSSMOD_DEV` environment value.
    pub fn with_overrides(mut self, dev_flag: bool, dev_env: Option<&str>) -> Self {
        if let Some(dev) = dev_env.and_then(parse_bool) {
            self.development = dev;
        }
        if dev_flag {
            self.development = true;
        }
        self
    }

    /// Naming options for a project at `root`.
    pub fn namer_options(&self, root: &Utf8Path) -> NamerOptions {
        NamerOptions {
            root: root.to_owned(),
            file_hash_len: self.file_hash_length,
            selector_hash_len: self.selector_hash_length,
            hash_start: self.hash_start,
            development: self.development,
        }
    }

    /// Bundler options for a project at `root`.
    pub fn bundle_options(&self, root: &Utf8Path) -> BundleOptions {
        BundleOptions {
            namer: self.namer_options(root),
            static_dir: self.static_dir.clone(),
            public_path: self.public_path.clone(),
            file_namer: match &self.filename {
                Some(template) => FileNamer::Template(template.clone()),
                None => FileNamer::Default,
            },
            config_path: self.config_path.as_ref().map(|path| root.join(path)),
            sourcemap: self.sourcemap,
        }
    }

    /// The configured chunks.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.chunks
            .iter()
            .map(|(name, entries)| Chunk::new(name.clone(), entries.iter().cloned()))
            .collect()
    }
}

/// Parses a boolean environment value.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
