//! Storage for generated assets.

use rustc_hash::FxHashMap;
use std::sync::{PoisonError, RwLock};

/// Content type of generated modules.
pub const JS_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";
/// Content type of processed stylesheets.
pub const CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";
/// Content type of source maps.
pub const SOURCE_MAP_CONTENT_TYPE: &str = "text/sourceMap";

/// A generated file served under a logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// The `Content-Type` to serve the body with.
    pub content_type: String,
    /// The file contents.
    pub body: String,
    /// The source map of `body`, as JSON.
    pub source_map: Option<String>,
}

impl Asset {
    /// Creates an asset without a source map.
    pub fn new(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
            source_map: None,
        }
    }

    /// Attaches a source map.
    pub fn with_source_map(mut self, source_map: impl Into<String>) -> Self {
        self.source_map = Some(source_map.into());
        self
    }
}

/// Key-value storage for assets, shared between threads.
///
/// Writes replace existing entries. Entries are never deleted.
pub trait AssetStore: Send + Sync {
    /// Returns the asset stored under `key`.
    fn get(&self, key: &str) -> Option<Asset>;

    /// Stores all `assets` at once; readers see either none or all of them.
    fn put_all(&self, assets: Vec<(String, Asset)>);

    /// Returns all keys, sorted.
    fn keys(&self) -> Vec<String>;
}

/// An in-memory [`AssetStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    assets: RwLock<FxHashMap<String, Asset>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Asset> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        assets.get(key).cloned()
    }

    fn put_all(&self, assets: Vec<(String, Asset)>) {
        let mut store = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        store.extend(assets);
    }

    fn keys(&self) -> Vec<String> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = assets.keys().cloned().collect();
        keys.sort();
        keys
    }
}
