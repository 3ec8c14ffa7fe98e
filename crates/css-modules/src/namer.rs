//! Deterministic class names.
//!
//! A class is named by two short base-36 hashes: one of the stylesheet path
//! relative to the project root, and one of `path:class`. Names are kept
//! short, so every new name is checked against all names handed out so far
//! and a clash is reported instead of silently merging two classes.

use crate::paths;
use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Hex digits available in a BLAKE3 digest.
const DIGEST_HEX_LEN: usize = 64;

/// The longest hash slice that still fits in a `u64`.
const MAX_HASH_LEN: usize = 16;

/// Replacements for a leading digit, indexed by the digit.
const LEADING_DIGIT_CHARS: &[u8; 10] = b"ABCDEFGHIJ";

/// Options for [`Namer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamerOptions {
    /// The project root; stylesheet paths are hashed relative to it.
    pub root: Utf8PathBuf,
    /// Hex digits taken for the file part of a name.
    pub file_hash_len: usize,
    /// Hex digits taken for the class part of a name.
    pub selector_hash_len: usize,
    /// Offset of the first hex digit taken from the digest.
    pub hash_start: usize,
    /// Prefix names with the file stem and class name for readability.
    pub development: bool,
}

impl Default for NamerOptions {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            file_hash_len: 3,
            selector_hash_len: 3,
            hash_start: 0,
            development: false,
        }
    }
}

/// Two different classes were given the same name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "class name hash `{identifier}` collides for `{key}` and `{existing}`; \
     increase fileHashLength/selectorHashLength, change hashStart, or rename the class"
)]
pub struct NamingCollision {
    /// The clashing identifier.
    pub identifier: String,
    /// The key being named.
    pub key: String,
    /// The key that already owns the identifier.
    pub existing: String,
}

/// Hands out deterministic, collision-checked class names.
///
/// Names are cached per `(file, class)` and never evicted, so naming the same
/// class twice always yields the same result.
#[derive(Debug)]
pub struct Namer {
    options: NamerOptions,
    by_key: FxHashMap<String, String>,
    by_identifier: FxHashMap<String, String>,
}

impl Namer {
    /// Creates a namer.
    ///
    /// Hash lengths are clamped to `1..=16` and the start offset so the
    /// slice stays inside the digest.
    pub fn new(mut options: NamerOptions) -> Self {
        options.file_hash_len = options.file_hash_len.clamp(1, MAX_HASH_LEN);
        options.selector_hash_len = options.selector_hash_len.clamp(1, MAX_HASH_LEN);
        let longest = options.file_hash_len.max(options.selector_hash_len);
        options.hash_start = options.hash_start.min(DIGEST_HEX_LEN - longest);
        Self {
            options,
            by_key: FxHashMap::default(),
            by_identifier: FxHashMap::default(),
        }
    }

    /// Returns the options in effect.
    pub fn options(&self) -> &NamerOptions {
        &self.options
    }

    /// Returns the final class name for `class` declared in `file`.
    pub fn name(&mut self, file: &Utf8Path, class: &str) -> Result<String, NamingCollision> {
        let identifier = self.identifier(file, class)?;
        if self.options.development {
            Ok(format!("{}_{class}_{identifier}", sanitize_stem(file)))
        } else {
            Ok(identifier)
        }
    }

    fn identifier(&mut self, file: &Utf8Path, class: &str) -> Result<String, NamingCollision> {
        let base = paths::relative_to(&self.options.root, file);
        let key = format!("{base}:{class}");

        if let Some(identifier) = self.by_key.get(&key) {
            return Ok(identifier.clone());
        }

        let mut identifier = self.hash(&base, self.options.file_hash_len);
        identifier.push_str(&self.hash(&key, self.options.selector_hash_len));
        let identifier = replace_leading_digit(identifier);

        if let Some(existing) = self.by_identifier.get(&identifier) {
            return Err(NamingCollision {
                identifier,
                key,
                existing: existing.clone(),
            });
        }

        tracing::trace!(%key, %identifier, "named class");
        self.by_identifier.insert(identifier.clone(), key.clone());
        self.by_key.insert(key, identifier.clone());
        Ok(identifier)
    }

    /// Hashes `input` and renders `len` hex digits of the digest in base 36.
    fn hash(&self, input: &str, len: usize) -> String {
        let digest = blake3::hash(input.as_bytes()).to_hex();
        let start = self.options.hash_start;
        let slice = &digest.as_str()[start..start + len];
        let value = u64::from_str_radix(slice, 16).unwrap_or_default();
        to_base36(value)
    }
}

fn replace_leading_digit(identifier: String) -> String {
    let mut bytes = identifier.into_bytes();
    if let Some(first) = bytes.first_mut() {
        if first.is_ascii_digit() {
            *first = LEADING_DIGIT_CHARS[(*first - b'0') as usize];
        }
    }
    // Only ASCII bytes were swapped for ASCII bytes.
    String::from_utf8(bytes).unwrap_or_default()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// The file name without its last extension, minus `: / \ .` and spaces.
fn sanitize_stem(file: &Utf8Path) -> String {
    file.file_stem()
        .unwrap_or_default()
        .chars()
        .filter(|c| !matches!(c, ':' | '/' | '\\' | ' ' | '.'))
        .collect()
}
