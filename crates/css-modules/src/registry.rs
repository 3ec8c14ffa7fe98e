//! The class registry shared by all transforms of one compilation.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use source_map::Span;

/// A reference from one class to a class it composes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeRef {
    /// `composes: name;`
    Local {
        /// The composed class.
        name: SmolStr,
        /// The `composes` declaration.
        span: Span,
    },
    /// `composes: name from './other.module.css';`
    External {
        /// The composed class.
        name: SmolStr,
        /// The path as written, relative to the composing file.
        from: String,
        /// The `composes` declaration.
        span: Span,
    },
    /// `composes: name from global;`, a class kept as written.
    Global {
        /// The class name.
        name: SmolStr,
        /// The `composes` declaration.
        span: Span,
    },
}

impl ComposeRef {
    /// Returns the composed class name.
    pub fn name(&self) -> &str {
        match self {
            ComposeRef::Local { name, .. }
            | ComposeRef::External { name, .. }
            | ComposeRef::Global { name, .. } => name,
        }
    }

    /// Returns the span of the declaration that introduced the reference.
    pub fn span(&self) -> Span {
        match self {
            ComposeRef::Local { span, .. }
            | ComposeRef::External { span, .. }
            | ComposeRef::Global { span, .. } => *span,
        }
    }
}

/// A declared class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    /// The final identifier handed out by the namer.
    pub name: String,
    /// The binding the generated module exports the class under.
    ///
    /// Unique within the file, so `nav-item` and `navItem` become `navItem`
    /// and `navItem$2`. Other modules import the class by this name.
    pub export: String,
    /// Composed classes, in declaration order.
    pub composes: Vec<ComposeRef>,
}

impl ClassRecord {
    /// Creates a record with no compositions.
    pub fn new(name: impl Into<String>, export: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            export: export.into(),
            composes: Vec::new(),
        }
    }
}

/// The classes of one file, in declaration order.
pub type FileClasses = IndexMap<SmolStr, ClassRecord>;

/// File path to declared classes.
///
/// Paths are absolute and normalized. A file's entry is replaced wholesale
/// every time the file is transformed.
#[derive(Debug, Default)]
pub struct Registry {
    files: FxHashMap<Utf8PathBuf, FileClasses>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the classes of `file`, if it has been transformed.
    pub fn file(&self, file: &Utf8Path) -> Option<&FileClasses> {
        self.files.get(file)
    }

    /// Returns one class of `file`.
    pub fn class(&self, file: &Utf8Path, class: &str) -> Option<&ClassRecord> {
        self.files.get(file)?.get(class)
    }

    /// Returns true if `file` has an entry.
    pub fn contains(&self, file: &Utf8Path) -> bool {
        self.files.contains_key(file)
    }

    /// Replaces the entry of `file`, returning the previous one.
    pub fn insert(&mut self, file: Utf8PathBuf, classes: FileClasses) -> Option<FileClasses> {
        self.files.insert(file, classes)
    }

    /// Removes the entry of `file`.
    pub fn remove(&mut self, file: &Utf8Path) -> Option<FileClasses> {
        self.files.remove(file)
    }

    /// Returns the number of files with an entry.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no file has an entry.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A read view of the registry with one file's uncommitted classes on top.
///
/// Resolution and renaming during a transform see the file being compiled
/// through this view, so the registry itself is only touched once the
/// transform has succeeded.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    registry: &'a Registry,
    file: &'a Utf8Path,
    pending: &'a FileClasses,
}

impl<'a> Overlay<'a> {
    /// Creates a view where `file` has the classes `pending`.
    pub fn new(registry: &'a Registry, file: &'a Utf8Path, pending: &'a FileClasses) -> Self {
        Self {
            registry,
            file,
            pending,
        }
    }

    /// The file being compiled.
    pub fn current_file(&self) -> &'a Utf8Path {
        self.file
    }

    /// The classes of the file being compiled.
    pub fn current(&self) -> &'a FileClasses {
        self.pending
    }

    /// Returns the classes of `file`.
    pub fn file(&self, file: &Utf8Path) -> Option<&'a FileClasses> {
        if file == self.file {
            Some(self.pending)
        } else {
            self.registry.file(file)
        }
    }

    /// Returns one class of `file`.
    pub fn class(&self, file: &Utf8Path, class: &str) -> Option<&'a ClassRecord> {
        self.file(file)?.get(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_prefers_pending() {
        let mut registry = Registry::new();
        let file = Utf8PathBuf::from("/p/a.module.css");
        let mut old = FileClasses::new();
        old.insert("old".into(), ClassRecord::new("X1", "old"));
        registry.insert(file.clone(), old);

        let mut pending = FileClasses::new();
        pending.insert("new".into(), ClassRecord::new("Y1", "new"));
        let overlay = Overlay::new(&registry, &file, &pending);

        assert!(overlay.class(&file, "old").is_none());
        assert_eq!(overlay.class(&file, "new").map(|r| r.name.as_str()), Some("Y1"));
        assert!(registry.class(&file, "old").is_some());
    }
}
