//! Path helpers shared by the namer, the resolver and the orchestrator.
//!
//! All paths are handled lexically. Nothing here touches the file system,
//! so unsaved or virtual files resolve the same way as files on disk.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Suffixes that mark a stylesheet as a CSS module.
pub const MODULE_SUFFIXES: &[&str] = &[".module.css", ".modules.css"];

/// Prefix of the logical path under which processed stylesheets are served.
pub const VIRTUAL_PREFIX: &str = "/.virtual/";

/// Returns true if `path` names a CSS module stylesheet.
pub fn is_module_stylesheet(path: &Utf8Path) -> bool {
    MODULE_SUFFIXES
        .iter()
        .any(|suffix| path.as_str().ends_with(suffix))
}

/// Resolves `.` and `..` components without touching the file system.
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Utf8Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_str()),
        }
    }
    out
}

/// Makes `path` absolute against `root` and normalizes it.
pub fn absolutize(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&root.join(path))
    }
}

/// Returns `path` relative to `root`, with forward slashes.
///
/// Paths outside `root` get the `..` components a relative walk would need.
pub fn relative_to(root: &Utf8Path, path: &Utf8Path) -> String {
    let root = normalize(root);
    let path = normalize(path);

    let root_parts: Vec<_> = root.components().collect();
    let path_parts: Vec<_> = path.components().collect();
    let common = root_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..root_parts.len() {
        parts.push("..");
    }
    for component in &path_parts[common..] {
        parts.push(component.as_str());
    }
    parts.join("/")
}

/// Resolves a `from` path written inside `file` against its directory.
pub fn resolve_from(file: &Utf8Path, from: &str) -> Utf8PathBuf {
    let dir = file.parent().unwrap_or(Utf8Path::new(""));
    normalize(&dir.join(from))
}

/// Strips leading `..` components so a path cannot escape its base.
pub fn safe_relative_path(input: &str) -> String {
    let normalized = normalize(Utf8Path::new(input));
    let mut rest = normalized.as_str();
    while let Some(stripped) = rest.strip_prefix("..") {
        match stripped.chars().next() {
            None => return String::new(),
            Some('/') | Some('\\') => rest = &stripped[1..],
            Some(_) => break,
        }
    }
    rest.to_string()
}

/// Returns the logical path of a project file: `/` + its path under `root`.
pub fn logical_path(root: &Utf8Path, file: &Utf8Path) -> String {
    format!("/{}", safe_relative_path(&relative_to(root, file)))
}

/// Returns the virtual path of the stylesheet paired with a module.
///
/// `/src/app.module.css` becomes `/.virtual/src/app.css`.
pub fn virtual_css_path(logical: &str) -> String {
    let trimmed = logical.trim_start_matches('/');
    let stem = MODULE_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed);
    let stem = stem.strip_suffix(".css").unwrap_or(stem);
    format!("{VIRTUAL_PREFIX}{stem}.css")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Utf8Path::new("/a/b/../c/./d.css")), "/a/c/d.css");
        assert_eq!(normalize(Utf8Path::new("a/../../b")), "../b");
        assert_eq!(normalize(Utf8Path::new("/../a")), "/a");
    }

    #[test]
    fn test_relative_to() {
        let root = Utf8Path::new("/project");
        assert_eq!(
            relative_to(root, Utf8Path::new("/project/src/a.module.css")),
            "src/a.module.css"
        );
        assert_eq!(relative_to(root, Utf8Path::new("/other/b.css")), "../other/b.css");
    }

    #[test]
    fn test_resolve_from() {
        assert_eq!(
            resolve_from(Utf8Path::new("/p/src/a.module.css"), "../shared/b.module.css"),
            "/p/shared/b.module.css"
        );
        assert_eq!(
            resolve_from(Utf8Path::new("/p/src/a.module.css"), "./b.module.css"),
            "/p/src/b.module.css"
        );
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(safe_relative_path("../../etc/passwd"), "etc/passwd");
        assert_eq!(safe_relative_path("src/../a.css"), "a.css");
        assert_eq!(safe_relative_path(".."), "");
        assert_eq!(safe_relative_path("..foo/a.css"), "..foo/a.css");
    }

    #[test]
    fn test_virtual_css_path() {
        assert_eq!(virtual_css_path("/src/app.module.css"), "/.virtual/src/app.css");
        assert_eq!(virtual_css_path("/src/app.modules.css"), "/.virtual/src/app.css");
        assert_eq!(virtual_css_path("plain.css"), "/.virtual/plain.css");
    }

    #[test]
    fn test_module_suffix() {
        assert!(is_module_stylesheet(Utf8Path::new("a.module.css")));
        assert!(is_module_stylesheet(Utf8Path::new("a.modules.css")));
        assert!(!is_module_stylesheet(Utf8Path::new("a.css")));
    }
}
