//! Stylesheet dependency graph.
//!
//! Files are read and scanned for dependencies in parallel, one breadth of
//! the graph at a time. The compile order is then a depth-first post-order
//! walk from the entries, so every file comes after the files it composes
//! from.

use crate::error::BundleError;
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

/// A loaded stylesheet.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// The stylesheet text.
    pub source: String,
    /// Stylesheets it references, absolute.
    pub dependencies: Vec<Utf8PathBuf>,
}

/// Every stylesheet reachable from the entries seen so far.
#[derive(Debug, Default)]
pub struct Graph {
    files: FxHashMap<Utf8PathBuf, SourceFile>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a loaded file.
    pub fn file(&self, path: &Utf8Path) -> Option<&SourceFile> {
        self.files.get(path)
    }

    /// Loads `entries` and everything they reach.
    pub fn load(&mut self, entries: &[Utf8PathBuf]) -> Result<(), BundleError> {
        let mut frontier: Vec<Utf8PathBuf> = entries
            .iter()
            .filter(|path| !self.files.contains_key(*path))
            .cloned()
            .collect();
        frontier.sort();
        frontier.dedup();

        while !frontier.is_empty() {
            let loaded: Vec<(Utf8PathBuf, SourceFile)> = frontier
                .par_iter()
                .map(|path| load_file(path).map(|file| (path.clone(), file)))
                .collect::<Result<_, _>>()?;

            let mut next = FxHashSet::default();
            for (path, file) in loaded {
                for dep in &file.dependencies {
                    if !self.files.contains_key(dep) && *dep != path {
                        next.insert(dep.clone());
                    }
                }
                self.files.insert(path, file);
            }
            frontier = next
                .into_iter()
                .filter(|path| !self.files.contains_key(path))
                .collect();
            frontier.sort();
        }
        Ok(())
    }

    /// Returns the compile order for `entries`: dependencies first, each
    /// file once. An edge that closes a cycle is skipped.
    pub fn order(&self, entries: &[Utf8PathBuf]) -> Vec<Utf8PathBuf> {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        for entry in entries {
            self.visit(entry, &mut visited, &mut order);
        }
        order
    }

    fn visit(
        &self,
        path: &Utf8Path,
        visited: &mut FxHashSet<Utf8PathBuf>,
        order: &mut Vec<Utf8PathBuf>,
    ) {
        if !visited.insert(path.to_owned()) {
            return;
        }
        if let Some(file) = self.files.get(path) {
            for dep in &file.dependencies {
                self.visit(dep, visited, order);
            }
        }
        order.push(path.to_owned());
    }
}

fn load_file(path: &Utf8Path) -> Result<SourceFile, BundleError> {
    let source = std::fs::read_to_string(path).map_err(|source| BundleError::Read {
        path: path.to_owned(),
        source,
    })?;
    let dependencies = css_modules::scan_dependencies(path, &source)?;
    tracing::trace!(%path, dependencies = dependencies.len(), "loaded stylesheet");
    Ok(SourceFile {
        source,
        dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph(edges: &[(&str, &[&str])]) -> Graph {
        let mut graph = Graph::new();
        for (path, deps) in edges {
            graph.files.insert(
                Utf8PathBuf::from(*path),
                SourceFile {
                    source: String::new(),
                    dependencies: deps.iter().map(Utf8PathBuf::from).collect(),
                },
            );
        }
        graph
    }

    fn order(graph: &Graph, entries: &[&str]) -> Vec<String> {
        let entries: Vec<Utf8PathBuf> = entries.iter().map(Utf8PathBuf::from).collect();
        graph
            .order(&entries)
            .into_iter()
            .map(Utf8PathBuf::into_string)
            .collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let graph = graph(&[("/a", &["/b", "/c"]), ("/b", &["/c"]), ("/c", &[])]);
        assert_eq!(order(&graph, &["/a"]), vec!["/c", "/b", "/a"]);
    }

    #[test]
    fn test_shared_dependency_is_listed_once() {
        let graph = graph(&[("/a", &["/s"]), ("/b", &["/s"]), ("/s", &[])]);
        assert_eq!(order(&graph, &["/a", "/b"]), vec!["/s", "/a", "/b"]);
    }

    #[test]
    fn test_cycle_edge_is_skipped() {
        let graph = graph(&[("/a", &["/b"]), ("/b", &["/a"])]);
        assert_eq!(order(&graph, &["/a"]), vec!["/b", "/a"]);
    }
}
