//! Composition resolution.
//!
//! A class resolves to the names of everything it composes, depth first in
//! declaration order, followed by its own name.

use crate::diagnostic::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::error::CompileError;
use crate::paths;
use crate::registry::{ClassRecord, ComposeRef, Overlay};
use camino::{Utf8Path, Utf8PathBuf};
use smol_str::SmolStr;

/// One term of the class string a generated module exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassPart {
    /// A final identifier of the current file.
    Local(String),
    /// The class `name` of the module generated for `from`.
    Import {
        /// The composed class.
        name: SmolStr,
        /// The module path as written in `composes`.
        from: String,
        /// The binding that module exports the class under.
        export: String,
    },
    /// A class that could not be found, kept literally.
    Unknown(SmolStr),
}

/// A resolved class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The binding the generated module exports the class under.
    pub export: String,
    /// Terms of the generated export, external compositions as imports.
    pub parts: Vec<ClassPart>,
    /// Every final identifier, external ones expanded, first occurrence kept.
    pub names: Vec<String>,
}

impl Resolved {
    /// Returns the names joined by spaces, as the class attribute value.
    pub fn joined(&self) -> String {
        self.names.join(" ")
    }
}

/// Resolves classes of the file being compiled.
pub struct Resolver<'a> {
    overlay: Overlay<'a>,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `overlay`, reporting unknown classes into
    /// `diagnostics`.
    pub fn new(overlay: Overlay<'a>, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            overlay,
            diagnostics,
        }
    }

    /// Resolves `class` of the current file.
    ///
    /// Unknown classes are reported and kept literally. A class that
    /// composes itself, directly or through other classes, is an error.
    pub fn resolve(&mut self, class: &str) -> Result<Resolved, CompileError> {
        let file = self.overlay.current_file();
        let Some(record) = self.overlay.current().get(class) else {
            return Ok(Resolved {
                export: crate::codegen::identifierfy(class),
                parts: vec![ClassPart::Unknown(SmolStr::new(class))],
                names: vec![class.to_string()],
            });
        };

        let mut parts = Vec::new();
        let mut stack = vec![SmolStr::new(class)];
        self.collect_parts(record, &mut stack, &mut parts)?;

        let mut names = Vec::new();
        let mut path = Vec::new();
        self.collect_names(file, class, &mut path, &mut names)?;

        Ok(Resolved {
            export: record.export.clone(),
            parts,
            names,
        })
    }

    fn collect_parts(
        &mut self,
        record: &ClassRecord,
        stack: &mut Vec<SmolStr>,
        parts: &mut Vec<ClassPart>,
    ) -> Result<(), CompileError> {
        let file = self.overlay.current_file();

        for compose in &record.composes {
            match compose {
                ComposeRef::Local { name, span } => match self.overlay.current().get(name) {
                    Some(target) => {
                        if stack.contains(name) {
                            return Err(self.local_cycle(stack, name));
                        }
                        stack.push(name.clone());
                        self.collect_parts(target, stack, parts)?;
                        stack.pop();
                    }
                    None => {
                        self.unknown(name, *span);
                        push_unique(parts, ClassPart::Unknown(name.clone()));
                    }
                },
                ComposeRef::External { name, from, span } => {
                    let target = paths::resolve_from(file, from);
                    match self.overlay.class(&target, name) {
                        Some(record) => push_unique(
                            parts,
                            ClassPart::Import {
                                name: name.clone(),
                                from: from.clone(),
                                export: record.export.clone(),
                            },
                        ),
                        None => {
                            self.unknown(name, *span);
                            push_unique(parts, ClassPart::Unknown(name.clone()));
                        }
                    }
                }
                ComposeRef::Global { name, .. } => {
                    push_unique(parts, ClassPart::Local(name.to_string()));
                }
            }
        }

        push_unique(parts, ClassPart::Local(record.name.clone()));
        Ok(())
    }

    fn collect_names(
        &self,
        file: &Utf8Path,
        class: &str,
        path: &mut Vec<(Utf8PathBuf, SmolStr)>,
        names: &mut Vec<String>,
    ) -> Result<(), CompileError> {
        let Some(record) = self.overlay.class(file, class) else {
            push_unique(names, class.to_string());
            return Ok(());
        };

        if path
            .iter()
            .any(|(seen_file, seen_class)| seen_file == file && seen_class == class)
        {
            let mut chain: Vec<String> = path
                .iter()
                .map(|(file, class)| format!("{file}:{class}"))
                .collect();
            chain.push(format!("{file}:{class}"));
            return Err(CompileError::CompositionCycle { chain });
        }

        path.push((file.to_owned(), SmolStr::new(class)));
        for compose in &record.composes {
            let target = match compose {
                ComposeRef::Local { .. } => file.to_owned(),
                ComposeRef::External { from, .. } => paths::resolve_from(file, from),
                ComposeRef::Global { name, .. } => {
                    push_unique(names, name.to_string());
                    continue;
                }
            };
            self.collect_names(&target, compose.name(), path, names)?;
        }
        path.pop();

        push_unique(names, record.name.clone());
        Ok(())
    }

    fn local_cycle(&self, stack: &[SmolStr], name: &SmolStr) -> CompileError {
        let file = self.overlay.current_file();
        let mut chain: Vec<String> = stack.iter().map(|class| format!("{file}:{class}")).collect();
        chain.push(format!("{file}:{name}"));
        CompileError::CompositionCycle { chain }
    }

    fn unknown(&mut self, name: &str, span: source_map::Span) {
        let file = self.overlay.current_file();
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::UnknownClass,
                format!("Unknown class \"{name}\""),
                file,
                span,
            )
            .with_word(name),
        );
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FileClasses, Registry};
    use pretty_assertions::assert_eq;
    use source_map::Span;

    fn local(name: &str) -> ComposeRef {
        ComposeRef::Local {
            name: name.into(),
            span: Span::default(),
        }
    }

    fn external(name: &str, from: &str) -> ComposeRef {
        ComposeRef::External {
            name: name.into(),
            from: from.to_string(),
            span: Span::default(),
        }
    }

    fn record(name: &str, composes: Vec<ComposeRef>) -> ClassRecord {
        ClassRecord {
            name: name.to_string(),
            export: name.to_lowercase(),
            composes,
        }
    }

    fn classes(records: Vec<(&str, ClassRecord)>) -> FileClasses {
        records
            .into_iter()
            .map(|(class, record)| (SmolStr::new(class), record))
            .collect()
    }

    #[test]
    fn test_class_without_composes_resolves_to_itself() {
        let registry = Registry::new();
        let file = Utf8PathBuf::from("/p/a.module.css");
        let pending = classes(vec![("a", record("A1", vec![]))]);
        let mut diagnostics = Diagnostics::new();
        let overlay = Overlay::new(&registry, &file, &pending);
        let mut resolver = Resolver::new(overlay, &mut diagnostics);

        let resolved = resolver.resolve("a").unwrap();
        assert_eq!(resolved.names, vec!["A1"]);
        assert_eq!(resolved.parts, vec![ClassPart::Local("A1".to_string())]);
    }

    #[test]
    fn test_composed_before_self() {
        let registry = Registry::new();
        let file = Utf8PathBuf::from("/p/a.module.css");
        let pending = classes(vec![
            ("a", record("A1", vec![local("b")])),
            ("b", record("B1", vec![])),
        ]);
        let mut diagnostics = Diagnostics::new();
        let overlay = Overlay::new(&registry, &file, &pending);
        let mut resolver = Resolver::new(overlay, &mut diagnostics);

        assert_eq!(resolver.resolve("a").unwrap().names, vec!["B1", "A1"]);
    }

    #[test]
    fn test_unknown_class_is_kept_with_warning() {
        let registry = Registry::new();
        let file = Utf8PathBuf::from("/p/a.module.css");
        let pending = classes(vec![("a", record("A1", vec![local("missing")]))]);
        let mut diagnostics = Diagnostics::new();
        let resolved = Resolver::new(Overlay::new(&registry, &file, &pending), &mut diagnostics)
            .resolve("a")
            .unwrap();

        assert_eq!(resolved.joined(), "missing A1");
        assert_eq!(
            resolved.parts,
            vec![
                ClassPart::Unknown("missing".into()),
                ClassPart::Local("A1".to_string())
            ]
        );
        assert_eq!(diagnostics.as_slice()[0].message, "Unknown class \"missing\"");
    }

    #[test]
    fn test_external_composition() {
        let mut registry = Registry::new();
        registry.insert(
            Utf8PathBuf::from("/p/b.module.css"),
            classes(vec![
                ("base", record("B1", vec![local("reset")])),
                ("reset", record("R1", vec![])),
            ]),
        );
        let file = Utf8PathBuf::from("/p/a.module.css");
        let pending = classes(vec![(
            "title",
            record("T1", vec![external("base", "./b.module.css")]),
        )]);
        let mut diagnostics = Diagnostics::new();
        let resolved = Resolver::new(Overlay::new(&registry, &file, &pending), &mut diagnostics)
            .resolve("title")
            .unwrap();

        assert_eq!(resolved.names, vec!["R1", "B1", "T1"]);
        assert_eq!(
            resolved.parts,
            vec![
                ClassPart::Import {
                    name: "base".into(),
                    from: "./b.module.css".to_string(),
                    export: "b1".to_string()
                },
                ClassPart::Local("T1".to_string())
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_external_file_not_in_registry_is_unknown() {
        let registry = Registry::new();
        let file = Utf8PathBuf::from("/p/a.module.css");
        let pending = classes(vec![(
            "title",
            record("T1", vec![external("base", "./b.module.css")]),
        )]);
        let mut diagnostics = Diagnostics::new();
        let resolved = Resolver::new(Overlay::new(&registry, &file, &pending), &mut diagnostics)
            .resolve("title")
            .unwrap();

        assert_eq!(resolved.names, vec!["base", "T1"]);
        assert_eq!(diagnostics.as_slice().len(), 1);
    }

    #[test]
    fn test_global_composition_is_kept_literally() {
        let registry = Registry::new();
        let file = Utf8PathBuf::from("/p/a.module.css");
        let pending = classes(vec![(
            "a",
            record(
                "A1",
                vec![ComposeRef::Global {
                    name: "clearfix".into(),
                    span: Span::default(),
                }],
            ),
        )]);
        let mut diagnostics = Diagnostics::new();
        let resolved = Resolver::new(Overlay::new(&registry, &file, &pending), &mut diagnostics)
            .resolve("a")
            .unwrap();

        assert_eq!(resolved.joined(), "clearfix A1");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_cycle_is_an_error() {
        let registry = Registry::new();
        let file = Utf8PathBuf::from("/p/a.module.css");
        let pending = classes(vec![
            ("a", record("A1", vec![local("b")])),
            ("b", record("B1", vec![local("a")])),
        ]);
        let mut diagnostics = Diagnostics::new();
        let err = Resolver::new(Overlay::new(&registry, &file, &pending), &mut diagnostics)
            .resolve("a")
            .unwrap_err();

        let CompileError::CompositionCycle { chain } = err else {
            panic!("expected a cycle error, got {err:?}");
        };
        assert_eq!(
            chain,
            vec![
                "/p/a.module.css:a",
                "/p/a.module.css:b",
                "/p/a.module.css:a"
            ]
        );
    }

    #[test]
    fn test_diamond_keeps_first_occurrence() {
        let registry = Registry::new();
        let file = Utf8PathBuf::from("/p/a.module.css");
        let pending = classes(vec![
            ("base", record("X1", vec![])),
            ("left", record("L1", vec![local("base")])),
            ("right", record("R1", vec![local("base")])),
            ("top", record("T1", vec![local("left"), local("right")])),
        ]);
        let mut diagnostics = Diagnostics::new();
        let resolved = Resolver::new(Overlay::new(&registry, &file, &pending), &mut diagnostics)
            .resolve("top")
            .unwrap();

        assert_eq!(resolved.names, vec!["X1", "L1", "R1", "T1"]);
    }
}
