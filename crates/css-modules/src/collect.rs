//! First pass: collect declared classes and their compositions.

use crate::codegen::{identifierfy, reserved_bindings, unique};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::error::CompileError;
use crate::namer::Namer;
use crate::paths;
use crate::registry::{ClassRecord, ComposeRef, FileClasses};
use crate::stylesheet::{self, Locator, Sheet};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use lightningcss::properties::css_modules::Specifier;
use lightningcss::properties::custom::{Token, TokenList, TokenOrValue};
use lightningcss::properties::Property;
use lightningcss::rules::style::StyleRule;
use lightningcss::rules::CssRule;
use lightningcss::selector::{Component, PseudoClass, Selector, SelectorList};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use source_map::Span;

/// The result of collecting one stylesheet.
#[derive(Debug, Default)]
pub struct Collected {
    /// Declared classes in declaration order.
    pub classes: FileClasses,
    /// Other stylesheets referenced through `composes ... from` or
    /// `:external(...)`, absolute and in first-reference order.
    pub dependencies: IndexSet<Utf8PathBuf>,
}

/// Collects the classes of a stylesheet.
///
/// Every class gets its final name from `namer` the first time it is seen,
/// and its export binding from the classes declared before it.
pub fn collect(
    sheet: &Sheet<'_>,
    locator: &Locator<'_>,
    file: &Utf8Path,
    namer: &mut Namer,
    diagnostics: &mut Diagnostics,
) -> Result<Collected, CompileError> {
    let mut collector = Collector {
        file,
        locator,
        namer,
        diagnostics,
        exports: reserved_bindings(),
        out: Collected::default(),
    };
    collector.rules(&sheet.rules.0, None)?;
    Ok(collector.out)
}

struct Collector<'a> {
    file: &'a Utf8Path,
    locator: &'a Locator<'a>,
    namer: &'a mut Namer,
    diagnostics: &'a mut Diagnostics,
    exports: FxHashSet<String>,
    out: Collected,
}

impl Collector<'_> {
    /// Walks `rules`; `parent` holds the classes `&` stands for, if they are
    /// all plain classes.
    fn rules(
        &mut self,
        rules: &[CssRule<'_>],
        parent: Option<&[SmolStr]>,
    ) -> Result<(), CompileError> {
        for rule in rules {
            match rule {
                CssRule::Style(style) => self.style_rule(style, parent)?,
                other => {
                    if let Some(children) = stylesheet::nested_rules(other) {
                        self.rules(children, parent)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn style_rule(
        &mut self,
        style: &StyleRule<'_>,
        parent: Option<&[SmolStr]>,
    ) -> Result<(), CompileError> {
        let span = self.locator.span(style.loc);
        for selector in style.selectors.0.iter() {
            self.selector(selector, &style.selectors, span)?;
        }

        let own = simple_classes(&style.selectors, parent);
        let composes = composes_values(style);
        if !composes.is_empty() {
            let Some(targets) = own.as_deref() else {
                return Err(CompileError::ComposesOnComplexSelector {
                    file: self.file.to_owned(),
                    span,
                    word: stylesheet::selector_text(&style.selectors),
                });
            };
            for value in composes {
                self.composes(value, targets, span);
            }
        }

        self.rules(&style.rules.0, own.as_deref())
    }

    fn selector(
        &mut self,
        selector: &Selector<'_>,
        list: &SelectorList<'_>,
        span: Span,
    ) -> Result<(), CompileError> {
        for component in selector.iter_raw_parse_order_from(0) {
            match component {
                Component::Class(ident) => self.add_class(ident.as_ref())?,
                Component::NonTSPseudoClass(PseudoClass::CustomFunction { name, arguments })
                    if name.as_ref().eq_ignore_ascii_case("external") =>
                {
                    let Some(target) = external_target(arguments) else {
                        return Err(CompileError::ExternalFormat {
                            file: self.file.to_owned(),
                            span,
                            word: stylesheet::selector_text(list),
                        });
                    };
                    self.out
                        .dependencies
                        .insert(paths::resolve_from(self.file, &target.from));
                }
                Component::Negation(inner)
                | Component::Is(inner)
                | Component::Where(inner)
                | Component::Has(inner)
                | Component::Any(_, inner) => {
                    for selector in inner.iter() {
                        self.selector(selector, list, span)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn add_class(&mut self, class: &str) -> Result<(), CompileError> {
        if !self.out.classes.contains_key(class) {
            let name = self.namer.name(self.file, class)?;
            let export = unique(identifierfy(class), &mut self.exports);
            self.out
                .classes
                .insert(SmolStr::new(class), ClassRecord::new(name, export));
        }
        Ok(())
    }

    fn composes(&mut self, value: ComposesValue, targets: &[SmolStr], span: Span) {
        if let ComposesFrom::File(from) = &value.from {
            self.out
                .dependencies
                .insert(paths::resolve_from(self.file, from));
        }

        for raw in &value.classes {
            let name = match raw.strip_prefix('.') {
                Some(stripped) => {
                    self.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::ComposesLeadingDot,
                            "composes should specify class names without dots",
                            self.file,
                            span,
                        )
                        .with_word(raw.as_str()),
                    );
                    stripped
                }
                None => raw.as_str(),
            };
            if name.is_empty() {
                continue;
            }

            let name = SmolStr::new(name);
            let compose = match &value.from {
                ComposesFrom::File(from) => ComposeRef::External {
                    name,
                    from: from.clone(),
                    span,
                },
                ComposesFrom::Global => ComposeRef::Global { name, span },
                ComposesFrom::Local => ComposeRef::Local { name, span },
            };
            for target in targets {
                if let Some(record) = self.out.classes.get_mut(target) {
                    record.composes.push(compose.clone());
                }
            }
        }
    }
}

/// Lists the stylesheets `source` references, without naming any class.
///
/// Used to order files before compiling them. Malformed `:external(...)`
/// selectors are skipped here and reported by [`collect`].
pub fn scan_dependencies(
    file: &Utf8Path,
    source: &str,
) -> Result<Vec<Utf8PathBuf>, CompileError> {
    let sheet = stylesheet::parse(source, file.as_str(), file)?;
    let mut found = IndexSet::new();
    scan_rules(&sheet.rules.0, file, &mut found);
    Ok(found.into_iter().collect())
}

fn scan_rules(rules: &[CssRule<'_>], file: &Utf8Path, found: &mut IndexSet<Utf8PathBuf>) {
    for rule in rules {
        let CssRule::Style(style) = rule else {
            if let Some(children) = stylesheet::nested_rules(rule) {
                scan_rules(children, file, found);
            }
            continue;
        };
        for selector in style.selectors.0.iter() {
            external_dependencies(selector, file, found);
        }
        for value in composes_values(style) {
            if let ComposesFrom::File(from) = value.from {
                found.insert(paths::resolve_from(file, &from));
            }
        }
        scan_rules(&style.rules.0, file, found);
    }
}

fn external_dependencies(
    selector: &Selector<'_>,
    file: &Utf8Path,
    found: &mut IndexSet<Utf8PathBuf>,
) {
    for component in selector.iter_raw_parse_order_from(0) {
        match component {
            Component::NonTSPseudoClass(PseudoClass::CustomFunction { name, arguments })
                if name.as_ref().eq_ignore_ascii_case("external") =>
            {
                if let Some(target) = external_target(arguments) {
                    found.insert(paths::resolve_from(file, &target.from));
                }
            }
            Component::Negation(inner)
            | Component::Is(inner)
            | Component::Where(inner)
            | Component::Has(inner)
            | Component::Any(_, inner) => {
                for selector in inner.iter() {
                    external_dependencies(selector, file, found);
                }
            }
            _ => {}
        }
    }
}

/// Returns the class names of a list made only of compound class selectors.
///
/// `&` counts as the parent's classes when those are plain classes too.
fn simple_classes(list: &SelectorList<'_>, parent: Option<&[SmolStr]>) -> Option<Vec<SmolStr>> {
    let mut classes: Vec<SmolStr> = Vec::new();
    let mut push = |class: SmolStr| {
        if !classes.contains(&class) {
            classes.push(class);
        }
    };
    for selector in list.0.iter() {
        for component in selector.iter_raw_parse_order_from(0) {
            match component {
                Component::Class(ident) => push(SmolStr::new(ident.as_ref())),
                Component::Nesting => parent?.iter().cloned().for_each(&mut push),
                _ => return None,
            }
        }
    }
    Some(classes)
}

/// The target of `:external(class from 'path')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExternalTarget {
    pub class: String,
    pub from: String,
}

/// Reads the argument of an `:external(...)` pseudo-class.
///
/// The argument must be exactly `ident from 'string'`.
pub(crate) fn external_target(arguments: &TokenList<'_>) -> Option<ExternalTarget> {
    let mut words = Vec::with_capacity(3);
    for item in &arguments.0 {
        match item {
            TokenOrValue::Token(Token::WhiteSpace(_)) => {}
            TokenOrValue::Token(token) => words.push(token),
            _ => return None,
        }
    }
    match words.as_slice() {
        [Token::Ident(class), Token::Ident(keyword), Token::String(from)]
            if &**keyword == "from" =>
        {
            Some(ExternalTarget {
                class: String::from(&**class),
                from: String::from(&**from),
            })
        }
        _ => None,
    }
}

/// Where composed classes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ComposesFrom {
    Local,
    Global,
    File(String),
}

/// One `composes` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ComposesValue {
    /// Classes as written, a leading dot kept.
    pub classes: Vec<String>,
    pub from: ComposesFrom,
}

/// Reads every `composes` declaration of a rule, in order.
fn composes_values(style: &StyleRule<'_>) -> Vec<ComposesValue> {
    let block = &style.declarations;
    block
        .declarations
        .iter()
        .chain(block.important_declarations.iter())
        .filter_map(composes_value)
        .collect()
}

fn composes_value(property: &Property<'_>) -> Option<ComposesValue> {
    match property {
        Property::Composes(composes) => Some(ComposesValue {
            classes: composes
                .names
                .iter()
                .map(|name| String::from(&*name.0))
                .collect(),
            from: match &composes.from {
                None => ComposesFrom::Local,
                Some(Specifier::Global) => ComposesFrom::Global,
                Some(Specifier::File(path)) => ComposesFrom::File(String::from(&**path)),
                Some(_) => ComposesFrom::Local,
            },
        }),
        Property::Unparsed(unparsed) if stylesheet::is_composes(property) => {
            Some(parse_composes_tokens(&unparsed.value))
        }
        _ => None,
    }
}

/// Reads `<classes> [from '<path>']` from raw tokens.
///
/// Taken when the value is not a plain space separated list, for example
/// `composes: a, b` or `composes: .a`.
pub(crate) fn parse_composes_tokens(tokens: &TokenList<'_>) -> ComposesValue {
    let mut classes = Vec::new();
    let mut from = ComposesFrom::Local;
    let mut dot = false;
    let mut after_from = false;

    for item in &tokens.0 {
        let TokenOrValue::Token(token) = item else {
            dot = false;
            continue;
        };
        match token {
            Token::WhiteSpace(_) => continue,
            Token::Delim('.') => {
                dot = true;
                continue;
            }
            Token::Ident(ident) if after_from && ident.eq_ignore_ascii_case("global") => {
                from = ComposesFrom::Global;
            }
            Token::String(path) if after_from => from = ComposesFrom::File(String::from(&**path)),
            Token::Ident(ident) if ident.eq_ignore_ascii_case("from") => after_from = true,
            Token::Ident(ident) => {
                let prefix = if dot { "." } else { "" };
                classes.push(format!("{prefix}{}", &**ident));
            }
            _ => {}
        }
        dot = false;
    }

    ComposesValue { classes, from }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namer::NamerOptions;
    use pretty_assertions::assert_eq;

    const FILE: &str = "/p/src/a.module.css";

    fn collect_source(source: &str) -> Result<(Collected, Diagnostics), CompileError> {
        let file = Utf8Path::new(FILE);
        let sheet = stylesheet::parse(source, "src/a.module.css", file).unwrap();
        let locator = Locator::new(source);
        let mut namer = Namer::new(NamerOptions {
            root: "/p".into(),
            ..NamerOptions::default()
        });
        let mut diagnostics = Diagnostics::new();
        let collected = collect(&sheet, &locator, file, &mut namer, &mut diagnostics)?;
        Ok((collected, diagnostics))
    }

    fn class_names(collected: &Collected) -> Vec<&str> {
        collected.classes.keys().map(SmolStr::as_str).collect()
    }

    fn composed(collected: &Collected, class: &str) -> Vec<String> {
        collected.classes[class]
            .composes
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    #[test]
    fn test_classes_in_declaration_order() {
        let (collected, _) =
            collect_source(".b {} .a.c > .b {} .d:not(.e) {} :global(.g) .h {}").unwrap();
        assert_eq!(class_names(&collected), vec!["b", "a", "c", "d", "e", "h"]);
    }

    #[test]
    fn test_escaped_class_is_read_unescaped() {
        let (collected, _) = collect_source(r".\31 0 {} .sm\:p-4 {}").unwrap();
        assert_eq!(class_names(&collected), vec!["10", "sm:p-4"]);
        assert_eq!(collected.classes["10"].export, "_10");
        assert_eq!(collected.classes["sm:p-4"].export, "smP4");
    }

    #[test]
    fn test_export_bindings_are_unique() {
        let (collected, _) = collect_source(".nav-item {} .navItem {} .__styles {}").unwrap();
        let exports: Vec<&str> = collected
            .classes
            .values()
            .map(|record| record.export.as_str())
            .collect();
        assert_eq!(exports, vec!["navItem", "navItem$2", "__styles$2"]);
    }

    #[test]
    fn test_composes_local_and_external() {
        let (collected, _) = collect_source(
            ".a, .b { composes: x y, z; }\n.c { composes: base from \"../shared/b.module.css\"; }",
        )
        .unwrap();
        assert_eq!(composed(&collected, "a"), vec!["x", "y", "z"]);
        assert_eq!(composed(&collected, "b"), vec!["x", "y", "z"]);
        assert!(matches!(
            &collected.classes["c"].composes[0],
            ComposeRef::External { from, .. } if from == "../shared/b.module.css"
        ));
        assert_eq!(
            collected.dependencies.iter().collect::<Vec<_>>(),
            vec![Utf8Path::new("/p/shared/b.module.css")]
        );
    }

    #[test]
    fn test_composes_from_keyword_is_case_insensitive() {
        let (collected, _) =
            collect_source(".a { composes: x, y FROM './x.module.css'; }").unwrap();
        assert_eq!(composed(&collected, "a"), vec!["x", "y"]);
        assert!(matches!(
            &collected.classes["a"].composes[1],
            ComposeRef::External { from, .. } if from == "./x.module.css"
        ));
    }

    #[test]
    fn test_composes_from_global() {
        let (collected, _) = collect_source(".a { composes: clearfix from global; }").unwrap();
        assert!(matches!(
            &collected.classes["a"].composes[0],
            ComposeRef::Global { name, .. } if name == "clearfix"
        ));
        assert!(collected.dependencies.is_empty());
    }

    #[test]
    fn test_leading_dot_is_stripped_with_warning() {
        let (collected, diagnostics) = collect_source(".a { composes: .b; } .b {}").unwrap();
        assert_eq!(collected.classes["a"].composes[0].name(), "b");
        assert_eq!(diagnostics.as_slice().len(), 1);
        assert_eq!(
            diagnostics.as_slice()[0].code,
            DiagnosticCode::ComposesLeadingDot
        );
        assert_eq!(diagnostics.as_slice()[0].word.as_deref(), Some(".b"));
    }

    #[test]
    fn test_composes_requires_simple_selector() {
        let err = collect_source(".a .b { composes: c; }").unwrap_err();
        assert!(matches!(
            err,
            CompileError::ComposesOnComplexSelector { ref word, .. } if word == ".a .b"
        ));
        assert!(collect_source("div { composes: c; }").is_err());
        assert!(collect_source(".a:hover { composes: c; }").is_err());
    }

    #[test]
    fn test_nested_composes_follows_the_parent() {
        let (collected, _) = collect_source(".a { &.b { composes: c; } } .c {}").unwrap();
        assert_eq!(composed(&collected, "a"), vec!["c"]);
        assert_eq!(composed(&collected, "b"), vec!["c"]);

        let err = collect_source(".a { .b { composes: c; } }").unwrap_err();
        assert!(matches!(err, CompileError::ComposesOnComplexSelector { .. }));
    }

    #[test]
    fn test_external_is_validated() {
        let (collected, _) =
            collect_source(".a :external(button from './b.module.css') {}").unwrap();
        assert_eq!(
            collected.dependencies.iter().collect::<Vec<_>>(),
            vec![Utf8Path::new("/p/src/b.module.css")]
        );

        let err = collect_source(".a :external(button './b.module.css') {}").unwrap_err();
        assert!(matches!(err, CompileError::ExternalFormat { .. }));
        assert!(err.to_string().contains("Wrong format of :external selector"));
    }

    #[test]
    fn test_scan_dependencies() {
        let deps = scan_dependencies(
            Utf8Path::new(FILE),
            ".a { composes: x from './x.module.css'; }\n\
             .b { .c :external(y from '../y.module.css') {} }\n\
             @media (min-width: 10px) { .d { composes: z from './z.module.css'; } }\n\
             .e { composes: w from './x.module.css'; }",
        )
        .unwrap();
        assert_eq!(
            deps,
            vec![
                Utf8PathBuf::from("/p/src/x.module.css"),
                Utf8PathBuf::from("/p/y.module.css"),
                Utf8PathBuf::from("/p/src/z.module.css")
            ]
        );
    }
}
