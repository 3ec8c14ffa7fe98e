//! Second pass: rewrite selectors to their final class names.

use crate::collect::external_target;
use crate::diagnostic::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::paths;
use crate::registry::Overlay;
use crate::stylesheet::{self, Locator, Sheet};
use lightningcss::rules::style::StyleRule;
use lightningcss::rules::CssRule;
use lightningcss::selector::{Component, PseudoClass, Selector};
use lightningcss::values::ident::Ident;

/// Renames every class of a stylesheet and drops `composes`.
///
/// A selector that cannot be renamed is reported and left as written; the
/// other selectors of the same rule are still renamed. A bare `:global` is
/// removed with a warning, and a selector left empty by that is dropped.
pub fn rename(
    sheet: &mut Sheet<'_>,
    locator: &Locator<'_>,
    overlay: Overlay<'_>,
    diagnostics: &mut Diagnostics,
) {
    let mut renamer = Renamer {
        locator,
        overlay,
        diagnostics,
    };
    renamer.rules(&mut sheet.rules.0);
}

struct Renamer<'a> {
    locator: &'a Locator<'a>,
    overlay: Overlay<'a>,
    diagnostics: &'a mut Diagnostics,
}

impl Renamer<'_> {
    fn rules(&mut self, rules: &mut Vec<CssRule<'_>>) {
        rules.retain_mut(|rule| match rule {
            CssRule::Style(style) => {
                self.style_rule(style);
                !style.selectors.0.is_empty()
            }
            other => {
                if let Some(children) = stylesheet::nested_rules_mut(other) {
                    self.rules(children);
                }
                true
            }
        });
    }

    fn style_rule(&mut self, style: &mut StyleRule<'_>) {
        let file = self.overlay.current_file();
        let span = self.locator.span(style.loc);
        let written = stylesheet::selector_text(&style.selectors);

        let selectors = std::mem::take(&mut style.selectors.0);
        for selector in selectors {
            let mut bare_global = false;
            match rename_selector(&selector, self.overlay, &mut bare_global) {
                Ok(Some(renamed)) => style.selectors.0.push(renamed),
                Ok(None) => {}
                Err(message) => {
                    self.diagnostics.push(
                        Diagnostic::new(DiagnosticCode::SelectorNotRenamed, message, file, span)
                            .with_word(written.clone()),
                    );
                    style.selectors.0.push(selector);
                }
            }
            if bare_global {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::BareGlobal,
                        "Bare :global has no effect and was removed, use :global(...)",
                        file,
                        span,
                    )
                    .with_word(written.clone()),
                );
            }
        }

        let block = &mut style.declarations;
        block.declarations.retain(|p| !stylesheet::is_composes(p));
        block.important_declarations.retain(|p| !stylesheet::is_composes(p));

        self.rules(&mut style.rules.0);
    }
}

/// Renames one complex selector.
///
/// Returns `None` when nothing is left once bare `:global`s are removed.
fn rename_selector<'i>(
    selector: &Selector<'i>,
    overlay: Overlay<'_>,
    bare_global: &mut bool,
) -> Result<Option<Selector<'i>>, String> {
    let mut out: Vec<Component<'i>> = Vec::new();
    let mut after_global = false;

    for component in selector.iter_raw_parse_order_from(0) {
        if std::mem::take(&mut after_global) && matches!(component, Component::Combinator(_)) {
            continue;
        }
        match component {
            Component::Class(ident) => {
                let record = overlay
                    .current()
                    .get(ident.as_ref())
                    .ok_or_else(|| format!("Unknown class \"{}\"", ident.as_ref()))?;
                out.push(class(&record.name));
            }
            Component::NonTSPseudoClass(PseudoClass::Global { selector }) => {
                out.extend(selector.iter_raw_parse_order_from(0).cloned());
            }
            Component::NonTSPseudoClass(PseudoClass::Custom { name })
                if name.as_ref().eq_ignore_ascii_case("global") =>
            {
                *bare_global = true;
                after_global = true;
            }
            Component::NonTSPseudoClass(PseudoClass::CustomFunction { name, arguments })
                if name.as_ref().eq_ignore_ascii_case("external") =>
            {
                let target = external_target(arguments)
                    .ok_or_else(|| "Wrong format of :external selector".to_string())?;
                let file = paths::resolve_from(overlay.current_file(), &target.from);
                let record = overlay.class(&file, &target.class).ok_or_else(|| {
                    format!("Unknown class \"{}\" in '{}'", target.class, target.from)
                })?;
                out.push(class(&record.name));
            }
            Component::Negation(inner) => {
                out.push(Component::Negation(rename_all(inner, overlay, bare_global)?));
            }
            Component::Is(inner) => {
                out.push(Component::Is(rename_all(inner, overlay, bare_global)?));
            }
            Component::Where(inner) => {
                out.push(Component::Where(rename_all(inner, overlay, bare_global)?));
            }
            Component::Has(inner) => {
                out.push(Component::Has(rename_all(inner, overlay, bare_global)?));
            }
            Component::Any(prefix, inner) => {
                let inner = rename_all(inner, overlay, bare_global)?;
                out.push(Component::Any(prefix.clone(), inner));
            }
            other => out.push(other.clone()),
        }
    }

    // A trailing `:global` leaves its combinator dangling.
    while matches!(out.last(), Some(Component::Combinator(_))) {
        out.pop();
    }
    if out.is_empty() {
        return Ok(None);
    }
    Ok(Some(Selector::from(out)))
}

fn rename_all<'i>(
    selectors: &[Selector<'i>],
    overlay: Overlay<'_>,
    bare_global: &mut bool,
) -> Result<Box<[Selector<'i>]>, String> {
    selectors
        .iter()
        .map(|selector| {
            rename_selector(selector, overlay, bare_global)?
                .ok_or_else(|| "Bare :global leaves nothing to select".to_string())
        })
        .collect()
}

fn class<'i>(name: &str) -> Component<'i> {
    Component::Class(Ident(name.to_string().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClassRecord, FileClasses, Registry};
    use camino::{Utf8Path, Utf8PathBuf};
    use pretty_assertions::assert_eq;
    use smol_str::SmolStr;

    const FILE: &str = "/p/a.module.css";

    fn classes(records: &[(&str, &str)]) -> FileClasses {
        records
            .iter()
            .map(|(class, name)| (SmolStr::new(class), ClassRecord::new(*name, *class)))
            .collect()
    }

    fn rename_source(source: &str, registry: &Registry) -> (Vec<String>, Diagnostics) {
        let file = Utf8PathBuf::from(FILE);
        let pending = classes(&[("a", "A1"), ("b", "B1"), ("x", "X1")]);
        let mut sheet = stylesheet::parse(source, "a.module.css", &file).unwrap();
        let locator = Locator::new(source);
        let mut diagnostics = Diagnostics::new();
        rename(
            &mut sheet,
            &locator,
            Overlay::new(registry, &file, &pending),
            &mut diagnostics,
        );
        let selectors = sheet
            .rules
            .0
            .iter()
            .filter_map(|rule| match rule {
                CssRule::Style(style) => Some(stylesheet::selector_text(&style.selectors)),
                _ => None,
            })
            .collect();
        (selectors, diagnostics)
    }

    #[test]
    fn test_classes_are_renamed() {
        let (selectors, diagnostics) =
            rename_source(".a > .b:hover, div.a:not(.b) {}", &Registry::new());
        assert_eq!(selectors, vec![".A1 > .B1:hover, div.A1:not(.B1)"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_global_is_unwrapped_verbatim() {
        let (selectors, _) =
            rename_source(":global(.foo) {} .a:global(.bar .baz) {}", &Registry::new());
        assert_eq!(selectors, vec![".foo", ".A1.bar .baz"]);
    }

    #[test]
    fn test_bare_global_is_removed_with_warning() {
        let (selectors, diagnostics) =
            rename_source(":global .x {} .a :global {} :global {}", &Registry::new());
        assert_eq!(selectors, vec![".X1", ".A1"]);

        let codes: Vec<_> = diagnostics.as_slice().iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![DiagnosticCode::BareGlobal; 3]);
        assert!(selectors.iter().all(|selector| !selector.contains(":global")));
    }

    #[test]
    fn test_external_uses_target_registry() {
        let mut registry = Registry::new();
        registry.insert(
            Utf8PathBuf::from("/p/b.module.css"),
            classes(&[("button", "X9")]),
        );
        let (selectors, _) =
            rename_source(".a :external(button from './b.module.css') {}", &registry);
        assert_eq!(selectors, vec![".A1 .X9"]);
    }

    #[test]
    fn test_failing_selector_is_left_as_written() {
        let (selectors, diagnostics) = rename_source(
            ".a :external(button from './missing.module.css'), .b {}",
            &Registry::new(),
        );
        assert_eq!(selectors.len(), 1);
        assert!(selectors[0].starts_with(".a :external(button from"));
        assert!(selectors[0].ends_with(", .B1"));

        let diagnostic = &diagnostics.as_slice()[0];
        assert_eq!(diagnostic.code, DiagnosticCode::SelectorNotRenamed);
        assert_eq!(
            diagnostic.message,
            "Unknown class \"button\" in './missing.module.css'"
        );
    }

    #[test]
    fn test_composes_is_removed() {
        let file = Utf8Path::new(FILE);
        let source = ".a { composes: b; color: red; } .b { composes: a, x !important; }";
        let pending = classes(&[("a", "A1"), ("b", "B1"), ("x", "X1")]);
        let registry = Registry::new();
        let mut sheet = stylesheet::parse(source, "a.module.css", file).unwrap();
        rename(
            &mut sheet,
            &Locator::new(source),
            Overlay::new(&registry, file, &pending),
            &mut Diagnostics::new(),
        );

        let properties: Vec<Vec<String>> = sheet
            .rules
            .0
            .iter()
            .filter_map(|rule| match rule {
                CssRule::Style(style) => Some(
                    style
                        .declarations
                        .declarations
                        .iter()
                        .chain(style.declarations.important_declarations.iter())
                        .map(|property| property.property_id().name().to_string())
                        .collect(),
                ),
                _ => None,
            })
            .collect();
        assert_eq!(properties, vec![vec!["color".to_string()], vec![]]);
    }
}
