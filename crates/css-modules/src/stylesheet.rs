//! Stylesheet parsing, walking and printing on top of lightningcss.

use crate::error::CompileError;
use camino::Utf8Path;
use lightningcss::css_modules::Config as CssModulesConfig;
use lightningcss::printer::PrinterOptions;
use lightningcss::properties::{Property, PropertyId};
use lightningcss::rules::{CssRule, CssRuleList, Location};
use lightningcss::selector::SelectorList;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use lightningcss::targets::{Features, Targets};
use lightningcss::traits::ToCss;
use parcel_sourcemap::SourceMap as ParcelSourceMap;
use source_map::{ByteOffset, LineIndex, SourceMap, Span};

/// A parsed stylesheet.
pub type Sheet<'i> = StyleSheet<'i>;

/// Converts lightningcss locations into byte positions of one source.
pub struct Locator<'s> {
    source: &'s str,
    index: LineIndex,
}

impl<'s> Locator<'s> {
    /// Indexes `source`.
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            index: LineIndex::new(source),
        }
    }

    /// Converts a 0-based line and 1-based UTF-16 column to a byte offset.
    pub fn offset(&self, line: u32, column: u32) -> ByteOffset {
        self.index
            .utf16_offset(line, column, self.source)
            .unwrap_or_else(|| ByteOffset::from(self.source.len() as u32))
    }

    /// Returns an empty span at a rule location.
    pub fn span(&self, loc: Location) -> Span {
        Span::empty(self.offset(loc.line, loc.column))
    }
}

/// Parses `source` with CSS Modules syntax enabled.
///
/// `:global(...)` parses to its own pseudo-class, `:external(...)` and bare
/// `:global` to custom ones. Nested rules are kept as written.
pub fn parse<'i>(
    source: &'i str,
    filename: &str,
    file: &Utf8Path,
) -> Result<Sheet<'i>, CompileError> {
    let options = ParserOptions {
        filename: filename.to_string(),
        css_modules: Some(CssModulesConfig::default()),
        ..ParserOptions::default()
    };
    StyleSheet::parse(source, options).map_err(|err| {
        let span = err
            .loc
            .as_ref()
            .map(|loc| Span::empty(Locator::new(source).offset(loc.line, loc.column)))
            .unwrap_or_default();
        CompileError::Parse {
            file: file.to_owned(),
            span,
            message: err.kind.to_string(),
        }
    })
}

/// Printed CSS with its source map.
#[derive(Debug)]
pub struct Printed {
    pub css: String,
    pub map: SourceMap,
}

/// Where printed output comes from and goes to.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions<'a> {
    /// The `file` recorded in the source map.
    pub output: Option<&'a str>,
    /// The name recorded in the map's `sources`.
    pub source_name: &'a str,
    /// The text the stylesheet was parsed from, embedded as `sourcesContent`.
    pub original: &'a str,
}

/// Prints `sheet` with nested rules flattened.
///
/// Classes are printed as they stand in the tree: the CSS Modules option
/// used while parsing is not carried into the printer.
pub fn print(
    mut sheet: Sheet<'_>,
    options: PrintOptions<'_>,
    file: &Utf8Path,
) -> Result<Printed, CompileError> {
    let print_error = |message: String| CompileError::Print {
        file: file.to_owned(),
        message,
    };

    let rules = CssRuleList(std::mem::take(&mut sheet.rules.0));
    let mut plain = StyleSheet::new(
        vec![options.source_name.to_string()],
        rules,
        ParserOptions {
            filename: options.source_name.to_string(),
            ..ParserOptions::default()
        },
    );
    plain.license_comments = std::mem::take(&mut sheet.license_comments);

    let mut parcel = ParcelSourceMap::new("/");
    let source_id = parcel.add_source(options.source_name);
    parcel
        .set_source_content(source_id as usize, options.original)
        .map_err(|err| print_error(err.to_string()))?;

    let result = plain
        .to_css(PrinterOptions {
            source_map: Some(&mut parcel),
            targets: Targets {
                include: Features::Nesting,
                ..Targets::default()
            },
            ..PrinterOptions::default()
        })
        .map_err(|err| print_error(err.to_string()))?;

    let json = parcel
        .to_json(None)
        .map_err(|err| print_error(err.to_string()))?;
    let mut map = source_map::from_json(&json)?;
    map.set_file(options.output);
    for idx in 0..map.get_source_count() {
        map.set_source(idx, options.source_name);
    }

    Ok(Printed {
        css: result.code,
        map,
    })
}

/// Returns the rules inside a grouping at-rule.
pub fn nested_rules<'a, 'i>(rule: &'a CssRule<'i>) -> Option<&'a [CssRule<'i>]> {
    match rule {
        CssRule::Media(media) => Some(&media.rules.0),
        CssRule::Supports(supports) => Some(&supports.rules.0),
        CssRule::LayerBlock(layer) => Some(&layer.rules.0),
        CssRule::Container(container) => Some(&container.rules.0),
        _ => None,
    }
}

/// Mutable counterpart of [`nested_rules`].
pub fn nested_rules_mut<'a, 'i>(
    rule: &'a mut CssRule<'i>,
) -> Option<&'a mut Vec<CssRule<'i>>> {
    match rule {
        CssRule::Media(media) => Some(&mut media.rules.0),
        CssRule::Supports(supports) => Some(&mut supports.rules.0),
        CssRule::LayerBlock(layer) => Some(&mut layer.rules.0),
        CssRule::Container(container) => Some(&mut container.rules.0),
        _ => None,
    }
}

/// Returns true for a `composes` declaration, parsed or not.
pub fn is_composes(property: &Property<'_>) -> bool {
    matches!(property.property_id(), PropertyId::Composes)
}

/// Serializes a selector list as it currently stands.
pub fn selector_text(selectors: &SelectorList<'_>) -> String {
    selectors
        .to_css_string(PrinterOptions::default())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FILE: &str = "/p/src/a.module.css";

    fn print_source(source: &str) -> Printed {
        let sheet = parse(source, "src/a.module.css", Utf8Path::new(FILE)).unwrap();
        print(
            sheet,
            PrintOptions {
                output: Some("a.css"),
                source_name: "src/a.module.css",
                original: source,
            },
            Utf8Path::new(FILE),
        )
        .unwrap()
    }

    #[test]
    fn test_nesting_is_flattened() {
        let printed = print_source(".a { color: red; &:hover { color: green; } }");
        assert!(printed.css.contains(".a:hover {"), "{}", printed.css);
        assert!(!printed.css.contains('&'));
    }

    #[test]
    fn test_map_points_at_rules() {
        let source = ".a {\n  color: red;\n}\n\n.b {\n  margin: 0;\n}\n";
        let printed = print_source(source);
        assert_eq!(printed.map.get_file(), Some("a.css"));
        assert_eq!(
            printed.map.sources().collect::<Vec<_>>(),
            vec!["src/a.module.css"]
        );
        assert_eq!(printed.map.get_source_contents(0), Some(source));

        let b_line = printed.css.lines().position(|line| line.starts_with(".b")).unwrap();
        let token = printed.map.lookup_token(b_line as u32, 0).unwrap();
        assert_eq!((token.get_src_line(), token.get_src_col()), (4, 0));
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = parse(".a {}\n.b:: {}", "a", Utf8Path::new(FILE));
        let Err(CompileError::Parse { span, .. }) = err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert!(u32::from(span.start) >= 6);
    }

    #[test]
    fn test_locator_counts_utf16_columns() {
        let source = "/* 😀 */ .a {}";
        let locator = Locator::new(source);
        let a = source.find(".a").unwrap() as u32;
        assert_eq!(locator.offset(0, 10), ByteOffset::from(a));
    }
}
