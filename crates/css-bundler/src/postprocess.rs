//! Post-processing of concatenated chunks.
//!
//! Plugins are configured in a JSON file:
//!
//! ```json
//! { "plugins": [{ "name": "banner", "text": "(c) ACME" }, { "name": "strip-comments" }] }
//! ```
//!
//! A chunk is parsed once, every plugin edits the same stylesheet tree, and
//! the result is printed again. The printed map is chained through the
//! chunk's map so positions still point at the original modules.

use crate::error::BundleError;
use camino::{Utf8Path, Utf8PathBuf};
use css_modules::stylesheet::{self, PrintOptions, Sheet};
use css_modules::{Diagnostic, DiagnosticCode};
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use serde::Deserialize;
use source_map::{LineIndex, SourceMap, Span};

/// The parsed post-processing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostprocessConfig {
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

/// One configured plugin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum PluginConfig {
    /// Prepends `/*! <text> */`.
    Banner { text: String },
    /// Removes the preserved `/*! ... */` comments.
    StripComments,
    /// Turns `!important` declarations into normal ones, warning about each.
    NoImportant,
}

impl PluginConfig {
    fn build(&self) -> Box<dyn Plugin> {
        match self {
            PluginConfig::Banner { text } => Box::new(Banner { text: text.clone() }),
            PluginConfig::StripComments => Box::new(StripComments),
            PluginConfig::NoImportant => Box::new(NoImportant),
        }
    }
}

/// A warning raised by a plugin, positioned in the chunk it was given.
///
/// `line` and `col` are 0-based; `col` counts UTF-16 units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginWarning {
    pub message: String,
    pub line: u32,
    pub col: u32,
    pub word: Option<String>,
}

/// A transformation of a parsed chunk.
pub trait Plugin: Send + Sync {
    /// The plugin name used in the configuration file.
    fn name(&self) -> &'static str;

    /// Edits `sheet` in place.
    fn process(&self, sheet: &mut Sheet<'_>, warnings: &mut Vec<PluginWarning>);
}

/// Runs the configured plugins over a chunk.
#[derive(Default)]
pub struct Postprocessor {
    plugins: Vec<Box<dyn Plugin>>,
}

/// The result of post-processing a chunk.
#[derive(Debug)]
pub struct Processed {
    pub css: String,
    pub map: SourceMap,
    pub diagnostics: Vec<Diagnostic>,
}

impl Postprocessor {
    /// Creates a post-processor from a parsed configuration.
    pub fn new(config: &PostprocessConfig) -> Self {
        Self {
            plugins: config.plugins.iter().map(PluginConfig::build).collect(),
        }
    }

    /// Loads the configuration at `path`. No path means no plugins.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, BundleError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| BundleError::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        let config: PostprocessConfig =
            serde_json::from_str(&text).map_err(|source| BundleError::ConfigParse {
                path: path.to_owned(),
                source,
            })?;
        tracing::debug!(%path, plugins = config.plugins.len(), "loaded post-processing config");
        Ok(Self::new(&config))
    }

    /// Returns true if no plugins are configured.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs every plugin in order over the chunk `name`.
    ///
    /// Without plugins the chunk is returned untouched. Warnings are traced
    /// back through `map` to the module they came from; `root` turns the
    /// logical source names of the map back into file paths.
    pub fn run(
        &self,
        name: &str,
        css: String,
        map: SourceMap,
        root: &Utf8Path,
    ) -> Result<Processed, BundleError> {
        if self.plugins.is_empty() {
            return Ok(Processed {
                css,
                map,
                diagnostics: Vec::new(),
            });
        }

        let options = ParserOptions {
            filename: name.to_string(),
            ..ParserOptions::default()
        };
        let mut sheet: Sheet<'_> =
            StyleSheet::parse(&css, options).map_err(|err| BundleError::Postprocess {
                chunk: name.to_string(),
                message: err.to_string(),
            })?;

        let mut diagnostics = Vec::new();
        for plugin in &self.plugins {
            let mut warnings = Vec::new();
            plugin.process(&mut sheet, &mut warnings);
            tracing::trace!(plugin = plugin.name(), warnings = warnings.len(), "ran plugin");
            for warning in warnings {
                diagnostics.push(locate(&warning, plugin.name(), &map, root));
            }
        }

        let printed = stylesheet::print(
            sheet,
            PrintOptions {
                output: Some(name),
                source_name: name,
                original: &css,
            },
            Utf8Path::new(name),
        )?;
        Ok(Processed {
            map: source_map::compose(&printed.map, &map),
            css: printed.css,
            diagnostics,
        })
    }
}

impl std::fmt::Debug for Postprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|plugin| plugin.name()))
            .finish()
    }
}

/// Maps a plugin warning back to the module it originated from.
fn locate(warning: &PluginWarning, plugin: &str, map: &SourceMap, root: &Utf8Path) -> Diagnostic {
    let message = format!("{plugin}: {}", warning.message);
    let original = map
        .lookup_token(warning.line, warning.col)
        .filter(|token| token.get_dst_line() == warning.line)
        .and_then(|token| {
            let source = token.get_source()?;
            let span = map
                .get_source_contents(token.get_src_id())
                .and_then(|contents| {
                    LineIndex::new(contents).utf16_offset(
                        token.get_src_line(),
                        token.get_src_col() + 1,
                        contents,
                    )
                })
                .map(Span::empty)
                .unwrap_or_default();
            Some((module_path(root, source), span))
        });

    let (file, span) = original.unwrap_or_else(|| (root.to_owned(), Span::default()));
    let diagnostic = Diagnostic::new(DiagnosticCode::Postprocess, message, file, span);
    match &warning.word {
        Some(word) => diagnostic.with_word(word.clone()),
        None => diagnostic,
    }
}

/// Converts a logical source name (`/src/a.module.css`) into a path under `root`.
fn module_path(root: &Utf8Path, source: &str) -> Utf8PathBuf {
    root.join(source.trim_start_matches('/'))
}

struct Banner {
    text: String,
}

impl Plugin for Banner {
    fn name(&self) -> &'static str {
        "banner"
    }

    fn process(&self, sheet: &mut Sheet<'_>, _warnings: &mut Vec<PluginWarning>) {
        let comment = format!("! {} ", self.text.replace("*/", "* /"));
        sheet.license_comments.insert(0, comment.into());
    }
}

struct StripComments;

impl Plugin for StripComments {
    fn name(&self) -> &'static str {
        "strip-comments"
    }

    // Plain comments never survive parsing; only the preserved ones are left.
    fn process(&self, sheet: &mut Sheet<'_>, _warnings: &mut Vec<PluginWarning>) {
        sheet.license_comments.clear();
    }
}

struct NoImportant;

impl NoImportant {
    fn rules(rules: &mut [CssRule<'_>], warnings: &mut Vec<PluginWarning>) {
        for rule in rules {
            match rule {
                CssRule::Style(style) => {
                    let block = &mut style.declarations;
                    let important = std::mem::take(&mut block.important_declarations);
                    for property in &important {
                        warnings.push(PluginWarning {
                            message: "`!important` removed".to_string(),
                            line: style.loc.line,
                            col: style.loc.column.saturating_sub(1),
                            word: Some(property.property_id().name().to_string()),
                        });
                    }
                    // Appended last so they still win over their normal siblings.
                    block.declarations.extend(important);
                    Self::rules(&mut style.rules.0, warnings);
                }
                other => {
                    if let Some(children) = stylesheet::nested_rules_mut(other) {
                        Self::rules(children, warnings);
                    }
                }
            }
        }
    }
}

impl Plugin for NoImportant {
    fn name(&self) -> &'static str {
        "no-important"
    }

    fn process(&self, sheet: &mut Sheet<'_>, warnings: &mut Vec<PluginWarning>) {
        Self::rules(&mut sheet.rules.0, warnings);
    }
}
