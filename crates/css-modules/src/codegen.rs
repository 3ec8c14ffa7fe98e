//! JavaScript module generation.

use crate::resolve::{ClassPart, Resolved};
use crate::strategy::OutputStrategy;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

/// Words that cannot be used as binding names.
const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Bindings the output preludes declare, unavailable for class exports.
///
/// The set is the same for every output mode, so the binding a class is
/// exported under does not depend on the mode of the module importing it.
pub(crate) const RESERVED_BINDINGS: &[&str] = &["__styles", "__useStylesheet"];

/// Returns the binding set every file's exports start from.
pub(crate) fn reserved_bindings() -> FxHashSet<String> {
    RESERVED_BINDINGS.iter().map(|name| name.to_string()).collect()
}

/// Generates the module exporting `classes`, in declaration order.
pub fn generate(
    classes: &IndexMap<SmolStr, Resolved>,
    strategy: &dyn OutputStrategy,
    css_path: &str,
) -> String {
    let mut used = reserved_bindings();
    used.extend(classes.values().map(|resolved| resolved.export.clone()));

    let mut imports: Vec<String> = Vec::new();
    let mut bindings: IndexMap<(SmolStr, String), String> = IndexMap::new();
    for resolved in classes.values() {
        for part in &resolved.parts {
            let ClassPart::Import { name, from, export } = part else {
                continue;
            };
            let key = (name.clone(), from.clone());
            if bindings.contains_key(&key) {
                continue;
            }
            let binding = unique(identifierfy(&format!("{name}{from}")), &mut used);
            imports.push(format!(
                "import {{ {export} as {binding} }} from {};",
                js_single_quoted(from)
            ));
            bindings.insert(key, binding);
        }
    }

    let mut exports: Vec<(SmolStr, String)> = Vec::with_capacity(classes.len());
    let mut lines = strategy.prelude(css_path);
    lines.extend(imports);

    for (class, resolved) in classes {
        let ident = resolved.export.clone();
        let value: Vec<String> = resolved
            .parts
            .iter()
            .map(|part| match part {
                ClassPart::Local(name) => js_string(name),
                ClassPart::Unknown(name) => js_string(name),
                ClassPart::Import { name, from, .. } => bindings
                    .get(&(name.clone(), from.clone()))
                    .cloned()
                    .unwrap_or_else(|| js_string(name)),
            })
            .collect();
        lines.push(format!("export const {ident} = {};", value.join("+\" \"+")));
        exports.push((class.clone(), ident));
    }

    lines.push(strategy.default_export(css_path, &exports));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Turns arbitrary text into a JavaScript identifier.
///
/// Characters that cannot appear in an identifier are dropped and the next
/// kept character is uppercased, so `nav-item` becomes `navItem`. Names that
/// start with a digit or are reserved words get a `_` prefix.
pub fn identifierfy(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut upper_next = false;
    for c in input.chars() {
        if c == '_' || c == '$' || c.is_alphanumeric() {
            if upper_next && !out.is_empty() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }

    let starts_with_digit = out.starts_with(|c: char| c.is_ascii_digit());
    if out.is_empty() || starts_with_digit || RESERVED_WORDS.contains(&out.as_str()) {
        out.insert(0, '_');
    }
    out
}

/// Returns `ident`, or `ident$N` with the first free `N` from 2.
pub(crate) fn unique(ident: String, used: &mut FxHashSet<String>) -> String {
    if used.insert(ident.clone()) {
        return ident;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{ident}${n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Quotes `text` as a double-quoted JavaScript string literal.
pub fn js_string(text: &str) -> String {
    quote(text, '"')
}

fn js_single_quoted(text: &str) -> String {
    quote(text, '\'')
}

fn quote(text: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(delimiter);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}
