//! Concatenation of processed stylesheets with source map merging.

use crate::compose::copy_sources_content;
use sourcemap::{SourceMap, SourceMapBuilder};

/// Merges stylesheets, each with its own source map, into one output.
///
/// Every file is followed by a separating newline. Mappings of later files
/// are moved down by the number of lines written before them.
pub struct Concat {
    parts: Vec<String>,
    line_offset: u32,
    builder: SourceMapBuilder,
}

impl Concat {
    /// Creates an empty concatenation for the output file `file_name`.
    pub fn new(file_name: &str) -> Self {
        Self {
            parts: Vec::new(),
            line_offset: 0,
            builder: SourceMapBuilder::new(Some(file_name)),
        }
    }

    /// Appends one stylesheet and re-offsets its mappings.
    pub fn add(&mut self, css: &str, map: &SourceMap) {
        self.parts.push(css.to_string());
        self.parts.push("\n".to_string());

        let lines = count_newlines(css);

        for token in map.tokens() {
            let line = self.line_offset + token.get_dst_line();
            let col = token.get_dst_col();
            match token.get_source() {
                Some(source) => {
                    let src_id = self.builder.add_source(source);
                    let name_id = token.get_name().map(|name| self.builder.add_name(name));
                    self.builder.add_raw(
                        line,
                        col,
                        token.get_src_line(),
                        token.get_src_col(),
                        Some(src_id),
                        name_id,
                        false,
                    );
                }
                // Unmapped segments stay unmapped.
                None => {
                    self.builder.add_raw(line, col, 0, 0, None, None, false);
                }
            }
        }

        copy_sources_content(map, &mut self.builder);

        self.line_offset += lines + 1;
    }

    /// Finishes the concatenation, returning content and combined map.
    pub fn finish(self) -> (String, SourceMap) {
        (self.parts.concat(), self.builder.into_sourcemap())
    }
}

/// Counts `\n` characters in `text`.
fn count_newlines(text: &str) -> u32 {
    text.bytes().filter(|&b| b == b'\n').count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line_map(source: &str, contents: &str, lines: u32) -> SourceMap {
        let mut builder = SourceMapBuilder::new(None);
        let src = builder.add_source(source);
        builder.set_source_contents(src, Some(contents));
        for line in 0..lines {
            builder.add_raw(line, 0, line, 0, Some(src), None, false);
        }
        builder.into_sourcemap()
    }

    #[test]
    fn test_second_file_offset_by_lines_plus_separator() {
        let first = ".a {}\n.b {}\n.c {}\n";
        let second = ".d {}\n.e {}\n.f {}\n.g {}\n.h {}\n";

        let mut concat = Concat::new("main.css");
        concat.add(first, &line_map("a.css", first, 3));
        concat.add(second, &line_map("b.css", second, 5));

        let (content, map) = concat.finish();
        assert_eq!(content, format!("{first}\n{second}\n"));

        let b_lines: Vec<u32> = map
            .tokens()
            .filter(|t| t.get_source() == Some("b.css"))
            .map(|t| t.get_dst_line())
            .collect();
        assert_eq!(b_lines, vec![4, 5, 6, 7, 8]);

        // The generated lines land on the text they came from.
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[4], ".d {}");
        assert_eq!(lines[8], ".h {}");
    }

    #[test]
    fn test_sources_content_is_carried_forward() {
        let mut concat = Concat::new("main.css");
        concat.add(".a {}", &line_map("a.css", ".a {}", 1));
        concat.add(".b {}", &line_map("b.css", ".b {}", 1));
        let (_, map) = concat.finish();

        let contents: Vec<_> = map
            .sources()
            .enumerate()
            .map(|(idx, src)| (src.to_string(), map.get_source_contents(idx as u32)))
            .collect();
        assert_eq!(
            contents,
            vec![
                ("a.css".to_string(), Some(".a {}")),
                ("b.css".to_string(), Some(".b {}"))
            ]
        );
    }

    #[test]
    fn test_unmapped_tokens_stay_unmapped() {
        let mut builder = SourceMapBuilder::new(None);
        builder.add_raw(0, 3, 0, 0, None, None, false);
        let upstream = builder.into_sourcemap();

        let mut concat = Concat::new("main.css");
        concat.add("x\n", &line_map("a.css", "x\n", 1));
        concat.add("y", &upstream);
        let (_, map) = concat.finish();

        let token = map.tokens().last().unwrap();
        assert_eq!((token.get_dst_line(), token.get_dst_col()), (2, 3));
        assert_eq!(token.get_source(), None);
    }

    #[test]
    fn test_count_newlines() {
        assert_eq!(count_newlines(""), 0);
        assert_eq!(count_newlines("a\nb\n"), 2);
    }
}
