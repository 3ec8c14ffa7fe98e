//! Composition of two source maps.

use sourcemap::{SourceMap, SourceMapBuilder};

/// Chains `outer` through `inner`.
///
/// `outer` maps a reprinted stylesheet back to the text `inner` was
/// generated for. Each outer mapping is looked up in `inner` on the same
/// generated line, so the result points straight at the original sources.
/// Mappings that land on text `inner` knows nothing about are dropped.
pub fn compose(outer: &SourceMap, inner: &SourceMap) -> SourceMap {
    let mut builder = SourceMapBuilder::new(outer.get_file());

    for token in outer.tokens() {
        if token.get_source().is_none() {
            continue;
        }
        let Some(original) = inner.lookup_token(token.get_src_line(), token.get_src_col()) else {
            continue;
        };
        if original.get_dst_line() != token.get_src_line() {
            continue;
        }
        let Some(source) = original.get_source() else {
            continue;
        };

        let src_id = builder.add_source(source);
        let name_id = original.get_name().map(|name| builder.add_name(name));
        builder.add_raw(
            token.get_dst_line(),
            token.get_dst_col(),
            original.get_src_line(),
            original.get_src_col(),
            Some(src_id),
            name_id,
            false,
        );
    }

    copy_sources_content(inner, &mut builder);
    builder.into_sourcemap()
}

/// Copies every embedded `sourcesContent` entry of `map` into `builder`.
pub(crate) fn copy_sources_content(map: &SourceMap, builder: &mut SourceMapBuilder) {
    for (idx, source) in map.sources().enumerate() {
        if let Some(contents) = map.get_source_contents(idx as u32) {
            let id = builder.add_source(source);
            builder.set_source_contents(id, Some(contents));
        }
    }
}
