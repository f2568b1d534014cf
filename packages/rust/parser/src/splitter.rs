//! File splitter: one source file → ordered raw blocks.
//!
//! Splitting is purely textual. The separator is matched literally wherever
//! it occurs; header structure is never inspected here.

/// A contiguous span of a source file, between separators or file bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock<'a> {
    /// Position among the kept blocks of the file (0-based).
    pub index: usize,
    /// The block text, borrowed from the file contents.
    pub text: &'a str,
}

/// Split `contents` on every literal occurrence of `separator`.
///
/// Whitespace-only spans are discarded and do not consume an index. A file
/// without the separator yields the whole file as a single block; a blank
/// file yields none. An empty `separator` disables splitting.
pub fn split_blocks<'a>(contents: &'a str, separator: &str) -> Vec<RawBlock<'a>> {
    let spans: Vec<&'a str> = if separator.is_empty() {
        vec![contents]
    } else {
        contents.split(separator).collect()
    };

    spans
        .into_iter()
        .filter(|span| !span.trim().is_empty())
        .enumerate()
        .map(|(index, text)| RawBlock { index, text })
        .collect()
}
