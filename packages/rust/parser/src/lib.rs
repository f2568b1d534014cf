//! Snippet corpus parsing.
//!
//! Turns the raw text of a corpus file into snippet records:
//! - [`split_blocks`] cuts a file into blocks on the separator token
//! - [`parse_entry`] reads the `Title`/`Id`/`Score`/`Body` header of a block
//! - [`scan_code`] and [`line_classes`] find verbatim code spans in a body

mod entry;
mod fences;
mod splitter;

pub use entry::{EntryError, parse_entry};
pub use fences::{BodyScan, LineClass, line_classes, scan_body, scan_code};
pub use splitter::{RawBlock, split_blocks};

use snipbook_shared::{Origin, SnippetRecord};

/// Outcome of parsing one block of a file.
#[derive(Debug, Clone)]
pub struct ParsedBlock {
    /// Block index within the file.
    pub index: usize,
    pub result: std::result::Result<SnippetRecord, EntryError>,
}

/// Split a file and parse every block, in block order.
///
/// `path` is the file path relative to the book root; it becomes the
/// [`Origin`] of each record.
pub fn parse_file(contents: &str, separator: &str, path: &str) -> Vec<ParsedBlock> {
    split_blocks(contents, separator)
        .into_iter()
        .map(|block| ParsedBlock {
            index: block.index,
            result: parse_entry(block.text, Origin::new(path, block.index)),
        })
        .collect()
}
