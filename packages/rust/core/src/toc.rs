//! Chapter and book identity.
//!
//! Reading order is encoded in directory names: `0010-intro` sorts before
//! `0020-advanced` because of its numeric prefix, and the rest of the name
//! becomes the display title. This module turns those names into
//! [`ChapterKey`]s and titles.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use snipbook_shared::{ChapterKey, Result, SnipbookError};

/// Optional metadata file in a book root.
pub const BOOK_META_FILE: &str = "book.toml";

/// Matches `<digits><sep><name>`, e.g. `0010-intro`, `2_setup`, `03.misc`.
static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[-_. ]+(.+)$").expect("prefix regex"));

/// `book.toml` contents.
#[derive(Debug, Default, Deserialize)]
struct BookMeta {
    title: Option<String>,
}

/// Split a directory name into its sort prefix and name.
pub fn parse_chapter_key(dir_name: &str) -> ChapterKey {
    if let Some(caps) = PREFIX_RE.captures(dir_name) {
        if let Ok(prefix) = caps[1].parse::<u64>() {
            return ChapterKey {
                prefix: Some(prefix),
                name: caps[2].to_string(),
            };
        }
    }

    ChapterKey {
        prefix: None,
        name: dir_name.to_string(),
    }
}

/// Order directory names by their chapter keys, ties broken by the full name.
pub fn order_chapters(dirs: Vec<String>) -> Vec<(ChapterKey, String)> {
    let mut keyed: Vec<(ChapterKey, String)> = dirs
        .into_iter()
        .map(|dir| (parse_chapter_key(&dir), dir))
        .collect();
    keyed.sort();
    keyed
}

/// Human-readable title from a slug-like name.
pub fn title_from_name(name: &str) -> String {
    name.replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    format!("{upper}{}", chars.collect::<String>())
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title of the book rooted at `root`.
///
/// Uses `title` from `book.toml` when present, otherwise the root directory
/// name (prefix stripped, title-cased).
pub fn book_title(root: &Path) -> Result<String> {
    let meta_path = root.join(BOOK_META_FILE);
    if meta_path.is_file() {
        let content = std::fs::read_to_string(&meta_path)
            .map_err(|e| SnipbookError::io(&meta_path, e))?;
        let meta: BookMeta = toml::from_str(&content).map_err(|e| {
            SnipbookError::config(format!("failed to parse {}: {e}", meta_path.display()))
        })?;
        if let Some(title) = meta.title.map(|t| t.trim().to_string()) {
            if !title.is_empty() {
                debug!(%title, "book title from {BOOK_META_FILE}");
                return Ok(title);
            }
        }
    }

    let dir_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Book".to_string());
    let key = parse_chapter_key(&dir_name);
    Ok(title_from_name(&key.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_prefixes() {
        let key = parse_chapter_key("0010-intro");
        assert_eq!(key.prefix, Some(10));
        assert_eq!(key.name, "intro");

        let key = parse_chapter_key("2_error-handling");
        assert_eq!(key.prefix, Some(2));
        assert_eq!(key.name, "error-handling");
    }

    #[test]
    fn names_without_prefix_keep_whole_name() {
        assert_eq!(parse_chapter_key("appendix").prefix, None);
        assert_eq!(parse_chapter_key("0010").name, "0010");
        assert_eq!(parse_chapter_key("2024edition").prefix, None);
    }

    #[test]
    fn order_uses_prefix_then_name() {
        let ordered = order_chapters(vec![
            "0020-advanced".into(),
            "appendix".into(),
            "0010-intro".into(),
            "10-basics".into(),
        ]);
        let dirs: Vec<_> = ordered.iter().map(|(_, d)| d.as_str()).collect();
        assert_eq!(dirs, ["10-basics", "0010-intro", "0020-advanced", "appendix"]);
    }

    #[test]
    fn title_from_name_converts_slugs() {
        assert_eq!(title_from_name("getting-started"), "Getting Started");
        assert_eq!(title_from_name("error_handling"), "Error Handling");
        assert_eq!(title_from_name("intro"), "Intro");
    }

    #[test]
    fn book_title_falls_back_to_dir_name() {
        let dir = std::env::temp_dir()
            .join(format!("sb-toc-test-{}", uuid::Uuid::now_v7()))
            .join("01-rust-notes");
        std::fs::create_dir_all(&dir).unwrap();

        assert_eq!(book_title(&dir).unwrap(), "Rust Notes");

        std::fs::write(dir.join(BOOK_META_FILE), "title = \"The Snippet Book\"\n").unwrap();
        assert_eq!(book_title(&dir).unwrap(), "The Snippet Book");

        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }
}
