//! Core domain types for snipbook books.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Where a snippet (or a problem) came from inside a book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// File path relative to the book root, always `/` separated.
    pub path: String,
    /// Zero-based index of the block within its file.
    pub block: usize,
}

impl Origin {
    pub fn new(path: impl Into<String>, block: usize) -> Self {
        Self {
            path: path.into(),
            block,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.block)
    }
}

// ---------------------------------------------------------------------------
// SnippetRecord
// ---------------------------------------------------------------------------

/// How a code span was delimited in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    /// Opened and closed by a ```` ``` ```` or `~~~` fence.
    Fenced,
    /// Lines indented by four spaces or a tab.
    Indented,
}

/// A verbatim code span found in a snippet body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFragment {
    pub kind: CodeKind,
    /// Info string of a fence (`rust`, `sh`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// The code itself, whitespace and line breaks untouched.
    pub code: String,
    /// 1-based body line where the span starts.
    pub line: usize,
    /// `false` when a fence was never closed and ran to the end of the body.
    pub closed: bool,
}

/// One documentation entry, parsed from a single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetRecord {
    /// Dedup key, unique within a finished book.
    pub id: i64,
    /// Display title (never empty).
    pub title: String,
    /// Ranking signal; never used for ordering.
    pub score: i64,
    /// Verbatim body text.
    pub body: String,
    /// Code spans found in `body`, in body order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code: Vec<CodeFragment>,
    /// File and block this record was parsed from.
    pub origin: Origin,
}

// ---------------------------------------------------------------------------
// Chapter / Book
// ---------------------------------------------------------------------------

/// Sort identity of a chapter directory, e.g. `0010-intro` → `(Some(10), "intro")`.
///
/// Numbered chapters come first in prefix order, unnumbered ones after them;
/// ties are broken by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<u64>,
    pub name: String,
}

impl Ord for ChapterKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.prefix, other.prefix) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for ChapterKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An ordered, deduplicated set of snippets from one chapter directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub key: ChapterKey,
    /// Display title derived from the key name.
    pub title: String,
    /// Directory name relative to the book root.
    pub dir: String,
    pub snippets: Vec<SnippetRecord>,
}

impl Chapter {
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}

/// A compiled book: ordered chapters plus everything that went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Book {
    /// Total number of snippets across all chapters.
    pub fn snippet_count(&self) -> usize {
        self.chapters.iter().map(|c| c.snippets.len()).sum()
    }

    /// Number of `MalformedEntry` diagnostics.
    pub fn malformed_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::MalformedEntry { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Dedup policy
// ---------------------------------------------------------------------------

/// Which record survives when two share an id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// The later record in traversal order supersedes earlier drafts.
    #[default]
    LastWins,
    /// The first record seen is kept.
    FirstWins,
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastWins => f.write_str("last-wins"),
            Self::FirstWins => f.write_str("first-wins"),
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A recoverable problem found while building a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A block could not be parsed into a snippet and was skipped.
    MalformedEntry {
        origin: Origin,
        field: String,
        message: String,
    },
    /// Two snippets shared an id; only `kept` is in the book.
    DuplicateId {
        id: i64,
        kept: Origin,
        discarded: Origin,
    },
    /// A file or directory could not be read.
    Io { path: String, message: String },
    /// A snippet scored under the configured minimum and was dropped.
    BelowMinScore {
        id: i64,
        origin: Origin,
        score: i64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedEntry {
                origin,
                field,
                message,
            } => write!(f, "malformed entry at {origin}: {field}: {message}"),
            Self::DuplicateId {
                id,
                kept,
                discarded,
            } => write!(
                f,
                "duplicate id {id}: kept {kept}, discarded {discarded}"
            ),
            Self::Io { path, message } => write!(f, "unreadable {path}: {message}"),
            Self::BelowMinScore { id, origin, score } => {
                write!(f, "snippet {id} at {origin} dropped (score {score})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(prefix: Option<u64>, name: &str) -> ChapterKey {
        ChapterKey {
            prefix,
            name: name.into(),
        }
    }

    #[test]
    fn chapter_keys_sort_by_prefix_then_name() {
        let mut keys = vec![
            key(None, "appendix"),
            key(Some(20), "advanced"),
            key(Some(10), "intro"),
            key(Some(10), "basics"),
            key(None, "afterword"),
        ];
        keys.sort();

        let names: Vec<_> = keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(
            names,
            ["basics", "intro", "advanced", "afterword", "appendix"]
        );
    }

    #[test]
    fn dedup_policy_serializes_kebab_case() {
        let json = serde_json::to_string(&DedupPolicy::FirstWins).expect("serialize");
        assert_eq!(json, "\"first-wins\"");
        assert_eq!(DedupPolicy::default(), DedupPolicy::LastWins);
    }

    #[test]
    fn diagnostic_display_names_origins() {
        let diag = Diagnostic::DuplicateId {
            id: 5,
            kept: Origin::new("0010-intro/b.txt", 0),
            discarded: Origin::new("0010-intro/a.txt", 2),
        };
        assert_eq!(
            diag.to_string(),
            "duplicate id 5: kept 0010-intro/b.txt#0, discarded 0010-intro/a.txt#2"
        );
    }

    #[test]
    fn diagnostic_serializes_with_kind_tag() {
        let diag = Diagnostic::Io {
            path: "0020-advanced".into(),
            message: "permission denied".into(),
        };
        let json = serde_json::to_value(&diag).expect("serialize");
        assert_eq!(json["kind"], "io");
        assert_eq!(json["path"], "0020-advanced");
    }

    #[test]
    fn book_counts() {
        let book = Book {
            title: "Rust".into(),
            chapters: vec![Chapter {
                key: key(Some(1), "intro"),
                title: "Intro".into(),
                dir: "0001-intro".into(),
                snippets: vec![SnippetRecord {
                    id: 1,
                    title: "Hello".into(),
                    score: 0,
                    body: String::new(),
                    code: vec![],
                    origin: Origin::new("0001-intro/a.txt", 0),
                }],
            }],
            diagnostics: vec![Diagnostic::MalformedEntry {
                origin: Origin::new("0001-intro/a.txt", 1),
                field: "Id".into(),
                message: "missing".into(),
            }],
        };
        assert_eq!(book.snippet_count(), 1);
        assert_eq!(book.malformed_count(), 1);
    }
}
