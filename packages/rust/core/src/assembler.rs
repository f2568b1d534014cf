//! Book assembler.
//!
//! Takes the chapter indexes of one book, merges them in chapter order into a
//! [`Book`], and writes the serialized document to disk.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use snipbook_shared::{Book, DedupPolicy, Diagnostic, Result, SnipbookError};

use crate::chapter::{ChapterIndex, resolve_duplicates};

/// Output from a successful document write.
#[derive(Debug, Clone)]
pub struct OutputMeta {
    /// Where the document was written.
    pub path: PathBuf,
    /// SHA-256 of the document bytes, lowercase hex.
    pub sha256: String,
    pub size_bytes: usize,
}

/// Immediate, non-hidden sub-directories of `root`, sorted by name.
///
/// An unreadable root is fatal for the whole run.
pub fn list_dirs(root: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(root).map_err(|e| SnipbookError::io(root, e))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SnipbookError::io(root, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        dirs.push(name);
    }

    dirs.sort();
    Ok(dirs)
}

/// Merge chapter indexes (already in chapter order) into a book.
///
/// Ids are deduplicated across chapters with the same policy used inside
/// each chapter. `min_score` applies only to the survivors of deduplication,
/// so a low-scoring later version still displaces an earlier one. Chapters
/// that end up empty stay in the book so chapter numbering is stable. Fails
/// with `EmptyBook` when no snippet survives.
#[instrument(skip_all, fields(root = %root.display(), chapters = indexes.len()))]
pub fn assemble_book(
    root: &Path,
    title: String,
    indexes: Vec<ChapterIndex>,
    policy: DedupPolicy,
    min_score: Option<i64>,
) -> Result<Book> {
    let mut chapters = Vec::with_capacity(indexes.len());
    let mut diagnostics = Vec::new();
    for index in indexes {
        chapters.push(index.chapter);
        diagnostics.extend(index.diagnostics);
    }

    let (keep, duplicates) = resolve_duplicates(
        chapters.iter().flat_map(|c| c.snippets.iter()),
        policy,
    );
    if !duplicates.is_empty() {
        let mut flags = keep.into_iter();
        for chapter in &mut chapters {
            chapter
                .snippets
                .retain(|_| flags.next().unwrap_or(true));
        }
        diagnostics.extend(duplicates);
    }

    if let Some(min) = min_score {
        for chapter in &mut chapters {
            chapter.snippets.retain(|record| {
                if record.score >= min {
                    return true;
                }
                debug!(id = record.id, score = record.score, "below minimum score");
                diagnostics.push(Diagnostic::BelowMinScore {
                    id: record.id,
                    origin: record.origin.clone(),
                    score: record.score,
                });
                false
            });
        }
    }

    let book = Book {
        title,
        chapters,
        diagnostics,
    };

    if book.snippet_count() == 0 {
        return Err(SnipbookError::EmptyBook {
            root: root.to_path_buf(),
        });
    }

    info!(
        chapters = book.chapters.len(),
        snippets = book.snippet_count(),
        diagnostics = book.diagnostics.len(),
        "book assembled"
    );
    Ok(book)
}

/// Fail when the book has more malformed entries than `limit`.
pub fn check_tolerance(book: &Book, limit: usize) -> Result<()> {
    let count = book.malformed_count();
    if count > limit {
        return Err(SnipbookError::TooManyMalformed { count, limit });
    }
    Ok(())
}

/// Write a rendered document atomically (temp file, then rename).
#[instrument(skip(content), fields(len = content.len()))]
pub fn write_output(path: &Path, content: &str) -> Result<OutputMeta> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            SnipbookError::validation(format!("output path {} has no file name", path.display()))
        })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SnipbookError::io(parent, e))?;
    }

    let temp = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&temp, content).map_err(|e| SnipbookError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| SnipbookError::io(path, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(path = %path.display(), %sha256, "wrote document");

    Ok(OutputMeta {
        path: path.to_path_buf(),
        sha256,
        size_bytes: content.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc;
    use snipbook_shared::{Chapter, Origin, SnippetRecord};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sb-assembler-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn snippet(id: i64, path: &str) -> SnippetRecord {
        SnippetRecord {
            id,
            title: format!("Snippet {id}"),
            score: 0,
            body: String::new(),
            code: vec![],
            origin: Origin::new(path, 0),
        }
    }

    fn index(dir: &str, snippets: Vec<SnippetRecord>) -> ChapterIndex {
        ChapterIndex {
            chapter: Chapter {
                key: toc::parse_chapter_key(dir),
                title: toc::title_from_name(&toc::parse_chapter_key(dir).name),
                dir: dir.into(),
                snippets,
            },
            diagnostics: vec![],
        }
    }

    #[test]
    fn cross_chapter_duplicates_resolved_in_book_order() {
        let indexes = vec![
            index("0010-intro", vec![snippet(1, "0010-intro/a.txt"), snippet(2, "0010-intro/a.txt")]),
            index("0020-advanced", vec![snippet(2, "0020-advanced/b.txt")]),
        ];

        let book = assemble_book(
            Path::new("book"),
            "B".into(),
            indexes,
            DedupPolicy::LastWins,
            None,
        )
        .unwrap();
        assert_eq!(book.chapters[0].snippets.len(), 1);
        assert_eq!(book.chapters[1].snippets[0].origin.path, "0020-advanced/b.txt");
        assert_eq!(
            book.diagnostics,
            vec![Diagnostic::DuplicateId {
                id: 2,
                kept: Origin::new("0020-advanced/b.txt", 0),
                discarded: Origin::new("0010-intro/a.txt", 0),
            }]
        );
    }

    #[test]
    fn empty_chapters_are_kept() {
        let indexes = vec![
            index("0010-intro", vec![snippet(1, "0010-intro/a.txt")]),
            index("0020-empty", vec![]),
        ];
        let book = assemble_book(
            Path::new("book"),
            "B".into(),
            indexes,
            DedupPolicy::LastWins,
            None,
        )
        .unwrap();
        assert_eq!(book.chapters.len(), 2);
        assert!(book.chapters[1].is_empty());
    }

    #[test]
    fn book_without_snippets_is_empty_book() {
        let err = assemble_book(
            Path::new("book"),
            "B".into(),
            vec![index("0010-intro", vec![])],
            DedupPolicy::LastWins,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SnipbookError::EmptyBook { .. }));

        let err = assemble_book(
            Path::new("book"),
            "B".into(),
            vec![],
            DedupPolicy::LastWins,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SnipbookError::EmptyBook { .. }));
    }

    #[test]
    fn tolerance_counts_only_malformed_entries() {
        let mut book = assemble_book(
            Path::new("book"),
            "B".into(),
            vec![index("ch", vec![snippet(1, "ch/a.txt")])],
            DedupPolicy::LastWins,
            None,
        )
        .unwrap();
        book.diagnostics.push(Diagnostic::Io {
            path: "ch/b.txt".into(),
            message: "denied".into(),
        });
        assert!(check_tolerance(&book, 0).is_ok());

        book.diagnostics.push(Diagnostic::MalformedEntry {
            origin: Origin::new("ch/a.txt", 1),
            field: "Id".into(),
            message: "missing required field".into(),
        });
        assert!(check_tolerance(&book, 1).is_ok());
        let err = check_tolerance(&book, 0).unwrap_err();
        assert!(matches!(err, SnipbookError::TooManyMalformed { count: 1, limit: 0 }));
    }

    #[test]
    fn min_score_filters_with_diagnostic() {
        let mut low = snippet(1, "ch/a.txt");
        low.score = -4;
        let mut high = snippet(2, "ch/a.txt");
        high.score = 9;

        let book = assemble_book(
            Path::new("book"),
            "B".into(),
            vec![index("ch", vec![low, high])],
            DedupPolicy::LastWins,
            Some(0),
        )
        .unwrap();
        assert_eq!(book.chapters[0].snippets.len(), 1);
        assert_eq!(book.chapters[0].snippets[0].id, 2);
        assert!(matches!(
            book.diagnostics[0],
            Diagnostic::BelowMinScore { id: 1, score: -4, .. }
        ));
    }

    #[test]
    fn min_score_applies_after_dedup() {
        let mut draft = snippet(3, "0010-intro/a.txt");
        draft.score = 5;
        let mut last = snippet(3, "0020-advanced/b.txt");
        last.score = -1;

        let book = assemble_book(
            Path::new("book"),
            "B".into(),
            vec![
                index("0010-intro", vec![draft, snippet(1, "0010-intro/a.txt")]),
                index("0020-advanced", vec![last]),
            ],
            DedupPolicy::LastWins,
            Some(0),
        )
        .unwrap();

        let ids: Vec<i64> = book
            .chapters
            .iter()
            .flat_map(|c| c.snippets.iter().map(|s| s.id))
            .collect();
        assert_eq!(ids, [1]);
        assert!(matches!(
            book.diagnostics[0],
            Diagnostic::DuplicateId { id: 3, .. }
        ));
        assert!(matches!(
            book.diagnostics[1],
            Diagnostic::BelowMinScore { id: 3, score: -1, .. }
        ));
    }

    #[test]
    fn list_dirs_skips_files_and_hidden() {
        let tmp = temp_dir();
        std::fs::create_dir_all(tmp.join("0020-b")).unwrap();
        std::fs::create_dir_all(tmp.join("0010-a")).unwrap();
        std::fs::create_dir_all(tmp.join(".git")).unwrap();
        std::fs::write(tmp.join("book.toml"), "title = \"x\"\n").unwrap();

        assert_eq!(list_dirs(&tmp).unwrap(), ["0010-a", "0020-b"]);
        assert!(list_dirs(&tmp.join("nope")).is_err());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_output_is_atomic_and_hashed() {
        let tmp = temp_dir();
        let path = tmp.join("out/book.md");

        let meta = write_output(&path, "# Book\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Book\n");
        assert_eq!(meta.size_bytes, 7);
        assert_eq!(meta.sha256.len(), 64);

        for entry in std::fs::read_dir(tmp.join("out")).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let again = write_output(&path, "# Book\n").unwrap();
        assert_eq!(again.sha256, meta.sha256);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
