//! Chapter index: one chapter directory → ordered, deduplicated snippets.
//!
//! Files are visited in file-name order and blocks in file order. Problems
//! with a single block or file become [`Diagnostic`]s; indexing a chapter
//! never fails as a whole.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, instrument, warn};

use snipbook_shared::{
    BuildConfig, Chapter, ChapterKey, DedupPolicy, Diagnostic, Origin, SnippetRecord,
};

use crate::toc;

/// Settings the chapter index needs from the build config.
#[derive(Debug, Clone)]
pub struct ChapterOptions {
    pub separator: String,
    pub dedup: DedupPolicy,
}

impl From<&BuildConfig> for ChapterOptions {
    fn from(config: &BuildConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            dedup: config.dedup,
        }
    }
}

/// A finished chapter plus the problems found while building it.
#[derive(Debug, Clone)]
pub struct ChapterIndex {
    pub chapter: Chapter,
    pub diagnostics: Vec<Diagnostic>,
}

/// Index the chapter directory `dir_name` under `book_root`.
#[instrument(skip_all, fields(chapter = %dir_name))]
pub fn index_chapter(
    book_root: &Path,
    dir_name: &str,
    key: ChapterKey,
    opts: &ChapterOptions,
) -> ChapterIndex {
    let mut diagnostics = Vec::new();
    let mut records = Vec::new();

    let title = toc::title_from_name(&key.name);
    let dir = book_root.join(dir_name);

    match list_files(&dir) {
        Ok(files) => {
            for file_name in files {
                let rel_path = format!("{dir_name}/{file_name}");
                read_file(
                    &dir.join(&file_name),
                    &rel_path,
                    opts,
                    &mut records,
                    &mut diagnostics,
                );
            }
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "chapter directory unreadable");
            diagnostics.push(Diagnostic::Io {
                path: dir_name.to_string(),
                message: e.to_string(),
            });
        }
    }

    let (keep, duplicates) = resolve_duplicates(records.iter(), opts.dedup);
    diagnostics.extend(duplicates);
    let snippets: Vec<SnippetRecord> = records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, kept)| kept.then_some(record))
        .collect();

    debug!(
        snippets = snippets.len(),
        diagnostics = diagnostics.len(),
        "chapter indexed"
    );

    ChapterIndex {
        chapter: Chapter {
            key,
            title,
            dir: dir_name.to_string(),
            snippets,
        },
        diagnostics,
    }
}

/// Decide which records survive an id collision.
///
/// Returns one flag per record (in input order) and a `DuplicateId`
/// diagnostic per collision, in traversal order.
pub fn resolve_duplicates<'a>(
    records: impl Iterator<Item = &'a SnippetRecord>,
    policy: DedupPolicy,
) -> (Vec<bool>, Vec<Diagnostic>) {
    let records: Vec<&SnippetRecord> = records.collect();
    let mut keep = vec![true; records.len()];
    let mut survivors: HashMap<i64, usize> = HashMap::new();
    let mut diagnostics = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let Some(&prev) = survivors.get(&record.id) else {
            survivors.insert(record.id, i);
            continue;
        };

        let (kept, discarded) = match policy {
            DedupPolicy::LastWins => {
                keep[prev] = false;
                survivors.insert(record.id, i);
                (i, prev)
            }
            DedupPolicy::FirstWins => {
                keep[i] = false;
                (prev, i)
            }
        };

        let diag = Diagnostic::DuplicateId {
            id: record.id,
            kept: records[kept].origin.clone(),
            discarded: records[discarded].origin.clone(),
        };
        warn!(%diag, "duplicate snippet id");
        diagnostics.push(diag);
    }

    (keep, diagnostics)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Regular, non-hidden files of a directory, sorted by name.
fn list_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if !entry.path().is_file() {
            debug!(%name, "skipping non-file entry");
            continue;
        }
        files.push(name);
    }

    files.sort();
    Ok(files)
}

/// Read, split, and parse one file, appending to the chapter's buffers.
fn read_file(
    path: &Path,
    rel_path: &str,
    opts: &ChapterOptions,
    records: &mut Vec<SnippetRecord>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %rel_path, error = %e, "file unreadable, skipping");
            diagnostics.push(Diagnostic::Io {
                path: rel_path.to_string(),
                message: e.to_string(),
            });
            return;
        }
    };

    let parsed = snipbook_parser::parse_file(&contents, &opts.separator, rel_path);
    debug!(path = %rel_path, blocks = parsed.len(), "file parsed");

    for block in parsed {
        match block.result {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %rel_path, block = block.index, error = %e, "malformed entry");
                diagnostics.push(Diagnostic::MalformedEntry {
                    origin: Origin::new(rel_path, block.index),
                    field: e.field,
                    message: e.message,
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
