//! End-to-end generation: book directory → chapters → book → document.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use snipbook_shared::{Book, BuildConfig, Result, SnipbookError};

use crate::assembler::{self, OutputMeta};
use crate::chapter::{self, ChapterOptions};
use crate::toc;

/// Cooperative cancellation shared between the caller and a running build.
///
/// Checked at every chapter boundary; a cancelled run emits nothing.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(SnipbookError::Cancelled);
        }
        Ok(())
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a chapter has been indexed.
    fn chapter_indexed(&self, title: &str, current: usize, total: usize);
    /// Called when a book has been written.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chapter_indexed(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &GenerateResult) {}
}

/// Result of generating one book.
#[derive(Debug)]
pub struct GenerateResult {
    pub book: Book,
    pub output: OutputMeta,
    pub elapsed: std::time::Duration,
}

/// Outcome for one book of a library run.
#[derive(Debug)]
pub struct LibraryEntry {
    /// Book directory name.
    pub name: String,
    pub result: Result<GenerateResult>,
}

/// Build the in-memory book for `root`.
///
/// Chapters are indexed on blocking worker threads, at most
/// `config.concurrency` at a time, and joined in chapter order.
#[instrument(skip_all, fields(root = %root.display()))]
pub async fn build_book(
    root: &Path,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<Book> {
    config.validate()?;

    progress.phase("Scanning chapters");
    let title = toc::book_title(root)?;
    let chapters = toc::order_chapters(assembler::list_dirs(root)?);

    info!(%title, chapters = chapters.len(), "building book");

    let opts = Arc::new(ChapterOptions::from(config));
    let semaphore = Arc::new(Semaphore::new(config.concurrency as usize));
    let mut handles = Vec::with_capacity(chapters.len());

    for (key, dir) in chapters {
        cancel.check()?;

        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SnipbookError::validation(format!("worker pool closed: {e}")))?;
        let root = root.to_path_buf();
        let opts = Arc::clone(&opts);
        let cancel = cancel.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            if cancel.is_cancelled() {
                return None;
            }
            Some(chapter::index_chapter(&root, &dir, key, &opts))
        }));
    }

    let total = handles.len();
    let mut indexes = Vec::with_capacity(total);
    for (i, handle) in handles.into_iter().enumerate() {
        let index = handle
            .await
            .map_err(|e| SnipbookError::validation(format!("chapter worker failed: {e}")))?;
        cancel.check()?;
        let Some(index) = index else {
            return Err(SnipbookError::Cancelled);
        };
        progress.chapter_indexed(&index.chapter.title, i + 1, total);
        indexes.push(index);
    }

    progress.phase("Assembling book");
    assembler::assemble_book(root, title, indexes, config.dedup, config.min_score)
}

/// Build, render, and write one book.
///
/// The document is written even when it carries diagnostics; callers decide
/// whether those exceed their tolerance via [`assembler::check_tolerance`].
#[instrument(skip_all, fields(root = %root.display(), output = %output.display()))]
pub async fn generate_book(
    root: &Path,
    output: &Path,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<GenerateResult> {
    let start = Instant::now();

    let book = build_book(root, config, progress, cancel).await?;

    progress.phase("Rendering");
    let document = snipbook_markdown::render(&book, config.format)?;

    cancel.check()?;
    progress.phase("Writing document");
    let meta = assembler::write_output(output, &document)?;

    let result = GenerateResult {
        book,
        output: meta,
        elapsed: start.elapsed(),
    };

    info!(
        snippets = result.book.snippet_count(),
        diagnostics = result.book.diagnostics.len(),
        sha256 = %result.output.sha256,
        elapsed_ms = result.elapsed.as_millis(),
        "book generated"
    );
    progress.done(&result);

    Ok(result)
}

/// Generate every book under `books_dir` into `out_dir`.
///
/// A failing book (`EmptyBook`, unreadable chapters root, ...) is recorded
/// and the remaining books still run. Cancellation stops the whole run.
#[instrument(skip_all, fields(books_dir = %books_dir.display()))]
pub async fn generate_library(
    books_dir: &Path,
    out_dir: &Path,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<Vec<LibraryEntry>> {
    config.validate()?;
    let books = assembler::list_dirs(books_dir)?;
    let mut entries = Vec::with_capacity(books.len());

    for name in books {
        cancel.check()?;

        let output: PathBuf = out_dir.join(format!("{name}.{}", config.format.extension()));
        let result = generate_book(&books_dir.join(&name), &output, config, progress, cancel).await;

        match &result {
            Err(SnipbookError::Cancelled) => return Err(SnipbookError::Cancelled),
            Err(e) => warn!(book = %name, error = %e, "book failed"),
            Ok(_) => {}
        }
        entries.push(LibraryEntry { name, result });
    }

    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
