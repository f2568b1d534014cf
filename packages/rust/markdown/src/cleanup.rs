//! Cleanup pipeline for snippet bodies.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Prose keeps its author spacing (hard breaks, blank-line runs); the only
//! rewrite is heading demotion. Fence lines and code lines are emitted
//! exactly as they were written, and a fence left open is closed so it cannot
//! swallow the rest of the book.

use std::sync::LazyLock;

use regex::Regex;
use snipbook_parser::{LineClass, line_classes, scan_body};

/// Deepest heading level a snippet body may use once nested in a book
/// (book `#`, chapter `##`, snippet `###`).
const BODY_HEADING_OFFSET: usize = 3;

/// Run the full cleanup pipeline on a snippet body.
pub(crate) fn run_pipeline(body: &str) -> String {
    let mut result = body.to_string();

    result = demote_headings(&result);
    result = close_open_fence(&result);
    result = ensure_trailing_newline(&result);

    result
}

/// Apply `f` to each prose line (without its line ending), leaving code alone.
fn map_prose_lines(md: &str, f: impl Fn(&str) -> String) -> String {
    let classes = line_classes(md);
    let mut out = String::with_capacity(md.len());

    for (line, class) in md.split_inclusive('\n').zip(classes) {
        if class != LineClass::Prose {
            out.push_str(line);
            continue;
        }
        let (content, ending) = match line.strip_suffix('\n') {
            Some(content) => (content, "\n"),
            None => (line, ""),
        };
        out.push_str(&f(content));
        out.push_str(ending);
    }

    out
}

// ---------------------------------------------------------------------------
// Pass 1: Demote body headings below the snippet heading
// ---------------------------------------------------------------------------

fn demote_headings(md: &str) -> String {
    static H_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})(\s+.*)$").expect("valid regex"));

    map_prose_lines(md, |line| match H_RE.captures(line) {
        Some(caps) => {
            let level = (caps[1].len() + BODY_HEADING_OFFSET).min(6);
            format!("{}{}", "#".repeat(level), &caps[2])
        }
        None => line.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Pass 2: Close a fence left open at the end of the body
// ---------------------------------------------------------------------------

fn close_open_fence(md: &str) -> String {
    let Some(fence) = scan_body(md).closing_fence else {
        return md.to_string();
    };

    let mut out = md.to_string();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Pass 3: Exactly one trailing newline
// ---------------------------------------------------------------------------

fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches(['\n', '\r']);
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed}\n")
}
