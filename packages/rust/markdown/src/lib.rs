//! Book serialization.
//!
//! Renders an assembled [`Book`] as a single Markdown document (or as JSON).
//! Output depends only on the book value: no timestamps, no map iteration,
//! so identical corpora always render to identical bytes.

mod cleanup;

use std::fmt::Write as _;

use tracing::{debug, instrument};

use snipbook_shared::{Book, Chapter, OutputFormat, Result, SnippetRecord, SnipbookError};

/// Render a book in the requested format.
pub fn render(book: &Book, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(book)),
        OutputFormat::Json => render_json(book),
    }
}

/// Render a book as Markdown.
///
/// Layout: book title, a numbered contents list (empty chapters included so
/// numbering stays stable), one `##` section per chapter with a `###`
/// section per snippet, then a trailing diagnostics list when anything went
/// wrong.
#[instrument(skip_all, fields(title = %book.title, chapters = book.chapters.len()))]
pub fn render_markdown(book: &Book) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", book.title);

    out.push_str("## Contents\n\n");
    for (i, chapter) in book.chapters.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} ({})",
            i + 1,
            chapter.title,
            count_label(chapter.snippets.len())
        );
    }

    for (i, chapter) in book.chapters.iter().enumerate() {
        out.push('\n');
        render_chapter(&mut out, i + 1, chapter);
    }

    if !book.diagnostics.is_empty() {
        out.push_str("\n## Diagnostics\n\n");
        for diag in &book.diagnostics {
            let _ = writeln!(out, "- {diag}");
        }
    }

    debug!(len = out.len(), "markdown rendered");
    out
}

/// Render a book as pretty-printed JSON.
pub fn render_json(book: &Book) -> Result<String> {
    let mut json = serde_json::to_string_pretty(book)
        .map_err(|e| SnipbookError::validation(format!("JSON serialization failed: {e}")))?;
    json.push('\n');
    Ok(json)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn render_chapter(out: &mut String, number: usize, chapter: &Chapter) {
    let _ = writeln!(out, "## {number}. {}", chapter.title);

    if chapter.snippets.is_empty() {
        out.push_str("\n_No snippets._\n");
        return;
    }

    for snippet in &chapter.snippets {
        out.push('\n');
        render_snippet(out, snippet);
    }
}

fn render_snippet(out: &mut String, snippet: &SnippetRecord) {
    let _ = writeln!(out, "### {}\n", snippet.title);
    let _ = writeln!(out, "_Snippet {} · score {}_", snippet.id, snippet.score);

    let body = cleanup::run_pipeline(&snippet.body);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
}

fn count_label(n: usize) -> String {
    if n == 1 {
        "1 snippet".to_string()
    } else {
        format!("{n} snippets")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snipbook_shared::{ChapterKey, Diagnostic, Origin};

    fn snippet(id: i64, title: &str, body: &str) -> SnippetRecord {
        SnippetRecord {
            id,
            title: title.into(),
            score: id * 2,
            body: body.into(),
            code: vec![],
            origin: Origin::new("0010-intro/a.txt", 0),
        }
    }

    fn chapter(prefix: u64, name: &str, snippets: Vec<SnippetRecord>) -> Chapter {
        Chapter {
            key: ChapterKey {
                prefix: Some(prefix),
                name: name.into(),
            },
            title: name.to_uppercase(),
            dir: format!("{prefix:04}-{name}"),
            snippets,
        }
    }

    fn sample_book() -> Book {
        Book {
            title: "Rust Notes".into(),
            chapters: vec![
                chapter(
                    10,
                    "intro",
                    vec![
                        snippet(1, "Hello", "Say hi.\n\n```rust\nprintln!(\"hi\");\n```"),
                        snippet(2, "Bye", ""),
                    ],
                ),
                chapter(20, "empty", vec![]),
            ],
            diagnostics: vec![],
        }
    }

    #[test]
    fn markdown_layout() {
        let md = render_markdown(&sample_book());
        let expected = "\
# Rust Notes

## Contents

1. INTRO (2 snippets)
2. EMPTY (0 snippets)

## 1. INTRO

### Hello

_Snippet 1 · score 2_

Say hi.

```rust
println!(\"hi\");
```

### Bye

_Snippet 2 · score 4_

## 2. EMPTY

_No snippets._
";
        assert_eq!(md, expected);
    }

    #[test]
    fn diagnostics_section_only_when_present() {
        let mut book = sample_book();
        assert!(!render_markdown(&book).contains("## Diagnostics"));

        book.diagnostics.push(Diagnostic::MalformedEntry {
            origin: Origin::new("0010-intro/a.txt", 3),
            field: "Id".into(),
            message: "missing required field".into(),
        });
        let md = render_markdown(&book);
        assert!(md.ends_with(
            "## Diagnostics\n\n- malformed entry at 0010-intro/a.txt#3: Id: missing required field\n"
        ));
    }

    #[test]
    fn unclosed_fence_does_not_swallow_later_snippets() {
        let book = Book {
            title: "B".into(),
            chapters: vec![chapter(
                10,
                "intro",
                vec![snippet(1, "S1", "```rust\nlet x = 1;"), snippet(2, "S2", "hi")],
            )],
            diagnostics: vec![],
        };
        let md = render_markdown(&book);
        assert!(md.contains("```rust\nlet x = 1;\n```\n\n### S2\n"));
        assert_eq!(md.matches("```").count(), 2);
    }

    #[test]
    fn rendering_is_deterministic() {
        let book = sample_book();
        assert_eq!(render_markdown(&book), render_markdown(&book));
        assert_eq!(render_json(&book).unwrap(), render_json(&book).unwrap());
    }

    #[test]
    fn json_roundtrips_book() {
        let book = sample_book();
        let json = render(&book, OutputFormat::Json).unwrap();
        let parsed: Book = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, book);
    }
}
