//! Code span scanner for snippet bodies.
//!
//! Recognizes two conventions:
//! - fences: a run of 3+ backticks or tildes (up to 3 spaces of indent, an
//!   optional info string) closed by a run of the same character that is at
//!   least as long
//! - indented blocks: lines starting with 4 spaces or a tab, opened after a
//!   blank line (or at the top of the body) and outside any fence
//!
//! Code text is never altered. Line endings are kept as they appear.

use snipbook_shared::{CodeFragment, CodeKind};

/// Classification of one body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Ordinary text.
    Prose,
    /// An opening or closing fence line.
    Fence,
    /// A line inside a code span.
    Code,
}

/// Everything the scanner learned about a body.
#[derive(Debug, Clone, Default)]
pub struct BodyScan {
    /// One entry per line, as split by [`str::split_inclusive`] on `'\n'`.
    pub classes: Vec<LineClass>,
    /// Code spans in body order.
    pub fragments: Vec<CodeFragment>,
    /// Fence line that would close a fence still open at the end of the body.
    pub closing_fence: Option<String>,
}

/// Extract the code spans of a body.
pub fn scan_code(body: &str) -> Vec<CodeFragment> {
    scan_body(body).fragments
}

/// Classify each line of a body as prose, fence, or code.
pub fn line_classes(body: &str) -> Vec<LineClass> {
    scan_body(body).classes
}

struct OpenFence {
    ch: char,
    len: usize,
    language: Option<String>,
    line: usize,
    code: String,
}

impl OpenFence {
    fn finish(self, closed: bool) -> CodeFragment {
        CodeFragment {
            kind: CodeKind::Fenced,
            language: self.language,
            code: self.code,
            line: self.line,
            closed,
        }
    }
}

struct IndentedRun {
    line: usize,
    code: String,
    /// Blank lines seen since the last indented line; only part of the
    /// block if another indented line follows.
    pending: Vec<usize>,
}

impl IndentedRun {
    fn finish(self) -> CodeFragment {
        CodeFragment {
            kind: CodeKind::Indented,
            language: None,
            code: self.code,
            line: self.line,
            closed: true,
        }
    }
}

/// Scan a body line by line.
pub fn scan_body(body: &str) -> BodyScan {
    let lines: Vec<&str> = body.split_inclusive('\n').collect();
    let mut classes = Vec::with_capacity(lines.len());
    let mut fragments = Vec::new();
    let mut fence: Option<OpenFence> = None;
    let mut indented: Option<IndentedRun> = None;
    let mut prev_blank = true;

    for (i, line) in lines.iter().copied().enumerate() {
        if let Some(mut open) = fence.take() {
            if is_closing_fence(line, open.ch, open.len) {
                classes.push(LineClass::Fence);
                fragments.push(open.finish(true));
            } else {
                classes.push(LineClass::Code);
                open.code.push_str(line);
                fence = Some(open);
            }
            prev_blank = false;
            continue;
        }

        let blank = line.trim().is_empty();

        if let Some(mut run) = indented.take() {
            if blank {
                run.pending.push(i);
                classes.push(LineClass::Prose);
                indented = Some(run);
                prev_blank = true;
                continue;
            }
            if is_indented(line) {
                for idx in run.pending.drain(..) {
                    classes[idx] = LineClass::Code;
                    run.code.push_str(lines[idx]);
                }
                run.code.push_str(line);
                classes.push(LineClass::Code);
                indented = Some(run);
                prev_blank = false;
                continue;
            }
            fragments.push(run.finish());
        }

        if let Some(open) = open_fence(line, i + 1) {
            classes.push(LineClass::Fence);
            fence = Some(open);
            prev_blank = false;
            continue;
        }

        if !blank && prev_blank && is_indented(line) {
            indented = Some(IndentedRun {
                line: i + 1,
                code: line.to_string(),
                pending: Vec::new(),
            });
            classes.push(LineClass::Code);
            prev_blank = false;
            continue;
        }

        classes.push(LineClass::Prose);
        prev_blank = blank;
    }

    let mut closing_fence = None;
    if let Some(open) = fence {
        closing_fence = Some(open.ch.to_string().repeat(open.len));
        fragments.push(open.finish(false));
    }
    if let Some(run) = indented {
        fragments.push(run.finish());
    }

    BodyScan {
        classes,
        fragments,
        closing_fence,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_indented(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

/// Strip the line ending and up to three leading spaces.
fn fence_candidate(line: &str) -> Option<&str> {
    let content = line.trim_end_matches(['\n', '\r']);
    let stripped = content.trim_start_matches(' ');
    if content.len() - stripped.len() > 3 {
        return None;
    }
    Some(stripped)
}

fn open_fence(line: &str, line_no: usize) -> Option<OpenFence> {
    let stripped = fence_candidate(line)?;
    let ch = stripped.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }

    let len = stripped.chars().take_while(|c| *c == ch).count();
    if len < 3 {
        return None;
    }

    // Fence characters are ASCII, so `len` is also a byte offset.
    let info = stripped[len..].trim();
    if ch == '`' && info.contains('`') {
        return None;
    }

    Some(OpenFence {
        ch,
        len,
        language: info.split_whitespace().next().map(str::to_string),
        line: line_no,
        code: String::new(),
    })
}

fn is_closing_fence(line: &str, ch: char, open_len: usize) -> bool {
    let Some(stripped) = fence_candidate(line) else {
        return false;
    };
    let run = stripped.trim_end();
    !run.is_empty() && run.chars().all(|c| c == ch) && run.chars().count() >= open_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_is_verbatim() {
        let body = "Use it like this:\n\n```rust\nfn main() {\n    println!(\"hi\");  \n}\n```\n\nDone.\n";
        let frags = scan_code(body);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].kind, CodeKind::Fenced);
        assert_eq!(frags[0].language.as_deref(), Some("rust"));
        assert_eq!(frags[0].code, "fn main() {\n    println!(\"hi\");  \n}\n");
        assert_eq!(frags[0].line, 3);
        assert!(frags[0].closed);
    }

    #[test]
    fn tilde_fence_needs_matching_closer() {
        let body = "~~~~\n```\nstill code\n~~~\n~~~~\nafter\n";
        let frags = scan_code(body);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].code, "```\nstill code\n~~~\n");
        assert_eq!(frags[0].language, None);
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let frags = scan_code("text\n```sh\nls -la\n");
        assert_eq!(frags.len(), 1);
        assert!(!frags[0].closed);
        assert_eq!(frags[0].code, "ls -la\n");

        assert_eq!(scan_body("~~~~\ncode").closing_fence.as_deref(), Some("~~~~"));
        assert_eq!(scan_body("```\ncode\n```\n").closing_fence, None);
    }

    #[test]
    fn indented_block_after_blank_line() {
        let body = "Example:\n\n    let x = 1;\n\n    let y = 2;\n\nThat's it.\n";
        let frags = scan_code(body);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].kind, CodeKind::Indented);
        assert_eq!(frags[0].code, "    let x = 1;\n\n    let y = 2;\n");
        assert_eq!(frags[0].line, 3);

        let classes = line_classes(body);
        assert_eq!(
            classes,
            vec![
                LineClass::Prose,
                LineClass::Prose,
                LineClass::Code,
                LineClass::Code,
                LineClass::Code,
                LineClass::Prose,
                LineClass::Prose,
            ]
        );
    }

    #[test]
    fn indented_continuation_of_paragraph_is_prose() {
        let body = "A paragraph\n    continues here\n";
        assert!(scan_code(body).is_empty());
    }

    #[test]
    fn backtick_info_with_backtick_is_not_a_fence() {
        assert!(scan_code("``` not `a` fence\n").is_empty());
    }

    #[test]
    fn fence_lines_are_classified() {
        let classes = line_classes("```\ncode\n```\n");
        assert_eq!(
            classes,
            vec![LineClass::Fence, LineClass::Code, LineClass::Fence]
        );
    }

    #[test]
    fn mixed_spans_keep_body_order() {
        let body = "    first\nprose\n```py\nsecond\n```\n";
        let frags = scan_code(body);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].kind, CodeKind::Indented);
        assert_eq!(frags[1].language.as_deref(), Some("py"));
    }
}
