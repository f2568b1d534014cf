//! Entry parser: one raw block → [`SnippetRecord`].
//!
//! Block format:
//! ```text
//! Title: Reading a file line by line
//! Id: 42
//! Score: 7
//! Body:
//! Free text, code fences, anything, up to the end of the block.
//! ```
//! Labels are case-insensitive. `Title` and `Id` are required, `Score`
//! defaults to 0 and `Body` to empty. Unknown labels before `Body` are
//! ignored.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use snipbook_shared::{Origin, SnippetRecord};

use crate::fences;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A block that could not become a snippet (the `MalformedEntry` condition).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct EntryError {
    /// The offending field label, or `header` for unparseable header lines.
    pub field: String,
    pub message: String,
}

impl EntryError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Header fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Id,
    Score,
    Body,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "title" => Some(Self::Title),
            "id" => Some(Self::Id),
            "score" => Some(Self::Score),
            "body" => Some(Self::Body),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Id => "Id",
            Self::Score => "Score",
            Self::Body => "Body",
        }
    }
}

/// Matches `Label: value` header lines.
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*)[ \t]*:(.*)$").expect("header field regex")
});

#[derive(Default)]
struct Header<'a> {
    title: Option<&'a str>,
    id: Option<&'a str>,
    score: Option<&'a str>,
}

impl<'a> Header<'a> {
    fn set(&mut self, field: Field, value: &'a str) -> Result<(), EntryError> {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Id => &mut self.id,
            Field::Score => &mut self.score,
            Field::Body => return Ok(()),
        };
        if slot.is_some() {
            return Err(EntryError::new(field.name(), "field appears more than once"));
        }
        *slot = Some(value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse one block into a snippet record.
pub fn parse_entry(text: &str, origin: Origin) -> Result<SnippetRecord, EntryError> {
    let mut header = Header::default();
    let mut body = String::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(caps) = FIELD_RE.captures(trimmed) else {
            return Err(EntryError::new(
                "header",
                format!("expected `Label: value`, found {trimmed:?}"),
            ));
        };
        let label = caps.get(1).map_or("", |m| m.as_str());
        let value = caps.get(2).map_or("", |m| m.as_str().trim());

        match Field::from_label(label) {
            Some(Field::Body) => {
                body = assemble_body(inline_body(line), &text[offset..]);
                break;
            }
            Some(field) => header.set(field, value)?,
            None => debug!(%origin, label, "ignoring unknown header field"),
        }
    }

    let title = match header.title {
        Some(t) if !t.is_empty() => t.to_string(),
        Some(_) => return Err(EntryError::new("Title", "must not be empty")),
        None => return Err(EntryError::new("Title", "missing required field")),
    };
    let id = match header.id {
        Some(raw) => parse_int(Field::Id, raw)?,
        None => return Err(EntryError::new("Id", "missing required field")),
    };
    let score = match header.score {
        Some(raw) => parse_int(Field::Score, raw)?,
        None => 0,
    };

    let code = fences::scan_code(&body);

    Ok(SnippetRecord {
        id,
        title,
        score,
        body,
        code,
        origin,
    })
}

fn parse_int(field: Field, raw: &str) -> Result<i64, EntryError> {
    raw.parse::<i64>()
        .map_err(|_| EntryError::new(field.name(), format!("expected an integer, found {raw:?}")))
}

/// Text after `Body:` on its own line, minus one separating space or tab.
///
/// Empty when nothing but whitespace follows the colon.
fn inline_body(line: &str) -> &str {
    let line = line.trim_end_matches(['\n', '\r']);
    let after = line.split_once(':').map_or("", |(_, rest)| rest);
    if after.trim().is_empty() {
        return "";
    }
    after
        .strip_prefix(' ')
        .or_else(|| after.strip_prefix('\t'))
        .unwrap_or(after)
}

/// Join any inline text after `Body:` with the rest of the block and trim
/// trailing whitespace. Blank lines are dropped only when they lead the body.
fn assemble_body(inline: &str, rest: &str) -> String {
    let body = if inline.is_empty() {
        let mut rest = rest;
        while let Some(pos) = rest.find('\n') {
            if rest[..pos].trim().is_empty() {
                rest = &rest[pos + 1..];
            } else {
                break;
            }
        }
        rest.to_string()
    } else {
        format!("{inline}\n{rest}")
    };
    body.trim_end().to_string()
}
