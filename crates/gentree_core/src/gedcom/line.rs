//! GEDCOM line grammar.
//!
//! # Responsibility
//! - Parse `LEVEL TAG_OR_XREF [VALUE]` lines; anything else is skipped by
//!   callers without error.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s+(@\w+@|\w+)(\s+(.*))?$").expect("line grammar regex is valid")
});

/// One syntactically valid GEDCOM line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GedcomLine {
    pub level: u32,
    /// Bare tag (`NAME`) or `@id@`-bracketed cross-reference.
    pub tag: String,
    /// Free text to end of line; empty when absent.
    pub value: String,
}

/// Parses one raw line; `None` when it fails the grammar.
pub fn parse_line(raw: &str) -> Option<GedcomLine> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let captures = LINE_RE.captures(trimmed)?;
    let level = captures.get(1)?.as_str().parse().ok()?;
    Some(GedcomLine {
        level,
        tag: captures.get(2)?.as_str().to_string(),
        value: captures
            .get(4)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    })
}

/// Strips `@` brackets from a cross-reference value or tag.
pub fn strip_xref(value: &str) -> String {
    value.replace('@', "")
}
