//! Content anchors: locate insertion points by scanning live document text.
//!
//! An [`Anchor`] is resolved against the document as it is *now*, after any
//! earlier insertions, so its result never depends on line numbers captured
//! before other patches ran.

use crate::document::SourceDocument;
use serde::Serialize;

/// Predicate over a single line's text (terminator excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "kebab-case")]
pub enum LineMatcher {
    /// Line contains the text anywhere
    Contains(String),
    /// Line, with leading whitespace removed, starts with the text
    StartsWith(String),
    /// Line, with trailing whitespace removed, ends with the text
    EndsWith(String),
    /// Line, trimmed on both ends, equals the text
    Trimmed(String),
    /// Line, with trailing whitespace removed, equals the text
    Exact(String),
    /// At least one inner matcher holds
    Any(Vec<LineMatcher>),
    /// Every inner matcher holds
    All(Vec<LineMatcher>),
}

impl LineMatcher {
    pub fn contains(text: impl Into<String>) -> Self {
        LineMatcher::Contains(text.into())
    }

    pub fn starts_with(text: impl Into<String>) -> Self {
        LineMatcher::StartsWith(text.into())
    }

    pub fn trimmed(text: impl Into<String>) -> Self {
        LineMatcher::Trimmed(text.into())
    }

    pub fn exact(text: impl Into<String>) -> Self {
        LineMatcher::Exact(text.into())
    }

    pub fn ends_with(text: impl Into<String>) -> Self {
        LineMatcher::EndsWith(text.into())
    }

    pub fn matches(&self, line: &str) -> bool {
        let line = strip_terminator(line);
        match self {
            LineMatcher::Contains(text) => line.contains(text.as_str()),
            LineMatcher::StartsWith(text) => line.trim_start().starts_with(text.as_str()),
            LineMatcher::Trimmed(text) => line.trim() == text,
            LineMatcher::Exact(text) => line.trim_end() == text,
            LineMatcher::EndsWith(text) => line.trim_end().ends_with(text.as_str()),
            LineMatcher::Any(all) => all.iter().any(|m| m.matches(line)),
            LineMatcher::All(all) => all.iter().all(|m| m.matches(line)),
        }
    }

    /// Representative text for similarity hints.
    fn probe(&self) -> &str {
        match self {
            LineMatcher::Contains(text)
            | LineMatcher::StartsWith(text)
            | LineMatcher::Trimmed(text)
            | LineMatcher::Exact(text)
            | LineMatcher::EndsWith(text) => text,
            LineMatcher::Any(all) | LineMatcher::All(all) => {
                all.first().map(LineMatcher::probe).unwrap_or("")
            }
        }
    }
}

/// Requirement on the lines immediately above a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Context {
    pub matcher: LineMatcher,
    /// How many lines above the candidate may satisfy `matcher` (1 = directly above)
    pub lines_above: usize,
}

/// Which match to return when several lines in the window qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    First,
    Last,
}

/// Bounded range of lines to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SearchWindow {
    pub start: usize,
    /// Maximum number of lines to scan; `None` scans to the end
    pub max_lines: Option<usize>,
}

impl SearchWindow {
    pub fn whole() -> Self {
        Self::default()
    }

    pub fn new(start: usize, max_lines: usize) -> Self {
        Self {
            start,
            max_lines: Some(max_lines),
        }
    }

    /// Half-open line range clamped to a document of `len` lines.
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.start.min(len);
        let end = match self.max_lines {
            Some(max) => start.saturating_add(max).min(len),
            None => len,
        };
        start..end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub matcher: LineMatcher,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    pub direction: Direction,
}

impl Anchor {
    pub fn new(matcher: LineMatcher) -> Self {
        Self {
            matcher,
            context: None,
            direction: Direction::First,
        }
    }

    /// Require a line within `lines_above` lines above the candidate to match.
    pub fn preceded_by(mut self, matcher: LineMatcher, lines_above: usize) -> Self {
        self.context = Some(Context {
            matcher,
            lines_above,
        });
        self
    }

    pub fn last(mut self) -> Self {
        self.direction = Direction::Last;
        self
    }

    fn accepts(&self, doc: &SourceDocument, index: usize) -> bool {
        let Some(line) = doc.line(index) else {
            return false;
        };
        if !self.matcher.matches(line) {
            return false;
        }
        match &self.context {
            None => true,
            Some(ctx) => (1..=ctx.lines_above)
                .filter_map(|offset| index.checked_sub(offset))
                .filter_map(|above| doc.line(above))
                .any(|above| ctx.matcher.matches(above)),
        }
    }

    /// Index of the matching line inside `window`, or `None`.
    pub fn locate(&self, doc: &SourceDocument, window: SearchWindow) -> Option<usize> {
        let mut range = window.range(doc.len());
        let found = match self.direction {
            Direction::First => range.find(|&i| self.accepts(doc, i)),
            Direction::Last => range.rev().find(|&i| self.accepts(doc, i)),
        };
        tracing::trace!(?window, ?found, matcher = ?self.matcher, "anchor scan");
        found
    }

    /// Closest line in `window` to this anchor's probe text.
    ///
    /// Used to explain a failed lookup; returns `(index, similarity)` for the
    /// best line scoring at least `threshold`.
    pub fn nearest(
        &self,
        doc: &SourceDocument,
        window: SearchWindow,
        threshold: f64,
    ) -> Option<(usize, f64)> {
        let probe = self.matcher.probe();
        if probe.trim().is_empty() {
            return None;
        }
        window
            .range(doc.len())
            .filter_map(|i| {
                let line = strip_terminator(doc.line(i)?).trim();
                if line.is_empty() {
                    return None;
                }
                Some((i, strsim::normalized_levenshtein(line, probe.trim())))
            })
            .filter(|(_, score)| *score >= threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
