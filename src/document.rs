//! In-memory line buffer for the patch target.
//!
//! A [`SourceDocument`] holds the target file as an ordered sequence of lines,
//! each line keeping its own terminator. Serialising an untouched document
//! therefore reproduces the file byte-for-byte.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8: {source}")]
    Utf8 {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
}

/// Line terminator style detected in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Pick the terminator used by the majority of lines, LF on ties.
    fn detect(lines: &[String]) -> Self {
        let crlf = lines.iter().filter(|l| l.ends_with("\r\n")).count();
        let lf = lines.iter().filter(|l| l.ends_with('\n')).count() - crlf;
        if crlf > lf {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    lines: Vec<String>,
    line_ending: LineEnding,
    fingerprint: u64,
}

impl SourceDocument {
    /// Read `path` into a document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let fingerprint = xxh3_64(&bytes);
        let text = String::from_utf8(bytes).map_err(|source| DocumentError::Utf8 {
            path: path.to_path_buf(),
            source,
        })?;

        let doc = Self::with_fingerprint(&text, fingerprint);
        tracing::debug!(
            path = %path.display(),
            lines = doc.len(),
            fingerprint = %format!("{fingerprint:016x}"),
            "loaded target"
        );
        Ok(doc)
    }

    pub fn from_text(text: &str) -> Self {
        Self::with_fingerprint(text, xxh3_64(text.as_bytes()))
    }

    fn with_fingerprint(text: &str, fingerprint: u64) -> Self {
        let lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        let line_ending = LineEnding::detect(&lines);
        Self {
            lines,
            line_ending,
            fingerprint,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line text at `index`, including its terminator.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// xxh3 hash of the bytes this document was loaded from.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Insert `snippet` so that its first line lands at `index`.
    ///
    /// The snippet is split into lines and each line takes the document's
    /// terminator. Lines at and after `index` shift down. Returns the number
    /// of lines inserted, or `None` if `index` is past the end.
    pub fn insert_snippet(&mut self, index: usize, snippet: &str) -> Option<usize> {
        if index > self.lines.len() {
            return None;
        }

        let eol = self.line_ending.as_str();

        // An unterminated last line must be closed before anything follows it.
        if index == self.lines.len() {
            if let Some(last) = self.lines.last_mut() {
                if !last.ends_with('\n') {
                    last.push_str(eol);
                }
            }
        }

        let new_lines: Vec<String> = snippet
            .split_inclusive('\n')
            .map(|line| {
                let body = line
                    .strip_suffix('\n')
                    .map(|l| l.strip_suffix('\r').unwrap_or(l))
                    .unwrap_or(line);
                format!("{body}{eol}")
            })
            .collect();

        let count = new_lines.len();
        self.lines.splice(index..index, new_lines);
        Some(count)
    }

    /// Serialise the document back to text.
    pub fn render(&self) -> String {
        self.lines.concat()
    }
}
