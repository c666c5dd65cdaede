//! Patch applicator - resolves insertion points and mutates the document
//!
//! Patches run strictly in order. Each one sees the document exactly as the
//! previous patch left it, and every patch yields a [`PatchOutcome`] instead
//! of silently doing nothing.

use crate::anchor::SearchWindow;
use crate::document::SourceDocument;
use crate::patch::schema::{Patch, PatchSet, Placement, Position};
use serde::Serialize;
use std::fmt;

/// Minimum similarity for a line to be suggested as a near miss.
const NEAR_MISS_THRESHOLD: f64 = 0.6;

/// Result of applying a single patch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
#[must_use = "PatchOutcome should be checked for skips and failures"]
pub enum PatchOutcome {
    /// Snippet inserted; `line` is the 0-based index of its first line
    Applied { line: usize, lines_inserted: usize },
    /// Signature already present at `line`, nothing inserted
    AlreadyApplied { line: usize },
    /// Insertion point could not be resolved; document untouched
    Skipped { reason: String },
    /// Patch position could not be used; document untouched
    Failed { reason: String },
}

impl PatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied { .. })
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOutcome::Applied {
                line,
                lines_inserted,
            } => write!(f, "Inserted {} line(s) at line {}", lines_inserted, line + 1),
            PatchOutcome::AlreadyApplied { line } => {
                write!(f, "Already applied (found at line {})", line + 1)
            }
            PatchOutcome::Skipped { reason } => write!(f, "Skipped: {}", reason),
            PatchOutcome::Failed { reason } => write!(f, "Failed: {}", reason),
        }
    }
}

/// Apply every patch in `set` to `doc`, in order.
pub fn apply_patches(doc: &mut SourceDocument, set: &PatchSet) -> Vec<(String, PatchOutcome)> {
    set.patches
        .iter()
        .map(|patch| {
            let outcome = apply_patch(doc, patch);
            match &outcome {
                PatchOutcome::Applied { line, .. } => {
                    tracing::info!(patch = %patch.id, line = line + 1, "applied");
                }
                PatchOutcome::AlreadyApplied { line } => {
                    tracing::info!(patch = %patch.id, line = line + 1, "already applied");
                }
                PatchOutcome::Skipped { reason } => {
                    tracing::warn!(patch = %patch.id, %reason, "skipped");
                }
                PatchOutcome::Failed { reason } => {
                    tracing::error!(patch = %patch.id, %reason, "failed");
                }
            }
            (patch.id.clone(), outcome)
        })
        .collect()
}

/// Apply a single patch against the current document state.
pub fn apply_patch(doc: &mut SourceDocument, patch: &Patch) -> PatchOutcome {
    if let Some(signature) = &patch.signature {
        if let Some(line) = (0..doc.len()).find(|&i| doc.line(i).is_some_and(|l| signature.matches(l)))
        {
            return PatchOutcome::AlreadyApplied { line };
        }
    }

    let index = match resolve(doc, patch) {
        Ok(index) => index,
        Err(outcome) => return outcome,
    };

    match doc.insert_snippet(index, &patch.snippet.text) {
        Some(lines_inserted) => PatchOutcome::Applied {
            line: index,
            lines_inserted,
        },
        None => PatchOutcome::Failed {
            reason: format!(
                "insertion line {} is past the end of the document ({} lines)",
                index + 1,
                doc.len()
            ),
        },
    }
}

/// Compute the line index the snippet's first line will occupy.
fn resolve(doc: &SourceDocument, patch: &Patch) -> Result<usize, PatchOutcome> {
    match &patch.position {
        Position::FixedOffset(offset) => {
            if *offset > doc.len() {
                return Err(PatchOutcome::Failed {
                    reason: format!(
                        "fixed offset {} is past the end of the document ({} lines)",
                        offset,
                        doc.len()
                    ),
                });
            }
            Ok(*offset)
        }
        Position::Anchored(steps) => {
            let mut previous = None;
            for (n, step) in steps.iter().enumerate() {
                let window = step.scope.window(previous);
                match step.anchor.locate(doc, window) {
                    Some(found) => {
                        tracing::debug!(patch = %patch.id, step = n + 1, line = found + 1, "anchor resolved");
                        previous = Some(found);
                    }
                    None => {
                        return Err(PatchOutcome::Skipped {
                            reason: describe_miss(doc, patch, n, window),
                        })
                    }
                }
            }

            let Some(anchor_line) = previous else {
                return Err(PatchOutcome::Failed {
                    reason: "anchor chain has no steps".to_string(),
                });
            };

            Ok(match patch.snippet.placement {
                Placement::Before => anchor_line,
                Placement::After => anchor_line + 1,
            })
        }
    }
}

fn describe_miss(doc: &SourceDocument, patch: &Patch, step: usize, window: SearchWindow) -> String {
    let Position::Anchored(steps) = &patch.position else {
        return String::new();
    };
    let anchor = &steps[step].anchor;
    let range = window.range(doc.len());
    let mut reason = format!(
        "anchor step {}/{} ({:?}) matched nothing in lines {}..{}",
        step + 1,
        steps.len(),
        anchor.matcher,
        range.start + 1,
        range.end
    );
    if let Some((line, score)) = anchor.nearest(doc, window, NEAR_MISS_THRESHOLD) {
        let text = doc.line(line).unwrap_or("").trim();
        reason.push_str(&format!(
            "; closest was line {} ({:.0}% similar): {}",
            line + 1,
            score * 100.0,
            text
        ));
    }
    reason
}
