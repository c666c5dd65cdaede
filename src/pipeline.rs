//! One patch run: load, apply, write.
//!
//! The run states are types. [`PatchRun::load`] gives a loaded run,
//! [`PatchRun::apply`] turns it into an [`AppliedRun`], and
//! [`AppliedRun::write`] or [`AppliedRun::finish`] yields the [`RunReport`].

use crate::document::{DocumentError, SourceDocument};
use crate::patch::{apply_patches, patch_set, PatchOutcome, PatchSet, Strategy, ValidationError};
use crate::write::{write_document, WriteError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Read(#[from] DocumentError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("invalid patch set: {0}")]
    Invalid(#[from] ValidationError),
}

/// A target loaded and ready to patch.
#[derive(Debug)]
pub struct PatchRun {
    path: PathBuf,
    document: SourceDocument,
}

impl PatchRun {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref().to_path_buf();
        let document = SourceDocument::load(&path)?;
        Ok(Self { path, document })
    }

    /// Apply the built-in set for `strategy`.
    pub fn apply(self, strategy: Strategy) -> AppliedRun {
        let set = patch_set(strategy);
        self.apply_unchecked(strategy, &set)
    }

    /// Apply a caller-supplied set. The set is validated before the document is touched.
    pub fn apply_set(self, strategy: Strategy, set: &PatchSet) -> Result<AppliedRun, RunError> {
        set.validate()?;
        Ok(self.apply_unchecked(strategy, set))
    }

    fn apply_unchecked(self, strategy: Strategy, set: &PatchSet) -> AppliedRun {
        let original = self.document.render();
        let mut document = self.document;
        let outcomes = apply_patches(&mut document, set);
        AppliedRun {
            path: self.path,
            strategy,
            original,
            document,
            outcomes,
        }
    }
}

/// A run whose patches have been applied in memory.
#[derive(Debug)]
pub struct AppliedRun {
    path: PathBuf,
    strategy: Strategy,
    original: String,
    document: SourceDocument,
    outcomes: Vec<(String, PatchOutcome)>,
}

impl AppliedRun {
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn patched(&self) -> String {
        self.document.render()
    }

    pub fn outcomes(&self) -> &[(String, PatchOutcome)] {
        &self.outcomes
    }

    pub fn has_changes(&self) -> bool {
        self.outcomes.iter().any(|(_, outcome)| outcome.is_applied())
    }

    /// Persist the patched document. Untouched documents are not rewritten.
    pub fn write(self) -> Result<RunReport, WriteError> {
        let written = if self.has_changes() {
            write_document(&self.path, &self.document)?;
            true
        } else {
            tracing::info!(path = %self.path.display(), "no changes to write");
            false
        };
        Ok(self.into_report(written))
    }

    /// Report without touching the file.
    pub fn finish(self) -> RunReport {
        self.into_report(false)
    }

    fn into_report(self, written: bool) -> RunReport {
        RunReport {
            file: self.path,
            strategy: self.strategy,
            outcomes: self
                .outcomes
                .into_iter()
                .map(|(id, outcome)| PatchReport { id, outcome })
                .collect(),
            written,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub id: String,
    #[serde(flatten)]
    pub outcome: PatchOutcome,
}

/// Aggregated result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub file: PathBuf,
    pub strategy: Strategy,
    pub outcomes: Vec<PatchReport>,
    pub written: bool,
}

impl RunReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::Applied { .. }))
    }

    pub fn already_applied(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::AlreadyApplied { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::Failed { .. }))
    }

    /// True when some patches applied and others did not.
    pub fn is_partial(&self) -> bool {
        self.applied() > 0 && self.skipped() + self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&PatchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Load, patch and persist `path` in one go.
pub fn run(path: impl AsRef<Path>, strategy: Strategy) -> Result<RunReport, RunError> {
    let report = PatchRun::load(path)?.apply(strategy).write()?;
    Ok(report)
}
