//! Fragment Patcher: adds Fragment vnode support to a virtual-DOM renderer
//!
//! A one-shot source patcher. The renderer module is loaded as a sequence of
//! lines, three snippets are inserted (an import, a type guard and a render
//! branch), and the file is replaced.
//!
//! # Architecture
//!
//! Loader ([`SourceDocument::load`]) → planner ([`patch::apply_patches`],
//! resolving positions through [`Anchor`]s) → writer ([`write::write_document`]).
//! [`pipeline`] strings the stages together and reports a typed
//! [`PatchOutcome`] per patch.
//!
//! # Safety
//!
//! - Insertion points resolve against live content, never stale line numbers
//! - Re-runs are no-ops: each patch checks for its own signature first
//! - Atomic file writes (tempfile + fsync + rename)
//! - Writes refuse to clobber a file changed since it was read
//! - Workspace boundary enforcement
//!
//! # Example
//!
//! ```no_run
//! use fragment_patcher::{PatchRun, Strategy};
//!
//! let report = PatchRun::load("packages/core/src/renderer/renderer.ts")?
//!     .apply(Strategy::Anchored)
//!     .write()?;
//!
//! for outcome in &report.outcomes {
//!     println!("{}: {}", outcome.id, outcome.outcome);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod anchor;
pub mod document;
pub mod patch;
pub mod pipeline;
pub mod safety;
pub mod write;

// Re-exports
pub use anchor::{Anchor, Direction, LineMatcher, SearchWindow};
pub use document::{DocumentError, LineEnding, SourceDocument};
pub use patch::{
    apply_patch, apply_patches, patch_set, Patch, PatchOutcome, PatchSet, Position, Snippet,
    Strategy, DEFAULT_TARGET,
};
pub use pipeline::{run, AppliedRun, PatchReport, PatchRun, RunError, RunReport};
pub use safety::{SafetyError, WorkspaceGuard};
pub use write::{atomic_write, write_document, WriteError};
