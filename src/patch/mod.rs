pub mod applicator;
pub mod fragment;
pub mod schema;

pub use applicator::{apply_patch, apply_patches, PatchOutcome};
pub use fragment::{patch_set, Strategy, DEFAULT_TARGET};
pub use schema::{
    AnchorStep, Patch, PatchSet, Placement, Position, Scope, Snippet, ValidationError,
    ValidationIssue,
};
