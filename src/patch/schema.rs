use crate::anchor::{Anchor, LineMatcher, SearchWindow};
use serde::Serialize;
use std::fmt;

/// Ordered list of patches applied to one document.
#[derive(Debug, Clone, Serialize)]
pub struct PatchSet {
    pub name: String,
    pub patches: Vec<Patch>,
}

impl PatchSet {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        for patch in &self.patches {
            if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            }
            if patch.snippet.text.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: Some(patch.id.clone()),
                    field: "snippet.text",
                });
            }
            if let Position::Anchored(steps) = &patch.position {
                if steps.is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        patch_id: Some(patch.id.clone()),
                        field: "position.steps",
                    });
                }
                if matches!(
                    steps.first(),
                    Some(AnchorStep {
                        scope: Scope::Following { .. },
                        ..
                    })
                ) {
                    issues.push(ValidationIssue::InvalidCombo {
                        patch_id: Some(patch.id.clone()),
                        message: "first anchor step has no previous line to follow".to_string(),
                    });
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        for patch in &self.patches {
            if !seen.insert(patch.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(patch.id.clone()));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Patch {
    pub id: String,
    pub position: Position,
    pub snippet: Snippet,
    /// Present when the patch is already in the document; `None` disables the check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<LineMatcher>,
}

/// How a patch finds its insertion line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Position {
    /// Insert at a 0-based line index computed ahead of time.
    ///
    /// Blind to earlier insertions: anything that shifts lines above the
    /// offset moves the snippet with it.
    FixedOffset(usize),
    /// Resolve against live content, one step at a time.
    Anchored(Vec<AnchorStep>),
}

/// One link in an anchor chain.
#[derive(Debug, Clone, Serialize)]
pub struct AnchorStep {
    pub anchor: Anchor,
    pub scope: Scope,
}

impl AnchorStep {
    pub fn anywhere(anchor: Anchor) -> Self {
        Self {
            anchor,
            scope: Scope::Absolute(SearchWindow::whole()),
        }
    }

    pub fn within(anchor: Anchor, window: SearchWindow) -> Self {
        Self {
            anchor,
            scope: Scope::Absolute(window),
        }
    }

    /// Scan `max_lines` lines starting `offset` lines after the previous step's match.
    pub fn following(anchor: Anchor, offset: usize, max_lines: usize) -> Self {
        Self {
            anchor,
            scope: Scope::Following { offset, max_lines },
        }
    }
}

/// Search window of an anchor step.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    Absolute(SearchWindow),
    Following { offset: usize, max_lines: usize },
}

impl Scope {
    pub fn window(&self, previous: Option<usize>) -> SearchWindow {
        match *self {
            Scope::Absolute(window) => window,
            Scope::Following { offset, max_lines } => {
                SearchWindow::new(previous.unwrap_or(0).saturating_add(offset), max_lines)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Before,
    After,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snippet {
    pub text: String,
    pub placement: Placement,
}

impl Snippet {
    pub fn before(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            placement: Placement::Before,
        }
    }

    pub fn after(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            placement: Placement::After,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyPatchList,
    DuplicateId(String),
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        patch_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "patch set contains no patches"),
            ValidationIssue::DuplicateId(id) => write!(f, "patch id '{id}' is used more than once"),
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { patch_id, message } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid patch configuration: {message}"),
            },
        }
    }
}
