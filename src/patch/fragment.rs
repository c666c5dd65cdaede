//! Built-in patch sets that teach the renderer about Fragment vnodes.
//!
//! Three insertions are made into the renderer module:
//!
//! 1. `fragment-import` - import of the `Fragment` symbol
//! 2. `fragment-type-guard` - an `isFragmentVNode` type guard
//! 3. `fragment-render-branch` - a `createDOMNode` branch rendering a
//!    fragment's children
//!
//! [`Strategy::Legacy`] places the first two at hardcoded line offsets. Any
//! change above those lines misplaces them, and a second run duplicates them.
//! [`Strategy::Anchored`] resolves every insertion against live content and
//! leaves patches whose signature is already present alone.

use crate::anchor::{Anchor, LineMatcher, SearchWindow};
use crate::patch::schema::{AnchorStep, Patch, PatchSet, Position, Snippet};
use serde::Serialize;
use std::fmt;

/// Renderer module patched when no other target is given, relative to the workspace root.
pub const DEFAULT_TARGET: &str = "packages/core/src/renderer/renderer.ts";

pub const IMPORT_ID: &str = "fragment-import";
pub const TYPE_GUARD_ID: &str = "fragment-type-guard";
pub const RENDER_BRANCH_ID: &str = "fragment-render-branch";

pub const IMPORT_SNIPPET: &str = "import { Fragment } from \"../vdom/vdom.js\";\n";

pub const TYPE_GUARD_SNIPPET: &str = "
function isFragmentVNode(vnode: VNode): vnode is VElement {
  return typeof vnode === 'object' && vnode !== null && 'type' in vnode && vnode.type === Fragment;
}
";

pub const RENDER_BRANCH_SNIPPET: &str = "    } else if (isFragmentVNode(vnode)) {
      // Fragment: render children directly
      const fragment = document.createDocumentFragment();
      (vnode.children || []).forEach((child: VNode) => fragment.appendChild(createDOMNode(child)));
      if (fragment.childNodes.length === 1) {
        return fragment.childNodes[0];
      } else if (fragment.childNodes.length === 0) {
        return document.createTextNode('');
      }
      const wrapper = document.createElement('div');
      wrapper.appendChild(fragment);
      return wrapper;
";

/// Line index of the legacy import insertion (after an 8-line header).
pub const LEGACY_IMPORT_OFFSET: usize = 8;
/// Line index of the legacy type-guard insertion, counted after the import landed.
pub const LEGACY_TYPE_GUARD_OFFSET: usize = 38;

/// Import statements are only searched for in this many leading lines.
const HEADER_WINDOW: usize = 60;
/// Lines scanned after `function isComponentVNode(` for the brace closing the function.
const GUARD_BODY_WINDOW: usize = 12;
/// Lines scanned from the text-node branch for its element-node sibling.
const BRANCH_SIBLING_WINDOW: usize = 10;
/// `createDOMNode` must appear within this many lines above the text-node branch.
const BRANCH_CONTEXT_LINES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Every insertion resolved from document content, re-runs are no-ops
    #[default]
    Anchored,
    /// Import and type guard at fixed offsets, no re-run guard
    Legacy,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Anchored => write!(f, "anchored"),
            Strategy::Legacy => write!(f, "legacy"),
        }
    }
}

pub fn patch_set(strategy: Strategy) -> PatchSet {
    match strategy {
        Strategy::Anchored => anchored_patch_set(),
        Strategy::Legacy => legacy_patch_set(),
    }
}

/// Locates the `isElementVNode` branch that follows the text-node branch of `createDOMNode`.
fn render_branch_position() -> Position {
    Position::Anchored(vec![
        AnchorStep::anywhere(
            Anchor::new(LineMatcher::contains("if (isTextVNode(vnode))"))
                .preceded_by(LineMatcher::contains("createDOMNode"), BRANCH_CONTEXT_LINES),
        ),
        AnchorStep::following(
            Anchor::new(LineMatcher::contains("isElementVNode(vnode)")),
            0,
            BRANCH_SIBLING_WINDOW,
        ),
    ])
}

fn legacy_patch_set() -> PatchSet {
    PatchSet {
        name: "fragment-support (legacy offsets)".to_string(),
        patches: vec![
            Patch {
                id: IMPORT_ID.to_string(),
                position: Position::FixedOffset(LEGACY_IMPORT_OFFSET),
                snippet: Snippet::before(IMPORT_SNIPPET),
                signature: None,
            },
            Patch {
                id: TYPE_GUARD_ID.to_string(),
                position: Position::FixedOffset(LEGACY_TYPE_GUARD_OFFSET),
                snippet: Snippet::before(TYPE_GUARD_SNIPPET),
                signature: None,
            },
            Patch {
                id: RENDER_BRANCH_ID.to_string(),
                position: render_branch_position(),
                snippet: Snippet::before(RENDER_BRANCH_SNIPPET),
                signature: None,
            },
        ],
    }
}

fn anchored_patch_set() -> PatchSet {
    let import_end = LineMatcher::Any(vec![
        LineMatcher::All(vec![
            LineMatcher::starts_with("import "),
            LineMatcher::ends_with(";"),
        ]),
        LineMatcher::starts_with("} from "),
    ]);

    PatchSet {
        name: "fragment-support".to_string(),
        patches: vec![
            Patch {
                id: IMPORT_ID.to_string(),
                position: Position::Anchored(vec![AnchorStep::within(
                    Anchor::new(import_end).last(),
                    SearchWindow::new(0, HEADER_WINDOW),
                )]),
                snippet: Snippet::after(IMPORT_SNIPPET),
                signature: Some(LineMatcher::contains("import { Fragment }")),
            },
            Patch {
                id: TYPE_GUARD_ID.to_string(),
                position: Position::Anchored(vec![
                    AnchorStep::anywhere(Anchor::new(LineMatcher::contains(
                        "function isComponentVNode(",
                    ))),
                    // Column-0 brace: nested blocks close indented.
                    AnchorStep::following(
                        Anchor::new(LineMatcher::exact("}")),
                        1,
                        GUARD_BODY_WINDOW,
                    ),
                ]),
                snippet: Snippet::after(TYPE_GUARD_SNIPPET),
                signature: Some(LineMatcher::contains("function isFragmentVNode(")),
            },
            Patch {
                id: RENDER_BRANCH_ID.to_string(),
                position: render_branch_position(),
                snippet: Snippet::before(RENDER_BRANCH_SNIPPET),
                signature: Some(LineMatcher::contains("isFragmentVNode(vnode)) {")),
            },
        ],
    }
}
