//! End-to-end tests of the Fragment patch sets against a renderer fixture.
//!
//! Fixture layout (1-based): lines 1-8 are the import header, line 9 is the
//! first statement, `isComponentVNode` closes on line 37, `createDOMNode`
//! opens on line 39 with `if (isTextVNode(vnode)) {` on line 41 and the
//! `isElementVNode(vnode)` branch on line 43.

use fragment_patcher::patch::fragment::{
    IMPORT_ID, IMPORT_SNIPPET, RENDER_BRANCH_ID, RENDER_BRANCH_SNIPPET, TYPE_GUARD_ID,
    TYPE_GUARD_SNIPPET,
};
use fragment_patcher::{run, PatchOutcome, PatchRun, RunReport, Strategy};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const RENDERER: &str = include_str!("fixtures/renderer.ts");

fn setup(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("renderer.ts");
    fs::write(&path, content).unwrap();
    (dir, path)
}

fn fixture_lines() -> Vec<&'static str> {
    RENDERER.split_inclusive('\n').collect()
}

/// The fixture with all three snippets at their intended positions.
fn expected_patched() -> String {
    let lines = fixture_lines();
    let mut out = String::new();
    out.extend(lines[..8].iter().copied());
    out.push_str(IMPORT_SNIPPET);
    out.extend(lines[8..37].iter().copied());
    out.push_str(TYPE_GUARD_SNIPPET);
    out.extend(lines[37..42].iter().copied());
    out.push_str(RENDER_BRANCH_SNIPPET);
    out.extend(lines[42..].iter().copied());
    out
}

fn outcome<'a>(report: &'a RunReport, id: &str) -> &'a PatchOutcome {
    &report
        .outcomes
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("no outcome for {id}"))
        .outcome
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

fn position(lines: &[&str], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("{needle} not found"))
}

#[test]
fn test_scenario_positions() {
    for strategy in [Strategy::Anchored, Strategy::Legacy] {
        let (_dir, path) = setup(RENDERER);
        let report = run(&path, strategy).unwrap();
        assert!(report.written);
        assert_eq!(report.applied(), 3, "{strategy}");

        let patched = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = patched.split_inclusive('\n').collect();

        // Import lands as line 9, pushing the first statement to line 10.
        assert_eq!(lines[8], IMPORT_SNIPPET);
        assert!(lines[9].starts_with("const SVG_NS"));

        // Type guard starts at index 38 (the shifted original line 38).
        assert_eq!(lines[38], "\n");
        assert!(lines[39].starts_with("function isFragmentVNode("));
        assert_eq!(lines[37], "}\n");

        // Render branch sits directly above the isElementVNode branch.
        let branch = position(&lines, "} else if (isFragmentVNode(vnode)) {");
        let element = position(&lines, "isElementVNode(vnode)) {");
        assert_eq!(branch, 47);
        assert_eq!(element, branch + RENDER_BRANCH_SNIPPET.lines().count());

        assert_eq!(patched, expected_patched(), "{strategy}");
    }
}

#[test]
fn test_each_snippet_inserted_once() {
    let (_dir, path) = setup(RENDERER);
    run(&path, Strategy::Anchored).unwrap();
    let patched = fs::read_to_string(&path).unwrap();

    assert_eq!(count(&patched, "import { Fragment }"), 1);
    assert_eq!(count(&patched, "function isFragmentVNode("), 1);
    assert_eq!(count(&patched, "} else if (isFragmentVNode(vnode)) {"), 1);
}

#[test]
fn test_lookalike_import_does_not_count_as_fragment_import() {
    let renamed = RENDERER.replace(
        "import { scheduleUpdate } from",
        "import { scheduleUpdate, flushFragmentQueue } from",
    );
    assert_ne!(renamed, RENDERER);
    let (_dir, path) = setup(&renamed);

    let report = run(&path, Strategy::Anchored).unwrap();
    assert!(matches!(
        outcome(&report, IMPORT_ID),
        PatchOutcome::Applied { line: 8, .. }
    ));
    assert_eq!(report.applied(), 3);

    let patched = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = patched.split_inclusive('\n').collect();
    assert_eq!(lines[8], IMPORT_SNIPPET);
    assert_eq!(count(&patched, "import { Fragment }"), 1);
    assert!(patched.contains("vnode.type === Fragment"));
}

#[test]
fn test_type_guard_skips_nested_closing_brace() {
    let nested = RENDERER.replace(
        "  return (\n    typeof vnode === 'object' &&\n    vnode !== null &&\n    'type' in vnode &&\n    typeof vnode.type === 'function' &&\n    isComponent(vnode.type)\n  );\n}\n",
        "  if (typeof vnode !== 'object' || vnode === null) {\n    return false;\n  }\n  return 'type' in vnode && isComponent(vnode.type);\n}\n",
    );
    assert_ne!(nested, RENDERER);
    let (_dir, path) = setup(&nested);

    let report = run(&path, Strategy::Anchored).unwrap();
    assert_eq!(report.applied(), 3);

    let patched = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = patched.split_inclusive('\n').collect();
    let guard = position(&lines, "function isFragmentVNode(");
    assert_eq!(lines[guard - 1], "\n");
    assert_eq!(lines[guard - 2], "}\n");
    assert!(lines[guard - 3].contains("isComponent(vnode.type);"));
}

#[test]
fn test_branch_between_text_branch_and_anchor() {
    let (_dir, path) = setup(RENDERER);
    run(&path, Strategy::Anchored).unwrap();
    let patched = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = patched.split_inclusive('\n').collect();

    let text = position(&lines, "if (isTextVNode(vnode)) {");
    let branch = position(&lines, "} else if (isFragmentVNode(vnode)) {");
    let element = position(&lines, "} else if (isElementVNode(vnode)) {");
    assert!(text < branch);
    assert!(branch < element);
}

#[test]
fn test_legacy_rerun_is_not_idempotent() {
    let (_dir, path) = setup(RENDERER);
    run(&path, Strategy::Legacy).unwrap();
    let once = fs::read_to_string(&path).unwrap();

    let report = run(&path, Strategy::Legacy).unwrap();
    let twice = fs::read_to_string(&path).unwrap();

    assert_ne!(once, twice);
    assert!(outcome(&report, IMPORT_ID).is_applied());
    assert!(outcome(&report, TYPE_GUARD_ID).is_applied());
    assert_eq!(count(&twice, "import { Fragment }"), 2);
    assert_eq!(count(&twice, "function isFragmentVNode("), 2);

    // The first branch pushed isElementVNode out of the 10-line window.
    assert!(matches!(
        outcome(&report, RENDER_BRANCH_ID),
        PatchOutcome::Skipped { .. }
    ));
    assert_eq!(count(&twice, "} else if (isFragmentVNode(vnode)) {"), 1);

    // The second guard lands inside isComponentVNode, above its closing brace.
    let lines: Vec<&str> = twice.split_inclusive('\n').collect();
    let second_guard = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with("function isFragmentVNode("))
        .map(|(i, _)| i)
        .next()
        .unwrap();
    assert_eq!(lines[second_guard + 3], "}\n");
    assert!(lines[second_guard - 2].contains("isComponent(vnode.type)"));
}

#[test]
fn test_anchored_rerun_is_noop() {
    let (_dir, path) = setup(RENDERER);
    run(&path, Strategy::Anchored).unwrap();
    let once = fs::read_to_string(&path).unwrap();

    let report = run(&path, Strategy::Anchored).unwrap();
    let twice = fs::read_to_string(&path).unwrap();

    assert_eq!(once, twice);
    assert!(!report.written);
    assert_eq!(report.already_applied(), 3);
}

#[test]
fn test_anchored_rerun_after_legacy_run_is_noop() {
    let (_dir, path) = setup(RENDERER);
    run(&path, Strategy::Legacy).unwrap();
    let once = fs::read_to_string(&path).unwrap();

    let report = run(&path, Strategy::Anchored).unwrap();
    assert_eq!(report.already_applied(), 3);
    assert_eq!(fs::read_to_string(&path).unwrap(), once);
}

#[test]
fn test_missing_branch_marker_skips_only_branch() {
    let without_marker = RENDERER.replace(
        "  if (isTextVNode(vnode)) {",
        "  if (typeof vnode === 'string') {",
    );

    for strategy in [Strategy::Legacy, Strategy::Anchored] {
        let (_dir, path) = setup(&without_marker);
        let report = run(&path, strategy).unwrap();

        assert!(matches!(
            outcome(&report, RENDER_BRANCH_ID),
            PatchOutcome::Skipped { .. }
        ));
        assert_eq!(report.failed(), 0);
        assert!(report.is_partial());

        // Output is the input plus the two other insertions, nothing else.
        let lines: Vec<&str> = without_marker.split_inclusive('\n').collect();
        let mut expected = String::new();
        expected.extend(lines[..8].iter().copied());
        expected.push_str(IMPORT_SNIPPET);
        expected.extend(lines[8..37].iter().copied());
        expected.push_str(TYPE_GUARD_SNIPPET);
        expected.extend(lines[37..].iter().copied());
        assert_eq!(fs::read_to_string(&path).unwrap(), expected, "{strategy}");
    }
}

#[test]
fn test_anchored_survives_shifted_header() {
    let shifted = format!("// @ts-check\n// generated header\n\n{RENDERER}");
    let (_dir, path) = setup(&shifted);

    let report = run(&path, Strategy::Anchored).unwrap();
    assert_eq!(report.applied(), 3);

    let patched = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = patched.split_inclusive('\n').collect();

    let import = position(&lines, "import { Fragment }");
    assert!(lines[import - 1].starts_with("} from \"./props.js\";"));

    let guard = position(&lines, "function isFragmentVNode(");
    assert_eq!(lines[guard - 2], "}\n");
    assert!(lines[guard - 3].trim() == ");");
}

#[test]
fn test_legacy_misplaces_on_shifted_header() {
    let shifted = format!("// @ts-check\n// generated header\n\n{RENDERER}");
    let (_dir, path) = setup(&shifted);

    run(&path, Strategy::Legacy).unwrap();
    let patched = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = patched.split_inclusive('\n').collect();

    // Offset 8 is now in the middle of the multi-line props import.
    let import = position(&lines, "import { Fragment }");
    assert_eq!(import, 8);
    assert!(!lines[import - 1].trim_end().ends_with(';'));
}

#[test]
fn test_short_document_fails_legacy_offsets() {
    let short = "import a from \"a\";\nfoo();\n";
    let (_dir, path) = setup(short);

    let report = run(&path, Strategy::Legacy).unwrap();
    assert!(matches!(
        outcome(&report, IMPORT_ID),
        PatchOutcome::Failed { .. }
    ));
    assert!(matches!(
        outcome(&report, TYPE_GUARD_ID),
        PatchOutcome::Failed { .. }
    ));
    assert!(!report.written);
    assert_eq!(fs::read_to_string(&path).unwrap(), short);
}

#[test]
fn test_crlf_document_stays_crlf() {
    let crlf = RENDERER.replace('\n', "\r\n");
    let (_dir, path) = setup(&crlf);

    run(&path, Strategy::Anchored).unwrap();
    let patched = fs::read_to_string(&path).unwrap();

    assert_eq!(patched, expected_patched().replace('\n', "\r\n"));
}

#[test]
fn test_dry_run_reports_without_writing() {
    let (_dir, path) = setup(RENDERER);

    let applied = PatchRun::load(&path).unwrap().apply(Strategy::Anchored);
    assert_eq!(applied.patched(), expected_patched());
    let report = applied.finish();

    assert_eq!(report.applied(), 3);
    assert!(!report.written);
    assert_eq!(fs::read_to_string(&path).unwrap(), RENDERER);
}
