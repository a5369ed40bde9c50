//! End-to-end verdict scenarios against the real `fake_renderer` process.

use std::fs;
use std::path::Path;

use lock_tests::Workspace;
use regtest_harness::compare::{CompareOptions, StaleMarkerPolicy};
use regtest_harness::references::ReferenceOptions;
use regtest_harness::store;
use regtest_kernel::checksum::hash::hash_bytes;
use regtest_kernel::model::document::Document;

fn renderer() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_fake_renderer"))
}

fn docs(names: &[&str]) -> Vec<Document> {
    names.iter().map(|n| Document::new(*n)).collect()
}

#[test]
fn document_without_reference_is_new() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png one\n");

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 4);

    assert_eq!(summary.total, 1);
    assert_eq!(summary.run, 0);
    assert_eq!(summary.new, docs(&["a.xps"]));
    assert_eq!(summary.exit_code(), 0);
    // The renderer never ran.
    assert!(!ws.out("a.xps").exists());
}

#[cfg(unix)]
#[test]
fn expected_crash_passes() {
    let ws = Workspace::new();
    ws.doc("a.xps", "abort\n");
    let tally = ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    assert_eq!(tally.crashed, docs(&["a.xps"]));
    assert!(ws.refs("a.xps").join("crashed").is_file());

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 1);

    assert_eq!(summary.passed, 1);
    assert_eq!(summary.run, 1);
    assert!(ws.out("a.xps").join("crashed").is_file());
}

#[cfg(unix)]
#[test]
fn unexpected_crash_is_reported() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png one\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    ws.doc("a.xps", "abort\n");

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 1);
    assert_eq!(summary.crashed, docs(&["a.xps"]));
    assert_eq!(summary.exit_code(), 1);
}

#[test]
fn expected_failure_status_passes_and_other_status_is_reported() {
    let ws = Workspace::new();
    ws.doc("fail.xps", "stderr cannot open\nexit 3\n");
    ws.doc("ok.xps", "page page-1.png one\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 2);
    assert_eq!(store::failed_status(&ws.refs("fail.xps")).unwrap(), Some(3));

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 2);
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.stderr, docs(&["fail.xps"]));

    ws.doc("ok.xps", "exit 7\n");
    let summary = ws.run_tests(renderer(), CompareOptions::default(), 2);
    assert_eq!(summary.failed_to_run, docs(&["ok.xps"]));
}

#[test]
fn recorded_failure_that_now_succeeds_did_not_fail() {
    let ws = Workspace::new();
    ws.doc("a.xps", "exit 1\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    ws.doc("a.xps", "page page-1.png fixed\n");

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 1);
    assert_eq!(summary.did_not_fail, docs(&["a.xps"]));
}

#[test]
fn mismatch_fails_with_diff_and_update_rewrites_reference() {
    let ws = Workspace::new();
    ws.doc("a.xps", "png a.png 0 0 0\npng b.png 9 9 9\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    let before = store::read_index(&ws.refs("a.xps")).unwrap().unwrap();

    ws.doc("a.xps", "png a.png 255 0 0\npng b.png 9 9 9\n");
    let options = CompareOptions {
        create_diffs: true,
        update_refs: true,
        ..CompareOptions::default()
    };
    let summary = ws.run_tests(renderer(), options, 1);

    assert_eq!(summary.failed, docs(&["a.xps"]));
    let out = ws.out("a.xps");
    assert!(out.join("a.png").is_file(), "mismatching artifact is kept");
    assert!(!out.join("b.png").exists(), "matching artifact is removed");
    assert!(out.join("a.png.diff.png").is_file(), "diff artifact is produced");

    let after = store::read_index(&ws.refs("a.xps")).unwrap().unwrap();
    let fresh = fs::read(out.join("a.png")).unwrap();
    assert_eq!(after.get("a.png").unwrap().hash, hash_bytes(&fresh));
    assert_ne!(after.get("a.png").unwrap().hash, before.get("a.png").unwrap().hash);
    assert_eq!(after.get("b.png").unwrap().hash, before.get("b.png").unwrap().hash);

    let rerun = ws.run_tests(renderer(), CompareOptions::default(), 1);
    assert_eq!(rerun.passed, 1, "updated reference converges");
}

#[test]
fn missing_artifact_is_a_comparison_failure() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png one\npage page-2.png two\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    ws.doc("a.xps", "page page-1.png one\n");

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 1);
    assert_eq!(summary.failed, docs(&["a.xps"]));
    assert!(summary.crashed.is_empty());
}

#[test]
fn page_kept_from_an_earlier_run_does_not_mask_a_missing_page() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png one\npage page-2.png two\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    let keep = CompareOptions {
        keep_results: true,
        ..CompareOptions::default()
    };
    let first = ws.run_tests(renderer(), keep, 1);
    assert_eq!(first.passed, 1);
    assert!(ws.out("a.xps").join("page-2.png").is_file());

    ws.doc("a.xps", "page page-1.png one\n");
    let second = ws.run_tests(renderer(), CompareOptions::default(), 1);
    assert_eq!(second.passed, 0);
    assert_eq!(second.failed, docs(&["a.xps"]));
    assert!(!ws.out("a.xps").join("page-2.png").exists());
}

#[test]
fn update_refs_never_rebaselines_output_left_by_an_earlier_run() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png one\npage page-2.png two\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);

    ws.doc("a.xps", "page page-1.png one\npage page-2.png TWO\n");
    let failing = ws.run_tests(renderer(), CompareOptions::default(), 1);
    assert_eq!(failing.failed, docs(&["a.xps"]));
    assert!(ws.out("a.xps").join("page-2.png").is_file());

    ws.doc("a.xps", "page page-1.png one\n");
    let update = CompareOptions {
        update_refs: true,
        ..CompareOptions::default()
    };
    let summary = ws.run_tests(renderer(), update, 1);
    assert_eq!(summary.failed, docs(&["a.xps"]));

    let index = store::read_index(&ws.refs("a.xps")).unwrap().unwrap();
    assert!(index.get("page-1.png").is_some());
    assert!(index.get("page-2.png").is_none());
    assert_eq!(
        fs::read_to_string(ws.refs("a.xps").join("page-2.png")).unwrap(),
        "two"
    );
}

#[test]
fn update_refs_with_remove_policy_drops_stale_stderr() {
    let ws = Workspace::new();
    ws.doc("a.xps", "stderr noisy\npage page-1.png one\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    assert!(ws.refs("a.xps").join("stderr").is_file());

    ws.doc("a.xps", "page page-1.png two\n");
    let options = CompareOptions {
        update_refs: true,
        stale_markers: StaleMarkerPolicy::Remove,
        ..CompareOptions::default()
    };
    ws.run_tests(renderer(), options, 1);
    assert!(!ws.refs("a.xps").join("stderr").exists());
}

#[test]
fn skip_file_at_corpus_root_is_honored() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png one\n");
    ws.doc("b.xps", "page page-1.png one\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 2);
    fs::write(ws.layout().docs_dir.join("Skipped"), "# flaky\nb.xps\n").unwrap();

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 2);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.total, summary.run + summary.skipped + summary.new.len());
}

#[test]
fn summary_json_is_written() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png one\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    ws.run_tests(renderer(), CompareOptions::default(), 1);

    let text = fs::read_to_string(ws.layout().out_dir.join("summary.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["passed"], 1);
    assert_eq!(json["failed"], serde_json::json!([]));
}
