//! `create-refs` followed by `run-tests` over an unchanged corpus passes,
//! and reference creation is idempotent unless forced.

use std::fs;
use std::path::Path;

use lock_tests::Workspace;
use regtest_harness::compare::CompareOptions;
use regtest_harness::corpus::Corpus;
use regtest_harness::references::ReferenceOptions;
use regtest_harness::store;
use regtest_kernel::checksum::index::ChecksumIndex;
use regtest_kernel::model::document::Document;

fn renderer() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_fake_renderer"))
}

#[test]
fn fresh_references_pass_unchanged_corpus() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png alpha\npage page-2.png beta\n");
    ws.doc("sub/b.xps", "png page-1.png 1 2 3\n");
    ws.doc("c.xps", "exit 4\n");

    let tally = ws.create_refs(renderer(), ReferenceOptions::default(), 2);
    assert_eq!(tally.total, 3);
    assert_eq!(tally.created, 3);
    assert_eq!(tally.failed, vec![Document::new("c.xps")]);

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 2);
    assert_eq!(summary.run, 3);
    assert_eq!(summary.passed, 3);
    assert_eq!(summary.exit_code(), 0);
    assert!(!ws.out("a.xps").join("page-1.png").exists());
}

#[test]
fn index_lines_hold_absolute_reference_paths() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png alpha\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);

    let text = fs::read_to_string(ws.refs("a.xps").join("md5")).unwrap();
    let index = ChecksumIndex::parse(&text).unwrap();
    let entry = index.get("page-1.png").unwrap();
    assert!(entry.path.is_absolute());
    assert!(entry.path.ends_with("a.xps/page-1.png"));
}

#[test]
fn checksums_only_references_still_compare() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png alpha\n");
    let options = ReferenceOptions {
        checksums_only: true,
        ..ReferenceOptions::default()
    };
    ws.create_refs(renderer(), options, 1);
    assert!(!ws.refs("a.xps").join("page-1.png").exists());

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 1);
    assert_eq!(summary.passed, 1);

    // Without the reference image a mismatch still fails; no diff is possible.
    ws.doc("a.xps", "page page-1.png changed\n");
    let options = CompareOptions {
        create_diffs: true,
        ..CompareOptions::default()
    };
    let summary = ws.run_tests(renderer(), options, 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(!ws.out("a.xps").join("page-1.png.diff.png").exists());
}

#[test]
fn existing_references_are_kept_unless_forced() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png alpha\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    let before = fs::read(ws.refs("a.xps").join("md5")).unwrap();

    ws.doc("a.xps", "page page-1.png beta\n");
    let tally = ws.create_refs(renderer(), ReferenceOptions::default(), 1);
    assert_eq!(tally.existing, 1);
    assert_eq!(fs::read(ws.refs("a.xps").join("md5")).unwrap(), before);

    let forced = ReferenceOptions {
        force: true,
        ..ReferenceOptions::default()
    };
    ws.create_refs(renderer(), forced, 1);
    assert_ne!(fs::read(ws.refs("a.xps").join("md5")).unwrap(), before);
}

#[test]
fn forced_recreation_drops_stale_pages_and_index() {
    let ws = Workspace::new();
    ws.doc("a.xps", "page page-1.png one\npage page-2.png two\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 1);

    ws.doc("a.xps", "exit 9\n");
    let forced = ReferenceOptions {
        force: true,
        ..ReferenceOptions::default()
    };
    ws.create_refs(renderer(), forced, 1);

    let refs = ws.refs("a.xps");
    assert!(!store::has_index(&refs));
    assert!(!refs.join("page-2.png").exists());
    assert_eq!(store::failed_status(&refs).unwrap(), Some(9));
}

#[test]
fn single_file_corpus_runs_inline() {
    let ws = Workspace::new();
    ws.doc("only.xps", "page page-1.png solo\n");
    ws.create_refs(renderer(), ReferenceOptions::default(), 8);

    let corpus = Corpus::discover(&ws.layout().docs_dir.join("only.xps"), &[]).unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.root(), ws.layout().docs_dir.as_path());

    let summary = ws.run_tests(renderer(), CompareOptions::default(), 8);
    assert_eq!(summary.passed, 1);
}
