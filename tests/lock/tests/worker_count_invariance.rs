//! Aggregate counts of a fixed corpus must not depend on the worker count.
//!
//! Runs the same corpus with 1, 2 and more workers than documents and
//! asserts identical counts; list order may differ.

use std::collections::BTreeSet;
use std::path::Path;

use lock_tests::{counts, Workspace};
use regtest_harness::aggregate::Summary;
use regtest_harness::compare::CompareOptions;
use regtest_harness::references::ReferenceOptions;

fn renderer() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_fake_renderer"))
}

fn names(list: &[regtest_kernel::model::document::Document]) -> BTreeSet<String> {
    list.iter().map(ToString::to_string).collect()
}

/// Corpus with every non-crash verdict category represented.
fn mixed_corpus() -> Workspace {
    let ws = Workspace::new();
    for i in 0..4 {
        ws.doc(&format!("pass/{i}.xps"), &format!("page page-1.png same-{i}\n"));
        ws.doc(&format!("fail/{i}.xps"), &format!("page page-1.png before-{i}\n"));
        ws.doc(&format!("status/{i}.xps"), "page page-1.png ok\n");
        ws.doc(&format!("expected/{i}.xps"), "exit 2\n");
    }
    ws.create_refs(renderer(), ReferenceOptions::default(), 4);

    for i in 0..4 {
        ws.doc(&format!("fail/{i}.xps"), &format!("page page-1.png after-{i}\n"));
        ws.doc(&format!("status/{i}.xps"), "exit 5\n");
    }
    ws.doc("new/0.xps", "page page-1.png brand-new\n");
    ws
}

fn assert_invariants(summary: &Summary, threads: usize) {
    assert_eq!(
        summary.not_passed() + summary.passed,
        summary.run,
        "threads = {threads}"
    );
    assert_eq!(
        summary.total,
        summary.run + summary.skipped + summary.new.len(),
        "threads = {threads}"
    );
}

#[test]
fn counts_identical_for_1_2_and_n_workers() {
    let ws = mixed_corpus();
    let total = ws.corpus().len();

    let mut runs = Vec::new();
    for threads in [1, 2, total + 8] {
        let summary = ws.run_tests(renderer(), CompareOptions::default(), threads);
        assert_invariants(&summary, threads);
        runs.push(summary);
    }

    let baseline = counts(&runs[0]);
    assert_eq!(baseline, [17, 16, 8, 0, 4, 0, 4, 0, 0, 1]);
    for summary in &runs[1..] {
        assert_eq!(counts(summary), baseline);
        assert_eq!(names(&summary.failed), names(&runs[0].failed));
        assert_eq!(names(&summary.failed_to_run), names(&runs[0].failed_to_run));
    }
}

#[test]
fn no_document_is_double_counted() {
    let ws = mixed_corpus();
    let summary = ws.run_tests(renderer(), CompareOptions::default(), 3);

    let mut seen = BTreeSet::new();
    for list in [
        &summary.failed,
        &summary.crashed,
        &summary.failed_to_run,
        &summary.did_not_crash,
        &summary.did_not_fail,
        &summary.new,
    ] {
        for doc in list {
            assert!(seen.insert(doc.to_string()), "{doc} counted twice");
        }
    }
    assert_eq!(seen.len() + summary.passed, summary.total);
}
