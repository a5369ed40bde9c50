//! `regtest` binary: `run-tests` and `create-refs` over a document corpus.
//!
//! Exit status: 0 when every executed test passed, 1 when some did not,
//! 2 for configuration, setup, or fatal run errors.

use std::path::Path;
use std::process::ExitCode;

use regtest_harness::compare::{CompareOptions, Comparator};
use regtest_harness::config::{self, Command, CreateRefsArgs, LoadError, RunTestsArgs, Settings};
use regtest_harness::corpus::{Corpus, SkipList};
use regtest_harness::diff::PixelDiff;
use regtest_harness::error::HarnessError;
use regtest_harness::process::ProcessRunner;
use regtest_harness::progress::TracingProgress;
use regtest_harness::references::{ReferenceOptions, ReferenceRun};
use regtest_harness::runner::{RunLayout, TestRun};
use regtest_harness::telemetry;
use tracing::{dispatcher, error, info, Dispatch, Level};
use tracing_subscriber::util::TryInitError;

const EXIT_SETUP_FAILURE: u8 = 2;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(#[from] TryInitError),
    #[error(transparent)]
    Harness(#[from] HarnessError),
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            report_application_error(&error);
            ExitCode::from(EXIT_SETUP_FAILURE)
        }
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "regtest failed");
        return;
    }

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "regtest failed");
    });
}

fn run() -> Result<u8, AppError> {
    let (cli, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli.command {
        Command::RunTests(args) => run_tests(&args, &settings),
        Command::CreateRefs(args) => create_refs(&args, &settings),
    }
}

fn load_corpus(tests: &Path, settings: &Settings) -> Result<(Corpus, SkipList), AppError> {
    let corpus = Corpus::discover(tests, &settings.corpus.extensions)?;
    let skip = SkipList::load(corpus.root(), settings.corpus.skip_file.as_deref())?;
    info!(
        root = %corpus.root().display(),
        documents = corpus.len(),
        skipped = skip.len(),
        "corpus loaded"
    );
    Ok((corpus, skip))
}

fn renderer(settings: &Settings) -> ProcessRunner {
    ProcessRunner::new(
        settings.renderer.program.clone(),
        settings.renderer.args.clone(),
    )
}

fn run_tests(args: &RunTestsArgs, settings: &Settings) -> Result<u8, AppError> {
    let (corpus, skip) = load_corpus(&args.tests, settings)?;
    let renderer = renderer(settings);
    let comparator = Comparator::new(
        CompareOptions {
            keep_results: args.keep_results,
            create_diffs: args.create_diffs,
            update_refs: args.update_refs,
            stale_markers: settings.execution.stale_markers,
        },
        Box::new(PixelDiff),
    );
    let layout = RunLayout {
        docs_dir: corpus.root().to_path_buf(),
        refs_dir: args.refs_dir.clone(),
        out_dir: args.out_dir.clone(),
    };

    let summary = TestRun::new(layout, &renderer, comparator, &TracingProgress)
        .with_skip_list(skip)
        .run(corpus.documents(), settings.execution.threads)?;

    print!("{summary}");
    Ok(summary.exit_code())
}

fn create_refs(args: &CreateRefsArgs, settings: &Settings) -> Result<u8, AppError> {
    let (corpus, skip) = load_corpus(&args.tests, settings)?;
    let renderer = renderer(settings);
    let options = ReferenceOptions {
        force: args.force,
        checksums_only: args.checksums_only,
    };

    let tally = ReferenceRun::new(
        corpus.root().to_path_buf(),
        args.refs_dir.clone(),
        options,
        &renderer,
        &TracingProgress,
    )
    .with_skip_list(skip)
    .run(corpus.documents(), settings.execution.threads)?;

    print!("{tally}");
    Ok(0)
}
