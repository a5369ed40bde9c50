//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand, ValueHint};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::compare::StaleMarkerPolicy;

const LOCAL_CONFIG_BASENAME: &str = "regtest";
const ENV_PREFIX: &str = "REGTEST";
const DEFAULT_RENDERER: &str = "xpstopng";
const DEFAULT_REFS_DIR: &str = "./refs";
const DEFAULT_OUT_DIR: &str = "./out";
const DEFAULT_EXTENSIONS: [&str; 2] = ["xps", "oxps"];

/// Command-line arguments for the `regtest` binary.
#[derive(Debug, Parser)]
#[command(name = "regtest", version, about = "Rendering regression tests")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "REGTEST_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run tests against the references.
    #[command(name = "run-tests")]
    RunTests(RunTestsArgs),
    /// Create references for tests.
    #[command(name = "create-refs")]
    CreateRefs(CreateRefsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunTestsArgs {
    /// References directory.
    #[arg(long = "refs-dir", value_name = "DIR", default_value = DEFAULT_REFS_DIR, value_hint = ValueHint::DirPath)]
    pub refs_dir: PathBuf,

    /// Directory where test results are created.
    #[arg(long = "out-dir", value_name = "DIR", default_value = DEFAULT_OUT_DIR, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Do not remove result files for passing tests.
    #[arg(long = "keep-results", action = clap::ArgAction::SetTrue)]
    pub keep_results: bool,

    /// Create diff files for failed tests.
    #[arg(long = "create-diffs", action = clap::ArgAction::SetTrue)]
    pub create_diffs: bool,

    /// Update references for failed tests.
    #[arg(long = "update-refs", action = clap::ArgAction::SetTrue)]
    pub update_refs: bool,

    /// Directory or single document to test.
    #[arg(value_name = "TESTS", value_hint = ValueHint::AnyPath)]
    pub tests: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct CreateRefsArgs {
    /// References directory.
    #[arg(long = "refs-dir", value_name = "DIR", default_value = DEFAULT_REFS_DIR, value_hint = ValueHint::DirPath)]
    pub refs_dir: PathBuf,

    /// Create references again for tests that already have them.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub force: bool,

    /// Create only checksum files.
    #[arg(short = 'c', long = "checksums-only", action = clap::ArgAction::SetTrue)]
    pub checksums_only: bool,

    /// Directory or single document to create references for.
    #[arg(value_name = "TESTS", value_hint = ValueHint::AnyPath)]
    pub tests: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the renderer executable.
    #[arg(long = "renderer", value_name = "PATH", global = true, value_hint = ValueHint::ExecutablePath)]
    pub renderer: Option<PathBuf>,

    /// Override the skip list file.
    #[arg(long = "skip", value_name = "FILE", global = true)]
    pub skip_file: Option<PathBuf>,

    /// Override the number of worker threads.
    #[arg(short = 't', long = "threads", value_name = "COUNT", global = true)]
    pub threads: Option<u64>,

    /// Log at debug level unless --log-level is given.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::SetTrue, global = true)]
    pub verbose: bool,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

/// Validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub renderer: RendererSettings,
    pub execution: ExecutionSettings,
    pub corpus: CorpusSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub program: PathBuf,
    /// Arguments placed before `<document> <output-dir>`.
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub threads: NonZeroUsize,
    pub stale_markers: StaleMarkerPolicy,
}

#[derive(Debug, Clone)]
pub struct CorpusSettings {
    /// Accepted document extensions; empty accepts every file.
    pub extensions: Vec<String>,
    pub skip_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
///
/// # Errors
///
/// Returns [`LoadError`] if a source cannot be read or a value is invalid.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("corpus.extensions"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);
    Settings::from_raw(raw)
}

/// Parse the process arguments and resolve configuration, returning both.
///
/// # Errors
///
/// Returns [`LoadError`] from [`load`].
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    renderer: RawRendererSettings,
    execution: RawExecutionSettings,
    corpus: RawCorpusSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(program) = overrides.renderer.as_ref() {
            self.renderer.program = Some(program.clone());
        }
        if let Some(path) = overrides.skip_file.as_ref() {
            self.corpus.skip_file = Some(path.clone());
        }
        if let Some(threads) = overrides.threads {
            self.execution.threads = Some(threads);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        } else if overrides.verbose {
            self.logging.level = Some("debug".to_owned());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            logging: build_logging_settings(raw.logging)?,
            renderer: build_renderer_settings(raw.renderer)?,
            execution: build_execution_settings(raw.execution)?,
            corpus: build_corpus_settings(raw.corpus),
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_renderer_settings(renderer: RawRendererSettings) -> Result<RendererSettings, LoadError> {
    let program = renderer
        .program
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDERER));
    if program.as_os_str().is_empty() {
        return Err(LoadError::invalid("renderer.program", "must not be empty"));
    }
    Ok(RendererSettings {
        program,
        args: renderer.args.unwrap_or_default(),
    })
}

fn build_execution_settings(execution: RawExecutionSettings) -> Result<ExecutionSettings, LoadError> {
    let threads = match execution.threads {
        Some(value) => non_zero_usize(value, "execution.threads")?,
        None => thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
    };

    let stale_markers = match execution.stale_markers.as_deref().map(str::trim) {
        None => StaleMarkerPolicy::default(),
        Some(value) if value.eq_ignore_ascii_case("keep") => StaleMarkerPolicy::Keep,
        Some(value) if value.eq_ignore_ascii_case("remove") => StaleMarkerPolicy::Remove,
        Some(value) => {
            return Err(LoadError::invalid(
                "execution.stale_markers",
                format!("expected `keep` or `remove`, got `{value}`"),
            ))
        }
    };

    Ok(ExecutionSettings {
        threads,
        stale_markers,
    })
}

fn build_corpus_settings(corpus: RawCorpusSettings) -> CorpusSettings {
    let extensions = corpus.extensions.map_or_else(
        || DEFAULT_EXTENSIONS.iter().map(|ext| (*ext).to_owned()).collect(),
        |list| {
            list.into_iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_owned())
                .filter(|ext| !ext.is_empty())
                .collect()
        },
    );
    CorpusSettings {
        extensions,
        skip_file: corpus.skip_file,
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRendererSettings {
    program: Option<PathBuf>,
    args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawExecutionSettings {
    threads: Option<u64>,
    stale_markers: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCorpusSettings {
    extensions: Option<Vec<String>>,
    skip_file: Option<PathBuf>,
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
