use crate::{
    chunk_plan::ChunkPlan,
    config::Config,
    engine::{python::PythonEngine, Engine},
    error::RelayError,
    job::{self, RawJob, Task},
    pipeline::{Pipeline, AUTO_CHUNK_THRESHOLD_CHARS},
    report::Outcome,
    util::ensure_dir,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "mbart-relay")]
#[command(about = "Seq2seq text generation adapter (mBART + chunking + orchestration)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./mbart-relay.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Spawn the model worker and print its diagnostics.
    Doctor {},
    /// Validate a job and print its chunking decision and segment plan.
    Plan {
        /// Job JSON file; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Run one job: JSON in, JSON Outcome on stdout, exit 0 iff ok.
    Run {
        /// Job JSON file; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<i32> {
    let cfg = load_config(args.config.as_deref())?;
    let _guard = init_logging(&args, &cfg)?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Plan { input } => plan(&cfg, input.as_deref()),
        Command::Run { input } => run(&cfg, input.as_deref()),
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = PathBuf::from("mbart-relay.toml");
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the Outcome; everything we log goes to stderr.
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = resolve_log_path(cfg) {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(&path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("mbart-relay.log"))
}

fn doctor(cfg: &Config) -> Result<i32> {
    let mut engine =
        PythonEngine::spawn(cfg).with_context(|| "spawning model worker for doctor")?;
    let diag = engine.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(if diag.ok { 0 } else { 1 })
}

fn plan(cfg: &Config, input: Option<&Path>) -> Result<i32> {
    let raw = match read_job(input)? {
        Ok(raw) => raw,
        Err(outcome) => return emit(outcome),
    };
    let job = match job::validate(raw, cfg) {
        Ok(job) => job,
        Err(err) => return emit(Outcome::failure(err)),
    };

    let chunking = match job.task {
        Task::Summarize => false,
        Task::Translate => job
            .chunking
            .unwrap_or_else(|| job.text.chars().count() > AUTO_CHUNK_THRESHOLD_CHARS),
    };
    let plan = if chunking {
        Some(ChunkPlan::build(&job.text, job.chunk_chars, job.max_chunks))
    } else {
        None
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "task": job.task.name(),
            "text_chars": job.text.chars().count(),
            "chunking": chunking,
            "plan": plan,
        }))?
    );
    Ok(0)
}

fn run(cfg: &Config, input: Option<&Path>) -> Result<i32> {
    let raw = match read_job(input)? {
        Ok(raw) => raw,
        Err(outcome) => return emit(outcome),
    };
    let job = match job::validate(raw, cfg) {
        Ok(job) => job,
        Err(err) => return emit(Outcome::failure(err)),
    };

    let engine = match PythonEngine::spawn(cfg) {
        Ok(engine) => engine,
        Err(err) => {
            return emit(Outcome::failure(RelayError::MissingCapability(format!(
                "{err:#}"
            ))))
        }
    };

    let mut pipeline = Pipeline::new(engine);
    match pipeline.run_job(&job) {
        Ok(text) => emit(Outcome::success(text)),
        Err(err) => emit(Outcome::failure(err)),
    }
}

/// Read the raw job from a file or stdin. A malformed request is a job
/// failure (non-ok Outcome), not a process error.
fn read_job(input: Option<&Path>) -> Result<Result<RawJob, Outcome>> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading job: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .with_context(|| "reading job from stdin")?;
            buf
        }
    };
    match serde_json::from_str::<RawJob>(&raw) {
        Ok(job) => Ok(Ok(job)),
        Err(e) => Ok(Err(Outcome::failure(format!("Invalid JSON input: {e}")))),
    }
}

fn emit(outcome: Outcome) -> Result<i32> {
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(outcome.exit_code())
}
