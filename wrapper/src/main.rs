//! Array-task wrapper for the optimization binary.
//!
//! Reads the platform-assigned task index, runs the optimizer on
//! `inputs/config_<index>.json`, and delivers its single JSON output as
//! `outputs/result_<index>.json`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::error;

use wrapper::error::TaskError;
use wrapper::exit_codes;
use wrapper::io::config::{WrapperConfig, load_config};
use wrapper::io::invoker::OptimizerInvoker;
use wrapper::core::params::{COMPRESS_VAR, EXPLORE_VAR, SEED_VAR};
use wrapper::io::{process_env, require_unicode};
use wrapper::io::signals::SignalForwarder;
use wrapper::logging;
use wrapper::pipeline::{TaskSettings, plan_task, run_task};

#[derive(Parser)]
#[command(
    name = "wrapper",
    version,
    about = "Run the optimizer for one batch array task and collect its result"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the optimizer for this task and copy its output to the result path.
    Run(SettingsArgs),
    /// Print the resolved paths, parameters, and command line as JSON without running.
    Plan(SettingsArgs),
}

#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// TOML file with wrapper settings. Must exist when given.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Root holding `inputs/` and `outputs/`.
    #[arg(long)]
    share_root: Option<PathBuf>,
    /// Directory the optimizer runs in.
    #[arg(long)]
    workdir: Option<PathBuf>,
    /// Optimizer output directory, relative to the workdir.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Optimizer executable.
    #[arg(long)]
    binary: Option<PathBuf>,
    /// Environment variable holding the task index.
    #[arg(long)]
    index_var: Option<String>,
    /// Kill the optimizer after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl SettingsArgs {
    fn resolve(self) -> Result<TaskSettings> {
        let mut cfg = match &self.config {
            Some(path) => load_config(path)?,
            None => WrapperConfig::default(),
        };
        if let Some(share_root) = self.share_root {
            cfg.share_root = share_root;
        }
        if let Some(workdir) = self.workdir {
            cfg.workdir = workdir;
        }
        if let Some(output_dir) = self.output_dir {
            cfg.output_dir = output_dir;
        }
        if let Some(binary) = self.binary {
            cfg.binary = binary;
        }
        if let Some(index_var) = self.index_var {
            cfg.index_var = index_var;
        }
        if self.timeout_secs.is_some() {
            cfg.timeout_secs = self.timeout_secs;
        }
        cfg.validate()?;

        // The optimizer runs in `workdir`, so paths handed to it must not
        // depend on the wrapper's own current directory.
        cfg.share_root = std::path::absolute(&cfg.share_root)
            .with_context(|| format!("resolve share root {}", cfg.share_root.display()))?;
        cfg.workdir = std::path::absolute(&cfg.workdir)
            .with_context(|| format!("resolve workdir {}", cfg.workdir.display()))?;
        Ok(TaskSettings::from(&cfg))
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Plan(args) => cmd_plan(args),
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn cmd_run(args: SettingsArgs) -> i32 {
    let settings = match args.resolve() {
        Ok(settings) => settings,
        Err(err) => return report(&err),
    };
    if let Err(err) = check_env(&settings) {
        return fail(&err);
    }
    let signals = SignalForwarder::new();
    if let Err(err) = signals.install() {
        return report(&err);
    }
    let invoker = OptimizerInvoker::new().with_signals(signals);
    match run_task(&settings, process_env, &invoker) {
        Ok(report) => {
            println!("{}", report.result.display());
            exit_codes::OK
        }
        Err(err) => fail(&err),
    }
}

fn cmd_plan(args: SettingsArgs) -> i32 {
    let result = args.resolve().and_then(|settings| {
        check_env(&settings)?;
        let plan = plan_task(&settings, process_env).map_err(anyhow::Error::from)?;
        let mut payload = serde_json::to_string_pretty(&plan).context("serialize plan")?;
        payload.push('\n');
        print!("{payload}");
        Ok(())
    });
    match result {
        Ok(()) => exit_codes::OK,
        Err(err) => match err.downcast_ref::<TaskError>() {
            Some(task_err) => fail(task_err),
            None => report(&err),
        },
    }
}

/// Reject non-UTF-8 values for every variable the wrapper reads.
fn check_env(settings: &TaskSettings) -> Result<(), TaskError> {
    require_unicode(
        &[settings.index_var.as_str(), SEED_VAR, EXPLORE_VAR, COMPRESS_VAR],
        |key: &str| std::env::var_os(key),
    )
}

fn fail(err: &TaskError) -> i32 {
    error!(exit_code = err.exit_code(), "task failed");
    eprintln!("{}", chain(err));
    err.exit_code()
}

fn report(err: &anyhow::Error) -> i32 {
    eprintln!("{err:#}");
    exit_codes::INVALID
}

/// Render `err` and its sources as `outer: inner: ...`.
fn chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}
