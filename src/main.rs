use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use lapstat::cli::{Cli, Command};
use lapstat::collector::PairingPolicy;
use lapstat::config::ProfilerConfig;
use lapstat::demo;
use lapstat::report::{self, OutputFormat};
use lapstat::session::Session;
use lapstat::trace::CheckpointTrace;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// File config (if any) with `LAPSTAT_*` variables applied on top
fn load_config(path: Option<&Path>) -> Result<ProfilerConfig> {
    let base = match path {
        Some(path) => ProfilerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ProfilerConfig::default(),
    };
    base.with_env().context("Invalid LAPSTAT_* environment")
}

fn replay(config: &ProfilerConfig, trace: &Path, format: Option<OutputFormat>) -> Result<()> {
    let trace = CheckpointTrace::load(trace)?;
    tracing::debug!(checkpoints = trace.len(), "replaying trace");

    let ranked = report::rank(&trace.replay());
    let output = report::render_as(&ranked, format.unwrap_or(config.format))?;
    println!("{}", output.trim_end());
    Ok(())
}

struct DemoArgs {
    iterations: u32,
    policy: Option<PairingPolicy>,
    format: Option<OutputFormat>,
    log_dir: Option<PathBuf>,
    trace_out: Option<PathBuf>,
}

fn run_demo(mut config: ProfilerConfig, args: DemoArgs) -> Result<()> {
    // Report goes to stdout below, not through the stderr sink
    config.console = false;
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(dir) = args.log_dir {
        config.persist = true;
        config.log_dir = Some(dir);
    }
    if args.trace_out.is_some() {
        // A sliding collector forgets checkpoints as it pairs them
        config.policy = PairingPolicy::BatchReplay;
    }

    let format = config.format;
    let mut session = Session::new(config).context("Failed to set up report sinks")?;
    let value = demo::run(&mut session, args.iterations);
    tracing::debug!(value, iterations = args.iterations, "demo workload finished");

    if let Some(path) = &args.trace_out {
        session.trace().save(path)?;
    }

    let output = report::render_as(&session.ranked(), format)?;
    println!("{}", output.trim_end());

    session.finalize().context("Failed to emit report")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Replay { trace, format } => replay(&config, &trace, format)?,
        Command::Demo {
            iterations,
            policy,
            format,
            log_dir,
            trace_out,
        } => run_demo(
            config,
            DemoArgs {
                iterations,
                policy,
                format,
                log_dir,
                trace_out,
            },
        )?,
    }

    Ok(())
}
