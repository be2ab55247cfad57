use anyhow::{Context, Result};
use clap::Parser;
use perfgate::{
    cli::{Cli, OutputFormat},
    config::GateConfig,
    constraint::ConstraintOrchestrator,
    escalation::ConstraintReport,
    history,
    snapshot::RunSnapshot,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise `RUST_LOG` applies
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Write the text report to `<dir>/constraint-log-<build>.txt`
fn persist_constraint_log(dir: &Path, report: &ConstraintReport) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let path = dir.join(format!("constraint-log-{}.txt", report.build_number));
    fs::write(&path, report.to_text())
        .with_context(|| format!("Failed to write constraint log: {}", path.display()))?;
    Ok(path)
}

fn run(args: Cli) -> Result<i32> {
    let config = GateConfig::from_toml(&args.config)?;
    let constraints = config.constraints()?;
    let history = history::load_history(&args.history, &config.report)?;

    let current = history
        .first()
        .with_context(|| format!("History file has no builds: {}", args.history.display()))?;
    tracing::info!(
        build = current.number,
        history = history.len(),
        constraints = constraints.len(),
        "evaluating build"
    );

    if args.stats {
        for (name, report) in &current.reports {
            println!("=== {} ===", name);
            print!("{}", report.summary().to_table_string(&config.format));
            println!();
        }
    }

    let evaluations = ConstraintOrchestrator::new(config.settings.clone())
        .with_format(config.format.clone())
        .run(&constraints, &history);
    let report = ConstraintReport::new(current.number, current.timestamp, evaluations)
        .with_format(config.format.clone());

    match args.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Junit => print!("{}", report.to_junit_xml()),
        OutputFormat::Env => print!("{}", report.to_env_vars()),
        OutputFormat::Json => {
            let snapshots = RunSnapshot::from_history(&history);
            let json = serde_json::to_string_pretty(&snapshots)
                .context("Failed to serialize report snapshots")?;
            println!("{}", json);
        }
    }

    if config.settings.persist_constraint_log {
        let dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let path = persist_constraint_log(&dir, &report)?;
        tracing::info!(path = %path.display(), "constraint log written");
    }

    let verdict = report.verdict();
    tracing::info!(%verdict, violated = report.counts.violated, "gate finished");
    Ok(verdict.exit_code())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let exit_code = run(args)?;
    std::process::exit(exit_code);
}
