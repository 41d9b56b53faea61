mod cli;
mod report;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pv_bess_sim::config::ScenarioConfig;
use pv_bess_sim::io::export::{export_hours_csv, export_projection_csv};
use pv_bess_sim::io::snapshot::{export_snapshot, flatten};
use pv_bess_sim::scenario::{Scenario, ScenarioOutcome, compare, strategy_variants};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DayArgs, RunArgs, SourceArgs};
use crate::report::{build_comparison_table, build_day_table};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// `--scenario` wins over `--preset`; with neither the baseline preset is used.
fn load_config(source: &SourceArgs) -> Result<ScenarioConfig> {
    if let Some(path) = &source.scenario {
        return ScenarioConfig::from_toml_file(path)
            .with_context(|| format!("failed to load scenario {}", path.display()));
    }
    let name = source.preset.as_deref().unwrap_or("baseline");
    Ok(ScenarioConfig::from_preset(name)?)
}

fn write_outputs(outcome: &ScenarioOutcome, args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.hours_out {
        export_hours_csv(outcome.annual.hours(), path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "hourly records written");
    }
    if let Some(path) = &args.projection_out {
        export_projection_csv(&outcome.projection, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "projection written");
    }
    if let Some(path) = &args.snapshot_out {
        let snapshot = flatten(outcome)?;
        export_snapshot(&snapshot, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), keys = snapshot.len(), "snapshot written");
    }
    Ok(())
}

fn run(scenario: &Scenario, args: RunArgs) -> Result<()> {
    let outcome = scenario.run()?;

    println!("Scenario: {} ({})", outcome.label, outcome.strategy.label());
    println!(
        "System:   {:.1} kWp PV, {:.1} kWh battery\n",
        outcome.size.pv_kwp, outcome.size.battery_kwh
    );
    println!("{}", outcome.annual);
    println!("--- Baseline bill ---\n{}", outcome.baseline_bill);
    println!("--- System bill ---\n{}", outcome.system_bill);
    println!("{}", outcome.summary);

    write_outputs(&outcome, &args)?;

    #[cfg(feature = "api")]
    if args.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(pv_bess_sim::api::AppState::new(outcome)?);
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
        runtime.block_on(pv_bess_sim::api::serve(state, addr))?;
    }

    Ok(())
}

fn run_compare(scenario: &Scenario) -> Result<()> {
    let variants = strategy_variants(scenario);
    let mut outcomes = Vec::with_capacity(variants.len());
    for (variant, result) in variants.iter().zip(compare(&variants)) {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(error) => warn!(scenario = %variant.label, %error, "variant failed"),
        }
    }
    if outcomes.is_empty() {
        bail!("every variant of \"{}\" failed", scenario.label);
    }
    println!("{}", build_comparison_table(&outcomes));
    Ok(())
}

fn run_day(scenario: &Scenario, args: &DayArgs) -> Result<()> {
    let day = scenario.representative_day(args.day)?;
    println!("{}", build_day_table(day.hours()));
    println!("{day}");
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli.source)?;
    let scenario = config.build()?;

    match cli.command.unwrap_or_default() {
        Command::Run(args) => run(&scenario, args),
        Command::Compare => run_compare(&scenario),
        Command::Day(args) => run_day(&scenario, &args),
    }
}
