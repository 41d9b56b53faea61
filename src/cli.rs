use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Annual hourly PV and battery dispatch with tariff billing and financials.
#[derive(Debug, Parser)]
#[command(name = "pv-bess-sim", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Where the scenario comes from. Without either flag the `baseline` preset
/// is used.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// TOML scenario file
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Built-in preset: baseline, solar_only, tou_arbitrage, peak_shaving
    #[arg(long, global = true, value_name = "NAME")]
    pub preset: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate one year and print the energy, bill and financial summary
    Run(RunArgs),
    /// Run the scenario under every dispatch strategy and without a battery
    Compare,
    /// Print the hourly dispatch of one day of the reference year
    Day(DayArgs),
}

impl Default for Command {
    fn default() -> Self {
        Self::Run(RunArgs::default())
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Write the 8,760 hourly records as CSV
    #[arg(long, value_name = "PATH")]
    pub hours_out: Option<PathBuf>,

    /// Write the yearly cash-flow projection as CSV
    #[arg(long, value_name = "PATH")]
    pub projection_out: Option<PathBuf>,

    /// Write the flat key-value snapshot as JSON
    #[arg(long, value_name = "PATH")]
    pub snapshot_out: Option<PathBuf>,

    /// Serve the outcome over HTTP after the run
    #[cfg(feature = "api")]
    #[arg(long)]
    pub serve: bool,

    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000, requires = "serve")]
    pub port: u16,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            hours_out: None,
            projection_out: None,
            snapshot_out: None,
            #[cfg(feature = "api")]
            serve: false,
            #[cfg(feature = "api")]
            port: 3000,
        }
    }
}

#[derive(Debug, Args)]
pub struct DayArgs {
    /// Day of the year, 0-based
    #[arg(long, default_value_t = 0)]
    pub day: usize,
}
