mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analysis::AnalyzeArgs;
use commands::depreciation::DepreciateArgs;
use commands::financing::AmortizeArgs;
use commands::rehab::RehabArgs;
use commands::returns::IrrArgs;

/// Real-estate investment proforma calculations
#[derive(Parser)]
#[command(
    name = "proforma",
    version,
    about = "Multi-year real-estate investment proforma",
    long_about = "Projects cash flow, debt, depreciation and passive-activity tax treatment \
                  for a rental property over its hold period, analyses the sale, and solves \
                  pre- and after-tax IRR with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full proforma for one deal, or a JSON array of deals
    Analyze(AnalyzeArgs),
    /// Estimate a rehab budget from size, age and condition grade
    Rehab(RehabArgs),
    /// Build a loan amortization schedule
    Amortize(AmortizeArgs),
    /// Build a depreciation schedule with optional cost segregation
    Depreciate(DepreciateArgs),
    /// IRR and equity multiple for a cash-flow series
    Irr(IrrArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analysis::run_analyze(args),
        Commands::Rehab(args) => commands::rehab::run_rehab(args),
        Commands::Amortize(args) => commands::financing::run_amortize(args),
        Commands::Depreciate(args) => commands::depreciation::run_depreciate(args),
        Commands::Irr(args) => commands::returns::run_irr(args),
        Commands::Version => {
            println!("proforma {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
