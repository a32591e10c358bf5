mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analyze::AnalyzeArgs;
use commands::black_litterman::BlackLittermanArgs;
use commands::candidates::CandidatesArgs;
use commands::compare::CompareArgs;
use commands::optimize::{FrontierArgs, OptimizeArgs};
use commands::recommend::RecommendArgs;
use commands::stats::StatsArgs;

/// Mean-variance portfolio optimization and diversification analysis
#[derive(Parser)]
#[command(
    name = "frontier",
    version,
    about = "Mean-variance portfolio optimization and diversification analysis",
    long_about = "Analyse a long-only portfolio against its historical efficient frontier: \
                  max-Sharpe, minimum-volatility and target-return optimization under \
                  per-asset floors, capital allocation line, diversification candidates \
                  and Black-Litterman views. Prices are read from a wide CSV table."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Analysis configuration file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Annual risk-free rate, overriding the configuration
    #[arg(long, global = true)]
    risk_free_rate: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full analysis: optimum, floored alternative, frontier, recommendations
    Analyze(AnalyzeArgs),
    /// Solve one objective (max_sharpe, min_volatility, target_return)
    Optimize(OptimizeArgs),
    /// Efficient frontier, tangency portfolio and capital allocation line
    Frontier(FrontierArgs),
    /// Rank diversification candidates for an existing portfolio
    Recommend(RecommendArgs),
    /// Compare named allocations on shared statistics
    Compare(CompareArgs),
    /// Annualized per-asset returns, volatilities and correlations
    Stats(StatsArgs),
    /// Optimize on Black-Litterman posterior returns
    BlackLitterman(BlackLittermanArgs),
    /// List configured diversification candidates
    Candidates(CandidatesArgs),
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
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match input::config::load_config(cli.config.as_deref(), cli.risk_free_rate) {
        Ok(c) => c,
        Err(e) => fail(e),
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analyze::run_analyze(args, &config),
        Commands::Optimize(args) => commands::optimize::run_optimize(args, &config),
        Commands::Frontier(args) => commands::optimize::run_frontier(args, &config),
        Commands::Recommend(args) => commands::recommend::run_recommend(args, &config),
        Commands::Compare(args) => commands::compare::run_compare(args, &config),
        Commands::Stats(args) => commands::stats::run_stats(args, &config),
        Commands::BlackLitterman(args) => {
            commands::black_litterman::run_black_litterman(args, &config)
        }
        Commands::Candidates(args) => commands::candidates::run_candidates(args, &config),
        Commands::Version => {
            println!("frontier {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => fail(e),
    }
}

/// Report the error on stderr and exit non-zero.
fn fail(e: Box<dyn std::error::Error>) -> ! {
    output::report_error(e.as_ref());
    process::exit(1);
}
