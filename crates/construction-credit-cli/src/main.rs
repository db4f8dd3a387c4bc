mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::schedule::ScheduleArgs;
use commands::subphases::SubphaseArgs;

/// Construction credit line and capital contribution schedules
#[derive(Parser)]
#[command(
    name = "ccs",
    version,
    about = "Construction credit line and capital contribution schedules",
    long_about = "Computes, period by period, the disbursements, deferred interest and \
                  final repayment of a construction credit line, together with the \
                  capital the developer must contribute once the cash reserve built \
                  from surplus periods is exhausted. All arithmetic is decimal."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the credit ledger and capital contribution schedule
    Schedule(ScheduleArgs),
    /// Summarise sales and construction windows per subphase
    Subphases(SubphaseArgs),
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

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays
/// machine-readable.
fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if *format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::Subphases(args) => commands::subphases::run_subphases(args),
        Commands::Version => {
            println!("ccs {}", env!("CARGO_PKG_VERSION"));
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
