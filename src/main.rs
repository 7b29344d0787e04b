use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rewind::commands::parse::ParseArgs;
use rewind::commands::run::RunArgs;
use rewind::{error, telemetry};

#[derive(Debug, Parser)]
#[command(
    name = "rewind",
    version,
    about = "Recall-and-edit engine for chat channels"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the engine over an NDJSON event stream (stdin to stdout)
    Run(RunArgs),
    /// Parse a command string and print the result as JSON
    Parse(ParseArgs),
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Parse(_) => "parse",
        }
    }
}

fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Run(args) => args.execute(),
        Commands::Parse(args) => args.execute(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
