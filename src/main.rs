// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod tasks;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use tasks::{ArtifactsCommand, ReportCommand};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors and the report itself
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the instrumented tests and print an llvm-cov coverage summary
    Report(ReportCommand),
    /// Build the instrumented tests and list the objects llvm-cov would load
    Artifacts(ArtifactsCommand),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    covreport::logging::init(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Report(cmd) => cmd.run(),
        Commands::Artifacts(cmd) => cmd.run(),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        }
    }
}
