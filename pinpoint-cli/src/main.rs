//! Pinpoint CLI - command-line harness for the location picker.
//!
//! Runs picker sessions against the simulated renderer, inspects wire
//! payloads, validates the renderer template and edits configuration.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;

use commands::config::ConfigCommands;
use commands::demo::DemoArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "pinpoint")]
#[command(version, about = "Race-free map location picking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a picker session against the simulated renderer
    Demo(DemoArgs),

    /// Classify a renderer payload the way the bridge would ("-" reads stdin)
    Decode {
        /// Raw JSON payload
        #[arg(allow_hyphen_values = true)]
        payload: String,
    },

    /// Resolve and validate the renderer template
    Template {
        /// Directory to load the template from instead of the bundled copy
        #[arg(long)]
        directory: Option<PathBuf>,

        /// Print the full document
        #[arg(long)]
        print: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Demo(args) => commands::demo::run(args),
        Commands::Decode { payload } => commands::decode::run(&payload),
        Commands::Template { directory, print } => commands::template::run(directory, print),
        Commands::Config { command } => commands::config::run(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_demo_flags_parse() {
        let cli = Cli::try_parse_from([
            "pinpoint",
            "demo",
            "--latitude",
            "-33.86",
            "--longitude",
            "151.21",
            "--ready-first",
            "--drag",
            "-33.87,151.2",
        ])
        .unwrap();
        let Commands::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.latitude, -33.86);
        assert!(args.ready_first);
        assert!(args.drag.is_some());
    }

    #[test]
    fn test_deny_conflicts_with_unavailable() {
        assert!(Cli::try_parse_from(["pinpoint", "demo", "--deny", "--unavailable"]).is_err());
    }
}
