//! `deploy` binary: parses the command line, installs the log subscriber, and
//! dispatches to a subcommand.
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use deploy_cli::cli::{Cli, Command};
use deploy_cli::commands;
use deploy_cli::logging::{self, Log, Logger};
use deploy_cli::settings::Settings;

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let settings = Arc::new(Settings::from_cli(&args.global));

    if let Err(e) = logging::init_subscriber(&settings.log) {
        // Without a subscriber nothing reaches the console.
        #[allow(clippy::print_stderr)]
        {
            eprintln!("deploy: {e:#}");
        }
        return ExitCode::FAILURE;
    }
    let log = Arc::new(Logger::new(settings.log.file.as_ref().map(|f| f.path.clone())));

    let result = match args.command {
        Command::Apply(opts) => {
            commands::apply::run(settings, &opts, &log).map(|()| ExitCode::SUCCESS)
        }
        Command::Run(opts) => commands::run::run(settings, &opts, &log),
        Command::Env => {
            commands::env::run(log.as_ref());
            Ok(ExitCode::SUCCESS)
        }
        Command::Completions(opts) => {
            commands::completions::run(opts.shell).map(|()| ExitCode::SUCCESS)
        }
        Command::Version => commands::version::run().map(|()| ExitCode::SUCCESS),
    };

    result.unwrap_or_else(|e| {
        log.error(&format!("fatal: {e:#}"));
        ExitCode::FAILURE
    })
}
