//! Trellis CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, debug, error, info};
use miette::GraphicalReportHandler;

use trellis::TrellisError;
use trellis_cli::{Args, error_adapter::to_reportable};

fn main() -> ExitCode {
    miette::set_panic_hook();

    let args = Args::parse();
    init_logger(&args);
    debug!(args:?; "Parsed arguments");

    match trellis_cli::run(&args) {
        Ok(()) => {
            info!(input = args.input.as_str(); "Resolved snapshot");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", render(&err));
            ExitCode::FAILURE
        }
    }
}

fn init_logger(args: &Args) {
    let level = args.log_filter().unwrap_or_else(|invalid| {
        eprintln!("Invalid log level: {invalid}. Using 'warn' instead.");
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .init();
    info!(level:?; "Starting Trellis");
}

/// Renders `err` as a miette report, or as its plain message if the
/// graphical handler fails.
fn render(err: &TrellisError) -> String {
    let mut report = String::new();
    match GraphicalReportHandler::new().render_report(&mut report, &to_reportable(err)) {
        Ok(()) => report,
        Err(_) => err.to_string(),
    }
}
