use jdi_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Worker processes share the log file; stdout carries their event stream.
    logging::init_logging_or_stderr();

    match CliCommand::run_from_args().await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("jdi error: {:#}", err);
            std::process::exit(1);
        }
    }
}
