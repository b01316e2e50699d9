//! buildinputs CLI entry point
//!
//! Parses arguments, runs the analysis, and turns any failure into a
//! user-friendly message on stderr with exit status 1.

use anyhow::Result;
use buildinputs::cli;
use buildinputs::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
