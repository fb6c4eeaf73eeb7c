//! stencil CLI entry point
//!
//! Parses the command line, runs the command and prints errors with
//! suggestions:
//! - `roots` - roots of a template
//! - `graph` - include trees of every root
//! - `render` - render roots
//! - `outline` - outline of a root
//! - `check` - structural problems of the template tree
//! - `clean` - purge the scratch directory

use anyhow::Result;
use clap::Parser;
use stencil_cli::cli;
use stencil_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

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
