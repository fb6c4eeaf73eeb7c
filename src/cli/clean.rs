//! Delete rendered artifacts from the scratch directory.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::ProjectContext;

/// Command purging `*.mtf.*` files from the scratch directory.
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub fn execute(self, project: &ProjectContext) -> Result<()> {
        let Some(scratch) = project.engine.scratch() else {
            println!("No scratch_dir configured; nothing to clean");
            return Ok(());
        };

        let removed = project.engine.purge_scratch()?;
        println!(
            "{} Removed {removed} artifact(s) from {}",
            "✓".green(),
            scratch.dir().display()
        );
        Ok(())
    }
}
