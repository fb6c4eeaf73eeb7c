//! Check the template tree for structural problems.
//!
//! Reports:
//! - dangling includes (names with no template file)
//! - include cycles (which never terminate when rendered)
//! - templates no root reaches
//!
//! Findings are printed as warnings; with `--strict` they fail the command,
//! which makes `stencil check --strict` usable as a CI step.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use super::ProjectContext;

/// Command checking the include graph.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Exit with an error when any problem is found
    #[arg(long)]
    strict: bool,
}

impl CheckCommand {
    pub fn execute(self, project: &ProjectContext) -> Result<()> {
        let engine = project.scanned_engine()?;
        let graph = engine.graph();

        println!(
            "Checked {} template(s) in {}: {} root(s)",
            graph.files().len(),
            engine.templates_dir().display(),
            graph.roots().len()
        );

        let mut problems = 0;

        for (missing, parents) in graph.dangling() {
            problems += 1;
            let parents: Vec<&str> = parents.iter().map(|p| p.as_str()).collect();
            println!(
                "{} missing template '{}' included by {}",
                "✗".red(),
                missing.as_str().bold(),
                parents.join(", ")
            );
        }

        for cycle in graph.cycles() {
            problems += 1;
            let mut names: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
            if let Some(first) = names.first().copied() {
                names.push(first);
            }
            println!("{} include cycle: {}", "✗".red(), names.join(" → "));
        }

        for id in graph.unreachable() {
            problems += 1;
            println!("{} '{}' is not reachable from any root", "⚠".yellow(), id.as_str().bold());
        }

        if problems == 0 {
            println!("{} No problems found", "✓".green());
            return Ok(());
        }

        println!();
        println!("{problems} problem(s) found");
        if self.strict {
            bail!("Template check failed with {problems} problem(s)");
        }
        Ok(())
    }
}
