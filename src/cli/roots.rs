//! Show the root documents that include a template.
//!
//! ```bash
//! stencil roots mail/footer
//! stencil roots src/main/resources/templates/mail/footer.mustache
//! stencil roots mail/footer --json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::ProjectContext;

/// Command printing the roots of one template.
#[derive(Args, Debug)]
pub struct RootsCommand {
    /// Template name (`mail/footer`) or path to a template file
    template: String,

    /// Print the roots as a JSON array
    #[arg(long)]
    json: bool,
}

impl RootsCommand {
    pub fn execute(self, project: &ProjectContext) -> Result<()> {
        let engine = project.scanned_engine()?;
        let id = project.template_arg(&self.template)?;

        let graph = engine.graph();
        if !graph.contains(&id) {
            return Err(project.unknown_template(&id));
        }

        let roots = engine.roots_for(&id);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&roots)?);
            return Ok(());
        }

        if roots.is_empty() {
            println!(
                "{} '{id}' is only reachable through an include cycle and has no root",
                "⚠".yellow()
            );
            return Ok(());
        }

        if !graph.is_file(&id) {
            println!("{} '{id}' is included but has no template file", "⚠".yellow());
        }
        for root in &roots {
            println!("{root}");
        }
        Ok(())
    }
}
