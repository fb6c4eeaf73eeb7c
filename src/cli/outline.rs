//! Print the outline of a root: its variables, sections and includes.
//!
//! ```text
//! invoice
//! ├── #items, line=3
//! │   ├── name, line=4
//! │   └── price, line=5
//! └── >/mail/footer, line=8
//!     └── company, line=1
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{OutputFormat, ProjectContext};

/// Command printing the outline of one root.
#[derive(Args, Debug)]
pub struct OutlineCommand {
    /// Root name or template file path
    template: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "tree")]
    format: OutputFormat,
}

impl OutlineCommand {
    pub async fn execute(self, project: &ProjectContext) -> Result<()> {
        let engine = project.scanned_engine()?;
        let root = project.template_arg(&self.template)?;
        if !engine.graph().contains(&root) {
            return Err(project.unknown_template(&root));
        }

        let artifact = engine.render_async(root).await?;
        let outline = &artifact.outline;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outline)?),
            OutputFormat::Tree => {
                print!("{}", outline.to_tree_string());
                let invalid = outline.invalid_includes();
                if !invalid.is_empty() {
                    println!();
                    println!(
                        "{} {} include(s) point at missing templates",
                        "⚠".yellow(),
                        invalid.len()
                    );
                }
            }
        }
        Ok(())
    }
}
