//! Print the include graph.
//!
//! # Output Format
//!
//! ## Tree Format (Default)
//! ```text
//! invoice
//! ├── mail/header
//! │   └── mail/logo
//! └── mail/footer
//!     └── mail/logo (*)
//!
//! letter
//! └── mail/header (*)
//!
//! (*) = already shown above
//! ```
//!
//! ## JSON Format
//! Every template with its includes, direct parents, roots and whether a file
//! backs it, plus the list of roots.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;

use super::{OutputFormat, ProjectContext};

/// Command printing every root with its include tree.
#[derive(Args, Debug)]
pub struct GraphCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "tree")]
    format: OutputFormat,

    /// Maximum include depth to display (unlimited if not specified)
    #[arg(short, long)]
    depth: Option<usize>,
}

impl GraphCommand {
    pub fn execute(self, project: &ProjectContext) -> Result<()> {
        let engine = project.scanned_engine()?;
        let graph = engine.graph();

        match self.format {
            OutputFormat::Json => {
                let templates: serde_json::Map<String, serde_json::Value> = graph
                    .iter()
                    .map(|(id, props)| {
                        let entry = json!({
                            "file": graph.is_file(id),
                            "includes": graph.includes_of(id),
                            "direct_parents": props.direct_parents,
                            "roots": props.roots,
                        });
                        (id.to_string(), entry)
                    })
                    .collect();
                let output = json!({
                    "templates_dir": engine.templates_dir(),
                    "roots": graph.roots(),
                    "templates": templates,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Tree => {
                if graph.roots().is_empty() {
                    println!(
                        "No templates found in {}",
                        engine.templates_dir().display().to_string().yellow()
                    );
                    return Ok(());
                }

                let trees: Vec<String> = graph
                    .roots()
                    .iter()
                    .map(|root| graph.to_tree_string(root, self.depth))
                    .collect();
                print!("{}", trees.join("\n"));

                if trees.iter().any(|tree| tree.contains(" (*)")) {
                    println!();
                    println!("{}", "(*) = already shown above".dimmed());
                }
            }
        }
        Ok(())
    }
}
