//! Command-line interface for stencil.
//!
//! Each command lives in its own module with its own argument struct and
//! execution logic; this module holds the root [`Cli`] parser, global flags
//! and the project context shared by every command.
//!
//! # Available Commands
//!
//! - `roots` - Show which root documents include a template
//! - `graph` - Print every root with its include tree
//! - `render` - Render roots and report the produced artifacts
//! - `outline` - Print the outline of a root
//! - `check` - Report dangling includes, include cycles and unreachable templates
//! - `clean` - Delete rendered artifacts from the scratch directory
//!
//! # Examples
//!
//! ```bash
//! stencil roots mail/footer
//! stencil graph --depth 2
//! stencil render invoice letter --out build/previews
//! stencil --verbose check --strict
//! ```

mod check;
mod clean;
mod graph;
mod outline;
mod render;
mod roots;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use strsim::levenshtein;
use tracing_subscriber::EnvFilter;

use crate::config::StencilConfig;
use crate::core::{ErrorContext, TemplateId};
use crate::engine::TemplateEngine;

/// Maximum Levenshtein distance, as a percentage of the name length, for "did you mean" suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Runtime settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can drive commands without parsing
/// arguments.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: Option<String>,

    /// Explicit configuration file
    pub config_path: Option<PathBuf>,

    /// Template root overriding `templates_dir` from the configuration
    pub templates_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Empty configuration: default logging, discovered `stencil.toml`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber. `RUST_LOG` wins over the flags.
    ///
    /// Logs go to stderr so command output stays pipeable.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(level)
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load the project configuration relative to `cwd`, applying the overrides.
    pub fn load_project(&self, cwd: &Path) -> Result<StencilConfig> {
        let mut config = StencilConfig::load(self.config_path.as_deref(), cwd)?;
        if let Some(dir) = &self.templates_dir {
            config.templates_dir = cwd.join(dir);
        }
        Ok(config)
    }
}

/// Project state handed to every command.
pub struct ProjectContext {
    /// Working directory the command was started in
    pub cwd: PathBuf,
    /// Effective configuration
    pub config: StencilConfig,
    /// Engine built from `config`; the include graph is not scanned yet
    pub engine: TemplateEngine,
}

impl ProjectContext {
    /// Build the context for `cwd`.
    pub fn load(cli_config: &CliConfig, cwd: PathBuf) -> Result<Self> {
        let config = cli_config.load_project(&cwd)?;
        let engine = TemplateEngine::from_config(&config)?;
        Ok(Self {
            cwd,
            config,
            engine,
        })
    }

    /// Scan the template tree and return the engine.
    pub fn scanned_engine(&self) -> Result<&TemplateEngine> {
        self.engine.rebuild()?;
        Ok(&self.engine)
    }

    /// Interpret a command-line template argument.
    ///
    /// Arguments ending in the template suffix are file paths (relative to the
    /// working directory); anything else is a template name.
    pub fn template_arg(&self, arg: &str) -> Result<TemplateId> {
        let suffix = format!(".{}", self.engine.layout().suffix());
        if !arg.ends_with(&suffix) {
            return Ok(TemplateId::new(arg));
        }

        let path = self.cwd.join(arg);
        self.engine.template_id_for_path(&path).with_context(|| {
            format!(
                "{} is not inside the templates directory {}",
                path.display(),
                self.engine.templates_dir().display()
            )
        })
    }

    /// Error for a template the current graph does not know, with suggestions.
    pub fn unknown_template(&self, id: &TemplateId) -> anyhow::Error {
        let graph = self.engine.graph();
        let names: Vec<&str> = graph.files().iter().map(TemplateId::as_str).collect();
        let similar = find_similar(id.as_str(), &names);

        let context = ErrorContext::new(format!("Unknown template '{id}'"));
        let context = if similar.is_empty() {
            context.with_suggestion("Run 'stencil graph' to list the known templates")
        } else {
            context.with_suggestion(format!("Did you mean: {}?", similar.join(", ")))
        };
        anyhow::Error::new(context)
    }
}

/// Up to three names within the similarity threshold, closest first.
pub(crate) fn find_similar(target: &str, available: &[&str]) -> Vec<String> {
    let mut scored: Vec<_> =
        available.iter().map(|name| (*name, levenshtein(target, name))).collect();
    scored.sort_by_key(|(_, distance)| *distance);

    scored
        .into_iter()
        .filter(|(_, distance)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Output format of commands producing structured data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Box-drawing tree for humans
    Tree,
    /// Pretty-printed JSON for tooling
    Json,
}

/// Mustache template previews from the command line.
#[derive(Parser)]
#[command(
    name = "stencil",
    about = "Mustache template include graphs and document previews",
    version,
    long_about = "stencil scans a directory of Mustache templates, works out which root documents \
                  include each partial, and renders previews of those roots."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to stencil.toml (default: discovered from the current directory upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template root, overriding `templates_dir` from stencil.toml
    #[arg(long, global = true)]
    templates_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the root documents that include a template
    Roots(roots::RootsCommand),

    /// Print every root with its include tree
    Graph(graph::GraphCommand),

    /// Render roots and report the produced artifacts
    Render(render::RenderCommand),

    /// Print the outline (variables, sections, includes) of a root
    Outline(outline::OutlineCommand),

    /// Report dangling includes, include cycles and unreachable templates
    Check(check::CheckCommand),

    /// Delete rendered artifacts from the scratch directory
    Clean(clean::CleanCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "stencil_cli=debug"
        } else if self.quiet {
            "error"
        } else {
            "stencil_cli=info"
        };

        CliConfig {
            log_level: Some(log_level.to_string()),
            config_path: self.config.clone(),
            templates_dir: self.templates_dir.clone(),
        }
    }

    /// Execute with an explicit [`CliConfig`].
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
        let project = ProjectContext::load(&config, cwd)?;

        match self.command {
            Commands::Roots(cmd) => cmd.execute(&project),
            Commands::Graph(cmd) => cmd.execute(&project),
            Commands::Render(cmd) => cmd.execute(&project).await,
            Commands::Outline(cmd) => cmd.execute(&project).await,
            Commands::Check(cmd) => cmd.execute(&project),
            Commands::Clean(cmd) => cmd.execute(&project),
        }
    }
}
