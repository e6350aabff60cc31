//! CLI command definitions using clap.
//!
//! - iterate: revise an artifact from feedback
//! - history: list past iterations on an artifact

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Folio - feedback-driven revision of a novel's premise, treatment, outline and prose
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Revise an artifact according to feedback
    Iterate {
        /// Artifact to revise (premise, treatment, chapters, prose)
        target: String,

        /// What should change
        feedback: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },

    /// Show the iteration history of an artifact
    History {
        /// Artifact whose history to show (premise, treatment, chapters, prose)
        target: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },
}
