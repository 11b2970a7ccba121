//! CLI interface for gitscribe.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod run;

/// gitscribe: commit messages from staged diffs
#[derive(Parser)]
#[command(name = "gitscribe")]
#[command(about = "Generates commit messages from staged git diffs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories
#[derive(Subcommand)]
pub enum Commands {
    /// Generate a commit message for the staged diff and print it
    Generate(run::GenerateCommand),
    /// Generate a commit message and create the commit
    Commit(run::CommitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Generate(cmd) => cmd.execute().await,
            Commands::Commit(cmd) => cmd.execute().await,
        }
    }
}
