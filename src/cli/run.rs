//! Command implementations wiring configuration, git and the generator.

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use crate::ai::client::CompletionClient;
use crate::ai::limiter::RequestLimiter;
use crate::ai::openai::OpenAiApi;
use crate::config::Config;
use crate::generate::prompt::PromptTemplate;
use crate::generate::Generator;
use crate::git::Repo;
use crate::tokens::HeuristicTokenCounter;

/// Print a commit message for the staged diff.
#[derive(Args)]
pub struct GenerateCommand {
    /// Stage all changed files before generating
    #[arg(long)]
    pub all: bool,
}

impl GenerateCommand {
    /// Generates the message and prints it to stdout.
    pub async fn execute(self) -> Result<()> {
        let message = generate_for_staged(self.all).await?;
        println!("{message}");
        Ok(())
    }
}

/// Generate a commit message and create the commit.
#[derive(Args)]
pub struct CommitCommand {
    /// Stage all changed files before generating
    #[arg(long)]
    pub all: bool,

    /// Print the message without creating a commit
    #[arg(long)]
    pub dry_run: bool,
}

impl CommitCommand {
    /// Generates the message and commits the staged changes with it.
    pub async fn execute(self) -> Result<()> {
        let message = generate_for_staged(self.all).await?;

        if self.dry_run {
            println!("{message}");
            return Ok(());
        }

        let repo = Repo::open()?;
        let oid = repo.commit(&message)?;
        println!("{message}");
        info!(commit = %oid, "created commit");
        Ok(())
    }
}

/// Shared pipeline: configuration, staging, diffing, generation.
async fn generate_for_staged(stage_all: bool) -> Result<String> {
    let config = Config::load()?;
    let repo = Repo::open()?;

    if stage_all {
        let changed = repo.changed_files()?;
        if !changed.is_empty() {
            info!(files = changed.len(), "staging changed files");
            repo.add(&changed)?;
        }
    }

    let staged = repo.staged_files()?;
    if staged.is_empty() {
        bail!("no staged files: stage changes first or pass --all");
    }

    let diff = repo.staged_diff(&staged)?;
    if diff.trim().is_empty() {
        bail!("the staged diff is empty after exclusions");
    }

    let counter = std::sync::Arc::new(HeuristicTokenCounter);
    let api = OpenAiApi::from_config(&config)?;
    let mut client = CompletionClient::new(Box::new(api), counter.clone());
    if let Some(rpm) = config.requests_per_minute {
        client = client.with_limiter(RequestLimiter::per_minute(rpm));
    }

    let template = PromptTemplate::new(config.language, config.emoji, config.description);
    let generator = Generator::new(client, counter, template)?;

    generator.generate(&diff).await
}
