//! Run configuration.
//!
//! Environment variables take precedence, with
//! `$HOME/.gitscribe/settings.json` as a fallback for machines where
//! exporting variables is inconvenient. Configuration is loaded once at
//! the top of a run and threaded through as a value; nothing reads it
//! from global state afterwards.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::ai::error::CompletionError;
use crate::i18n::Language;

/// Default API endpoint.
const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// Default model identifier.
const DEFAULT_MODEL: &str = "gpt-3.5-turbo-16k";

/// Default reserve for the model's response, in tokens.
const DEFAULT_MAX_COMPLETION_TOKENS: usize = 500;

/// Default model context limit, in tokens.
const DEFAULT_CONTEXT_LIMIT: usize = 4096;

/// Read-only configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the completion service.
    pub api_key: String,
    /// Base URL of the completion service.
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// Tokens reserved for the model's response.
    pub max_completion_tokens: usize,
    /// Total context window of the model, in tokens.
    pub context_limit: usize,
    /// Language generated messages are written in.
    pub language: Language,
    /// Whether to ask for GitMoji prefixes.
    pub emoji: bool,
    /// Whether to ask for a rationale paragraph after the message.
    pub description: bool,
    /// Optional client-side request-rate cap.
    pub requests_per_minute: Option<u32>,
}

/// Settings loaded from `$HOME/.gitscribe/settings.json`.
#[derive(Debug, Default, Deserialize)]
struct Settings {
    /// Environment variable overrides.
    #[serde(default)]
    env: HashMap<String, String>,
}

impl Settings {
    /// Loads settings from the default location, tolerating absence.
    fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        match Self::load_from_path(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
                Self::default()
            }
        }
    }

    /// Loads settings from a specific path; a missing file is default
    /// settings.
    fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// The default settings path, if a home directory exists.
    fn settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".gitscribe").join("settings.json"))
    }
}

impl Config {
    /// Loads configuration from the environment with settings-file
    /// fallback.
    pub fn load() -> Result<Self> {
        let settings = Settings::load();
        Self::from_lookup(|key| env::var(key).ok().or_else(|| settings.env.get(key).cloned()))
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Split out from [`load`](Self::load) so tests can supply values
    /// without touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("GITSCRIBE_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .ok_or(CompletionError::ApiKeyNotFound)?;

        let language = match lookup("GITSCRIBE_LANGUAGE") {
            Some(raw) => raw
                .parse::<Language>()
                .context("Invalid GITSCRIBE_LANGUAGE")?,
            None => Language::default(),
        };

        Ok(Self {
            api_key,
            api_base: lookup("GITSCRIBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: lookup("GITSCRIBE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_completion_tokens: parse_tokens(
                lookup("GITSCRIBE_MAX_COMPLETION_TOKENS"),
                "GITSCRIBE_MAX_COMPLETION_TOKENS",
                DEFAULT_MAX_COMPLETION_TOKENS,
            )?,
            context_limit: parse_tokens(
                lookup("GITSCRIBE_CONTEXT_LIMIT"),
                "GITSCRIBE_CONTEXT_LIMIT",
                DEFAULT_CONTEXT_LIMIT,
            )?,
            language,
            emoji: parse_flag(lookup("GITSCRIBE_EMOJI"), "GITSCRIBE_EMOJI")?,
            description: parse_flag(lookup("GITSCRIBE_DESCRIPTION"), "GITSCRIBE_DESCRIPTION")?,
            requests_per_minute: match lookup("GITSCRIBE_REQUESTS_PER_MINUTE") {
                Some(raw) => Some(
                    raw.parse::<u32>()
                        .context("Invalid GITSCRIBE_REQUESTS_PER_MINUTE")?,
                ),
                None => None,
            },
        })
    }
}

/// Parses an optional token count, falling back to a default.
fn parse_tokens(raw: Option<String>, key: &str, default: usize) -> Result<usize> {
    match raw {
        Some(value) => value
            .parse::<usize>()
            .with_context(|| format!("Invalid {key}: {value}")),
        None => Ok(default),
    }
}

/// Parses an optional boolean flag; absent means off.
fn parse_flag(raw: Option<String>, key: &str) -> Result<bool> {
    match raw.as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => anyhow::bail!("Invalid {key}: {other}"),
    }
}
