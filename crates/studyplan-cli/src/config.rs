//! Configuration file management for studyplan.
//!
//! Provides a TOML-based config file at `~/.config/studyplan/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use studyplan_core::{CompletionSettings, WorkflowLimits};

pub const ENV_COMPLETION_COMMAND: &str = "STUDYPLAN_COMPLETION_COMMAND";
pub const ENV_MODEL: &str = "STUDYPLAN_MODEL";
pub const ENV_OUTPUT_DIR: &str = "STUDYPLAN_OUTPUT_DIR";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub completion: CompletionSettings,
    pub limits: WorkflowLimits,
    pub output: OutputSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Directory that receives saved study plans.
    pub dir: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the studyplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/studyplan` or
/// `~/.config/studyplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("studyplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("studyplan")
}

/// Return the path to the studyplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse a config file. Returns an error if it does not exist.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write a config file, creating parent dirs as needed.
pub fn save_config(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line. `None` defers to the rest of the chain.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub command: Option<String>,
    pub model: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub max_steps: Option<usize>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct StudyplanConfig {
    pub completion: CompletionSettings,
    pub limits: WorkflowLimits,
    pub output_dir: PathBuf,
}

impl StudyplanConfig {
    /// Resolve against the config file at [`config_path`], if it exists.
    pub fn resolve(cli: CliOverrides) -> Result<Self> {
        let path = config_path();
        let file_config = if path.exists() {
            Some(load_config(&path)?)
        } else {
            None
        };
        Self::resolve_with(cli, file_config)
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - Command: `--command` > `STUDYPLAN_COMPLETION_COMMAND` > `completion.command` > error
    /// - Model: `--model` > `STUDYPLAN_MODEL` > `completion.model` > none
    /// - Output dir: `--output-dir` > `STUDYPLAN_OUTPUT_DIR` > `output.dir` > `.`
    /// - Step ceiling: `--max-steps` > `limits.max_steps` > 100
    pub fn resolve_with(cli: CliOverrides, file_config: Option<ConfigFile>) -> Result<Self> {
        let ConfigFile {
            mut completion,
            mut limits,
            output,
        } = file_config.unwrap_or_default();

        completion.command = cli
            .command
            .or_else(|| non_empty_env(ENV_COMPLETION_COMMAND))
            .or(completion.command)
            .filter(|c| !c.trim().is_empty());
        if completion.command.is_none() {
            bail!(
                "completion command not found; set {ENV_COMPLETION_COMMAND}, pass --command, \
                 or run `studyplan init --command <cmd>` to create a config file"
            );
        }

        completion.model = cli
            .model
            .or_else(|| non_empty_env(ENV_MODEL))
            .or(completion.model);

        let output_dir = cli
            .output_dir
            .or_else(|| non_empty_env(ENV_OUTPUT_DIR).map(PathBuf::from))
            .or(output.dir)
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(max_steps) = cli.max_steps {
            limits.max_steps = max_steps;
        }

        Ok(Self {
            completion,
            limits,
            output_dir,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
