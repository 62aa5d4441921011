//! Completion adapter backed by an external command.
//!
//! The prompt is written to the child's stdin and the completion is read
//! from its stdout. Sampling settings travel as environment variables so any
//! script or model CLI can be wrapped.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use super::TextCompletion;
use crate::config::CompletionSettings;

pub const ENV_TEMPERATURE: &str = "STUDYPLAN_TEMPERATURE";
pub const ENV_SEARCH: &str = "STUDYPLAN_SEARCH";
pub const ENV_MODEL: &str = "STUDYPLAN_MODEL";

/// Runs `command args...` once per completion.
#[derive(Debug, Clone)]
pub struct CommandCompletion {
    command: String,
    args: Vec<String>,
    model: Option<String>,
    timeout: Duration,
}

impl CommandCompletion {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            model: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Build from resolved settings. Fails when no command is configured.
    pub fn from_settings(settings: &CompletionSettings) -> Result<Self> {
        let command = settings
            .command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .context("no completion command configured")?;
        Ok(Self {
            command,
            args: settings.args.clone(),
            model: settings.model.clone(),
            timeout: settings.timeout(),
        })
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

#[async_trait]
impl TextCompletion for CommandCompletion {
    fn name(&self) -> &str {
        &self.command
    }

    async fn complete(&self, prompt: &str, temperature: f64, search_enabled: bool) -> Result<String> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .env(ENV_TEMPERATURE, temperature.to_string())
            .env(ENV_SEARCH, if search_enabled { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(model) = &self.model {
            cmd.env(ENV_MODEL, model);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn completion command ({})", self.describe()))?;

        let stdin_pipe = child.stdin.take();
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        // Feed stdin while draining stdout/stderr so neither side can fill a
        // pipe and stall the other.
        let write_prompt = async {
            if let Some(mut pipe) = stdin_pipe {
                pipe.write_all(prompt.as_bytes()).await.ok();
                // Dropping the pipe closes stdin and signals end of prompt.
            }
        };
        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let outcome = tokio::time::timeout(self.timeout, async {
            let (_, wait_result, stdout, stderr) =
                tokio::join!(write_prompt, child.wait(), read_stdout, read_stderr);
            (wait_result, stdout, stderr)
        })
        .await;

        match outcome {
            Ok((Ok(status), stdout, stderr)) => {
                if !status.success() {
                    bail!(
                        "completion command ({}) exited with {}: {}",
                        self.describe(),
                        status,
                        stderr.trim()
                    );
                }
                let text = stdout.trim();
                if text.is_empty() {
                    bail!("completion command ({}) produced no output", self.describe());
                }
                debug!(command = %self.command, bytes = text.len(), "completion received");
                Ok(text.to_string())
            }
            Ok((Err(e), _, _)) => Err(e)
                .with_context(|| format!("failed to wait on completion command ({})", self.describe())),
            Err(_) => {
                let _ = child.kill().await;
                bail!(
                    "completion command ({}) timed out after {}s",
                    self.describe(),
                    self.timeout.as_secs()
                )
            }
        }
    }
}
