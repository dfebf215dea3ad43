//! Local CLI credential helper strategy

use crate::strategies::TokenStrategy;
use crate::token::AccessToken;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs a credential helper (by default `gcloud auth print-access-token`)
/// and uses its stdout as the token.
///
/// A missing binary means "not applicable"; non-zero exit, empty output and
/// timeout are failures.
pub struct CliHelperStrategy {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CliHelperStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "gcloud".to_string(),
            args: vec!["auth".to_string(), "print-access-token".to_string()],
            timeout,
        }
    }

    pub fn with_command(mut self, program: impl Into<String>, args: &[&str]) -> Self {
        self.program = program.into();
        self.args = args.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl Default for CliHelperStrategy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl TokenStrategy for CliHelperStrategy {
    async fn token(&self) -> Result<Option<AccessToken>> {
        let Ok(program) = which::which(&self.program) else {
            debug!("Credential helper '{}' not found on PATH", self.program);
            return Ok(None);
        };

        let child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                anyhow!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        match AccessToken::new(stdout) {
            Some(token) => Ok(Some(token)),
            None => Err(anyhow!("{} produced no output", self.program)),
        }
    }

    fn name(&self) -> &'static str {
        "cli-helper"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_becomes_token() {
        let strategy = CliHelperStrategy::default().with_command("sh", &["-c", "echo tok-abc"]);
        let token = strategy.token().await.unwrap().unwrap();
        assert_eq!(token.expose(), "tok-abc");
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let strategy = CliHelperStrategy::default().with_command("sh", &["-c", "echo tok; exit 1"]);
        assert!(strategy.token().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_stdout_fails() {
        let strategy = CliHelperStrategy::default().with_command("sh", &["-c", "true"]);
        assert!(strategy.token().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_applicable() {
        let strategy =
            CliHelperStrategy::default().with_command("quiver-no-such-helper-binary", &[]);
        assert!(strategy.token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_timeout_fails() {
        let strategy = CliHelperStrategy::new(Duration::from_millis(100))
            .with_command("sh", &["-c", "sleep 5; echo late"]);
        let err = strategy.token().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
