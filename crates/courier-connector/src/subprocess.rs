//! The sole [`Connector`] implementation: one OS child process per turn.
//!
//! Grounded directly on the existing `SubAgentExecutor::spawn`
//! (`astrid-runtime::subagent_executor`), generalized from "run an in-process
//! agentic loop" to "spawn an external CLI subprocess, pipe a prompt to
//! stdin, read stdout" — the race shape (`tokio::select! { biased; cancel,
//! timeout }`, partial-output extraction on every non-success branch) is
//! unchanged.

use crate::error::{ConnectorError, ConnectorResult};
use crate::registry::CancellationRegistry;
use crate::{Connector, ProgressCallback, TurnRequest};
use async_trait::async_trait;
use courier_config::ConnectorConfig;
use courier_core::RunId;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout as tokio_timeout;
use tracing::warn;

/// Spawns the configured CLI executable for every turn.
pub struct SubprocessConnector {
    config: ConnectorConfig,
    soul_prompt: Mutex<String>,
    registry: CancellationRegistry,
}

impl SubprocessConnector {
    /// Build a connector from the configured command, args, and model.
    #[must_use]
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            soul_prompt: Mutex::new(String::new()),
            registry: CancellationRegistry::new(),
        }
    }

    fn build_command(&self, workspace: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args);
        if let Some(model) = &self.config.model {
            cmd.arg("--model").arg(model);
        }
        cmd.current_dir(workspace);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    fn full_prompt(&self, prompt: &str) -> String {
        let soul = self
            .soul_prompt
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if soul.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", soul, prompt)
        }
    }

    async fn spawn_and_write(
        &self,
        workspace: &std::path::Path,
        prompt: &str,
    ) -> ConnectorResult<Child> {
        let mut child = self.build_command(workspace).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConnectorError::CommandNotFound(self.config.command.clone())
            } else {
                ConnectorError::SpawnFailed(e.to_string())
            }
        })?;

        let mut stdin = child
            .stdin
            .take()
            .expect("stdin was requested as piped at spawn time");
        let payload = self.full_prompt(prompt);
        stdin.write_all(payload.as_bytes()).await?;
        drop(stdin);

        Ok(child)
    }
}

#[async_trait]
impl Connector for SubprocessConnector {
    fn set_soul_prompt(&self, text: String) {
        const MAX_SOUL_PROMPT_CHARS: usize = 8_000;
        let trimmed = if text.chars().count() > MAX_SOUL_PROMPT_CHARS {
            text.chars().take(MAX_SOUL_PROMPT_CHARS).collect()
        } else {
            text
        };
        *self
            .soul_prompt
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = trimmed;
    }

    async fn run_turn(&self, request: TurnRequest<'_>) -> ConnectorResult<String> {
        self.run_turn_streaming(request, None).await
    }

    async fn run_turn_streaming(
        &self,
        request: TurnRequest<'_>,
        on_progress: Option<Arc<ProgressCallback>>,
    ) -> ConnectorResult<String> {
        let TurnRequest {
            run_id,
            prompt,
            workspace,
            timeout,
        } = request;

        let mut child = self.spawn_and_write(workspace, prompt).await?;
        let stdout = child
            .stdout
            .take()
            .expect("stdout was requested as piped at spawn time");
        let mut stderr = child
            .stderr
            .take()
            .expect("stderr was requested as piped at spawn time");

        let token = self.registry.register(run_id);
        let read_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut collected = String::new();
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if let Some(callback) = &on_progress {
                            callback(&line);
                        }
                        collected.push_str(&line);
                    }
                }
            }
            collected
        });

        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => Err(TurnFailure::Cancelled),
            result = tokio_timeout(timeout, child.wait()) => match result {
                Err(_elapsed) => Err(TurnFailure::Timeout),
                Ok(Ok(status)) => Ok(status),
                Ok(Err(e)) => Err(TurnFailure::Io(e)),
            },
        };

        self.registry.unregister(run_id);

        match outcome {
            Err(TurnFailure::Cancelled) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                let partial = read_task.await.unwrap_or_default();
                warn!(%run_id, "connector turn cancelled");
                Err(ConnectorError::Cancelled {
                    partial_output: partial,
                })
            }
            Err(TurnFailure::Timeout) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                let partial = read_task.await.unwrap_or_default();
                warn!(%run_id, "connector turn timed out");
                Err(ConnectorError::Timeout {
                    partial_output: partial,
                })
            }
            Err(TurnFailure::Io(e)) => Err(ConnectorError::Io(e)),
            Ok(status) => {
                let collected = read_task.await.unwrap_or_default();
                let mut stderr_text = String::new();
                let _ = stderr.read_to_string(&mut stderr_text).await;
                let text = collected.trim().to_string();

                if !status.success() {
                    return Err(ConnectorError::NonZeroExit {
                        code: status.code(),
                        stderr: stderr_text,
                        partial_output: text,
                    });
                }
                if text.is_empty() {
                    return Err(ConnectorError::EmptyOutput);
                }
                Ok(text)
            }
        }
    }

    fn cancel(&self, run_id: RunId) -> bool {
        self.registry.cancel(run_id)
    }

    fn cancel_all(&self) {
        self.registry.cancel_all();
    }
}

enum TurnFailure {
    Cancelled,
    Timeout,
    Io(std::io::Error),
}
