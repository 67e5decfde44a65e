//! Runs one AI subprocess turn per run: spawn, pipe a prompt in, collect
//! output, enforce a timeout, return either text or a typed failure.
//!
//! Grounded directly on the existing `SubAgentExecutor::spawn`
//! (`astrid-runtime::subagent_executor`): the `tokio::select! { biased; ...
//! }` cancellation/timeout race, generalized from an in-process agentic loop
//! to an external CLI subprocess. The cancellation registry is a
//! `DashMap<RunId, CancellationToken>`, grounded on the existing use of
//! `dashmap` for exactly this kind of keyed concurrent registry.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod registry;
mod subprocess;

pub use error::{ConnectorError, ConnectorResult};
pub use registry::CancellationRegistry;
pub use subprocess::SubprocessConnector;

use async_trait::async_trait;
use courier_core::RunId;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A callback invoked with each line of progress text as it is produced.
/// Rate-limiting the UI-visible cadence of these calls is the orchestrator's
/// responsibility, not the connector's.
pub type ProgressCallback = dyn Fn(&str) + Send + Sync + 'static;

/// Everything one connector turn needs: which run it belongs to (for the
/// cancellation registry), the fully assembled prompt text, the workspace
/// directory the subprocess should run in, and its timeout.
#[derive(Debug, Clone, Copy)]
pub struct TurnRequest<'a> {
    /// The run this turn executes on behalf of.
    pub run_id: RunId,
    /// The fully assembled prompt (memory, tools preamble, session history,
    /// workspace marker, and user body — assembled by the orchestrator's
    /// prompt-assembly pass; the connector itself only prepends the stored
    /// soul prompt).
    pub prompt: &'a str,
    /// The working directory the subprocess is spawned in.
    pub workspace: &'a Path,
    /// How long to let this turn run before it is killed and converted to
    /// `ConnectorError::Timeout`.
    pub timeout: Duration,
}

/// Executes one AI turn by spawning a child process. Implementations must be
/// safe for concurrent calls from multiple runs: the only state shared
/// across calls is the soul prompt and the cancellation registry, both
/// copy-on-read or independently keyed.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Store the personality/system prompt prepended to every future turn,
    /// trimmed to a bound.
    fn set_soul_prompt(&self, text: String);

    /// Run one turn to completion, returning its full text output.
    async fn run_turn(&self, request: TurnRequest<'_>) -> ConnectorResult<String>;

    /// Run one turn, additionally invoking `on_progress` with each line of
    /// output as it is produced.
    async fn run_turn_streaming(
        &self,
        request: TurnRequest<'_>,
        on_progress: Option<Arc<ProgressCallback>>,
    ) -> ConnectorResult<String>;

    /// Terminate the in-flight child for `run_id`, if any. Returns `true` if
    /// a running turn was found and signalled. Safe to call from any thread.
    fn cancel(&self, run_id: RunId) -> bool;

    /// The daemon-wide killswitch: terminate every in-flight turn.
    fn cancel_all(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_config::ConnectorConfig;
    use std::sync::Mutex;

    fn connector(command: &str, args: Vec<&str>) -> SubprocessConnector {
        SubprocessConnector::new(ConnectorConfig {
            name: "test".to_string(),
            command: command.to_string(),
            args: args.into_iter().map(str::to_string).collect(),
            model: None,
            checkpoint_on_timeout: true,
            max_resume_attempts: 3,
        })
    }

    #[tokio::test]
    async fn successful_turn_returns_stdout_text() {
        let connector = connector("cat", vec![]);
        let workspace = std::env::temp_dir();
        let request = TurnRequest {
            run_id: RunId::new(),
            prompt: "hello from the test\n",
            workspace: &workspace,
            timeout: Duration::from_secs(5),
        };
        let output = connector.run_turn(request).await.unwrap();
        assert_eq!(output, "hello from the test");
    }

    #[tokio::test]
    async fn missing_command_is_reported_as_command_not_found() {
        let connector = connector("definitely-not-a-real-binary-xyz", vec![]);
        let workspace = std::env::temp_dir();
        let request = TurnRequest {
            run_id: RunId::new(),
            prompt: "hi",
            workspace: &workspace,
            timeout: Duration::from_secs(5),
        };
        let err = connector.run_turn(request).await.unwrap_err();
        assert!(matches!(err, ConnectorError::CommandNotFound(_)));
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr_and_partial_output() {
        let connector = connector("sh", vec!["-c", "cat; echo boom >&2; exit 3"]);
        let workspace = std::env::temp_dir();
        let request = TurnRequest {
            run_id: RunId::new(),
            prompt: "partial text",
            workspace: &workspace,
            timeout: Duration::from_secs(5),
        };
        let err = connector.run_turn(request).await.unwrap_err();
        match err {
            ConnectorError::NonZeroExit { code, stderr, partial_output } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("boom"));
                assert_eq!(partial_output, "partial text");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_kills_the_child_and_reports_partial_output() {
        let connector = connector("sh", vec!["-c", "echo partial; sleep 5"]);
        let workspace = std::env::temp_dir();
        let request = TurnRequest {
            run_id: RunId::new(),
            prompt: "",
            workspace: &workspace,
            timeout: Duration::from_millis(200),
        };
        let err = connector.run_turn(request).await.unwrap_err();
        match err {
            ConnectorError::Timeout { partial_output } => {
                assert!(partial_output.contains("partial"));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_terminates_the_in_flight_turn() {
        let connector = Arc::new(connector("sh", vec!["-c", "echo started; sleep 30"]));
        let run_id = RunId::new();

        let spawned = connector.clone();
        let handle = tokio::spawn(async move {
            let workspace = std::env::temp_dir();
            let request = TurnRequest {
                run_id,
                prompt: "",
                workspace: &workspace,
                timeout: Duration::from_secs(30),
            };
            spawned.run_turn(request).await
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(connector.cancel(run_id));

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ConnectorError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn empty_output_is_reported_distinctly() {
        let connector = connector("sh", vec!["-c", "true"]);
        let workspace = std::env::temp_dir();
        let request = TurnRequest {
            run_id: RunId::new(),
            prompt: "",
            workspace: &workspace,
            timeout: Duration::from_secs(5),
        };
        let err = connector.run_turn(request).await.unwrap_err();
        assert!(matches!(err, ConnectorError::EmptyOutput));
    }

    #[tokio::test]
    async fn streaming_callback_observes_each_line() {
        let connector = connector("sh", vec!["-c", "echo one; echo two"]);
        let workspace = std::env::temp_dir();
        let lines: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let observed = lines.clone();
        let callback: Arc<ProgressCallback> = Arc::new(move |line: &str| {
            observed.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(line.to_string());
        });
        let request = TurnRequest {
            run_id: RunId::new(),
            prompt: "",
            workspace: &workspace,
            timeout: Duration::from_secs(5),
        };
        let output = connector
            .run_turn_streaming(request, Some(callback))
            .await
            .unwrap();
        assert_eq!(output, "one\ntwo");
        assert_eq!(lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len(), 2);
    }

    #[tokio::test]
    async fn set_soul_prompt_is_prepended_to_the_payload() {
        let connector = connector("cat", vec![]);
        connector.set_soul_prompt("you are a helpful assistant".to_string());
        let workspace = std::env::temp_dir();
        let request = TurnRequest {
            run_id: RunId::new(),
            prompt: "the user body",
            workspace: &workspace,
            timeout: Duration::from_secs(5),
        };
        let output = connector.run_turn(request).await.unwrap();
        assert!(output.contains("you are a helpful assistant"));
        assert!(output.contains("the user body"));
    }
}
