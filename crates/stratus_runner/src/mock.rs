//! Mock command runner for testing.
//!
//! Provides a configurable mock implementation of the CommandRunner trait
//! for use in unit tests without invoking terraform or cloud CLIs.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::{CommandConfig, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Predefined mock response for a command execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 10,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 10,
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl CapturedCall {
    /// Program and arguments joined by spaces, without quoting.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Mock command runner for testing.
///
/// Captures every `run` call and answers with the queued responses in
/// order, falling back to an empty success once the queue is exhausted.
#[derive(Clone, Default)]
pub struct MockRunner {
    /// Predefined responses for run calls.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    /// Index of next response to return.
    response_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Programs reported as unavailable.
    unavailable: Arc<RwLock<HashSet<String>>>,
    /// Simulated failure to return (as a string message for ExecutionFailed).
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mock response for the next run call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Report `program` as not installed.
    pub fn set_unavailable(self, program: impl Into<String>) -> Self {
        self.unavailable.write().insert(program.into());
        self
    }

    /// Set a failure to simulate.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Captured calls rendered as command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .map(CapturedCall::command_line)
            .collect()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    fn next_response(&self) -> MockResponse {
        let responses = self.responses.read();
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index)
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        Ok(!self.unavailable.read().contains(program))
    }

    async fn run(
        &self,
        config: &CommandConfig,
        _run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        self.captured_calls.write().push(CapturedCall {
            program: config.program.clone(),
            args: config.args.clone(),
            workdir: config.workdir.clone(),
            env: config.env.clone(),
        });

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }

        let response = self.next_response();
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            command: config.command_line(),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}
