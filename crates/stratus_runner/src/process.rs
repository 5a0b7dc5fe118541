//! Host process runner.
//!
//! Spawns programs directly (no shell) through `tokio::process`, captures
//! their output exactly as written and optionally echoes it line by line
//! while it arrives.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{CommandConfig, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Output stream of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Process runner options.
#[derive(Debug, Clone)]
pub struct ProcessRunnerOptions {
    /// Dry-run mode (log commands without executing)
    pub dry_run: bool,
    /// CI mode (timestamp echoed output lines)
    pub ci_mode: bool,
}

impl Default for ProcessRunnerOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            ci_mode: std::env::var("CI").is_ok(),
        }
    }
}

impl ProcessRunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn ci_mode(mut self) -> Self {
        self.ci_mode = true;
        self
    }
}

/// Runner that executes commands as host processes.
pub struct ProcessRunner {
    options: ProcessRunnerOptions,
}

impl ProcessRunner {
    pub fn new(options: ProcessRunnerOptions) -> Self {
        Self { options }
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    fn dry_run_result(&self, command: String) -> ExecutionResult {
        let now = Utc::now();
        ExecutionResult {
            stdout: format!("[DRY-RUN] Command: {}", command),
            command,
            exit_code: 0,
            stderr: String::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }
}

/// Drain a child stream, echoing each line when asked to.
///
/// Output is kept byte for byte and decoded once at the end; invalid UTF-8
/// becomes U+FFFD instead of cutting the capture short.
async fn collect_output<R>(
    reader: R,
    stream: LogStream,
    echo: bool,
    ci_mode: bool,
) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut output = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if echo {
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\n', '\r']);
            let rendered = if ci_mode {
                format!(
                    "[{}] [{}] {}",
                    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                    stream,
                    text
                )
            } else {
                text.to_string()
            };
            match stream {
                LogStream::Stdout => println!("{}", rendered),
                LogStream::Stderr => eprintln!("{}", rendered),
            }
        }
        output.extend_from_slice(&line);
    }

    Ok(String::from_utf8_lossy(&output).into_owned())
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        if self.options.dry_run {
            debug!("[DRY-RUN] Assuming {} is available", program);
            return Ok(true);
        }

        let status = Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        Ok(status.map(|s| s.success()).unwrap_or(false))
    }

    async fn run(
        &self,
        config: &CommandConfig,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let command_line = config.command_line();

        if self.options.dry_run {
            warn!("[DRY-RUN] Would execute: {}", command_line);
            return Ok(self.dry_run_result(command_line));
        }

        info!("Running: {}", command_line);
        if let Some(dir) = &config.workdir {
            debug!("Working directory: {}", dir.display());
        }

        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.workdir {
            cmd.current_dir(dir);
        }

        let started_at = Utc::now();
        let start = Instant::now();

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RunnerError::ProgramNotFound(config.program.clone()),
            _ => RunnerError::ExecutionFailed(format!("Failed to spawn {}: {}", config.program, e)),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr was not captured".to_string()))?;

        let echo = run_config.stream_logs;
        let ci_mode = self.options.ci_mode;
        let stdout_task = tokio::spawn(collect_output(stdout, LogStream::Stdout, echo, ci_mode));
        let stderr_task = tokio::spawn(collect_output(stderr, LogStream::Stderr, echo, ci_mode));

        let status = if run_config.timeout_seconds > 0 {
            let limit = Duration::from_secs(run_config.timeout_seconds);
            match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(RunnerError::Timeout(run_config.timeout_seconds));
                }
            }
        } else {
            child.wait().await?
        };

        let stdout = stdout_task
            .await
            .map_err(|e| RunnerError::ExecutionFailed(format!("stdout reader failed: {}", e)))??;
        let stderr = stderr_task
            .await
            .map_err(|e| RunnerError::ExecutionFailed(format!("stderr reader failed: {}", e)))??;

        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!("{} exited with {} after {}ms", config.program, exit_code, duration_ms);

        Ok(ExecutionResult {
            command: command_line,
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        })
    }
}
