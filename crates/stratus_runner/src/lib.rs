//! # stratus_runner
//!
//! Command execution wrapper for stratus.
//!
//! Every infrastructure task boils down to "build a command line, run it,
//! look at the exit code". This crate owns that last step so the task code
//! only ever talks to the [`CommandRunner`] trait.
//!
//! # Features
//!
//! - **Process Runner**: spawns host processes through `tokio::process`
//! - **Dry-Run Mode**: log commands without executing them
//! - **CI Integration**: timestamped log lines when streaming output
//! - **Mock Runner**: records calls and replays canned responses in tests
//!
//! # Example
//!
//! ```rust,no_run
//! use stratus_runner::{CommandConfig, CommandRunner, ProcessRunner, ProcessRunnerOptions, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ProcessRunner::new(ProcessRunnerOptions::default());
//!
//!     let config = CommandConfig::new("terraform")
//!         .arg("fmt")
//!         .arg("-recursive")
//!         .workdir("infra/dev");
//!
//!     let result = runner.run(&config, &RunConfig::default()).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod process;
pub mod runner;

pub use config::{CommandConfig, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use process::{LogStream, ProcessRunner, ProcessRunnerOptions};
pub use runner::{CommandRunner, ExecutionResult};
