//! # stratus_iac
//!
//! Terraform environment configuration and infrastructure tasks for stratus.
//!
//! A project describes its environments in a single `infra.yaml`:
//!
//! ```yaml
//! envs:
//!   dev:
//!     hosted_on: GCP
//!     gcp_project_id: my-project
//!     infra_dir: infra/dev
//! backend_buckets:
//!   dev:
//!     hosted_on: GCP
//!     bucket_name: my-dev-state
//! tfvars:
//!   dev:
//!     region: us-central1
//! ```
//!
//! ## Features
//!
//! - `infra.yaml` discovery and typed loading into [`Config`]
//! - `variables.tf` parsing and tfvars validation
//! - `<env>.tfvars` generation as part of loading
//! - AWS/GCP credential selection and state bucket creation
//! - Terraform init/plan/apply/output/state/fmt tasks
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stratus_iac::{ConfigLoader, TerraformTasks};
//! use stratus_runner::{ProcessRunner, ProcessRunnerOptions};
//!
//! # async fn run() -> stratus_iac::IacResult<()> {
//! // Validates and writes infra/dev/dev.tfvars as a side effect.
//! let config = ConfigLoader::load(None)?;
//!
//! let runner = Arc::new(ProcessRunner::new(ProcessRunnerOptions::default()));
//! let tasks = TerraformTasks::new(runner, config);
//! tasks.plan("dev").await?;
//! # Ok(())
//! # }
//! ```

pub mod cloud;
pub mod declarations;
pub mod error;
mod exec;
pub mod loader;
pub mod model;
pub mod provider;
pub mod terraform;
pub mod tfvars;
pub mod validator;

pub use cloud::CloudTasks;
pub use declarations::{Declarations, DECLARATIONS_FILE};
pub use error::{IacError, IacResult};
pub use loader::{ConfigLoader, DESCRIPTOR_FILE};
pub use model::{BucketDescriptor, Config, EnvironmentDescriptor, VariableSet, VariableValue};
pub use provider::HostingProvider;
pub use terraform::{TerraformTasks, STATE_PREFIX};
pub use tfvars::{TfvarsGenerator, TFVARS_EXTENSION};
pub use validator::TfvarsValidator;
