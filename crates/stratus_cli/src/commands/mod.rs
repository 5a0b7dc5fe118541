//! CLI command definitions.
//!
//! Every subcommand works on one environment declared in `infra.yaml`,
//! except `generate` and `fmt` which act on the whole project.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use stratus_iac::{Config, ConfigLoader};
use stratus_runner::{CommandRunner, ProcessRunner, ProcessRunnerOptions};

pub mod bucket_name;
pub mod cloud;
pub mod generate;
pub mod terraform;

/// stratus - Terraform environment tooling driven by infra.yaml
#[derive(Parser)]
#[command(name = "stratus")]
#[command(version, about = "stratus - Terraform environment tooling driven by infra.yaml")]
#[command(long_about = r#"
stratus reads infra.yaml at the project root, validates the tfvars declared
for every environment against that environment's variables.tf, writes
<env>.tfvars files and drives terraform and the cloud CLIs per environment.

WORKFLOWS:
  generate               → Validate and write every <env>.tfvars
  bucket-name            → Print the backend bucket of an environment
  set-cloud-provider     → Select the AWS profile or GCP project of an env
  create-backend-bucket  → Create the bucket holding Terraform state
  init / plan / apply    → Run terraform in the environment's infra_dir
  output / state-rm / state-list / fmt

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or missing files
  3 - Validation failure
  5 - IaC error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Project root containing infra.yaml (discovered upwards by default)
    #[arg(long, global = true, env = "STRATUS_ROOT")]
    pub root: Option<PathBuf>,

    /// Log commands instead of running them
    #[arg(long, global = true, env = "STRATUS_DRY_RUN")]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and write the tfvars of every environment
    Generate,

    /// Print the backend bucket name of an environment
    #[command(name = "bucket-name")]
    BucketName(EnvArgs),

    /// Point the cloud CLI at the environment's profile or project
    #[command(name = "set-cloud-provider")]
    SetCloudProvider(EnvArgs),

    /// Create the backend bucket for Terraform state
    #[command(name = "create-backend-bucket")]
    CreateBackendBucket(EnvArgs),

    /// Run terraform init against the backend bucket
    Init(EnvArgs),

    /// Run terraform plan with the generated tfvars
    Plan(EnvArgs),

    /// Run terraform apply with the generated tfvars
    Apply(terraform::ApplyArgs),

    /// Print one terraform output value
    Output(terraform::OutputArgs),

    /// Remove a resource from Terraform state
    #[command(name = "state-rm")]
    StateRm(terraform::StateRmArgs),

    /// List resources in Terraform state
    #[command(name = "state-list")]
    StateList(EnvArgs),

    /// Format every Terraform file under the project root
    Fmt,
}

/// Arguments shared by per-environment commands.
#[derive(Args, Debug, Clone)]
pub struct EnvArgs {
    /// Environment name as declared under `envs` (case-insensitive)
    #[arg(short, long, env = "STRATUS_ENV")]
    pub env: String,
}

/// Global options resolved once and handed to every command.
pub struct Context {
    pub root: Option<PathBuf>,
    pub dry_run: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            root: cli.root.clone(),
            dry_run: cli.dry_run,
        }
    }

    /// Load `infra.yaml`, which also regenerates every tfvars file.
    pub fn load_config(&self) -> Result<Config> {
        ConfigLoader::load(self.root.as_deref()).context("Failed to load infra config")
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        Arc::new(ProcessRunner::new(
            ProcessRunnerOptions::default().dry_run(self.dry_run),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_env_command() {
        let cli = Cli::try_parse_from(["stratus", "plan", "--env", "dev"]).unwrap();
        match cli.command {
            Commands::Plan(args) => assert_eq!(args.env, "dev"),
            _ => panic!("expected plan"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stratus", "apply", "-e", "prod", "--auto-approve", "--dry-run", "--root", "/tmp/x",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::Apply(args) => {
                assert_eq!(args.env.env, "prod");
                assert!(args.auto_approve);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_output_requires_name() {
        assert!(Cli::try_parse_from(["stratus", "output", "--env", "dev"]).is_err());
    }

    const INFRA_YAML: &str = r#"
envs:
  dev: {hosted_on: GCP, gcp_project_id: proj, infra_dir: infra/dev}
backend_buckets:
  dev: {hosted_on: GCP, bucket_name: dev-bucket}
tfvars:
  dev: {region: us-central1}
"#;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let infra_dev = dir.path().join("infra").join("dev");
        std::fs::create_dir_all(&infra_dev).unwrap();
        std::fs::write(infra_dev.join("variables.tf"), "variable \"region\" {}\n").unwrap();
        std::fs::write(dir.path().join("infra.yaml"), INFRA_YAML).unwrap();
        dir
    }

    #[test]
    fn test_root_flag_reaches_config_loader() {
        let dir = project();
        let root = dir.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["stratus", "--root", &root, "bucket-name", "--env", "DEV"])
            .unwrap();

        let config = Context::from_cli(&cli).load_config().unwrap();

        assert_eq!(config.root, dir.path().canonicalize().unwrap());
        assert_eq!(config.get_backend_bucket("DEV").unwrap().bucket_name, "dev-bucket");
    }

    #[test]
    fn test_generate_writes_tfvars_under_root() {
        let dir = project();
        let ctx = Context {
            root: Some(dir.path().to_path_buf()),
            dry_run: false,
        };

        generate::execute(&ctx).unwrap();

        let written = std::fs::read_to_string(dir.path().join("infra/dev/dev.tfvars")).unwrap();
        assert_eq!(written, "region = \"us-central1\"\n");
    }

    #[test]
    fn test_missing_descriptor_keeps_library_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context {
            root: Some(dir.path().to_path_buf()),
            dry_run: false,
        };

        let err = ctx.load_config().unwrap_err();

        let iac = err.chain().find_map(|cause| cause.downcast_ref::<stratus_iac::IacError>());
        assert!(iac.is_some_and(|e| e.is_not_found()));
        assert!(format!("{:#}", err).contains("Failed to load infra config"));
    }
}
