//! Terraform tasks bound to a loaded [`Config`].

use std::sync::Arc;

use stratus_runner::{CommandConfig, CommandRunner, ExecutionResult, RunConfig};
use tracing::info;

use crate::error::{IacError, IacResult};
use crate::exec::run_checked;
use crate::model::Config;
use crate::provider::HostingProvider;
use crate::tfvars::TFVARS_EXTENSION;

/// Key prefix under which Terraform state is stored in the backend bucket.
pub const STATE_PREFIX: &str = "terraform/state";

const TERRAFORM: &str = "terraform";

/// Runs terraform for the environments of a [`Config`].
pub struct TerraformTasks {
    runner: Arc<dyn CommandRunner>,
    config: Config,
}

impl TerraformTasks {
    pub fn new(runner: Arc<dyn CommandRunner>, config: Config) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `terraform` in the environment's directory, with its AWS profile exported.
    fn base_command(&self, env: &str) -> IacResult<CommandConfig> {
        let descriptor = self.config.get_env(env)?;
        let mut command = CommandConfig::new(TERRAFORM).workdir(self.config.environment_dir(env)?);
        if descriptor.provider()? == HostingProvider::Aws {
            if let Some(profile) = &descriptor.aws_profile {
                command = command.env("AWS_PROFILE", profile);
            }
        }
        Ok(command)
    }

    fn var_file_arg(&self, env: &str) -> IacResult<String> {
        let descriptor = self.config.get_env(env)?;
        Ok(format!(
            "-var-file=./{}.{}",
            descriptor.env.to_lowercase(),
            TFVARS_EXTENSION
        ))
    }

    pub fn init_command(&self, env: &str) -> IacResult<CommandConfig> {
        let bucket = self.config.get_backend_bucket(env)?;
        let mut command = self
            .base_command(env)?
            .args(["init", "-upgrade"])
            .arg(format!("-backend-config=bucket={}", bucket.bucket_name));

        command = match bucket.provider()? {
            HostingProvider::Gcp => command.arg(format!("-backend-config=prefix={}", STATE_PREFIX)),
            HostingProvider::Aws => {
                let command = command.arg(format!(
                    "-backend-config=key={}/terraform.tfstate",
                    STATE_PREFIX
                ));
                match &bucket.region {
                    Some(region) => command.arg(format!("-backend-config=region={}", region)),
                    None => command,
                }
            }
        };
        Ok(command)
    }

    pub fn plan_command(&self, env: &str) -> IacResult<CommandConfig> {
        Ok(self.base_command(env)?.arg("plan").arg(self.var_file_arg(env)?))
    }

    pub fn apply_command(&self, env: &str, auto_approve: bool) -> IacResult<CommandConfig> {
        let mut command = self.base_command(env)?.arg("apply");
        if auto_approve {
            command = command.arg("-auto-approve");
        }
        Ok(command.arg(self.var_file_arg(env)?))
    }

    pub fn output_command(&self, env: &str, output: &str) -> IacResult<CommandConfig> {
        Ok(self.base_command(env)?.args(["output", "-raw", output]))
    }

    pub fn state_rm_command(&self, env: &str, resource: &str) -> IacResult<CommandConfig> {
        Ok(self.base_command(env)?.args(["state", "rm", resource]))
    }

    pub fn state_list_command(&self, env: &str) -> IacResult<CommandConfig> {
        Ok(self.base_command(env)?.args(["state", "list"]))
    }

    pub fn fmt_command(&self) -> CommandConfig {
        CommandConfig::new(TERRAFORM)
            .workdir(self.config.root())
            .args(["fmt", "-recursive"])
    }

    /// Run terraform init against the environment's backend bucket.
    ///
    /// Fails when the bucket does not exist yet; create it first with
    /// [`crate::CloudTasks::create_backend_bucket`].
    pub async fn init(&self, env: &str) -> IacResult<ExecutionResult> {
        info!("Running terraform init for env '{}'", env);
        self.run(&self.init_command(env)?, &RunConfig::default()).await
    }

    /// Run terraform plan with the environment's tfvars.
    pub async fn plan(&self, env: &str) -> IacResult<ExecutionResult> {
        self.init(env).await?;
        info!("Running terraform plan for env '{}'", env);
        self.run(&self.plan_command(env)?, &RunConfig::default()).await
    }

    /// Run terraform apply with the environment's tfvars.
    pub async fn apply(&self, env: &str, auto_approve: bool) -> IacResult<ExecutionResult> {
        self.init(env).await?;
        info!("Running terraform apply for env '{}' (auto-approve: {})", env, auto_approve);
        self.run(&self.apply_command(env, auto_approve)?, &RunConfig::default())
            .await
    }

    /// Fetch a single raw output value.
    pub async fn output(&self, env: &str, output: &str) -> IacResult<String> {
        self.init(env).await?;
        info!("Reading terraform output '{}' for env '{}'", output, env);
        let result = self
            .run(&self.output_command(env, output)?, &RunConfig::default().quiet())
            .await?;
        Ok(result.stdout)
    }

    /// Remove a resource from the environment's state.
    pub async fn state_rm(&self, env: &str, resource: &str) -> IacResult<ExecutionResult> {
        self.init(env).await?;
        info!("Removing '{}' from terraform state of env '{}'", resource, env);
        self.run(&self.state_rm_command(env, resource)?, &RunConfig::default())
            .await
    }

    /// List resources in the environment's state.
    pub async fn state_list(&self, env: &str) -> IacResult<ExecutionResult> {
        self.init(env).await?;
        info!("Listing terraform state of env '{}'", env);
        self.run(&self.state_list_command(env)?, &RunConfig::default()).await
    }

    /// Format every Terraform file below the project root.
    pub async fn fmt(&self) -> IacResult<ExecutionResult> {
        info!("Running terraform fmt in {:?}", self.config.root());
        self.run(&self.fmt_command(), &RunConfig::default()).await
    }

    async fn run(&self, command: &CommandConfig, run_config: &RunConfig) -> IacResult<ExecutionResult> {
        if !self.runner.is_available(TERRAFORM).await? {
            return Err(IacError::ToolNotAvailable(TERRAFORM.to_string()));
        }
        run_checked(self.runner.as_ref(), command, run_config).await
    }
}
