//! Cloud provider CLI tasks: selecting credentials and creating state buckets.

use std::sync::Arc;

use stratus_runner::{CommandConfig, CommandRunner, RunConfig};
use tracing::info;

use crate::error::{IacError, IacResult};
use crate::exec::run_checked;
use crate::model::{BucketDescriptor, EnvironmentDescriptor};
use crate::provider::HostingProvider;

/// Runs `aws`/`gcloud`/`gsutil` commands for an environment.
pub struct CloudTasks {
    runner: Arc<dyn CommandRunner>,
}

impl CloudTasks {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Commands that point the provider CLI at the environment's account.
    pub fn configure_commands(env: &EnvironmentDescriptor) -> IacResult<Vec<CommandConfig>> {
        let provider = env.provider()?;
        let identifier = require_identifier(env, provider, "configure cloud provider")?;

        Ok(match provider {
            HostingProvider::Aws => vec![aws_identity(identifier)],
            HostingProvider::Gcp => vec![gcloud_set_project(identifier)],
        })
    }

    /// Commands that create the Terraform state bucket.
    ///
    /// The bucket's own `hosted_on` decides the provider; the identifier comes
    /// from the environment.
    pub fn create_bucket_commands(
        env: &EnvironmentDescriptor,
        bucket: &BucketDescriptor,
    ) -> IacResult<Vec<CommandConfig>> {
        let provider = bucket.provider()?;
        let identifier = require_identifier(env, provider, "create backend bucket")?;

        Ok(match provider {
            HostingProvider::Aws => {
                let mut create = CommandConfig::new("aws").args([
                    "s3api",
                    "create-bucket",
                    "--bucket",
                    bucket.bucket_name.as_str(),
                    "--profile",
                    identifier,
                ]);
                if let Some(region) = bucket
                    .region
                    .as_deref()
                    .filter(|r| *r != HostingProvider::Aws.default_region())
                {
                    create = create
                        .arg("--create-bucket-configuration")
                        .arg(format!("LocationConstraint={}", region))
                        .args(["--region", region]);
                }
                vec![create]
            }
            HostingProvider::Gcp => vec![
                gcloud_set_project(identifier),
                CommandConfig::new("gsutil")
                    .args(["mb", "-p", identifier])
                    .arg(format!("gs://{}", bucket.bucket_name)),
            ],
        })
    }

    /// Select the environment's AWS profile or GCP project.
    pub async fn configure_cloud_provider(&self, env: &EnvironmentDescriptor) -> IacResult<()> {
        info!("Configuring {} for env '{}'", env.hosted_on, env.env);
        self.run_all(Self::configure_commands(env)?).await
    }

    /// Create the backend bucket holding Terraform state.
    pub async fn create_backend_bucket(
        &self,
        env: &EnvironmentDescriptor,
        bucket: &BucketDescriptor,
    ) -> IacResult<()> {
        info!(
            "Creating {} backend bucket '{}' for env '{}'",
            bucket.hosted_on, bucket.bucket_name, env.env
        );
        self.run_all(Self::create_bucket_commands(env, bucket)?).await
    }

    async fn run_all(&self, commands: Vec<CommandConfig>) -> IacResult<()> {
        for command in &commands {
            if !self.runner.is_available(&command.program).await? {
                return Err(IacError::ToolNotAvailable(command.program.clone()));
            }
        }
        for command in &commands {
            run_checked(self.runner.as_ref(), command, &RunConfig::default()).await?;
        }
        Ok(())
    }
}

fn require_identifier<'a>(
    env: &'a EnvironmentDescriptor,
    provider: HostingProvider,
    action: &'static str,
) -> IacResult<&'a str> {
    env.identifier(provider)
        .ok_or_else(|| IacError::MissingProviderIdentifier {
            action,
            identifier: provider.identifier_field(),
            env: env.env.clone(),
        })
}

fn aws_identity(profile: &str) -> CommandConfig {
    CommandConfig::new("aws")
        .args(["sts", "get-caller-identity", "--profile", profile])
        .env("AWS_PROFILE", profile)
}

fn gcloud_set_project(project_id: &str) -> CommandConfig {
    CommandConfig::new("gcloud").args(["config", "set", "project", project_id])
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use stratus_runner::{MockResponse, MockRunner};

    use super::*;

    fn env(hosted_on: &str, aws_profile: Option<&str>, gcp_project_id: Option<&str>) -> EnvironmentDescriptor {
        EnvironmentDescriptor {
            env: "dev".to_string(),
            hosted_on: hosted_on.to_string(),
            aws_profile: aws_profile.map(str::to_string),
            gcp_project_id: gcp_project_id.map(str::to_string),
            infra_dir: PathBuf::from("infra/dev"),
        }
    }

    fn bucket(hosted_on: &str, region: Option<&str>) -> BucketDescriptor {
        BucketDescriptor {
            env: "dev".to_string(),
            hosted_on: hosted_on.to_string(),
            bucket_name: "my-bucket".to_string(),
            region: region.map(str::to_string),
        }
    }

    fn lines(commands: &[CommandConfig]) -> Vec<String> {
        commands.iter().map(CommandConfig::command_line).collect()
    }

    #[test]
    fn test_gcp_configure_sets_project() {
        let commands = CloudTasks::configure_commands(&env("GCP", None, Some("my-project"))).unwrap();
        assert_eq!(lines(&commands), vec!["gcloud config set project my-project"]);
    }

    #[test]
    fn test_aws_configure_checks_identity_with_profile() {
        let commands = CloudTasks::configure_commands(&env("aws", Some("my-profile"), None)).unwrap();
        assert_eq!(
            lines(&commands),
            vec!["AWS_PROFILE=my-profile aws sts get-caller-identity --profile my-profile"]
        );
    }

    #[test]
    fn test_configure_without_identifier() {
        let err = CloudTasks::configure_commands(&env("AWS", None, Some("p"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot configure cloud provider: no aws_profile configured for env 'dev'"
        );

        let err = CloudTasks::configure_commands(&env("GCP", Some("p"), None)).unwrap_err();
        assert!(err.to_string().contains("no gcp_project_id configured"));
    }

    #[test]
    fn test_configure_unsupported_provider() {
        let err = CloudTasks::configure_commands(&env("AZURE", None, None)).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported hosted_on: 'AZURE'");
    }

    #[test]
    fn test_aws_bucket_default_region_has_no_location_constraint() {
        let aws = env("AWS", Some("my-profile"), None);
        for region in [None, Some("us-east-1")] {
            let commands = CloudTasks::create_bucket_commands(&aws, &bucket("AWS", region)).unwrap();
            assert_eq!(
                lines(&commands),
                vec!["aws s3api create-bucket --bucket my-bucket --profile my-profile"]
            );
        }
    }

    #[test]
    fn test_aws_bucket_other_region() {
        let aws = env("AWS", Some("my-profile"), None);
        let commands = CloudTasks::create_bucket_commands(&aws, &bucket("aws", Some("eu-west-1"))).unwrap();
        let line = &lines(&commands)[0];
        assert!(line.contains("LocationConstraint=eu-west-1"));
        assert!(line.contains("--region eu-west-1"));
    }

    #[test]
    fn test_gcp_bucket_sets_project_then_creates() {
        let gcp = env("GCP", None, Some("my-project"));
        let commands = CloudTasks::create_bucket_commands(&gcp, &bucket("gcp", None)).unwrap();
        assert_eq!(
            lines(&commands),
            vec![
                "gcloud config set project my-project",
                "gsutil mb -p my-project gs://my-bucket",
            ]
        );
    }

    #[test]
    fn test_bucket_without_identifier() {
        let gcp = env("GCP", None, None);
        let err = CloudTasks::create_bucket_commands(&gcp, &bucket("GCP", None)).unwrap_err();
        assert!(err.to_string().contains("Cannot create backend bucket: no gcp_project_id configured"));
    }

    #[tokio::test]
    async fn test_create_backend_bucket_runs_commands() {
        let runner = MockRunner::new();
        let tasks = CloudTasks::new(Arc::new(runner.clone()));

        tasks
            .create_backend_bucket(&env("GCP", None, Some("my-project")), &bucket("GCP", None))
            .await
            .unwrap();

        assert_eq!(runner.call_count(), 2);
        assert!(runner.command_lines()[1].contains("gs://my-bucket"));
    }

    #[tokio::test]
    async fn test_failed_command_stops_sequence() {
        let runner = MockRunner::new().add_response(MockResponse::failure(1, "permission denied"));
        let tasks = CloudTasks::new(Arc::new(runner.clone()));

        let err = tasks
            .create_backend_bucket(&env("GCP", None, Some("my-project")), &bucket("GCP", None))
            .await
            .unwrap_err();

        assert!(matches!(err, IacError::CommandFailed { exit_code: 1, .. }));
        assert!(err.to_string().contains("permission denied"));
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_cli_is_reported_before_running() {
        let runner = MockRunner::new().set_unavailable("gsutil");
        let tasks = CloudTasks::new(Arc::new(runner.clone()));

        let err = tasks
            .create_backend_bucket(&env("GCP", None, Some("my-project")), &bucket("GCP", None))
            .await
            .unwrap_err();

        assert!(matches!(err, IacError::ToolNotAvailable(ref tool) if tool == "gsutil"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_configure_cloud_provider_runs_command() {
        let runner = MockRunner::new();
        let tasks = CloudTasks::new(Arc::new(runner.clone()));
        tasks
            .configure_cloud_provider(&env("gcp", None, Some("my-project")))
            .await
            .unwrap();
        assert_eq!(runner.command_lines(), vec!["gcloud config set project my-project"]);
    }
}
