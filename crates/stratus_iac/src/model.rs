//! Configuration model loaded from `infra.yaml`.
//!
//! Environments, backend buckets and tfvars sets are correlated by
//! environment name only. They are kept as independent flat lists; the
//! loader enforces name equality between `tfvars` and `envs` and nothing
//! else.

use std::path::{Path, PathBuf};

use crate::error::{IacError, IacResult};
use crate::loader::DESCRIPTOR_FILE;
use crate::provider::HostingProvider;
use crate::tfvars::tfvars_path;

/// One deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    /// Environment name, the case-insensitive lookup key
    pub env: String,
    /// Raw `hosted_on` tag, resolved lazily by [`Self::provider`]
    pub hosted_on: String,
    pub aws_profile: Option<String>,
    pub gcp_project_id: Option<String>,
    /// Terraform working directory, relative to the project root
    pub infra_dir: PathBuf,
}

impl EnvironmentDescriptor {
    /// Resolve the hosting provider tag.
    pub fn provider(&self) -> IacResult<HostingProvider> {
        self.hosted_on.parse()
    }

    /// The identifier matching `provider`, if configured.
    pub fn identifier(&self, provider: HostingProvider) -> Option<&str> {
        match provider {
            HostingProvider::Aws => self.aws_profile.as_deref(),
            HostingProvider::Gcp => self.gcp_project_id.as_deref(),
        }
    }
}

/// Remote storage location for Terraform state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketDescriptor {
    pub env: String,
    pub hosted_on: String,
    pub bucket_name: String,
    pub region: Option<String>,
}

impl BucketDescriptor {
    pub fn provider(&self) -> IacResult<HostingProvider> {
        self.hosted_on.parse()
    }
}

/// A single tfvars value.
///
/// Scalars are stored in their canonical text form: strings verbatim,
/// numbers as written, booleans as `True`/`False` and null as `None`. An
/// empty value in `infra.yaml` therefore renders as `"None"`, not `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    Scalar(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Scalar(value.to_string())
    }
}

/// Variables for one environment, in descriptor order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSet {
    pub env: String,
    pub variables: Vec<(String, VariableValue)>,
}

impl VariableSet {
    pub fn new(env: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            variables: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.variables
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Fully loaded infra configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub envs: Vec<EnvironmentDescriptor>,
    pub backend_buckets: Vec<BucketDescriptor>,
    pub tfvars: Vec<VariableSet>,
    /// Directory containing `infra.yaml`
    pub root: PathBuf,
}

impl Config {
    pub fn get_env(&self, env: &str) -> IacResult<&EnvironmentDescriptor> {
        find_by_env(&self.envs, env, "env", |e| &e.env)
    }

    pub fn get_backend_bucket(&self, env: &str) -> IacResult<&BucketDescriptor> {
        find_by_env(&self.backend_buckets, env, "backend bucket", |b| &b.env)
    }

    pub fn get_tfvars(&self, env: &str) -> IacResult<&VariableSet> {
        find_by_env(&self.tfvars, env, "tfvars", |t| &t.env)
    }

    /// Absolute Terraform working directory of an environment.
    pub fn environment_dir(&self, env: &str) -> IacResult<PathBuf> {
        Ok(self.root.join(&self.get_env(env)?.infra_dir))
    }

    /// Path of the generated tfvars file of an environment.
    pub fn tfvars_file(&self, env: &str) -> IacResult<PathBuf> {
        let descriptor = self.get_env(env)?;
        Ok(tfvars_path(&self.root.join(&descriptor.infra_dir), &descriptor.env))
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.root.join(DESCRIPTOR_FILE)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn find_by_env<'a, T>(
    items: &'a [T],
    requested: &str,
    kind: &'static str,
    key: impl Fn(&T) -> &String,
) -> IacResult<&'a T> {
    let wanted = requested.to_lowercase();
    items
        .iter()
        .find(|item| key(item).to_lowercase() == wanted)
        .ok_or_else(|| IacError::UnknownKey {
            kind,
            requested: requested.to_string(),
            available: items.iter().map(|item| key(item).clone()).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            envs: vec![
                EnvironmentDescriptor {
                    env: "dev".to_string(),
                    hosted_on: "GCP".to_string(),
                    aws_profile: None,
                    gcp_project_id: Some("my-proj".to_string()),
                    infra_dir: PathBuf::from("infra/dev"),
                },
                EnvironmentDescriptor {
                    env: "prod".to_string(),
                    hosted_on: "AWS".to_string(),
                    aws_profile: Some("my-profile".to_string()),
                    gcp_project_id: None,
                    infra_dir: PathBuf::from("infra/prod"),
                },
            ],
            backend_buckets: vec![
                BucketDescriptor {
                    env: "dev".to_string(),
                    hosted_on: "GCP".to_string(),
                    bucket_name: "dev-bucket".to_string(),
                    region: None,
                },
                BucketDescriptor {
                    env: "prod".to_string(),
                    hosted_on: "AWS".to_string(),
                    bucket_name: "prod-bucket".to_string(),
                    region: Some("us-east-1".to_string()),
                },
            ],
            tfvars: vec![VariableSet::new("dev").with("region", "us-central1")],
            root: PathBuf::from("/fake/root"),
        }
    }

    #[test]
    fn test_get_env_exact_match() {
        assert_eq!(config().get_env("dev").unwrap().env, "dev");
    }

    #[test]
    fn test_lookups_ignore_case() {
        let config = config();
        for name in ["dev", "DEV", "Dev"] {
            assert_eq!(config.get_env(name).unwrap().env, "dev");
            assert_eq!(config.get_backend_bucket(name).unwrap().bucket_name, "dev-bucket");
            assert_eq!(config.get_tfvars(name).unwrap().env, "dev");
        }
        assert_eq!(config.get_env("Prod").unwrap().env, "prod");
    }

    #[test]
    fn test_get_env_unknown_lists_available() {
        let err = config().get_env("staging").unwrap_err();
        assert!(matches!(
            &err,
            IacError::UnknownKey { requested, available, .. }
                if requested == "staging" && available == &["dev", "prod"]
        ));
        assert!(err.to_string().contains("No env configured for 'staging'"));
    }

    #[test]
    fn test_get_backend_bucket_unknown() {
        let err = config().get_backend_bucket("staging").unwrap_err();
        assert!(err.to_string().contains("No backend bucket configured for 'staging'"));
    }

    #[test]
    fn test_get_tfvars() {
        let config = config();
        assert_eq!(
            config.get_tfvars("dev").unwrap().get("region"),
            Some(&VariableValue::Scalar("us-central1".to_string()))
        );
        let err = config.get_tfvars("prod").unwrap_err();
        assert!(err.to_string().contains("No tfvars configured for 'prod'. Available: [dev]"));
    }

    #[test]
    fn test_environment_dir_joins_root() {
        assert_eq!(
            config().environment_dir("PROD").unwrap(),
            PathBuf::from("/fake/root/infra/prod")
        );
        assert_eq!(config().descriptor_path(), PathBuf::from("/fake/root/infra.yaml"));
        assert_eq!(
            config().tfvars_file("DEV").unwrap(),
            PathBuf::from("/fake/root/infra/dev/dev.tfvars")
        );
    }

    #[test]
    fn test_identifier_matches_provider() {
        let config = config();
        let dev = config.get_env("dev").unwrap();
        assert_eq!(dev.provider().unwrap(), HostingProvider::Gcp);
        assert_eq!(dev.identifier(HostingProvider::Gcp), Some("my-proj"));
        assert_eq!(dev.identifier(HostingProvider::Aws), None);
    }
}
