//! `infra.yaml` discovery, parsing and projection into [`Config`].
//!
//! The descriptor is first parsed into a generic YAML tree. Each field the
//! model needs is then projected out of that tree with an explicit type
//! check, so malformed input surfaces as `MissingSection`, `MissingField` or
//! `TypeMismatch` naming the offending location.
//!
//! Loading is not read-only: when a `tfvars` section is present every set is
//! validated against its environment's `variables.tf` and rendered to
//! `<infra_dir>/<env>.tfvars`.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{IacError, IacResult};
use crate::model::{BucketDescriptor, Config, EnvironmentDescriptor, VariableSet, VariableValue};
use crate::tfvars::TfvarsGenerator;
use crate::validator::TfvarsValidator;

/// Name of the descriptor file marking a project root.
pub const DESCRIPTOR_FILE: &str = "infra.yaml";

const ENVS: &str = "envs";
const BACKEND_BUCKETS: &str = "backend_buckets";
const TFVARS: &str = "tfvars";

/// Loader for `infra.yaml`.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the configuration rooted at `root`, or discovered from the
    /// current directory upwards when `root` is `None`.
    pub fn load(root: Option<&Path>) -> IacResult<Config> {
        let root = match root {
            Some(root) => absolute(root)?,
            None => Self::discover_root(&std::env::current_dir()?)?,
        };
        Self::load_from(root)
    }

    /// Find the closest directory from `start` upwards containing `infra.yaml`.
    pub fn discover_root(start: &Path) -> IacResult<PathBuf> {
        let start = absolute(start)?;
        start
            .ancestors()
            .find(|dir| dir.join(DESCRIPTOR_FILE).is_file())
            .map(Path::to_path_buf)
            .ok_or_else(|| IacError::DescriptorNotFound {
                file: DESCRIPTOR_FILE.to_string(),
                start: start.clone(),
            })
    }

    /// Parse `root/infra.yaml` into a generic YAML tree.
    pub fn read_descriptor(root: &Path) -> IacResult<Value> {
        let path = root.join(DESCRIPTOR_FILE);
        if !path.is_file() {
            return Err(IacError::NotFound {
                what: DESCRIPTOR_FILE.to_string(),
                path,
            });
        }

        let content = fs::read_to_string(&path)?;
        serde_yaml::from_str(&content).map_err(|source| IacError::Yaml { path, source })
    }

    fn load_from(root: PathBuf) -> IacResult<Config> {
        let path = root.join(DESCRIPTOR_FILE);
        info!("Loading infra config from {:?}", path);

        let raw = Self::read_descriptor(&root)?;
        let projector = Projector { path: &path };

        if !matches!(raw, Value::Mapping(_)) {
            return Err(projector.mismatch("<document>".to_string(), "mapping", &raw));
        }
        let envs_node = projector.section(&raw, ENVS)?;
        let buckets_node = projector.section(&raw, BACKEND_BUCKETS)?;

        let envs = projector.envs(envs_node)?;
        let backend_buckets = projector.buckets(buckets_node)?;
        let tfvars = match raw.get(TFVARS) {
            Some(node) => projector.tfvars(node, &envs)?,
            None => Vec::new(),
        };

        debug!(
            "Loaded {} envs, {} backend buckets, {} tfvars sets",
            envs.len(),
            backend_buckets.len(),
            tfvars.len()
        );

        let config = Config {
            envs,
            backend_buckets,
            tfvars,
            root,
        };
        Self::write_tfvars(&config)?;
        Ok(config)
    }

    /// Validate every tfvars set, then render them all.
    ///
    /// Nothing is written unless all sets validate.
    fn write_tfvars(config: &Config) -> IacResult<Vec<PathBuf>> {
        let mut targets = Vec::with_capacity(config.tfvars.len());
        for tfvars in &config.tfvars {
            let dir = config.environment_dir(&tfvars.env)?;
            TfvarsValidator::validate(&dir, tfvars)?;
            targets.push((dir, tfvars));
        }

        targets
            .into_iter()
            .map(|(dir, tfvars)| TfvarsGenerator::generate(&dir, tfvars))
            .collect()
    }
}

/// Absolute form of `path`.
///
/// Existing paths are canonicalized; for missing ones `.` and `..` are
/// folded lexically so error messages never show `/cwd/../x`.
fn absolute(path: &Path) -> IacResult<PathBuf> {
    if let Ok(resolved) = fs::canonicalize(path) {
        return Ok(resolved);
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// Canonical text of a YAML scalar.
///
/// Booleans become `True`/`False` and null becomes `None`; these are the
/// forms written into generated tfvars.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("None".to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Typed projection out of the descriptor tree, remembering the file for errors.
struct Projector<'a> {
    path: &'a Path,
}

impl Projector<'_> {
    fn mismatch(&self, location: String, expected: &'static str, found: &Value) -> IacError {
        IacError::TypeMismatch {
            location,
            expected,
            found: kind_of(found),
            path: self.path.to_path_buf(),
        }
    }

    fn section<'v>(&self, root: &'v Value, section: &str) -> IacResult<&'v Value> {
        root.get(section).ok_or_else(|| IacError::MissingSection {
            section: section.to_string(),
            path: self.path.to_path_buf(),
        })
    }

    /// String-keyed entries of a mapping node; null counts as empty.
    fn entries<'v>(&self, node: &'v Value, location: &str) -> IacResult<Vec<(String, &'v Value)>> {
        match node {
            Value::Null => Ok(Vec::new()),
            Value::Mapping(mapping) => mapping
                .iter()
                .map(|(key, value)| -> IacResult<(String, &'v Value)> {
                    Ok((self.text(key, &format!("{} key", location))?, value))
                })
                .collect(),
            other => Err(self.mismatch(location.to_string(), "mapping", other)),
        }
    }

    /// Entries of a per-environment section, rejecting names that only
    /// differ in letter case.
    fn env_entries<'v>(&self, node: &'v Value, section: &str) -> IacResult<Vec<(String, &'v Value)>> {
        let entries = self.entries(node, section)?;
        let mut seen: HashMap<String, &str> = HashMap::new();
        for (name, _) in &entries {
            if let Some(existing) = seen.insert(name.to_lowercase(), name) {
                return Err(IacError::DuplicateEnv {
                    section: section.to_string(),
                    name: name.clone(),
                    existing: existing.to_string(),
                    path: self.path.to_path_buf(),
                });
            }
        }
        Ok(entries)
    }

    fn text(&self, value: &Value, location: &str) -> IacResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(self.mismatch(location.to_string(), "string", other)),
        }
    }

    fn entry<'v>(&self, node: &'v Value, location: &str) -> IacResult<&'v Value> {
        match node {
            Value::Null | Value::Mapping(_) => Ok(node),
            other => Err(self.mismatch(location.to_string(), "mapping", other)),
        }
    }

    fn required(&self, section: &str, env: &str, entry: &Value, field: &str) -> IacResult<String> {
        match entry.get(field) {
            None | Some(Value::Null) => Err(IacError::MissingField {
                section: section.to_string(),
                entry: env.to_string(),
                field: field.to_string(),
                path: self.path.to_path_buf(),
            }),
            Some(value) => self.text(value, &format!("{}.{}.{}", section, env, field)),
        }
    }

    fn optional(&self, section: &str, env: &str, entry: &Value, field: &str) -> IacResult<Option<String>> {
        match entry.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.text(value, &format!("{}.{}.{}", section, env, field)).map(Some),
        }
    }

    fn envs(&self, node: &Value) -> IacResult<Vec<EnvironmentDescriptor>> {
        self.env_entries(node, ENVS)?
            .into_iter()
            .map(|(env, entry)| -> IacResult<EnvironmentDescriptor> {
                let entry = self.entry(entry, &format!("{}.{}", ENVS, env))?;
                let hosted_on = self.required(ENVS, &env, entry, "hosted_on")?;
                let infra_dir = self.required(ENVS, &env, entry, "infra_dir")?;
                Ok(EnvironmentDescriptor {
                    aws_profile: self.optional(ENVS, &env, entry, "aws_profile")?,
                    gcp_project_id: self.optional(ENVS, &env, entry, "gcp_project_id")?,
                    hosted_on,
                    infra_dir: PathBuf::from(infra_dir),
                    env,
                })
            })
            .collect()
    }

    fn buckets(&self, node: &Value) -> IacResult<Vec<BucketDescriptor>> {
        self.env_entries(node, BACKEND_BUCKETS)?
            .into_iter()
            .map(|(env, entry)| -> IacResult<BucketDescriptor> {
                let entry = self.entry(entry, &format!("{}.{}", BACKEND_BUCKETS, env))?;
                let hosted_on = self.required(BACKEND_BUCKETS, &env, entry, "hosted_on")?;
                let bucket_name = self.required(BACKEND_BUCKETS, &env, entry, "bucket_name")?;
                Ok(BucketDescriptor {
                    region: self.optional(BACKEND_BUCKETS, &env, entry, "region")?,
                    hosted_on,
                    bucket_name,
                    env,
                })
            })
            .collect()
    }

    fn tfvars(&self, node: &Value, envs: &[EnvironmentDescriptor]) -> IacResult<Vec<VariableSet>> {
        let entries = self.env_entries(node, TFVARS)?;

        let tfvars_keys: BTreeSet<String> = entries.iter().map(|(env, _)| env.clone()).collect();
        let env_keys: BTreeSet<String> = envs.iter().map(|e| e.env.clone()).collect();
        if tfvars_keys != env_keys {
            return Err(IacError::SchemaMismatch {
                tfvars: tfvars_keys,
                envs: env_keys,
                path: self.path.to_path_buf(),
            });
        }

        entries
            .into_iter()
            .map(|(env, vars)| -> IacResult<VariableSet> {
                let location = format!("{}.{}", TFVARS, env);
                let variables = self
                    .entries(vars, &location)?
                    .into_iter()
                    .map(|(name, value)| -> IacResult<(String, VariableValue)> {
                        let value = self.variable(value, &format!("{}.{}", location, name))?;
                        Ok((name, value))
                    })
                    .collect::<IacResult<Vec<_>>>()?;
                Ok(VariableSet { env, variables })
            })
            .collect()
    }

    fn variable(&self, value: &Value, location: &str) -> IacResult<VariableValue> {
        match value {
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.scalar(item, &format!("{}[{}]", location, i)))
                .collect::<IacResult<Vec<_>>>()
                .map(VariableValue::List),
            Value::Mapping(mapping) => mapping
                .iter()
                .map(|(key, item)| -> IacResult<(String, String)> {
                    let key = self.scalar(key, &format!("{} key", location))?;
                    let item = self.scalar(item, &format!("{}.{}", location, key))?;
                    Ok((key, item))
                })
                .collect::<IacResult<Vec<_>>>()
                .map(VariableValue::Map),
            other => self.scalar(other, location).map(VariableValue::Scalar),
        }
    }

    fn scalar(&self, value: &Value, location: &str) -> IacResult<String> {
        scalar_text(value).ok_or_else(|| self.mismatch(location.to_string(), "scalar value", value))
    }
}
