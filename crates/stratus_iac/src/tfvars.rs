//! tfvars rendering and generation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{IacError, IacResult};
use crate::model::{VariableSet, VariableValue};

/// Extension of generated variable files.
pub const TFVARS_EXTENSION: &str = "tfvars";

/// Render one value in tfvars syntax.
///
/// - scalar: `"value"`
/// - list: `[`, one `  "item",` line per element, `]`
/// - map: `{`, one `  "key" = "value"` line per entry, `}`
///
/// Empty lists and maps render as `[]` and `{}`.
pub fn format_value(value: &VariableValue) -> String {
    match value {
        VariableValue::Scalar(text) => quote(text),
        VariableValue::List(items) if items.is_empty() => "[]".to_string(),
        VariableValue::List(items) => {
            let body: String = items
                .iter()
                .map(|item| format!("  {},\n", quote(item)))
                .collect();
            format!("[\n{}]", body)
        }
        VariableValue::Map(entries) if entries.is_empty() => "{}".to_string(),
        VariableValue::Map(entries) => {
            let body: String = entries
                .iter()
                .map(|(key, value)| format!("  {} = {}\n", quote(key), quote(value)))
                .collect();
            format!("{{\n{}}}", body)
        }
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Render a whole tfvars file: one `name = value` line per variable and a
/// trailing newline.
pub fn render(tfvars: &VariableSet) -> String {
    let lines: Vec<String> = tfvars
        .variables
        .iter()
        .map(|(name, value)| format!("{} = {}", name, format_value(value)))
        .collect();
    format!("{}\n", lines.join("\n"))
}

/// Path of the generated file for `env` inside `dir`.
pub fn tfvars_path(dir: &Path, env: &str) -> PathBuf {
    dir.join(format!("{}.{}", env.to_lowercase(), TFVARS_EXTENSION))
}

/// Writes rendered tfvars files into environment directories.
pub struct TfvarsGenerator;

impl TfvarsGenerator {
    /// Render `tfvars` into `<dir>/<env>.tfvars`, replacing any existing file.
    pub fn generate(dir: &Path, tfvars: &VariableSet) -> IacResult<PathBuf> {
        if !dir.is_dir() {
            return Err(IacError::NotFound {
                what: "infra directory".to_string(),
                path: dir.to_path_buf(),
            });
        }

        let path = tfvars_path(dir, &tfvars.env);
        fs::write(&path, render(tfvars)).map_err(|source| IacError::WriteFailed {
            path: path.clone(),
            source,
        })?;

        info!("Generated {:?} ({} variables)", path, tfvars.variables.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_value() {
        assert_eq!(format_value(&"us-central1".into()), "\"us-central1\"");
    }

    #[test]
    fn test_list_value() {
        let value = VariableValue::List(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(format_value(&value), "[\n  \"a\",\n  \"b\",\n]");
    }

    #[test]
    fn test_single_item_list() {
        let value = VariableValue::List(vec!["only".to_string()]);
        assert_eq!(format_value(&value), "[\n  \"only\",\n]");
    }

    #[test]
    fn test_map_value() {
        let value = VariableValue::Map(vec![
            ("key".to_string(), "value".to_string()),
            ("team".to_string(), "infra".to_string()),
        ]);
        assert_eq!(
            format_value(&value),
            "{\n  \"key\" = \"value\"\n  \"team\" = \"infra\"\n}"
        );
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(format_value(&VariableValue::List(vec![])), "[]");
        assert_eq!(format_value(&VariableValue::Map(vec![])), "{}");
    }

    #[test]
    fn test_quotes_are_escaped() {
        assert_eq!(format_value(&r#"say "hi" \o/"#.into()), r#""say \"hi\" \\o/""#);
    }

    #[test]
    fn test_render_list_file() {
        let tv = VariableSet::new("dev").with(
            "items",
            VariableValue::List(vec!["a".to_string(), "b".to_string()]),
        );
        assert_eq!(render(&tv), "items = [\n  \"a\",\n  \"b\",\n]\n");
    }

    #[test]
    fn test_render_keeps_variable_order() {
        let tv = VariableSet::new("dev").with("zone", "b").with("app", "a");
        assert_eq!(render(&tv), "zone = \"b\"\napp = \"a\"\n");
    }

    #[test]
    fn test_generate_uses_lowercase_env_name() {
        let dir = tempfile::tempdir().unwrap();
        let tv = VariableSet::new("PROD").with("key", "value");
        let path = TfvarsGenerator::generate(dir.path(), &tv).unwrap();
        assert_eq!(path, dir.path().join("prod.tfvars"));
        assert_eq!(fs::read_to_string(path).unwrap(), "key = \"value\"\n");
    }

    #[test]
    fn test_generate_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dev.tfvars"), "stale = \"content\"\nmore\n").unwrap();
        let tv = VariableSet::new("dev").with("region", "us-central1");
        TfvarsGenerator::generate(dir.path(), &tv).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("dev.tfvars")).unwrap(),
            "region = \"us-central1\"\n"
        );
    }

    #[test]
    fn test_generate_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nonexistent");
        let err = TfvarsGenerator::generate(&missing, &VariableSet::new("dev")).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("infra directory not found"));
        assert!(err.to_string().contains(&missing.display().to_string()));
    }
}
