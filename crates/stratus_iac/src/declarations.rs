//! Parser for Terraform variable declarations (`variables.tf`).
//!
//! Only two facts are extracted per `variable "<name>" { ... }` block: the
//! declared name and whether the block assigns a `default` at its top
//! level. Block bodies are walked with an explicit brace-depth state
//! machine so nested objects in defaults or validation blocks do not end
//! the declaration early.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::error::{IacError, IacResult};

/// Name of the declarations file inside each environment directory.
pub const DECLARATIONS_FILE: &str = "variables.tf";

/// Variable names declared in a `variables.tf`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    /// Every declared variable
    pub all: BTreeSet<String>,
    /// Declared variables with a top-level `default`
    pub with_default: BTreeSet<String>,
}

impl Declarations {
    /// Read and parse `variables.tf` from `dir`.
    pub fn read(dir: &Path) -> IacResult<Self> {
        let path = dir.join(DECLARATIONS_FILE);
        if !path.is_file() {
            return Err(IacError::NotFound {
                what: DECLARATIONS_FILE.to_string(),
                path,
            });
        }

        debug!("Parsing variable declarations from {:?}", path);
        let content = fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    /// Parse declarations from file content.
    ///
    /// Headers are only recognised at the start of a line, at top level and
    /// outside comments and strings.
    pub fn parse(content: &str) -> IacResult<Self> {
        let header = Regex::new(r#"\A[ \t]*variable[ \t]+"([^"]+)"[ \t]*\{"#)?;
        let default_assignment = Regex::new(r"\Adefault[ \t]*=")?;

        let bytes = content.as_bytes();
        let mut declarations = Declarations::default();
        let mut state = Lexical::Code;
        let mut depth = 0usize;
        let mut i = 0;

        while i < bytes.len() {
            match lex(state, bytes, i) {
                Step::Skip(next, width) => {
                    state = next;
                    i += width;
                    continue;
                }
                Step::Code => {}
            }

            match bytes[i] {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                _ if depth == 0 && at_line_start(bytes, i) => {
                    let found = header
                        .captures(&content[i..])
                        .and_then(|caps| Some((caps.get(0)?.end(), caps.get(1)?.as_str())));
                    if let Some((header_len, name)) = found {
                        let block = scan_block(content, i + header_len, &default_assignment);
                        declarations.all.insert(name.to_string());
                        if block.has_default {
                            declarations.with_default.insert(name.to_string());
                        }
                        i = block.end;
                        continue;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        debug!(
            "Found {} variables ({} with defaults)",
            declarations.all.len(),
            declarations.with_default.len()
        );
        Ok(declarations)
    }

    /// Declared names without a default; these must be supplied.
    pub fn required(&self) -> BTreeSet<String> {
        self.all.difference(&self.with_default).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexical {
    Code,
    String { escaped: bool },
    LineComment,
    BlockComment,
}

/// Outcome of feeding one byte to [`lex`].
enum Step {
    /// Byte(s) belong to a string, a comment or a comment/string delimiter
    Skip(Lexical, usize),
    /// Plain code byte left to the caller
    Code,
}

/// Advance the lexical state at byte `i`.
fn lex(state: Lexical, bytes: &[u8], i: usize) -> Step {
    let c = bytes[i];
    let next = bytes.get(i + 1).copied();
    match state {
        Lexical::String { escaped: true } => Step::Skip(Lexical::String { escaped: false }, 1),
        Lexical::String { escaped: false } => match c {
            b'\\' => Step::Skip(Lexical::String { escaped: true }, 1),
            b'"' => Step::Skip(Lexical::Code, 1),
            _ => Step::Skip(state, 1),
        },
        Lexical::LineComment if c == b'\n' => Step::Skip(Lexical::Code, 1),
        Lexical::LineComment => Step::Skip(state, 1),
        Lexical::BlockComment if c == b'*' && next == Some(b'/') => Step::Skip(Lexical::Code, 2),
        Lexical::BlockComment => Step::Skip(state, 1),
        Lexical::Code => match (c, next) {
            (b'"', _) => Step::Skip(Lexical::String { escaped: false }, 1),
            (b'#', _) => Step::Skip(Lexical::LineComment, 1),
            (b'/', Some(b'/')) => Step::Skip(Lexical::LineComment, 2),
            (b'/', Some(b'*')) => Step::Skip(Lexical::BlockComment, 2),
            _ => Step::Code,
        },
    }
}

struct Block {
    /// Byte offset just past the closing brace (or end of input)
    end: usize,
    has_default: bool,
}

/// Walk a declaration body starting right after its opening brace.
fn scan_block(content: &str, body_start: usize, default_assignment: &Regex) -> Block {
    let bytes = content.as_bytes();
    let mut depth = 1usize;
    let mut state = Lexical::Code;
    let mut has_default = false;
    let mut i = body_start;

    while i < bytes.len() {
        match lex(state, bytes, i) {
            Step::Skip(next, width) => {
                state = next;
                i += width;
                continue;
            }
            Step::Code => {}
        }

        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Block {
                        end: i + 1,
                        has_default,
                    };
                }
            }
            b'd' if depth == 1
                && !has_default
                && starts_token(bytes, i)
                && default_assignment.is_match(&content[i..]) =>
            {
                has_default = true;
            }
            _ => {}
        }
        i += 1;
    }

    Block {
        end: bytes.len(),
        has_default,
    }
}

fn at_line_start(bytes: &[u8], i: usize) -> bool {
    i == 0 || bytes[i - 1] == b'\n'
}

/// True when position `i` is not preceded by an identifier character.
fn starts_token(bytes: &[u8], i: usize) -> bool {
    i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_' || bytes[i - 1] == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIABLES_TF: &str = r#"variable "region" {}
variable "project_id" {
  default = "my-project"
}
variable "instance_count" {}
"#;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_returns_all_variable_names() {
        let decl = Declarations::parse(VARIABLES_TF).unwrap();
        assert_eq!(decl.all, names(&["region", "project_id", "instance_count"]));
    }

    #[test]
    fn test_identifies_defaulted_variables() {
        let decl = Declarations::parse(VARIABLES_TF).unwrap();
        assert_eq!(decl.with_default, names(&["project_id"]));
        assert_eq!(decl.required(), names(&["region", "instance_count"]));
    }

    #[test]
    fn test_empty_content() {
        let decl = Declarations::parse("").unwrap();
        assert!(decl.all.is_empty());
        assert!(decl.with_default.is_empty());
    }

    #[test]
    fn test_single_line_default() {
        let decl =
            Declarations::parse("variable \"region\" {}\nvariable \"project_id\" { default = \"x\" }\n")
                .unwrap();
        assert_eq!(decl.all, names(&["region", "project_id"]));
        assert_eq!(decl.with_default, names(&["project_id"]));
    }

    #[test]
    fn test_nested_default_object() {
        let content = r#"
variable "labels" {
  type = object({
    team = string
    tier = string
  })
  default = {
    team = "platform"
    tier = "gold"
  }
}

variable "zone" {
  type = string
}
"#;
        let decl = Declarations::parse(content).unwrap();
        assert_eq!(decl.all, names(&["labels", "zone"]));
        assert_eq!(decl.with_default, names(&["labels"]));
    }

    #[test]
    fn test_default_after_nested_block_is_found() {
        let content = r#"
variable "size" {
  validation {
    condition     = var.size > 0
    error_message = "must be positive"
  }
  default = 3
}
"#;
        let decl = Declarations::parse(content).unwrap();
        assert_eq!(decl.with_default, names(&["size"]));
    }

    #[test]
    fn test_default_inside_nested_block_does_not_count() {
        let content = r#"
variable "settings" {
  type = object({
    default = string
  })
}
"#;
        let decl = Declarations::parse(content).unwrap();
        assert_eq!(decl.all, names(&["settings"]));
        assert!(decl.with_default.is_empty());
    }

    #[test]
    fn test_braces_and_default_inside_strings_and_comments_are_ignored() {
        let content = r#"
variable "name" {
  description = "closing } brace and default = 1"
  # default = "commented"
  // default = "also commented"
  /* default = { } */
}
variable "other" {}
"#;
        let decl = Declarations::parse(content).unwrap();
        assert_eq!(decl.all, names(&["name", "other"]));
        assert!(decl.with_default.is_empty());
    }

    #[test]
    fn test_similar_attribute_names_are_not_defaults() {
        let content = "variable \"a\" {\n  my_default = 1\n  defaults = 2\n}\n";
        let decl = Declarations::parse(content).unwrap();
        assert!(decl.with_default.is_empty());
    }

    #[test]
    fn test_commented_out_declarations_are_ignored() {
        let content = r#"
variable "region" {}
/*
variable "legacy_zone" {
  type = string
}
*/
# variable "old_name" {}
// variable "older_name" {}
"#;
        let decl = Declarations::parse(content).unwrap();
        assert_eq!(decl.all, names(&["region"]));
        assert_eq!(decl.required(), names(&["region"]));
    }

    #[test]
    fn test_header_inside_other_block_is_ignored() {
        let content = "locals {\nvariable \"shadow\" {}\n}\nvariable \"real\" {}\n";
        let decl = Declarations::parse(content).unwrap();
        assert_eq!(decl.all, names(&["real"]));
    }

    #[test]
    fn test_non_variable_blocks_are_skipped() {
        let content = r#"
locals {
  region = "x"
}
variable "region" {}
output "region" {
  value = var.region
}
"#;
        let decl = Declarations::parse(content).unwrap();
        assert_eq!(decl.all, names(&["region"]));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Declarations::read(dir.path()).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("variables.tf not found"));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[test]
    fn test_read_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DECLARATIONS_FILE), VARIABLES_TF).unwrap();
        let decl = Declarations::read(dir.path()).unwrap();
        assert_eq!(decl.all.len(), 3);
    }
}
