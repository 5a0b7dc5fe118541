//! tfvars validation against Terraform variable declarations.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info};

use crate::declarations::{Declarations, DECLARATIONS_FILE};
use crate::error::{IacError, IacResult};
use crate::model::VariableSet;

/// Cross-checks a tfvars set with the `variables.tf` of its environment.
pub struct TfvarsValidator;

impl TfvarsValidator {
    /// Validate `tfvars` against the declarations found in `dir`.
    pub fn validate(dir: &Path, tfvars: &VariableSet) -> IacResult<()> {
        info!("Validating tfvars for env '{}' against {:?}", tfvars.env, dir);
        let declarations = Declarations::read(dir)?;
        Self::check(&declarations, tfvars, &dir.join(DECLARATIONS_FILE))
    }

    /// Compare already parsed declarations with a tfvars set.
    ///
    /// Every declared variable without a default must be provided, and only
    /// declared variables may be provided.
    pub fn check(
        declarations: &Declarations,
        tfvars: &VariableSet,
        declarations_path: &Path,
    ) -> IacResult<()> {
        let provided: BTreeSet<String> = tfvars.names().map(str::to_string).collect();
        let required = declarations.required();

        let missing: Vec<String> = required.difference(&provided).cloned().collect();
        let extra: Vec<String> = provided.difference(&declarations.all).cloned().collect();

        if missing.is_empty() && extra.is_empty() {
            debug!("tfvars for env '{}' match declarations", tfvars.env);
            return Ok(());
        }

        Err(IacError::ValidationFailure {
            env: tfvars.env.clone(),
            declarations: declarations_path.to_path_buf(),
            missing,
            extra,
        })
    }
}
