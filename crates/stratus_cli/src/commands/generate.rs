//! Generate command - Validate and write every environment's tfvars.

use anyhow::Result;
use tracing::info;

use super::Context;

pub fn execute(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;

    if config.tfvars.is_empty() {
        println!("No tfvars section in {}", config.descriptor_path().display());
        return Ok(());
    }

    for tfvars in &config.tfvars {
        let path = config.tfvars_file(&tfvars.env)?;
        info!("{} variables written for env '{}'", tfvars.variables.len(), tfvars.env);
        println!("✅ {}", path.display());
    }
    Ok(())
}
