//! Cloud provider commands.

use anyhow::{Context as _, Result};
use stratus_iac::CloudTasks;

use super::{Context, EnvArgs};

pub async fn set_cloud_provider(ctx: &Context, args: EnvArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let env = config.get_env(&args.env)?;

    CloudTasks::new(ctx.runner())
        .configure_cloud_provider(env)
        .await
        .with_context(|| format!("Failed to configure cloud provider for env '{}'", env.env))?;

    println!("✅ {} configured for env '{}'", env.hosted_on, env.env);
    Ok(())
}

pub async fn create_backend_bucket(ctx: &Context, args: EnvArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let env = config.get_env(&args.env)?;
    let bucket = config.get_backend_bucket(&args.env)?;

    CloudTasks::new(ctx.runner())
        .create_backend_bucket(env, bucket)
        .await
        .with_context(|| format!("Failed to create backend bucket '{}'", bucket.bucket_name))?;

    println!("✅ Backend bucket '{}' ready", bucket.bucket_name);
    Ok(())
}
