//! Terraform commands, each run inside the environment's infra_dir.

use anyhow::Result;
use clap::Args;
use stratus_iac::TerraformTasks;

use super::{Context, EnvArgs};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Skip the interactive approval prompt
    #[arg(long)]
    pub auto_approve: bool,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Name of the output to print
    #[arg(short, long)]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct StateRmArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Resource address to drop from state
    #[arg(short, long)]
    pub resource: String,
}

fn tasks(ctx: &Context) -> Result<TerraformTasks> {
    Ok(TerraformTasks::new(ctx.runner(), ctx.load_config()?))
}

pub async fn init(ctx: &Context, args: EnvArgs) -> Result<()> {
    tasks(ctx)?.init(&args.env).await?;
    Ok(())
}

pub async fn plan(ctx: &Context, args: EnvArgs) -> Result<()> {
    tasks(ctx)?.plan(&args.env).await?;
    Ok(())
}

pub async fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    tasks(ctx)?.apply(&args.env.env, args.auto_approve).await?;
    Ok(())
}

pub async fn output(ctx: &Context, args: OutputArgs) -> Result<()> {
    let value = tasks(ctx)?.output(&args.env.env, &args.name).await?;
    println!("{}", value.trim_end());
    Ok(())
}

pub async fn state_rm(ctx: &Context, args: StateRmArgs) -> Result<()> {
    tasks(ctx)?.state_rm(&args.env.env, &args.resource).await?;
    Ok(())
}

pub async fn state_list(ctx: &Context, args: EnvArgs) -> Result<()> {
    tasks(ctx)?.state_list(&args.env).await?;
    Ok(())
}

pub async fn fmt(ctx: &Context) -> Result<()> {
    tasks(ctx)?.fmt().await?;
    Ok(())
}
