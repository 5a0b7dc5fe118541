//! Bucket-name command - Print an environment's backend bucket.

use anyhow::Result;

use super::{Context, EnvArgs};

pub fn execute(ctx: &Context, args: EnvArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let bucket = config.get_backend_bucket(&args.env)?;
    println!("{}", bucket.bucket_name);
    Ok(())
}
