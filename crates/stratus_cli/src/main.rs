//! stratus CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or missing files
//! - 3: Validation failure
//! - 5: IaC error

use std::process::ExitCode;

use clap::Parser;
use stratus_iac::IacError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands, Context};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const IAC_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "stratus=debug,info"
    } else if cli.quiet {
        "warn"
    } else {
        "stratus=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Ignore the error when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    let ctx = Context::from_cli(&cli);
    let result = match cli.command {
        Commands::Generate => commands::generate::execute(&ctx),
        Commands::BucketName(args) => commands::bucket_name::execute(&ctx, args),
        Commands::SetCloudProvider(args) => commands::cloud::set_cloud_provider(&ctx, args).await,
        Commands::CreateBackendBucket(args) => {
            commands::cloud::create_backend_bucket(&ctx, args).await
        }
        Commands::Init(args) => commands::terraform::init(&ctx, args).await,
        Commands::Plan(args) => commands::terraform::plan(&ctx, args).await,
        Commands::Apply(args) => commands::terraform::apply(&ctx, args).await,
        Commands::Output(args) => commands::terraform::output(&ctx, args).await,
        Commands::StateRm(args) => commands::terraform::state_rm(&ctx, args).await,
        Commands::StateList(args) => commands::terraform::state_list(&ctx, args).await,
        Commands::Fmt => commands::terraform::fmt(&ctx).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Pick an exit code from the innermost library error, if any.
fn categorize_error(e: &anyhow::Error) -> u8 {
    match e.chain().find_map(|cause| cause.downcast_ref::<IacError>()) {
        Some(iac) => categorize_iac_error(iac),
        None => ExitCodes::GENERAL_ERROR,
    }
}

fn categorize_iac_error(e: &IacError) -> u8 {
    match e {
        IacError::ValidationFailure { .. } | IacError::SchemaMismatch { .. } => {
            ExitCodes::VALIDATION_FAILURE
        }
        e if e.is_config_error() => ExitCodes::VALIDATION_FAILURE,
        e if e.is_not_found() => ExitCodes::INVALID_ARGS,
        IacError::UnknownKey { .. }
        | IacError::UnsupportedProvider(_)
        | IacError::MissingProviderIdentifier { .. } => ExitCodes::INVALID_ARGS,
        IacError::ToolNotAvailable(_) | IacError::CommandFailed { .. } | IacError::Runner(_) => {
            ExitCodes::IAC_ERROR
        }
        _ => ExitCodes::GENERAL_ERROR,
    }
}
