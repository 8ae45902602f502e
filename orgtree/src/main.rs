use std::process::ExitCode;

use clap::Parser;
use orgtree::cli::{Cli, Commands, NOT_FOUND_EXIT_CODE};
use orgtree::config::ExplorerConfig;
use orgtree::startup::{execute, ExploreOutcome};
use orgtree_core::observability::init_tracing;
use orgtree_core::{AppError, ExecutionContext};

fn fail(err: AppError) -> ExitCode {
    eprintln!("Error: {}", err);
    ExitCode::from(err.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ExplorerConfig::load()
        .and_then(|c| c.with_overrides(cli.profile.clone(), cli.region.clone(), cli.timeout_secs))
    {
        Ok(config) => config,
        Err(e) => return fail(e),
    };

    init_tracing("orgtree", &config.log);

    let args = match &cli.command {
        Commands::Aws(args) => args,
        Commands::Gcp => {
            return fail(AppError::UnsupportedConfiguration(
                "the GCP policy model is not supported yet".to_string(),
            ))
        }
    };
    let request = args.request();

    let ctx = ExecutionContext::with_timeout(config.timeout());
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            canceller.cancel();
        }
    });

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match execute(&config, &request, ctx, &mut out).await {
        Ok(ExploreOutcome::NotFound { account_id }) => {
            eprintln!(
                "Target account ID {} was not found in the organization",
                account_id
            );
            ExitCode::from(NOT_FOUND_EXIT_CODE)
        }
        Ok(ExploreOutcome::NotImplemented { format }) => {
            tracing::info!(%format, "Output format has no renderer yet");
            ExitCode::SUCCESS
        }
        Ok(ExploreOutcome::Rendered { .. }) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}
