//! Command-line surface.

use clap::{Args, Parser, Subcommand};

use crate::startup::{AccountSelector, ExplorerRequest, OutputFormat};

/// Exit code reported when the requested account is not in the organization.
pub const NOT_FOUND_EXIT_CODE: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "orgtree", version)]
#[command(about = "Shows which service control policies apply to the accounts of a cloud organization", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Named credentials profile
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Region used to reach the organizations endpoint
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Deadline for the whole run, in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Entrypoint for all AWS interactions
    Aws(AwsArgs),
    /// Entrypoint for all GCP interactions (not supported yet)
    Gcp,
}

#[derive(Debug, Args)]
pub struct AwsArgs {
    /// AWS account ID that will be analyzed, or "all" for the whole organization
    // No shorthand on purpose: account ids are easy to mistype.
    #[arg(long = "account-id", value_parser = parse_account_selector)]
    pub account_id: AccountSelector,

    /// Output format
    #[arg(short = 'o', long = "output-format", value_enum)]
    pub output_format: OutputFormat,
}

impl AwsArgs {
    pub fn request(&self) -> ExplorerRequest {
        ExplorerRequest {
            target: self.account_id.clone(),
            format: self.output_format,
        }
    }
}

fn parse_account_selector(value: &str) -> Result<AccountSelector, String> {
    value.parse().map_err(|e: orgtree_core::AppError| e.to_string())
}
