//! Request handling: from a validated request to rendered output.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use clap::ValueEnum;
use orgtree_core::{AppError, ExecutionContext};

use crate::config::ExplorerConfig;
use crate::engine::{render, Engine, PathOutcome, RenderedNode};
use crate::models::{is_account_id, OrgNode};
use crate::services::{AwsOrganizations, OrgSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Text based tree in the terminal
    Text,
    /// JSON document (not implemented yet)
    Json,
    /// Graphviz dot file (not implemented yet)
    Dot,
}

impl OutputFormat {
    /// Marker printed by formats without a renderer.
    fn placeholder(self) -> Option<&'static str> {
        match self {
            OutputFormat::Text => None,
            OutputFormat::Json => Some("JSON Output"),
            OutputFormat::Dot => Some("Dot Output"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Dot => write!(f, "dot"),
        }
    }
}

/// Which part of the organization to report on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelector {
    All,
    Account(String),
}

impl FromStr for AccountSelector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(AccountSelector::All)
        } else if is_account_id(s) {
            Ok(AccountSelector::Account(s.to_string()))
        } else {
            Err(AppError::ValidationError(format!(
                "account id must be \"all\" or a 12-digit AWS account id, got {:?}",
                s
            )))
        }
    }
}

/// Immutable request built once at the command-line boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerRequest {
    pub target: AccountSelector,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploreOutcome {
    Rendered { lines: usize },
    NotFound { account_id: String },
    NotImplemented { format: OutputFormat },
}

pub struct Explorer {
    session: OrgSession,
}

impl Explorer {
    pub fn new(session: OrgSession) -> Self {
        Self { session }
    }

    /// Connects to AWS Organizations using the configured profile and region.
    pub async fn build(config: &ExplorerConfig, ctx: ExecutionContext) -> Result<Self, AppError> {
        let api = AwsOrganizations::from_config(&config.aws).await?;
        let session = OrgSession::new(Arc::new(api), ctx, config.retry.clone())
            .with_concurrency(config.concurrency);
        Ok(Self::new(session))
    }

    /// Renders `target` as a text tree into `out`. Full-tree lines are
    /// written as they are discovered; a single-account path is written
    /// only once it has been found.
    pub async fn run<W: Write>(
        &self,
        target: &AccountSelector,
        out: &mut W,
    ) -> Result<ExploreOutcome, AppError> {
        let root = self.session.resolve_root().await?;
        let engine = Engine::new(self.session.clone(), root);

        match target {
            AccountSelector::All => write_organization(&engine, out).await,
            AccountSelector::Account(account_id) => {
                write_account_path(&engine, account_id, out).await
            }
        }
    }
}

/// Handles formats that have no renderer yet.
pub fn write_placeholder<W: Write>(
    format: OutputFormat,
    out: &mut W,
) -> Result<Option<ExploreOutcome>, AppError> {
    match format.placeholder() {
        Some(marker) => {
            writeln!(out, "{}", marker)?;
            Ok(Some(ExploreOutcome::NotImplemented { format }))
        }
        None => Ok(None),
    }
}

/// Runs `request`. Formats without a renderer are answered before any AWS
/// session is created.
pub async fn execute<W: Write>(
    config: &ExplorerConfig,
    request: &ExplorerRequest,
    ctx: ExecutionContext,
    out: &mut W,
) -> Result<ExploreOutcome, AppError> {
    if let Some(outcome) = write_placeholder(request.format, out)? {
        return Ok(outcome);
    }
    Explorer::build(config, ctx)
        .await?
        .run(&request.target, out)
        .await
}

async fn policies_for(engine: &Engine, node: &OrgNode) -> Result<Vec<String>, AppError> {
    match node {
        OrgNode::Account(account) => engine.policies().resolve(&account.id).await,
        _ => Ok(Vec::new()),
    }
}

async fn write_organization<W: Write>(
    engine: &Engine,
    out: &mut W,
) -> Result<ExploreOutcome, AppError> {
    tracing::info!(root_id = %engine.root().id, "Walking entire organization");

    let mut walker = engine.walker();
    let mut lines = 0;

    while let Some(entry) = walker.next().await? {
        let policies = policies_for(engine, &entry.node).await?;
        writeln!(out, "{}", RenderedNode::new(entry.node, entry.depth, policies))?;
        lines += 1;
    }
    out.flush()?;

    tracing::info!(nodes = lines, "Organization walk complete");
    Ok(ExploreOutcome::Rendered { lines })
}

async fn write_account_path<W: Write>(
    engine: &Engine,
    account_id: &str,
    out: &mut W,
) -> Result<ExploreOutcome, AppError> {
    let nodes = match engine.path_finder().find_path(account_id).await? {
        PathOutcome::Found(nodes) => nodes,
        PathOutcome::NotFound => {
            return Ok(ExploreOutcome::NotFound {
                account_id: account_id.to_string(),
            })
        }
    };

    let mut rendered = Vec::with_capacity(nodes.len());
    for (depth, node) in nodes.into_iter().enumerate() {
        let policies = policies_for(engine, &node).await?;
        rendered.push(RenderedNode::new(node, depth, policies));
    }

    let lines = rendered.len();
    out.write_all(render(rendered).as_bytes())?;
    out.flush()?;

    Ok(ExploreOutcome::Rendered { lines })
}
