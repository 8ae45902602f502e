#![allow(dead_code)]

use orgtree::services::{InMemoryOrganization, OrgSession};
use orgtree::startup::{AccountSelector, ExploreOutcome, Explorer, ExplorerRequest, OutputFormat};
use orgtree_core::{AppError, ExecutionContext, RetryConfig};
use std::sync::Arc;

pub const ROOT_ID: &str = "r-cww9";
pub const MANAGEMENT_ID: &str = "123456789012";
pub const CHILD1_ID: &str = "339712974046";
pub const TEST1_ID: &str = "210987654321";
pub const DEV1_ID: &str = "555566667777";

pub const SCENARIO_A: &str = "\
|-- Root: [r-cww9]
    |-- OU: Prod [ou-cww9-36h7ub42]
        |-- OU: Finance [ou-cww9-x2atbcle]
            |-- Account: aws-child1 [339712974046] (SCPs: FullAWSAccess, DenyAccessS3)
";

pub const SCENARIO_B: &str = "\
|-- Root: [r-cww9]
    |-- Account: aws-management (Management Account) [123456789012] (SCPs: FullAWSAccess)
    |-- OU: Prod [ou-cww9-36h7ub42]
        |-- OU: Finance [ou-cww9-x2atbcle]
            |-- Account: aws-child1 [339712974046] (SCPs: FullAWSAccess, DenyAccessS3)
    |-- OU: Test [ou-cww9-t3stou01]
        |-- Account: aws-test1 [210987654321] (SCPs: DenyLeaveOrg, FullAWSAccess)
    |-- OU: Dev [ou-cww9-d3vou001]
        |-- Account: aws-dev1 [555566667777] (SCPs: FullAWSAccess)
";

/// Organization used by the scenario tests. FullAWSAccess is attached to
/// every node, as AWS does by default.
pub fn scenario_org() -> InMemoryOrganization {
    InMemoryOrganization::new()
        .with_root(ROOT_ID)
        .with_ou("ou-cww9-36h7ub42", "Prod", ROOT_ID)
        .with_ou("ou-cww9-x2atbcle", "Finance", "ou-cww9-36h7ub42")
        .with_ou("ou-cww9-t3stou01", "Test", ROOT_ID)
        .with_ou("ou-cww9-d3vou001", "Dev", ROOT_ID)
        .with_account(MANAGEMENT_ID, "aws-management", ROOT_ID)
        .with_account(CHILD1_ID, "aws-child1", "ou-cww9-x2atbcle")
        .with_account(TEST1_ID, "aws-test1", "ou-cww9-t3stou01")
        .with_account(DEV1_ID, "aws-dev1", "ou-cww9-d3vou001")
        .with_management_account(MANAGEMENT_ID)
        .with_policy(ROOT_ID, "FullAWSAccess")
        .with_policy("ou-cww9-36h7ub42", "FullAWSAccess")
        .with_policy("ou-cww9-x2atbcle", "DenyAccessS3")
        .with_policy("ou-cww9-x2atbcle", "FullAWSAccess")
        .with_policy("ou-cww9-t3stou01", "FullAWSAccess")
        .with_policy("ou-cww9-d3vou001", "FullAWSAccess")
        .with_policy(MANAGEMENT_ID, "FullAWSAccess")
        .with_policy(CHILD1_ID, "FullAWSAccess")
        .with_policy(TEST1_ID, "DenyLeaveOrg")
        .with_policy(TEST1_ID, "FullAWSAccess")
        .with_policy(DEV1_ID, "FullAWSAccess")
}

pub fn explorer_with(org: Arc<InMemoryOrganization>, ctx: ExecutionContext) -> Explorer {
    Explorer::new(OrgSession::new(org, ctx, RetryConfig::quick(3)))
}

pub fn explorer(org: Arc<InMemoryOrganization>) -> Explorer {
    explorer_with(org, ExecutionContext::new())
}

pub fn text_request(target: &str) -> ExplorerRequest {
    ExplorerRequest {
        target: target.parse::<AccountSelector>().expect("valid selector"),
        format: OutputFormat::Text,
    }
}

/// Runs a text request and returns the outcome with everything written.
pub async fn run_text(
    explorer: &Explorer,
    target: &str,
) -> (Result<ExploreOutcome, AppError>, String) {
    let mut out = Vec::new();
    let outcome = explorer.run(&text_request(target).target, &mut out).await;
    (outcome, String::from_utf8(out).expect("utf-8 output"))
}
