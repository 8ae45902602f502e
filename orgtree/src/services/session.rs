//! Guarded access to the organization API.
//!
//! Every call made by the engine goes through [`OrgSession`]: it is raced
//! against the execution context, retried when throttled, logged, and on
//! failure wrapped with the operation name and node id.

use std::future::Future;
use std::sync::Arc;

use orgtree_core::{retry_call, AppError, ExecutionContext, RetryConfig, RetryError};

use super::organizations::{OrgApiError, OrganizationsApi};
use crate::models::{ChildType, NodeDescription, PolicySummary, Root};

/// Sibling nodes loaded at the same time unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Clone)]
pub struct OrgSession {
    api: Arc<dyn OrganizationsApi>,
    ctx: ExecutionContext,
    retry: RetryConfig,
    concurrency: usize,
}

impl OrgSession {
    pub fn new(api: Arc<dyn OrganizationsApi>, ctx: ExecutionContext, retry: RetryConfig) -> Self {
        Self {
            api,
            ctx,
            retry,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Caps how many sibling nodes are loaded at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        target: &str,
        f: F,
    ) -> Result<T, AppError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, OrgApiError>>,
    {
        tracing::debug!(operation, node = target, "Calling organizations API");

        retry_call(&self.retry, &self.ctx, operation, f)
            .await
            .map_err(|err| match err {
                RetryError::Interrupted(interruption) => AppError::from(interruption),
                RetryError::Failed(source) => {
                    tracing::error!(
                        operation,
                        node = target,
                        error = %source,
                        "Organizations API call failed"
                    );
                    AppError::collaborator(operation, target, source)
                }
            })
    }

    /// The organization's single root.
    pub async fn resolve_root(&self) -> Result<Root, AppError> {
        let roots = self
            .call("ListRoots", "organization", || self.api.list_roots())
            .await?;

        match roots.as_slice() {
            [] => Err(AppError::collaborator(
                "ListRoots",
                "organization",
                "no roots found in the organization",
            )),
            [id] => Ok(Root { id: id.clone() }),
            _ => Err(AppError::UnsupportedConfiguration(format!(
                "organization has {} roots, only one is supported",
                roots.len()
            ))),
        }
    }

    pub async fn list_children(
        &self,
        parent_id: &str,
        child_type: ChildType,
    ) -> Result<Vec<String>, AppError> {
        let operation = match child_type {
            ChildType::Account => "ListChildren(ACCOUNT)",
            ChildType::OrganizationalUnit => "ListChildren(ORGANIZATIONAL_UNIT)",
        };
        self.call(operation, parent_id, || {
            self.api.list_children(parent_id, child_type)
        })
        .await
    }

    /// Child accounts and child OUs of `parent_id`, fetched concurrently.
    pub async fn list_all_children(
        &self,
        parent_id: &str,
    ) -> Result<(Vec<String>, Vec<String>), AppError> {
        tokio::try_join!(
            self.list_children(parent_id, ChildType::Account),
            self.list_children(parent_id, ChildType::OrganizationalUnit),
        )
    }

    pub async fn describe_account(&self, account_id: &str) -> Result<NodeDescription, AppError> {
        self.call("DescribeAccount", account_id, || {
            self.api.describe_account(account_id)
        })
        .await
    }

    pub async fn describe_ou(&self, ou_id: &str) -> Result<NodeDescription, AppError> {
        self.call("DescribeOrganizationalUnit", ou_id, || {
            self.api.describe_ou(ou_id)
        })
        .await
    }

    pub async fn list_policies_for_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<PolicySummary>, AppError> {
        self.call("ListPoliciesForTarget", target_id, || {
            self.api.list_policies_for_target(target_id)
        })
        .await
    }

    pub async fn list_parents(&self, child_id: &str) -> Result<Vec<String>, AppError> {
        self.call("ListParents", child_id, || self.api.list_parents(child_id))
            .await
    }

    pub async fn management_account_id(&self) -> Result<String, AppError> {
        self.call("DescribeOrganization", "organization", || {
            self.api.management_account_id()
        })
        .await
    }
}
