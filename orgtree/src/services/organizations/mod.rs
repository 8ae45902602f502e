//! Organization API abstraction and implementations.
//!
//! The engine only reads through [`OrganizationsApi`], so the AWS client and
//! the in-memory organization used in tests are interchangeable.

pub mod aws;
pub mod memory;

use async_trait::async_trait;
use orgtree_core::Retryable;
use thiserror::Error;

use crate::models::{ChildType, NodeDescription, PolicySummary};

pub use aws::AwsOrganizations;
pub use memory::{InMemoryOrganization, Operation};

/// Error type for organization API calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrgApiError {
    #[error("Rate limited: {0}")]
    Throttled(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl Retryable for OrgApiError {
    fn is_retryable(&self) -> bool {
        matches!(self, OrgApiError::Throttled(_))
    }
}

/// Read-only view of an organization's hierarchy and policy attachments.
#[async_trait]
pub trait OrganizationsApi: Send + Sync {
    /// Ids of the organization roots.
    async fn list_roots(&self) -> Result<Vec<String>, OrgApiError>;

    /// Ids of the direct children of `parent_id` of the given type.
    async fn list_children(
        &self,
        parent_id: &str,
        child_type: ChildType,
    ) -> Result<Vec<String>, OrgApiError>;

    async fn describe_account(&self, account_id: &str) -> Result<NodeDescription, OrgApiError>;

    async fn describe_ou(&self, ou_id: &str) -> Result<NodeDescription, OrgApiError>;

    /// Service control policies attached directly to `target_id`.
    async fn list_policies_for_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<PolicySummary>, OrgApiError>;

    /// Ids of the parents of `child_id`. Exactly one in a well-formed tree.
    async fn list_parents(&self, child_id: &str) -> Result<Vec<String>, OrgApiError>;

    /// The organization's management (master) account id.
    async fn management_account_id(&self) -> Result<String, OrgApiError>;
}
