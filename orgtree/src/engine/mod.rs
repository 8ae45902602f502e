//! Organization traversal and policy resolution.

pub mod management;
pub mod path_finder;
pub mod policy_resolver;
pub mod renderer;
pub mod tree_walker;

use orgtree_core::AppError;

use crate::models::{Account, OrganizationalUnit, Root};
use crate::services::OrgSession;

pub use management::ManagementAccountDetector;
pub use path_finder::{PathFinder, PathOutcome};
pub use policy_resolver::PolicyResolver;
pub use renderer::{render, RenderedNode};
pub use tree_walker::{TreeWalker, WalkEntry};

/// Per-invocation engine state: the session, the resolved root and the
/// caches shared by the path finder and the tree walker.
pub struct Engine {
    session: OrgSession,
    root: Root,
    management: ManagementAccountDetector,
    policies: PolicyResolver,
}

impl Engine {
    pub fn new(session: OrgSession, root: Root) -> Self {
        Self {
            management: ManagementAccountDetector::new(session.clone()),
            policies: PolicyResolver::new(session.clone(), root.id.clone()),
            session,
            root,
        }
    }

    pub fn session(&self) -> &OrgSession {
        &self.session
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn policies(&self) -> &PolicyResolver {
        &self.policies
    }

    pub fn path_finder(&self) -> PathFinder<'_> {
        PathFinder::new(self)
    }

    pub fn walker(&self) -> TreeWalker<'_> {
        TreeWalker::new(self)
    }

    /// Describes an account found under `parent_id` and flags it if it is
    /// the management account.
    pub async fn load_account(&self, id: &str, parent_id: &str) -> Result<Account, AppError> {
        let (description, is_management) = tokio::try_join!(
            self.session.describe_account(id),
            self.management.is_management(id),
        )?;
        self.policies.record_parent(id, parent_id);

        Ok(Account {
            id: description.id,
            name: description.name,
            parent_id: parent_id.to_string(),
            is_management,
        })
    }

    pub async fn load_ou(&self, id: &str, parent_id: &str) -> Result<OrganizationalUnit, AppError> {
        let description = self.session.describe_ou(id).await?;
        self.policies.record_parent(id, parent_id);

        Ok(OrganizationalUnit {
            id: description.id,
            name: description.name,
            parent_id: parent_id.to_string(),
        })
    }
}
