use std::collections::{HashSet, VecDeque};

use orgtree_core::AppError;

use super::Engine;
use crate::models::OrgNode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// Root first, target account last.
    Found(Vec<OrgNode>),
    NotFound,
}

/// Locates the root-to-account path of a single account.
pub struct PathFinder<'a> {
    engine: &'a Engine,
}

struct Frontier {
    id: String,
    path: Vec<String>,
}

impl<'a> PathFinder<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Breadth-first search over OUs, starting at the root. Each explored
    /// parent costs two list calls, issued concurrently.
    pub async fn find_path(&self, target_account_id: &str) -> Result<PathOutcome, AppError> {
        let root_id = self.engine.root().id.clone();
        let mut queue = VecDeque::from([Frontier {
            id: root_id.clone(),
            path: vec![root_id.clone()],
        }]);
        let mut visited = HashSet::from([root_id]);

        tracing::info!(account_id = target_account_id, "Searching for account path");

        while let Some(current) = queue.pop_front() {
            let (accounts, ous) = self.engine.session().list_all_children(&current.id).await?;

            if accounts.iter().any(|id| id == target_account_id) {
                let mut path = current.path;
                path.push(target_account_id.to_string());
                tracing::info!(
                    account_id = target_account_id,
                    depth = path.len() - 1,
                    "Account path found"
                );
                return Ok(PathOutcome::Found(self.describe_path(&path).await?));
            }

            for ou in ous {
                if !visited.insert(ou.clone()) {
                    tracing::warn!(ou_id = %ou, "OU listed under more than one parent, skipping");
                    continue;
                }
                let mut path = current.path.clone();
                path.push(ou.clone());
                queue.push_back(Frontier { id: ou, path });
            }
        }

        tracing::info!(account_id = target_account_id, "Account not found in organization");
        Ok(PathOutcome::NotFound)
    }

    /// Turns a path of ids into described nodes. The last id is the account.
    async fn describe_path(&self, path: &[String]) -> Result<Vec<OrgNode>, AppError> {
        let mut nodes = Vec::with_capacity(path.len());
        nodes.push(OrgNode::Root(self.engine.root().clone()));

        for (index, id) in path.iter().enumerate().skip(1) {
            let parent_id = &path[index - 1];
            let node = if index == path.len() - 1 {
                OrgNode::Account(self.engine.load_account(id, parent_id).await?)
            } else {
                OrgNode::OrganizationalUnit(self.engine.load_ou(id, parent_id).await?)
            };
            nodes.push(node);
        }

        Ok(nodes)
    }
}
