//! Effective service control policies.
//!
//! Policies flow down from the root, so the resolver walks up from the
//! queried node one parent at a time and concatenates each node's directly
//! attached policies, nearest first. Direct attachments and parent links are
//! memoised for the lifetime of the resolver, so siblings share the lookups
//! of their common ancestors.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use orgtree_core::AppError;

use crate::services::OrgSession;

pub struct PolicyResolver {
    session: OrgSession,
    root_id: String,
    direct: DashMap<String, Arc<Vec<String>>>,
    parents: DashMap<String, String>,
}

impl PolicyResolver {
    pub fn new(session: OrgSession, root_id: impl Into<String>) -> Self {
        Self {
            session,
            root_id: root_id.into(),
            direct: DashMap::new(),
            parents: DashMap::new(),
        }
    }

    /// Seeds the parent cache with a link discovered during traversal.
    pub fn record_parent(&self, child_id: &str, parent_id: &str) {
        self.parents
            .entry(child_id.to_string())
            .or_insert_with(|| parent_id.to_string());
    }

    /// Names of the policies attached directly to `node_id`.
    pub async fn direct_policies(&self, node_id: &str) -> Result<Arc<Vec<String>>, AppError> {
        if let Some(cached) = self.direct.get(node_id) {
            return Ok(cached.clone());
        }

        let names: Vec<String> = self
            .session
            .list_policies_for_target(node_id)
            .await?
            .into_iter()
            .map(|policy| policy.name)
            .collect();

        // Concurrent fetches for the same node may race; the first insert wins.
        let entry = self
            .direct
            .entry(node_id.to_string())
            .or_insert_with(|| Arc::new(names));
        Ok(entry.clone())
    }

    /// The single parent of a non-root node.
    pub async fn parent_of(&self, node_id: &str) -> Result<String, AppError> {
        if let Some(parent) = self.parents.get(node_id) {
            return Ok(parent.clone());
        }

        let parents = self.session.list_parents(node_id).await?;
        let parent = match parents.as_slice() {
            [parent] => parent.clone(),
            _ => {
                return Err(AppError::InconsistentHierarchy(format!(
                    "node {} has {} parents, expected exactly one",
                    node_id,
                    parents.len()
                )))
            }
        };

        self.record_parent(node_id, &parent);
        Ok(parent)
    }

    /// Effective policy names of `node_id`: its own attachments followed by
    /// each ancestor's, deduplicated with the nearest occurrence kept.
    pub async fn resolve(&self, node_id: &str) -> Result<Vec<String>, AppError> {
        let mut names = Vec::new();
        let mut seen_nodes = HashSet::new();
        let mut current = node_id.to_string();

        loop {
            if !seen_nodes.insert(current.clone()) {
                return Err(AppError::InconsistentHierarchy(format!(
                    "parent chain of {} loops back to {}",
                    node_id, current
                )));
            }

            names.extend(self.direct_policies(&current).await?.iter().cloned());

            if current == self.root_id {
                break;
            }
            current = self.parent_of(&current).await?;
        }

        tracing::debug!(node = node_id, policies = names.len(), "Resolved effective policies");
        Ok(dedup_preserving_order(names))
    }
}

/// Removes repeated names, keeping the first occurrence of each.
pub fn dedup_preserving_order(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
