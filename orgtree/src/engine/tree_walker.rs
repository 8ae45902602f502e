//! Full-organization traversal.
//!
//! A single explicit worklist drives the walk: at every parent the child
//! accounts come out before the child OUs, and each OU's subtree is finished
//! before its next sibling starts. Nodes are produced on demand through
//! [`TreeWalker::next`].

use std::collections::HashSet;

use futures::{stream, StreamExt, TryStreamExt};
use orgtree_core::AppError;

use super::Engine;
use crate::models::{Account, OrgNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub node: OrgNode,
    pub depth: usize,
}

enum Frame {
    /// Ready to hand out.
    Emit(WalkEntry),
    /// OU to describe and emit, then expand.
    Ou {
        id: String,
        parent_id: String,
        depth: usize,
    },
    /// Parent whose children are listed at `depth`.
    Expand { parent_id: String, depth: usize },
}

pub struct TreeWalker<'a> {
    engine: &'a Engine,
    stack: Vec<Frame>,
    visited: HashSet<String>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        let root = engine.root().clone();
        let stack = vec![
            Frame::Expand {
                parent_id: root.id.clone(),
                depth: 1,
            },
            Frame::Emit(WalkEntry {
                node: OrgNode::Root(root.clone()),
                depth: 0,
            }),
        ];

        Self {
            engine,
            stack,
            visited: HashSet::from([root.id]),
        }
    }

    /// Number of distinct nodes handed out or queued so far.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// The next node in walk order, or `None` once the tree is exhausted.
    pub async fn next(&mut self) -> Result<Option<WalkEntry>, AppError> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Emit(entry) => return Ok(Some(entry)),
                Frame::Ou {
                    id,
                    parent_id,
                    depth,
                } => {
                    let ou = self.engine.load_ou(&id, &parent_id).await?;
                    self.stack.push(Frame::Expand {
                        parent_id: id,
                        depth: depth + 1,
                    });
                    return Ok(Some(WalkEntry {
                        node: OrgNode::OrganizationalUnit(ou),
                        depth,
                    }));
                }
                Frame::Expand { parent_id, depth } => self.expand(&parent_id, depth).await?,
            }
        }
        Ok(None)
    }

    /// Drains the walker into a vector.
    pub async fn collect(mut self) -> Result<Vec<WalkEntry>, AppError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn expand(&mut self, parent_id: &str, depth: usize) -> Result<(), AppError> {
        self.engine.session().context().check()?;

        let (account_ids, ou_ids) = self.engine.session().list_all_children(parent_id).await?;
        let account_ids = self.unvisited(parent_id, account_ids);
        let ou_ids = self.unvisited(parent_id, ou_ids);

        tracing::debug!(
            parent_id,
            depth,
            accounts = account_ids.len(),
            ous = ou_ids.len(),
            "Expanding parent"
        );

        // At most `concurrency` sibling accounts are in flight; results keep
        // listing order.
        let accounts: Vec<Account> = stream::iter(account_ids.iter())
            .map(|id| self.load_account_warm(id, parent_id))
            .buffered(self.engine.session().concurrency())
            .try_collect()
            .await?;

        for id in ou_ids.into_iter().rev() {
            self.stack.push(Frame::Ou {
                id,
                parent_id: parent_id.to_string(),
                depth,
            });
        }
        for account in accounts.into_iter().rev() {
            self.stack.push(Frame::Emit(WalkEntry {
                node: OrgNode::Account(account),
                depth,
            }));
        }

        Ok(())
    }

    async fn load_account_warm(&self, id: &str, parent_id: &str) -> Result<Account, AppError> {
        let (account, _) = tokio::try_join!(
            self.engine.load_account(id, parent_id),
            self.engine.policies().direct_policies(id),
        )?;
        Ok(account)
    }

    fn unvisited(&mut self, parent_id: &str, ids: Vec<String>) -> Vec<String> {
        ids.into_iter()
            .filter(|id| {
                let fresh = self.visited.insert(id.clone());
                if !fresh {
                    tracing::warn!(
                        node = %id,
                        parent_id,
                        "Node already visited through another parent, skipping"
                    );
                }
                fresh
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Root;
    use crate::services::organizations::{InMemoryOrganization, Operation};
    use crate::services::{OrgApiError, OrgSession};
    use orgtree_core::{ExecutionContext, RetryConfig};
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(org: InMemoryOrganization) -> (Arc<InMemoryOrganization>, Engine) {
        let org = Arc::new(org);
        let session = OrgSession::new(org.clone(), ExecutionContext::new(), RetryConfig::no_retry());
        let engine = Engine::new(session, Root { id: "r-1".into() });
        (org, engine)
    }

    fn wide_org(accounts: usize) -> InMemoryOrganization {
        let mut org = InMemoryOrganization::new()
            .with_root("r-1")
            .with_management_account("100000000000")
            .with_latency(Duration::from_millis(10));
        for i in 0..accounts {
            org = org.with_account(&format!("{}", 100_000_000_000u64 + i as u64), "wide", "r-1");
        }
        org
    }

    fn org() -> InMemoryOrganization {
        InMemoryOrganization::new()
            .with_root("r-1")
            .with_ou("ou-a", "A", "r-1")
            .with_ou("ou-a1", "A1", "ou-a")
            .with_ou("ou-b", "B", "r-1")
            .with_account("111111111111", "mgmt", "r-1")
            .with_account("222222222222", "in-a", "ou-a")
            .with_account("333333333333", "in-a1", "ou-a1")
            .with_account("444444444444", "in-b", "ou-b")
            .with_management_account("111111111111")
    }

    fn order(entries: &[WalkEntry]) -> Vec<(&str, usize)> {
        entries.iter().map(|e| (e.node.id(), e.depth)).collect()
    }

    #[tokio::test]
    async fn test_depth_first_accounts_before_ous() {
        let (_, engine) = engine(org());
        let entries = engine.walker().collect().await.unwrap();
        assert_eq!(
            order(&entries),
            vec![
                ("r-1", 0),
                ("111111111111", 1),
                ("ou-a", 1),
                ("222222222222", 2),
                ("ou-a1", 2),
                ("333333333333", 3),
                ("ou-b", 1),
                ("444444444444", 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_each_parent_listed_once() {
        let (org, engine) = engine(org());
        let mut walker = engine.walker();
        while walker.next().await.unwrap().is_some() {}
        assert_eq!(walker.visited_count(), org.node_count() + 1);
        // root + three OUs, two list calls each
        assert_eq!(org.calls(Operation::ListChildren), 8);
        assert_eq!(org.calls(Operation::DescribeAccount), 4);
        assert_eq!(org.calls(Operation::DescribeOu), 3);
        assert_eq!(org.calls(Operation::DescribeOrganization), 1);
    }

    #[tokio::test]
    async fn test_node_listed_twice_is_emitted_once() {
        let (_, engine) = engine(org().with_extra_listing("ou-b", "222222222222"));
        let entries = engine.walker().collect().await.unwrap();
        let hits = entries
            .iter()
            .filter(|e| e.node.id() == "222222222222")
            .count();
        assert_eq!(hits, 1);
        assert_eq!(entries.len(), 8);
    }

    #[tokio::test]
    async fn test_walk_is_lazy() {
        let (org, engine) = engine(org());
        let mut walker = engine.walker();
        let first = walker.next().await.unwrap().unwrap();
        assert_eq!(first.node.id(), "r-1");
        assert_eq!(org.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_aborts_walk_after_partial_output() {
        let (org, engine) = engine(org());
        org.fail_on(
            Operation::ListChildren,
            "ou-a1",
            OrgApiError::Service("boom".into()),
        );

        let mut walker = engine.walker();
        let mut produced = Vec::new();
        let err = loop {
            match walker.next().await {
                Ok(Some(entry)) => produced.push(entry.node.id().to_string()),
                Ok(None) => panic!("walk should fail"),
                Err(err) => break err,
            }
        };

        assert!(matches!(err, AppError::Collaborator { .. }));
        assert_eq!(
            produced,
            vec!["r-1", "111111111111", "ou-a", "222222222222", "ou-a1"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_walk_stops() {
        let (_, engine) = engine(org());
        let mut walker = engine.walker();
        walker.next().await.unwrap();
        engine.session().context().cancel();
        assert!(matches!(walker.next().await, Err(AppError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sibling_accounts_respect_concurrency_limit() {
        let org = Arc::new(wide_org(30));
        let session = OrgSession::new(org.clone(), ExecutionContext::new(), RetryConfig::no_retry())
            .with_concurrency(3);
        let engine = Engine::new(session, Root { id: "r-1".into() });

        let entries = engine.walker().collect().await.unwrap();

        assert_eq!(entries.len(), 31);
        let ids: Vec<&str> = entries.iter().skip(1).map(|e| e.node.id()).collect();
        let expected: Vec<String> = (0..30u64).map(|i| (100_000_000_000 + i).to_string()).collect();
        assert_eq!(ids, expected);
        // each account in flight issues a describe and a policy lookup; the
        // management lookup can overlap once
        assert!(org.max_in_flight() <= 3 * 2 + 1, "{} in flight", org.max_in_flight());
        assert!(org.max_in_flight() >= 3);
    }
}
