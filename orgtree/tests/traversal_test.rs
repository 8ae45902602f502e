//! Coverage, path uniqueness and inheritance checks over generated shapes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use orgtree::engine::{Engine, PathOutcome};
use orgtree::models::{OrgNode, Root};
use orgtree::services::organizations::Operation;
use orgtree::services::{InMemoryOrganization, OrgSession};
use orgtree_core::{ExecutionContext, RetryConfig};

const ROOT: &str = "r-gen0";

/// A generated organization plus what we expect from it.
struct Generated {
    org: InMemoryOrganization,
    accounts: Vec<String>,
    expected_policies: HashMap<String, Vec<String>>,
}

struct Builder {
    org: InMemoryOrganization,
    next_account: u64,
    next_ou: u64,
    accounts: Vec<String>,
    expected_policies: HashMap<String, Vec<String>>,
}

impl Builder {
    fn new() -> Self {
        Self {
            org: InMemoryOrganization::new()
                .with_root(ROOT)
                .with_policy(ROOT, "FullAWSAccess")
                .with_management_account("000000000001"),
            next_account: 1,
            next_ou: 0,
            accounts: Vec::new(),
            expected_policies: HashMap::new(),
        }
    }

    /// `inherited` is the nearest-first policy list of `parent_id`.
    fn account(&mut self, parent_id: &str, inherited: &[String]) {
        let id = format!("{:012}", self.next_account);
        self.next_account += 1;

        let own = format!("Account-{}", id);
        let org = std::mem::take(&mut self.org)
            .with_account(&id, &format!("acct-{}", id), parent_id)
            .with_policy(&id, &own)
            .with_policy(&id, "FullAWSAccess");
        self.org = org;

        let mut expected = vec![own, "FullAWSAccess".to_string()];
        for name in inherited {
            if !expected.contains(name) {
                expected.push(name.clone());
            }
        }
        self.expected_policies.insert(id.clone(), expected);
        self.accounts.push(id);
    }

    fn ou(&mut self, parent_id: &str, inherited: &[String]) -> (String, Vec<String>) {
        let id = format!("ou-gen0-{:08}", self.next_ou);
        self.next_ou += 1;

        let own = format!("Guard-{}", id);
        self.org = std::mem::take(&mut self.org)
            .with_ou(&id, &format!("Unit {}", id), parent_id)
            .with_policy(&id, &own)
            .with_policy(&id, "FullAWSAccess");

        let mut chain = vec![own, "FullAWSAccess".to_string()];
        for name in inherited {
            if !chain.contains(name) {
                chain.push(name.clone());
            }
        }
        (id, chain)
    }

    fn finish(self) -> Generated {
        Generated {
            org: self.org,
            accounts: self.accounts,
            expected_policies: self.expected_policies,
        }
    }
}

/// Every OU has `branching` child OUs down to `depth`, and `per_ou` accounts.
fn balanced(depth: usize, branching: usize, per_ou: usize) -> Generated {
    fn grow(
        b: &mut Builder,
        parent: &str,
        inherited: &[String],
        depth: usize,
        branching: usize,
        per_ou: usize,
    ) {
        for _ in 0..per_ou {
            b.account(parent, inherited);
        }
        if depth == 0 {
            return;
        }
        for _ in 0..branching {
            let (ou, chain) = b.ou(parent, inherited);
            grow(b, &ou, &chain, depth - 1, branching, per_ou);
        }
    }

    let mut b = Builder::new();
    let root_chain = vec!["FullAWSAccess".to_string()];
    grow(&mut b, ROOT, &root_chain, depth, branching, per_ou);
    b.finish()
}

/// A single chain of OUs with one account at each level.
fn skewed(depth: usize) -> Generated {
    let mut b = Builder::new();
    let mut parent = ROOT.to_string();
    let mut chain = vec!["FullAWSAccess".to_string()];
    b.account(&parent, &chain);
    for _ in 0..depth {
        let (ou, next_chain) = b.ou(&parent, &chain);
        b.account(&ou, &next_chain);
        parent = ou;
        chain = next_chain;
    }
    b.finish()
}

fn shapes() -> Vec<(&'static str, Generated)> {
    vec![
        ("flat", balanced(0, 0, 4)),
        ("balanced-2x2", balanced(2, 2, 2)),
        ("balanced-3x3", balanced(3, 3, 1)),
        ("skewed-1", skewed(1)),
        ("skewed-8", skewed(8)),
    ]
}

fn engine(org: Arc<InMemoryOrganization>) -> Engine {
    let session = OrgSession::new(org, ExecutionContext::new(), RetryConfig::no_retry());
    Engine::new(session, Root { id: ROOT.into() })
}

#[tokio::test]
async fn walk_visits_every_node_exactly_once() {
    for (name, generated) in shapes() {
        let org = Arc::new(generated.org);
        let engine = engine(org.clone());

        let entries = engine.walker().collect().await.unwrap();

        let mut seen = HashSet::new();
        for entry in &entries {
            assert!(seen.insert(entry.node.id().to_string()), "{name}: duplicate {}", entry.node.id());
        }
        assert_eq!(entries.len(), org.node_count() + 1, "{name}");
        assert!(matches!(entries[0].node, OrgNode::Root(_)), "{name}");
    }
}

#[tokio::test]
async fn walk_depths_follow_parent_links() {
    for (name, generated) in shapes() {
        let engine = engine(Arc::new(generated.org));
        let entries = engine.walker().collect().await.unwrap();

        let depth_of: HashMap<&str, usize> =
            entries.iter().map(|e| (e.node.id(), e.depth)).collect();
        for entry in &entries[1..] {
            let parent = entry.node.parent_id().expect("non-root has a parent");
            assert_eq!(depth_of[parent] + 1, entry.depth, "{name}: {}", entry.node.id());
        }
    }
}

#[tokio::test]
async fn every_account_has_a_unique_root_to_account_path() {
    for (name, generated) in shapes() {
        let engine = engine(Arc::new(generated.org));

        for account_id in &generated.accounts {
            let PathOutcome::Found(nodes) = engine.path_finder().find_path(account_id).await.unwrap()
            else {
                panic!("{name}: {account_id} not found");
            };
            assert_eq!(nodes.first().map(OrgNode::id), Some(ROOT), "{name}");
            assert_eq!(nodes.last().map(OrgNode::id), Some(account_id.as_str()), "{name}");
            for pair in nodes.windows(2) {
                assert_eq!(pair[1].parent_id(), Some(pair[0].id()), "{name}");
            }
        }
    }
}

#[tokio::test]
async fn resolved_policies_match_ancestor_union() {
    for (name, generated) in shapes() {
        let org = Arc::new(generated.org);
        // fresh engine, so parents come from ListParents rather than a walk
        let engine = engine(org.clone());

        for account_id in &generated.accounts {
            let resolved = engine.policies().resolve(account_id).await.unwrap();
            assert_eq!(&resolved, &generated.expected_policies[account_id], "{name}: {account_id}");

            let unique: HashSet<&String> = resolved.iter().collect();
            assert_eq!(unique.len(), resolved.len(), "{name}: duplicates in {resolved:?}");
        }

        // each node's direct policies are fetched at most once
        assert!(org.calls(Operation::ListPoliciesForTarget) <= org.node_count() + 1, "{name}");
    }
}
