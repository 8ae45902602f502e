//! Deterministic in-process organization.
//!
//! Children are returned in insertion order. Every call is counted per
//! [`Operation`], and throttling, failures and latency can be injected, which
//! makes this the fixture for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{OrgApiError, OrganizationsApi};
use crate::models::{ChildType, NodeDescription, PolicySummary};

/// Target that matches every node when injecting failures.
pub const ANY_TARGET: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListRoots,
    ListChildren,
    DescribeAccount,
    DescribeOu,
    ListPoliciesForTarget,
    ListParents,
    DescribeOrganization,
}

#[derive(Debug, Default)]
pub struct InMemoryOrganization {
    roots: Vec<String>,
    names: HashMap<String, String>,
    kinds: HashMap<String, ChildType>,
    parents: HashMap<String, Vec<String>>,
    children: HashMap<(String, ChildType), Vec<String>>,
    policies: HashMap<String, Vec<String>>,
    management_account: Option<String>,
    latency: Option<Duration>,
    calls: DashMap<Operation, usize>,
    throttles: DashMap<Operation, usize>,
    failures: DashMap<(Operation, String), OrgApiError>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Counts a call as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryOrganization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, id: &str) -> Self {
        self.roots.push(id.to_string());
        self
    }

    pub fn with_ou(mut self, id: &str, name: &str, parent_id: &str) -> Self {
        self.insert(id, name, parent_id, ChildType::OrganizationalUnit);
        self
    }

    pub fn with_account(mut self, id: &str, name: &str, parent_id: &str) -> Self {
        self.insert(id, name, parent_id, ChildType::Account);
        self
    }

    /// Marks `id` as the organization's management account.
    pub fn with_management_account(mut self, id: &str) -> Self {
        self.management_account = Some(id.to_string());
        self
    }

    pub fn with_policy(mut self, target_id: &str, policy_name: &str) -> Self {
        self.policies
            .entry(target_id.to_string())
            .or_default()
            .push(policy_name.to_string());
        self
    }

    /// Lists an existing node under an additional parent without changing
    /// its recorded parent, simulating inconsistent provider data.
    pub fn with_extra_listing(mut self, parent_id: &str, child_id: &str) -> Self {
        if let Some(kind) = self.kinds.get(child_id).copied() {
            self.children
                .entry((parent_id.to_string(), kind))
                .or_default()
                .push(child_id.to_string());
        }
        self
    }

    /// Makes `ListParents` for `id` return an empty list, simulating a
    /// node the provider has detached from the tree.
    pub fn without_parents(mut self, id: &str) -> Self {
        self.parents.insert(id.to_string(), Vec::new());
        self
    }

    /// Delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The next `times` calls of `operation` fail with [`OrgApiError::Throttled`].
    pub fn throttle(&self, operation: Operation, times: usize) {
        self.throttles.insert(operation, times);
    }

    /// Calls of `operation` against `target_id` (or [`ANY_TARGET`]) fail with `error`.
    pub fn fail_on(&self, operation: Operation, target_id: &str, error: OrgApiError) {
        self.failures
            .insert((operation, target_id.to_string()), error);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.get(&operation).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of OUs and accounts, excluding roots.
    pub fn node_count(&self) -> usize {
        self.kinds.len()
    }

    fn insert(&mut self, id: &str, name: &str, parent_id: &str, kind: ChildType) {
        self.names.insert(id.to_string(), name.to_string());
        self.kinds.insert(id.to_string(), kind);
        self.parents
            .entry(id.to_string())
            .or_default()
            .push(parent_id.to_string());
        self.children
            .entry((parent_id.to_string(), kind))
            .or_default()
            .push(id.to_string());
    }

    async fn record(&self, operation: Operation, target_id: &str) -> Result<(), OrgApiError> {
        *self.calls.entry(operation).or_insert(0) += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(mut remaining) = self.throttles.get_mut(&operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(OrgApiError::Throttled(format!(
                    "{:?} rate exceeded",
                    operation
                )));
            }
        }

        for key in [
            (operation, target_id.to_string()),
            (operation, ANY_TARGET.to_string()),
        ] {
            if let Some(error) = self.failures.get(&key) {
                return Err(error.clone());
            }
        }

        Ok(())
    }

    fn describe(&self, id: &str, kind: ChildType) -> Result<NodeDescription, OrgApiError> {
        match (self.kinds.get(id), self.names.get(id)) {
            (Some(found), Some(name)) if *found == kind => Ok(NodeDescription {
                id: id.to_string(),
                name: name.clone(),
            }),
            _ => Err(OrgApiError::NotFound(format!("{} {}", kind, id))),
        }
    }

    fn exists(&self, id: &str) -> bool {
        self.kinds.contains_key(id) || self.roots.iter().any(|r| r == id)
    }
}

#[async_trait]
impl OrganizationsApi for InMemoryOrganization {
    async fn list_roots(&self) -> Result<Vec<String>, OrgApiError> {
        self.record(Operation::ListRoots, ANY_TARGET).await?;
        Ok(self.roots.clone())
    }

    async fn list_children(
        &self,
        parent_id: &str,
        child_type: ChildType,
    ) -> Result<Vec<String>, OrgApiError> {
        self.record(Operation::ListChildren, parent_id).await?;
        if !self.exists(parent_id) {
            return Err(OrgApiError::NotFound(format!("parent {}", parent_id)));
        }
        Ok(self
            .children
            .get(&(parent_id.to_string(), child_type))
            .cloned()
            .unwrap_or_default())
    }

    async fn describe_account(&self, account_id: &str) -> Result<NodeDescription, OrgApiError> {
        self.record(Operation::DescribeAccount, account_id).await?;
        self.describe(account_id, ChildType::Account)
    }

    async fn describe_ou(&self, ou_id: &str) -> Result<NodeDescription, OrgApiError> {
        self.record(Operation::DescribeOu, ou_id).await?;
        self.describe(ou_id, ChildType::OrganizationalUnit)
    }

    async fn list_policies_for_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<PolicySummary>, OrgApiError> {
        self.record(Operation::ListPoliciesForTarget, target_id)
            .await?;
        if !self.exists(target_id) {
            return Err(OrgApiError::NotFound(format!("target {}", target_id)));
        }
        Ok(self
            .policies
            .get(target_id)
            .map(|names| {
                names
                    .iter()
                    .map(|name| PolicySummary { name: name.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_parents(&self, child_id: &str) -> Result<Vec<String>, OrgApiError> {
        self.record(Operation::ListParents, child_id).await?;
        self.parents
            .get(child_id)
            .cloned()
            .ok_or_else(|| OrgApiError::NotFound(format!("child {}", child_id)))
    }

    async fn management_account_id(&self) -> Result<String, OrgApiError> {
        self.record(Operation::DescribeOrganization, ANY_TARGET)
            .await?;
        self.management_account
            .clone()
            .ok_or_else(|| OrgApiError::Service("organization has no management account".into()))
    }
}
