//! Organization hierarchy entities.

use std::fmt;

/// Length of an AWS account identifier.
pub const ACCOUNT_ID_LEN: usize = 12;

/// Kinds of children a parent can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildType {
    Account,
    OrganizationalUnit,
}

impl fmt::Display for ChildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildType::Account => write!(f, "ACCOUNT"),
            ChildType::OrganizationalUnit => write!(f, "ORGANIZATIONAL_UNIT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub is_management: bool,
}

/// A node of the organization tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgNode {
    Root(Root),
    OrganizationalUnit(OrganizationalUnit),
    Account(Account),
}

impl OrgNode {
    pub fn id(&self) -> &str {
        match self {
            OrgNode::Root(root) => &root.id,
            OrgNode::OrganizationalUnit(ou) => &ou.id,
            OrgNode::Account(account) => &account.id,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            OrgNode::Root(_) => None,
            OrgNode::OrganizationalUnit(ou) => Some(&ou.parent_id),
            OrgNode::Account(account) => Some(&account.parent_id),
        }
    }

    pub fn is_account(&self) -> bool {
        matches!(self, OrgNode::Account(_))
    }
}

/// Attributes returned when describing an account or OU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescription {
    pub id: String,
    pub name: String,
}

/// A policy attached to a node. The name is the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicySummary {
    pub name: String,
}

/// True for exactly twelve ASCII digits.
pub fn is_account_id(value: &str) -> bool {
    value.len() == ACCOUNT_ID_LEN && value.bytes().all(|b| b.is_ascii_digit())
}
