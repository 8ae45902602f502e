use std::fmt;

use crate::models::OrgNode;

/// Indentation per tree level.
pub const INDENT: &str = "    ";

const MANAGEMENT_SUFFIX: &str = " (Management Account)";

/// A visited node ready to print, with its effective policies if it is an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNode {
    pub node: OrgNode,
    pub depth: usize,
    pub policies: Vec<String>,
}

impl RenderedNode {
    pub fn new(node: OrgNode, depth: usize, policies: Vec<String>) -> Self {
        Self {
            node,
            depth,
            policies,
        }
    }
}

impl fmt::Display for RenderedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str(INDENT)?;
        }

        match &self.node {
            OrgNode::Root(root) => write!(f, "|-- Root: [{}]", root.id),
            OrgNode::OrganizationalUnit(ou) => write!(f, "|-- OU: {} [{}]", ou.name, ou.id),
            OrgNode::Account(account) => {
                let suffix = if account.is_management {
                    MANAGEMENT_SUFFIX
                } else {
                    ""
                };
                write!(
                    f,
                    "|-- Account: {}{} [{}] (SCPs: {})",
                    account.name,
                    suffix,
                    account.id,
                    self.policies.join(", ")
                )
            }
        }
    }
}

/// Renders nodes as newline-terminated tree lines.
pub fn render<I>(nodes: I) -> String
where
    I: IntoIterator<Item = RenderedNode>,
{
    nodes
        .into_iter()
        .map(|node| format!("{}\n", node))
        .collect()
}
