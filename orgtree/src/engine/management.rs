use orgtree_core::AppError;
use tokio::sync::OnceCell;

use crate::services::OrgSession;

/// Flags the organization's management account.
///
/// The management account id is fetched at most once per invocation.
pub struct ManagementAccountDetector {
    session: OrgSession,
    management_id: OnceCell<String>,
}

impl ManagementAccountDetector {
    pub fn new(session: OrgSession) -> Self {
        Self {
            session,
            management_id: OnceCell::new(),
        }
    }

    pub async fn management_account_id(&self) -> Result<&str, AppError> {
        self.management_id
            .get_or_try_init(|| self.session.management_account_id())
            .await
            .map(String::as_str)
    }

    pub async fn is_management(&self, account_id: &str) -> Result<bool, AppError> {
        Ok(self.management_account_id().await? == account_id)
    }
}
