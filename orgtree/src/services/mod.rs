pub mod organizations;
pub mod session;

pub use organizations::{AwsOrganizations, InMemoryOrganization, OrgApiError, OrganizationsApi};
pub use session::{OrgSession, DEFAULT_CONCURRENCY};
