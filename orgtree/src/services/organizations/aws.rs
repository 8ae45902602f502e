use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_organizations::config::Region;
use aws_sdk_organizations::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_organizations::types::{ChildType as AwsChildType, PolicyType};
use aws_sdk_organizations::Client;
use orgtree_core::AppError;

use super::{OrgApiError, OrganizationsApi};
use crate::config::AwsConfig;
use crate::models::{ChildType, NodeDescription, PolicySummary};

/// Organizations is a global service served out of us-east-1.
const DEFAULT_REGION: &str = "us-east-1";

/// [`OrganizationsApi`] backed by the AWS Organizations SDK.
#[derive(Clone)]
pub struct AwsOrganizations {
    client: Client,
}

impl AwsOrganizations {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Loads credentials, profile and region through the standard AWS provider
    /// chains. Credentials are resolved here, so a machine without any fails
    /// with a configuration error before the organization is touched.
    pub async fn from_config(aws: &AwsConfig) -> Result<Self, AppError> {
        let region = RegionProviderChain::first_try(aws.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(DEFAULT_REGION);

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(profile) = &aws.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!(
                "no AWS credentials provider could be configured"
            ))
        })?;
        provider.provide_credentials().await.map_err(|err| {
            AppError::ConfigError(anyhow::anyhow!(
                "AWS credentials could not be loaded: {}",
                DisplayErrorContext(&err)
            ))
        })?;

        tracing::debug!(
            region = ?sdk_config.region(),
            profile = ?aws.profile,
            "AWS Organizations client configured"
        );

        Ok(Self::new(Client::new(&sdk_config)))
    }
}

fn map_sdk_error<E, R>(err: SdkError<E, R>) -> OrgApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();

    if matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)
    ) {
        return OrgApiError::Network(message);
    }

    match err.code() {
        Some("TooManyRequestsException") => OrgApiError::Throttled(message),
        Some(code) if code.starts_with("AccessDenied") => OrgApiError::AccessDenied(message),
        Some("AWSOrganizationsNotInUseException") => OrgApiError::AccessDenied(message),
        Some(code) if code.ends_with("NotFoundException") => OrgApiError::NotFound(message),
        _ => OrgApiError::Service(message),
    }
}

fn required(value: Option<&str>, what: &str) -> Result<String, OrgApiError> {
    value
        .map(str::to_string)
        .ok_or_else(|| OrgApiError::Service(format!("response is missing {}", what)))
}

#[async_trait]
impl OrganizationsApi for AwsOrganizations {
    async fn list_roots(&self) -> Result<Vec<String>, OrgApiError> {
        let pages = self
            .client
            .list_roots()
            .into_paginator()
            .send()
            .try_collect()
            .await
            .map_err(map_sdk_error)?;

        pages
            .iter()
            .flat_map(|page| page.roots())
            .map(|r| required(r.id(), "root id"))
            .collect()
    }

    async fn list_children(
        &self,
        parent_id: &str,
        child_type: ChildType,
    ) -> Result<Vec<String>, OrgApiError> {
        let aws_child_type = match child_type {
            ChildType::Account => AwsChildType::Account,
            ChildType::OrganizationalUnit => AwsChildType::OrganizationalUnit,
        };

        let pages = self
            .client
            .list_children()
            .parent_id(parent_id)
            .child_type(aws_child_type)
            .into_paginator()
            .send()
            .try_collect()
            .await
            .map_err(map_sdk_error)?;

        pages
            .iter()
            .flat_map(|page| page.children())
            .map(|c| required(c.id(), "child id"))
            .collect()
    }

    async fn describe_account(&self, account_id: &str) -> Result<NodeDescription, OrgApiError> {
        let output = self
            .client
            .describe_account()
            .account_id(account_id)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let account = output
            .account()
            .ok_or_else(|| OrgApiError::NotFound(format!("account {}", account_id)))?;

        Ok(NodeDescription {
            id: required(account.id(), "account id")?,
            name: required(account.name(), "account name")?,
        })
    }

    async fn describe_ou(&self, ou_id: &str) -> Result<NodeDescription, OrgApiError> {
        let output = self
            .client
            .describe_organizational_unit()
            .organizational_unit_id(ou_id)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let ou = output
            .organizational_unit()
            .ok_or_else(|| OrgApiError::NotFound(format!("organizational unit {}", ou_id)))?;

        Ok(NodeDescription {
            id: required(ou.id(), "organizational unit id")?,
            name: required(ou.name(), "organizational unit name")?,
        })
    }

    async fn list_policies_for_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<PolicySummary>, OrgApiError> {
        let pages = self
            .client
            .list_policies_for_target()
            .target_id(target_id)
            .filter(PolicyType::ServiceControlPolicy)
            .into_paginator()
            .send()
            .try_collect()
            .await
            .map_err(map_sdk_error)?;

        pages
            .iter()
            .flat_map(|page| page.policies())
            .map(|p| {
                Ok(PolicySummary {
                    name: required(p.name(), "policy name")?,
                })
            })
            .collect()
    }

    async fn list_parents(&self, child_id: &str) -> Result<Vec<String>, OrgApiError> {
        let pages = self
            .client
            .list_parents()
            .child_id(child_id)
            .into_paginator()
            .send()
            .try_collect()
            .await
            .map_err(map_sdk_error)?;

        pages
            .iter()
            .flat_map(|page| page.parents())
            .map(|p| required(p.id(), "parent id"))
            .collect()
    }

    async fn management_account_id(&self) -> Result<String, OrgApiError> {
        let output = self
            .client
            .describe_organization()
            .send()
            .await
            .map_err(map_sdk_error)?;

        let organization = output
            .organization()
            .ok_or_else(|| OrgApiError::Service("organization missing from response".into()))?;

        required(organization.master_account_id(), "master account id")
    }
}
