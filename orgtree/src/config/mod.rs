use orgtree_core::config::{self as core_config, LogConfig};
use orgtree_core::{AppError, RetryConfig};
use serde::Deserialize;
use std::time::Duration;

use crate::services::DEFAULT_CONCURRENCY;

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Deadline for the whole invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sibling accounts loaded at the same time during a full walk.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsConfig {
    pub profile: Option<String>,
    pub region: Option<String>,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            aws: AwsConfig::default(),
            retry: RetryConfig::default(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

impl ExplorerConfig {
    pub fn load() -> Result<Self, AppError> {
        core_config::load()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Applies command-line overrides on top of the loaded sources.
    pub fn with_overrides(
        mut self,
        profile: Option<String>,
        region: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, AppError> {
        if profile.is_some() {
            self.aws.profile = profile;
        }
        if region.is_some() {
            self.aws.region = region;
        }
        if let Some(secs) = timeout_secs {
            self.timeout_secs = secs;
        }
        if self.timeout_secs == 0 {
            return Err(AppError::ValidationError(
                "timeout must be at least one second".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(AppError::ValidationError(
                "concurrency must be at least one".to_string(),
            ));
        }
        Ok(self)
    }
}
