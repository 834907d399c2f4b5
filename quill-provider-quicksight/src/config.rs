//! Provider configuration

use std::time::Duration;

use quill_core::wait::WaitConfig;

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Settings of a [`crate::QuickSightProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub region: String,
    /// Account used when a resource does not set `aws_account_id`;
    /// resolved from the caller identity when absent
    pub account_id: Option<String>,
    pub wait: WaitConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl ProviderConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: None,
            wait: WaitConfig::default(),
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.wait = self.wait.with_max_wait(max_wait);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.account_id, None);
        assert_eq!(config.wait, WaitConfig::default());
    }

    #[test]
    fn builder() {
        let config = ProviderConfig::new("eu-west-1")
            .with_account_id("111111111111")
            .with_max_wait(Duration::from_secs(30));
        assert_eq!(config.account_id.as_deref(), Some("111111111111"));
        assert_eq!(config.wait.max_wait, Duration::from_secs(30));
        assert_eq!(config.wait.poll_interval, WaitConfig::default().poll_interval);
    }
}
