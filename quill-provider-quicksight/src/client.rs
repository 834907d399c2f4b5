//! QuickSight API client abstraction
//!
//! The provider talks to QuickSight only through [`QuickSightApi`]. The
//! production implementation lives in [`crate::sdk`]; tests inject an
//! in-memory implementation instead.

use async_trait::async_trait;
use quill_core::provider::{ErrorKind, ProviderError};
use quill_core::resource::ResourceId;
use thiserror::Error;

use crate::models::{
    DataSource, DataSourceRequest, Group, GroupKey, GroupRequest, ObjectKey, Permission, Tag,
    Template, TemplateRequest,
};

/// Error returned by a QuickSight API call
#[derive(Debug, Error)]
pub enum ApiError {
    /// The addressed object does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The request could not be built from the given input
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other service or transport failure
    #[error("{operation} failed: {message}")]
    Service { operation: String, message: String },
}

impl ApiError {
    pub fn service(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Service {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Convert into a provider error attributed to `id`
    pub fn into_provider_error(self, context: &str, id: &ResourceId) -> ProviderError {
        let kind = match &self {
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::InvalidRequest(_) => ErrorKind::InvalidConfig,
            ApiError::Service { .. } => ErrorKind::Transport,
        };
        ProviderError::new(format!("{}: {}", context, self))
            .with_kind(kind)
            .for_resource(id.clone())
            .with_cause(self)
    }
}

/// Operations of the QuickSight API used by the provider
#[async_trait]
pub trait QuickSightApi: Send + Sync {
    // Groups
    async fn create_group(&self, request: &GroupRequest) -> Result<Group, ApiError>;
    async fn describe_group(&self, key: &GroupKey) -> Result<Group, ApiError>;
    async fn update_group(&self, request: &GroupRequest) -> Result<Group, ApiError>;
    async fn delete_group(&self, key: &GroupKey) -> Result<(), ApiError>;

    // Templates
    /// Returns the ARN of the new template
    async fn create_template(&self, request: &TemplateRequest) -> Result<String, ApiError>;
    async fn describe_template(&self, key: &ObjectKey) -> Result<Template, ApiError>;
    async fn update_template(&self, request: &TemplateRequest) -> Result<(), ApiError>;
    async fn delete_template(&self, key: &ObjectKey) -> Result<(), ApiError>;
    async fn describe_template_permissions(
        &self,
        key: &ObjectKey,
    ) -> Result<Vec<Permission>, ApiError>;
    async fn update_template_permissions(
        &self,
        key: &ObjectKey,
        grant: &[Permission],
        revoke: &[Permission],
    ) -> Result<(), ApiError>;

    // Data sources
    /// Returns the ARN of the new data source
    async fn create_data_source(&self, request: &DataSourceRequest) -> Result<String, ApiError>;
    async fn describe_data_source(&self, key: &ObjectKey) -> Result<DataSource, ApiError>;
    async fn update_data_source(&self, request: &DataSourceRequest) -> Result<(), ApiError>;
    async fn delete_data_source(&self, key: &ObjectKey) -> Result<(), ApiError>;
    async fn describe_data_source_permissions(
        &self,
        key: &ObjectKey,
    ) -> Result<Vec<Permission>, ApiError>;
    async fn update_data_source_permissions(
        &self,
        key: &ObjectKey,
        grant: &[Permission],
        revoke: &[Permission],
    ) -> Result<(), ApiError>;

    // Tags
    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, ApiError>;
    async fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<(), ApiError>;
    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found_kind() {
        let id = ResourceId::new("quicksight.group", "analysts");
        let err = ApiError::NotFound("group analysts".to_string())
            .into_provider_error("Failed to read group", &id);
        assert!(err.is_not_found());
        assert_eq!(err.resource_id, Some(id));
    }

    #[test]
    fn service_error_is_transport() {
        let id = ResourceId::new("quicksight.template", "report");
        let err = ApiError::service("DescribeTemplate", "throttled")
            .into_provider_error("Failed to read template", &id);
        assert_eq!(err.kind, ErrorKind::Transport);
        assert_eq!(
            err.message,
            "Failed to read template: DescribeTemplate failed: throttled"
        );
    }
}
