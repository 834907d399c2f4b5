//! Quill QuickSight Provider
//!
//! Manages QuickSight groups, templates and data sources. Remote objects are
//! addressed by composite identifiers such as `111111111111/default/analysts`
//! and asynchronous create/update operations are awaited with
//! [`quill_core::wait::wait_for`].

pub mod arn;
pub mod client;
pub mod config;
pub mod models;
pub mod resources;
pub mod schemas;
pub mod sdk;
pub mod tags;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use aws_config::Region;
use quill_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use quill_core::resource::{Resource, ResourceId, State};
use quill_core::schema::ResourceSchema;
use quill_core::wait::WaitConfig;

use crate::client::QuickSightApi;
use crate::config::ProviderConfig;
use crate::resources::data_source::DataSourceConfig;
use crate::resources::group::GroupConfig;
use crate::resources::template::TemplateConfig;
use crate::schemas::data_source::DATA_SOURCE;
use crate::schemas::group::GROUP;
use crate::schemas::template::TEMPLATE;
use crate::sdk::SdkClient;

/// QuickSight group resource type
pub struct GroupType;

impl ResourceType for GroupType {
    fn name(&self) -> &'static str {
        GROUP
    }

    fn schema(&self) -> ResourceSchema {
        schemas::group::group_schema()
    }
}

/// QuickSight template resource type
pub struct TemplateType;

impl ResourceType for TemplateType {
    fn name(&self) -> &'static str {
        TEMPLATE
    }

    fn schema(&self) -> ResourceSchema {
        schemas::template::template_schema()
    }
}

/// QuickSight data source resource type
pub struct DataSourceType;

impl ResourceType for DataSourceType {
    fn name(&self) -> &'static str {
        DATA_SOURCE
    }

    fn schema(&self) -> ResourceSchema {
        schemas::data_source::data_source_schema()
    }
}

pub struct QuickSightProvider {
    client: Arc<dyn QuickSightApi>,
    region: String,
    account_id: String,
    wait: WaitConfig,
}

impl QuickSightProvider {
    /// Create a provider talking to QuickSight with the default credential chain
    ///
    /// When no account id is configured, the account of the credentials is used.
    pub async fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let account_id = match config.account_id {
            Some(account_id) => account_id,
            None => sdk::resolve_account_id(&sdk_config).await.map_err(|e| {
                ProviderError::invalid_config(format!("Failed to resolve AWS account id: {}", e))
                    .with_cause(e)
            })?,
        };
        log::debug!(
            "QuickSight provider for account {} in {}",
            account_id,
            config.region
        );

        Ok(Self {
            client: Arc::new(SdkClient::new(&sdk_config)),
            region: config.region,
            account_id,
            wait: config.wait,
        })
    }

    /// Create with a specific client (for testing)
    pub fn with_client(
        client: Arc<dyn QuickSightApi>,
        region: impl Into<String>,
        account_id: impl Into<String>,
        wait: WaitConfig,
    ) -> Self {
        Self {
            client,
            region: region.into(),
            account_id: account_id.into(),
            wait,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::invalid_config(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}

impl Provider for QuickSightProvider {
    fn name(&self) -> &'static str {
        "quicksight"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        vec![
            Box::new(GroupType),
            Box::new(TemplateType),
            Box::new(DataSourceType),
        ]
    }

    fn identifier_for(&self, resource: &Resource) -> Option<String> {
        let identifier = match resource.id.resource_type.as_str() {
            GROUP => GroupConfig::from_resource(resource, &self.account_id)
                .map(|c| c.identifier()),
            TEMPLATE => TemplateConfig::from_resource(resource, &self.account_id)
                .map(|c| c.identifier()),
            DATA_SOURCE => DataSourceConfig::from_resource(resource, &self.account_id)
                .map(|c| c.identifier()),
            _ => return None,
        };
        identifier.ok()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(str::to_string);
        Box::pin(async move {
            let Some(identifier) = identifier else {
                return Ok(State::not_found(id));
            };
            match id.resource_type.as_str() {
                GROUP => self.read_group(&id, &identifier).await,
                TEMPLATE => self.read_template(&id, &identifier).await,
                DATA_SOURCE => self.read_data_source(&id, &identifier).await,
                _ => Err(unknown_type(&id)),
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            match resource.id.resource_type.as_str() {
                GROUP => self.create_group(&resource).await,
                TEMPLATE => self.create_template(&resource).await,
                DATA_SOURCE => self.create_data_source(&resource).await,
                _ => Err(unknown_type(&resource.id)),
            }
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            match id.resource_type.as_str() {
                GROUP => self.update_group(&id, &identifier, &to).await,
                TEMPLATE => self.update_template(&id, &identifier, &from, &to).await,
                DATA_SOURCE => self.update_data_source(&id, &identifier, &from, &to).await,
                _ => Err(unknown_type(&id)),
            }
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            match id.resource_type.as_str() {
                GROUP => self.delete_group(&id, &identifier).await,
                TEMPLATE => self.delete_template(&id, &identifier).await,
                DATA_SOURCE => self.delete_data_source(&id, &identifier).await,
                _ => Err(unknown_type(&id)),
            }
        })
    }
}
