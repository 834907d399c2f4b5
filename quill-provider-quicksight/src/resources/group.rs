//! quicksight.group

use std::collections::HashMap;

use quill_core::identifier::IdFormat;
use quill_core::provider::ProviderResult;
use quill_core::resource::{Resource, ResourceId, State, Value};

use super::{required_string, split_identifier, string_attr};
use crate::QuickSightProvider;
use crate::models::{Group, GroupKey, GroupRequest};
use crate::schemas::group::DEFAULT_NAMESPACE;

pub const GROUP_ID: IdFormat = IdFormat::new(&["AWS_ACCOUNT_ID", "NAMESPACE", "GROUP_NAME"]);

/// Typed configuration of a group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupConfig {
    pub key: GroupKey,
    pub description: Option<String>,
}

impl GroupConfig {
    pub fn from_resource(resource: &Resource, default_account: &str) -> ProviderResult<Self> {
        let attrs = &resource.attributes;
        Ok(Self {
            key: GroupKey {
                account_id: string_attr(attrs, "aws_account_id")
                    .unwrap_or_else(|| default_account.to_string()),
                namespace: string_attr(attrs, "namespace")
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
                group_name: required_string(attrs, "group_name", &resource.id)?,
            },
            description: string_attr(attrs, "description"),
        })
    }

    pub fn identifier(&self) -> String {
        GROUP_ID.encode(&[
            self.key.account_id.as_str(),
            self.key.namespace.as_str(),
            self.key.group_name.as_str(),
        ])
    }

    fn request(&self) -> GroupRequest {
        GroupRequest {
            key: self.key.clone(),
            description: self.description.clone(),
        }
    }
}

pub fn parse_identifier(identifier: &str) -> ProviderResult<GroupKey> {
    let [account_id, namespace, group_name] = split_identifier(&GROUP_ID, identifier)?;
    Ok(GroupKey {
        account_id,
        namespace,
        group_name,
    })
}

fn group_attributes(key: &GroupKey, group: &Group) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert("arn".to_string(), Value::string(&group.arn));
    attributes.insert("aws_account_id".to_string(), Value::string(&key.account_id));
    attributes.insert("namespace".to_string(), Value::string(&key.namespace));
    attributes.insert("group_name".to_string(), Value::string(&group.group_name));
    if let Some(description) = &group.description {
        attributes.insert("description".to_string(), Value::string(description));
    }
    if let Some(principal_id) = &group.principal_id {
        attributes.insert("principal_id".to_string(), Value::string(principal_id));
    }
    attributes
}

impl QuickSightProvider {
    pub(crate) async fn read_group(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let key = parse_identifier(identifier)?;

        match self.client.describe_group(&key).await {
            Ok(group) => Ok(State::existing(id.clone(), group_attributes(&key, &group))
                .with_identifier(identifier)),
            Err(e) if e.is_not_found() => {
                log::debug!("QuickSight Group {} does not exist", identifier);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(e.into_provider_error(
                &format!("Error describing QuickSight Group ({})", identifier),
                id,
            )),
        }
    }

    pub(crate) async fn create_group(&self, resource: &Resource) -> ProviderResult<State> {
        let config = GroupConfig::from_resource(resource, &self.account_id)?;

        let group = self
            .client
            .create_group(&config.request())
            .await
            .map_err(|e| e.into_provider_error("Error creating QuickSight Group", &resource.id))?;

        let identifier = GROUP_ID.encode(&[
            config.key.account_id.as_str(),
            config.key.namespace.as_str(),
            group.group_name.as_str(),
        ]);
        log::info!("Created QuickSight Group {}", identifier);

        self.read_group(&resource.id, &identifier).await
    }

    pub(crate) async fn update_group(
        &self,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
    ) -> ProviderResult<State> {
        let key = parse_identifier(identifier)?;
        let request = GroupRequest {
            key,
            description: string_attr(&to.attributes, "description"),
        };

        match self.client.update_group(&request).await {
            Ok(_) => log::info!("Updated QuickSight Group {}", identifier),
            Err(e) if e.is_not_found() => {
                log::warn!("QuickSight Group {} is already gone", identifier);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => {
                return Err(e.into_provider_error(
                    &format!("Error updating QuickSight Group {}", identifier),
                    id,
                ));
            }
        }

        self.read_group(id, identifier).await
    }

    pub(crate) async fn delete_group(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        let key = parse_identifier(identifier)?;

        match self.client.delete_group(&key).await {
            Ok(()) => {
                log::info!("Deleted QuickSight Group {}", identifier);
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into_provider_error(
                &format!("Error deleting QuickSight Group {}", identifier),
                id,
            )),
        }
    }
}
