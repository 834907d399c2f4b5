//! quicksight.template

use std::collections::HashMap;

use quill_core::differ::has_change;
use quill_core::identifier::IdFormat;
use quill_core::provider::{ProviderError, ProviderResult};
use quill_core::resource::{Resource, ResourceId, State, Value};
use quill_core::wait::wait_for;

use super::{
    classify_status, diff_permissions, found, one_of, permissions_from_value,
    permissions_to_value, required_string, split_identifier, string_attr, wait_error,
};
use crate::QuickSightProvider;
use crate::arn::template_arn;
use crate::models::{DataSetReference, ObjectKey, Template, TemplateRequest, TemplateSource};
use crate::tags::{tags_from_map, tags_to_map};

pub const TEMPLATE_ID: IdFormat = IdFormat::new(&["AWS_ACCOUNT_ID", "TEMPLATE_ID"]);

pub fn parse_identifier(identifier: &str) -> ProviderResult<ObjectKey> {
    let [account_id, template_id] = split_identifier(&TEMPLATE_ID, identifier)?;
    Ok(ObjectKey::new(account_id, template_id))
}

/// Typed configuration of a template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateConfig {
    pub request: TemplateRequest,
}

impl TemplateConfig {
    pub fn from_resource(resource: &Resource, default_account: &str) -> ProviderResult<Self> {
        let attrs = &resource.attributes;
        let id = &resource.id;

        let account_id =
            string_attr(attrs, "aws_account_id").unwrap_or_else(|| default_account.to_string());
        let template_id = required_string(attrs, "template_id", id)?;

        Ok(Self {
            request: TemplateRequest {
                key: ObjectKey::new(account_id, template_id),
                name: string_attr(attrs, "name"),
                source: source_entity(attrs, id)?,
                version_description: string_attr(attrs, "version_description"),
                permissions: permissions_from_value(attrs.get("permission"), id)?,
                tags: attrs
                    .get("tags")
                    .and_then(Value::as_map)
                    .map(tags_from_map)
                    .unwrap_or_default(),
            },
        })
    }

    pub fn identifier(&self) -> String {
        let key = &self.request.key;
        TEMPLATE_ID.encode(&[key.account_id.as_str(), key.object_id.as_str()])
    }
}

fn source_entity(
    attrs: &HashMap<String, Value>,
    id: &ResourceId,
) -> ProviderResult<TemplateSource> {
    let (kind, source) = one_of(attrs, "source_entity", id)?;
    let arn = required_string(source, "arn", id)?;

    match kind {
        "source_analysis" => {
            let data_set_references = source
                .get("data_set_references")
                .and_then(Value::as_list)
                .unwrap_or_default()
                .iter()
                .map(|item| {
                    let reference = item.as_map().ok_or_else(|| {
                        ProviderError::invalid_config("data_set_references entries must be blocks")
                            .for_resource(id.clone())
                    })?;
                    Ok(DataSetReference {
                        data_set_arn: required_string(reference, "data_set_arn", id)?,
                        data_set_placeholder: required_string(
                            reference,
                            "data_set_placeholder",
                            id,
                        )?,
                    })
                })
                .collect::<ProviderResult<Vec<_>>>()?;
            Ok(TemplateSource::Analysis {
                arn,
                data_set_references,
            })
        }
        "source_template" => Ok(TemplateSource::Template { arn }),
        other => Err(ProviderError::invalid_config(format!(
            "unknown source_entity block: {}",
            other
        ))
        .for_resource(id.clone())),
    }
}

fn template_attributes(key: &ObjectKey, template: &Template) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert("arn".to_string(), Value::string(&template.arn));
    attributes.insert("aws_account_id".to_string(), Value::string(&key.account_id));
    attributes.insert(
        "template_id".to_string(),
        Value::string(&template.template_id),
    );
    if let Some(name) = &template.name {
        attributes.insert("name".to_string(), Value::string(name));
    }
    if let Some(description) = &template.version_description {
        attributes.insert(
            "version_description".to_string(),
            Value::string(description),
        );
    }
    if let Some(number) = template.version_number {
        attributes.insert("version_number".to_string(), Value::Int(number));
    }
    if let Some(status) = &template.status {
        attributes.insert("status".to_string(), Value::string(status.as_str()));
    }
    if let Some(source) = &template.source_entity_arn {
        attributes.insert("source_entity_arn".to_string(), Value::string(source));
    }
    attributes
}

impl QuickSightProvider {
    pub(crate) async fn read_template(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let key = parse_identifier(identifier)?;
        let client = &self.client;
        let key_ref = &key;

        let template = match wait_for(
            identifier,
            &self.wait,
            move || async move { found(client.describe_template(key_ref).await) },
            |t: &Template| classify_status(t.status.as_ref()),
        )
        .await
        {
            Ok(template) => template,
            Err(e) if e.is_not_found() => {
                log::debug!("QuickSight Template {} does not exist", identifier);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => {
                return Err(wait_error(
                    e,
                    &format!("Error describing QuickSight Template ({})", identifier),
                    id,
                ));
            }
        };

        let mut attributes = template_attributes(&key, &template);

        let permissions = self
            .client
            .describe_template_permissions(&key)
            .await
            .map_err(|e| {
                e.into_provider_error(
                    &format!("Error describing QuickSight Template permissions ({})", identifier),
                    id,
                )
            })?;
        attributes.insert("permission".to_string(), permissions_to_value(&permissions));

        let tags = self.client.list_tags(&template.arn).await.map_err(|e| {
            e.into_provider_error(
                &format!("Error listing QuickSight Template tags ({})", identifier),
                id,
            )
        })?;
        attributes.insert("tags".to_string(), Value::Map(tags_to_map(&tags)));

        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    pub(crate) async fn create_template(&self, resource: &Resource) -> ProviderResult<State> {
        let config = TemplateConfig::from_resource(resource, &self.account_id)?;

        self.client
            .create_template(&config.request)
            .await
            .map_err(|e| e.into_provider_error("Error creating QuickSight Template", &resource.id))?;

        let identifier = config.identifier();
        log::info!("Created QuickSight Template {}", identifier);

        self.read_template(&resource.id, &identifier).await
    }

    pub(crate) async fn update_template(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let key = parse_identifier(identifier)?;
        let mut config = TemplateConfig::from_resource(to, &key.account_id)?;
        config.request.key = key.clone();

        // Every UpdateTemplate call publishes a new template version.
        match self.client.update_template(&config.request).await {
            Ok(()) => log::info!("Updated QuickSight Template {}", identifier),
            Err(e) if e.is_not_found() => {
                log::warn!("QuickSight Template {} is already gone", identifier);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => {
                return Err(e.into_provider_error(
                    &format!("Error updating QuickSight Template {}", identifier),
                    id,
                ));
            }
        }

        if has_change(&from.attributes, &to.attributes, "permission") {
            let old = permissions_from_value(from.attributes.get("permission"), id)?;
            let (grant, revoke) = diff_permissions(&old, &config.request.permissions);
            if !grant.is_empty() || !revoke.is_empty() {
                self.client
                    .update_template_permissions(&key, &grant, &revoke)
                    .await
                    .map_err(|e| {
                        e.into_provider_error(
                            &format!(
                                "Error updating QuickSight Template permissions {}",
                                identifier
                            ),
                            id,
                        )
                    })?;
            }
        }

        if has_change(&from.attributes, &to.attributes, "tags") {
            let arn = from
                .attributes
                .get("arn")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| template_arn(&self.region, &key.account_id, &key.object_id));
            self.update_tags(id, &arn, from, to).await?;
        }

        self.read_template(id, identifier).await
    }

    pub(crate) async fn delete_template(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        let key = parse_identifier(identifier)?;

        match self.client.delete_template(&key).await {
            Ok(()) => {
                log::info!("Deleted QuickSight Template {}", identifier);
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into_provider_error(
                &format!("Error deleting QuickSight Template {}", identifier),
                id,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::map_of;

    fn analysis_source() -> Value {
        map_of(vec![(
            "source_analysis",
            map_of(vec![
                (
                    "arn",
                    Value::string("arn:aws:quicksight:us-east-1:111111111111:analysis/sales"),
                ),
                (
                    "data_set_references",
                    Value::List(vec![map_of(vec![
                        (
                            "data_set_arn",
                            Value::string("arn:aws:quicksight:us-east-1:111111111111:dataset/orders"),
                        ),
                        ("data_set_placeholder", Value::string("orders")),
                    ])]),
                ),
            ]),
        )])
    }

    #[test]
    fn config_from_analysis_source() {
        let resource = Resource::new("quicksight.template", "report")
            .with_attribute("template_id", Value::string("report"))
            .with_attribute("source_entity", analysis_source());

        let config = TemplateConfig::from_resource(&resource, "111111111111").unwrap();
        assert_eq!(config.identifier(), "111111111111/report");
        match &config.request.source {
            TemplateSource::Analysis {
                data_set_references,
                ..
            } => assert_eq!(data_set_references[0].data_set_placeholder, "orders"),
            other => panic!("expected analysis source, got {:?}", other),
        }
    }

    #[test]
    fn parse_identifier_requires_two_segments() {
        assert_eq!(
            parse_identifier("111111111111/report").unwrap(),
            ObjectKey::new("111111111111", "report")
        );
        assert!(parse_identifier("111111111111/default/report").is_err());
    }
}
