//! Lifecycle operations of the QuickSight resources
//!
//! Each submodule turns loosely typed attributes into a typed configuration,
//! drives the API client and maps responses back into state attributes.

pub mod data_source;
pub mod group;
pub mod template;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use quill_core::identifier::IdFormat;
use quill_core::provider::{ErrorKind, ProviderError, ProviderResult};
use quill_core::resource::{Resource, ResourceId, State, Value};
use quill_core::wait::{Progress, WaitError};

use crate::QuickSightProvider;
use crate::client::ApiError;
use crate::models::{Permission, ResourceStatus};
use crate::tags::{diff_tags, tag_keys, tags_from_map};

/// Turn a NotFound response into `None` so that the poller can report it
pub(crate) fn found<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Classify a remote status for the poller
pub(crate) fn classify_status(status: Option<&ResourceStatus>) -> Progress {
    match status {
        Some(s) if s.is_in_progress() => Progress::Pending(s.to_string()),
        Some(s) if s.is_failed() => Progress::Failed(s.to_string()),
        _ => Progress::Ready,
    }
}

pub(crate) fn wait_error(
    err: WaitError<ApiError>,
    context: &str,
    id: &ResourceId,
) -> ProviderError {
    match err {
        WaitError::Fetch { source, .. } => source.into_provider_error(context, id),
        other => {
            let kind = match &other {
                WaitError::NotFound { .. } => ErrorKind::NotFound,
                WaitError::Failed { .. } => ErrorKind::OperationFailed,
                _ => ErrorKind::Timeout,
            };
            ProviderError::new(format!("{}: {}", context, other))
                .with_kind(kind)
                .for_resource(id.clone())
        }
    }
}

/// Decode a composite identifier into its fixed number of segments
pub(crate) fn split_identifier<const N: usize>(
    format: &IdFormat,
    identifier: &str,
) -> ProviderResult<[String; N]> {
    let parts = format.decode(identifier)?;
    parts.try_into().map_err(|parts: Vec<String>| {
        ProviderError::new(format!(
            "unexpected format of ID ({}), got {} segments",
            identifier,
            parts.len()
        ))
        .with_kind(ErrorKind::MalformedIdentifier)
    })
}

pub(crate) fn string_attr(attrs: &HashMap<String, Value>, key: &str) -> Option<String> {
    attrs.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn required_string(
    attrs: &HashMap<String, Value>,
    key: &str,
    id: &ResourceId,
) -> ProviderResult<String> {
    string_attr(attrs, key).ok_or_else(|| {
        ProviderError::invalid_config(format!("{} is required", key)).for_resource(id.clone())
    })
}

pub(crate) fn required_int(
    attrs: &HashMap<String, Value>,
    key: &str,
    id: &ResourceId,
) -> ProviderResult<i32> {
    let n = attrs.get(key).and_then(Value::as_int).ok_or_else(|| {
        ProviderError::invalid_config(format!("{} is required", key)).for_resource(id.clone())
    })?;
    i32::try_from(n).map_err(|_| {
        ProviderError::invalid_config(format!("{} is out of range: {}", key, n))
            .for_resource(id.clone())
    })
}

pub(crate) fn block<'a>(
    attrs: &'a HashMap<String, Value>,
    key: &str,
) -> Option<&'a HashMap<String, Value>> {
    attrs.get(key).and_then(Value::as_map)
}

pub(crate) fn required_block<'a>(
    attrs: &'a HashMap<String, Value>,
    key: &str,
    id: &ResourceId,
) -> ProviderResult<&'a HashMap<String, Value>> {
    block(attrs, key).ok_or_else(|| {
        ProviderError::invalid_config(format!("{} block is required", key)).for_resource(id.clone())
    })
}

/// The single configured member of a union block
pub(crate) fn one_of<'a>(
    attrs: &'a HashMap<String, Value>,
    key: &str,
    id: &ResourceId,
) -> ProviderResult<(&'a str, &'a HashMap<String, Value>)> {
    let union = required_block(attrs, key, id)?;
    let mut members = union.iter();
    match (members.next(), members.next()) {
        (Some((name, Value::Map(inner))), None) => Ok((name.as_str(), inner)),
        (Some((name, _)), None) => Err(ProviderError::invalid_config(format!(
            "{}.{} must be a block",
            key, name
        ))
        .for_resource(id.clone())),
        _ => Err(ProviderError::invalid_config(format!(
            "{} must contain exactly one block, got {}",
            key,
            union.len()
        ))
        .for_resource(id.clone())),
    }
}

pub(crate) fn map_of(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// Parse the repeated `permission` blocks
pub(crate) fn permissions_from_value(
    value: Option<&Value>,
    id: &ResourceId,
) -> ProviderResult<Vec<Permission>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = value.as_list().ok_or_else(|| {
        ProviderError::invalid_config("permission must be a list").for_resource(id.clone())
    })?;

    items
        .iter()
        .map(|item| {
            let block = item.as_map().ok_or_else(|| {
                ProviderError::invalid_config("permission entries must be blocks")
                    .for_resource(id.clone())
            })?;
            let principal = required_string(block, "principal", id)?;
            let actions = block
                .get("actions")
                .and_then(Value::to_string_set)
                .ok_or_else(|| {
                    ProviderError::invalid_config(format!(
                        "permission for {} needs a set of actions",
                        principal
                    ))
                    .for_resource(id.clone())
                })?;
            Ok(Permission { principal, actions })
        })
        .collect()
}

/// Attribute representation of permissions, ordered by principal
pub(crate) fn permissions_to_value(permissions: &[Permission]) -> Value {
    let mut sorted = permissions.to_vec();
    sorted.sort();
    Value::List(
        sorted
            .into_iter()
            .map(|p| {
                map_of(vec![
                    ("principal", Value::String(p.principal)),
                    ("actions", Value::Set(p.actions)),
                ])
            })
            .collect(),
    )
}

/// Compute the actions to grant and to revoke, per principal
pub fn diff_permissions(
    old: &[Permission],
    new: &[Permission],
) -> (Vec<Permission>, Vec<Permission>) {
    fn by_principal(permissions: &[Permission]) -> BTreeMap<&str, BTreeSet<String>> {
        let mut map: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for p in permissions {
            map.entry(p.principal.as_str())
                .or_default()
                .extend(p.actions.iter().cloned());
        }
        map
    }

    fn added<'a>(
        from: &BTreeMap<&'a str, BTreeSet<String>>,
        to: &BTreeMap<&'a str, BTreeSet<String>>,
    ) -> Vec<Permission> {
        let mut result = Vec::new();
        for (principal, actions) in to {
            let actions: BTreeSet<String> = match from.get(principal) {
                Some(existing) => actions.difference(existing).cloned().collect(),
                None => actions.clone(),
            };
            if !actions.is_empty() {
                result.push(Permission {
                    principal: principal.to_string(),
                    actions,
                });
            }
        }
        result
    }

    let old = by_principal(old);
    let new = by_principal(new);
    (added(&old, &new), added(&new, &old))
}

impl QuickSightProvider {
    /// Untag removed or changed keys, then tag new or changed ones
    pub(crate) async fn update_tags(
        &self,
        id: &ResourceId,
        arn: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<()> {
        let tags_of = |attrs: &HashMap<String, Value>| {
            attrs
                .get("tags")
                .and_then(Value::as_map)
                .map(tags_from_map)
                .unwrap_or_default()
        };
        let (create, remove) = diff_tags(&tags_of(&from.attributes), &tags_of(&to.attributes));

        if !remove.is_empty() {
            self.client
                .untag_resource(arn, &tag_keys(&remove))
                .await
                .map_err(|e| e.into_provider_error("Error deleting QuickSight tags", id))?;
        }
        if !create.is_empty() {
            self.client
                .tag_resource(arn, &create)
                .await
                .map_err(|e| e.into_provider_error("Error updating QuickSight tags", id))?;
        }
        Ok(())
    }
}
