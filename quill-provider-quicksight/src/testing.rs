//! In-memory QuickSight used by the provider tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, Once};

use async_trait::async_trait;

use crate::arn::{data_source_arn, group_arn, template_arn};
use crate::client::{ApiError, QuickSightApi};
use crate::models::{
    DataSource, DataSourceRequest, Group, GroupKey, GroupRequest, ObjectKey, Permission,
    ResourceStatus, Tag, Template, TemplateRequest, TemplateSource,
};

#[derive(Default)]
struct MockState {
    groups: BTreeMap<String, Group>,
    templates: BTreeMap<String, Template>,
    data_sources: BTreeMap<String, DataSource>,
    permissions: HashMap<String, Vec<Permission>>,
    tags: HashMap<String, BTreeMap<String, String>>,
    /// Statuses served by successive describe calls, keyed by `account/object`
    statuses: HashMap<String, VecDeque<ResourceStatus>>,
    failures: HashMap<&'static str, String>,
    calls: Vec<String>,
}

pub(crate) struct MockQuickSight {
    region: String,
    state: Mutex<MockState>,
}

fn group_path(key: &GroupKey) -> String {
    format!("{}/{}/{}", key.account_id, key.namespace, key.group_name)
}

fn object_path(key: &ObjectKey) -> String {
    format!("{}/{}", key.account_id, key.object_id)
}

impl MockQuickSight {
    pub(crate) fn new() -> Self {
        Self {
            region: "us-east-1".to_string(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Serve `statuses` to the next describe calls of `account/object`; the last one repeats
    pub(crate) fn script_status(&self, path: &str, statuses: Vec<ResourceStatus>) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(path.to_string(), statuses.into());
    }

    /// Make every call of `operation` fail with a service error
    pub(crate) fn fail(&self, operation: &'static str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, message.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    pub(crate) fn tags_of(&self, arn: &str) -> BTreeMap<String, String> {
        self.state
            .lock()
            .unwrap()
            .tags
            .get(arn)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn permissions_of(&self, arn: &str) -> Vec<Permission> {
        let mut permissions = self
            .state
            .lock()
            .unwrap()
            .permissions
            .get(arn)
            .cloned()
            .unwrap_or_default();
        permissions.sort();
        permissions
    }

    pub(crate) fn template(&self, path: &str) -> Option<Template> {
        self.state.lock().unwrap().templates.get(path).cloned()
    }

    pub(crate) fn data_source(&self, path: &str) -> Option<DataSource> {
        self.state.lock().unwrap().data_sources.get(path).cloned()
    }

    /// Record the call and return the scripted failure, if any
    fn enter(
        &self,
        operation: &'static str,
        target: &str,
    ) -> Result<MutexGuard<'_, MockState>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{} {}", operation, target));
        if let Some(message) = state.failures.get(operation).cloned() {
            return Err(ApiError::service(operation, message));
        }
        Ok(state)
    }
}

impl MockState {
    fn next_status(&mut self, path: &str, settled: ResourceStatus) -> ResourceStatus {
        match self.statuses.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(settled),
            Some(queue) => queue.front().cloned().unwrap_or(settled),
            None => settled,
        }
    }

    fn apply_permissions(&mut self, arn: &str, grant: &[Permission], revoke: &[Permission]) {
        let entry = self.permissions.entry(arn.to_string()).or_default();
        for g in grant {
            match entry.iter().position(|p| p.principal == g.principal) {
                Some(i) => entry[i].actions.extend(g.actions.iter().cloned()),
                None => entry.push(g.clone()),
            }
        }
        for r in revoke {
            if let Some(existing) = entry.iter_mut().find(|p| p.principal == r.principal) {
                existing.actions.retain(|a| !r.actions.contains(a));
            }
        }
        entry.retain(|p| !p.actions.is_empty());
    }

    fn apply_tags(&mut self, arn: &str, tags: &[Tag]) {
        let entry = self.tags.entry(arn.to_string()).or_default();
        for tag in tags {
            entry.insert(tag.key.clone(), tag.value.clone());
        }
    }

    fn forget(&mut self, arn: &str) {
        self.permissions.remove(arn);
        self.tags.remove(arn);
    }
}

fn source_arn(source: &TemplateSource) -> String {
    match source {
        TemplateSource::Analysis { arn, .. } | TemplateSource::Template { arn } => arn.clone(),
    }
}

#[async_trait]
impl QuickSightApi for MockQuickSight {
    async fn create_group(&self, request: &GroupRequest) -> Result<Group, ApiError> {
        let path = group_path(&request.key);
        let mut state = self.enter("CreateGroup", &path)?;
        let group = Group {
            arn: group_arn(
                &self.region,
                &request.key.account_id,
                &request.key.namespace,
                &request.key.group_name,
            ),
            group_name: request.key.group_name.clone(),
            description: request.description.clone(),
            principal_id: Some(format!("group/{}", request.key.group_name)),
        };
        state.groups.insert(path, group.clone());
        Ok(group)
    }

    async fn describe_group(&self, key: &GroupKey) -> Result<Group, ApiError> {
        let path = group_path(key);
        let state = self.enter("DescribeGroup", &path)?;
        state
            .groups
            .get(&path)
            .cloned()
            .ok_or(ApiError::NotFound(path))
    }

    async fn update_group(&self, request: &GroupRequest) -> Result<Group, ApiError> {
        let path = group_path(&request.key);
        let mut state = self.enter("UpdateGroup", &path)?;
        let group = state
            .groups
            .get_mut(&path)
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        group.description = request.description.clone();
        Ok(group.clone())
    }

    async fn delete_group(&self, key: &GroupKey) -> Result<(), ApiError> {
        let path = group_path(key);
        let mut state = self.enter("DeleteGroup", &path)?;
        state
            .groups
            .remove(&path)
            .map(|_| ())
            .ok_or(ApiError::NotFound(path))
    }

    async fn create_template(&self, request: &TemplateRequest) -> Result<String, ApiError> {
        let path = object_path(&request.key);
        let mut state = self.enter("CreateTemplate", &path)?;
        let arn = template_arn(&self.region, &request.key.account_id, &request.key.object_id);
        state.templates.insert(
            path,
            Template {
                arn: arn.clone(),
                template_id: request.key.object_id.clone(),
                name: request.name.clone(),
                version_number: Some(1),
                version_description: request.version_description.clone(),
                source_entity_arn: Some(source_arn(&request.source)),
                status: Some(ResourceStatus::CreationSuccessful),
            },
        );
        state.permissions.insert(arn.clone(), request.permissions.clone());
        state.apply_tags(&arn, &request.tags);
        Ok(arn)
    }

    async fn describe_template(&self, key: &ObjectKey) -> Result<Template, ApiError> {
        let path = object_path(key);
        let mut state = self.enter("DescribeTemplate", &path)?;
        let mut template = state
            .templates
            .get(&path)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        let settled = template
            .status
            .clone()
            .unwrap_or(ResourceStatus::CreationSuccessful);
        template.status = Some(state.next_status(&path, settled));
        Ok(template)
    }

    async fn update_template(&self, request: &TemplateRequest) -> Result<(), ApiError> {
        let path = object_path(&request.key);
        let mut state = self.enter("UpdateTemplate", &path)?;
        let template = state
            .templates
            .get_mut(&path)
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        template.name = request.name.clone();
        template.version_description = request.version_description.clone();
        template.source_entity_arn = Some(source_arn(&request.source));
        template.version_number = template.version_number.map(|n| n + 1);
        template.status = Some(ResourceStatus::UpdateSuccessful);
        Ok(())
    }

    async fn delete_template(&self, key: &ObjectKey) -> Result<(), ApiError> {
        let path = object_path(key);
        let mut state = self.enter("DeleteTemplate", &path)?;
        let template = state
            .templates
            .remove(&path)
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        state.forget(&template.arn);
        Ok(())
    }

    async fn describe_template_permissions(
        &self,
        key: &ObjectKey,
    ) -> Result<Vec<Permission>, ApiError> {
        let path = object_path(key);
        let state = self.enter("DescribeTemplatePermissions", &path)?;
        let template = state
            .templates
            .get(&path)
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        Ok(state
            .permissions
            .get(&template.arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_template_permissions(
        &self,
        key: &ObjectKey,
        grant: &[Permission],
        revoke: &[Permission],
    ) -> Result<(), ApiError> {
        let path = object_path(key);
        let mut state = self.enter("UpdateTemplatePermissions", &path)?;
        let arn = state
            .templates
            .get(&path)
            .map(|t| t.arn.clone())
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        state.apply_permissions(&arn, grant, revoke);
        Ok(())
    }

    async fn create_data_source(&self, request: &DataSourceRequest) -> Result<String, ApiError> {
        let path = object_path(&request.key);
        let mut state = self.enter("CreateDataSource", &path)?;
        let arn = data_source_arn(&self.region, &request.key.account_id, &request.key.object_id);
        state.data_sources.insert(
            path,
            DataSource {
                arn: arn.clone(),
                data_source_id: request.key.object_id.clone(),
                name: Some(request.name.clone()),
                data_source_type: Some(request.parameters.data_source_type().to_string()),
                status: Some(ResourceStatus::CreationSuccessful),
                parameters: Some(request.parameters.clone()),
                disable_ssl: request.disable_ssl,
                vpc_connection_arn: request.vpc_connection_arn.clone(),
                error_message: None,
            },
        );
        state.permissions.insert(arn.clone(), request.permissions.clone());
        state.apply_tags(&arn, &request.tags);
        Ok(arn)
    }

    async fn describe_data_source(&self, key: &ObjectKey) -> Result<DataSource, ApiError> {
        let path = object_path(key);
        let mut state = self.enter("DescribeDataSource", &path)?;
        let mut data_source = state
            .data_sources
            .get(&path)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        let settled = data_source
            .status
            .clone()
            .unwrap_or(ResourceStatus::CreationSuccessful);
        let status = state.next_status(&path, settled);
        if status.is_failed() {
            data_source.error_message = Some("connection refused".to_string());
        }
        data_source.status = Some(status);
        Ok(data_source)
    }

    async fn update_data_source(&self, request: &DataSourceRequest) -> Result<(), ApiError> {
        let path = object_path(&request.key);
        let mut state = self.enter("UpdateDataSource", &path)?;
        let data_source = state
            .data_sources
            .get_mut(&path)
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        data_source.name = Some(request.name.clone());
        data_source.parameters = Some(request.parameters.clone());
        data_source.disable_ssl = request.disable_ssl;
        data_source.vpc_connection_arn = request.vpc_connection_arn.clone();
        data_source.status = Some(ResourceStatus::UpdateSuccessful);
        Ok(())
    }

    async fn delete_data_source(&self, key: &ObjectKey) -> Result<(), ApiError> {
        let path = object_path(key);
        let mut state = self.enter("DeleteDataSource", &path)?;
        let data_source = state
            .data_sources
            .remove(&path)
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        state.forget(&data_source.arn);
        Ok(())
    }

    async fn describe_data_source_permissions(
        &self,
        key: &ObjectKey,
    ) -> Result<Vec<Permission>, ApiError> {
        let path = object_path(key);
        let state = self.enter("DescribeDataSourcePermissions", &path)?;
        let data_source = state
            .data_sources
            .get(&path)
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        Ok(state
            .permissions
            .get(&data_source.arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_data_source_permissions(
        &self,
        key: &ObjectKey,
        grant: &[Permission],
        revoke: &[Permission],
    ) -> Result<(), ApiError> {
        let path = object_path(key);
        let mut state = self.enter("UpdateDataSourcePermissions", &path)?;
        let arn = state
            .data_sources
            .get(&path)
            .map(|d| d.arn.clone())
            .ok_or_else(|| ApiError::NotFound(path.clone()))?;
        state.apply_permissions(&arn, grant, revoke);
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, ApiError> {
        let state = self.enter("ListTagsForResource", arn)?;
        Ok(state
            .tags
            .get(arn)
            .map(|tags| tags.iter().map(|(k, v)| Tag::new(k, v)).collect())
            .unwrap_or_default())
    }

    async fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<(), ApiError> {
        let mut state = self.enter("TagResource", arn)?;
        state.apply_tags(arn, tags);
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError> {
        let mut state = self.enter("UntagResource", arn)?;
        if let Some(tags) = state.tags.get_mut(arn) {
            for key in keys {
                tags.remove(key);
            }
        }
        Ok(())
    }
}

/// Logger recording every message so tests can check what was logged and at which level
struct CapturedLogs {
    records: Mutex<Vec<(log::Level, String)>>,
}

static LOGS: CapturedLogs = CapturedLogs {
    records: Mutex::new(Vec::new()),
};

impl log::Log for CapturedLogs {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

/// Install the capturing logger (once per test binary)
pub(crate) fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&LOGS).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
}

/// Levels of the captured messages mentioning `needle`
pub(crate) fn logged_levels(needle: &str) -> Vec<log::Level> {
    LOGS.records
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, message)| message.contains(needle))
        .map(|(level, _)| *level)
        .collect()
}
