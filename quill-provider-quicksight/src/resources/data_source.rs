//! quicksight.data_source

use std::collections::HashMap;

use quill_core::differ::has_change;
use quill_core::identifier::IdFormat;
use quill_core::provider::{ProviderError, ProviderResult};
use quill_core::resource::{Resource, ResourceId, State, Value};
use quill_core::wait::{Progress, wait_for};

use super::{
    block, classify_status, diff_permissions, found, map_of, one_of, permissions_from_value,
    permissions_to_value, required_block, required_int, required_string, split_identifier,
    string_attr, wait_error,
};
use crate::QuickSightProvider;
use crate::arn::data_source_arn;
use crate::models::{
    CredentialPair, DataSource, DataSourceParameters, DataSourceRequest, DatabaseEndpoint,
    ObjectKey,
};
use crate::tags::{tags_from_map, tags_to_map};

pub const DATA_SOURCE_ID: IdFormat = IdFormat::new(&["AWS_ACCOUNT_ID", "DATA_SOURCE_ID"]);

pub fn parse_identifier(identifier: &str) -> ProviderResult<ObjectKey> {
    let [account_id, data_source_id] = split_identifier(&DATA_SOURCE_ID, identifier)?;
    Ok(ObjectKey::new(account_id, data_source_id))
}

/// Typed configuration of a data source
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceConfig {
    pub request: DataSourceRequest,
}

impl DataSourceConfig {
    pub fn from_resource(resource: &Resource, default_account: &str) -> ProviderResult<Self> {
        let attrs = &resource.attributes;
        let id = &resource.id;

        let account_id =
            string_attr(attrs, "aws_account_id").unwrap_or_else(|| default_account.to_string());

        let credentials = match block(attrs, "credentials") {
            Some(credentials) => {
                let pair = required_block(credentials, "credential_pair", id)?;
                Some(CredentialPair {
                    username: required_string(pair, "username", id)?,
                    password: required_string(pair, "password", id)?,
                })
            }
            None => None,
        };

        Ok(Self {
            request: DataSourceRequest {
                key: ObjectKey::new(account_id, required_string(attrs, "data_source_id", id)?),
                name: required_string(attrs, "name", id)?,
                parameters: parameters_from_attributes(attrs, id)?,
                credentials,
                permissions: permissions_from_value(attrs.get("permission"), id)?,
                disable_ssl: block(attrs, "ssl_properties")
                    .and_then(|ssl| ssl.get("disable_ssl"))
                    .and_then(Value::as_bool),
                vpc_connection_arn: block(attrs, "vpc_connection_properties")
                    .and_then(|vpc| string_attr(vpc, "vpc_connection_arn")),
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
        DATA_SOURCE_ID.encode(&[key.account_id.as_str(), key.object_id.as_str()])
    }
}

fn endpoint(attrs: &HashMap<String, Value>, id: &ResourceId) -> ProviderResult<DatabaseEndpoint> {
    Ok(DatabaseEndpoint {
        host: required_string(attrs, "host", id)?,
        port: required_int(attrs, "port", id)?,
        database: required_string(attrs, "database", id)?,
    })
}

/// Parse the `parameters` union into the active backend
pub fn parameters_from_attributes(
    attrs: &HashMap<String, Value>,
    id: &ResourceId,
) -> ProviderResult<DataSourceParameters> {
    let (backend, p) = one_of(attrs, "parameters", id)?;

    let parameters = match backend {
        "amazon_elasticsearch" => DataSourceParameters::AmazonElasticsearch {
            domain: required_string(p, "domain", id)?,
        },
        "athena" => DataSourceParameters::Athena {
            work_group: string_attr(p, "work_group"),
        },
        "aurora" => DataSourceParameters::Aurora(endpoint(p, id)?),
        "aurora_postgresql" => DataSourceParameters::AuroraPostgreSql(endpoint(p, id)?),
        "aws_iot_analytics" => DataSourceParameters::AwsIotAnalytics {
            data_set_name: required_string(p, "data_set_name", id)?,
        },
        "jira" => DataSourceParameters::Jira {
            site_base_url: required_string(p, "site_base_url", id)?,
        },
        "maria_db" => DataSourceParameters::MariaDb(endpoint(p, id)?),
        "mysql" => DataSourceParameters::MySql(endpoint(p, id)?),
        "postgresql" => DataSourceParameters::PostgreSql(endpoint(p, id)?),
        "presto" => DataSourceParameters::Presto {
            host: required_string(p, "host", id)?,
            port: required_int(p, "port", id)?,
            catalog: required_string(p, "catalog", id)?,
        },
        "redshift" => DataSourceParameters::Redshift {
            cluster_id: string_attr(p, "cluster_id"),
            database: required_string(p, "database", id)?,
            host: string_attr(p, "host"),
            port: match p.get("port") {
                Some(_) => Some(required_int(p, "port", id)?),
                None => None,
            },
        },
        "s3" => {
            let location = required_block(p, "manifest_file_location", id)?;
            DataSourceParameters::S3 {
                bucket: required_string(location, "bucket", id)?,
                key: required_string(location, "key", id)?,
            }
        }
        "service_now" => DataSourceParameters::ServiceNow {
            site_base_url: required_string(p, "site_base_url", id)?,
        },
        "snowflake" => DataSourceParameters::Snowflake {
            host: required_string(p, "host", id)?,
            database: required_string(p, "database", id)?,
            warehouse: required_string(p, "warehouse", id)?,
        },
        "spark" => DataSourceParameters::Spark {
            host: required_string(p, "host", id)?,
            port: required_int(p, "port", id)?,
        },
        "sql_server" => DataSourceParameters::SqlServer(endpoint(p, id)?),
        "teradata" => DataSourceParameters::Teradata(endpoint(p, id)?),
        "twitter" => DataSourceParameters::Twitter {
            query: required_string(p, "query", id)?,
            max_rows: required_int(p, "max_rows", id)?,
        },
        other => {
            return Err(ProviderError::invalid_config(format!(
                "unknown data source parameters: {}",
                other
            ))
            .for_resource(id.clone()));
        }
    };

    Ok(parameters)
}

fn endpoint_value(e: &DatabaseEndpoint) -> Value {
    map_of(vec![
        ("database", Value::string(&e.database)),
        ("host", Value::string(&e.host)),
        ("port", Value::Int(e.port.into())),
    ])
}

/// Attribute representation of the active backend
pub fn parameters_to_value(parameters: &DataSourceParameters) -> Value {
    let (backend, inner) = match parameters {
        DataSourceParameters::AmazonElasticsearch { domain } => (
            "amazon_elasticsearch",
            map_of(vec![("domain", Value::string(domain))]),
        ),
        DataSourceParameters::Athena { work_group } => (
            "athena",
            map_of(
                work_group
                    .iter()
                    .map(|w| ("work_group", Value::string(w)))
                    .collect(),
            ),
        ),
        DataSourceParameters::Aurora(e) => ("aurora", endpoint_value(e)),
        DataSourceParameters::AuroraPostgreSql(e) => ("aurora_postgresql", endpoint_value(e)),
        DataSourceParameters::AwsIotAnalytics { data_set_name } => (
            "aws_iot_analytics",
            map_of(vec![("data_set_name", Value::string(data_set_name))]),
        ),
        DataSourceParameters::Jira { site_base_url } => (
            "jira",
            map_of(vec![("site_base_url", Value::string(site_base_url))]),
        ),
        DataSourceParameters::MariaDb(e) => ("maria_db", endpoint_value(e)),
        DataSourceParameters::MySql(e) => ("mysql", endpoint_value(e)),
        DataSourceParameters::PostgreSql(e) => ("postgresql", endpoint_value(e)),
        DataSourceParameters::Presto {
            host,
            port,
            catalog,
        } => (
            "presto",
            map_of(vec![
                ("catalog", Value::string(catalog)),
                ("host", Value::string(host)),
                ("port", Value::Int((*port).into())),
            ]),
        ),
        DataSourceParameters::Redshift {
            cluster_id,
            database,
            host,
            port,
        } => {
            let mut fields = vec![("database", Value::string(database))];
            if let Some(cluster_id) = cluster_id {
                fields.push(("cluster_id", Value::string(cluster_id)));
            }
            if let Some(host) = host {
                fields.push(("host", Value::string(host)));
            }
            if let Some(port) = port {
                fields.push(("port", Value::Int((*port).into())));
            }
            ("redshift", map_of(fields))
        }
        DataSourceParameters::S3 { bucket, key } => (
            "s3",
            map_of(vec![(
                "manifest_file_location",
                map_of(vec![
                    ("bucket", Value::string(bucket)),
                    ("key", Value::string(key)),
                ]),
            )]),
        ),
        DataSourceParameters::ServiceNow { site_base_url } => (
            "service_now",
            map_of(vec![("site_base_url", Value::string(site_base_url))]),
        ),
        DataSourceParameters::Snowflake {
            host,
            database,
            warehouse,
        } => (
            "snowflake",
            map_of(vec![
                ("database", Value::string(database)),
                ("host", Value::string(host)),
                ("warehouse", Value::string(warehouse)),
            ]),
        ),
        DataSourceParameters::Spark { host, port } => (
            "spark",
            map_of(vec![
                ("host", Value::string(host)),
                ("port", Value::Int((*port).into())),
            ]),
        ),
        DataSourceParameters::SqlServer(e) => ("sql_server", endpoint_value(e)),
        DataSourceParameters::Teradata(e) => ("teradata", endpoint_value(e)),
        DataSourceParameters::Twitter { query, max_rows } => (
            "twitter",
            map_of(vec![
                ("max_rows", Value::Int((*max_rows).into())),
                ("query", Value::string(query)),
            ]),
        ),
    };
    map_of(vec![(backend, inner)])
}

fn data_source_attributes(key: &ObjectKey, data_source: &DataSource) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert("arn".to_string(), Value::string(&data_source.arn));
    attributes.insert("aws_account_id".to_string(), Value::string(&key.account_id));
    attributes.insert(
        "data_source_id".to_string(),
        Value::string(&data_source.data_source_id),
    );
    if let Some(name) = &data_source.name {
        attributes.insert("name".to_string(), Value::string(name));
    }
    if let Some(data_source_type) = &data_source.data_source_type {
        attributes.insert("type".to_string(), Value::string(data_source_type));
    }
    if let Some(status) = &data_source.status {
        attributes.insert("status".to_string(), Value::string(status.as_str()));
    }
    if let Some(parameters) = &data_source.parameters {
        attributes.insert("parameters".to_string(), parameters_to_value(parameters));
    }
    if let Some(disable_ssl) = data_source.disable_ssl {
        attributes.insert(
            "ssl_properties".to_string(),
            map_of(vec![("disable_ssl", Value::Bool(disable_ssl))]),
        );
    }
    if let Some(arn) = &data_source.vpc_connection_arn {
        attributes.insert(
            "vpc_connection_properties".to_string(),
            map_of(vec![("vpc_connection_arn", Value::string(arn))]),
        );
    }
    attributes
}

fn classify(data_source: &DataSource) -> Progress {
    match classify_status(data_source.status.as_ref()) {
        Progress::Failed(status) => match &data_source.error_message {
            Some(message) => Progress::Failed(format!("{} ({})", status, message)),
            None => Progress::Failed(status),
        },
        other => other,
    }
}

impl QuickSightProvider {
    pub(crate) async fn read_data_source(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let key = parse_identifier(identifier)?;
        let client = &self.client;
        let key_ref = &key;

        let data_source = match wait_for(
            identifier,
            &self.wait,
            move || async move { found(client.describe_data_source(key_ref).await) },
            classify,
        )
        .await
        {
            Ok(data_source) => data_source,
            Err(e) if e.is_not_found() => {
                log::debug!("QuickSight Data Source {} does not exist", identifier);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => {
                return Err(wait_error(
                    e,
                    &format!("Error describing QuickSight Data Source ({})", identifier),
                    id,
                ));
            }
        };

        let mut attributes = data_source_attributes(&key, &data_source);

        let permissions = self
            .client
            .describe_data_source_permissions(&key)
            .await
            .map_err(|e| {
                e.into_provider_error(
                    &format!(
                        "Error describing QuickSight Data Source permissions ({})",
                        identifier
                    ),
                    id,
                )
            })?;
        attributes.insert("permission".to_string(), permissions_to_value(&permissions));

        let tags = self.client.list_tags(&data_source.arn).await.map_err(|e| {
            e.into_provider_error(
                &format!("Error listing QuickSight Data Source tags ({})", identifier),
                id,
            )
        })?;
        attributes.insert("tags".to_string(), Value::Map(tags_to_map(&tags)));

        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    pub(crate) async fn create_data_source(&self, resource: &Resource) -> ProviderResult<State> {
        let config = DataSourceConfig::from_resource(resource, &self.account_id)?;

        self.client
            .create_data_source(&config.request)
            .await
            .map_err(|e| {
                e.into_provider_error("Error creating QuickSight Data Source", &resource.id)
            })?;

        let identifier = config.identifier();
        log::info!(
            "Created QuickSight Data Source {} ({})",
            identifier,
            config.request.parameters.data_source_type()
        );

        self.read_data_source(&resource.id, &identifier).await
    }

    pub(crate) async fn update_data_source(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let key = parse_identifier(identifier)?;
        let mut config = DataSourceConfig::from_resource(to, &key.account_id)?;
        config.request.key = key.clone();

        match self.client.update_data_source(&config.request).await {
            Ok(()) => log::info!("Updated QuickSight Data Source {}", identifier),
            Err(e) if e.is_not_found() => {
                log::warn!("QuickSight Data Source {} is already gone", identifier);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => {
                return Err(e.into_provider_error(
                    &format!("Error updating QuickSight Data Source {}", identifier),
                    id,
                ));
            }
        }

        if has_change(&from.attributes, &to.attributes, "permission") {
            let old = permissions_from_value(from.attributes.get("permission"), id)?;
            let (grant, revoke) = diff_permissions(&old, &config.request.permissions);
            if !grant.is_empty() || !revoke.is_empty() {
                self.client
                    .update_data_source_permissions(&key, &grant, &revoke)
                    .await
                    .map_err(|e| {
                        e.into_provider_error(
                            &format!(
                                "Error updating QuickSight Data Source permissions {}",
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
                .unwrap_or_else(|| {
                    data_source_arn(&self.region, &key.account_id, &key.object_id)
                });
            self.update_tags(id, &arn, from, to).await?;
        }

        self.read_data_source(id, identifier).await
    }

    pub(crate) async fn delete_data_source(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        let key = parse_identifier(identifier)?;

        match self.client.delete_data_source(&key).await {
            Ok(()) => {
                log::info!("Deleted QuickSight Data Source {}", identifier);
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into_provider_error(
                &format!("Error deleting QuickSight Data Source {}", identifier),
                id,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ResourceId {
        ResourceId::new("quicksight.data_source", "sales")
    }

    fn attrs(parameters: Value) -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert("parameters".to_string(), parameters);
        attrs
    }

    #[test]
    fn endpoint_backends_round_trip() {
        let value = map_of(vec![(
            "aurora_postgresql",
            map_of(vec![
                ("database", Value::string("sales")),
                ("host", Value::string("db.internal")),
                ("port", Value::Int(5432)),
            ]),
        )]);
        let parameters = parameters_from_attributes(&attrs(value.clone()), &id()).unwrap();
        assert_eq!(parameters.data_source_type(), "AURORA_POSTGRESQL");
        assert_eq!(parameters_to_value(&parameters), value);
    }

    #[test]
    fn redshift_optional_fields() {
        let value = map_of(vec![(
            "redshift",
            map_of(vec![
                ("database", Value::string("dw")),
                ("cluster_id", Value::string("dw-cluster")),
            ]),
        )]);
        let parameters = parameters_from_attributes(&attrs(value.clone()), &id()).unwrap();
        assert_eq!(
            parameters,
            DataSourceParameters::Redshift {
                cluster_id: Some("dw-cluster".to_string()),
                database: "dw".to_string(),
                host: None,
                port: None,
            }
        );
        assert_eq!(parameters_to_value(&parameters), value);
    }

    #[test]
    fn athena_without_work_group() {
        let value = map_of(vec![("athena", map_of(vec![]))]);
        let parameters = parameters_from_attributes(&attrs(value.clone()), &id()).unwrap();
        assert_eq!(parameters, DataSourceParameters::Athena { work_group: None });
        assert_eq!(parameters_to_value(&parameters), value);
    }

    #[test]
    fn port_must_fit_i32() {
        let value = map_of(vec![(
            "spark",
            map_of(vec![
                ("host", Value::string("spark.internal")),
                ("port", Value::Int(i64::from(i32::MAX) + 1)),
            ]),
        )]);
        assert!(parameters_from_attributes(&attrs(value), &id()).is_err());
    }

    #[test]
    fn config_reads_credentials_and_ssl() {
        let resource = Resource::new("quicksight.data_source", "sales")
            .with_attribute("data_source_id", Value::string("sales"))
            .with_attribute("name", Value::string("Sales"))
            .with_attribute(
                "parameters",
                map_of(vec![(
                    "s3",
                    map_of(vec![(
                        "manifest_file_location",
                        map_of(vec![
                            ("bucket", Value::string("reports")),
                            ("key", Value::string("manifest.json")),
                        ]),
                    )]),
                )]),
            )
            .with_attribute(
                "credentials",
                map_of(vec![(
                    "credential_pair",
                    map_of(vec![
                        ("username", Value::string("reader")),
                        ("password", Value::string("secret")),
                    ]),
                )]),
            )
            .with_attribute(
                "ssl_properties",
                map_of(vec![("disable_ssl", Value::Bool(true))]),
            );

        let config = DataSourceConfig::from_resource(&resource, "111111111111").unwrap();
        assert_eq!(config.identifier(), "111111111111/sales");
        assert_eq!(config.request.disable_ssl, Some(true));
        assert_eq!(
            config.request.credentials,
            Some(CredentialPair {
                username: "reader".to_string(),
                password: "secret".to_string(),
            })
        );
        assert_eq!(config.request.parameters.data_source_type(), "S3");
    }

    #[test]
    fn failed_status_carries_error_message() {
        let data_source = DataSource {
            arn: "arn".to_string(),
            data_source_id: "sales".to_string(),
            name: None,
            data_source_type: None,
            status: Some(crate::models::ResourceStatus::CreationFailed),
            parameters: None,
            disable_ssl: None,
            vpc_connection_arn: None,
            error_message: Some("ACCESS_DENIED".to_string()),
        };
        assert_eq!(
            classify(&data_source),
            Progress::Failed("CREATION_FAILED (ACCESS_DENIED)".to_string())
        );
    }
}
