//! QuickSight API client backed by the AWS SDK

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_quicksight::Client;
use aws_sdk_quicksight::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_quicksight::types as sdk;

use crate::client::{ApiError, QuickSightApi};
use crate::models::{
    CredentialPair, DataSource, DataSourceParameters, DataSourceRequest, DatabaseEndpoint, Group,
    GroupKey, GroupRequest, ObjectKey, Permission, ResourceStatus, Tag, Template, TemplateRequest,
    TemplateSource,
};

const NOT_FOUND: &str = "ResourceNotFoundException";

fn api_error<E>(operation: &str, err: SdkError<E>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    if err.code() == Some(NOT_FOUND) {
        let message = err.message().unwrap_or(operation).to_string();
        return ApiError::NotFound(message);
    }
    ApiError::service(operation, DisplayErrorContext(&err).to_string())
}

fn build_error(err: BuildError) -> ApiError {
    ApiError::InvalidRequest(err.to_string())
}

/// Resolve the account of the current credentials with STS GetCallerIdentity
pub async fn resolve_account_id(config: &SdkConfig) -> Result<String, ApiError> {
    let sts = aws_sdk_sts::Client::new(config);
    let identity = sts
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| ApiError::service("GetCallerIdentity", DisplayErrorContext(&e).to_string()))?;
    identity
        .account()
        .map(str::to_string)
        .ok_or_else(|| ApiError::service("GetCallerIdentity", "response has no account"))
}

/// [`QuickSightApi`] implementation calling the real service
pub struct SdkClient {
    client: Client,
}

impl SdkClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

// ========== Request conversion ==========

fn to_sdk_permissions(
    permissions: &[Permission],
) -> Result<Vec<sdk::ResourcePermission>, ApiError> {
    permissions
        .iter()
        .map(|p| {
            sdk::ResourcePermission::builder()
                .principal(&p.principal)
                .set_actions(Some(p.actions.iter().cloned().collect()))
                .build()
                .map_err(build_error)
        })
        .collect()
}

fn from_sdk_permissions(permissions: &[sdk::ResourcePermission]) -> Vec<Permission> {
    permissions
        .iter()
        .map(|p| Permission {
            principal: p.principal().to_string(),
            actions: p.actions().iter().cloned().collect(),
        })
        .collect()
}

fn to_sdk_tags(tags: &[Tag]) -> Result<Vec<sdk::Tag>, ApiError> {
    tags.iter()
        .map(|t| {
            sdk::Tag::builder()
                .key(&t.key)
                .value(&t.value)
                .build()
                .map_err(build_error)
        })
        .collect()
}

/// Empty lists are sent as absent members
fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

fn to_sdk_source(source: &TemplateSource) -> Result<sdk::TemplateSourceEntity, ApiError> {
    let entity = match source {
        TemplateSource::Analysis {
            arn,
            data_set_references,
        } => {
            let references = data_set_references
                .iter()
                .map(|r| {
                    sdk::DataSetReference::builder()
                        .data_set_arn(&r.data_set_arn)
                        .data_set_placeholder(&r.data_set_placeholder)
                        .build()
                        .map_err(build_error)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let analysis = sdk::TemplateSourceAnalysis::builder()
                .arn(arn)
                .set_data_set_references(Some(references))
                .build()
                .map_err(build_error)?;
            sdk::TemplateSourceEntity::builder()
                .source_analysis(analysis)
                .build()
        }
        TemplateSource::Template { arn } => {
            let template = sdk::TemplateSourceTemplate::builder()
                .arn(arn)
                .build()
                .map_err(build_error)?;
            sdk::TemplateSourceEntity::builder()
                .source_template(template)
                .build()
        }
    };
    Ok(entity)
}

macro_rules! endpoint_parameters {
    ($builder:expr, $endpoint:expr) => {
        $builder
            .host(&$endpoint.host)
            .port($endpoint.port)
            .database(&$endpoint.database)
            .build()
            .map_err(build_error)?
    };
}

fn to_sdk_parameters(
    parameters: &DataSourceParameters,
) -> Result<sdk::DataSourceParameters, ApiError> {
    use sdk::DataSourceParameters as P;

    let converted = match parameters {
        DataSourceParameters::AmazonElasticsearch { domain } => P::AmazonElasticsearchParameters(
            sdk::AmazonElasticsearchParameters::builder()
                .domain(domain)
                .build()
                .map_err(build_error)?,
        ),
        DataSourceParameters::Athena { work_group } => P::AthenaParameters(
            sdk::AthenaParameters::builder()
                .set_work_group(work_group.clone())
                .build(),
        ),
        DataSourceParameters::Aurora(e) => P::AuroraParameters(endpoint_parameters!(
            sdk::AuroraParameters::builder(),
            e
        )),
        DataSourceParameters::AuroraPostgreSql(e) => P::AuroraPostgreSqlParameters(
            endpoint_parameters!(sdk::AuroraPostgreSqlParameters::builder(), e),
        ),
        DataSourceParameters::AwsIotAnalytics { data_set_name } => P::AwsIotAnalyticsParameters(
            sdk::AwsIotAnalyticsParameters::builder()
                .data_set_name(data_set_name)
                .build()
                .map_err(build_error)?,
        ),
        DataSourceParameters::Jira { site_base_url } => P::JiraParameters(
            sdk::JiraParameters::builder()
                .site_base_url(site_base_url)
                .build()
                .map_err(build_error)?,
        ),
        DataSourceParameters::MariaDb(e) => P::MariaDbParameters(endpoint_parameters!(
            sdk::MariaDbParameters::builder(),
            e
        )),
        DataSourceParameters::MySql(e) => P::MySqlParameters(endpoint_parameters!(
            sdk::MySqlParameters::builder(),
            e
        )),
        DataSourceParameters::PostgreSql(e) => P::PostgreSqlParameters(endpoint_parameters!(
            sdk::PostgreSqlParameters::builder(),
            e
        )),
        DataSourceParameters::Presto {
            host,
            port,
            catalog,
        } => P::PrestoParameters(
            sdk::PrestoParameters::builder()
                .host(host)
                .port(*port)
                .catalog(catalog)
                .build()
                .map_err(build_error)?,
        ),
        DataSourceParameters::Redshift {
            cluster_id,
            database,
            host,
            port,
        } => P::RedshiftParameters(
            sdk::RedshiftParameters::builder()
                .set_cluster_id(cluster_id.clone())
                .database(database)
                .set_host(host.clone())
                .set_port(*port)
                .build()
                .map_err(build_error)?,
        ),
        DataSourceParameters::S3 { bucket, key } => {
            let location = sdk::ManifestFileLocation::builder()
                .bucket(bucket)
                .key(key)
                .build()
                .map_err(build_error)?;
            P::S3Parameters(
                sdk::S3Parameters::builder()
                    .manifest_file_location(location)
                    .build(),
            )
        }
        DataSourceParameters::ServiceNow { site_base_url } => P::ServiceNowParameters(
            sdk::ServiceNowParameters::builder()
                .site_base_url(site_base_url)
                .build()
                .map_err(build_error)?,
        ),
        DataSourceParameters::Snowflake {
            host,
            database,
            warehouse,
        } => P::SnowflakeParameters(
            sdk::SnowflakeParameters::builder()
                .host(host)
                .database(database)
                .warehouse(warehouse)
                .build()
                .map_err(build_error)?,
        ),
        DataSourceParameters::Spark { host, port } => P::SparkParameters(
            sdk::SparkParameters::builder()
                .host(host)
                .port(*port)
                .build()
                .map_err(build_error)?,
        ),
        DataSourceParameters::SqlServer(e) => P::SqlServerParameters(endpoint_parameters!(
            sdk::SqlServerParameters::builder(),
            e
        )),
        DataSourceParameters::Teradata(e) => P::TeradataParameters(endpoint_parameters!(
            sdk::TeradataParameters::builder(),
            e
        )),
        DataSourceParameters::Twitter { query, max_rows } => P::TwitterParameters(
            sdk::TwitterParameters::builder()
                .query(query)
                .max_rows(*max_rows)
                .build()
                .map_err(build_error)?,
        ),
    };
    Ok(converted)
}

fn endpoint(host: &str, port: i32, database: &str) -> DatabaseEndpoint {
    DatabaseEndpoint {
        host: host.to_string(),
        port,
        database: database.to_string(),
    }
}

/// Map service parameters back; backends this provider does not manage yield `None`
fn from_sdk_parameters(parameters: &sdk::DataSourceParameters) -> Option<DataSourceParameters> {
    use sdk::DataSourceParameters as P;

    let converted = match parameters {
        P::AmazonElasticsearchParameters(p) => DataSourceParameters::AmazonElasticsearch {
            domain: p.domain().to_string(),
        },
        P::AthenaParameters(p) => DataSourceParameters::Athena {
            work_group: p.work_group().map(str::to_string),
        },
        P::AuroraParameters(p) => {
            DataSourceParameters::Aurora(endpoint(p.host(), p.port(), p.database()))
        }
        P::AuroraPostgreSqlParameters(p) => {
            DataSourceParameters::AuroraPostgreSql(endpoint(p.host(), p.port(), p.database()))
        }
        P::AwsIotAnalyticsParameters(p) => DataSourceParameters::AwsIotAnalytics {
            data_set_name: p.data_set_name().to_string(),
        },
        P::JiraParameters(p) => DataSourceParameters::Jira {
            site_base_url: p.site_base_url().to_string(),
        },
        P::MariaDbParameters(p) => {
            DataSourceParameters::MariaDb(endpoint(p.host(), p.port(), p.database()))
        }
        P::MySqlParameters(p) => {
            DataSourceParameters::MySql(endpoint(p.host(), p.port(), p.database()))
        }
        P::PostgreSqlParameters(p) => {
            DataSourceParameters::PostgreSql(endpoint(p.host(), p.port(), p.database()))
        }
        P::PrestoParameters(p) => DataSourceParameters::Presto {
            host: p.host().to_string(),
            port: p.port(),
            catalog: p.catalog().to_string(),
        },
        P::RedshiftParameters(p) => DataSourceParameters::Redshift {
            cluster_id: p.cluster_id().map(str::to_string),
            database: p.database().to_string(),
            host: p.host().map(str::to_string),
            port: match p.port() {
                0 => None,
                port => Some(port),
            },
        },
        P::S3Parameters(p) => {
            let location = p.manifest_file_location()?;
            DataSourceParameters::S3 {
                bucket: location.bucket().to_string(),
                key: location.key().to_string(),
            }
        }
        P::ServiceNowParameters(p) => DataSourceParameters::ServiceNow {
            site_base_url: p.site_base_url().to_string(),
        },
        P::SnowflakeParameters(p) => DataSourceParameters::Snowflake {
            host: p.host().to_string(),
            database: p.database().to_string(),
            warehouse: p.warehouse().to_string(),
        },
        P::SparkParameters(p) => DataSourceParameters::Spark {
            host: p.host().to_string(),
            port: p.port(),
        },
        P::SqlServerParameters(p) => {
            DataSourceParameters::SqlServer(endpoint(p.host(), p.port(), p.database()))
        }
        P::TeradataParameters(p) => {
            DataSourceParameters::Teradata(endpoint(p.host(), p.port(), p.database()))
        }
        P::TwitterParameters(p) => DataSourceParameters::Twitter {
            query: p.query().to_string(),
            max_rows: p.max_rows(),
        },
        _ => return None,
    };
    Some(converted)
}

fn to_sdk_credentials(
    credentials: Option<&CredentialPair>,
) -> Result<Option<sdk::DataSourceCredentials>, ApiError> {
    let Some(pair) = credentials else {
        return Ok(None);
    };
    let pair = sdk::CredentialPair::builder()
        .username(&pair.username)
        .password(&pair.password)
        .build()
        .map_err(build_error)?;
    Ok(Some(
        sdk::DataSourceCredentials::builder()
            .credential_pair(pair)
            .build(),
    ))
}

fn to_sdk_vpc(arn: Option<&String>) -> Result<Option<sdk::VpcConnectionProperties>, ApiError> {
    arn.map(|arn| {
        sdk::VpcConnectionProperties::builder()
            .vpc_connection_arn(arn)
            .build()
            .map_err(build_error)
    })
    .transpose()
}

fn to_sdk_ssl(disable_ssl: Option<bool>) -> Option<sdk::SslProperties> {
    disable_ssl.map(|disable| sdk::SslProperties::builder().disable_ssl(disable).build())
}

fn status(status: Option<&sdk::ResourceStatus>) -> Option<ResourceStatus> {
    status.map(|s| ResourceStatus::from_wire(s.as_str()))
}

fn group_from_sdk(operation: &str, group: Option<&sdk::Group>) -> Result<Group, ApiError> {
    let group = group.ok_or_else(|| ApiError::service(operation, "response has no group"))?;
    Ok(Group {
        arn: group.arn().unwrap_or_default().to_string(),
        group_name: group.group_name().unwrap_or_default().to_string(),
        description: group.description().map(str::to_string),
        principal_id: group.principal_id().map(str::to_string),
    })
}

#[async_trait]
impl QuickSightApi for SdkClient {
    async fn create_group(&self, request: &GroupRequest) -> Result<Group, ApiError> {
        let output = self
            .client
            .create_group()
            .aws_account_id(&request.key.account_id)
            .namespace(&request.key.namespace)
            .group_name(&request.key.group_name)
            .set_description(request.description.clone())
            .send()
            .await
            .map_err(|e| api_error("CreateGroup", e))?;
        group_from_sdk("CreateGroup", output.group())
    }

    async fn describe_group(&self, key: &GroupKey) -> Result<Group, ApiError> {
        let output = self
            .client
            .describe_group()
            .aws_account_id(&key.account_id)
            .namespace(&key.namespace)
            .group_name(&key.group_name)
            .send()
            .await
            .map_err(|e| api_error("DescribeGroup", e))?;
        group_from_sdk("DescribeGroup", output.group())
    }

    async fn update_group(&self, request: &GroupRequest) -> Result<Group, ApiError> {
        let output = self
            .client
            .update_group()
            .aws_account_id(&request.key.account_id)
            .namespace(&request.key.namespace)
            .group_name(&request.key.group_name)
            .set_description(request.description.clone())
            .send()
            .await
            .map_err(|e| api_error("UpdateGroup", e))?;
        group_from_sdk("UpdateGroup", output.group())
    }

    async fn delete_group(&self, key: &GroupKey) -> Result<(), ApiError> {
        self.client
            .delete_group()
            .aws_account_id(&key.account_id)
            .namespace(&key.namespace)
            .group_name(&key.group_name)
            .send()
            .await
            .map_err(|e| api_error("DeleteGroup", e))?;
        Ok(())
    }

    async fn create_template(&self, request: &TemplateRequest) -> Result<String, ApiError> {
        let output = self
            .client
            .create_template()
            .aws_account_id(&request.key.account_id)
            .template_id(&request.key.object_id)
            .set_name(request.name.clone())
            .source_entity(to_sdk_source(&request.source)?)
            .set_version_description(request.version_description.clone())
            .set_permissions(non_empty(to_sdk_permissions(&request.permissions)?))
            .set_tags(non_empty(to_sdk_tags(&request.tags)?))
            .send()
            .await
            .map_err(|e| api_error("CreateTemplate", e))?;
        Ok(output.arn().unwrap_or_default().to_string())
    }

    async fn describe_template(&self, key: &ObjectKey) -> Result<Template, ApiError> {
        let output = self
            .client
            .describe_template()
            .aws_account_id(&key.account_id)
            .template_id(&key.object_id)
            .send()
            .await
            .map_err(|e| api_error("DescribeTemplate", e))?;
        let template = output
            .template()
            .ok_or_else(|| ApiError::service("DescribeTemplate", "response has no template"))?;
        let version = template.version();

        Ok(Template {
            arn: template.arn().unwrap_or_default().to_string(),
            template_id: template
                .template_id()
                .unwrap_or(key.object_id.as_str())
                .to_string(),
            name: template.name().map(str::to_string),
            version_number: version.and_then(|v| v.version_number()),
            version_description: version.and_then(|v| v.description()).map(str::to_string),
            source_entity_arn: version
                .and_then(|v| v.source_entity_arn())
                .map(str::to_string),
            status: status(version.and_then(|v| v.status())),
        })
    }

    async fn update_template(&self, request: &TemplateRequest) -> Result<(), ApiError> {
        self.client
            .update_template()
            .aws_account_id(&request.key.account_id)
            .template_id(&request.key.object_id)
            .set_name(request.name.clone())
            .source_entity(to_sdk_source(&request.source)?)
            .set_version_description(request.version_description.clone())
            .send()
            .await
            .map_err(|e| api_error("UpdateTemplate", e))?;
        Ok(())
    }

    async fn delete_template(&self, key: &ObjectKey) -> Result<(), ApiError> {
        self.client
            .delete_template()
            .aws_account_id(&key.account_id)
            .template_id(&key.object_id)
            .send()
            .await
            .map_err(|e| api_error("DeleteTemplate", e))?;
        Ok(())
    }

    async fn describe_template_permissions(
        &self,
        key: &ObjectKey,
    ) -> Result<Vec<Permission>, ApiError> {
        let output = self
            .client
            .describe_template_permissions()
            .aws_account_id(&key.account_id)
            .template_id(&key.object_id)
            .send()
            .await
            .map_err(|e| api_error("DescribeTemplatePermissions", e))?;
        Ok(from_sdk_permissions(output.permissions()))
    }

    async fn update_template_permissions(
        &self,
        key: &ObjectKey,
        grant: &[Permission],
        revoke: &[Permission],
    ) -> Result<(), ApiError> {
        self.client
            .update_template_permissions()
            .aws_account_id(&key.account_id)
            .template_id(&key.object_id)
            .set_grant_permissions(non_empty(to_sdk_permissions(grant)?))
            .set_revoke_permissions(non_empty(to_sdk_permissions(revoke)?))
            .send()
            .await
            .map_err(|e| api_error("UpdateTemplatePermissions", e))?;
        Ok(())
    }

    async fn create_data_source(&self, request: &DataSourceRequest) -> Result<String, ApiError> {
        let data_source_type = sdk::DataSourceType::from(request.parameters.data_source_type());
        let output = self
            .client
            .create_data_source()
            .aws_account_id(&request.key.account_id)
            .data_source_id(&request.key.object_id)
            .name(&request.name)
            .r#type(data_source_type)
            .data_source_parameters(to_sdk_parameters(&request.parameters)?)
            .set_credentials(to_sdk_credentials(request.credentials.as_ref())?)
            .set_permissions(non_empty(to_sdk_permissions(&request.permissions)?))
            .set_ssl_properties(to_sdk_ssl(request.disable_ssl))
            .set_vpc_connection_properties(to_sdk_vpc(request.vpc_connection_arn.as_ref())?)
            .set_tags(non_empty(to_sdk_tags(&request.tags)?))
            .send()
            .await
            .map_err(|e| api_error("CreateDataSource", e))?;
        Ok(output.arn().unwrap_or_default().to_string())
    }

    async fn describe_data_source(&self, key: &ObjectKey) -> Result<DataSource, ApiError> {
        let output = self
            .client
            .describe_data_source()
            .aws_account_id(&key.account_id)
            .data_source_id(&key.object_id)
            .send()
            .await
            .map_err(|e| api_error("DescribeDataSource", e))?;
        let data_source = output.data_source().ok_or_else(|| {
            ApiError::service("DescribeDataSource", "response has no data source")
        })?;

        Ok(DataSource {
            arn: data_source.arn().unwrap_or_default().to_string(),
            data_source_id: data_source
                .data_source_id()
                .unwrap_or(key.object_id.as_str())
                .to_string(),
            name: data_source.name().map(str::to_string),
            data_source_type: data_source.r#type().map(|t| t.as_str().to_string()),
            status: status(data_source.status()),
            parameters: data_source
                .data_source_parameters()
                .and_then(from_sdk_parameters),
            disable_ssl: data_source.ssl_properties().map(|ssl| ssl.disable_ssl()),
            vpc_connection_arn: data_source
                .vpc_connection_properties()
                .map(|vpc| vpc.vpc_connection_arn().to_string()),
            error_message: data_source
                .error_info()
                .and_then(|info| info.message())
                .map(str::to_string),
        })
    }

    async fn update_data_source(&self, request: &DataSourceRequest) -> Result<(), ApiError> {
        self.client
            .update_data_source()
            .aws_account_id(&request.key.account_id)
            .data_source_id(&request.key.object_id)
            .name(&request.name)
            .data_source_parameters(to_sdk_parameters(&request.parameters)?)
            .set_credentials(to_sdk_credentials(request.credentials.as_ref())?)
            .set_ssl_properties(to_sdk_ssl(request.disable_ssl))
            .set_vpc_connection_properties(to_sdk_vpc(request.vpc_connection_arn.as_ref())?)
            .send()
            .await
            .map_err(|e| api_error("UpdateDataSource", e))?;
        Ok(())
    }

    async fn delete_data_source(&self, key: &ObjectKey) -> Result<(), ApiError> {
        self.client
            .delete_data_source()
            .aws_account_id(&key.account_id)
            .data_source_id(&key.object_id)
            .send()
            .await
            .map_err(|e| api_error("DeleteDataSource", e))?;
        Ok(())
    }

    async fn describe_data_source_permissions(
        &self,
        key: &ObjectKey,
    ) -> Result<Vec<Permission>, ApiError> {
        let output = self
            .client
            .describe_data_source_permissions()
            .aws_account_id(&key.account_id)
            .data_source_id(&key.object_id)
            .send()
            .await
            .map_err(|e| api_error("DescribeDataSourcePermissions", e))?;
        Ok(from_sdk_permissions(output.permissions()))
    }

    async fn update_data_source_permissions(
        &self,
        key: &ObjectKey,
        grant: &[Permission],
        revoke: &[Permission],
    ) -> Result<(), ApiError> {
        self.client
            .update_data_source_permissions()
            .aws_account_id(&key.account_id)
            .data_source_id(&key.object_id)
            .set_grant_permissions(non_empty(to_sdk_permissions(grant)?))
            .set_revoke_permissions(non_empty(to_sdk_permissions(revoke)?))
            .send()
            .await
            .map_err(|e| api_error("UpdateDataSourcePermissions", e))?;
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, ApiError> {
        let output = self
            .client
            .list_tags_for_resource()
            .resource_arn(arn)
            .send()
            .await
            .map_err(|e| api_error("ListTagsForResource", e))?;
        Ok(output
            .tags()
            .iter()
            .map(|t| Tag::new(t.key(), t.value()))
            .collect())
    }

    async fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<(), ApiError> {
        self.client
            .tag_resource()
            .resource_arn(arn)
            .set_tags(Some(to_sdk_tags(tags)?))
            .send()
            .await
            .map_err(|e| api_error("TagResource", e))?;
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError> {
        self.client
            .untag_resource()
            .resource_arn(arn)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(|e| api_error("UntagResource", e))?;
        Ok(())
    }
}
