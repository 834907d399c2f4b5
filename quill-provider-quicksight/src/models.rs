//! QuickSight object models
//!
//! Plain request and response types exchanged with [`crate::client::QuickSightApi`].
//! They mirror the parts of the QuickSight API the provider manages and keep
//! the resources independent of the AWS SDK types.

use std::collections::BTreeSet;

/// Key/value tag attached to a QuickSight object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Actions granted to a principal on a QuickSight object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Permission {
    pub principal: String,
    pub actions: BTreeSet<String>,
}

/// Lifecycle status reported for asynchronously provisioned objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    CreationInProgress,
    CreationSuccessful,
    CreationFailed,
    UpdateInProgress,
    UpdateSuccessful,
    UpdateFailed,
    Deleted,
    Unknown(String),
}

impl ResourceStatus {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "CREATION_IN_PROGRESS" => ResourceStatus::CreationInProgress,
            "CREATION_SUCCESSFUL" => ResourceStatus::CreationSuccessful,
            "CREATION_FAILED" => ResourceStatus::CreationFailed,
            "UPDATE_IN_PROGRESS" => ResourceStatus::UpdateInProgress,
            "UPDATE_SUCCESSFUL" => ResourceStatus::UpdateSuccessful,
            "UPDATE_FAILED" => ResourceStatus::UpdateFailed,
            "DELETED" => ResourceStatus::Deleted,
            other => ResourceStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceStatus::CreationInProgress => "CREATION_IN_PROGRESS",
            ResourceStatus::CreationSuccessful => "CREATION_SUCCESSFUL",
            ResourceStatus::CreationFailed => "CREATION_FAILED",
            ResourceStatus::UpdateInProgress => "UPDATE_IN_PROGRESS",
            ResourceStatus::UpdateSuccessful => "UPDATE_SUCCESSFUL",
            ResourceStatus::UpdateFailed => "UPDATE_FAILED",
            ResourceStatus::Deleted => "DELETED",
            ResourceStatus::Unknown(s) => s,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            ResourceStatus::CreationInProgress | ResourceStatus::UpdateInProgress
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            ResourceStatus::CreationFailed | ResourceStatus::UpdateFailed
        )
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of an object identified by account and object id (templates, data sources)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub account_id: String,
    pub object_id: String,
}

impl ObjectKey {
    pub fn new(account_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            object_id: object_id.into(),
        }
    }
}

// =============================================================================
// Groups
// =============================================================================

/// Address of a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey {
    pub account_id: String,
    pub namespace: String,
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRequest {
    pub key: GroupKey,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub arn: String,
    pub group_name: String,
    pub description: Option<String>,
    pub principal_id: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Dataset placeholder of an analysis used as a template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSetReference {
    pub data_set_arn: String,
    pub data_set_placeholder: String,
}

/// Object a template version is created from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Analysis {
        arn: String,
        data_set_references: Vec<DataSetReference>,
    },
    Template {
        arn: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRequest {
    pub key: ObjectKey,
    pub name: Option<String>,
    pub source: TemplateSource,
    pub version_description: Option<String>,
    pub permissions: Vec<Permission>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub arn: String,
    pub template_id: String,
    pub name: Option<String>,
    pub version_number: Option<i64>,
    pub version_description: Option<String>,
    pub source_entity_arn: Option<String>,
    pub status: Option<ResourceStatus>,
}

// =============================================================================
// Data sources
// =============================================================================

/// Host, port and database of a relational engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEndpoint {
    pub host: String,
    pub port: i32,
    pub database: String,
}

/// Connection parameters of a data source; exactly one backend is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceParameters {
    AmazonElasticsearch {
        domain: String,
    },
    Athena {
        work_group: Option<String>,
    },
    Aurora(DatabaseEndpoint),
    AuroraPostgreSql(DatabaseEndpoint),
    AwsIotAnalytics {
        data_set_name: String,
    },
    Jira {
        site_base_url: String,
    },
    MariaDb(DatabaseEndpoint),
    MySql(DatabaseEndpoint),
    PostgreSql(DatabaseEndpoint),
    Presto {
        host: String,
        port: i32,
        catalog: String,
    },
    Redshift {
        cluster_id: Option<String>,
        database: String,
        host: Option<String>,
        port: Option<i32>,
    },
    S3 {
        bucket: String,
        key: String,
    },
    ServiceNow {
        site_base_url: String,
    },
    Snowflake {
        host: String,
        database: String,
        warehouse: String,
    },
    Spark {
        host: String,
        port: i32,
    },
    SqlServer(DatabaseEndpoint),
    Teradata(DatabaseEndpoint),
    Twitter {
        query: String,
        max_rows: i32,
    },
}

impl DataSourceParameters {
    /// The data source type the service expects for these parameters
    pub fn data_source_type(&self) -> &'static str {
        match self {
            DataSourceParameters::AmazonElasticsearch { .. } => "AMAZON_ELASTICSEARCH",
            DataSourceParameters::Athena { .. } => "ATHENA",
            DataSourceParameters::Aurora(_) => "AURORA",
            DataSourceParameters::AuroraPostgreSql(_) => "AURORA_POSTGRESQL",
            DataSourceParameters::AwsIotAnalytics { .. } => "AWS_IOT_ANALYTICS",
            DataSourceParameters::Jira { .. } => "JIRA",
            DataSourceParameters::MariaDb(_) => "MARIADB",
            DataSourceParameters::MySql(_) => "MYSQL",
            DataSourceParameters::PostgreSql(_) => "POSTGRESQL",
            DataSourceParameters::Presto { .. } => "PRESTO",
            DataSourceParameters::Redshift { .. } => "REDSHIFT",
            DataSourceParameters::S3 { .. } => "S3",
            DataSourceParameters::ServiceNow { .. } => "SERVICENOW",
            DataSourceParameters::Snowflake { .. } => "SNOWFLAKE",
            DataSourceParameters::Spark { .. } => "SPARK",
            DataSourceParameters::SqlServer(_) => "SQLSERVER",
            DataSourceParameters::Teradata(_) => "TERADATA",
            DataSourceParameters::Twitter { .. } => "TWITTER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceRequest {
    pub key: ObjectKey,
    pub name: String,
    pub parameters: DataSourceParameters,
    pub credentials: Option<CredentialPair>,
    pub permissions: Vec<Permission>,
    pub disable_ssl: Option<bool>,
    pub vpc_connection_arn: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub arn: String,
    pub data_source_id: String,
    pub name: Option<String>,
    pub data_source_type: Option<String>,
    pub status: Option<ResourceStatus>,
    pub parameters: Option<DataSourceParameters>,
    pub disable_ssl: Option<bool>,
    pub vpc_connection_arn: Option<String>,
    pub error_message: Option<String>,
}
