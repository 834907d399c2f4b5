//! QuickSight data source schema definition

use quill_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types as core_types};

use super::types;

pub const DATA_SOURCE: &str = "quicksight.data_source";

fn required(name: &str, attr_type: AttributeType) -> AttributeSchema {
    AttributeSchema::new(name, attr_type).required()
}

fn endpoint() -> AttributeType {
    AttributeType::Block(vec![
        required("database", core_types::non_empty_string()),
        required("host", core_types::non_empty_string()),
        required("port", core_types::port()),
    ])
}

fn site() -> AttributeType {
    AttributeType::Block(vec![required("site_base_url", core_types::non_empty_string())])
}

/// Connection parameters, one block per backend
pub fn parameters() -> AttributeType {
    AttributeType::Union(vec![
        AttributeSchema::new(
            "amazon_elasticsearch",
            AttributeType::Block(vec![required("domain", core_types::non_empty_string())]),
        ),
        AttributeSchema::new(
            "athena",
            AttributeType::Block(vec![
                AttributeSchema::new("work_group", core_types::non_empty_string()).optional(),
            ]),
        ),
        AttributeSchema::new("aurora", endpoint()),
        AttributeSchema::new("aurora_postgresql", endpoint()),
        AttributeSchema::new(
            "aws_iot_analytics",
            AttributeType::Block(vec![required("data_set_name", core_types::non_empty_string())]),
        ),
        AttributeSchema::new("jira", site()),
        AttributeSchema::new("maria_db", endpoint()),
        AttributeSchema::new("mysql", endpoint()),
        AttributeSchema::new("postgresql", endpoint()),
        AttributeSchema::new(
            "presto",
            AttributeType::Block(vec![
                required("catalog", core_types::non_empty_string()),
                required("host", core_types::non_empty_string()),
                required("port", core_types::port()),
            ]),
        ),
        AttributeSchema::new(
            "redshift",
            AttributeType::Block(vec![
                AttributeSchema::new("cluster_id", core_types::non_empty_string()).optional(),
                required("database", core_types::non_empty_string()),
                AttributeSchema::new("host", core_types::non_empty_string()).optional(),
                AttributeSchema::new("port", core_types::port()).optional(),
            ]),
        ),
        AttributeSchema::new(
            "s3",
            AttributeType::Block(vec![required(
                "manifest_file_location",
                AttributeType::Block(vec![
                    required("bucket", core_types::non_empty_string()),
                    required("key", core_types::non_empty_string()),
                ]),
            )]),
        ),
        AttributeSchema::new("service_now", site()),
        AttributeSchema::new(
            "snowflake",
            AttributeType::Block(vec![
                required("database", core_types::non_empty_string()),
                required("host", core_types::non_empty_string()),
                required("warehouse", core_types::non_empty_string()),
            ]),
        ),
        AttributeSchema::new(
            "spark",
            AttributeType::Block(vec![
                required("host", core_types::non_empty_string()),
                required("port", core_types::port()),
            ]),
        ),
        AttributeSchema::new("sql_server", endpoint()),
        AttributeSchema::new("teradata", endpoint()),
        AttributeSchema::new(
            "twitter",
            AttributeType::Block(vec![
                required("max_rows", core_types::positive_int()),
                required("query", core_types::non_empty_string()),
            ]),
        ),
    ])
}

/// Returns the schema for QuickSight data sources
pub fn data_source_schema() -> ResourceSchema {
    ResourceSchema::new(DATA_SOURCE)
        .with_description("A QuickSight data source")
        .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("aws_account_id", types::aws_account_id())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("data_source_id", types::object_id())
                .required()
                .force_new(),
        )
        .attribute(required("name", core_types::non_empty_string()))
        .attribute(
            AttributeSchema::new(
                "credentials",
                AttributeType::Block(vec![required(
                    "credential_pair",
                    AttributeType::Block(vec![
                        required("username", core_types::non_empty_string()),
                        required("password", core_types::non_empty_string()),
                    ]),
                )]),
            )
            .optional()
            .write_only(),
        )
        .attribute(
            required("parameters", parameters())
                .with_description("Exactly one backend block; the data source type follows from it"),
        )
        .attribute(
            AttributeSchema::new("permission", types::permission_list())
                .optional()
                .unordered(),
        )
        .attribute(
            AttributeSchema::new(
                "ssl_properties",
                AttributeType::Block(vec![
                    AttributeSchema::new("disable_ssl", AttributeType::Bool).optional(),
                ]),
            )
            .optional(),
        )
        .attribute(AttributeSchema::new("tags", core_types::string_map()).optional())
        .attribute(AttributeSchema::new("type", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new(
                "vpc_connection_properties",
                AttributeType::Block(vec![
                    AttributeSchema::new("vpc_connection_arn", types::arn()).optional(),
                ]),
            )
            .optional(),
        )
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::resource::Value;
    use std::collections::HashMap;

    fn map(pairs: Vec<(&str, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn attrs(parameters: Value) -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert("data_source_id".to_string(), Value::string("sales"));
        attrs.insert("name".to_string(), Value::string("Sales"));
        attrs.insert("parameters".to_string(), parameters);
        attrs
    }

    fn postgres(port: i64) -> Value {
        map(vec![(
            "postgresql",
            map(vec![
                ("database", Value::string("sales")),
                ("host", Value::string("db.internal")),
                ("port", Value::Int(port)),
            ]),
        )])
    }

    #[test]
    fn valid_postgresql_data_source() {
        assert!(data_source_schema().validate(&attrs(postgres(5432))).is_ok());
    }

    #[test]
    fn port_out_of_range() {
        assert!(data_source_schema().validate(&attrs(postgres(0))).is_err());
    }

    #[test]
    fn parameters_need_one_backend() {
        assert!(data_source_schema().validate(&attrs(map(vec![]))).is_err());

        let two = map(vec![
            ("athena", map(vec![])),
            (
                "jira",
                map(vec![("site_base_url", Value::string("https://jira.example.com"))]),
            ),
        ]);
        assert!(data_source_schema().validate(&attrs(two)).is_err());
    }

    #[test]
    fn s3_manifest_location() {
        let s3 = map(vec![(
            "s3",
            map(vec![(
                "manifest_file_location",
                map(vec![
                    ("bucket", Value::string("reports")),
                    ("key", Value::string("manifest.json")),
                ]),
            )]),
        )]);
        assert!(data_source_schema().validate(&attrs(s3)).is_ok());
    }

    #[test]
    fn type_is_computed() {
        let mut attrs = attrs(postgres(5432));
        attrs.insert("type".to_string(), Value::string("POSTGRESQL"));
        assert!(data_source_schema().validate(&attrs).is_err());
    }
}
