//! QuickSight group schema definition

use quill_core::resource::Value;
use quill_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::types;

pub const GROUP: &str = "quicksight.group";

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Returns the schema for QuickSight groups
pub fn group_schema() -> ResourceSchema {
    ResourceSchema::new(GROUP)
        .with_description("A QuickSight user group")
        .attribute(
            AttributeSchema::new("arn", AttributeType::String)
                .computed()
                .with_description("ARN of the group"),
        )
        .attribute(
            AttributeSchema::new("aws_account_id", types::aws_account_id())
                .optional()
                .computed()
                .force_new()
                .with_description("Account owning the group (defaults to the provider account)"),
        )
        .attribute(
            AttributeSchema::new("namespace", types::object_id())
                .optional()
                .force_new()
                .with_default(Value::string(DEFAULT_NAMESPACE)),
        )
        .attribute(
            AttributeSchema::new("group_name", types::object_id())
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String).optional())
        .attribute(AttributeSchema::new("principal_id", AttributeType::String).computed())
}
