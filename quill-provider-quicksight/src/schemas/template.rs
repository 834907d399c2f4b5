//! QuickSight template schema definition

use quill_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types as core_types};

use super::types;

pub const TEMPLATE: &str = "quicksight.template";

fn source_entity() -> AttributeType {
    let data_set_reference = AttributeType::Block(vec![
        AttributeSchema::new("data_set_arn", types::arn()).required(),
        AttributeSchema::new("data_set_placeholder", core_types::non_empty_string()).required(),
    ]);

    AttributeType::Union(vec![
        AttributeSchema::new(
            "source_analysis",
            AttributeType::Block(vec![
                AttributeSchema::new("arn", types::arn()).required(),
                AttributeSchema::new(
                    "data_set_references",
                    AttributeType::List(Box::new(data_set_reference)),
                )
                .optional(),
            ]),
        ),
        AttributeSchema::new(
            "source_template",
            AttributeType::Block(vec![AttributeSchema::new("arn", types::arn()).required()]),
        ),
    ])
}

/// Returns the schema for QuickSight templates
pub fn template_schema() -> ResourceSchema {
    ResourceSchema::new(TEMPLATE)
        .with_description("A QuickSight template created from an analysis or another template")
        .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("aws_account_id", types::aws_account_id())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("template_id", types::object_id())
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("name", core_types::non_empty_string()).optional())
        .attribute(
            AttributeSchema::new("permission", types::permission_list())
                .optional()
                .unordered(),
        )
        .attribute(
            AttributeSchema::new("source_entity", source_entity())
                .required()
                .write_only()
                .with_description("Exactly one of source_analysis or source_template"),
        )
        .attribute(AttributeSchema::new("tags", core_types::string_map()).optional())
        .attribute(
            AttributeSchema::new("version_description", core_types::non_empty_string())
                .optional(),
        )
        .attribute(AttributeSchema::new("version_number", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("source_entity_arn", AttributeType::String)
                .computed()
                .with_description("ARN of the analysis or template the current version came from"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::resource::Value;
    use quill_core::schema::TypeError;
    use std::collections::HashMap;

    fn source(kind: &str) -> (String, Value) {
        let mut inner = HashMap::new();
        inner.insert(
            "arn".to_string(),
            Value::string("arn:aws:quicksight:us-east-1:111111111111:analysis/sales"),
        );
        (kind.to_string(), Value::Map(inner))
    }

    fn attrs(sources: &[&str]) -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert("template_id".to_string(), Value::string("report"));
        attrs.insert(
            "source_entity".to_string(),
            Value::Map(sources.iter().map(|k| source(k)).collect()),
        );
        attrs
    }

    #[test]
    fn valid_template_from_analysis() {
        assert!(template_schema().validate(&attrs(&["source_analysis"])).is_ok());
    }

    #[test]
    fn source_entity_needs_exactly_one_source() {
        let errors = template_schema()
            .validate(&attrs(&["source_analysis", "source_template"]))
            .unwrap_err();
        assert!(matches!(
            &errors[0],
            TypeError::MapValueError { key, inner }
                if key == "source_entity" && matches!(**inner, TypeError::ExactlyOneOf { got: 2, .. })
        ));

        assert!(template_schema().validate(&attrs(&[])).is_err());
    }
}
