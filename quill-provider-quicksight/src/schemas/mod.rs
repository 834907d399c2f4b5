//! QuickSight resource schema definitions

pub mod data_source;
pub mod group;
pub mod template;
pub mod types;

use quill_core::schema::ResourceSchema;

/// Returns all QuickSight schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![
        group::group_schema(),
        template::template_schema(),
        data_source::data_source_schema(),
    ]
}
