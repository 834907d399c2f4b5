//! Tag helpers
//!
//! Tags are configured as a string map and sent to QuickSight as a list of
//! key/value pairs.

use std::collections::HashMap;

use quill_core::resource::Value;

use crate::models::Tag;

/// Convert a configured `tags` map into API tags, sorted by key
///
/// Non-string values are skipped; schema validation rejects them earlier.
pub fn tags_from_map(map: &HashMap<String, Value>) -> Vec<Tag> {
    let mut tags: Vec<Tag> = map
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|v| Tag::new(k.clone(), v)))
        .collect();
    tags.sort();
    tags
}

/// Convert API tags into the attribute representation
pub fn tags_to_map(tags: &[Tag]) -> HashMap<String, Value> {
    tags.iter()
        .map(|t| (t.key.clone(), Value::string(&t.value)))
        .collect()
}

/// Compute the tags to set and the tags to remove to go from `old` to `new`
///
/// A key whose value changed is both removed and set again.
pub fn diff_tags(old: &[Tag], new: &[Tag]) -> (Vec<Tag>, Vec<Tag>) {
    let new_values: HashMap<&str, &str> = new
        .iter()
        .map(|t| (t.key.as_str(), t.value.as_str()))
        .collect();

    let create: Vec<Tag> = new
        .iter()
        .filter(|t| !old.contains(t))
        .cloned()
        .collect();

    let remove: Vec<Tag> = old
        .iter()
        .filter(|t| new_values.get(t.key.as_str()) != Some(&t.value.as_str()))
        .cloned()
        .collect();

    (create, remove)
}

/// Keys of the given tags
pub fn tag_keys(tags: &[Tag]) -> Vec<String> {
    tags.iter().map(|t| t.key.clone()).collect()
}
