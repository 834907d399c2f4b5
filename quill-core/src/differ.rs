//! Differ - Compare desired state with current state
//!
//! Compares the desired state declared in configuration with the current
//! state fetched from the Provider and decides which lifecycle operation is
//! needed to converge.

use std::collections::HashMap;

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs in-place update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute changed -> delete and create again
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Compare desired state with current state using the resource schema
///
/// Write-only attributes are never reported, since the remote service does
/// not return them. Unordered lists only count as changed when their
/// elements differ. A change to a force-new attribute turns the update into
/// a replacement.
pub fn diff_with_schema(desired: &Resource, current: &State, schema: &ResourceSchema) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed: Vec<String> = find_changed_attributes(&desired.attributes, &current.attributes)
        .into_iter()
        .filter(|name| match schema.attributes.get(name) {
            Some(a) if a.write_only => false,
            Some(a) if a.unordered => {
                match (desired.attributes.get(name), current.attributes.get(name)) {
                    (Some(want), Some(have)) => !same_elements(want, have),
                    _ => true,
                }
            }
            _ => true,
        })
        .collect();

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let replace = changed.iter().any(|name| {
        schema
            .attributes
            .get(name)
            .map(|a| a.force_new)
            .unwrap_or(false)
    });

    if replace {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Whether an attribute differs between two attribute sets
///
/// An attribute missing on one side and present on the other counts as
/// changed.
pub fn has_change(
    old: &HashMap<String, Value>,
    new: &HashMap<String, Value>,
    key: &str,
) -> bool {
    old.get(key) != new.get(key)
}

/// Whether two lists hold the same elements, ignoring order
fn same_elements(a: &Value, b: &Value) -> bool {
    let (Value::List(a), Value::List(b)) = (a, b) else {
        return a == b;
    };
    if a.len() != b.len() {
        return false;
    }

    let mut remaining: Vec<&Value> = b.iter().collect();
    a.iter().all(|item| match remaining.iter().position(|other| *other == item) {
        Some(i) => {
            remaining.swap_remove(i);
            true
        }
        None => false,
    })
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}
