//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type, enabling type
//! validation before any remote call is made.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// Ordered list
    List(Box<AttributeType>),
    /// Unordered set of strings
    Set,
    /// String-keyed map
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Block(Vec<AttributeSchema>),
    /// Nested block in which exactly one member is set
    Union(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Set, v @ (Value::Set(_) | Value::List(_))) => {
                if v.to_string_set().is_some() {
                    Ok(())
                } else {
                    Err(TypeError::TypeMismatch {
                        expected: self.type_name(),
                        got: v.type_name(),
                    })
                }
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(members), Value::Map(map)) => validate_block(members, map),

            (AttributeType::Union(members), Value::Map(map)) => {
                if map.len() != 1 {
                    return Err(TypeError::ExactlyOneOf {
                        expected: members.iter().map(|m| m.name.clone()).collect(),
                        got: map.len(),
                    });
                }
                validate_block(members, map)
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Rewrite a value into the canonical shape for this type
    ///
    /// Lists of strings become sets where the type is a set, recursively
    /// through nested blocks, so that configured and observed values compare
    /// equal.
    pub fn normalize(&self, value: Value) -> Value {
        match (self, value) {
            (AttributeType::Set, Value::List(items)) => {
                let list = Value::List(items);
                match list.to_string_set() {
                    Some(set) => Value::Set(set),
                    None => list,
                }
            }
            (AttributeType::List(inner), Value::List(items)) => {
                Value::List(items.into_iter().map(|v| inner.normalize(v)).collect())
            }
            (AttributeType::Map(inner), Value::Map(map)) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, inner.normalize(v)))
                    .collect(),
            ),
            (AttributeType::Block(members) | AttributeType::Union(members), Value::Map(map)) => {
                Value::Map(
                    map.into_iter()
                        .map(|(k, v)| {
                            let v = match members.iter().find(|m| m.name == k) {
                                Some(member) => member.attr_type.normalize(v),
                                None => v,
                            };
                            (k, v)
                        })
                        .collect(),
                )
            }
            (AttributeType::Custom { base, .. }, v) => base.normalize(v),
            (_, v) => v,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set => "Set<String>".to_string(),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
            AttributeType::Union(members) => format!(
                "OneOf({})",
                members
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" | ")
            ),
        }
    }
}

fn validate_block(
    members: &[AttributeSchema],
    map: &HashMap<String, Value>,
) -> Result<(), TypeError> {
    for member in members {
        if member.required && !map.contains_key(&member.name) && member.default.is_none() {
            return Err(TypeError::MissingRequired {
                name: member.name.clone(),
            });
        }
    }
    for (key, value) in map {
        let member = members
            .iter()
            .find(|m| &m.name == key)
            .ok_or_else(|| TypeError::UnknownAttribute { name: key.clone() })?;
        member
            .attr_type
            .validate(value)
            .map_err(|e| TypeError::MapValueError {
                key: key.clone(),
                inner: Box::new(e),
            })?;
    }
    Ok(())
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Exactly one of {} must be set, got {got}", expected.join(", "))]
    ExactlyOneOf { expected: Vec<String>, got: usize },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Set(_) => "Set".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// May be set from configuration even though it is also computed
    pub optional: bool,
    /// Filled in from the remote object when not configured
    pub computed: bool,
    /// Changing the value requires replacing the remote object
    pub force_new: bool,
    /// Sent to the remote service but never returned by it (e.g., passwords)
    pub write_only: bool,
    /// List whose element order carries no meaning (compared as a multiset)
    pub unordered: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            write_only: false,
            unordered: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn unordered(mut self) -> Self {
        self.unordered = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Computed and not settable from configuration
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.required && !self.optional && self.default.is_none()
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        // Type check each attribute
        for (name, value) in attributes {
            match self.attributes.get(name) {
                Some(schema) if schema.is_read_only() => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() });
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::MapValueError {
                            key: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in defaults and canonicalize values (lists of strings into sets)
    pub fn normalize(&self, attributes: HashMap<String, Value>) -> HashMap<String, Value> {
        let mut normalized: HashMap<String, Value> = attributes
            .into_iter()
            .map(|(name, value)| match self.attributes.get(&name) {
                Some(schema) => {
                    let value = schema.attr_type.normalize(value);
                    (name, value)
                }
                None => (name, value),
            })
            .collect();

        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && !normalized.contains_key(name)
            {
                normalized.insert(name.clone(), default.clone());
            }
        }

        normalized
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// TCP port type (1-65535)
    pub fn port() -> AttributeType {
        AttributeType::Custom {
            name: "Port".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (1..=65535).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Port {} is out of range 1-65535", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// String type that rejects the empty string
    pub fn non_empty_string() -> AttributeType {
        AttributeType::Custom {
            name: "NonEmptyString".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if !s.is_empty() => Ok(()),
                Value::String(_) => Err("Value must not be empty".to_string()),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// Map of string to string, e.g. resource tags
    pub fn string_map() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn block() -> AttributeType {
        AttributeType::Block(vec![
            AttributeSchema::new("host", types::non_empty_string()).required(),
            AttributeSchema::new("port", types::port()).required(),
            AttributeSchema::new("actions", AttributeType::Set),
        ])
    }

    fn union() -> AttributeType {
        AttributeType::Union(vec![
            AttributeSchema::new("athena", AttributeType::Block(vec![])),
            AttributeSchema::new("mysql", block()),
        ])
    }

    fn map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::Enum(vec!["a".to_string(), "b".to_string()]);
        assert!(t.validate(&Value::String("a".to_string())).is_ok());
        assert!(t.validate(&Value::String("c".to_string())).is_err());
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(100)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
    }

    #[test]
    fn validate_port_and_non_empty() {
        assert!(types::port().validate(&Value::Int(5432)).is_ok());
        assert!(types::port().validate(&Value::Int(0)).is_err());
        assert!(types::port().validate(&Value::Int(70000)).is_err());
        assert!(types::non_empty_string().validate(&Value::string("")).is_err());
        assert!(types::non_empty_string().validate(&Value::Int(1)).is_err());
    }

    #[test]
    fn validate_block_members() {
        let t = block();
        assert!(
            t.validate(&map(&[
                ("host", Value::string("db.internal")),
                ("port", Value::Int(3306)),
            ]))
            .is_ok()
        );
        assert!(matches!(
            t.validate(&map(&[("host", Value::string("db.internal"))])),
            Err(TypeError::MissingRequired { .. })
        ));
        assert!(matches!(
            t.validate(&map(&[
                ("host", Value::string("db.internal")),
                ("port", Value::Int(3306)),
                ("hots", Value::string("typo")),
            ])),
            Err(TypeError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn union_requires_exactly_one_member() {
        let t = union();
        assert!(t.validate(&map(&[("athena", map(&[]))])).is_ok());
        assert!(matches!(
            t.validate(&map(&[])),
            Err(TypeError::ExactlyOneOf { got: 0, .. })
        ));
        assert!(matches!(
            t.validate(&map(&[
                ("athena", map(&[])),
                (
                    "mysql",
                    map(&[
                        ("host", Value::string("db")),
                        ("port", Value::Int(3306))
                    ])
                ),
            ])),
            Err(TypeError::ExactlyOneOf { got: 2, .. })
        ));
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::positive_int()))
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("my-resource".to_string()));
        attrs.insert("count".to_string(), Value::Int(5));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("group")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let attrs = HashMap::new();
        let result = schema.validate(&attrs);
        assert!(result.is_err());
    }

    #[test]
    fn computed_only_attribute_cannot_be_set() {
        let schema = ResourceSchema::new("group")
            .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("aws_account_id", AttributeType::String)
                    .optional()
                    .computed(),
            );

        let mut attrs = HashMap::new();
        attrs.insert("arn".to_string(), Value::string("arn:aws:..."));
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(errors[0], TypeError::ComputedAttribute { .. }));
    }

    #[test]
    fn normalize_converts_sets_and_applies_defaults() {
        let schema = ResourceSchema::new("group")
            .attribute(
                AttributeSchema::new("namespace", AttributeType::String)
                    .with_default(Value::string("default")),
            )
            .attribute(AttributeSchema::new(
                "permission",
                AttributeType::List(Box::new(AttributeType::Block(vec![
                    AttributeSchema::new("principal", AttributeType::String).required(),
                    AttributeSchema::new("actions", AttributeType::Set).required(),
                ]))),
            ));

        let mut attrs = HashMap::new();
        attrs.insert(
            "permission".to_string(),
            Value::List(vec![map(&[
                ("principal", Value::string("arn:aws:quicksight:::user/a")),
                (
                    "actions",
                    Value::List(vec![Value::string("b"), Value::string("a")]),
                ),
            ])]),
        );

        let normalized = schema.normalize(attrs);
        assert_eq!(normalized.get("namespace"), Some(&Value::string("default")));
        let permission = &normalized["permission"].as_list().unwrap()[0];
        assert_eq!(
            permission.as_map().unwrap()["actions"],
            Value::Set(BTreeSet::from(["a".to_string(), "b".to_string()]))
        );
    }
}
