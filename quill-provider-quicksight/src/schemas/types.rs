//! QuickSight-specific type definitions

use std::sync::LazyLock;

use quill_core::resource::Value;
use quill_core::schema::{AttributeSchema, AttributeType, types};
use regex::Regex;

static ARN_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^arn:[\w-]+:[\w-]+:[\w-]*:\d*:.+$"));

/// 12-digit AWS account id
pub fn aws_account_id() -> AttributeType {
    AttributeType::Custom {
        name: "AwsAccountId".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if s.len() == 12 && s.chars().all(|c| c.is_ascii_digit()) => Ok(()),
            Value::String(s) => Err(format!("Invalid AWS account id '{}', expected 12 digits", s)),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Amazon Resource Name
pub fn arn() -> AttributeType {
    AttributeType::Custom {
        name: "Arn".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            let Value::String(s) = value else {
                return Err("Expected string".to_string());
            };
            let pattern = ARN_PATTERN
                .as_ref()
                .map_err(|e| format!("Invalid ARN pattern: {}", e))?;
            if pattern.is_match(s) {
                Ok(())
            } else {
                Err(format!("Invalid ARN '{}'", s))
            }
        },
    }
}

/// Identifier segment: non-empty and free of the composite ID separator
pub fn object_id() -> AttributeType {
    AttributeType::Custom {
        name: "ObjectId".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if s.is_empty() => Err("Value must not be empty".to_string()),
            Value::String(s) if s.contains('/') => Err(format!("'{}' must not contain '/'", s)),
            Value::String(_) => Ok(()),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Repeated `{ principal, actions }` permission block
pub fn permission_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::Block(vec![
        AttributeSchema::new("principal", types::non_empty_string()).required(),
        AttributeSchema::new("actions", AttributeType::Set).required(),
    ])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn account_id_must_be_twelve_digits() {
        let t = aws_account_id();
        assert!(t.validate(&Value::string("111111111111")).is_ok());
        assert!(t.validate(&Value::string("1111")).is_err());
        assert!(t.validate(&Value::string("11111111111a")).is_err());
        assert!(t.validate(&Value::Int(1)).is_err());
    }

    #[test]
    fn arn_validation() {
        let t = arn();
        assert!(
            t.validate(&Value::string(
                "arn:aws:quicksight:us-east-1:111111111111:analysis/sales"
            ))
            .is_ok()
        );
        assert!(t.validate(&Value::string("not-an-arn")).is_err());
    }

    #[test]
    fn object_id_rejects_separator() {
        let t = object_id();
        assert!(t.validate(&Value::string("sales")).is_ok());
        assert!(t.validate(&Value::string("sales/eu")).is_err());
        assert!(t.validate(&Value::string("")).is_err());
    }

    #[test]
    fn permission_requires_principal_and_actions() {
        let t = permission_list();
        let mut block = HashMap::new();
        block.insert(
            "principal".to_string(),
            Value::string("arn:aws:quicksight:us-east-1:111111111111:group/default/analysts"),
        );
        block.insert(
            "actions".to_string(),
            Value::List(vec![Value::string("quicksight:DescribeDataSource")]),
        );
        assert!(t.validate(&Value::List(vec![Value::Map(block.clone())])).is_ok());

        block.remove("actions");
        assert!(t.validate(&Value::List(vec![Value::Map(block)])).is_err());
    }
}
