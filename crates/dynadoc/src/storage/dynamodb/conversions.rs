//! Conversions between JSON values and DynamoDB attribute values.
//!
//! Pure functions, testable without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use base64::Engine;
use dynadoc_core::{DocumentError, Result};
use serde_json::{Map, Number, Value};

/// A DynamoDB item or key.
pub type Item = HashMap<String, AttributeValue>;

/// Convert a JSON value to an attribute value.
///
/// Numbers keep their exact decimal text.
pub fn json_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(json_to_attribute).collect()),
        Value::Object(fields) => AttributeValue::M(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), json_to_attribute(value)))
                .collect(),
        ),
    }
}

/// Convert an attribute value to a JSON value.
///
/// String and number sets become arrays, binary values become base64
/// strings.
pub fn attribute_to_json(value: &AttributeValue) -> Result<Value> {
    let json = match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::L(values) => Value::Array(
            values
                .iter()
                .map(attribute_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        AttributeValue::M(fields) => Value::Object(attributes_to_json(fields.iter())?),
        AttributeValue::Ss(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<Vec<_>>>()?,
        ),
        AttributeValue::B(blob) => Value::String(encode_binary(blob.as_ref())),
        AttributeValue::Bs(blobs) => Value::Array(
            blobs
                .iter()
                .map(|blob| Value::String(encode_binary(blob.as_ref())))
                .collect(),
        ),
        other => {
            return Err(DocumentError::InvalidData(format!(
                "Unsupported attribute value: {:?}",
                other
            )))
        }
    };

    Ok(json)
}

/// Convert named attributes to a JSON object.
pub fn attributes_to_json<'a>(
    attributes: impl Iterator<Item = (&'a String, &'a AttributeValue)>,
) -> Result<Map<String, Value>> {
    attributes
        .map(|(name, value)| Ok((name.clone(), attribute_to_json(value)?)))
        .collect()
}

/// Read a required string attribute.
pub fn get_string(item: &Item, name: &str) -> Result<String> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        Some(other) => Err(DocumentError::InvalidData(format!(
            "Attribute {} is not a string: {:?}",
            name, other
        ))),
        None => Err(DocumentError::MissingAttribute(name.to_string())),
    }
}

/// Read a required integer attribute.
pub fn get_i64(item: &Item, name: &str) -> Result<i64> {
    match item.get(name) {
        Some(AttributeValue::N(n)) => n.parse().map_err(|e| {
            DocumentError::InvalidData(format!("Attribute {} is not an integer: {}", name, e))
        }),
        Some(other) => Err(DocumentError::InvalidData(format!(
            "Attribute {} is not a number: {:?}",
            name, other
        ))),
        None => Err(DocumentError::MissingAttribute(name.to_string())),
    }
}

fn parse_number(text: &str) -> Result<Number> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Number(n)) => Ok(n),
        _ => Err(DocumentError::InvalidData(format!("Invalid number: {}", text))),
    }
}

fn encode_binary(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
