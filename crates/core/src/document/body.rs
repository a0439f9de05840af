//! Reserved attribute names and validation of JSON document bodies.
//!
//! Every backend stores the document key, version and deletion marker next to
//! the body fields, so a body may not use these names as top-level keys.

use std::time::Duration;

use serde_json::{Map, Value};

use super::{DocumentError, Result};

pub const PARTITION_KEY: &str = "partition_key";
pub const SORT_KEY: &str = "sort_key";
pub const VERSION: &str = "version";
pub const DELETED: &str = "deleted";

/// How long a tombstone is kept before the backend may remove it.
pub const DEFAULT_TOMBSTONE_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Attribute names owned by the store, in the order they are checked.
pub const RESERVED_ATTRIBUTES: [&str; 4] = [PARTITION_KEY, SORT_KEY, VERSION, DELETED];

const NOT_AN_OBJECT: &str = "The document must be a JSON object.";

/// Returns true if `name` belongs to the reserved attribute namespace.
pub fn is_reserved_attribute(name: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&name)
}

/// Parses a document body into its top-level fields.
///
/// Fails with [`DocumentError::MalformedDocument`] unless the body is a JSON
/// object, and with [`DocumentError::ReservedAttribute`] naming the first
/// reserved key it uses.
pub fn parse_body(body: &str) -> Result<Map<String, Value>> {
    let fields = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => return Err(DocumentError::MalformedDocument(NOT_AN_OBJECT.to_string())),
        Err(err) => {
            return Err(DocumentError::MalformedDocument(format!(
                "{} {}",
                NOT_AN_OBJECT, err
            )))
        }
    };

    if let Some(reserved) = RESERVED_ATTRIBUTES
        .iter()
        .find(|name| fields.contains_key(**name))
    {
        return Err(DocumentError::ReservedAttribute(reserved.to_string()));
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_object() {
        let fields = parse_body("{ \"key\": [1, 2], \"nested\": { \"a\": null } }").unwrap();

        assert_eq!(fields.len(), 2);
        assert!(fields["key"].is_array());
        assert!(fields["nested"].is_object());
    }

    #[test]
    fn test_parse_empty_object() {
        assert!(parse_body("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        for body in ["\"a\"", "10", "true", "false", "null", "[\"a\"]"] {
            let err = parse_body(body).unwrap_err();
            assert_eq!(err.to_string(), NOT_AN_OBJECT, "body: {}", body);
        }
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_body("{ \"a\": ").unwrap_err();

        assert!(matches!(err, DocumentError::MalformedDocument(_)));
        assert!(err.to_string().starts_with(NOT_AN_OBJECT));
    }

    #[test]
    fn test_parse_rejects_reserved_attributes() {
        for name in RESERVED_ATTRIBUTES {
            let body = format!("{{\"a\":1,\"{}\":2}}", name);
            let err = parse_body(&body).unwrap_err();

            assert_eq!(
                err.to_string(),
                format!("The document cannot use the special attribute \"{}\".", name)
            );
        }
    }

    #[test]
    fn test_reserved_names_are_only_checked_at_top_level() {
        let fields = parse_body("{ \"inner\": { \"version\": 2 } }").unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_is_reserved_attribute() {
        assert!(is_reserved_attribute("version"));
        assert!(is_reserved_attribute("deleted"));
        assert!(!is_reserved_attribute("Version"));
        assert!(!is_reserved_attribute("body"));
    }
}
