//! Request body decoding and schema validation.
//!
//! Validation is a capability injected per route through [`BodyValidator`].
//! The default implementation compiles a JSON Schema with the `jsonschema`
//! crate once, at registration time.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// One schema violation. `path` is a JSON pointer into the body, empty for
/// the document root or for decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyError {
    pub path: String,
    pub message: String,
}

impl BodyError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validates a decoded JSON body. An empty list means the body is valid.
pub trait BodyValidator: Send + Sync {
    fn validate(&self, body: &JsonValue) -> Vec<BodyError>;

    /// The schema to publish in API documentation, if there is one.
    fn schema(&self) -> Option<&JsonValue> {
        None
    }
}

/// [`BodyValidator`] backed by a compiled JSON Schema.
pub struct JsonSchemaValidator {
    schema: JsonValue,
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    pub fn new(schema: JsonValue) -> Result<Self, String> {
        let validator = jsonschema::validator_for(&schema).map_err(|e| e.to_string())?;
        Ok(Self { schema, validator })
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("schema", &self.schema)
            .finish()
    }
}

impl BodyValidator for JsonSchemaValidator {
    fn validate(&self, body: &JsonValue) -> Vec<BodyError> {
        self.validator
            .iter_errors(body)
            .map(|error| BodyError::new(error.instance_path.to_string(), error.to_string()))
            .collect()
    }

    fn schema(&self) -> Option<&JsonValue> {
        Some(&self.schema)
    }
}

/// Decodes and validates a raw request body.
///
/// Without a validator any body is accepted: valid JSON is passed through
/// decoded, anything else is handed to the handler as a JSON string. With a
/// validator, an absent body is validated as `null` and a decode failure is
/// reported as a validation error.
pub fn validate_body(
    validator: Option<&dyn BodyValidator>,
    raw: Option<&str>,
) -> Result<Option<JsonValue>, Vec<BodyError>> {
    let raw = raw.filter(|body| !body.is_empty());

    let Some(validator) = validator else {
        return Ok(raw.map(|body| {
            serde_json::from_str(body).unwrap_or_else(|_| JsonValue::String(body.to_string()))
        }));
    };

    let decoded = match raw {
        Some(body) => serde_json::from_str(body)
            .map_err(|e| vec![BodyError::new("", format!("invalid JSON body: {}", e))])?,
        None => JsonValue::Null,
    };

    let errors = validator.validate(&decoded);
    if errors.is_empty() {
        Ok(Some(decoded).filter(|v| !v.is_null()))
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credit_card_schema() -> JsonSchemaValidator {
        JsonSchemaValidator::new(json!({
            "type": "object",
            "properties": { "creditCardNumber": { "type": "string" } },
            "required": ["creditCardNumber"]
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_body_is_decoded() {
        let validator = credit_card_schema();
        let body = validate_body(
            Some(&validator),
            Some(r#"{"creditCardNumber": "1234 5678 8765 4321"}"#),
        )
        .unwrap();
        assert_eq!(body, Some(json!({"creditCardNumber": "1234 5678 8765 4321"})));
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let validator = credit_card_schema();
        let errors = validate_body(
            Some(&validator),
            Some(r#"{"creditCard": "1234 5678 8765 4321"}"#),
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("creditCardNumber"));
    }

    #[test]
    fn test_malformed_json_is_a_validation_error() {
        let validator = credit_card_schema();
        let errors = validate_body(Some(&validator), Some("{not json")).unwrap_err();
        assert!(errors[0].message.starts_with("invalid JSON body"));
    }

    #[test]
    fn test_absent_body_is_validated_as_null() {
        let validator = credit_card_schema();
        assert!(validate_body(Some(&validator), None).is_err());
        assert!(validate_body(Some(&validator), Some("")).is_err());
    }

    #[test]
    fn test_without_schema_anything_goes() {
        assert_eq!(validate_body(None, None), Ok(None));
        assert_eq!(validate_body(None, Some("{\"a\":1}")), Ok(Some(json!({"a": 1}))));
        assert_eq!(
            validate_body(None, Some("plain text")),
            Ok(Some(json!("plain text")))
        );
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        assert!(JsonSchemaValidator::new(json!({"type": 12})).is_err());
    }
}
