pub mod patch;
pub mod service;

use std::fmt;

use serde_json::Value;

/// A single request validation failure. The `Display` form is the message
/// returned to callers, so it must stay stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(String),
    InvalidValueType { path: String },
    InvalidPath(String),
    InvalidOperation { op: String, path: String },
    NonNumericGatewayAccountId,
    UnsupportedQuery,
    InvalidQueryParam(String),
    UnsupportedLanguage(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => write!(f, "Field [{field}] is required"),
            ValidationError::InvalidValueType { path } => {
                write!(f, "Value for path [{path}] must be a JSON")
            }
            ValidationError::InvalidPath(path) => write!(f, "Path [{path}] is invalid"),
            ValidationError::InvalidOperation { op, path } => {
                write!(f, "Operation [{op}] is invalid for path [{path}]")
            }
            ValidationError::NonNumericGatewayAccountId => write!(
                f,
                "Field [{}] must contain numeric values",
                service::FIELD_GATEWAY_ACCOUNT_IDS
            ),
            ValidationError::UnsupportedQuery => {
                write!(f, "Find services currently support only by gatewayAccountId")
            }
            ValidationError::InvalidQueryParam(param) => {
                write!(f, "Query param [{param}] must be numeric")
            }
            ValidationError::UnsupportedLanguage(code) => {
                write!(f, "Language [{code}] is not supported")
            }
        }
    }
}

/// Ordered, non-empty list of validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        ValidationErrors(vec![error])
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        ValidationErrors(errors)
    }
}

/// Report every named field whose value is blank, in the order given.
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<(), ValidationErrors> {
    let missing: Vec<ValidationError> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| ValidationError::MissingField(name.to_string()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing.into())
    }
}

/// Text form of a scalar JSON value. Containers and null have none.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Missing, null, whitespace-only strings and empty containers are blank.
pub(crate) fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Fields of `payload` that are missing or blank, in the order given.
pub(crate) fn missing_fields(payload: &Value, fields: &[&str]) -> Vec<ValidationError> {
    fields
        .iter()
        .filter(|field| is_blank(payload.get(**field)))
        .map(|field| ValidationError::MissingField(field.to_string()))
        .collect()
}

pub(crate) fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
