use serde_json::{Map, Value};

use super::{as_text, is_blank, is_digits, missing_fields, ValidationError, ValidationErrors};

pub const FIELD_OP: &str = "op";
pub const FIELD_PATH: &str = "path";
pub const FIELD_VALUE: &str = "value";

/// Service attributes that may be changed through a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchPath {
    Name,
    GatewayAccountIds,
    CustomBranding,
}

impl PatchPath {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchPath::Name => "name",
            PatchPath::GatewayAccountIds => "gateway_account_ids",
            PatchPath::CustomBranding => "custom_branding",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ATTRIBUTE_OPERATIONS
            .iter()
            .map(|(path, _)| *path)
            .find(|path| path.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Add,
    Replace,
}

impl PatchOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(PatchOp::Add),
            "replace" => Some(PatchOp::Replace),
            _ => None,
        }
    }
}

/// Operations permitted per updatable attribute.
pub const ATTRIBUTE_OPERATIONS: &[(PatchPath, &[PatchOp])] = &[
    (PatchPath::Name, &[PatchOp::Replace]),
    (PatchPath::GatewayAccountIds, &[PatchOp::Add]),
    (PatchPath::CustomBranding, &[PatchOp::Replace]),
];

pub fn allowed_operations(path: PatchPath) -> &'static [PatchOp] {
    ATTRIBUTE_OPERATIONS
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, ops)| *ops)
        .unwrap_or(&[])
}

/// A validated single-attribute update, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum ServicePatch {
    ReplaceName(String),
    AddGatewayAccountIds(Vec<String>),
    ReplaceCustomBranding(Map<String, Value>),
}

/// Validate one `{op, path, value}` object.
///
/// Checks run in a fixed order and the first failing step wins:
/// presence of `op`/`path`, the value requirement for the path, the path
/// itself, then the operation against the whitelist for that path.
pub fn validate_attribute_patch(payload: &Value) -> Result<ServicePatch, ValidationErrors> {
    let missing = missing_fields(payload, &[FIELD_OP, FIELD_PATH]);
    if !missing.is_empty() {
        return Err(missing.into());
    }

    let path = text_field(payload, FIELD_PATH);
    let value = payload.get(FIELD_VALUE);

    if path == PatchPath::CustomBranding.as_str() {
        if !matches!(value, Some(Value::Object(_))) {
            return Err(ValidationError::InvalidValueType { path }.into());
        }
    } else if is_blank(value) {
        return Err(ValidationError::MissingField(FIELD_VALUE.to_string()).into());
    }

    let Some(patch_path) = PatchPath::parse(&path) else {
        return Err(ValidationError::InvalidPath(path).into());
    };

    let op = text_field(payload, FIELD_OP);
    let allowed = PatchOp::parse(&op)
        .map(|parsed| allowed_operations(patch_path).contains(&parsed))
        .unwrap_or(false);
    if !allowed {
        return Err(ValidationError::InvalidOperation { op, path }.into());
    }

    // Step 2 guarantees a non-blank value is present.
    let value = value.cloned().unwrap_or(Value::Null);
    match patch_path {
        PatchPath::Name => as_text(&value)
            .map(|name| ServicePatch::ReplaceName(name.trim().to_string()))
            .ok_or_else(|| ValidationError::InvalidValueType { path }.into()),
        PatchPath::GatewayAccountIds => gateway_account_ids(&value).map(ServicePatch::AddGatewayAccountIds),
        PatchPath::CustomBranding => match value {
            Value::Object(map) => Ok(ServicePatch::ReplaceCustomBranding(map)),
            _ => Err(ValidationError::InvalidValueType { path }.into()),
        },
    }
}

/// Validate a patch body that is either a single operation or an array of
/// them. Elements are checked in order and the first failure is returned.
/// An empty array names no operation at all and is rejected.
pub fn validate_attribute_patches(payload: &Value) -> Result<Vec<ServicePatch>, ValidationErrors> {
    match payload {
        Value::Array(items) if items.is_empty() => Err(vec![
            ValidationError::MissingField(FIELD_OP.to_string()),
            ValidationError::MissingField(FIELD_PATH.to_string()),
        ]
        .into()),
        Value::Array(items) => items.iter().map(validate_attribute_patch).collect(),
        single => validate_attribute_patch(single).map(|patch| vec![patch]),
    }
}

fn text_field(payload: &Value, field: &str) -> String {
    payload
        .get(field)
        .and_then(as_text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn gateway_account_ids(value: &Value) -> Result<Vec<String>, ValidationErrors> {
    let ids: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| as_text(item).unwrap_or_default())
            .collect(),
        scalar => vec![as_text(scalar).unwrap_or_default()],
    };
    if ids.iter().any(|id| !is_digits(id)) {
        return Err(ValidationError::NonNumericGatewayAccountId.into());
    }
    Ok(ids)
}
