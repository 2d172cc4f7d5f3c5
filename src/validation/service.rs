use std::collections::BTreeMap;

use serde_json::Value;

use super::{as_text, is_digits, missing_fields, ValidationError, ValidationErrors};
use crate::models::service::{CreateService, MerchantDetails, SupportedLanguage};

pub const FIELD_SERVICE_NAME: &str = "name";
pub const FIELD_SERVICE_NAMES: &str = "service_name";
pub const FIELD_GATEWAY_ACCOUNT_IDS: &str = "gateway_account_ids";
pub const FIELD_CUSTOM_BRANDING: &str = "custom_branding";

pub const FIELD_MERCHANT_NAME: &str = "name";
pub const FIELD_MERCHANT_ADDRESS_LINE1: &str = "address_line1";
pub const FIELD_MERCHANT_ADDRESS_LINE2: &str = "address_line2";
pub const FIELD_MERCHANT_ADDRESS_CITY: &str = "address_city";
pub const FIELD_MERCHANT_ADDRESS_POSTCODE: &str = "address_postcode";
pub const FIELD_MERCHANT_ADDRESS_COUNTRY: &str = "address_country";

pub const QUERY_GATEWAY_ACCOUNT_ID: &str = "gatewayAccountId";

/// Service creation payloads may omit everything; when gateway account ids
/// are supplied they must all be numeric.
pub fn validate_create_service(payload: &Value) -> Result<(), ValidationErrors> {
    let ids = match payload.get(FIELD_GATEWAY_ACCOUNT_IDS) {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Array(ids)) => ids,
        Some(_) => return Err(ValidationError::NonNumericGatewayAccountId.into()),
    };

    let non_numeric = ids
        .iter()
        .any(|id| !as_text(id).map(|s| is_digits(&s)).unwrap_or(false));
    if non_numeric {
        return Err(ValidationError::NonNumericGatewayAccountId.into());
    }
    Ok(())
}

/// Validate a creation payload and pull out the typed fields.
pub fn parse_create_service(payload: &Value) -> Result<CreateService, ValidationErrors> {
    validate_create_service(payload)?;

    let custom_branding = match payload.get(FIELD_CUSTOM_BRANDING) {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => {
            return Err(ValidationError::InvalidValueType {
                path: FIELD_CUSTOM_BRANDING.to_string(),
            }
            .into())
        }
    };
    let gateway_account_ids = match payload.get(FIELD_GATEWAY_ACCOUNT_IDS) {
        Some(Value::Array(ids)) => ids.iter().filter_map(as_text).collect(),
        _ => Vec::new(),
    };

    Ok(CreateService {
        name: payload.get(FIELD_SERVICE_NAME).and_then(as_text),
        service_names: service_names(payload.get(FIELD_SERVICE_NAMES))?,
        gateway_account_ids,
        custom_branding,
    })
}

/// `service_name` maps language codes to names. Blank names are skipped.
fn service_names(
    value: Option<&Value>,
) -> Result<BTreeMap<SupportedLanguage, String>, ValidationErrors> {
    let map = match value {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ValidationError::InvalidValueType {
                path: FIELD_SERVICE_NAMES.to_string(),
            }
            .into())
        }
    };

    let mut names = BTreeMap::new();
    for (code, name) in map {
        let language = SupportedLanguage::from_code(code)
            .ok_or_else(|| ValidationError::UnsupportedLanguage(code.clone()))?;
        let name = as_text(name).ok_or_else(|| ValidationError::InvalidValueType {
            path: format!("{FIELD_SERVICE_NAMES}.{code}"),
        })?;
        let name = name.trim();
        if !name.is_empty() {
            names.insert(language, name.to_string());
        }
    }
    Ok(names)
}

/// All mandatory merchant fields are checked together so the caller sees
/// every missing one in a single response.
pub fn validate_merchant_details(payload: &Value) -> Result<MerchantDetails, ValidationErrors> {
    let missing = missing_fields(
        payload,
        &[
            FIELD_MERCHANT_NAME,
            FIELD_MERCHANT_ADDRESS_LINE1,
            FIELD_MERCHANT_ADDRESS_CITY,
            FIELD_MERCHANT_ADDRESS_POSTCODE,
            FIELD_MERCHANT_ADDRESS_COUNTRY,
        ],
    );
    if !missing.is_empty() {
        return Err(missing.into());
    }

    let text = |field: &str| {
        payload
            .get(field)
            .and_then(as_text)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let address_line2 = payload
        .get(FIELD_MERCHANT_ADDRESS_LINE2)
        .and_then(as_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(MerchantDetails {
        name: text(FIELD_MERCHANT_NAME),
        address_line1: text(FIELD_MERCHANT_ADDRESS_LINE1),
        address_line2,
        address_city: text(FIELD_MERCHANT_ADDRESS_CITY),
        address_postcode: text(FIELD_MERCHANT_ADDRESS_POSTCODE),
        address_country: text(FIELD_MERCHANT_ADDRESS_COUNTRY),
    })
}

/// Services can only be looked up by gateway account id.
pub fn validate_find_query(gateway_account_id: Option<&str>) -> Result<String, ValidationErrors> {
    let id = gateway_account_id.map(str::trim).unwrap_or_default();
    if id.is_empty() {
        return Err(ValidationError::UnsupportedQuery.into());
    }
    if !is_digits(id) {
        return Err(ValidationError::InvalidQueryParam(QUERY_GATEWAY_ACCOUNT_ID.to_string()).into());
    }
    Ok(id.to_string())
}
