use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages a service name can be given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SupportedLanguage {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "cy")]
    Welsh,
}

impl SupportedLanguage {
    pub fn code(self) -> &'static str {
        match self {
            SupportedLanguage::English => "en",
            SupportedLanguage::Welsh => "cy",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(SupportedLanguage::English),
            "cy" => Some(SupportedLanguage::Welsh),
            _ => None,
        }
    }
}

impl fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantDetails {
    pub name: String,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub address_city: String,
    pub address_postcode: String,
    pub address_country: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: String,
    pub external_id: String,
    /// English name, the default.
    pub name: String,
    pub service_names: BTreeMap<SupportedLanguage, String>,
    pub gateway_account_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_branding: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_details: Option<MerchantDetails>,
    pub created_at: String,
}

pub const DEFAULT_SERVICE_NAME: &str = "System Generated";

impl Service {
    /// Set the name for one language. The English name is also the
    /// service's default `name`.
    pub fn add_or_update_service_name(&mut self, language: SupportedLanguage, name: &str) {
        self.service_names.insert(language, name.to_string());
        if language == SupportedLanguage::English {
            self.name = name.to_string();
        }
    }
}

/// Parsed service creation payload. Validation happens on the raw JSON first.
#[derive(Debug, Default, Deserialize)]
pub struct CreateService {
    pub name: Option<String>,
    /// Names per language. An `en` entry takes precedence over `name`.
    #[serde(default)]
    pub service_names: BTreeMap<SupportedLanguage, String>,
    #[serde(default)]
    pub gateway_account_ids: Vec<String>,
    pub custom_branding: Option<serde_json::Map<String, serde_json::Value>>,
}
