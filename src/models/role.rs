use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed role catalog, most privileged first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleName {
    Admin,
    ViewAndRefund,
    ViewAndInitiateMoto,
    ViewOnly,
}

impl RoleName {
    pub const ALL: [RoleName; 4] = [
        RoleName::Admin,
        RoleName::ViewAndRefund,
        RoleName::ViewAndInitiateMoto,
        RoleName::ViewOnly,
    ];

    /// Stable row id in the `roles` table.
    pub fn id(self) -> i64 {
        match self {
            RoleName::Admin => 1,
            RoleName::ViewAndRefund => 2,
            RoleName::ViewAndInitiateMoto => 3,
            RoleName::ViewOnly => 4,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.id() == id)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::ViewAndRefund => "view-and-refund",
            RoleName::ViewAndInitiateMoto => "view-and-initiate-moto",
            RoleName::ViewOnly => "view-only",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RoleName::Admin => "Administrator",
            RoleName::ViewAndRefund => "View and Refund",
            RoleName::ViewAndInitiateMoto => "View and take telephone payments",
            RoleName::ViewOnly => "View only",
        }
    }

    pub fn is_admin(self) -> bool {
        self == RoleName::Admin
    }

    pub fn role(self) -> Role {
        Role {
            id: self.id(),
            name: self.as_str().to_string(),
            description: self.description().to_string(),
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| format!("role [{}] not recognised", s.trim()))
    }
}

impl Serialize for RoleName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoleName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: String,
}
