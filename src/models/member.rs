use serde::{Deserialize, Serialize};

use super::role::{Role, RoleName};

/// A user's single role on a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub user_id: String,
    pub service_id: String,
    pub role: RoleName,
}

/// Membership as returned from the API, with the role expanded.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceMember {
    pub user_id: String,
    pub email: String,
    pub service_id: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateServiceRole {
    pub role_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssignServiceRole {
    pub service_id: String,
    pub role_name: String,
}
