use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub telephone_number: Option<String>,
    pub disabled: bool,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateUser {
    pub email: String,
    pub telephone_number: Option<String>,
}
