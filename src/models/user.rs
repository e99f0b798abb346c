use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, JsonSchema, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub role: Role,
    // bcrypt hash; must round-trip to the database, so clients only
    // ever see UserResponse
    pub password: String,
    pub password_changed_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_reset_expires: Option<DateTime>,
    pub active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SignupDto {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ForgotPasswordDto {
    pub email: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResetPasswordDto {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdatePasswordDto {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateMeDto {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}
