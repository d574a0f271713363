//! Request/response types for auth endpoints.
//!
//! Successful responses use the `{code, message, data}` envelope the
//! frontend consumes; field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// The authenticated user as returned to the client. `token` is the
/// freshly issued access token and is only present on sign-in.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SigninResponse {
    pub code: u16,
    pub message: String,
    pub data: UserData,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshData {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshResponse {
    pub code: u16,
    pub message: String,
    pub data: RefreshData,
}
