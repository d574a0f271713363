//! Request/response types for complaint endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Complaint lifecycle. Citizens create `Pending` complaints; only
/// administrators move them forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown complaint status: {0}")]
pub struct UnknownStatus(String);

impl FromStr for ComplaintStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A complaint as returned to the client; image URLs are in display order.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintData {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub images: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ComplaintResponse {
    pub code: u16,
    pub message: String,
    pub data: ComplaintData,
}

/// Envelope for operations that return no entity.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub code: u16,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeleteImageRequest {
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ComplaintStatus::Pending,
            ComplaintStatus::InProgress,
            ComplaintStatus::Resolved,
        ] {
            assert_eq!(status.as_str().parse::<ComplaintStatus>(), Ok(status));
        }
        assert!("closed".parse::<ComplaintStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() -> Result<()> {
        assert_eq!(
            serde_json::to_value(ComplaintStatus::InProgress)?,
            serde_json::json!("in_progress")
        );
        Ok(())
    }

    #[test]
    fn complaint_data_uses_camel_case_keys() -> Result<()> {
        let data = ComplaintData {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            category_id: None,
            title: "Broken street light".to_string(),
            description: "Dark at night".to_string(),
            status: "pending".to_string(),
            images: vec![],
        };
        let value = serde_json::to_value(&data)?;
        assert!(value.get("userId").is_some());
        assert!(value.get("categoryId").is_none());
        Ok(())
    }
}
