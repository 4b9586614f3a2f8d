//! Response envelope shared by the studio API and its clients.

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::nullable_string;
use crate::AvailableTimeSlot;

pub const STUDIO_NOT_FOUND: &str = "STUDIO_NOT_FOUND";
pub const STUDIO_NOT_CONFIGURED: &str = "STUDIO_NOT_CONFIGURED";
pub const INVALID_PARAMETER: &str = "INVALID_PARAMETER";
pub const AVAILABILITY_FETCH_ERROR: &str = "AVAILABILITY_FETCH_ERROR";

pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// `{"status": "success", "data": ...}` or `{"status": "error", "error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiEnvelope<T> {
    Success { data: T },
    Error { error: ApiErrorBody },
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        ApiEnvelope::Success { data }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiEnvelope::Error {
            error: ApiErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityData {
    #[serde(alias = "studio_id", deserialize_with = "string_or_number")]
    pub studio_id: String,
    #[serde(alias = "studio_name")]
    pub studio_name: String,
    pub date: String,
    #[serde(alias = "available_ranges")]
    pub available_ranges: Vec<AvailableTimeSlot>,
    #[serde(default)]
    pub meta: AvailabilityMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityMeta {
    pub timezone: String,
}

impl Default for AvailabilityMeta {
    fn default() -> Self {
        AvailabilityMeta {
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
