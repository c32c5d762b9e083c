//! The response envelope the Auth API (and every other backend endpoint)
//! wraps its payloads in
//!
//! `succeeded == false` is an application level failure even when the HTTP
//! status is 200

use chrono::{DateTime, NaiveDateTime, Utc};
use fleetdesk_time::Timestamp;

use crate::{
    token::{AccessToken, RefreshToken},
    uac::UserInfo,
};

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub succeeded: bool,
    pub message: Option<String>,
    /// Either a list of messages or a map of field name to messages
    pub errors: Option<serde_json::Value>,
    /// Sent as the status name by some endpoints and as a number by others
    pub status_code: Option<serde_json::Value>,
    pub status_code_value: Option<u16>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiFailure {
    pub message: String,
    pub errors: Vec<String>,
    pub status_code: Option<u16>,
}

/// Payload of both `POST /auth/login` and `POST /auth/refresh`
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: AccessToken,
    pub refresh_token: RefreshToken,
    pub user: UserInfo,
    pub expires_at: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Returns the data if the envelope reports success and carries data
    pub fn into_result(self) -> Result<T, ApiFailure> {
        match self.into_result_allow_empty()? {
            Some(data) => Ok(data),
            None => Err(ApiFailure {
                message: "response reported success but did not include any data".to_string(),
                errors: vec![],
                status_code: None,
            }),
        }
    }

    /// For endpoints that legitimately return no data on success
    pub fn into_result_allow_empty(self) -> Result<Option<T>, ApiFailure> {
        if self.succeeded {
            return Ok(self.data);
        }
        Err(ApiFailure {
            message: self
                .message
                .filter(|msg| !msg.is_empty())
                .unwrap_or_else(|| "request was not successful".to_string()),
            errors: self.errors.as_ref().map(flatten_errors).unwrap_or_default(),
            status_code: self.status_code_value.or_else(|| {
                self.status_code
                    .as_ref()
                    .and_then(|x| x.as_u64())
                    .and_then(|x| u16::try_from(x).ok())
            }),
        })
    }
}

impl AuthPayload {
    /// Expiry of the new session. The token's own claim wins over the
    /// envelope field because it is what the server will enforce
    pub fn session_expiry(&self) -> Option<Timestamp> {
        self.token
            .expires_at()
            .or_else(|| self.expires_at.as_deref().and_then(parse_expires_at))
    }
}

fn parse_expires_at(value: &str) -> Option<Timestamp> {
    let utc = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        // Assume UTC if the server omitted the offset
        Err(_) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()?
            .and_utc(),
    };
    utc.try_into().ok()
}

fn flatten_errors(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Null => vec![],
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Array(items) => items.iter().flat_map(flatten_errors).collect(),
        serde_json::Value::Object(map) => map.values().flat_map(flatten_errors).collect(),
        other => vec![other.to_string()],
    }
}
