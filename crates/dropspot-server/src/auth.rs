//! Caller identity and admin access.
//!
//! Users are authenticated upstream by the gateway, which forwards the
//! resulting identity in `x-user-id` and, optionally, `x-account-created-at`.
//! Admin routes are guarded by a shared bearer token instead.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use dropspot_shared::{Identity, UserId};

use crate::config::ServerConfig;
use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ACCOUNT_CREATED_HEADER: &str = "x-account-created-at";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map(str::trim)
                .map_err(|_| ApiError::BadRequest(format!("Non-ASCII {name} header")))
        })
        .transpose()
}

/// The caller's identity if the gateway supplied one.
///
/// A missing account creation time counts as a brand new account. It only
/// matters the first time the engine sees the user; after that the stored
/// creation time wins.
pub fn optional_identity(headers: &HeaderMap) -> Result<Option<Identity>, ApiError> {
    let Some(raw_id) = header_str(headers, USER_ID_HEADER)? else {
        return Ok(None);
    };

    let user_id: UserId = raw_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER} header")))?;

    let account_created_at = match header_str(headers, ACCOUNT_CREATED_HEADER)? {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| {
                ApiError::BadRequest(format!("Invalid {ACCOUNT_CREATED_HEADER} header"))
            })?,
        None => Utc::now(),
    };

    Ok(Some(Identity::new(user_id, account_created_at)))
}

pub fn require_identity(headers: &HeaderMap) -> Result<Identity, ApiError> {
    optional_identity(headers)?
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
}

pub fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ApiError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ApiError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    // Constant-time comparison to prevent timing attacks on admin token.
    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ApiError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}
