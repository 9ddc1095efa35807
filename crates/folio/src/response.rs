//! Service boundary: response envelope and session checks.

use folio_core::{FolioError, Result};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Response envelope handed to clients.
///
/// Serializes as `{"success": true, "data": ...}` or
/// `{"success": false, "error": "..."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A successful response.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed response.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Converts a service result, logging failures.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                error!(error = %e, "Request failed");
                Self::err(e.to_string())
            }
        }
    }
}

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    user_id: String,
}

impl Session {
    /// Accepts a bearer token, with or without the `Bearer ` prefix.
    ///
    /// # Errors
    /// Returns [`FolioError::Unauthorized`] for a missing or blank token.
    pub fn require(token: Option<&str>) -> Result<Self> {
        let token = token
            .map(strip_scheme)
            .filter(|t| !t.is_empty())
            .ok_or(FolioError::Unauthorized)?;
        Ok(Self {
            user_id: token.to_string(),
        })
    }

    /// The caller's user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

fn strip_scheme(header: &str) -> &str {
    let header = header.trim();
    match header.split_once(char::is_whitespace) {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ if header.eq_ignore_ascii_case("bearer") => "",
        _ => header,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shapes() {
        let ok = ApiResponse::from_result(Ok(vec![1, 2]));
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"success": true, "data": [1, 2]}));

        let err: ApiResponse<()> = ApiResponse::from_result(Err(FolioError::Unauthorized));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"success": false, "error": "Unauthorized"})
        );
    }

    #[test]
    fn test_session_requires_token() {
        assert_eq!(Session::require(None), Err(FolioError::Unauthorized));
        assert_eq!(Session::require(Some("   ")), Err(FolioError::Unauthorized));
        assert_eq!(Session::require(Some("Bearer ")), Err(FolioError::Unauthorized));
        assert_eq!(Session::require(Some("Bearer u-1")).unwrap().user_id(), "u-1");
        assert_eq!(Session::require(Some("u-2")).unwrap().user_id(), "u-2");
    }
}
