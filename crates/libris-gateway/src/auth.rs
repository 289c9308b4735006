//! Bearer-token guard for every route except `/health`.

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use libris_core::config::AuthMode;

use crate::app::AppState;
use crate::http::{api_error, ApiError};

pub fn check_auth(state: &AppState, headers: &HeaderMap) -> bool {
    match &state.config.gateway.auth.mode {
        AuthMode::None => true,
        AuthMode::Token => {
            let expected = match &state.config.gateway.auth.token {
                Some(t) => t.as_str(),
                // Token mode configured but no token value — deny.
                None => return false,
            };
            extract_bearer(headers)
                .map(|t| t == expected)
                .unwrap_or(false)
        }
    }
}

/// `check_auth` as an early return for handlers.
pub fn require_auth(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<ApiError>)> {
    if check_auth(state, headers) {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Unauthorized. Set 'Authorization: Bearer <your-token>' header.",
        ))
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn open_mode_allows_everything() {
        let (state, _) = test_support::state(None, None);
        assert!(check_auth(&state, &HeaderMap::new()));
    }

    #[test]
    fn token_mode_needs_matching_bearer() {
        let (state, _) = test_support::state(None, Some("s3cret"));
        assert!(!check_auth(&state, &HeaderMap::new()));
        assert!(!check_auth(&state, &headers("Bearer wrong")));
        assert!(!check_auth(&state, &headers("s3cret")));
        assert!(check_auth(&state, &headers("Bearer s3cret")));
    }
}
