//! Authentication middleware.
//!
//! Bearer token extraction. When `AUTH_SECRET` is configured the token must
//! match it; otherwise any request is accepted.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::AppState;

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The bearer token, or "anonymous" when auth is disabled
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match (auth_header, state.config.auth_secret.as_deref()) {
            (Some(header), secret) if header.starts_with("Bearer ") => {
                let token = header.trim_start_matches("Bearer ").to_string();

                if token.is_empty() {
                    return Err((StatusCode::UNAUTHORIZED, "Empty bearer token"));
                }

                if let Some(secret) = secret {
                    if token != secret {
                        return Err((StatusCode::UNAUTHORIZED, "Invalid bearer token"));
                    }
                }

                Ok(AuthUser { token })
            }
            (Some(_), _) => Err((
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            )),
            // No auth configured, allow anonymous access
            (None, None) => Ok(AuthUser {
                token: "anonymous".to_string(),
            }),
            (None, Some(_)) => Err((StatusCode::UNAUTHORIZED, "Missing authorization header")),
        }
    }
}
