use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{validate_jwt, AuthUser};
use crate::error::ApiError;

/// Session state of a request. `None` means anonymous; set by
/// `session_middleware` and required by tenant resolution.
#[derive(Clone, Debug)]
pub struct Session(pub Option<AuthUser>);

/// JWT session middleware. A missing Authorization header yields an
/// anonymous session; a present but invalid one is rejected.
pub async fn session_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)? {
        None => None,
        Some(token) => {
            let claims = validate_jwt(&token, &state.config.security.jwt_secret)
                .map_err(|e| ApiError::unauthorized(e.to_string()))?;
            Some(AuthUser::from(claims))
        }
    };

    if let Some(user) = &user {
        tracing::debug!("Authenticated request for user '{}' ({})", user.user, user.access);
    }

    request.extensions_mut().insert(Session(user));
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(Some(token.trim().to_string()))
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
