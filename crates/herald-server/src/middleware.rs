use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use herald_types::AuthContext;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Resolves `Authorization: Bearer <token>` into an [`AuthContext`] request
/// extension.
///
/// Requests without the header continue as `AuthContext::Anonymous`; each
/// operation decides whether that is enough. A header that is present but
/// malformed, forged, or expired is rejected outright.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Response {
    let state = match req.extensions().get::<Arc<AppState>>() {
        Some(state) => Arc::clone(state),
        None => {
            tracing::error!("application state missing from request extensions");
            return ApiError::InternalServerError("server misconfigured".to_string())
                .into_response();
        }
    };

    let auth = match req.headers().get(AUTHORIZATION) {
        None => AuthContext::Anonymous,
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim);
            let Some(token) = token else {
                return ApiError::Unauthorized("expected a bearer token".to_string())
                    .into_response();
            };
            match state.authenticator.verify_token(token) {
                Ok(user_id) => AuthContext::User(user_id),
                Err(e) => {
                    tracing::debug!(error = %e, "rejected session token");
                    return ApiError::from(e).into_response();
                }
            }
        }
    };

    req.extensions_mut().insert(auth);
    next.run(req).await
}
