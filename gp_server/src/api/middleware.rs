//! Identity middleware for protected endpoints.
//!
//! Callers are identified by an opaque user ID in the `x-user-id` header,
//! supplied by whatever sits in front of this server. The middleware resolves
//! it against the user store and injects the [`User`] into request extensions
//! for downstream handlers.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use gp_server::api::middleware::identity_middleware;
//! # use gp_server::api::AppState;
//! # async fn handler() {}
//! # let state: AppState = unimplemented!();
//!
//! let protected_routes: Router<AppState> = Router::new()
//!     .route("/attendance/today", get(handler))
//!     .layer(middleware::from_fn_with_state(state.clone(), identity_middleware));
//! # let _ = protected_routes;
//! ```
//!
//! # Extracting the User
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use geo_presence::auth::User;
//!
//! async fn protected_handler(Extension(user): Extension<User>) -> String {
//!     format!("Hello {}", user.display_name)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use geo_presence::auth::User;

use super::{AppState, error::ApiError, request_context::ClientAddress};
use crate::logging;

/// Header carrying the caller's user ID
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve `x-user-id` to a [`User`] and inject it into request extensions.
///
/// # Behavior
///
/// - **Known user**: Injects `User` → Calls next handler
/// - **Missing or non-numeric header**: `401 Unauthorized`
/// - **Unknown user**: `401 Unauthorized`
/// - **Store failure**: `500 Internal Server Error`
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .ok_or_else(|| ApiError::unauthorized("Missing x-user-id header"))?
        .parse::<i64>()
        .map_err(|_| ApiError::unauthorized("x-user-id must be an integer"))?;

    let user = match state.store.find_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            let client = ClientAddress::from_request(&request);
            logging::log_security_event(
                "unknown_user",
                Some(user_id),
                Some(client.as_str()),
                "Request with an unknown user ID",
            );
            return Err(ApiError::unauthorized("Unknown user"));
        }
        Err(e) => return Err(e.into()),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Reject callers without the admin role.
///
/// Must run inside [`identity_middleware`]; a request without a resolved
/// user is treated as unauthenticated.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let Some(user) = request.extensions().get::<User>() else {
        return Err(ApiError::unauthorized("Missing x-user-id header"));
    };

    if !user.is_admin() {
        let client = ClientAddress::from_request(&request);
        logging::log_security_event(
            "admin_denied",
            Some(user.id),
            Some(client.as_str()),
            &format!("{} {} requires the admin role", request.method(), request.uri().path()),
        );
        return Err(ApiError::forbidden("Admin role required"));
    }

    Ok(next.run(request).await)
}
