//! Identity middleware for protected endpoints.
//!
//! Authentication itself is out of scope: an upstream gateway verifies the
//! user and forwards `X-User-Id` (and `X-User-Role` for administrators).
//! This middleware parses those headers into an [`Identity`] request
//! extension; requests that arrive without a user id are rejected.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use bingo_hall::round::UserId;

/// Header carrying the authenticated user id, set by the auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's role, set by the auth gateway.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller, available to handlers as an extension.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: UserId,
    pub is_admin: bool,
}

/// Reject requests without a forwarded user id; inject [`Identity`]
/// otherwise.
pub async fn identity_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<UserId>().ok());

    let Some(user_id) = user_id else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let is_admin = request
        .headers()
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case("admin"));

    request.extensions_mut().insert(Identity { user_id, is_admin });
    Ok(next.run(request).await)
}
