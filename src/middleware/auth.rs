use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, Authorizer};
use crate::error::ApiError;

/// Gate state for one route: who verifies, and which permission is required
#[derive(Clone)]
pub struct RequirePermission {
    pub authorizer: Authorizer,
    pub permission: &'static str,
}

impl Authorizer {
    pub fn require(&self, permission: &'static str) -> RequirePermission {
        RequirePermission {
            authorizer: self.clone(),
            permission,
        }
    }
}

/// Runs the authorization gate before the wrapped handler.
///
/// On success the verified [`ClaimSet`](crate::auth::ClaimSet) is placed in the
/// request extensions; on failure the handler never runs.
pub async fn require_permission(
    State(gate): State<RequirePermission>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AuthError::InvalidHeader("Authorization malformed."))?
                .to_string(),
        ),
        None => None,
    };

    let claims = gate
        .authorizer
        .authorize(header.as_deref(), gate.permission)
        .await
        .map_err(|e| {
            tracing::warn!(
                "Refused {} {} (requires {}): {}",
                request.method(),
                request.uri().path(),
                gate.permission,
                e
            );
            e
        })?;

    tracing::debug!("Authorized '{}' for {}", claims.sub, gate.permission);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
