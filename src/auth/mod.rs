//! Bearer-token authorization gate.
//!
//! Every protected request goes through [`Authorizer::authorize`], which runs
//! these steps in order and stops at the first failure:
//!
//! 1. the `Authorization` header must read `Bearer <token>`
//! 2. the token header must parse and name a key id and the accepted algorithm
//! 3. the key id must resolve in the identity provider's signing-key set
//! 4. signature, expiry, audience and issuer must verify
//! 5. the `permissions` claim must contain the permission the route requires
//!
//! Claims are re-derived on every request and never cached.

pub mod keys;

use axum::http::StatusCode;
use jsonwebtoken::{
    decode, decode_header, errors::ErrorKind, jwk::Jwk, Algorithm, DecodingKey, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::{AuthConfig, ConfigError};
pub use keys::{KeySetError, KeySource, RemoteKeySet, StaticKeySet};

/// The only signature algorithm tokens may use
pub const ACCEPTED_ALGORITHM: Algorithm = Algorithm::RS256;

const MISSING_BEARER: &str = "Authorization header must start with \"Bearer\".";
const MISSING_TOKEN: &str = "Token not found.";
const NOT_BEARER_TOKEN: &str = "Authorization header must be bearer token.";
const MALFORMED: &str = "Authorization malformed.";
const UNPARSABLE: &str = "Unable to parse authentication token.";
const UNSUPPORTED_ALGORITHM: &str = "Token algorithm is not accepted.";
const UNKNOWN_KEY: &str = "Unable to find the appropriate key.";
const BAD_CLAIMS: &str = "Incorrect claims. Please, check the audience and issuer.";
const NO_PERMISSIONS: &str = "Permissions not included in JWT.";

/// Why a request was refused before reaching its handler
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    NoHeader,

    #[error("{0}")]
    InvalidHeader(&'static str),

    #[error("Token expired.")]
    TokenExpired,

    #[error("{0}")]
    InvalidClaims(&'static str),

    #[error("Permission not found.")]
    Forbidden,

    /// The key set could not be fetched; the token itself was never judged
    #[error("Signing keys are unavailable")]
    KeysUnavailable(#[source] KeySetError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NoHeader
            | AuthError::InvalidHeader(_)
            | AuthError::TokenExpired
            | AuthError::InvalidClaims(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::KeysUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable code clients branch on
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NoHeader => "authorization_header_missing",
            AuthError::InvalidHeader(_) => "invalid_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims(_) => "invalid_claims",
            AuthError::Forbidden => "unauthorized",
            AuthError::KeysUnavailable(_) => "keys_unavailable",
        }
    }
}

/// Verified token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// Extract the token from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::NoHeader)?;
    let parts: Vec<&str> = header.split_whitespace().collect();

    match parts.as_slice() {
        [] => Err(AuthError::InvalidHeader(MALFORMED)),
        [scheme, ..] if !scheme.eq_ignore_ascii_case("bearer") => {
            Err(AuthError::InvalidHeader(MISSING_BEARER))
        }
        [_] => Err(AuthError::InvalidHeader(MISSING_TOKEN)),
        [_, token] => Ok(*token),
        _ => Err(AuthError::InvalidHeader(NOT_BEARER_TOKEN)),
    }
}

pub fn check_permission(claims: &ClaimSet, permission: &str) -> Result<(), AuthError> {
    let granted = claims
        .permissions
        .as_ref()
        .ok_or(AuthError::InvalidClaims(NO_PERMISSIONS))?;

    if granted.iter().any(|p| p == permission) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims(BAD_CLAIMS),
        ErrorKind::InvalidAlgorithm => AuthError::InvalidHeader(UNSUPPORTED_ALGORITHM),
        _ => AuthError::InvalidHeader(UNPARSABLE),
    }
}

#[derive(Debug)]
struct Expectations {
    audience: String,
    issuer: String,
    leeway: u64,
}

/// Verifies bearer tokens against a signing-key set
#[derive(Clone)]
pub struct Authorizer {
    keys: Arc<dyn KeySource>,
    expect: Arc<Expectations>,
}

impl Authorizer {
    pub fn new(
        keys: Arc<dyn KeySource>,
        audience: impl Into<String>,
        issuer: impl Into<String>,
        leeway: u64,
    ) -> Self {
        Self {
            keys,
            expect: Arc::new(Expectations {
                audience: audience.into(),
                issuer: issuer.into(),
                leeway,
            }),
        }
    }

    pub fn from_config(keys: Arc<dyn KeySource>, config: &AuthConfig) -> Result<Self, ConfigError> {
        if config.audience.is_empty() {
            return Err(ConfigError::Missing("API_AUDIENCE"));
        }
        let issuer = config.issuer()?;
        Ok(Self::new(keys, config.audience.clone(), issuer.as_str(), config.leeway_secs))
    }

    /// Gate a request: `header` is the raw `Authorization` value, if any
    pub async fn authorize(&self, header: Option<&str>, permission: &str) -> Result<ClaimSet, AuthError> {
        let token = bearer_token(header)?;

        let token_header = decode_header(token).map_err(|e| {
            debug!("Rejecting token with unparsable header: {}", e);
            AuthError::InvalidHeader(UNPARSABLE)
        })?;
        if token_header.alg != ACCEPTED_ALGORITHM {
            return Err(AuthError::InvalidHeader(UNSUPPORTED_ALGORITHM));
        }
        let kid = token_header.kid.ok_or(AuthError::InvalidHeader(MALFORMED))?;

        let key = self.resolve_key(&kid).await?;
        let claims = self.verify(token, &key)?;
        check_permission(&claims, permission)?;

        Ok(claims)
    }

    async fn resolve_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let set = self.keys.key_set().await.map_err(AuthError::KeysUnavailable)?;
        if let Some(jwk) = set.find(kid) {
            return decoding_key(jwk);
        }

        // Unknown kid: the provider may have rotated keys since our last fetch
        let refreshed = self.keys.refresh().await.map_err(AuthError::KeysUnavailable)?;
        match refreshed.as_ref().and_then(|set| set.find(kid)) {
            Some(jwk) => decoding_key(jwk),
            None => {
                debug!("No signing key with kid '{}'", kid);
                Err(AuthError::InvalidHeader(UNKNOWN_KEY))
            }
        }
    }

    fn verify(&self, token: &str, key: &DecodingKey) -> Result<ClaimSet, AuthError> {
        let mut validation = Validation::new(ACCEPTED_ALGORITHM);
        validation.set_audience(&[&self.expect.audience]);
        validation.set_issuer(&[&self.expect.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation.leeway = self.expect.leeway;

        decode::<ClaimSet>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token verification failed: {}", e);
                classify(e.kind())
            })
    }
}

fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    DecodingKey::from_jwk(jwk).map_err(|_| AuthError::InvalidHeader(UNKNOWN_KEY))
}
