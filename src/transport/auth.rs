//! Bearer token verification for the upgrade request.
//!
//! The hub trusts whatever username the authenticator returns; everything
//! after the handshake only checks that payloads claim that same name.

use std::collections::HashMap;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::Value;
use thiserror::Error;
use tungstenite::handshake::server::Request;
use tungstenite::http::StatusCode;
use tungstenite::http::header::AUTHORIZATION;

use crate::config::AuthSettings;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("request lacks authorization header")]
    MissingHeader,
    #[error("invalid auth header provided")]
    MalformedHeader,
    #[error("unsupported authorization scheme")]
    UnsupportedScheme,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("username not found in claim {0:?}")]
    MissingClaim(String),
    #[error("no token verification key configured")]
    NoKey,
    #[error("unusable verification key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::NoKey | AuthError::InvalidKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Resolves the username bound to an upgrade request.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, request: &Request) -> Result<String, AuthError>;
}

/// Verifies `Authorization: Bearer <jwt>` and reads the username from a
/// configurable claim.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
    username_claim: String,
}

impl JwtAuthenticator {
    /// HS256 verification with a shared secret and no issuer or audience
    /// checks.
    pub fn hs256(secret: &[u8], username_claim: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
            username_claim: username_claim.into(),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        let (key, algorithm) = match (&settings.jwt_secret, &settings.jwt_public_key_pem) {
            (Some(secret), _) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            (None, Some(pem)) => (
                DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(AuthError::InvalidKey)?,
                Algorithm::RS256,
            ),
            (None, None) => return Err(AuthError::NoKey),
        };

        let mut validation = Validation::new(algorithm);
        match &settings.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &settings.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            key,
            validation,
            username_claim: settings.username_claim.clone(),
        })
    }

    /// Validates a raw token and returns the username claim.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<HashMap<String, Value>>(token, &self.key, &self.validation)?;
        match data.claims.get(&self.username_claim) {
            Some(Value::String(username)) if !username.is_empty() => Ok(username.clone()),
            _ => Err(AuthError::MissingClaim(self.username_claim.clone())),
        }
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("algorithms", &self.validation.algorithms)
            .field("username_claim", &self.username_claim)
            .finish_non_exhaustive()
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, request: &Request) -> Result<String, AuthError> {
        let token = bearer_token(request)?;
        self.verify(token)
    }
}

pub fn bearer_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let mut parts = header.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::MalformedHeader);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::UnsupportedScheme);
    }
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}
