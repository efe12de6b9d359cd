//! Session token issuance and verification.
//!
//! Tokens are compact HS256/384/512 JWS strings carrying [`SessionClaims`].
//! The key is decoded once at startup and cached here; every operation is a
//! pure function of `(token, key)` or `(claims, key, now)`, so a single
//! `TokenService` is shared across requests without locking.

use std::fmt;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use thiserror::Error;
use tracing::debug;

use shared::types::SessionClaims;
use shared::types::server_config::{AuthConfig, ConfigError, MIN_SECRET_KEY_BYTES};

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed structure, wrong algorithm or undecodable
    /// claims. Callers never learn which.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

pub struct TokenService {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

/// HMAC strength follows key size.
fn algorithm_for_key(len: usize) -> Algorithm {
    match len {
        n if n >= 64 => Algorithm::HS512,
        n if n >= 48 => Algorithm::HS384,
        _ => Algorithm::HS256,
    }
}

impl TokenService {
    /// Build a service from raw key bytes.
    pub fn new(key: &[u8], ttl_secs: u64) -> Result<Self, ConfigError> {
        if key.len() < MIN_SECRET_KEY_BYTES {
            return Err(ConfigError::InvalidConfig(format!(
                "signing key must be at least {} bytes, got {}",
                MIN_SECRET_KEY_BYTES,
                key.len()
            )));
        }
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "token_ttl_secs must be greater than 0".into(),
            ));
        }

        Ok(Self {
            algorithm: algorithm_for_key(key.len()),
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            ttl_secs,
        })
    }

    /// Build a service from the `[auth]` config section (base64 secret).
    pub fn from_config(auth: &AuthConfig) -> Result<Self, ConfigError> {
        let key = auth.decoded_secret_key()?;
        Self::new(&key, auth.token_ttl_secs)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a token for `email` carrying `roles` (bare names, e.g. `ADMIN`).
    pub fn issue<S: AsRef<str>>(&self, email: &str, roles: &[S]) -> Result<String, TokenError> {
        self.issue_at(email, roles, get_current_timestamp())
    }

    /// [`issue`](Self::issue) with an explicit clock, in Unix seconds.
    pub fn issue_at<S: AsRef<str>>(
        &self,
        email: &str,
        roles: &[S],
        now: u64,
    ) -> Result<String, TokenError> {
        let claims = SessionClaims::new(email, roles, now, self.ttl_secs);
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify the signature and decode the claims.
    ///
    /// Expiry is not checked here; [`is_valid`](Self::is_valid)
    /// applies it as a separate gate.
    pub fn verify_and_decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token verification failed: {:?}", e.kind());
                TokenError::InvalidToken(e.to_string())
            })
    }

    /// A token is valid when it verifies, names a subject, and has not
    /// expired.
    pub fn is_valid(&self, token: &str) -> bool {
        self.is_valid_at(token, get_current_timestamp())
    }

    /// [`is_valid`](Self::is_valid) with an explicit clock, in Unix seconds.
    pub fn is_valid_at(&self, token: &str, now: u64) -> bool {
        self.valid_claims_at(token, now).is_some()
    }

    /// Claims of a token that passes [`is_valid`](Self::is_valid), decoded
    /// once.
    pub fn valid_claims(&self, token: &str) -> Option<SessionClaims> {
        self.valid_claims_at(token, get_current_timestamp())
    }

    pub fn valid_claims_at(&self, token: &str, now: u64) -> Option<SessionClaims> {
        self.verify_and_decode(token)
            .ok()
            .filter(|claims| !claims.is_empty() && !claims.is_expired_at(now))
    }

    pub fn extract_email(&self, token: &str) -> Result<String, TokenError> {
        self.verify_and_decode(token).map(|claims| claims.sub)
    }

    /// Role claims, each still carrying its `ROLE_` prefix.
    pub fn extract_roles(&self, token: &str) -> Result<Vec<String>, TokenError> {
        self.verify_and_decode(token).map(|claims| claims.roles)
    }
}
