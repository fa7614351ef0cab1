// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token issuance, verification and rotation.
//!
//! Access tokens are stateless: only the signature and expiry are checked.
//! A refresh token is live only while it is byte-for-byte equal to the value
//! stored on its user record. Every issuance overwrites that value, so a
//! rotated-away token fails with [`TokenError::Mismatch`] even though its
//! signature still verifies.
//!
//! There is exactly one live refresh token per user. Logging in on a second
//! device invalidates the first device's refresh token.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::db::SharedDatabase;
use crate::error::{AppError, Result};
use crate::models::Role;
use crate::time_utils::unix_now;

/// Reasons a presented token is rejected. All of them force re-authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token is malformed or has an invalid signature")]
    Malformed,
    #[error("Token has expired")]
    Expired,
    #[error("Refresh token has been superseded or revoked")]
    Mismatch,
}

impl TokenError {
    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::Malformed => "token_malformed",
            TokenError::Expired => "token_expired",
            TokenError::Mismatch => "token_mismatch",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Access token claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Refresh token claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Unique per issuance, so two tokens minted in the same second differ
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

/// Freshly issued token pair.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    fn expiry(&self, now: u64) -> Result<u64> {
        now.checked_add(self.ttl.as_secs())
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Token lifetime overflows")))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> std::result::Result<T, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Ok(decode::<T>(token, &self.decoding, &validation)?.claims)
    }
}

/// Issues and validates session tokens.
#[derive(Clone)]
pub struct TokenService {
    db: SharedDatabase,
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenService {
    pub fn new(config: &Config, db: SharedDatabase) -> Self {
        Self {
            db,
            access: SigningKeys::new(&config.access_token_secret, config.access_token_ttl),
            refresh: SigningKeys::new(&config.refresh_token_secret, config.refresh_token_ttl),
        }
    }

    /// Sign a new pair without touching storage.
    fn mint(&self, user_id: &str, role: Role) -> Result<TokenPair> {
        let now = unix_now()?;

        let access = AccessClaims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: self.access.expiry(now)?,
        };
        let refresh = RefreshClaims {
            sub: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: self.refresh.expiry(now)?,
        };

        Ok(TokenPair {
            access_token: self.access.sign(&access)?,
            refresh_token: self.refresh.sign(&refresh)?,
        })
    }

    /// Issue a pair and make its refresh token the user's only live one.
    pub async fn issue(&self, user_id: &str, role: Role) -> Result<TokenPair> {
        let pair = self.mint(user_id, role)?;
        self.db
            .set_refresh_token(user_id, Some(&pair.refresh_token))
            .await?;

        tracing::debug!(user_id, "Issued token pair");
        Ok(pair)
    }

    /// Check an access token's signature and expiry. Never consults storage.
    pub fn verify_access(&self, token: &str) -> std::result::Result<AccessClaims, TokenError> {
        self.access.verify(token)
    }

    fn verify_refresh(&self, token: &str) -> std::result::Result<RefreshClaims, TokenError> {
        self.refresh.verify(token)
    }

    /// Exchange a live refresh token for a new pair.
    ///
    /// The stored token is replaced with a compare-and-swap against the
    /// presented value; of two concurrent rotations with the same token,
    /// exactly one succeeds and the other gets `Mismatch`.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair> {
        let claims = self.verify_refresh(presented)?;

        let user = self
            .db
            .user_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", claims.sub)))?;

        let is_current = user
            .refresh_token
            .as_deref()
            .map(|stored| bool::from(stored.as_bytes().ct_eq(presented.as_bytes())))
            .unwrap_or(false);

        if !is_current {
            tracing::warn!(
                user_id = %user.id,
                revoked = user.refresh_token.is_none(),
                "Rejected refresh token that is not the stored one"
            );
            return Err(TokenError::Mismatch.into());
        }

        let pair = self.mint(&user.id, user.role)?;

        let swapped = self
            .db
            .swap_refresh_token(&user.id, presented, &pair.refresh_token)
            .await?;

        if !swapped {
            tracing::warn!(user_id = %user.id, "Refresh token rotated concurrently");
            return Err(TokenError::Mismatch.into());
        }

        tracing::info!(user_id = %user.id, "Rotated refresh token");
        Ok(pair)
    }

    /// Clear the stored refresh token. Outstanding access tokens stay valid
    /// until they expire.
    pub async fn revoke(&self, user_id: &str) -> Result<()> {
        self.db.set_refresh_token(user_id, None).await?;
        tracing::info!(user_id, "Revoked refresh token");
        Ok(())
    }

    pub fn access_ttl(&self) -> Duration {
        self.access.ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl
    }
}
