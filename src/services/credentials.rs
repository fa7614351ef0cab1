// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and password login.

use argon2::{
    password_hash::{self, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::rngs::OsRng;
use std::sync::Arc;

use crate::db::{DatabaseError, SharedDatabase};
use crate::error::{AppError, Result};
use crate::models::{NewUser, Role, User};

/// One-way password hashing.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> anyhow::Result<String>;
    /// `Ok(false)` for a wrong password; `Err` only if the stored hash is unusable.
    fn verify(&self, password: &str, hash: &str) -> anyhow::Result<bool>;
}

/// Argon2id with the crate's default parameters.
#[derive(Default)]
pub struct Argon2Hasher {
    argon: Argon2<'static>,
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| anyhow::anyhow!("Stored password hash is invalid: {}", e))?;

        match self.argon.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
        }
    }
}

/// Checks passwords and creates accounts.
#[derive(Clone)]
pub struct CredentialService {
    db: SharedDatabase,
    hasher: Arc<dyn CredentialHasher>,
}

impl CredentialService {
    pub fn new(db: SharedDatabase, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { db, hasher }
    }

    /// Hashing is CPU-bound, so it runs on the blocking pool.
    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        let hasher = self.hasher.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Verification task failed: {}", e)))??;
        Ok(valid)
    }

    /// Authenticate by email or username.
    ///
    /// Returns `NotFound` for an unknown identifier and `InvalidCredentials`
    /// for a wrong password. The login handler folds both into
    /// `InvalidCredentials` before responding.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<User> {
        let identifier = identifier.trim().to_lowercase();
        if identifier.is_empty() {
            return Err(AppError::Validation(
                "Email or username is required".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()));
        }

        let user = self
            .db
            .user_by_identifier(&identifier)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !self
            .verify_password(password.to_string(), user.password_hash.clone())
            .await?
        {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(user)
    }

    /// Create a viewer account. Email and username are stored lowercase.
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        let required = [
            ("username", &new_user.username),
            ("email", &new_user.email),
            ("full_name", &new_user.full_name),
            ("password", &new_user.password),
            ("avatar", &new_user.avatar),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::Validation(format!("{} is required", field)));
        }

        let password_hash = self.hash_password(new_user.password).await?;
        let now = chrono::Utc::now();

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: new_user.username.trim().to_lowercase(),
            email: new_user.email.trim().to_lowercase(),
            full_name: new_user.full_name.trim().to_string(),
            avatar: new_user.avatar,
            cover_image: new_user.cover_image.filter(|c| !c.trim().is_empty()),
            password_hash,
            role: Role::Viewer,
            refresh_token: None,
            watch_history: vec![],
            created_at: now,
            updated_at: now,
        };

        self.db.create_user(&user).await.map_err(|e| match e {
            DatabaseError::Conflict { field, .. } => {
                AppError::Conflict(format!("A user with this {} already exists", field))
            }
            e => e.into(),
        })?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }
}
