// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login and session routes.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::NewUser;
use crate::routes::api::UserResponse;
use crate::routes::validated::ValidatedJson;
use crate::services::TokenPair;
use crate::session::{self, REFRESH_COOKIE};
use crate::AppState;

/// Routes that need no access token.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

/// Routes that act on the caller's own session.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/logout", post(logout))
}

// ─── Registration ────────────────────────────────────────────

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 32),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(url)]
    pub avatar: String,
    #[serde(default, alias = "coverImage")]
    #[validate(url)]
    pub cover_image: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = state
        .credentials
        .register(NewUser {
            username: body.username,
            email: body.email,
            full_name: body.full_name,
            password: body.password,
            avatar: body.avatar,
            cover_image: body.cover_image,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

// ─── Login ───────────────────────────────────────────────────

/// Either `email` or `username` identifies the account.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let identifier = body
        .email
        .filter(|e| !e.trim().is_empty())
        .or(body.username)
        .unwrap_or_default();

    // An unknown account looks exactly like a wrong password.
    let user = state
        .credentials
        .login(&identifier, &body.password)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::InvalidCredentials,
            e => e,
        })?;

    let pair = state.tokens.issue(&user.id, user.role).await?;
    let jar = attach_session(&state, jar, &pair);

    Ok((
        jar,
        Json(LoginResponse {
            user: UserResponse::from(&user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

// ─── Token refresh ───────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RefreshRequest {
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}

/// Cookie first, then the JSON body.
fn presented_refresh_token(jar: &CookieJar, body: &Bytes) -> Result<Option<String>> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        return Ok(Some(cookie.value().to_string()));
    }
    if body.is_empty() {
        return Ok(None);
    }

    let request: RefreshRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?;
    Ok(request.refresh_token.filter(|t| !t.is_empty()))
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<TokenPair>)> {
    let presented = presented_refresh_token(&jar, &body)?.ok_or(AppError::Unauthorized)?;

    let pair = state.tokens.rotate(&presented).await.map_err(|e| match e {
        // The token named a user that has since gone away.
        AppError::NotFound(_) => AppError::Unauthorized,
        e => e,
    })?;
    let jar = attach_session(&state, jar, &pair);

    Ok((jar, Json(pair)))
}

// ─── Logout ──────────────────────────────────────────────────

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar)> {
    match state.tokens.revoke(&user.user_id).await {
        Ok(()) => {}
        // Nothing left to revoke; the cookies still go.
        Err(AppError::NotFound(_)) => {
            tracing::debug!(user_id = %user.user_id, "Logout for a user that no longer exists");
        }
        Err(e) => return Err(e),
    }
    Ok((
        StatusCode::NO_CONTENT,
        session::clear(jar, state.config.cookie_secure),
    ))
}

fn attach_session(state: &AppState, jar: CookieJar, pair: &TokenPair) -> CookieJar {
    session::attach(
        jar,
        pair,
        state.tokens.access_ttl(),
        state.tokens.refresh_ttl(),
        state.config.cookie_secure,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn test_refresh_token_from_camel_case_body() {
        let body = Bytes::from_static(br#"{"refreshToken":"abc"}"#);
        assert_eq!(
            presented_refresh_token(&CookieJar::new(), &body).unwrap(),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_refresh_cookie_wins_over_body() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken=cookie"));
        let jar = CookieJar::from_headers(&headers);
        let body = Bytes::from_static(br#"{"refresh_token":"body"}"#);

        assert_eq!(
            presented_refresh_token(&jar, &body).unwrap(),
            Some("cookie".to_string())
        );
    }

    #[test]
    fn test_refresh_token_absent() {
        assert_eq!(
            presented_refresh_token(&CookieJar::new(), &Bytes::new()).unwrap(),
            None
        );
        assert_eq!(
            presented_refresh_token(&CookieJar::new(), &Bytes::from_static(b"{}")).unwrap(),
            None
        );
        assert!(presented_refresh_token(&CookieJar::new(), &Bytes::from_static(b"nope")).is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            username: "alice_01".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice".to_string(),
            password: "correct horse".to_string(),
            avatar: "https://cdn.example.com/a.png".to_string(),
            cover_image: None,
        };
        assert!(valid.validate().is_ok());

        let bad_username = RegisterRequest {
            username: "alice smith".to_string(),
            ..valid.clone()
        };
        assert!(bad_username.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".to_string(),
            ..valid.clone()
        };
        assert!(short_password.validate().is_err());
    }
}
