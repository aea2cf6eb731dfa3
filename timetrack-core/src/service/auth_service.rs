//! # Authentication Service
//!
//! Registration, login, refresh-token rotation, and logout for the embed
//! widget's own lightweight identity (it is not a general-purpose user
//! system — no email verification, no password reset flow, since the
//! widget's callers authenticate end users through the embedding host).
//!
//! ## Refresh rotation and replay detection
//!
//! Every refresh both consumes the presented token and issues a new one
//! ([`shared::redis_client::RedisClient::compare_and_delete`] makes the
//! consume atomic). If the presented token was already consumed — a
//! replay, most likely a stolen refresh token used after the legitimate
//! client already rotated it — every outstanding refresh token for that
//! user is revoked rather than just rejecting the one request, so a
//! stolen token can't be quietly retried.

use shared::{
    auth::{jwt::JwtService, password::{PasswordHasher, PasswordValidator}, TokenPair},
    errors::ApiError,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{NewUser, User, UserProfile},
    repository::UserRepository,
    service::session_store::SessionStore,
};

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
    pub session_id: Uuid,
}

#[derive(Clone)]
pub struct AuthService {
    repository: UserRepository,
    jwt_service: Arc<JwtService>,
    password_hasher: Arc<PasswordHasher>,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(
        repository: UserRepository,
        jwt_service: Arc<JwtService>,
        password_hasher: Arc<PasswordHasher>,
        sessions: SessionStore,
    ) -> Self {
        Self { repository, jwt_service, password_hasher, sessions }
    }

    pub async fn register(&self, email: &str, password: &str, display_name: &str) -> Result<AuthResponse, ApiError> {
        PasswordValidator::validate(password).map_err(|reasons| ApiError::WeakPassword { reasons })?;

        if self.repository.email_exists(email).await? {
            return Err(ApiError::Conflict { resource_type: "user", resource: "email already registered".to_string() });
        }

        let hashed_password = self.password_hasher.hash(password)?;
        let user = self
            .repository
            .create(NewUser {
                email: email.to_string(),
                hashed_password,
                display_name: display_name.to_string(),
                role: "user".to_string(),
            })
            .await?;

        info!(user_id = %user.user_id, "user registered");
        self.issue_session(user).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let user = self
            .repository
            .find_by_email(email)
            .await?
            .ok_or_else(|| {
                warn!(email = %email, "login attempt for unknown email");
                ApiError::InvalidCredentials
            })?;

        if !self.password_hasher.verify(password, &user.hashed_password)? {
            warn!(user_id = %user.user_id, "failed login attempt");
            return Err(ApiError::InvalidCredentials);
        }

        info!(user_id = %user.user_id, "user logged in");
        self.issue_session(user).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let claims = self
            .jwt_service
            .validate_refresh_token(refresh_token)
            .map_err(|_| ApiError::InvalidRefreshToken)?;

        let consumed = self.sessions.consume_refresh(claims.jti, claims.sub).await?;
        if !consumed {
            warn!(user_id = %claims.sub, "refresh token replay detected, revoking session family");
            self.sessions.delete_refreshes_by_user(claims.sub).await?;
            return Err(ApiError::InvalidRefreshToken);
        }

        let user = self
            .repository
            .find_by_id(claims.sub)
            .await?
            .ok_or(ApiError::InvalidRefreshToken)?;

        self.mint_tokens(&user).await
    }

    pub async fn logout(&self, user_id: Uuid, session_id: Uuid, refresh_jti: Uuid) -> Result<(), ApiError> {
        self.sessions.delete(session_id, user_id).await?;
        self.sessions.delete_refresh(refresh_jti, user_id).await?;
        info!(user_id = %user_id, "user logged out");
        Ok(())
    }

    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let sessions = self.sessions.delete_by_user(user_id).await?;
        self.sessions.delete_refreshes_by_user(user_id).await?;
        info!(user_id = %user_id, sessions_terminated = sessions, "user logged out everywhere");
        Ok(sessions)
    }

    /// Rotates the password and revokes every outstanding session and
    /// refresh token, forcing re-authentication everywhere.
    pub async fn change_password(&self, user_id: Uuid, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource_type: "user", resource: format!("user:{user_id}") })?;

        if !self.password_hasher.verify(current_password, &user.hashed_password)? {
            return Err(ApiError::InvalidCurrentPassword);
        }

        PasswordValidator::validate(new_password).map_err(|reasons| ApiError::WeakPassword { reasons })?;

        let hashed = self.password_hasher.hash(new_password)?;
        self.repository.update_password(user_id, &hashed).await?;
        self.sessions.delete_by_user(user_id).await?;
        self.sessions.delete_refreshes_by_user(user_id).await?;

        info!(user_id = %user_id, "password changed, all sessions revoked");
        Ok(())
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource_type: "user", resource: format!("user:{user_id}") })?;
        Ok(user.into())
    }

    async fn issue_session(&self, user: User) -> Result<AuthResponse, ApiError> {
        let tokens = self.mint_tokens(&user).await?;
        let session = self.sessions.create(user.user_id).await?;

        Ok(AuthResponse {
            tokens,
            user: user.into(),
            session_id: session.session_id,
        })
    }

    /// Generates a token pair and records the new refresh token's `jti` in
    /// the session store so it can later be consumed exactly once.
    async fn mint_tokens(&self, user: &User) -> Result<TokenPair, ApiError> {
        let tokens = self.jwt_service.generate_tokens(user.user_id, &user.email, &user.role)?;
        let refresh_claims = self
            .jwt_service
            .validate_refresh_token(&tokens.refresh_token)
            .map_err(|_| ApiError::InternalError { message: "minted refresh token failed self-validation".to_string() })?;
        self.sessions.store_refresh(refresh_claims.jti, user.user_id).await?;
        Ok(tokens)
    }
}
