//! Admin sessions: password login, opaque cookie tokens, server-side verification.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{RepoError, SessionsRepo};
use crate::domain::entities::AdminSessionRecord;

const MIN_TOKEN_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("admin login is not configured")]
    NotConfigured,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing session")]
    Missing,
    #[error("invalid or expired session")]
    InvalidSession,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Authenticated admin, attached to requests by the session middleware.
#[derive(Debug, Clone)]
pub struct AdminPrincipal {
    pub session_id: Uuid,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AdminAuthService {
    sessions: Arc<dyn SessionsRepo>,
    password_sha256: Option<[u8; 32]>,
    session_ttl: Duration,
}

impl AdminAuthService {
    pub fn new(
        sessions: Arc<dyn SessionsRepo>,
        password_sha256: Option<[u8; 32]>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            password_sha256,
            session_ttl,
        }
    }

    /// Hex SHA-256 of a password, the format `admin.password_sha256` expects.
    pub fn hash_password(password: &str) -> String {
        hex::encode(&Self::digest(password)[..])
    }

    pub async fn login(&self, password: &str) -> Result<IssuedSession, AuthError> {
        let expected = self.password_sha256.ok_or(AuthError::NotConfigured)?;
        let supplied = Self::digest(password);
        if supplied.as_slice().ct_eq(expected.as_slice()).unwrap_u8() == 0 {
            counter!("florette_admin_login_rejected_total").increment(1);
            warn!(target = "florette::auth", "admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let token = Self::generate_token();
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.session_ttl;
        let record = self
            .sessions
            .create_session(&Self::digest(&token), expires_at)
            .await?;

        info!(
            target = "florette::auth",
            session_id = %record.id,
            expires_at = %record.expires_at,
            "admin session issued"
        );

        Ok(IssuedSession {
            token,
            expires_at: record.expires_at,
        })
    }

    pub async fn authenticate(&self, token: &str) -> Result<AdminPrincipal, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        if token.len() < MIN_TOKEN_LEN {
            return Err(AuthError::InvalidSession);
        }

        let now = OffsetDateTime::now_utc();
        let record: AdminSessionRecord = self
            .sessions
            .find_active_session(&Self::digest(token), now)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        // best-effort last_seen update; do not block auth
        let sessions = self.sessions.clone();
        let session_id = record.id;
        tokio::spawn(async move {
            let _ = sessions.touch_session(session_id, now).await;
        });

        Ok(AdminPrincipal {
            session_id: record.id,
            expires_at: record.expires_at,
        })
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(());
        }
        self.sessions.delete_session(&Self::digest(token)).await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let removed = self
            .sessions
            .purge_expired_sessions(OffsetDateTime::now_utc())
            .await?;
        if removed > 0 {
            info!(
                target = "florette::auth",
                removed, "expired admin sessions purged"
            );
        }
        Ok(removed)
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    fn digest(input: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_token() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }
}
