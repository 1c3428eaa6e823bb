use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    repository::AuthService,
    todo::UserId,
    user::{Session, SignUpOutcome, User},
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const SESSION_TTL_DAYS: i64 = 7;

/// Password accounts in SQLite, sessions in memory.
#[derive(Clone)]
pub struct SqliteAuthService {
    pool: SqlitePool,
    api_key: Arc<str>,
    session_ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SqliteAuthService {
    pub fn new(pool: SqlitePool, api_key: &str) -> Self {
        Self { pool, api_key: Arc::from(api_key), session_ttl: Duration::days(SESSION_TTL_DAYS), sessions: Arc::default() }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.created_at >= self.session_ttl
    }

    /// Argon2id keyed with the backend's public key.
    fn hasher(&self) -> Result<Argon2<'_>> {
        Argon2::new_with_secret(self.api_key.as_bytes(), Algorithm::Argon2id, Version::V0x13, Params::default())
            .map_err(|err| anyhow!("password hasher: {err}"))
    }

    fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow!("hash password: {err}"))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, stored: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored).map_err(|err| anyhow!("stored password hash: {err}"))?;
        Ok(self.hasher()?.verify_password(password.as_bytes(), &parsed).is_ok())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| -> Result<(User, String)> {
            let hash: String = row.try_get("password_hash")?;
            Ok((row_to_user(&row)?, hash))
        })
        .transpose()
    }
}

#[async_trait]
impl AuthService for SqliteAuthService {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let session = self.sessions.read().await.get(token).cloned();
        match session {
            Some(session) if self.is_expired(&session, Utc::now()) => {
                self.sessions.write().await.remove(token);
                tracing::debug!(user = %session.user.id, "session expired");
                Ok(None)
            }
            session => Ok(session),
        }
    }

    async fn get_user(&self, token: &str) -> Result<Option<User>> {
        Ok(self.get_session(token).await?.map(|s| s.user))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        let Some((user, hash)) = self.find_by_email(&email).await? else {
            bail!("Invalid login credentials");
        };
        if !self.verify_password(password, &hash)? {
            bail!("Invalid login credentials");
        }
        let now = Utc::now();
        let session = Session { token: Uuid::new_v4().simple().to_string(), user, created_at: now };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !self.is_expired(s, now));
        sessions.insert(session.token.clone(), session.clone());
        drop(sessions);
        tracing::info!(user = %session.user.id, "signed in");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<SignUpOutcome> {
        let email = normalize_email(email);
        if !is_plausible_email(&email) {
            bail!("Unable to validate email address: invalid format");
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            bail!("Password should be at least {MIN_PASSWORD_LEN} characters.");
        }
        if self.find_by_email(&email).await?.is_some() {
            bail!("User already registered");
        }

        let user = User { id: UserId(Uuid::new_v4()), email, created_at: Utc::now() };
        let hash = self.hash_password(password)?;
        sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(hash)
            .bind(user.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        tracing::info!(user = %user.id, "signed up");
        Ok(SignUpOutcome { user, redirect_to: redirect_to.to_string() })
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        if let Some(session) = self.sessions.write().await.remove(token) {
            tracing::info!(user = %session.user.id, "signed out");
        }
        Ok(())
    }
}

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn is_plausible_email(email: &str) -> bool {
    matches!(email.split_once('@'), Some((local, domain)) if !local.is_empty() && domain.contains('.'))
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(User {
        id: id.parse().with_context(|| format!("bad user id `{id}`"))?,
        email: row.try_get("email")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .with_context(|| format!("bad timestamp `{created_at}`"))?
            .with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db;

    async fn auth() -> SqliteAuthService {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let auth = SqliteAuthService::new(pool, "anon-key");
        auth.init().await.unwrap();
        auth
    }

    #[tokio::test]
    async fn hashes_are_salted_and_keyed() {
        let auth = auth().await;
        let a = auth.hash_password("secret").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, auth.hash_password("secret").unwrap());
        assert!(auth.verify_password("secret", &a).unwrap());
        assert!(!auth.verify_password("Secret", &a).unwrap());

        let other_key = SqliteAuthService::new(auth.pool.clone(), "other-key");
        assert!(!other_key.verify_password("secret", &a).unwrap());
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let auth = auth().await.with_session_ttl(Duration::zero());
        auth.sign_up("ann@example.com", "hunter22", "/").await.unwrap();
        let first = auth.sign_in_with_password("ann@example.com", "hunter22").await.unwrap();
        assert_eq!(auth.get_user(&first.token).await.unwrap(), None);

        auth.sign_in_with_password("ann@example.com", "hunter22").await.unwrap();
        auth.sign_in_with_password("ann@example.com", "hunter22").await.unwrap();
        assert_eq!(auth.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_and_out() {
        let auth = auth().await;
        let outcome = auth.sign_up(" Ann@Example.com ", "hunter22", "http://localhost:3000/dashboard").await.unwrap();
        assert_eq!(outcome.user.email, "ann@example.com");
        assert_eq!(outcome.redirect_to, "http://localhost:3000/dashboard");

        let session = auth.sign_in_with_password("ann@example.com", "hunter22").await.unwrap();
        assert_eq!(auth.get_user(&session.token).await.unwrap(), Some(outcome.user));

        auth.sign_out(&session.token).await.unwrap();
        assert_eq!(auth.get_session(&session.token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_bad_credentials_and_duplicates() {
        let auth = auth().await;
        auth.sign_up("ann@example.com", "hunter22", "/").await.unwrap();

        let err = auth.sign_in_with_password("ann@example.com", "wrong-pass").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        let err = auth.sign_in_with_password("nobody@example.com", "hunter22").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        let err = auth.sign_up("ANN@example.com", "hunter22", "/").await.unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
        let err = auth.sign_up("bob@example.com", "123", "/").await.unwrap_err();
        assert_eq!(err.to_string(), "Password should be at least 6 characters.");
        let err = auth.sign_up("not-an-email", "hunter22", "/").await.unwrap_err();
        assert!(err.to_string().starts_with("Unable to validate email address"));
    }
}
