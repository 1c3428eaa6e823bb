use std::sync::Arc;

use anyhow::Result;

use super::{db, feed::BroadcastFeed, sqlite_auth::SqliteAuthService, sqlite_repo::SqliteTodoRepository, stub::StubBackend};
use crate::config::{BackendConfig, Config};
use crate::domain::repository::{AuthService, ChangeFeed, TodoRepository};

/// The three backend services behind one handle. Built once at startup from
/// [`Config`]: live adapters when configured, the stub otherwise.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthService>,
    pub todos: Arc<dyn TodoRepository>,
    pub feed: Arc<dyn ChangeFeed>,
    configured: bool,
}

impl Backend {
    pub async fn from_config(config: &Config) -> Result<Self> {
        match &config.backend {
            Some(backend) => Self::connect(backend).await,
            None => {
                tracing::warn!("TODO_BACKEND_URL / TODO_BACKEND_KEY not set; serving the not-configured notice");
                Ok(Self::unconfigured())
            }
        }
    }

    pub async fn connect(config: &BackendConfig) -> Result<Self> {
        let pool = db::connect(&config.url).await?;
        let feed = BroadcastFeed::default();
        let todos = SqliteTodoRepository::new(pool.clone(), feed.clone());
        let auth = SqliteAuthService::new(pool, &config.api_key);
        todos.init().await?;
        auth.init().await?;
        tracing::info!(url = %config.url, "backend connected");
        Ok(Self { auth: Arc::new(auth), todos: Arc::new(todos), feed: Arc::new(feed), configured: true })
    }

    pub fn unconfigured() -> Self {
        Self { auth: Arc::new(StubBackend), todos: Arc::new(StubBackend), feed: Arc::new(StubBackend), configured: false }
    }

    pub fn is_configured(&self) -> bool { self.configured }
}
