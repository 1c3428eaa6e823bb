use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::domain::{
    feed::Subscription,
    repository::{AuthService, ChangeFeed, TodoRepository},
    todo::{NewTodo, Todo, TodoChanges, TodoId, UserId},
    user::{Session, SignUpOutcome, User},
};

pub const NOT_CONFIGURED: &str = "backend is not configured";

/// Stand-in used when backend settings are missing. Every call fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubBackend;

fn not_configured<T>() -> Result<T> { Err(anyhow!(NOT_CONFIGURED)) }

#[async_trait]
impl TodoRepository for StubBackend {
    async fn init(&self) -> Result<()> { Ok(()) }
    async fn insert(&self, _: UserId, _: NewTodo) -> Result<Todo> { not_configured() }
    async fn list_for_owner(&self, _: UserId) -> Result<Vec<Todo>> { not_configured() }
    async fn update(&self, _: TodoId, _: UserId, _: TodoChanges) -> Result<Option<Todo>> { not_configured() }
    async fn set_completed(&self, _: TodoId, _: UserId, _: bool) -> Result<Option<Todo>> { not_configured() }
    async fn delete(&self, _: TodoId, _: UserId) -> Result<bool> { not_configured() }
}

#[async_trait]
impl AuthService for StubBackend {
    async fn init(&self) -> Result<()> { Ok(()) }
    async fn get_session(&self, _: &str) -> Result<Option<Session>> { not_configured() }
    async fn get_user(&self, _: &str) -> Result<Option<User>> { not_configured() }
    async fn sign_in_with_password(&self, _: &str, _: &str) -> Result<Session> { not_configured() }
    async fn sign_up(&self, _: &str, _: &str, _: &str) -> Result<SignUpOutcome> { not_configured() }
    async fn sign_out(&self, _: &str) -> Result<()> { not_configured() }
}

impl ChangeFeed for StubBackend {
    fn subscribe(&self, _: UserId) -> Result<Subscription> { not_configured() }
}
