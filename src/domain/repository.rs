use async_trait::async_trait;

use super::feed::Subscription;
use super::todo::{NewTodo, Todo, TodoChanges, TodoId, UserId};
use super::user::{Session, SignUpOutcome, User};

/// Item storage. Every write is constrained by both the item id and its owner.
#[async_trait]
pub trait TodoRepository: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    async fn insert(&self, owner: UserId, input: NewTodo) -> anyhow::Result<Todo>;
    /// Newest-created first.
    async fn list_for_owner(&self, owner: UserId) -> anyhow::Result<Vec<Todo>>;
    async fn update(&self, id: TodoId, owner: UserId, changes: TodoChanges) -> anyhow::Result<Option<Todo>>;
    async fn set_completed(&self, id: TodoId, owner: UserId, completed: bool) -> anyhow::Result<Option<Todo>>;
    async fn delete(&self, id: TodoId, owner: UserId) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait AuthService: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    async fn get_session(&self, token: &str) -> anyhow::Result<Option<Session>>;
    async fn get_user(&self, token: &str) -> anyhow::Result<Option<User>>;
    async fn sign_in_with_password(&self, email: &str, password: &str) -> anyhow::Result<Session>;
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> anyhow::Result<SignUpOutcome>;
    async fn sign_out(&self, token: &str) -> anyhow::Result<()>;
}

/// Push notification of row changes, filtered to one owner per subscription.
pub trait ChangeFeed: Send + Sync + 'static {
    fn subscribe(&self, owner: UserId) -> anyhow::Result<Subscription>;
}
