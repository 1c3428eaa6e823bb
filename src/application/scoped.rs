use anyhow::Result;

use crate::domain::{
    repository::TodoRepository,
    todo::{NewTodo, Todo, TodoChanges, TodoId, UserId},
};

/// Storage access bound to one acting user. Built only after the session has
/// been resolved, so no call through it can reach another owner's rows.
pub struct ScopedTodos<'a> {
    repo: &'a dyn TodoRepository,
    owner: UserId,
}

impl<'a> ScopedTodos<'a> {
    pub fn new(repo: &'a dyn TodoRepository, owner: UserId) -> Self { Self { repo, owner } }

    pub fn owner(&self) -> UserId { self.owner }

    pub async fn create(&self, input: NewTodo) -> Result<Todo> { self.repo.insert(self.owner, input).await }
    pub async fn list(&self) -> Result<Vec<Todo>> { self.repo.list_for_owner(self.owner).await }
    pub async fn update(&self, id: TodoId, changes: TodoChanges) -> Result<Option<Todo>> { self.repo.update(id, self.owner, changes).await }
    pub async fn set_completed(&self, id: TodoId, completed: bool) -> Result<Option<Todo>> { self.repo.set_completed(id, self.owner, completed).await }
    pub async fn delete(&self, id: TodoId) -> Result<bool> { self.repo.delete(id, self.owner).await }
}
