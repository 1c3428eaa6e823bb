use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::scoped::ScopedTodos;
use crate::domain::{
    repository::{AuthService, TodoRepository},
    todo::{NewTodo, Priority, Todo, TodoChanges, TodoId},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// A required form field is missing or malformed.
    #[error("{0}")]
    Validation(String),
    /// No signed-in user for the request.
    #[error("{0}")]
    Unauthorized(String),
    /// The backend rejected the call; the message is passed through untouched.
    #[error("{0}")]
    Storage(String),
}

fn storage(err: anyhow::Error) -> ActionError { ActionError::Storage(err.to_string()) }

/// Submitted form fields. Everything is optional so that missing fields are
/// reported as validation errors rather than rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoForm {
    #[serde(rename = "todoId")]
    pub todo_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub completed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub message: String,
    /// Rows touched. Zero when the id does not belong to the acting user.
    pub affected: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<Todo>,
}

impl ActionOutcome {
    fn new(message: &str, todo: Option<Todo>, affected: u64) -> Self {
        Self { message: message.to_string(), affected, todo }
    }
}

/// The four item mutations. Each one validates the form, resolves the acting
/// user from the session token, then performs exactly one scoped storage call.
#[derive(Clone)]
pub struct TodoActions {
    auth: Arc<dyn AuthService>,
    todos: Arc<dyn TodoRepository>,
}

impl TodoActions {
    pub fn new(auth: Arc<dyn AuthService>, todos: Arc<dyn TodoRepository>) -> Self { Self { auth, todos } }

    async fn authorize(&self, token: Option<&str>, denied: &str) -> Result<ScopedTodos<'_>, ActionError> {
        let Some(token) = token else { return Err(ActionError::Unauthorized(denied.to_string())) };
        match self.auth.get_user(token).await.map_err(storage)? {
            Some(user) => Ok(ScopedTodos::new(self.todos.as_ref(), user.id)),
            None => Err(ActionError::Unauthorized(denied.to_string())),
        }
    }

    pub async fn create(&self, token: Option<&str>, form: TodoForm) -> Result<ActionOutcome, ActionError> {
        let Some(title) = non_empty(form.title) else {
            return Err(ActionError::Validation("Title is required".into()));
        };
        let input = NewTodo {
            title,
            description: non_empty(form.description),
            due_date: parse_due_date(form.due_date)?,
            priority: Priority::from_form(form.priority.as_deref()),
        };

        let scope = self.authorize(token, "You must be logged in to create todos").await?;
        let todo = scope.create(input).await.map_err(|err| {
            tracing::warn!(owner = %scope.owner(), error = %err, "create todo failed");
            storage(err)
        })?;

        tracing::info!(owner = %todo.owner, todo = %todo.id, "todo created");
        Ok(ActionOutcome::new("Todo created successfully", Some(todo), 1))
    }

    pub async fn toggle(&self, token: Option<&str>, form: TodoForm) -> Result<ActionOutcome, ActionError> {
        let (Some(id), Some(completed)) = (non_empty(form.todo_id), non_empty(form.completed)) else {
            return Err(ActionError::Validation("Todo ID and completion status are required".into()));
        };
        let id = parse_id(&id)?;
        let completed = parse_flag(&completed)
            .ok_or_else(|| ActionError::Validation(format!("Invalid completion status `{completed}`")))?;

        let scope = self.authorize(token, "You must be logged in").await?;
        let todo = scope.set_completed(id, completed).await.map_err(|err| {
            tracing::warn!(owner = %scope.owner(), todo = %id, error = %err, "toggle todo failed");
            storage(err)
        })?;

        Ok(scoped_outcome(&scope, id, "Todo status updated", todo))
    }

    pub async fn update(&self, token: Option<&str>, form: TodoForm) -> Result<ActionOutcome, ActionError> {
        let (Some(id), Some(title)) = (non_empty(form.todo_id), non_empty(form.title)) else {
            return Err(ActionError::Validation("Todo ID and title are required".into()));
        };
        let id = parse_id(&id)?;
        let changes = TodoChanges {
            title,
            description: non_empty(form.description),
            due_date: parse_due_date(form.due_date)?,
            priority: Priority::from_form(form.priority.as_deref()),
        };

        let scope = self.authorize(token, "You must be logged in").await?;
        let todo = scope.update(id, changes).await.map_err(|err| {
            tracing::warn!(owner = %scope.owner(), todo = %id, error = %err, "update todo failed");
            storage(err)
        })?;

        Ok(scoped_outcome(&scope, id, "Todo updated successfully", todo))
    }

    pub async fn delete(&self, token: Option<&str>, form: TodoForm) -> Result<ActionOutcome, ActionError> {
        let Some(id) = non_empty(form.todo_id) else {
            return Err(ActionError::Validation("Todo ID is required".into()));
        };
        let id = parse_id(&id)?;

        let scope = self.authorize(token, "You must be logged in").await?;
        let deleted = scope.delete(id).await.map_err(|err| {
            tracing::warn!(owner = %scope.owner(), todo = %id, error = %err, "delete todo failed");
            storage(err)
        })?;

        if deleted {
            tracing::info!(owner = %scope.owner(), todo = %id, "todo deleted");
        } else {
            tracing::debug!(owner = %scope.owner(), todo = %id, "delete matched no rows");
        }
        Ok(ActionOutcome::new("Todo deleted successfully", None, u64::from(deleted)))
    }

    /// The initial fetch for the acting user's list.
    pub async fn list(&self, token: Option<&str>) -> Result<Vec<Todo>, ActionError> {
        let scope = self.authorize(token, "You must be logged in").await?;
        scope.list().await.map_err(storage)
    }
}

fn scoped_outcome(scope: &ScopedTodos<'_>, id: TodoId, message: &str, todo: Option<Todo>) -> ActionOutcome {
    match todo {
        Some(todo) => {
            tracing::info!(owner = %scope.owner(), todo = %id, "todo updated");
            ActionOutcome::new(message, Some(todo), 1)
        }
        None => {
            tracing::debug!(owner = %scope.owner(), todo = %id, "scoped update matched no rows");
            ActionOutcome::new(message, None, 0)
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_id(raw: &str) -> Result<TodoId, ActionError> {
    raw.parse().map_err(|_| ActionError::Validation(format!("Invalid todo ID `{raw}`")))
}

fn parse_due_date(raw: Option<String>) -> Result<Option<NaiveDate>, ActionError> {
    non_empty(raw)
        .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|_| ActionError::Validation("Invalid due date".into())))
        .transpose()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(true),
        "false" | "off" | "0" | "no" => Some(false),
        _ => None,
    }
}
