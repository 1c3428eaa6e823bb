use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::{
    actions::{ActionError, ActionOutcome, TodoActions},
    auth::AuthActions,
};
use crate::domain::todo::Todo;
use crate::infrastructure::Backend;

#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    pub todos: TodoActions,
    pub auth: AuthActions,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(backend: Backend, sign_up_redirect: impl Into<String>) -> Self {
        let todos = TodoActions::new(backend.auth.clone(), backend.todos.clone());
        let auth = AuthActions::new(backend.auth.clone(), sign_up_redirect);
        Self { backend, todos, auth, secure_cookies: false }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError { pub error: String }

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionReply {
    pub success: String,
    pub affected: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<Todo>,
}

impl From<ActionOutcome> for ActionReply {
    fn from(outcome: ActionOutcome) -> Self {
        Self { success: outcome.message, affected: outcome.affected, todo: outcome.todo }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let status = match &self {
            ActionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ActionError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ActionError::Storage(_) => StatusCode::BAD_REQUEST,
        };
        (status, axum::Json(ApiError { error: self.to_string() })).into_response()
    }
}
