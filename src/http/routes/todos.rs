use axum::{extract::State, routing::{get, post}, Form, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::application::{actions::{ActionError, TodoForm}, view::Stats};
use crate::domain::todo::Todo;
use crate::http::{session::SessionToken, types::{ActionReply, AppState}};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/todos", get(list_todos))
        .route("/actions/todos/create", post(create_todo))
        .route("/actions/todos/update", post(update_todo))
        .route("/actions/todos/toggle", post(toggle_todo))
        .route("/actions/todos/delete", post(delete_todo))
}

#[derive(Serialize)]
struct TodoList { items: Vec<Todo>, stats: Stats }

async fn list_todos(State(state): State<AppState>, token: SessionToken) -> Result<Json<TodoList>, ActionError> {
    let items = state.todos.list(token.as_deref()).await?;
    let stats = Stats::of(&items, Utc::now());
    Ok(Json(TodoList { items, stats }))
}

async fn create_todo(State(state): State<AppState>, token: SessionToken, Form(form): Form<TodoForm>) -> Result<Json<ActionReply>, ActionError> {
    Ok(Json(state.todos.create(token.as_deref(), form).await?.into()))
}

async fn update_todo(State(state): State<AppState>, token: SessionToken, Form(form): Form<TodoForm>) -> Result<Json<ActionReply>, ActionError> {
    Ok(Json(state.todos.update(token.as_deref(), form).await?.into()))
}

async fn toggle_todo(State(state): State<AppState>, token: SessionToken, Form(form): Form<TodoForm>) -> Result<Json<ActionReply>, ActionError> {
    Ok(Json(state.todos.toggle(token.as_deref(), form).await?.into()))
}

async fn delete_todo(State(state): State<AppState>, token: SessionToken, Form(form): Form<TodoForm>) -> Result<Json<ActionReply>, ActionError> {
    Ok(Json(state.todos.delete(token.as_deref(), form).await?.into()))
}
