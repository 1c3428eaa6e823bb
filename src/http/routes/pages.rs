use std::fmt::Write;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::application::{
    guard::SessionGuard,
    view::{is_due_soon, is_overdue, StatusFilter, TodoQuery, TodoView},
};
use crate::domain::{todo::Todo, user::User};
use crate::http::{session::SessionToken, types::AppState};

const LANDING: &str = "Real-time Todo App

Stay organized with a todo list that updates live across every open session.

  Get started   POST /auth/sign-up  (email, password)
  Sign in       GET  /auth/login
";

const LOGIN: &str = "Sign in

POST /auth/login with form fields `email` and `password`.
New here? POST /auth/sign-up with the same fields.
";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/dashboard", get(dashboard))
}

async fn home(State(state): State<AppState>, token: SessionToken) -> Response {
    match SessionGuard::new(state.backend.auth.as_ref()).redirect_if_authenticated(token.as_deref()).await {
        Ok(()) => LANDING.into_response(),
        Err(redirect) => Redirect::to(redirect.0).into_response(),
    }
}

pub(crate) async fn login_page(State(state): State<AppState>, token: SessionToken) -> Response {
    match SessionGuard::new(state.backend.auth.as_ref()).redirect_if_authenticated(token.as_deref()).await {
        Ok(()) => LOGIN.into_response(),
        Err(redirect) => Redirect::to(redirect.0).into_response(),
    }
}

/// Dashboard query string. Unknown values fall back to "show everything".
#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub q: Option<String>,
    pub filter: Option<String>,
    pub priority: Option<String>,
    pub overdue: Option<String>,
}

impl DashboardParams {
    pub fn to_query(&self) -> TodoQuery {
        TodoQuery {
            search: self.q.clone().unwrap_or_default(),
            status: self.filter.as_deref().and_then(|f| f.parse().ok()).unwrap_or_default(),
            priority: self.priority.as_deref().and_then(|p| p.parse().ok()),
            overdue_only: matches!(self.overdue.as_deref(), Some("1" | "true" | "on")),
        }
    }
}

async fn dashboard(State(state): State<AppState>, token: SessionToken, Query(params): Query<DashboardParams>) -> Response {
    let user = match SessionGuard::new(state.backend.auth.as_ref()).require_user(token.as_deref()).await {
        Ok(user) => user,
        Err(redirect) => return Redirect::to(redirect.0).into_response(),
    };
    match state.todos.list(token.as_deref()).await {
        Ok(todos) => render_dashboard(&user, &todos, &params.to_query(), Utc::now()).into_response(),
        Err(err) => format!("Error loading todos: {err}\n").into_response(),
    }
}

pub fn render_dashboard(user: &User, todos: &[Todo], query: &TodoQuery, now: DateTime<Utc>) -> String {
    let view = TodoView::compute(todos, query, now);
    let stats = view.stats;
    let mut out = String::new();
    let _ = writeln!(out, "My Todos ({})  LIVE", user.email);
    let _ = writeln!(
        out,
        "Total {} | Pending {} | Completed {} | Overdue {}",
        stats.total, stats.pending, stats.completed, stats.overdue
    );
    let _ = writeln!(
        out,
        "Filter: {}  Priority: {}  Search: {:?}{}",
        query.status.label(),
        query.priority.map_or("all", |p| p.as_str()),
        query.search,
        if query.overdue_only { "  Overdue only" } else { "" }
    );

    if let Some(message) = view.empty_message() {
        let _ = writeln!(out, "\n{message}");
        return out;
    }

    let sections = [(StatusFilter::Pending, view.pending().collect::<Vec<_>>()), (StatusFilter::Completed, view.completed().collect())];
    for (status, items) in sections {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} ({})", status.label(), items.len());
        for todo in items {
            render_item(&mut out, todo, now);
        }
    }
    out
}

fn render_item(out: &mut String, todo: &Todo, now: DateTime<Utc>) {
    let mark = if todo.completed { "[x]" } else { "[ ]" };
    let _ = write!(out, "  {mark} {}  [{} priority]", todo.title, todo.priority);
    if let Some(due) = todo.due_date {
        let flag = if is_overdue(todo, now) {
            " (Overdue)"
        } else if is_due_soon(todo, now) {
            " (Due Soon)"
        } else {
            ""
        };
        let _ = write!(out, "  due {due}{flag}");
    }
    let _ = writeln!(out, "  id={}", todo.id);
    if let Some(description) = &todo.description {
        let _ = writeln!(out, "      {description}");
    }
}
