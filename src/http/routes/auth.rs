use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;

use crate::application::{
    actions::ActionError,
    auth::{CredentialsForm, SIGN_UP_MESSAGE},
    guard::{DASHBOARD_PATH, LOGIN_PATH},
};
use crate::http::{
    session::{cleared_session_cookie, session_cookie, SessionToken},
    types::AppState,
};

use super::pages;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(pages::login_page).post(sign_in))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-out", post(sign_out))
}

async fn sign_in(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Result<Response, ActionError> {
    let session = state.auth.sign_in(form).await?;
    Ok(([(header::SET_COOKIE, session_cookie(&session.token, state.secure_cookies))], Redirect::to(DASHBOARD_PATH)).into_response())
}

#[derive(Serialize)]
struct SignUpReply { success: &'static str, redirect_to: String }

async fn sign_up(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Result<Json<SignUpReply>, ActionError> {
    let outcome = state.auth.sign_up(form).await?;
    Ok(Json(SignUpReply { success: SIGN_UP_MESSAGE, redirect_to: outcome.redirect_to }))
}

async fn sign_out(State(state): State<AppState>, token: SessionToken) -> Result<Response, ActionError> {
    state.auth.sign_out(token.as_deref()).await?;
    Ok(([(header::SET_COOKIE, cleared_session_cookie(state.secure_cookies))], Redirect::to(LOGIN_PATH)).into_response())
}
