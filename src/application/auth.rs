use std::sync::Arc;

use serde::Deserialize;

use super::actions::{non_empty, ActionError};
use crate::domain::{
    repository::AuthService,
    user::{Session, SignUpOutcome},
};

pub const SIGN_UP_MESSAGE: &str = "Check your email to confirm your account.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Sign-in, sign-up and sign-out form actions.
#[derive(Clone)]
pub struct AuthActions {
    auth: Arc<dyn AuthService>,
    sign_up_redirect: String,
}

impl AuthActions {
    pub fn new(auth: Arc<dyn AuthService>, sign_up_redirect: impl Into<String>) -> Self {
        Self { auth, sign_up_redirect: sign_up_redirect.into() }
    }

    pub async fn sign_in(&self, form: CredentialsForm) -> Result<Session, ActionError> {
        let (email, password) = credentials(form)?;
        self.auth.sign_in_with_password(&email, &password).await.map_err(|err| {
            tracing::info!(error = %err, "sign in rejected");
            ActionError::Storage(err.to_string())
        })
    }

    pub async fn sign_up(&self, form: CredentialsForm) -> Result<SignUpOutcome, ActionError> {
        let (email, password) = credentials(form)?;
        self.auth.sign_up(&email, &password, &self.sign_up_redirect).await.map_err(|err| {
            tracing::info!(error = %err, "sign up rejected");
            ActionError::Storage(err.to_string())
        })
    }

    /// Ending a session that does not exist is not an error.
    pub async fn sign_out(&self, token: Option<&str>) -> Result<(), ActionError> {
        let Some(token) = token else { return Ok(()) };
        self.auth.sign_out(token).await.map_err(|err| ActionError::Storage(err.to_string()))
    }
}

fn credentials(form: CredentialsForm) -> Result<(String, String), ActionError> {
    // Passwords are taken as typed; only emptiness is checked here.
    let password = form.password.filter(|p| !p.is_empty());
    match (non_empty(form.email), password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(ActionError::Validation("Email and password are required".into())),
    }
}
