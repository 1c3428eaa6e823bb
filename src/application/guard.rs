use crate::domain::{repository::AuthService, user::User};

pub const LOGIN_PATH: &str = "/auth/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Where a page request should be sent instead of being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect(pub &'static str);

/// Page-level session checks. A missing or unreadable session is never an
/// error page, only a redirect.
pub struct SessionGuard<'a> {
    auth: &'a dyn AuthService,
}

impl<'a> SessionGuard<'a> {
    pub fn new(auth: &'a dyn AuthService) -> Self { Self { auth } }

    /// Protected pages: the signed-in user, or a redirect to the login page.
    pub async fn require_user(&self, token: Option<&str>) -> Result<User, Redirect> {
        let Some(token) = token else { return Err(Redirect(LOGIN_PATH)) };
        match self.auth.get_user(token).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(Redirect(LOGIN_PATH)),
            Err(err) => {
                tracing::debug!(error = %err, "session lookup failed");
                Err(Redirect(LOGIN_PATH))
            }
        }
    }

    /// Home and login pages: signed-in users are sent to the dashboard.
    pub async fn redirect_if_authenticated(&self, token: Option<&str>) -> Result<(), Redirect> {
        let Some(token) = token else { return Ok(()) };
        match self.auth.get_session(token).await {
            Ok(Some(_)) => Err(Redirect(DASHBOARD_PATH)),
            Ok(None) => Ok(()),
            Err(err) => {
                tracing::debug!(error = %err, "session lookup failed");
                Ok(())
            }
        }
    }
}
