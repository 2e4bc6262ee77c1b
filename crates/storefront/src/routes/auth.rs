//! Authentication route handlers.
//!
//! Login, registration and logout against the marketplace backend. Errors
//! are shown on the form after a redirect (`?error=`).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::views::{Flash, Shell, redirect_error};
use crate::api::types::RegisterMeta;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::Visitor;
use crate::state::AppState;

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

impl RegisterForm {
    /// Check the form before calling the backend.
    fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("Email and password are required");
        }
        if self.password != self.password_confirm {
            return Err("Passwords do not match");
        }
        Ok(())
    }

    fn meta(&self) -> RegisterMeta {
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        RegisterMeta {
            first_name: field(&self.first_name),
            last_name: field(&self.last_name),
            phone: field(&self.phone),
            company: field(&self.company),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub shell: Shell,
    pub flash: Flash,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub shell: Shell,
    pub flash: Flash,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in visitors go home.
#[instrument(skip(state, visitor))]
pub async fn login_page(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(flash): Query<Flash>,
) -> Result<Response> {
    if visitor.auth.is_authenticated() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(LoginTemplate {
        shell: Shell::load(&state, &visitor).await?,
        flash,
    }
    .into_response())
}

/// Handle login form submission.
#[instrument(skip(state, visitor, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    mut visitor: Visitor,
    Form(form): Form<LoginForm>,
) -> Response {
    match visitor
        .auth
        .login(state.api(), form.username.trim(), &form.password)
        .await
    {
        Ok(user) => {
            set_sentry_user(&user.id, Some(&user.email));
            Redirect::to("/").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            redirect_error(LOGIN_PATH, &e.user_message()).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(state, visitor))]
pub async fn register_page(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(flash): Query<Flash>,
) -> Result<Response> {
    if visitor.auth.is_authenticated() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(RegisterTemplate {
        shell: Shell::load(&state, &visitor).await?,
        flash,
    }
    .into_response())
}

/// Handle registration form submission: register, then sign in.
///
/// New accounts land on the home page with recommendations.
#[instrument(skip(state, visitor, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    mut visitor: Visitor,
    Form(form): Form<RegisterForm>,
) -> Response {
    if let Err(message) = form.validate() {
        return redirect_error(REGISTER_PATH, message).into_response();
    }

    match visitor
        .auth
        .register(state.api(), form.email.trim(), &form.password, &form.meta())
        .await
    {
        Ok(user) => {
            set_sentry_user(&user.id, Some(&user.email));
            Redirect::to("/?welcome=1").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            redirect_error(REGISTER_PATH, &e.user_message()).into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out. The cart and favorites stay in the session.
#[instrument(skip(visitor))]
pub async fn logout(mut visitor: Visitor) -> Result<Redirect> {
    visitor.auth.logout().await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            email: "ada@example.com".to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
            first_name: Some("  Ada ".to_string()),
            last_name: Some(String::new()),
            phone: None,
            company: None,
        }
    }

    #[test]
    fn test_register_form_requires_matching_passwords() {
        assert_eq!(
            form("secret", "secre7").validate(),
            Err("Passwords do not match")
        );
        assert_eq!(
            form("", "").validate(),
            Err("Email and password are required")
        );
        assert_eq!(form("secret", "secret").validate(), Ok(()));
    }

    #[test]
    fn test_register_meta_drops_blank_fields() {
        let meta = form("a", "a").meta();
        assert_eq!(meta.first_name.as_deref(), Some("Ada"));
        assert_eq!(meta.last_name, None);
    }
}
