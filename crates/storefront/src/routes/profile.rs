//! Profile page: account info, profile edit, password change and the
//! upgrade to a seller account.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use super::views::{Flash, Shell, format_date, redirect_error, redirect_notice};
use crate::api::types::{PasswordChange, ProfileUpdate, User};
use crate::error::{Result, inline_message};
use crate::middleware::RequireAuth;
use crate::state::AppState;

const PROFILE_PATH: &str = "/profile";

/// Shortest accepted new password.
const MIN_PASSWORD_LEN: usize = 3;

/// Profile edit form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
}

/// Password change form data.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordForm {
    fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.current_password.is_empty() || self.new_password.is_empty() {
            return Err("Current password and new password are required");
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err("New password must be at least 3 characters");
        }
        if self.new_password != self.confirm_password {
            return Err("Passwords do not match");
        }
        Ok(())
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub username: String,
    pub email: String,
    pub role: &'static str,
    pub member_since: String,
    pub can_become_seller: bool,
}

/// Display the profile, preferring fresh data from the backend.
#[instrument(skip(state, signed_in))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Query(mut flash): Query<Flash>,
) -> Result<ProfileTemplate> {
    let user: User = match state.api().profile(&signed_in.credentials).await {
        Ok(user) => user,
        Err(e) => {
            let message = inline_message(e)?;
            flash.error.get_or_insert(message);
            signed_in.user.clone()
        }
    };

    Ok(ProfileTemplate {
        shell: Shell::load(&state, &signed_in.visitor).await?,
        flash,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.as_str(),
        member_since: format_date(user.created_at),
        can_become_seller: !user.role.is_seller(),
    })
}

/// Update username and email.
#[instrument(skip(state, signed_in, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(mut signed_in): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let username = form.username.trim();
    if username.is_empty() {
        return Ok(redirect_error(PROFILE_PATH, "Username is required"));
    }

    let update = ProfileUpdate {
        username: username.to_string(),
        email: form.email.trim().to_string(),
    };
    match state
        .api()
        .update_profile(&signed_in.credentials, &update)
        .await
    {
        Ok(user) => {
            signed_in.visitor.auth.refresh_user(user).await?;
            Ok(redirect_notice(PROFILE_PATH, "Profile updated successfully!"))
        }
        Err(e) => Ok(redirect_error(PROFILE_PATH, &inline_message(e)?)),
    }
}

/// Change the account password.
#[instrument(skip(state, signed_in, form))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Form(form): Form<PasswordForm>,
) -> Result<Redirect> {
    if let Err(message) = form.validate() {
        return Ok(redirect_error(PROFILE_PATH, message));
    }

    let change = PasswordChange {
        current_password: form.current_password,
        new_password: form.new_password,
    };
    match state
        .api()
        .change_password(&signed_in.credentials, &change)
        .await
    {
        Ok(()) => Ok(redirect_notice(PROFILE_PATH, "Password changed successfully!")),
        Err(e) => Ok(redirect_error(PROFILE_PATH, &inline_message(e)?)),
    }
}

/// Upgrade the account to a seller and refresh the stored user record.
#[instrument(skip(state, signed_in))]
pub async fn become_seller(
    State(state): State<AppState>,
    RequireAuth(mut signed_in): RequireAuth,
) -> Result<Redirect> {
    let response = match state.api().become_seller(&signed_in.credentials).await {
        Ok(response) => response,
        Err(e) => return Ok(redirect_error(PROFILE_PATH, &inline_message(e)?)),
    };

    match state.api().profile(&signed_in.credentials).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, role = %user.role, "Account upgraded to seller");
            signed_in.visitor.auth.refresh_user(user).await?;
        }
        Err(e) => {
            inline_message(e)?;
        }
    }

    let message = response
        .message
        .unwrap_or_else(|| "You are now a seller".to_string());
    Ok(redirect_notice(PROFILE_PATH, &message))
}
