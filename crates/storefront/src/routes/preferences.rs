//! Language and theme switches from the page header.

use axum::{Form, http::HeaderMap, response::Redirect};
use serde::Deserialize;
use tracing::instrument;

use super::views::{back_to, redirect_error};
use crate::error::Result;
use crate::middleware::Visitor;
use crate::providers::{Language, Preferences};

/// Language switch form data.
#[derive(Debug, Deserialize)]
pub struct LanguageForm {
    pub lang: String,
}

/// Store the chosen language and go back.
#[instrument(skip(visitor, headers))]
pub async fn set_language(
    visitor: Visitor,
    headers: HeaderMap,
    Form(form): Form<LanguageForm>,
) -> Result<Redirect> {
    let back = back_to(&headers, "/");
    let Some(language) = Language::from_code(&form.lang) else {
        return Ok(redirect_error(&back, "Unsupported language"));
    };

    let mut preferences = Preferences::load(visitor.session).await?;
    preferences.set_language(language).await?;
    Ok(Redirect::to(&back))
}

/// Switch between the light and dark theme and go back.
#[instrument(skip(visitor, headers))]
pub async fn toggle_theme(visitor: Visitor, headers: HeaderMap) -> Result<Redirect> {
    let mut preferences = Preferences::load(visitor.session).await?;
    let theme = preferences.toggle_theme().await?;
    tracing::debug!(theme = theme.as_str(), "Theme switched");
    Ok(Redirect::to(&back_to(&headers, "/")))
}
