//! Favorites route handlers.
//!
//! Favorites live in the visitor's session only; toggling a product that is
//! not yet saved fetches its snapshot from the catalog first.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use bazaar_core::ProductId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::views::{Flash, Shell, SnapshotView, back_to, redirect_error, redirect_notice};
use crate::error::{Result, add_breadcrumb, inline_message};
use crate::middleware::Visitor;
use crate::providers::Favorites;
use crate::state::AppState;

const FAVORITES_PATH: &str = "/favorites";

/// Favorite toggle and remove form data.
#[derive(Debug, Deserialize)]
pub struct FavoriteForm {
    pub product_id: String,
}

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/favorites.html")]
pub struct FavoritesTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub favorites: Vec<SnapshotView>,
}

async fn load_favorites(visitor: &Visitor) -> Result<Favorites<Session>> {
    Ok(Favorites::load(visitor.session.clone(), visitor.user_id()).await?)
}

/// Display the saved products.
#[instrument(skip(state, visitor))]
pub async fn index(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(flash): Query<Flash>,
) -> Result<FavoritesTemplate> {
    let favorites = load_favorites(&visitor).await?;

    Ok(FavoritesTemplate {
        shell: Shell::load(&state, &visitor).await?,
        flash,
        favorites: favorites
            .favorites()
            .iter()
            .map(SnapshotView::from)
            .collect(),
    })
}

/// Save or unsave a product, then go back.
#[instrument(skip(state, visitor, headers, form), fields(product_id = %form.product_id))]
pub async fn toggle(
    State(state): State<AppState>,
    visitor: Visitor,
    headers: HeaderMap,
    Form(form): Form<FavoriteForm>,
) -> Result<Redirect> {
    let back = back_to(&headers, FAVORITES_PATH);
    let product_id = ProductId::new(form.product_id);
    let mut favorites = load_favorites(&visitor).await?;

    let stored = favorites
        .favorites()
        .iter()
        .find(|product| product.id == product_id)
        .cloned();
    let snapshot = match stored {
        Some(snapshot) => snapshot,
        None => match state.api().product_snapshot(&product_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Ok(redirect_error(&back, &inline_message(e)?)),
        },
    };

    let saved = favorites.toggle_favorite(snapshot).await?;
    let message = if saved {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };
    add_breadcrumb("favorites", message, Some(&[("product_id", product_id.as_str())]));
    Ok(redirect_notice(&back, message))
}

/// Remove a product from the favorites page.
#[instrument(skip(visitor, form), fields(product_id = %form.product_id))]
pub async fn remove(visitor: Visitor, Form(form): Form<FavoriteForm>) -> Result<Redirect> {
    let mut favorites = load_favorites(&visitor).await?;
    favorites
        .remove_favorite(&ProductId::new(form.product_id))
        .await?;
    Ok(redirect_notice(FAVORITES_PATH, "Removed from favorites"))
}
