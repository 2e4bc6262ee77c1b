//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use super::views::{Flash, ProductCard, Shell};
use crate::api::types::Category;
use crate::error::Result;
use crate::middleware::Visitor;
use crate::providers::Favorites;
use crate::state::AppState;

/// Number of products recommended to a newly registered visitor.
const RECOMMENDED_COUNT: usize = 4;

/// Home page query.
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    /// Set after registration.
    #[serde(default)]
    pub welcome: Option<String>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub welcome: bool,
    pub recommended: Vec<ProductCard>,
    pub categories: Vec<Category>,
}

/// Display the home page.
#[instrument(skip(state, visitor))]
pub async fn home(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(query): Query<HomeQuery>,
    Query(flash): Query<Flash>,
) -> Result<HomeTemplate> {
    let welcome = query.welcome.is_some();

    let recommended = if welcome {
        let favorites = Favorites::load(visitor.session.clone(), visitor.user_id()).await?;
        match state.api().list_products().await {
            Ok(products) => products
                .iter()
                .take(RECOMMENDED_COUNT)
                .map(|product| ProductCard::new(product, &favorites))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load recommended products");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let categories = state.api().list_categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories for home page");
        Vec::new()
    });

    Ok(HomeTemplate {
        shell: Shell::load(&state, &visitor).await?,
        flash,
        welcome,
        recommended,
        categories,
    })
}
