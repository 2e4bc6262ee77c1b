//! Category browsing.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use bazaar_core::CategoryId;
use serde::Deserialize;
use tracing::instrument;

use super::views::{Flash, ProductCard, SelectOption, Shell};
use crate::api::types::Category;
use crate::error::{Result, inline_message};
use crate::middleware::Visitor;
use crate::providers::Favorites;
use crate::state::AppState;

/// Category page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    #[serde(default)]
    pub selected: Option<String>,
}

/// The selected category: the requested one when it exists, else the first.
#[must_use]
pub fn selected_category<'a>(
    categories: &'a [Category],
    requested: Option<&str>,
) -> Option<&'a Category> {
    requested
        .and_then(|id| categories.iter().find(|c| c.id.as_str() == id))
        .or_else(|| categories.first())
}

/// Categories page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories.html")]
pub struct CategoriesTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub categories: Vec<SelectOption>,
    pub selected_name: Option<String>,
    pub selected_description: Option<String>,
    pub products: Vec<ProductCard>,
}

/// Display categories and the products of the selected one.
#[instrument(skip(state, visitor))]
pub async fn index(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(query): Query<CategoriesQuery>,
    Query(mut flash): Query<Flash>,
) -> Result<CategoriesTemplate> {
    let categories = match state.api().list_categories().await {
        Ok(categories) => categories,
        Err(e) => {
            flash.error = Some(inline_message(e)?);
            Vec::new()
        }
    };

    let selected = selected_category(&categories, query.selected.as_deref());
    let selected_id: Option<CategoryId> = selected.map(|c| c.id.clone());

    let favorites = Favorites::load(visitor.session.clone(), visitor.user_id()).await?;
    let products = match &selected_id {
        Some(id) => match state.api().category_products(id).await {
            Ok(products) => products
                .iter()
                .map(|product| ProductCard::new(product, &favorites))
                .collect(),
            Err(e) => {
                flash.error = Some(inline_message(e)?);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    Ok(CategoriesTemplate {
        shell: Shell::load(&state, &visitor).await?,
        flash,
        selected_name: selected.map(|c| c.name.clone()),
        selected_description: selected.and_then(|c| c.description.clone()),
        categories: categories
            .iter()
            .map(|c| SelectOption {
                value: c.id.to_string(),
                label: c.name.clone(),
                selected: selected_id.as_ref() == Some(&c.id),
            })
            .collect(),
        products,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selected_defaults_to_first() {
        let categories: Vec<Category> = serde_json::from_value(json!([
            { "_id": "c1", "name": "Home" },
            { "_id": "c2", "name": "Garden" }
        ]))
        .unwrap();

        assert_eq!(selected_category(&categories, None).unwrap().name, "Home");
        assert_eq!(
            selected_category(&categories, Some("c2")).unwrap().name,
            "Garden"
        );
        assert_eq!(
            selected_category(&categories, Some("missing")).unwrap().name,
            "Home"
        );
        assert!(selected_category(&[], Some("c1")).is_none());
    }
}
