//! View models shared by the page templates.
//!
//! Templates only see plain strings, numbers and booleans; formatting
//! happens here.

use axum::http::{HeaderMap, header::REFERER};
use axum::response::Redirect;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::types::{Product, ProductSnapshot};
use crate::error::AppError;
use crate::middleware::Visitor;
use crate::providers::{Cart, Favorites, Preferences, StoreError, VisitorStore};
use crate::state::AppState;

// =============================================================================
// Flash messages
// =============================================================================

/// One-shot messages carried in the query string after a redirect.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub notice: Option<String>,
}

/// Redirect to `path` with an `error` message.
#[must_use]
pub fn redirect_error(path: &str, message: &str) -> Redirect {
    redirect_with(path, "error", message)
}

/// Redirect to `path` with a `notice` message.
#[must_use]
pub fn redirect_notice(path: &str, message: &str) -> Redirect {
    redirect_with(path, "notice", message)
}

fn redirect_with(path: &str, param: &str, message: &str) -> Redirect {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!(
        "{path}{separator}{param}={}",
        urlencoding::encode(message)
    ))
}

/// Path (with query) of the page the form was posted from, or `fallback`.
///
/// Only the path of the `Referer` is used, so the redirect never leaves the
/// site.
#[must_use]
pub fn back_to(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| url::Url::parse(referer).ok())
        .map_or_else(
            || fallback.to_string(),
            |url| match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            },
        )
}

// =============================================================================
// Page shell
// =============================================================================

/// A language choice in the header switcher.
#[derive(Debug, Clone)]
pub struct LanguageOption {
    pub code: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Data every page needs for the header: who is signed in, badge counts and
/// preferences.
#[derive(Debug, Clone)]
pub struct Shell {
    pub user_name: Option<String>,
    pub is_admin: bool,
    pub is_seller: bool,
    pub cart_count: usize,
    pub favorites_count: usize,
    pub theme: &'static str,
    pub lang: &'static str,
    pub languages: Vec<LanguageOption>,
}

impl Shell {
    /// Build the shell, loading the visitor's cart for the badge.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails or the backend rejects
    /// the visitor's token.
    pub async fn load(state: &AppState, visitor: &Visitor) -> Result<Self, AppError> {
        let cart = Cart::load(
            visitor.session.clone(),
            state.api().clone(),
            visitor.credentials().cloned(),
        )
        .await?;
        Ok(Self::with_cart(visitor, &cart).await?)
    }

    /// Build the shell around a cart the handler already loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn with_cart<S: VisitorStore>(
        visitor: &Visitor,
        cart: &Cart<S>,
    ) -> Result<Self, StoreError> {
        let favorites = Favorites::load(visitor.session.clone(), visitor.user_id()).await?;
        let preferences = Preferences::load(visitor.session.clone()).await?;
        let language = preferences.language();
        let role = visitor.auth.role();

        Ok(Self {
            user_name: visitor.user().map(|user| user.display_name().to_string()),
            is_admin: role.is_some_and(|r| r.is_admin()),
            is_seller: role.is_some_and(|r| r.is_seller()),
            cart_count: cart.cart_count(),
            favorites_count: favorites.favorites_count(),
            theme: preferences.theme().as_str(),
            lang: language.code(),
            languages: crate::providers::Language::ALL
                .into_iter()
                .map(|option| LanguageOption {
                    code: option.code(),
                    label: option.label(),
                    selected: option == language,
                })
                .collect(),
        })
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product tile in listings.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub out_of_stock: bool,
    pub favorited: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new<S: VisitorStore>(product: &Product, favorites: &Favorites<S>) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: excerpt(&product.description, 120),
            price: product.price.display(),
            image: product.image.clone(),
            category: product
                .category
                .as_ref()
                .and_then(|c| c.name())
                .map(str::to_string),
            out_of_stock: product.is_out_of_stock(),
            favorited: favorites.is_favorited(&product.id),
        }
    }
}

/// A stored product snapshot (favorites, cart lines).
#[derive(Debug, Clone)]
pub struct SnapshotView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image: Option<String>,
}

impl From<&ProductSnapshot> for SnapshotView {
    fn from(product: &ProductSnapshot) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product.price.display(),
            image: product.image.clone(),
        }
    }
}

/// A select option.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

// =============================================================================
// Formatting
// =============================================================================

/// Truncate `text` to at most `max` characters, adding an ellipsis.
#[must_use]
pub fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push('…');
    cut
}

/// Human-readable date, or a dash when unknown.
#[must_use]
pub fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.format("%b %-d, %Y").to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    fn location(redirect: Redirect) -> String {
        redirect.into_response().headers()["location"]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_redirect_appends_message() {
        assert_eq!(
            location(redirect_error("/cart", "Out of stock")),
            "/cart?error=Out%20of%20stock"
        );
        assert_eq!(
            location(redirect_notice("/admin?tab=orders", "Saved")),
            "/admin?tab=orders&notice=Saved"
        );
    }

    #[test]
    fn test_back_to_keeps_only_path() {
        let mut headers = HeaderMap::new();
        assert_eq!(back_to(&headers, "/"), "/");

        headers.insert(
            REFERER,
            "https://shop.example/products?q=lamp".parse().unwrap(),
        );
        assert_eq!(back_to(&headers, "/"), "/products?q=lamp");

        headers.insert(REFERER, "https://evil.example/phish".parse().unwrap());
        assert_eq!(back_to(&headers, "/"), "/phish");
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef", 3), "abc…");
    }

    #[test]
    fn test_format_date() {
        let date = DateTime::parse_from_rfc3339("2024-03-05T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_date(Some(date)), "Mar 5, 2024");
        assert_eq!(format_date(None), "-");
    }
}
