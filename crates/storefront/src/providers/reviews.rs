//! Visitor-local product reviews.
//!
//! Reviews are kept in the visitor store under `comments_<productId>`,
//! newest first. They are not shared with other visitors.

use bazaar_core::ProductId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{StoreError, VisitorStore, keys, read_json, write_json};

/// Lowest and highest star rating.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// A single review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub author: String,
    pub text: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

/// Errors from adding a review.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Review text cannot be empty")]
    EmptyText,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Review access over one visitor store.
pub struct Reviews<S> {
    store: S,
}

impl<S: VisitorStore> Reviews<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn reviews(&self, product_id: &ProductId) -> Result<Vec<Review>, StoreError> {
        Ok(read_json(&self.store, &keys::comments(product_id))
            .await?
            .unwrap_or_default())
    }

    /// Add a review. The rating is clamped to 1..=5; blank authors become
    /// "Guest".
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::EmptyText` for blank text, or a store error.
    pub async fn add_review(
        &self,
        product_id: &ProductId,
        author: &str,
        text: &str,
        rating: u8,
    ) -> Result<Review, ReviewError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ReviewError::EmptyText);
        }

        let author = author.trim();
        let review = Review {
            author: if author.is_empty() { "Guest" } else { author }.to_string(),
            text: text.to_string(),
            rating: rating.clamp(*RATING_RANGE.start(), *RATING_RANGE.end()),
            created_at: Utc::now(),
        };

        let mut reviews = self.reviews(product_id).await?;
        reviews.insert(0, review.clone());
        write_json(&self.store, &keys::comments(product_id), &reviews).await?;
        Ok(review)
    }

    /// Mean rating rounded to one decimal, `None` without reviews.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn average_rating(&self, product_id: &ProductId) -> Result<Option<f64>, StoreError> {
        Ok(average(&self.reviews(product_id).await?))
    }
}

/// Mean rating of `reviews` rounded to one decimal.
#[must_use]
pub fn average(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    let count = u32::try_from(reviews.len()).ok()?;
    let mean = f64::from(total) / f64::from(count);
    Some((mean * 10.0).round() / 10.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::providers::InMemoryStore;

    #[tokio::test]
    async fn test_add_review_clamps_and_prepends() {
        let reviews = Reviews::new(InMemoryStore::new());
        let lamp = ProductId::new("lamp");

        reviews.add_review(&lamp, "ada", "Bright", 9).await.unwrap();
        reviews.add_review(&lamp, "  ", "Dim", 0).await.unwrap();

        let list = reviews.reviews(&lamp).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].text, "Dim");
        assert_eq!(list[0].author, "Guest");
        assert_eq!(list[0].rating, 1);
        assert_eq!(list[1].rating, 5);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let reviews = Reviews::new(InMemoryStore::new());
        let err = reviews
            .add_review(&ProductId::new("lamp"), "ada", "   ", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::EmptyText));
    }

    #[tokio::test]
    async fn test_average_rating_rounds_to_one_decimal() {
        let reviews = Reviews::new(InMemoryStore::new());
        let lamp = ProductId::new("lamp");
        assert_eq!(reviews.average_rating(&lamp).await.unwrap(), None);

        for rating in [5, 4, 4] {
            reviews.add_review(&lamp, "ada", "ok", rating).await.unwrap();
        }
        assert_eq!(reviews.average_rating(&lamp).await.unwrap(), Some(4.3));
    }
}
