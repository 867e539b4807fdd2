//! Category (blog post) entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use inkpost_core::types::id::{CategoryId, UserId};

use super::item::Item;

/// A published blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    /// Unique post identifier.
    pub id: CategoryId,
    /// Post title.
    pub title: String,
    /// Post body (HTML as authored).
    pub text: String,
    /// When the post was published.
    pub publish_date: DateTime<Utc>,
    /// Author.
    pub user_id: UserId,
}

/// A post prepared for the weekly digest: the row plus its author name and
/// tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestEntry {
    /// The post.
    pub category: Category,
    /// Author username.
    pub author: String,
    /// Tags attached to the post.
    pub tags: Vec<Item>,
}
