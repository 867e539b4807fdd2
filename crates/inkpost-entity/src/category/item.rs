//! Tag entity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use inkpost_core::types::id::ItemId;

/// A keyword attached to one or more Categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Item {
    /// Unique tag identifier.
    pub id: ItemId,
    /// Tag title, unique across the blog.
    pub title: String,
}
