//! Category (blog post) repository implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use inkpost_core::error::{AppError, ErrorKind};
use inkpost_core::result::AppResult;
use inkpost_core::types::id::{CategoryId, ItemId, UserId};
use inkpost_entity::category::{Category, DigestEntry, Item};

/// Read-only repository over published posts.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: CategoryId,
    title: String,
    text: String,
    publish_date: DateTime<Utc>,
    user_id: UserId,
    author: String,
}

#[derive(Debug, FromRow)]
struct TagRow {
    category_id: CategoryId,
    id: ItemId,
    title: String,
}

impl CategoryRepository {
    /// Create a new category repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Posts with `from <= publish_date < until`, oldest first, with author
    /// and tags attached.
    pub async fn find_published_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<DigestEntry>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT c.id, c.title, c.text, c.publish_date, c.user_id, u.username AS author \
             FROM categories c JOIN users u ON u.id = c.user_id \
             WHERE c.publish_date >= $1 AND c.publish_date < $2 \
             ORDER BY c.publish_date ASC",
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to query published posts", e)
        })?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id.into_uuid()).collect();
        let tags = sqlx::query_as::<_, TagRow>(
            "SELECT ci.category_id, i.id, i.title \
             FROM category_items ci JOIN items i ON i.id = ci.item_id \
             WHERE ci.category_id = ANY($1) ORDER BY i.title ASC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to query post tags", e))?;

        let mut tags_by_post: HashMap<CategoryId, Vec<Item>> = HashMap::new();
        for tag in tags {
            tags_by_post.entry(tag.category_id).or_default().push(Item {
                id: tag.id,
                title: tag.title,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| DigestEntry {
                tags: tags_by_post.remove(&row.id).unwrap_or_default(),
                author: row.author,
                category: Category {
                    id: row.id,
                    title: row.title,
                    text: row.text,
                    publish_date: row.publish_date,
                    user_id: row.user_id,
                },
            })
            .collect())
    }
}
