//! Postgres-backed thread and category repositories.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use misago_threads::{CategoriesRepository, Category, Thread, ThreadsRepository};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::error::{Result, map_query_err};

const SELECT_CATEGORY: &str = r"
    SELECT id, name, slug, is_closed
    FROM misago_categories
    WHERE id = $1
";

const SELECT_THREADS: &str = r"
    SELECT id, category_id, first_post_id, starter_id, starter_name,
           last_poster_id, last_poster_name, title, slug,
           started_at, last_posted_at, replies, is_closed, extra
    FROM misago_threads
    WHERE id = ANY($1)
";

const MOVE_THREADS: &str = r"
    UPDATE misago_threads
    SET category_id = $2
    WHERE id = ANY($1)
    RETURNING id, category_id, first_post_id, starter_id, starter_name,
              last_poster_id, last_poster_name, title, slug,
              started_at, last_posted_at, replies, is_closed, extra
";

const MOVE_POSTS: &str = r"
    UPDATE misago_posts
    SET category_id = $2
    WHERE thread_id = ANY($1)
";

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    slug: String,
    is_closed: bool,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            is_closed: row.is_closed,
        }
    }
}

#[derive(Debug, FromRow)]
struct ThreadRow {
    id: i32,
    category_id: i32,
    first_post_id: Option<i32>,
    starter_id: Option<i32>,
    starter_name: String,
    last_poster_id: Option<i32>,
    last_poster_name: String,
    title: String,
    slug: String,
    started_at: NaiveDateTime,
    last_posted_at: NaiveDateTime,
    replies: i32,
    is_closed: bool,
    extra: Value,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            first_post_id: row.first_post_id,
            starter_id: row.starter_id,
            starter_name: row.starter_name,
            last_poster_id: row.last_poster_id,
            last_poster_name: row.last_poster_name,
            title: row.title,
            slug: row.slug,
            // columns hold naive UTC timestamps
            started_at: row.started_at.and_utc(),
            last_posted_at: row.last_posted_at.and_utc(),
            replies: row.replies,
            is_closed: row.is_closed,
            extra: row.extra,
        }
    }
}

/// Repository over `misago_categories`, `misago_threads` and `misago_posts`.
#[derive(Clone, Debug)]
pub struct PgForumStore {
    pool: PgPool,
}

impl PgForumStore {
    /// Wrap an existing pool; migrations are expected to be applied.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch a category by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn fetch_category(&self, id: i32) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(SELECT_CATEGORY)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("categories.get"))?;
        Ok(row.map(Category::from))
    }

    /// Fetch the threads that exist among `ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn fetch_threads(&self, ids: &[i32]) -> Result<Vec<Thread>> {
        let rows = sqlx::query_as::<_, ThreadRow>(SELECT_THREADS)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("threads.get"))?;
        Ok(rows.into_iter().map(Thread::from).collect())
    }

    /// Move threads and their posts to `category_id` in one transaction.
    ///
    /// Returns the moved threads in `ids` order; unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is moved in that case.
    pub async fn relocate_threads(&self, ids: &[i32], category_id: i32) -> Result<Vec<Thread>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_query_err("threads.move.begin"))?;

        let rows = sqlx::query_as::<_, ThreadRow>(MOVE_THREADS)
            .bind(ids)
            .bind(category_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(map_query_err("threads.move"))?;
        let posts = sqlx::query(MOVE_POSTS)
            .bind(ids)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .map_err(map_query_err("posts.move"))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(map_query_err("threads.move.commit"))?;
        debug!(
            category_id,
            threads = rows.len(),
            posts,
            "threads relocated"
        );

        let mut moved: HashMap<i32, Thread> = rows
            .into_iter()
            .map(|row| (row.id, Thread::from(row)))
            .collect();
        Ok(ids.iter().filter_map(|id| moved.remove(id)).collect())
    }
}

#[async_trait]
impl CategoriesRepository for PgForumStore {
    async fn get_category(&self, id: i32) -> anyhow::Result<Option<Category>> {
        Ok(self.fetch_category(id).await?)
    }
}

#[async_trait]
impl ThreadsRepository for PgForumStore {
    async fn get_threads(&self, ids: &[i32]) -> anyhow::Result<Vec<Thread>> {
        Ok(self.fetch_threads(ids).await?)
    }

    async fn move_threads(&self, ids: &[i32], category_id: i32) -> anyhow::Result<Vec<Thread>> {
        Ok(self.relocate_threads(ids, category_id).await?)
    }
}
