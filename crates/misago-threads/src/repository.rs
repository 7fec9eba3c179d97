//! Persistence traits implemented by the data layer.

use async_trait::async_trait;

use crate::model::{Category, Thread};

/// Read access to forum categories.
#[async_trait]
pub trait CategoriesRepository: Send + Sync {
    /// Fetch a category by id.
    async fn get_category(&self, id: i32) -> anyhow::Result<Option<Category>>;
}

/// Read/write access to forum threads.
#[async_trait]
pub trait ThreadsRepository: Send + Sync {
    /// Fetch the threads that exist among `ids`, in no particular order.
    async fn get_threads(&self, ids: &[i32]) -> anyhow::Result<Vec<Thread>>;

    /// Move `ids` into `category_id`, returning the updated threads in `ids` order.
    ///
    /// Implementations apply the move atomically.
    async fn move_threads(&self, ids: &[i32], category_id: i32) -> anyhow::Result<Vec<Thread>>;
}
