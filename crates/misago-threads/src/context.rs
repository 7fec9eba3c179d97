//! Request-scoped context handed to every pipeline stage.
//!
//! # Design
//! - Read-only capability bag: stages reach repositories, the acting user and
//!   forum settings through it, but never mutate it.
//! - Cheap to clone; collaborators live behind `Arc`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::repository::{CategoriesRepository, ThreadsRepository};

/// Default cap on the number of items accepted by bulk moderation actions.
pub const DEFAULT_BULK_ACTION_LIMIT: usize = 40;

/// Authenticated user performing the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUser {
    /// User id.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Whether the user holds moderation rights.
    pub is_moderator: bool,
}

/// Forum-wide settings consulted by the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumSettings {
    /// Maximum number of threads a single bulk action may touch.
    pub bulk_action_limit: usize,
}

impl Default for ForumSettings {
    fn default() -> Self {
        Self {
            bulk_action_limit: DEFAULT_BULK_ACTION_LIMIT,
        }
    }
}

/// Request context shared by the stages of one invocation.
#[derive(Clone)]
pub struct GraphQLContext {
    request_id: String,
    user: Option<ContextUser>,
    locale: String,
    settings: ForumSettings,
    threads: Arc<dyn ThreadsRepository>,
    categories: Arc<dyn CategoriesRepository>,
}

impl fmt::Debug for GraphQLContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GraphQLContext")
            .field("request_id", &self.request_id)
            .field("user", &self.user)
            .field("locale", &self.locale)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl GraphQLContext {
    /// Anonymous context backed by the supplied repositories.
    #[must_use]
    pub fn new(
        threads: Arc<dyn ThreadsRepository>,
        categories: Arc<dyn CategoriesRepository>,
    ) -> Self {
        Self {
            request_id: String::new(),
            user: None,
            locale: "en".to_string(),
            settings: ForumSettings::default(),
            threads,
            categories,
        }
    }

    /// Attach the acting user.
    #[must_use]
    pub fn with_user(mut self, user: ContextUser) -> Self {
        self.user = Some(user);
        self
    }

    /// Attach the request identifier used in logs.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Override the request locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Override forum settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ForumSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Request identifier (empty when not supplied).
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Acting user, if authenticated.
    #[must_use]
    pub const fn user(&self) -> Option<&ContextUser> {
        self.user.as_ref()
    }

    /// Returns `true` when the acting user is a moderator.
    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.user.as_ref().is_some_and(|user| user.is_moderator)
    }

    /// Request locale.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Forum settings in effect for the request.
    #[must_use]
    pub const fn settings(&self) -> &ForumSettings {
        &self.settings
    }

    /// Thread persistence.
    #[must_use]
    pub fn threads(&self) -> &dyn ThreadsRepository {
        self.threads.as_ref()
    }

    /// Category persistence.
    #[must_use]
    pub fn categories(&self) -> &dyn CategoriesRepository {
        self.categories.as_ref()
    }
}
