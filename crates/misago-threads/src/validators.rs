//! Built-in field validators for the move-threads input.

use std::collections::HashSet;

use async_trait::async_trait;
use misago_hooks::{AsyncValidator, HookError, HookResult, Validation, ValidationError};
use serde_json::Value;

use crate::context::GraphQLContext;
use crate::model::Category;

/// Category does not exist (or the id cannot exist).
pub const CATEGORY_NOT_FOUND: &str = "category_error.not_found";
/// Category is closed and the user is not a moderator.
pub const CATEGORY_CLOSED: &str = "category_error.closed";
/// Thread does not exist (or the id cannot exist).
pub const THREAD_NOT_FOUND: &str = "thread_error.not_found";

fn as_id(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|id| i32::try_from(id).ok())
}

async fn load_category(ctx: &GraphQLContext, value: &Value) -> HookResult<Option<Category>> {
    let Some(id) = as_id(value) else {
        return Ok(None);
    };
    ctx.categories()
        .get_category(id)
        .await
        .map_err(|err| HookError::collaborator("categories.get", err))
}

/// Rejects category ids that do not resolve to a category.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryExistsValidator;

#[async_trait]
impl AsyncValidator<GraphQLContext> for CategoryExistsValidator {
    async fn validate(&self, ctx: &GraphQLContext, value: &Value) -> HookResult<Validation> {
        Ok(match load_category(ctx, value).await? {
            Some(_) => Validation::Valid,
            None => Validation::invalid(CATEGORY_NOT_FOUND, "category could not be found"),
        })
    }
}

/// Rejects closed categories unless the acting user is a moderator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryIsOpenValidator;

#[async_trait]
impl AsyncValidator<GraphQLContext> for CategoryIsOpenValidator {
    async fn validate(&self, ctx: &GraphQLContext, value: &Value) -> HookResult<Validation> {
        if ctx.is_moderator() {
            return Ok(Validation::Valid);
        }
        Ok(match load_category(ctx, value).await? {
            Some(category) if category.is_closed => {
                Validation::invalid(CATEGORY_CLOSED, "category is closed")
            }
            _ => Validation::Valid,
        })
    }
}

/// Rejects thread ids that do not resolve to threads, one error per missing item.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadsExistValidator;

#[async_trait]
impl AsyncValidator<GraphQLContext> for ThreadsExistValidator {
    async fn validate(&self, ctx: &GraphQLContext, value: &Value) -> HookResult<Validation> {
        let Some(items) = value.as_array() else {
            return Ok(Validation::Valid);
        };
        let ids: Vec<Option<i32>> = items.iter().map(as_id).collect();
        let lookup: Vec<i32> = ids.iter().flatten().copied().collect();

        let found: HashSet<i32> = if lookup.is_empty() {
            HashSet::new()
        } else {
            ctx.threads()
                .get_threads(&lookup)
                .await
                .map_err(|err| HookError::collaborator("threads.get", err))?
                .into_iter()
                .map(|thread| thread.id)
                .collect()
        };

        let failures: Vec<ValidationError> = ids
            .iter()
            .enumerate()
            .filter(|(_, id)| id.is_none_or(|id| !found.contains(&id)))
            .map(|(index, _)| {
                ValidationError::at(index.to_string(), THREAD_NOT_FOUND, "thread could not be found")
            })
            .collect();

        Ok(if failures.is_empty() {
            Validation::Valid
        } else {
            Validation::Invalid(failures)
        })
    }
}
