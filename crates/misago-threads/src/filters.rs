//! Built-in filters for the move-threads hooks.

use async_trait::async_trait;
use misago_hooks::{Action, Filter, HookResult};
use tracing::{info, warn};

use crate::context::GraphQLContext;
use crate::hooks::{CleanedMoveThreadsInput, InputStage, InputStageOutput};
use crate::model::Thread;

/// Anonymous user attempted the operation.
pub const NOT_AUTHORIZED: &str = "auth_error.not_authorized";
/// Authenticated user lacks moderation rights.
pub const PERMISSION_DENIED: &str = "permission_denied";

/// Short-circuits the input stage unless the acting user is a moderator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireModeratorFilter;

#[async_trait]
impl Filter<GraphQLContext, InputStage, InputStageOutput> for RequireModeratorFilter {
    async fn call(
        &self,
        next: &dyn Action<GraphQLContext, InputStage, InputStageOutput>,
        ctx: &GraphQLContext,
        stage: InputStage,
    ) -> HookResult<InputStageOutput> {
        let (code, message) = match ctx.user() {
            Some(user) if user.is_moderator => return next.call(ctx, stage).await,
            Some(_) => (PERMISSION_DENIED, "moderator rights are required to move threads"),
            None => (NOT_AUTHORIZED, "authorization is required"),
        };
        warn!(
            request_id = ctx.request_id(),
            code, "move threads rejected before validation"
        );
        let InputStage {
            input, mut errors, ..
        } = stage;
        errors.add_root_error(code, message);
        Ok((input, errors))
    }

    fn name(&self) -> &'static str {
        "require_moderator"
    }
}

/// Records who moved which threads where.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditMoveFilter;

#[async_trait]
impl Filter<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>> for AuditMoveFilter {
    async fn call(
        &self,
        next: &dyn Action<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>>,
        ctx: &GraphQLContext,
        input: CleanedMoveThreadsInput,
    ) -> HookResult<Vec<Thread>> {
        let category = input.category;
        let requested = input.threads.len();
        let threads = next.call(ctx, input).await?;
        info!(
            request_id = ctx.request_id(),
            user_id = ctx.user().map(|user| user.id),
            category,
            requested,
            moved = threads.len(),
            "threads moved"
        );
        Ok(threads)
    }

    fn name(&self) -> &'static str {
        "audit_move"
    }
}
