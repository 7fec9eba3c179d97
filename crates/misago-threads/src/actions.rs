//! Built-in terminal actions of the move-threads hooks.

use async_trait::async_trait;
use misago_hooks::{Action, FieldKind, FieldSpec, HookError, HookResult, InputModel};
use tracing::debug;

use crate::context::GraphQLContext;
use crate::hooks::{CleanedMoveThreadsInput, InputStage, InputStageOutput};
use crate::model::Thread;

/// Name of the input model resolved by [`DefaultInputModelAction`].
pub const MOVE_THREADS_INPUT_MODEL: &str = "MoveThreadsInputModel";

/// Runs the per-field validators carried by the input stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateInputAction;

#[async_trait]
impl Action<GraphQLContext, InputStage, InputStageOutput> for ValidateInputAction {
    async fn call(&self, ctx: &GraphQLContext, stage: InputStage) -> HookResult<InputStageOutput> {
        let InputStage {
            validators,
            input,
            errors,
        } = stage;
        validators.validate(ctx, input, errors).await
    }
}

/// Declares `category` and `threads`, bounded by the bulk action limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInputModelAction;

#[async_trait]
impl Action<GraphQLContext, (), InputModel> for DefaultInputModelAction {
    async fn call(&self, ctx: &GraphQLContext, _input: ()) -> HookResult<InputModel> {
        Ok(move_threads_input_model(ctx.settings().bulk_action_limit))
    }
}

/// Input model accepting up to `bulk_action_limit` thread ids.
#[must_use]
pub fn move_threads_input_model(bulk_action_limit: usize) -> InputModel {
    InputModel::new(MOVE_THREADS_INPUT_MODEL)
        .with_field(FieldSpec::required("category", FieldKind::PositiveInt))
        .with_field(FieldSpec::required(
            "threads",
            FieldKind::PositiveIntList {
                min_items: 1,
                max_items: bulk_action_limit,
            },
        ))
}

/// Moves the validated threads through the thread repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveThreadsToCategory;

#[async_trait]
impl Action<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>> for MoveThreadsToCategory {
    async fn call(
        &self,
        ctx: &GraphQLContext,
        input: CleanedMoveThreadsInput,
    ) -> HookResult<Vec<Thread>> {
        debug!(
            category = input.category,
            threads = input.threads.len(),
            "moving threads"
        );
        ctx.threads()
            .move_threads(&input.threads, input.category)
            .await
            .map_err(|err| HookError::collaborator("threads.move", err))
    }
}
