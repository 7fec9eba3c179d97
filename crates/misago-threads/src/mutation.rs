//! The composed move-threads operation.

use std::sync::Arc;

use misago_hooks::{ErrorsList, HookChain, HookResult, InputModel, ValidatorsRegistry};
use serde::Serialize;
use tracing::{debug, info};

use crate::context::GraphQLContext;
use crate::hooks::{CleanedMoveThreadsInput, InputStage, InputStageOutput, MoveThreadsInput};
use crate::model::Thread;

/// Result handed back to the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoveThreadsPayload {
    /// Moved threads, in request order; empty when the move was rejected.
    pub threads: Vec<Thread>,
    /// Validation errors; non-empty means nothing was moved.
    pub errors: ErrorsList,
}

impl MoveThreadsPayload {
    /// Payload for a rejected move.
    #[must_use]
    pub const fn rejected(errors: ErrorsList) -> Self {
        Self {
            threads: Vec::new(),
            errors,
        }
    }

    /// Returns `true` when the move went through.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Pre-built move-threads pipelines, shared across requests.
#[derive(Clone)]
pub struct MoveThreadsMutation {
    input: HookChain<GraphQLContext, InputStage, InputStageOutput>,
    input_model: HookChain<GraphQLContext, (), InputModel>,
    action: HookChain<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>>,
    validators: Arc<ValidatorsRegistry<GraphQLContext>>,
}

impl std::fmt::Debug for MoveThreadsMutation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MoveThreadsMutation")
            .field("input", &self.input)
            .field("input_model", &self.input_model)
            .field("action", &self.action)
            .field("validators", &self.validators)
            .finish()
    }
}

impl MoveThreadsMutation {
    pub(crate) fn new(
        input: HookChain<GraphQLContext, InputStage, InputStageOutput>,
        input_model: HookChain<GraphQLContext, (), InputModel>,
        action: HookChain<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>>,
        validators: Arc<ValidatorsRegistry<GraphQLContext>>,
    ) -> Self {
        Self {
            input,
            input_model,
            action,
            validators,
        }
    }

    /// Resolve the input model through its filters.
    ///
    /// # Errors
    ///
    /// Propagates faults raised by the input model filters.
    pub async fn input_model(&self, ctx: &GraphQLContext) -> HookResult<InputModel> {
        self.input_model.call(ctx, ()).await
    }

    /// Check shape, then run the input chain.
    ///
    /// Returns the cleaned input and every error found.
    ///
    /// # Errors
    ///
    /// Propagates faults raised by filters or validators.
    pub async fn validate_input(
        &self,
        ctx: &GraphQLContext,
        input: &MoveThreadsInput,
    ) -> HookResult<InputStageOutput> {
        let model = self.input_model(ctx).await?;
        let (cleaned, errors) = model.clean(input);
        debug!(
            model = model.name(),
            shape_errors = errors.len(),
            "input model applied"
        );
        let stage = InputStage {
            validators: Arc::clone(&self.validators),
            input: cleaned,
            errors,
        };
        self.input.call(ctx, stage).await
    }

    /// Run the full operation: validation, then the move when no errors were found.
    ///
    /// # Errors
    ///
    /// Propagates faults raised by any stage; validation failures are reported in
    /// the payload instead.
    pub async fn resolve(
        &self,
        ctx: &GraphQLContext,
        input: &MoveThreadsInput,
    ) -> HookResult<MoveThreadsPayload> {
        let (cleaned, errors) = self.validate_input(ctx, input).await?;
        if errors.has_errors() {
            info!(
                request_id = ctx.request_id(),
                errors = errors.len(),
                "move threads rejected"
            );
            return Ok(MoveThreadsPayload::rejected(errors));
        }

        let cleaned = CleanedMoveThreadsInput::from_input(cleaned)?;
        let threads = self.action.call(ctx, cleaned).await?;
        Ok(MoveThreadsPayload { threads, errors })
    }
}
