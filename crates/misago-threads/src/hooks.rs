//! Extension points of the move-threads operation.
//!
//! # Design
//! - Three hooks: `input` (validation pipeline), `input_model` (schema resolution)
//!   and `action` (the move itself). Deployments register filters at startup.
//! - [`MoveThreadsHooks::compile`] folds every hook once; requests reuse the chains.
//! - The input chain is guarded: its terminal action never runs while errors exist.

use std::sync::Arc;

use misago_hooks::{
    Action, ErrorsList, Filter, FilterHook, Guard, HookChain, HookError, HookResult, InputModel,
    ValidatorsRegistry,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::actions::{DefaultInputModelAction, MoveThreadsToCategory, ValidateInputAction};
use crate::context::GraphQLContext;
use crate::model::Thread;
use crate::mutation::MoveThreadsMutation;
use crate::validators::{CategoryExistsValidator, CategoryIsOpenValidator, ThreadsExistValidator};

/// Raw, not yet validated request payload.
pub type MoveThreadsInput = Map<String, Value>;

/// Output of the input stage: the (possibly normalised) input and the errors found.
pub type InputStageOutput = (MoveThreadsInput, ErrorsList);

/// Input-stage action: validates the payload.
pub type MoveThreadsInputAction = dyn Action<GraphQLContext, InputStage, InputStageOutput>;
/// Input-stage filter.
pub type MoveThreadsInputFilter = dyn Filter<GraphQLContext, InputStage, InputStageOutput>;
/// Input model action: resolves the expected payload shape.
pub type MoveThreadsInputModelAction = dyn Action<GraphQLContext, (), InputModel>;
/// Input model filter: extends the expected payload shape.
pub type MoveThreadsInputModelFilter = dyn Filter<GraphQLContext, (), InputModel>;
/// Top-level action: moves validated threads.
pub type MoveThreadsAction = dyn Action<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>>;
/// Top-level filter.
pub type MoveThreadsFilter = dyn Filter<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>>;

/// Payload travelling through the input stage.
#[derive(Debug, Clone)]
pub struct InputStage {
    /// Validators to apply, keyed by field.
    pub validators: Arc<ValidatorsRegistry<GraphQLContext>>,
    /// Request payload.
    pub input: MoveThreadsInput,
    /// Errors accumulated so far.
    pub errors: ErrorsList,
}

impl InputStage {
    /// Split the stage into the stage output, discarding the validators.
    #[must_use]
    pub fn into_output(self) -> InputStageOutput {
        (self.input, self.errors)
    }
}

/// Validated payload narrowed into a typed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedMoveThreadsInput {
    /// Destination category.
    pub category: i32,
    /// Threads to move, unique, in request order.
    pub threads: Vec<i32>,
    /// Fields contributed by input model filters.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CleanedMoveThreadsInput {
    /// Narrow a validated payload.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Payload`] when the payload does not match the record.
    pub fn from_input(input: MoveThreadsInput) -> HookResult<Self> {
        serde_json::from_value(Value::Object(input)).map_err(|source| HookError::Payload {
            operation: "move_threads.narrow_input",
            source,
        })
    }
}

/// Guard refusing to run the input action once errors were recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorsGuard;

impl Guard<InputStage, InputStageOutput> for ErrorsGuard {
    fn check(&self, stage: InputStage) -> Result<InputStage, InputStageOutput> {
        if stage.errors.has_errors() {
            Err(stage.into_output())
        } else {
            Ok(stage)
        }
    }
}

/// Terminal actions wrapped by the hooks.
#[derive(Clone)]
pub struct MoveThreadsTerminals {
    /// Innermost input-stage action.
    pub input: Arc<MoveThreadsInputAction>,
    /// Innermost input model action.
    pub input_model: Arc<MoveThreadsInputModelAction>,
    /// Innermost move action.
    pub action: Arc<MoveThreadsAction>,
}

impl Default for MoveThreadsTerminals {
    fn default() -> Self {
        Self {
            input: Arc::new(ValidateInputAction),
            input_model: Arc::new(DefaultInputModelAction),
            action: Arc::new(MoveThreadsToCategory),
        }
    }
}

/// Filter registries and validators for the move-threads operation.
#[derive(Debug)]
pub struct MoveThreadsHooks {
    /// Filters around input validation.
    pub input: FilterHook<GraphQLContext, InputStage, InputStageOutput>,
    /// Filters around input model resolution.
    pub input_model: FilterHook<GraphQLContext, (), InputModel>,
    /// Filters around the move itself.
    pub action: FilterHook<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>>,
    /// Per-field validators applied by the input action.
    pub validators: ValidatorsRegistry<GraphQLContext>,
}

impl Default for MoveThreadsHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveThreadsHooks {
    /// Hooks without filters and with the built-in validators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: FilterHook::new("move_threads_input"),
            input_model: FilterHook::new("move_threads_input_model"),
            action: FilterHook::new("move_threads"),
            validators: default_validators(),
        }
    }

    /// Hooks without filters or validators.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            validators: ValidatorsRegistry::new(),
            ..Self::new()
        }
    }

    /// Fold every hook around the built-in terminal actions.
    #[must_use]
    pub fn compile(&self) -> MoveThreadsMutation {
        self.compile_with(MoveThreadsTerminals::default())
    }

    /// Fold every hook around the supplied terminal actions.
    #[must_use]
    pub fn compile_with(&self, terminals: MoveThreadsTerminals) -> MoveThreadsMutation {
        MoveThreadsMutation::new(
            self.input_chain(terminals.input),
            self.input_model.build(terminals.input_model),
            self.action.build(terminals.action),
            Arc::new(self.validators.clone()),
        )
    }

    /// Build the guarded input chain around `terminal`.
    #[must_use]
    pub fn input_chain(
        &self,
        terminal: Arc<MoveThreadsInputAction>,
    ) -> HookChain<GraphQLContext, InputStage, InputStageOutput> {
        self.input.build_guarded(terminal, Arc::new(ErrorsGuard))
    }
}

/// Validators applied to every move unless a deployment replaces them.
#[must_use]
pub fn default_validators() -> ValidatorsRegistry<GraphQLContext> {
    ValidatorsRegistry::new()
        .with("category", CategoryExistsValidator)
        .with("category", CategoryIsOpenValidator)
        .with("threads", ThreadsExistValidator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cleaned_input_keeps_plugin_fields() {
        let input = json!({"category": 5, "threads": [1, 2], "reason": "spam"})
            .as_object()
            .cloned()
            .expect("object payload");

        let cleaned = CleanedMoveThreadsInput::from_input(input).expect("payload narrows");
        assert_eq!(cleaned.category, 5);
        assert_eq!(cleaned.threads, vec![1, 2]);
        assert_eq!(cleaned.extra.get("reason"), Some(&json!("spam")));
    }

    #[test]
    fn narrowing_rejects_mismatched_payloads() {
        let input = json!({"category": "five"})
            .as_object()
            .cloned()
            .expect("object payload");

        let err = CleanedMoveThreadsInput::from_input(input).expect_err("payload mismatch");
        assert_eq!(err.operation(), "move_threads.narrow_input");
    }

    #[test]
    fn errors_guard_blocks_only_when_errors_exist() {
        let validators = Arc::new(ValidatorsRegistry::new());
        let clean = InputStage {
            validators: Arc::clone(&validators),
            input: Map::new(),
            errors: ErrorsList::new(),
        };
        assert!(ErrorsGuard.check(clean).is_ok());

        let mut errors = ErrorsList::new();
        errors.add_root_error("permission_denied", "denied");
        let blocked = InputStage {
            validators,
            input: Map::new(),
            errors,
        };
        let (_, errors) = ErrorsGuard.check(blocked).expect_err("guard blocks");
        assert_eq!(errors.codes(), vec!["permission_denied"]);
    }

    #[test]
    fn new_hooks_carry_default_validators() {
        let hooks = MoveThreadsHooks::new();
        assert!(hooks.input.is_empty());
        assert!(hooks.input_model.is_empty());
        assert!(hooks.action.is_empty());
        assert_eq!(
            hooks.validators.fields().collect::<Vec<_>>(),
            vec!["category", "threads"]
        );
        assert_eq!(hooks.validators.validators_for("category").len(), 2);
        assert_eq!(MoveThreadsHooks::empty().validators.fields().count(), 0);
    }
}
