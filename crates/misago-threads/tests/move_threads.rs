use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use misago_hooks::{Action, FieldKind, FieldSpec, Filter, HookError, HookResult, InputModel};
use misago_threads::filters::{
    AuditMoveFilter, NOT_AUTHORIZED, PERMISSION_DENIED, RequireModeratorFilter,
};
use misago_threads::validators::{CATEGORY_CLOSED, CATEGORY_NOT_FOUND, THREAD_NOT_FOUND};
use misago_threads::{
    CategoriesRepository, Category, CleanedMoveThreadsInput, ContextUser, ForumSettings,
    GraphQLContext, InputStage, InputStageOutput, MoveThreadsHooks, MoveThreadsInput,
    MoveThreadsTerminals, Thread, ThreadsRepository,
};
use serde_json::{Value, json};

#[derive(Default)]
struct MemoryForum {
    categories: BTreeMap<i32, Category>,
    threads: Mutex<BTreeMap<i32, Thread>>,
    moves: AtomicUsize,
    fail_moves: bool,
}

impl MemoryForum {
    fn seeded() -> Self {
        let mut forum = Self::default();
        for (id, is_closed) in [(2, false), (5, false), (9, true)] {
            forum.categories.insert(
                id,
                Category {
                    id,
                    name: format!("Category {id}"),
                    slug: format!("category-{id}"),
                    is_closed,
                },
            );
        }
        {
            let mut threads = forum.threads.lock().expect("threads lock");
            for id in 1..=3 {
                threads.insert(id, thread(id, 2));
            }
        }
        forum
    }

    fn category_of(&self, id: i32) -> Option<i32> {
        self.threads
            .lock()
            .expect("threads lock")
            .get(&id)
            .map(|thread| thread.category_id)
    }
}

fn thread(id: i32, category_id: i32) -> Thread {
    let at = Utc
        .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp");
    Thread {
        id,
        category_id,
        first_post_id: None,
        starter_id: Some(1),
        starter_name: "Alice".to_string(),
        last_poster_id: Some(1),
        last_poster_name: "Alice".to_string(),
        title: format!("Thread {id}"),
        slug: format!("thread-{id}"),
        started_at: at,
        last_posted_at: at,
        replies: 0,
        is_closed: false,
        extra: json!({}),
    }
}

#[async_trait]
impl CategoriesRepository for MemoryForum {
    async fn get_category(&self, id: i32) -> anyhow::Result<Option<Category>> {
        Ok(self.categories.get(&id).cloned())
    }
}

#[async_trait]
impl ThreadsRepository for MemoryForum {
    async fn get_threads(&self, ids: &[i32]) -> anyhow::Result<Vec<Thread>> {
        let threads = self.threads.lock().expect("threads lock");
        Ok(ids.iter().filter_map(|id| threads.get(id).cloned()).collect())
    }

    async fn move_threads(&self, ids: &[i32], category_id: i32) -> anyhow::Result<Vec<Thread>> {
        if self.fail_moves {
            anyhow::bail!("database unavailable");
        }
        self.moves.fetch_add(1, Ordering::SeqCst);
        let mut threads = self.threads.lock().expect("threads lock");
        let mut moved = Vec::with_capacity(ids.len());
        for id in ids {
            let thread = threads
                .get_mut(id)
                .ok_or_else(|| anyhow::anyhow!("thread {id} vanished"))?;
            thread.category_id = category_id;
            moved.push(thread.clone());
        }
        Ok(moved)
    }
}

fn context(forum: &Arc<MemoryForum>) -> GraphQLContext {
    GraphQLContext::new(forum.clone(), forum.clone()).with_request_id("req-1")
}

fn moderator() -> ContextUser {
    ContextUser {
        id: 1,
        name: "Moderator".to_string(),
        is_moderator: true,
    }
}

fn member() -> ContextUser {
    ContextUser {
        id: 2,
        name: "Member".to_string(),
        is_moderator: false,
    }
}

fn input(value: Value) -> MoveThreadsInput {
    value.as_object().cloned().expect("object payload")
}

#[tokio::test]
async fn moves_threads_to_category() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mutation = MoveThreadsHooks::new().compile();

    let payload = mutation
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 5, "threads": [1, 2, 3]})),
        )
        .await?;

    assert!(payload.is_ok());
    assert_eq!(
        payload.threads.iter().map(|thread| thread.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(payload.threads.iter().all(|thread| thread.category_id == 5));
    assert_eq!(forum.category_of(2), Some(5));
    assert_eq!(
        serde_json::to_value(&payload.errors).expect("errors serialize"),
        json!([])
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_thread_ids_are_moved_once() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mutation = MoveThreadsHooks::new().compile();

    let payload = mutation
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": "5", "threads": [3, 1, 3]})),
        )
        .await?;

    assert!(payload.is_ok());
    assert_eq!(
        payload.threads.iter().map(|thread| thread.id).collect::<Vec<_>>(),
        vec![3, 1]
    );
    Ok(())
}

#[tokio::test]
async fn missing_category_is_reported_on_field() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mutation = MoveThreadsHooks::new().compile();

    let payload = mutation
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 404, "threads": [1]})),
        )
        .await?;

    assert!(!payload.is_ok());
    assert!(payload.threads.is_empty());
    assert_eq!(payload.errors.codes(), vec![CATEGORY_NOT_FOUND]);
    assert_eq!(payload.errors.get_errors_locations(), vec![Some("category")]);
    assert_eq!(forum.moves.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn closed_category_rejects_members_but_not_moderators() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let validators_only = MoveThreadsHooks::new().compile();
    let payload = input(json!({"category": 9, "threads": [1]}));

    let rejected = validators_only
        .resolve(&context(&forum).with_user(member()), &payload)
        .await?;
    assert_eq!(rejected.errors.codes(), vec![CATEGORY_CLOSED]);

    let accepted = validators_only
        .resolve(&context(&forum).with_user(moderator()), &payload)
        .await?;
    assert!(accepted.is_ok());
    assert_eq!(forum.category_of(1), Some(9));
    Ok(())
}

#[tokio::test]
async fn missing_threads_are_reported_per_item() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mutation = MoveThreadsHooks::new().compile();

    let payload = mutation
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 5, "threads": [1, 77, 2, 78]})),
        )
        .await?;

    assert_eq!(payload.errors.codes(), vec![THREAD_NOT_FOUND, THREAD_NOT_FOUND]);
    assert_eq!(
        payload.errors.get_errors_locations(),
        vec![Some("threads.1"), Some("threads.3")]
    );
    assert_eq!(
        serde_json::to_value(&payload.errors).expect("errors serialize")[0]["location"],
        json!(["threads", "1"])
    );
    assert_eq!(forum.category_of(1), Some(2));
    Ok(())
}

#[tokio::test]
async fn shape_errors_skip_validators_and_action() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mutation = MoveThreadsHooks::new().compile();

    let payload = mutation
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 404, "threads": []})),
        )
        .await?;

    // the unknown category is never looked up: the guard stops the validators
    assert_eq!(payload.errors.codes(), vec!["value_error.list.min_items"]);
    assert_eq!(forum.moves.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn bulk_action_limit_bounds_threads() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mutation = MoveThreadsHooks::new().compile();
    let ctx = context(&forum)
        .with_user(moderator())
        .with_settings(ForumSettings {
            bulk_action_limit: 2,
        });

    let payload = mutation
        .resolve(&ctx, &input(json!({"category": 5, "threads": [1, 2, 3]})))
        .await?;

    assert_eq!(payload.errors.codes(), vec!["value_error.list.max_items"]);
    assert_eq!(payload.errors.get_errors_locations(), vec![Some("threads")]);
    Ok(())
}

struct CountingInput {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Action<GraphQLContext, InputStage, InputStageOutput> for CountingInput {
    async fn call(&self, _ctx: &GraphQLContext, stage: InputStage) -> HookResult<InputStageOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(stage.into_output())
    }
}

fn counting_terminals(calls: &Arc<AtomicUsize>) -> MoveThreadsTerminals {
    MoveThreadsTerminals {
        input: Arc::new(CountingInput {
            calls: Arc::clone(calls),
        }),
        ..MoveThreadsTerminals::default()
    }
}

#[tokio::test]
async fn permission_filter_short_circuits_members() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let calls = Arc::new(AtomicUsize::new(0));
    let mut hooks = MoveThreadsHooks::new();
    hooks.input.append_filter(RequireModeratorFilter);
    let mutation = hooks.compile_with(counting_terminals(&calls));
    let raw = input(json!({"category": 5, "threads": [1, 2, 3]}));

    let (returned, errors) = mutation
        .validate_input(&context(&forum).with_user(member()), &raw)
        .await?;

    assert_eq!(returned, raw);
    assert_eq!(errors.codes(), vec![PERMISSION_DENIED]);
    assert_eq!(errors.get_errors_locations(), vec![None]);
    assert_eq!(
        serde_json::to_value(&errors).expect("errors serialize")[0]["location"],
        json!(["__root__"])
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn permission_filter_rejects_anonymous_users() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mut hooks = MoveThreadsHooks::new();
    hooks.input.append_filter(RequireModeratorFilter);

    let payload = hooks
        .compile()
        .resolve(&context(&forum), &input(json!({"category": 5, "threads": [1]})))
        .await?;

    assert_eq!(payload.errors.codes(), vec![NOT_AUTHORIZED]);
    assert_eq!(forum.moves.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn permission_filter_lets_moderators_through() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let calls = Arc::new(AtomicUsize::new(0));
    let mut hooks = MoveThreadsHooks::new();
    hooks.input.append_filter(RequireModeratorFilter);
    let mutation = hooks.compile_with(counting_terminals(&calls));

    let (_, errors) = mutation
        .validate_input(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 5, "threads": [1]})),
        )
        .await?;

    assert!(errors.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

struct ReasonField;

#[async_trait]
impl Filter<GraphQLContext, (), InputModel> for ReasonField {
    async fn call(
        &self,
        next: &dyn Action<GraphQLContext, (), InputModel>,
        ctx: &GraphQLContext,
        input: (),
    ) -> HookResult<InputModel> {
        let model = next.call(ctx, input).await?;
        Ok(model.with_field(FieldSpec::required("reason", FieldKind::String { max_length: 20 })))
    }
}

struct RequireReason;

#[async_trait]
impl Filter<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>> for RequireReason {
    async fn call(
        &self,
        next: &dyn Action<GraphQLContext, CleanedMoveThreadsInput, Vec<Thread>>,
        ctx: &GraphQLContext,
        input: CleanedMoveThreadsInput,
    ) -> HookResult<Vec<Thread>> {
        assert_eq!(input.extra.get("reason"), Some(&json!("spam")));
        next.call(ctx, input).await
    }
}

#[tokio::test]
async fn input_model_filters_extend_the_payload() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mut hooks = MoveThreadsHooks::new();
    hooks.input_model.append_filter(ReasonField);
    hooks.action.append_filter(RequireReason);
    let mutation = hooks.compile();
    let ctx = context(&forum).with_user(moderator());

    let model = mutation.input_model(&ctx).await?;
    assert!(model.field("reason").is_some());

    let missing = mutation
        .resolve(&ctx, &input(json!({"category": 5, "threads": [1]})))
        .await?;
    assert_eq!(missing.errors.codes(), vec!["value_error.missing"]);

    let moved = mutation
        .resolve(
            &ctx,
            &input(json!({"category": 5, "threads": [1], "reason": "spam"})),
        )
        .await?;
    assert!(moved.is_ok());
    Ok(())
}

#[tokio::test]
async fn audit_filter_passes_results_through() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());
    let mut hooks = MoveThreadsHooks::new();
    hooks.action.append_filter(AuditMoveFilter);

    let payload = hooks
        .compile()
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 5, "threads": [2]})),
        )
        .await?;

    assert_eq!(payload.threads.len(), 1);
    assert_eq!(forum.moves.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn repository_failures_surface_as_faults() {
    let forum = Arc::new(MemoryForum {
        fail_moves: true,
        ..MemoryForum::seeded()
    });
    let mutation = MoveThreadsHooks::new().compile();

    let err = mutation
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 5, "threads": [1]})),
        )
        .await
        .expect_err("move fails");

    assert!(matches!(err, HookError::Collaborator { .. }));
    assert_eq!(err.operation(), "threads.move");
}

#[tokio::test]
async fn empty_hooks_skip_existence_checks() {
    let forum = Arc::new(MemoryForum::seeded());

    let err = MoveThreadsHooks::empty()
        .compile()
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 5, "threads": [99]})),
        )
        .await
        .expect_err("unknown thread reaches the repository");

    assert_eq!(err.operation(), "threads.move");
}

#[tokio::test]
async fn oversized_ids_are_rejected_without_validators() -> HookResult<()> {
    let forum = Arc::new(MemoryForum::seeded());

    let payload = MoveThreadsHooks::empty()
        .compile()
        .resolve(
            &context(&forum).with_user(moderator()),
            &input(json!({"category": 3_000_000_000_i64, "threads": [1]})),
        )
        .await?;

    assert!(payload.threads.is_empty());
    assert_eq!(payload.errors.codes(), vec!["value_error.number.not_le"]);
    assert_eq!(payload.errors.get_errors_locations(), vec![Some("category")]);
    assert_eq!(forum.moves.load(Ordering::SeqCst), 0);
    Ok(())
}
