//! Action/filter composition.
//!
//! # Design
//! - An [`Action`] is the innermost unit of work, or an already composed chain.
//! - A [`Filter`] wraps the next stage and calls it zero (short-circuit) or one time.
//! - [`FilterHook`] keeps filters in registration order and folds them right to left
//!   around the terminal action once, so the first registered filter is outermost.
//! - A [`Guard`] sits directly in front of the terminal action and refuses to call it
//!   when upstream stages left blocking errors behind.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::HookResult;

/// Unit of work invoked with a request context and an input payload.
#[async_trait]
pub trait Action<C, I, O>: Send + Sync {
    /// Run the action.
    async fn call(&self, ctx: &C, input: I) -> HookResult<O>;
}

/// Middleware-like wrapper around the next stage of a pipeline.
#[async_trait]
pub trait Filter<C, I, O>: Send + Sync {
    /// Run the filter; implementations delegate to `next` at most once.
    async fn call(&self, next: &dyn Action<C, I, O>, ctx: &C, input: I) -> HookResult<O>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Pre-check executed right before the terminal action.
///
/// Returning `Err(output)` short-circuits the chain with `output`.
pub trait Guard<I, O>: Send + Sync {
    /// Inspect the input about to reach the terminal action.
    ///
    /// # Errors
    ///
    /// Returns the output to report instead of running the terminal action.
    fn check(&self, input: I) -> Result<I, O>;
}

struct Wrapped<C, I, O> {
    filter: Arc<dyn Filter<C, I, O>>,
    next: Arc<dyn Action<C, I, O>>,
}

#[async_trait]
impl<C, I, O> Action<C, I, O> for Wrapped<C, I, O>
where
    C: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    async fn call(&self, ctx: &C, input: I) -> HookResult<O> {
        debug!(filter = self.filter.name(), "entering hook filter");
        self.filter.call(self.next.as_ref(), ctx, input).await
    }
}

struct Guarded<C, I, O> {
    hook: &'static str,
    guard: Arc<dyn Guard<I, O>>,
    terminal: Arc<dyn Action<C, I, O>>,
}

#[async_trait]
impl<C, I, O> Action<C, I, O> for Guarded<C, I, O>
where
    C: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    async fn call(&self, ctx: &C, input: I) -> HookResult<O> {
        match self.guard.check(input) {
            Ok(input) => self.terminal.call(ctx, input).await,
            Err(output) => {
                debug!(hook = self.hook, "guard short-circuited terminal action");
                Ok(output)
            }
        }
    }
}

/// Pre-built pipeline: filters folded around a terminal action.
pub struct HookChain<C, I, O> {
    root: Arc<dyn Action<C, I, O>>,
    depth: usize,
}

impl<C, I, O> Clone for HookChain<C, I, O> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
            depth: self.depth,
        }
    }
}

impl<C, I, O> fmt::Debug for HookChain<C, I, O> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HookChain")
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl<C, I, O> HookChain<C, I, O>
where
    C: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    /// Number of filters wrapped around the terminal action.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Invoke the pipeline.
    ///
    /// # Errors
    ///
    /// Propagates faults raised by any stage.
    pub async fn call(&self, ctx: &C, input: I) -> HookResult<O> {
        self.root.call(ctx, input).await
    }
}

#[async_trait]
impl<C, I, O> Action<C, I, O> for HookChain<C, I, O>
where
    C: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    async fn call(&self, ctx: &C, input: I) -> HookResult<O> {
        self.root.call(ctx, input).await
    }
}

/// Ordered registry of filters for one extension point.
pub struct FilterHook<C, I, O> {
    name: &'static str,
    filters: Vec<Arc<dyn Filter<C, I, O>>>,
}

impl<C, I, O> fmt::Debug for FilterHook<C, I, O> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FilterHook")
            .field("name", &self.name)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl<C, I, O> FilterHook<C, I, O>
where
    C: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    /// Create an empty hook.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            filters: Vec::new(),
        }
    }

    /// Hook identifier used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Register a filter after the existing ones (closer to the action).
    pub fn append_filter<F>(&mut self, filter: F)
    where
        F: Filter<C, I, O> + 'static,
    {
        self.filters.push(Arc::new(filter));
    }

    /// Register a filter before the existing ones (outermost).
    pub fn prepend_filter<F>(&mut self, filter: F)
    where
        F: Filter<C, I, O> + 'static,
    {
        self.filters.insert(0, Arc::new(filter));
    }

    /// Register an already shared filter after the existing ones.
    pub fn append_shared(&mut self, filter: Arc<dyn Filter<C, I, O>>) {
        self.filters.push(filter);
    }

    /// Number of registered filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` when no filters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Fold the registered filters around `terminal`.
    ///
    /// With filters `[f1, f2, f3]` the resulting chain is `f1(f2(f3(terminal)))`.
    /// Without filters the chain is the terminal action itself.
    #[must_use]
    pub fn build(&self, terminal: Arc<dyn Action<C, I, O>>) -> HookChain<C, I, O> {
        let root = self
            .filters
            .iter()
            .rev()
            .fold(terminal, |next, filter| -> Arc<dyn Action<C, I, O>> {
                Arc::new(Wrapped {
                    filter: Arc::clone(filter),
                    next,
                })
            });
        HookChain {
            root,
            depth: self.filters.len(),
        }
    }

    /// Like [`Self::build`], with `guard` placed directly in front of `terminal`.
    #[must_use]
    pub fn build_guarded(
        &self,
        terminal: Arc<dyn Action<C, I, O>>,
        guard: Arc<dyn Guard<I, O>>,
    ) -> HookChain<C, I, O> {
        self.build(Arc::new(Guarded {
            hook: self.name,
            guard,
            terminal,
        }))
    }

    /// Build the chain and invoke it once.
    ///
    /// # Errors
    ///
    /// Propagates faults raised by any stage.
    pub async fn call(
        &self,
        terminal: Arc<dyn Action<C, I, O>>,
        ctx: &C,
        input: I,
    ) -> HookResult<O> {
        self.build(terminal).call(ctx, input).await
    }
}
