//! Context propagation helpers for operation spans.
//!
//! # Design
//! - Keeps the request identifier and operation name in task-local storage so
//!   nested stages can log them without threading them through every call.
//! - Provides an application-level span guard carrying mode/build info.

use std::future::Future;
use std::sync::Arc;

use tracing::{Instrument, Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        Self {
            _guard: span.enter(),
        }
    }
}

#[derive(Clone)]
struct RequestContext {
    request_id: Arc<str>,
    operation: Arc<str>,
}

tokio::task_local! {
    static ACTIVE_REQUEST_CONTEXT: RequestContext;
}

/// Request identifier of the enclosing [`with_request_context`] scope.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.request_id.to_string())
        .ok()
}

/// Operation name of the enclosing [`with_request_context`] scope.
#[must_use]
pub fn current_operation() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.operation.to_string())
        .ok()
}

/// Run `fut` inside an `operation` span with the request context available to
/// downstream stages.
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    operation: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        operation: Arc::from(operation.into()),
    };
    let span = tracing::info_span!(
        "operation",
        request_id = %context.request_id,
        operation = %context.operation
    );
    ACTIVE_REQUEST_CONTEXT
        .scope(context, fut.instrument(span))
        .await
}
