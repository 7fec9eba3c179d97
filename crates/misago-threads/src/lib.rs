#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Thread moderation operations for Misago.
//!
//! Layout: `model.rs` (thread/category DTOs), `context.rs` (request context),
//! `repository.rs` (persistence traits), `hooks.rs` (move-threads extension points),
//! `actions.rs`, `filters.rs`, `validators.rs` (built-in stages), `mutation.rs`
//! (the composed operation).

pub mod actions;
pub mod context;
pub mod filters;
pub mod hooks;
pub mod model;
pub mod mutation;
pub mod repository;
pub mod validators;

pub use context::{ContextUser, ForumSettings, GraphQLContext};
pub use hooks::{
    CleanedMoveThreadsInput, ErrorsGuard, InputStage, InputStageOutput, MoveThreadsAction,
    MoveThreadsFilter, MoveThreadsHooks, MoveThreadsInput, MoveThreadsInputAction,
    MoveThreadsInputFilter, MoveThreadsInputModelAction, MoveThreadsInputModelFilter,
    MoveThreadsTerminals,
};
pub use model::{Category, Thread};
pub use mutation::{MoveThreadsMutation, MoveThreadsPayload};
pub use repository::{CategoriesRepository, ThreadsRepository};
