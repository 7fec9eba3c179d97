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

//! Extensible action/filter pipelines used to run Misago operations.
//!
//! Layout: `pipeline.rs` (`Action`/`Filter` traits, `FilterHook`, `HookChain`),
//! `errors_list.rs` (field-keyed validation errors), `validators.rs` (per-field
//! async validators), `model.rs` (input model descriptors), `error.rs` (faults).

pub mod error;
pub mod errors_list;
pub mod model;
pub mod pipeline;
pub mod validators;

pub use error::{HookError, HookResult};
pub use errors_list::{ErrorsList, FieldError, ROOT_LOCATION};
pub use model::{FieldKind, FieldSpec, InputModel, MAX_POSITIVE_INT};
pub use pipeline::{Action, Filter, FilterHook, Guard, HookChain};
pub use validators::{AsyncValidator, Validation, ValidationError, ValidatorsRegistry};
