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

//! Data access layer for Misago: reversible schema migrations and the Postgres
//! implementation of the thread/category repositories.

pub mod error;
pub mod migrations;
pub mod store;

pub use error::{DataError, Result as DataResult};
pub use migrations::{connect, run_migrations, undo_migrations};
pub use store::PgForumStore;
