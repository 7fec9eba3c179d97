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

//! Misago operator tool wiring.
//!
//! Layout: `cli.rs` (argument parsing), `config.rs` (resolved settings),
//! `bootstrap.rs` (service wiring and command execution), `error.rs`.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;

pub use bootstrap::{
    MOVE_THREADS_OPERATION, MoveThreadsService, build_hooks, move_threads_input, run_app,
    run_command, run_with,
};
pub use cli::{Cli, Command, MoveThreadsArgs, RollbackArgs};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
