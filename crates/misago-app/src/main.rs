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

//! Binary entrypoint for the Misago operator tool.

use misago_app::{AppResult, run_app};

/// Parse the command line and run the requested command.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
