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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Loadout application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring and the run loop), `error.rs`
//! (application error boundary).

/// Application bootstrap and run loop.
pub mod bootstrap;
/// Application-level errors.
pub mod error;

pub use bootstrap::{AppContext, run_app};
pub use error::{AppError, AppResult};
