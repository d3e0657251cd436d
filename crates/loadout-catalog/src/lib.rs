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

//! HTTP client for the companion catalog/auth API.
//!
//! Catalog reads are plain async request/response. Credential login runs on
//! a dedicated worker thread with a blocking HTTP client and hands its
//! result back through a oneshot channel, keeping the async runtime
//! responsive while the call blocks.

pub mod client;
pub mod error;
pub mod model;

pub use client::{CatalogClient, spawn_login};
pub use error::{CatalogError, CatalogResult};
pub use model::{AuthToken, Credentials, GameEntry};
