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

//! Deluge adapter implementation backed by the daemon's web JSON-RPC surface.

/// State-string conversion and duplicate-admission recovery helpers.
pub mod convert;

mod client;

pub use client::DelugeClient;
