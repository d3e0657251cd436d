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

//! Engine-agnostic download engine interfaces and DTOs.
//!
//! Layout: `model.rs` (status and admission DTOs), `service.rs`
//! (`DownloadEngine` trait), `error.rs` (structured engine errors).

pub mod error;
pub mod model;
pub mod service;

pub use error::{EngineError, EngineResult};
pub use model::{AddMagnetOptions, AddMagnetOutcome, TorrentId, TorrentStatus};
pub use service::DownloadEngine;
