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

//! File-backed settings facade for the sideloading pipeline.
//!
//! Layout: `model.rs` (typed settings models), `defaults.rs` (profile
//! defaults), `loader.rs` (JSON file IO), `validate.rs` (validation helpers),
//! `service.rs` (`ConfigService` with live change notification).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod service;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{CatalogSettings, EngineSettings, InstallSettings, Settings};
pub use service::ConfigService;
