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

//! Download-install orchestration pipeline.
//!
//! The pipeline supervises one magnet download to a terminal state
//! ([`torrent`]), hands control to a device-install sequence ([`install`]),
//! and applies post-success/post-cancel policy ([`orchestrator`]), all under
//! a process-wide single-flight guard ([`registry`]). Progress flows to the
//! caller through the shared event bus; outcomes flow back through `Result`s.

pub mod error;
pub mod install;
pub mod orchestrator;
pub mod registry;
pub mod scan;
pub mod torrent;

pub use error::{PipelineError, PipelineResult};
pub use install::{InstallSession, InstallTarget, OBB_ROOT};
pub use orchestrator::Orchestrator;
pub use registry::{OperationKey, TaskRegistry};
pub use torrent::{ControlMessage, DownloadOutcome, MagnetJob, TorrentSession};
