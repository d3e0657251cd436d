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

//! Remote device command facade over the Android Debug Bridge.
//!
//! Layout: `service.rs` (`DeviceClient` trait), `adb.rs` (`AdbClient`
//! subprocess implementation and output parsing), `error.rs` (structured
//! device errors).

pub mod adb;
pub mod error;
pub mod service;

pub use adb::AdbClient;
pub use error::{DeviceError, DeviceResult};
pub use service::{DeviceClient, DeviceSerial};
