//! Shared test fixtures for the Loadout workspace.
//!
//! Scripted engine and device stubs record every call they receive so tests
//! can assert on ordering and arguments without a daemon or a device.

pub mod fixtures;

pub use fixtures::{ScriptedDevice, ScriptedEngine, write_download_tree};
