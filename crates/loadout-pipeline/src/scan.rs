//! APK discovery under a completed download path.
//!
//! Depth-first, first `.apk` wins. Directory entries are visited in
//! lexicographic order (files before subdirectories at each level) so the
//! first match is deterministic regardless of OS enumeration order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::install::{InstallTarget, OBB_ROOT};
use loadout_device::DeviceSerial;

/// Build an [`InstallTarget`] by locating the first APK under
/// `download_path`; the APK's siblings become the data payload.
///
/// # Errors
///
/// Fails with [`PipelineError::ApkNotFound`] when no APK exists under the
/// path, or [`PipelineError::Io`] when the tree cannot be read.
pub fn find_install_target(
    download_path: &Path,
    device: &DeviceSerial,
    index: usize,
) -> PipelineResult<InstallTarget> {
    let apk_path =
        find_first_apk(download_path)?.ok_or_else(|| PipelineError::ApkNotFound {
            path: download_path.to_path_buf(),
        })?;

    let content_root = apk_path
        .parent()
        .map_or_else(|| download_path.to_path_buf(), Path::to_path_buf);

    let mut data_dirs = Vec::new();
    let mut data_files = Vec::new();
    for entry in sorted_entries(&content_root)? {
        if entry == apk_path {
            continue;
        }
        if entry.is_dir() {
            data_dirs.push(entry);
        } else {
            data_files.push(entry);
        }
    }

    let remote_name = content_root
        .file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned());

    Ok(InstallTarget {
        apk_path,
        data_dirs,
        data_files,
        device: device.clone(),
        remote_data_dir: format!("{OBB_ROOT}/{remote_name}"),
        index,
    })
}

/// Depth-first search for the first `.apk` file under `root`.
fn find_first_apk(root: &Path) -> PipelineResult<Option<PathBuf>> {
    let entries = sorted_entries(root)?;

    for entry in entries.iter().filter(|entry| entry.is_file()) {
        let is_apk = entry
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("apk"));
        if is_apk {
            return Ok(Some(entry.clone()));
        }
    }

    for entry in entries.iter().filter(|entry| entry.is_dir()) {
        if let Some(found) = find_first_apk(entry)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

/// Directory entries sorted by file name.
fn sorted_entries(root: &Path) -> PipelineResult<Vec<PathBuf>> {
    let reader = fs::read_dir(root).map_err(|source| PipelineError::Io {
        operation: "scan.read_dir",
        path: root.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|source| PipelineError::Io {
            operation: "scan.read_dir_entry",
            path: root.to_path_buf(),
            source,
        })?;
        entries.push(entry.path());
    }
    entries.sort_by_key(|path| path.file_name().map(std::ffi::OsStr::to_os_string));
    Ok(entries)
}
