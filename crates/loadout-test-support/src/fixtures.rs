//! Scripted collaborator stubs and on-disk fixtures.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use loadout_device::{DeviceClient, DeviceError, DeviceResult, DeviceSerial};
use loadout_engine_core::{
    AddMagnetOptions, AddMagnetOutcome, DownloadEngine, EngineError, EngineResult, TorrentId,
    TorrentStatus,
};
use loadout_events::TorrentState;

/// Download engine stub that replays a scripted status sequence.
///
/// Each `status` call pops the next scripted snapshot; the final entry is
/// sticky so a finite script can stand in for an ongoing download. `None`
/// entries simulate a torrent that vanished from the session.
pub struct ScriptedEngine {
    add_outcome: Mutex<Option<EngineResult<AddMagnetOutcome>>>,
    statuses: Mutex<VecDeque<Option<TorrentStatus>>>,
    /// Recorded magnet admissions: `(uri, download_location)`.
    pub added: Mutex<Vec<(String, Option<String>)>>,
    /// Recorded pause calls.
    pub paused: Mutex<Vec<TorrentId>>,
    /// Recorded resume calls.
    pub resumed: Mutex<Vec<TorrentId>>,
    /// Recorded removals: `(id, remove_data)`.
    pub removed: Mutex<Vec<(TorrentId, bool)>>,
}

impl ScriptedEngine {
    /// Engine whose admission succeeds under the given id.
    #[must_use]
    pub fn new(torrent_id: &str) -> Self {
        Self::with_add_outcome(Ok(AddMagnetOutcome::Added(TorrentId::from(torrent_id))))
    }

    /// Engine with a fully scripted admission outcome.
    #[must_use]
    pub fn with_add_outcome(outcome: EngineResult<AddMagnetOutcome>) -> Self {
        Self {
            add_outcome: Mutex::new(Some(outcome)),
            statuses: Mutex::new(VecDeque::new()),
            added: Mutex::new(Vec::new()),
            paused: Mutex::new(Vec::new()),
            resumed: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }

    /// Append a status snapshot to the script.
    pub fn push_status(&self, status: TorrentStatus) {
        self.statuses
            .lock()
            .expect("status script poisoned")
            .push_back(Some(status));
    }

    /// Append a vanished-torrent tick to the script.
    pub fn push_vanished(&self) {
        self.statuses
            .lock()
            .expect("status script poisoned")
            .push_back(None);
    }

    /// Convenience: a downloading snapshot at the given progress.
    #[must_use]
    pub fn downloading(progress_percent: f64) -> TorrentStatus {
        TorrentStatus {
            state: TorrentState::Downloading,
            progress_percent,
            download_bps: 2_000_000,
            eta_seconds: 60,
            name: Some("scripted".to_string()),
            message: None,
        }
    }
}

#[async_trait]
impl DownloadEngine for ScriptedEngine {
    async fn add_magnet(
        &self,
        uri: &str,
        options: &AddMagnetOptions,
    ) -> EngineResult<AddMagnetOutcome> {
        self.added
            .lock()
            .expect("added log poisoned")
            .push((uri.to_string(), options.download_location.clone()));
        self.add_outcome
            .lock()
            .expect("add outcome poisoned")
            .take()
            .unwrap_or_else(|| {
                Err(EngineError::AddRejected {
                    reason: "admission already consumed".to_string(),
                })
            })
    }

    async fn status(&self, _id: &TorrentId) -> EngineResult<Option<TorrentStatus>> {
        let mut script = self.statuses.lock().expect("status script poisoned");
        match script.len() {
            0 => Ok(None),
            1 => Ok(script.front().cloned().flatten()),
            _ => Ok(script.pop_front().flatten()),
        }
    }

    async fn pause(&self, id: &TorrentId) -> EngineResult<()> {
        self.paused
            .lock()
            .expect("pause log poisoned")
            .push(id.clone());
        Ok(())
    }

    async fn resume(&self, id: &TorrentId) -> EngineResult<()> {
        self.resumed
            .lock()
            .expect("resume log poisoned")
            .push(id.clone());
        Ok(())
    }

    async fn remove(&self, id: &TorrentId, remove_data: bool) -> EngineResult<()> {
        self.removed
            .lock()
            .expect("remove log poisoned")
            .push((id.clone(), remove_data));
        Ok(())
    }
}

/// Device stub that records every command in invocation order.
pub struct ScriptedDevice {
    devices: Mutex<Vec<DeviceSerial>>,
    package_lists: Mutex<VecDeque<Vec<String>>>,
    failing_uninstalls: Mutex<HashSet<String>>,
    /// Ordered log of commands, e.g. `install:/tmp/a.apk` or `push:data`.
    pub commands: Mutex<Vec<String>>,
}

impl ScriptedDevice {
    /// Device stub reporting the given serials as attached.
    #[must_use]
    pub fn new(devices: Vec<DeviceSerial>) -> Self {
        Self {
            devices: Mutex::new(devices),
            package_lists: Mutex::new(VecDeque::new()),
            failing_uninstalls: Mutex::new(HashSet::new()),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Append a package listing to the script; the final entry is sticky.
    pub fn push_package_list(&self, packages: Vec<String>) {
        self.package_lists
            .lock()
            .expect("package script poisoned")
            .push_back(packages);
    }

    /// Make uninstalling the given package fail with a device rejection.
    pub fn fail_uninstall_of(&self, package: &str) {
        self.failing_uninstalls
            .lock()
            .expect("uninstall failures poisoned")
            .insert(package.to_string());
    }

    /// Snapshot of the recorded command log.
    #[must_use]
    pub fn recorded(&self) -> Vec<String> {
        self.commands.lock().expect("command log poisoned").clone()
    }

    fn record(&self, entry: String) {
        self.commands
            .lock()
            .expect("command log poisoned")
            .push(entry);
    }
}

#[async_trait]
impl DeviceClient for ScriptedDevice {
    async fn list_devices(&self) -> DeviceResult<Vec<DeviceSerial>> {
        Ok(self.devices.lock().expect("device list poisoned").clone())
    }

    async fn path_exists(&self, _device: &DeviceSerial, path: &str) -> DeviceResult<bool> {
        self.record(format!("exists:{path}"));
        Ok(false)
    }

    async fn make_dir(&self, _device: &DeviceSerial, path: &str) -> DeviceResult<()> {
        self.record(format!("mkdir:{path}"));
        Ok(())
    }

    async fn install_apk(&self, _device: &DeviceSerial, apk_path: &Path) -> DeviceResult<String> {
        self.record(format!("install:{}", apk_path.display()));
        Ok("Success".to_string())
    }

    async fn uninstall(&self, _device: &DeviceSerial, package: &str) -> DeviceResult<String> {
        self.record(format!("uninstall:{package}"));
        let failing = self
            .failing_uninstalls
            .lock()
            .expect("uninstall failures poisoned");
        if failing.contains(package) {
            return Err(DeviceError::Uninstall {
                package: package.to_string(),
                output: "Failure [DELETE_FAILED_INTERNAL_ERROR]".to_string(),
            });
        }
        Ok("Success".to_string())
    }

    async fn list_packages(&self, _device: &DeviceSerial) -> DeviceResult<Vec<String>> {
        let mut script = self.package_lists.lock().expect("package script poisoned");
        match script.len() {
            0 => Ok(Vec::new()),
            1 => Ok(script.front().cloned().unwrap_or_default()),
            _ => Ok(script.pop_front().unwrap_or_default()),
        }
    }

    async fn push(
        &self,
        _device: &DeviceSerial,
        local: &Path,
        remote: &str,
    ) -> DeviceResult<String> {
        self.record(format!("push:{}->{remote}", local.display()));
        Ok(String::new())
    }
}

/// Lay out a download tree the scanner understands:
/// `<root>/<name>/<name>.apk` plus one data directory and one loose file.
///
/// Returns the content directory.
///
/// # Errors
///
/// Returns an error if any directory or file cannot be created.
pub fn write_download_tree(root: &Path, name: &str) -> io::Result<std::path::PathBuf> {
    let content = root.join(name);
    fs::create_dir_all(&content)?;
    fs::write(content.join(format!("{name}.apk")), b"apk-bytes")?;

    let data_dir = content.join(format!("com.example.{name}"));
    fs::create_dir_all(&data_dir)?;
    fs::write(data_dir.join("main.obb"), b"obb-bytes")?;

    fs::write(content.join("install-notes.txt"), b"notes")?;
    Ok(content)
}
