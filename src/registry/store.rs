// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-backed registry store with serialized writes.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{DegradedCondition, RegistryError};

use super::{DeviceRecord, Registry};

/// Result of a fail-soft registry load.
///
/// When the file cannot be read or parsed the registry is empty and the
/// error is kept so the caller can report the degraded condition.
#[derive(Debug)]
pub struct LoadedRegistry {
    registry: Registry,
    error: Option<RegistryError>,
}

impl LoadedRegistry {
    /// Returns the loaded registry (empty if unavailable).
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the read failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&RegistryError> {
        self.error.as_ref()
    }

    /// Returns `true` if the file was read successfully.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the `RegistryUnavailable` condition, if any.
    #[must_use]
    pub fn degraded(&self) -> Option<DegradedCondition> {
        self.error
            .as_ref()
            .map(|e| DegradedCondition::RegistryUnavailable {
                reason: e.to_string(),
            })
    }

    /// Splits into the registry and the read failure.
    #[must_use]
    pub fn into_parts(self) -> (Registry, Option<RegistryError>) {
        (self.registry, self.error)
    }
}

/// Owner of the persisted registry file.
///
/// Reads go straight to disk. Every write (`save` and `update_one`) runs
/// under a single async mutex, so concurrent updates are applied one at a
/// time and none is lost. Writes go to a temporary file in the same
/// directory which is then renamed over the target, so a crash mid-write
/// leaves the previous registry intact.
///
/// # Examples
///
/// ```no_run
/// use switchboard_lib::registry::RegistryStore;
/// use switchboard_lib::types::PowerState;
///
/// # async fn example() -> Result<(), switchboard_lib::error::RegistryError> {
/// let store = RegistryStore::new("devices.json");
/// let record = store
///     .update_one("d1", |record| record.set_status(PowerState::On))
///     .await?;
/// assert_eq!(record.status(), PowerState::On);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    write_gate: Mutex<()>,
}

impl RegistryStore {
    /// Creates a store for the registry file at `path`.
    ///
    /// The file is not touched until the first load or save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_gate: Mutex::new(()),
        }
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the registry, falling back to an empty one on failure.
    ///
    /// A missing, unreadable or malformed file never fails the caller; the
    /// failure is logged and returned alongside the empty registry.
    pub async fn load(&self) -> LoadedRegistry {
        match self.read().await {
            Ok(registry) => LoadedRegistry {
                registry,
                error: None,
            },
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Registry unavailable, serving empty registry");
                LoadedRegistry {
                    registry: Registry::new(),
                    error: Some(e),
                }
            }
        }
    }

    /// Reads and parses the registry file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Read`] or [`RegistryError::Parse`].
    pub async fn read(&self) -> Result<Registry, RegistryError> {
        let contents = fs::read_to_string(&self.path)
            .await
            .map_err(|source| RegistryError::Read {
                path: self.path.clone(),
                source,
            })?;

        serde_json::from_str(&contents).map_err(|source| RegistryError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the persisted registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Serialize`] or [`RegistryError::Write`]; the
    /// previous file is left in place on failure.
    pub async fn save(&self, registry: &Registry) -> Result<(), RegistryError> {
        let _gate = self.write_gate.lock().await;
        self.persist(registry).await
    }

    /// Loads, mutates and persists a single record as one serialized step.
    ///
    /// The mutator receives the current persisted record, not a copy the
    /// caller read earlier, and runs while the write gate is held, so
    /// concurrent updates compose.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] without writing anything if no
    /// record has this id. Read and write failures are propagated; an
    /// unreadable file is never overwritten.
    pub async fn update_one<F>(&self, id: &str, mutator: F) -> Result<DeviceRecord, RegistryError>
    where
        F: FnOnce(&mut DeviceRecord),
    {
        self.update_one_if(id, |record| {
            mutator(record);
            true
        })
        .await
        .map(|(record, _)| record)
    }

    /// Like [`update_one`](Self::update_one), but the mutator decides
    /// whether anything is written.
    ///
    /// When the mutator returns `false` its changes are discarded, the file
    /// is left alone and the stored record is returned unchanged. The flag
    /// in the result tells whether a write happened.
    ///
    /// # Errors
    ///
    /// Same as [`update_one`](Self::update_one).
    pub async fn update_one_if<F>(
        &self,
        id: &str,
        mutator: F,
    ) -> Result<(DeviceRecord, bool), RegistryError>
    where
        F: FnOnce(&mut DeviceRecord) -> bool,
    {
        let _gate = self.write_gate.lock().await;

        let mut registry = self.read().await?;
        let record = registry
            .find_by_id_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let stored = record.clone();
        if !mutator(record) {
            tracing::debug!(device_id = %id, "Registry update declined");
            return Ok((stored, false));
        }
        let updated = record.clone();

        self.persist(&registry).await?;

        tracing::debug!(device_id = %id, status = %updated.status(), "Registry record updated");
        Ok((updated, true))
    }

    /// Writes the registry through a temp file and an atomic rename.
    ///
    /// Callers must hold the write gate.
    async fn persist(&self, registry: &Registry) -> Result<(), RegistryError> {
        let contents = serde_json::to_string_pretty(registry).map_err(RegistryError::Serialize)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "registry".into(), |n| n.to_string_lossy());
        let tmp_path = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

        let result = async {
            fs::create_dir_all(dir).await?;
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(contents.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(source) = result {
            // Ignore cleanup errors; the temp file may never have been created.
            let _ = fs::remove_file(&tmp_path).await;
            return Err(RegistryError::Write {
                path: self.path.clone(),
                source,
            });
        }

        tracing::info!(path = %self.path.display(), devices = registry.len(), "Registry saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::types::{DeviceType, PowerState};

    const SAMPLE: &str = r#"[
  {
    "id": "d1",
    "name": "Desk Lamp",
    "room": "Office",
    "type": "Plug",
    "ip": "10.0.0.5",
    "status": "off"
  },
  {
    "id": "d2",
    "name": "Ceiling",
    "room": "Kitchen",
    "type": "Bulb",
    "ip": "10.0.0.6",
    "status": "on"
  }
]"#;

    fn store_with(contents: &str) -> (tempfile::TempDir, RegistryStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, contents).unwrap();
        (dir, RegistryStore::new(path))
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    #[tokio::test]
    async fn load_reads_records_in_order() {
        let (_dir, store) = store_with(SAMPLE);
        let loaded = store.load().await;
        assert!(loaded.is_available());
        let ids: Vec<_> = loaded.registry().iter().map(DeviceRecord::id).collect();
        assert_eq!(ids, ["d1", "d2"]);
        assert_eq!(
            loaded.registry().find_by_id("d2").unwrap().device_type(),
            DeviceType::Bulb
        );
    }

    #[tokio::test]
    async fn load_missing_file_is_unavailable_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::new(dir.path().join("absent.json"));
        let loaded = store.load().await;
        assert!(loaded.registry().is_empty());
        assert!(matches!(loaded.error(), Some(RegistryError::Read { .. })));
        assert!(matches!(
            loaded.degraded(),
            Some(DegradedCondition::RegistryUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn load_malformed_file_is_unavailable_and_empty() {
        let (_dir, store) = store_with("[{\"id\": ");
        let (registry, error) = store.load().await.into_parts();
        assert!(registry.is_empty());
        assert!(matches!(error, Some(RegistryError::Parse { .. })));
    }

    #[tokio::test]
    async fn save_of_load_is_byte_identical() {
        let (_dir, store) = store_with(SAMPLE);
        let registry = store.read().await.unwrap();
        store.save(&registry).await.unwrap();
        let bytes = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(bytes, SAMPLE);

        let reloaded = store.read().await.unwrap();
        assert_eq!(reloaded, registry);
    }

    #[tokio::test]
    async fn save_creates_parent_directory_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("devices.json");
        let store = RegistryStore::new(&path);

        let registry = Registry::try_from(vec![
            DeviceRecord::new("d1", DeviceType::Plug, "10.0.0.5").with_status(PowerState::Off),
        ])
        .unwrap();
        store.save(&registry).await.unwrap();

        assert_eq!(store.read().await.unwrap(), registry);
        assert_eq!(leftover_temp_files(&dir.path().join("state")), 0);
    }

    #[tokio::test]
    async fn update_one_persists_mutation() {
        let (dir, store) = store_with(SAMPLE);
        let updated = store
            .update_one("d1", |r| r.set_status(PowerState::On))
            .await
            .unwrap();
        assert_eq!(updated.status(), PowerState::On);
        assert_eq!(updated.name(), "Desk Lamp");

        let registry = store.read().await.unwrap();
        assert_eq!(registry.find_by_id("d1").unwrap().status(), PowerState::On);
        assert_eq!(registry.find_by_id("d2").unwrap().status(), PowerState::On);
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn update_one_unknown_id_writes_nothing() {
        let (_dir, store) = store_with(SAMPLE);
        let err = store
            .update_one("missing", |r| r.set_status(PowerState::On))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(id) if id == "missing"));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), SAMPLE);
    }

    #[tokio::test]
    async fn update_one_never_overwrites_unreadable_file() {
        let (_dir, store) = store_with("not json");
        let err = store
            .update_one("d1", |r| r.set_status(PowerState::On))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Parse { .. }));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "not json");
    }

    #[tokio::test]
    async fn update_one_can_change_address() {
        let (_dir, store) = store_with(SAMPLE);
        store
            .update_one("d2", |r| r.set_ip("10.0.0.60"))
            .await
            .unwrap();
        let registry = store.read().await.unwrap();
        assert_eq!(registry.find_by_id("d2").unwrap().ip(), "10.0.0.60");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_are_not_lost() {
        let (_dir, store) = store_with(SAMPLE);
        let store = Arc::new(store);

        // Each mutator stalls between the read and the write; without the
        // gate both would read the original file and the second write
        // would discard the first.
        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .update_one("d1", |r| {
                        std::thread::sleep(Duration::from_millis(50));
                        r.set_status(PowerState::On);
                    })
                    .await
            })
        };
        let second = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .update_one("d2", |r| {
                        std::thread::sleep(Duration::from_millis(50));
                        r.set_status(PowerState::Off);
                    })
                    .await
            })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let registry = store.read().await.unwrap();
        assert_eq!(registry.find_by_id("d1").unwrap().status(), PowerState::On);
        assert_eq!(registry.find_by_id("d2").unwrap().status(), PowerState::Off);
    }

    #[tokio::test]
    async fn declined_update_writes_nothing() {
        let (_dir, store) = store_with(SAMPLE);
        let (record, written) = store
            .update_one_if("d1", |r| {
                r.set_status(PowerState::On);
                false
            })
            .await
            .unwrap();

        assert!(!written);
        assert_eq!(record.status(), PowerState::Off);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), SAMPLE);
    }

    #[tokio::test]
    async fn unknown_keys_keep_their_order() {
        let contents = r#"[
  {
    "id": "d1",
    "name": "Desk Lamp",
    "room": "Office",
    "type": "Plug",
    "ip": "10.0.0.5",
    "status": "off",
    "zone": "north",
    "firmware": "1.1.2",
    "added": "2024-03-01"
  }
]"#;
        let (_dir, store) = store_with(contents);
        let registry = store.read().await.unwrap();
        store.save(&registry).await.unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), contents);
    }
}
