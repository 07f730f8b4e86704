// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Day-bucketed audit segment writer.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{ActionDetails, AuditEntry, ClientInfo};

/// Appends audit entries to `<dir>/<MM-DD-YYYY>.txt`.
///
/// The directory and the day's segment are created on first use. Appends
/// from concurrent control operations are serialized so lines never
/// interleave.
#[derive(Debug)]
pub struct AuditRecorder {
    dir: PathBuf,
    append_gate: Mutex<()>,
}

impl AuditRecorder {
    /// Creates a recorder writing under `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            append_gate: Mutex::new(()),
        }
    }

    /// Returns the segment directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the segment path for a `MM-DD-YYYY` date key.
    #[must_use]
    pub fn segment_path(&self, date: &str) -> PathBuf {
        self.dir.join(format!("{date}.txt"))
    }

    /// Records one attempt as of the local wall clock.
    ///
    /// Never fails: audit problems must not block control operations, so
    /// they are only logged.
    pub async fn record(&self, details: &ActionDetails, client: &ClientInfo) {
        let now = Local::now().naive_local();
        let entry = match AuditEntry::new(now, details, client) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(device_id = %details.device_id(), error = %e, "Failed to serialize audit entry");
                return;
            }
        };

        if let Err(e) = self.append(&entry).await {
            tracing::error!(
                dir = %self.dir.display(),
                device_id = %details.device_id(),
                error = %e,
                "Failed to append audit entry"
            );
        }
    }

    /// Appends a formatted entry to its day's segment.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub async fn append(&self, entry: &AuditEntry) -> io::Result<PathBuf> {
        let _gate = self.append_gate.lock().await;

        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(entry.segment_name());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(entry.line().as_bytes()).await?;
        file.flush().await?;

        tracing::trace!(path = %path.display(), "Audit entry appended");
        Ok(path)
    }
}
