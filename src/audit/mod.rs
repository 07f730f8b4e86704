// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Audit trail of control attempts.
//!
//! Every control attempt, successful or not, produces one plain-text line
//! in a segment file named after the local calendar date:
//!
//! ```text
//! logs/10-19-2026.txt
//! 14:03:27 - {"deviceId":"d1","action":"on","result":{"status":"on"}} by 10.0.0.9 - User-Agent: (X11; Linux x86_64)
//! 14:05:02 - {"deviceId":"d9","action":"on","error":"device d9 not found"} by 10.0.0.9 - User-Agent: Unknown
//! ```
//!
//! The [`AuditRecorder`] never fails its caller: I/O errors are logged and
//! the control operation carries on.

mod client;
mod recorder;

pub use client::{ClientInfo, UNKNOWN};
pub use recorder::AuditRecorder;

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::types::PowerState;

/// Result part of a successful attempt summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    /// The confirmed power state.
    pub status: PowerState,
}

/// JSON summary of one control attempt.
///
/// Serializes as `{"deviceId", "action", "result"}` on success or
/// `{"deviceId", "action", "error"}` on failure. The action is kept as
/// received, so rejected actions are traceable too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDetails {
    device_id: String,
    action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ActionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ActionDetails {
    /// Summary of an attempt that confirmed `status`.
    #[must_use]
    pub fn success(
        device_id: impl Into<String>,
        action: impl Into<String>,
        status: PowerState,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            action: action.into(),
            result: Some(ActionResult { status }),
            error: None,
        }
    }

    /// Summary of a failed attempt.
    #[must_use]
    pub fn failure(
        device_id: impl Into<String>,
        action: impl Into<String>,
        error: &impl fmt::Display,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            action: action.into(),
            result: None,
            error: Some(error.to_string()),
        }
    }

    /// Returns the targeted device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns `true` if the attempt failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// One audit line, fully formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    date: String,
    time: String,
    summary: String,
    client_address: String,
    agent_token: String,
}

impl AuditEntry {
    /// Date format of segment names.
    pub const DATE_FORMAT: &str = "%m-%d-%Y";
    /// Time-of-day format of each line.
    pub const TIME_FORMAT: &str = "%H:%M:%S";

    /// Builds the entry for `details` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary cannot be serialized.
    pub fn new(
        now: NaiveDateTime,
        details: &ActionDetails,
        client: &ClientInfo,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            date: now.format(Self::DATE_FORMAT).to_string(),
            time: now.format(Self::TIME_FORMAT).to_string(),
            summary: serde_json::to_string(details)?,
            client_address: client.address().to_string(),
            agent_token: client.agent_token(),
        })
    }

    /// Returns the `MM-DD-YYYY` date key.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Returns the `HH:MM:SS` time stamp.
    #[must_use]
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Returns the JSON summary.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Returns the segment file name for this entry's date.
    #[must_use]
    pub fn segment_name(&self) -> String {
        format!("{}.txt", self.date)
    }

    /// Returns the newline-terminated line to append.
    #[must_use]
    pub fn line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} by {} - User-Agent: {}",
            self.time, self.summary, self.client_address, self.agent_token
        )
    }
}
