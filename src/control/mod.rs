// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control orchestration.
//!
//! The [`ControlOrchestrator`] turns a [`ControlRequest`] into a
//! confirmed, persisted [`ControlOutcome`]:
//!
//! ```text
//! Resolving -> Connecting -> Commanding -> Confirming -> Persisting -> Done
//!      \            \             \             \
//!       +------------+-------------+-------------+--> Failed(kind)
//! ```
//!
//! Every attempt, successful or not, is handed to the audit recorder. The
//! status returned to the caller is always the state the device reported
//! after settling, never the state that was requested.

mod orchestrator;
mod settle;

pub use orchestrator::ControlOrchestrator;
pub use settle::SettlePolicy;

use std::fmt;

use crate::audit::ActionDetails;
use crate::error::{ControlError, DegradedCondition, ErrorKind, PersistenceFailure};
use crate::registry::DeviceRecord;
use crate::types::{ControlAction, PowerState};

/// A request to switch one device.
///
/// The action is kept as received and validated only after the device has
/// been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    /// Target device id.
    pub device_id: String,
    /// Raw requested action (`on` / `off`).
    pub action: String,
}

impl ControlRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(device_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            action: action.into(),
        }
    }

    /// Creates a request from an already-typed action.
    #[must_use]
    pub fn with_action(device_id: impl Into<String>, action: ControlAction) -> Self {
        Self::new(device_id, action.as_str())
    }

    /// Builds the audit summary for this request's result.
    #[must_use]
    pub fn audit_details(&self, result: &Result<ControlOutcome, ControlError>) -> ActionDetails {
        match result {
            Ok(outcome) => ActionDetails::success(&self.device_id, &self.action, outcome.status),
            Err(e) => ActionDetails::failure(&self.device_id, &self.action, e),
        }
    }
}

/// Result of a successful control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOutcome {
    device_id: String,
    action: ControlAction,
    status: PowerState,
    persistence: Option<PersistenceFailure>,
}

impl ControlOutcome {
    /// Returns the controlled device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the requested action.
    #[must_use]
    pub fn action(&self) -> ControlAction {
        self.action
    }

    /// Returns the confirmed power state.
    #[must_use]
    pub fn status(&self) -> PowerState {
        self.status
    }

    /// Returns `true` if the device ended up in the requested state.
    #[must_use]
    pub fn matches_request(&self) -> bool {
        self.status == PowerState::from(self.action)
    }

    /// Returns the registry write failure, if the confirmed state could
    /// not be persisted.
    #[must_use]
    pub fn persistence_failure(&self) -> Option<&PersistenceFailure> {
        self.persistence.as_ref()
    }
}

/// Result of a live status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    device_id: String,
    status: PowerState,
    persistence: Option<PersistenceFailure>,
}

impl StatusReport {
    /// Returns the queried device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the observed power state.
    #[must_use]
    pub fn status(&self) -> PowerState {
        self.status
    }

    /// Returns the registry write failure, if any.
    #[must_use]
    pub fn persistence_failure(&self) -> Option<&PersistenceFailure> {
        self.persistence.as_ref()
    }
}

/// Devices in registry order, plus the degraded condition if the registry
/// could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceListing {
    /// Records in registry order; empty when the registry is unavailable.
    pub devices: Vec<DeviceRecord>,
    /// Set when the registry could not be read.
    pub degraded: Option<DegradedCondition>,
}

/// Stage of one control or status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStage {
    /// Looking the device up in the registry.
    Resolving,
    /// Opening a device connection.
    Connecting,
    /// Sending the power command.
    Commanding,
    /// Settling and querying the relay.
    Confirming,
    /// Writing the confirmed state back.
    Persisting,
    /// Finished successfully.
    Done,
    /// Terminal failure.
    Failed(ErrorKind),
}

impl fmt::Display for ControlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolving => f.write_str("resolving"),
            Self::Connecting => f.write_str("connecting"),
            Self::Commanding => f.write_str("commanding"),
            Self::Confirming => f.write_str("confirming"),
            Self::Persisting => f.write_str("persisting"),
            Self::Done => f.write_str("done"),
            Self::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    #[test]
    fn audit_details_for_success_and_failure() {
        let request = ControlRequest::with_action("d1", ControlAction::On);
        let ok = Ok(ControlOutcome {
            device_id: "d1".to_string(),
            action: ControlAction::On,
            status: PowerState::Off,
            persistence: None,
        });
        assert_eq!(
            request.audit_details(&ok),
            ActionDetails::success("d1", "on", PowerState::Off)
        );

        let err = Err(ControlError::DeviceUnreachable {
            device_id: "d1".to_string(),
            address: "10.0.0.5".to_string(),
            source: ProtocolError::Timeout(5000),
        });
        let details = request.audit_details(&err);
        assert!(details.is_failure());
        assert_eq!(details.device_id(), "d1");
    }

    #[test]
    fn outcome_reports_mismatch_with_request() {
        let outcome = ControlOutcome {
            device_id: "d1".to_string(),
            action: ControlAction::On,
            status: PowerState::Off,
            persistence: None,
        };
        assert!(!outcome.matches_request());
    }

    #[test]
    fn stage_display() {
        assert_eq!(ControlStage::Confirming.to_string(), "confirming");
        assert_eq!(
            ControlStage::Failed(ErrorKind::CommandFailed).to_string(),
            "failed(CommandFailed)"
        );
    }
}
