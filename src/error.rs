// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `switchboard` library.
//!
//! Errors are layered: [`ProtocolError`] for device communication,
//! [`RegistryError`] for the persisted registry, and [`ControlError`] for
//! the request-level failures returned by the orchestrator. Conditions
//! that degrade service without failing a request are reported as
//! [`DegradedCondition`].

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ControlAction, PowerState};

/// Coarse classification of every failure the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No record with the requested id exists.
    DeviceNotFound,
    /// The requested action is not `on` or `off`.
    InvalidAction,
    /// The device could not be connected to.
    DeviceUnreachable,
    /// The power command was not acknowledged.
    CommandFailed,
    /// The post-command state query failed.
    ConfirmationFailed,
    /// The registry could not be read.
    RegistryUnavailable,
    /// The registry could not be written after a confirmed change.
    PersistenceFailed,
}

impl ErrorKind {
    /// Returns the kind name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceNotFound => "DeviceNotFound",
            Self::InvalidAction => "InvalidAction",
            Self::DeviceUnreachable => "DeviceUnreachable",
            Self::CommandFailed => "CommandFailed",
            Self::ConfirmationFailed => "ConfirmationFailed",
            Self::RegistryUnavailable => "RegistryUnavailable",
            Self::PersistenceFailed => "PersistenceFailed",
        }
    }

    /// Returns `true` for conditions the engine keeps serving through.
    #[must_use]
    pub const fn is_degraded_mode(&self) -> bool {
        matches!(self, Self::RegistryUnavailable | Self::PersistenceFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors related to value validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// An action other than `on`/`off` was requested.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// An unknown device type was provided.
    #[error("invalid device type: {0}")]
    InvalidDeviceType(String),
}

/// Errors related to device communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Connection to the device failed.
    #[error("device unreachable: {0}")]
    Unreachable(String),

    /// The device did not acknowledge a command.
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// The device did not answer a state query.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A protocol step exceeded its time bound.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Transport-level I/O failure.
    ///
    /// Connector implementations can propagate socket errors with `?`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors related to the persisted device registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry file could not be read.
    #[error("failed to read registry {}: {source}", .path.display())]
    Read {
        /// Registry file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The registry file is not a valid device list.
    #[error("failed to parse registry {}: {source}", .path.display())]
    Parse {
        /// Registry file path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The registry file could not be replaced.
    #[error("failed to write registry {}: {source}", .path.display())]
    Write {
        /// Registry file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The registry could not be serialized.
    #[error("failed to serialize registry: {0}")]
    Serialize(#[source] serde_json::Error),

    /// No record with this id exists.
    #[error("device {0} not found in registry")]
    NotFound(String),

    /// Two records share an id.
    #[error("duplicate device id {0}")]
    DuplicateId(String),
}

/// Request-level failures returned by the orchestrator.
///
/// Every variant carries the device id so the attempt can be
/// reconstructed from the error alone.
#[derive(Debug, Error)]
pub enum ControlError {
    /// No record with the requested id exists. No network call was made.
    #[error("device {device_id} not found")]
    DeviceNotFound {
        /// Requested device id.
        device_id: String,
    },

    /// The requested action is not `on` or `off`. No network call was made.
    #[error("invalid action {action:?} for device {device_id}")]
    InvalidAction {
        /// Requested device id.
        device_id: String,
        /// Raw action as received.
        action: String,
    },

    /// The device could not be connected to. The registry is untouched.
    #[error("device {device_id} at {address} is unreachable: {source}")]
    DeviceUnreachable {
        /// Requested device id.
        device_id: String,
        /// Address the connection was attempted on.
        address: String,
        /// Underlying protocol error.
        #[source]
        source: ProtocolError,
    },

    /// The power command failed. The registry is untouched.
    #[error("failed to switch device {device_id} {action}: {source}")]
    CommandFailed {
        /// Requested device id.
        device_id: String,
        /// Attempted action.
        action: ControlAction,
        /// Underlying protocol error.
        #[source]
        source: ProtocolError,
    },

    /// The state query failed. The registry keeps its prior value.
    #[error("could not confirm power state of device {device_id}: {source}")]
    ConfirmationFailed {
        /// Requested device id.
        device_id: String,
        /// Attempted action, if the query followed a command.
        action: Option<ControlAction>,
        /// Underlying protocol error.
        #[source]
        source: ProtocolError,
    },

    /// The registry could not be read, so the device could not be resolved.
    #[error("device registry is unavailable while resolving {device_id}: {source}")]
    RegistryUnavailable {
        /// Requested device id.
        device_id: String,
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
}

impl ControlError {
    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceNotFound { .. } => ErrorKind::DeviceNotFound,
            Self::InvalidAction { .. } => ErrorKind::InvalidAction,
            Self::DeviceUnreachable { .. } => ErrorKind::DeviceUnreachable,
            Self::CommandFailed { .. } => ErrorKind::CommandFailed,
            Self::ConfirmationFailed { .. } => ErrorKind::ConfirmationFailed,
            Self::RegistryUnavailable { .. } => ErrorKind::RegistryUnavailable,
        }
    }

    /// Returns the device id the failed request targeted.
    #[must_use]
    pub fn device_id(&self) -> &str {
        match self {
            Self::DeviceNotFound { device_id }
            | Self::InvalidAction { device_id, .. }
            | Self::DeviceUnreachable { device_id, .. }
            | Self::CommandFailed { device_id, .. }
            | Self::ConfirmationFailed { device_id, .. }
            | Self::RegistryUnavailable { device_id, .. } => device_id,
        }
    }
}

/// A registry write that failed after the device state was confirmed.
///
/// The device is in `status` but the registry still holds the previous
/// value until the next successful persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceFailure {
    /// Device whose confirmed state was not persisted.
    pub device_id: String,
    /// The confirmed state that should have been written.
    pub status: PowerState,
    /// Description of the write failure.
    pub reason: String,
}

impl fmt::Display for PersistenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device {} confirmed {} but registry was not updated: {}",
            self.device_id, self.status, self.reason
        )
    }
}

/// A condition under which the engine keeps serving on best effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedCondition {
    /// The registry could not be read; an empty registry was served.
    RegistryUnavailable {
        /// Description of the read failure.
        reason: String,
    },
    /// A confirmed state could not be persisted.
    PersistenceFailed(PersistenceFailure),
}

impl DegradedCondition {
    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RegistryUnavailable { .. } => ErrorKind::RegistryUnavailable,
            Self::PersistenceFailed(_) => ErrorKind::PersistenceFailed,
        }
    }
}

impl fmt::Display for DegradedCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistryUnavailable { reason } => write!(f, "registry unavailable: {reason}"),
            Self::PersistenceFailed(failure) => write!(f, "{failure}"),
        }
    }
}

/// A specialized Result type for control operations.
pub type Result<T> = std::result::Result<T, ControlError>;
