// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switchboard Lib - confirmed power control for smart plugs and bulbs.
//!
//! This library keeps a small JSON device registry in step with what the
//! devices themselves report. A control request switches a relay, waits
//! for it to settle, reads the real state back and persists that, never
//! the state that was merely requested.
//!
//! # Features
//!
//! - **Registry**: JSON device list with atomic, serialized writes
//! - **Control**: connect, command, settle, confirm, persist, audit
//! - **Status**: live state query written back to the registry
//! - **Audit**: one line per attempt in a per-day text segment
//! - **Degraded mode**: an unreadable registry or a failed write is
//!   reported without crashing
//!
//! # Protocols
//!
//! Device wire formats are supplied by the caller through
//! [`protocol::DeviceConnector`]. A [`protocol::TypedConnector`] routes
//! plugs and bulbs to their own connector.
//!
//! # Quick Start
//!
//! ```ignore
//! use switchboard_lib::audit::ClientInfo;
//! use switchboard_lib::protocol::TypedConnector;
//! use switchboard_lib::{ControlOrchestrator, ControlRequest, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> switchboard_lib::Result<()> {
//!     let engine = ControlOrchestrator::new(
//!         EngineConfig::new("devices.json").with_audit_dir("logs"),
//!         TypedConnector::new(MyPlugConnector::default(), MyBulbConnector::default()),
//!     );
//!
//!     for device in engine.list_devices().await.devices {
//!         println!("{} ({}) is {}", device.name(), device.room(), device.status());
//!     }
//!
//!     let client = ClientInfo::from_request(None, Some("192.168.1.20"), Some("curl/8.4.0"));
//!     let outcome = engine.control(&ControlRequest::new("d1", "on"), &client).await?;
//!     if !outcome.matches_request() {
//!         println!("d1 did not switch, it reports {}", outcome.status());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
mod config;
pub mod control;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod types;

pub use config::EngineConfig;
pub use control::{
    ControlOrchestrator, ControlOutcome, ControlRequest, ControlStage, DeviceListing,
    SettlePolicy, StatusReport,
};
pub use error::{
    ControlError, DegradedCondition, ErrorKind, PersistenceFailure, ProtocolError, RegistryError,
    Result, ValueError,
};
pub use registry::{DeviceRecord, LoadedRegistry, Registry, RegistryStore};
pub use types::{ControlAction, DeviceType, PowerState};
