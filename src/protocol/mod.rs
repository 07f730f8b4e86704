// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device protocol capability.
//!
//! The engine never speaks a device wire format itself. It drives devices
//! through two small traits:
//!
//! - [`DeviceConnector`]: opens a connection to one device by address
//! - [`DeviceConnection`]: sets or reads the relay, then is closed
//!
//! Plugs and bulbs use different protocol dialects, so [`TypedConnector`]
//! combines one connector per [`DeviceType`] and dispatches on the
//! record's type.
//!
//! Connections are never shared between requests. Whoever connects must
//! call [`DeviceConnection::close`] on every exit path.

mod typed;

pub use typed::{TypedConnection, TypedConnector};

use std::future::Future;
use std::time::Duration;

use crate::error::ProtocolError;
use crate::types::{DeviceType, PowerState};

/// An open connection to one physical device.
pub trait DeviceConnection: Send {
    /// Sends a power command.
    ///
    /// Success only means the command was acknowledged at the transport
    /// level; the relay may not have switched yet.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the command is not acknowledged.
    fn set_power(&mut self, on: bool) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Queries the live relay state.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the device does not answer.
    fn power_state(&mut self) -> impl Future<Output = Result<PowerState, ProtocolError>> + Send;

    /// Releases the connection.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Factory for device connections.
pub trait DeviceConnector: Send + Sync {
    /// Connection type produced by this connector.
    type Connection: DeviceConnection;

    /// Opens a connection to the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the device cannot be reached.
    fn connect(
        &self,
        address: &str,
        device_type: DeviceType,
    ) -> impl Future<Output = Result<Self::Connection, ProtocolError>> + Send;
}

/// Runs a protocol step with an upper time bound.
///
/// An elapsed bound becomes [`ProtocolError::Timeout`].
pub(crate) async fn bounded<T, F>(limit: Duration, step: F) -> Result<T, ProtocolError>
where
    F: Future<Output = Result<T, ProtocolError>>,
{
    match tokio::time::timeout(limit, step).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout(
            u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
