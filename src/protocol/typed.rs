// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connector that picks the protocol variant from the device type.

use std::future::Future;

use crate::error::ProtocolError;
use crate::types::{DeviceType, PowerState};

use super::{DeviceConnection, DeviceConnector};

/// Combines a plug connector and a bulb connector.
///
/// # Examples
///
/// ```ignore
/// use switchboard_lib::protocol::TypedConnector;
///
/// let connector = TypedConnector::new(PlugConnector::default(), BulbConnector::default());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypedConnector<P, B> {
    plug: P,
    bulb: B,
}

impl<P, B> TypedConnector<P, B> {
    /// Creates a connector dispatching plugs to `plug` and bulbs to `bulb`.
    #[must_use]
    pub fn new(plug: P, bulb: B) -> Self {
        Self { plug, bulb }
    }

    /// Returns the plug variant.
    #[must_use]
    pub fn plug(&self) -> &P {
        &self.plug
    }

    /// Returns the bulb variant.
    #[must_use]
    pub fn bulb(&self) -> &B {
        &self.bulb
    }
}

impl<P, B> DeviceConnector for TypedConnector<P, B>
where
    P: DeviceConnector,
    B: DeviceConnector,
{
    type Connection = TypedConnection<P::Connection, B::Connection>;

    fn connect(
        &self,
        address: &str,
        device_type: DeviceType,
    ) -> impl Future<Output = Result<Self::Connection, ProtocolError>> + Send {
        async move {
            tracing::debug!(address = %address, device_type = %device_type, "Connecting to device");
            match device_type {
                DeviceType::Plug => self
                    .plug
                    .connect(address, device_type)
                    .await
                    .map(TypedConnection::Plug),
                DeviceType::Bulb => self
                    .bulb
                    .connect(address, device_type)
                    .await
                    .map(TypedConnection::Bulb),
            }
        }
    }
}

/// Connection produced by [`TypedConnector`].
#[derive(Debug)]
pub enum TypedConnection<P, B> {
    /// Connection to a plug.
    Plug(P),
    /// Connection to a bulb.
    Bulb(B),
}

impl<P, B> DeviceConnection for TypedConnection<P, B>
where
    P: DeviceConnection,
    B: DeviceConnection,
{
    fn set_power(&mut self, on: bool) -> impl Future<Output = Result<(), ProtocolError>> + Send {
        async move {
            match self {
                Self::Plug(conn) => conn.set_power(on).await,
                Self::Bulb(conn) => conn.set_power(on).await,
            }
        }
    }

    fn power_state(&mut self) -> impl Future<Output = Result<PowerState, ProtocolError>> + Send {
        async move {
            match self {
                Self::Plug(conn) => conn.power_state().await,
                Self::Bulb(conn) => conn.power_state().await,
            }
        }
    }

    fn close(self) -> impl Future<Output = ()> + Send {
        async move {
            match self {
                Self::Plug(conn) => conn.close().await,
                Self::Bulb(conn) => conn.close().await,
            }
        }
    }
}
