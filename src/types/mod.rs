// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for device control.
//!
//! # Types
//!
//! - [`PowerState`] - On/Off/Unknown as stored in the registry
//! - [`ControlAction`] - On/Off as requested by a caller
//! - [`DeviceType`] - Plug/Bulb, selects the protocol variant

mod device_type;
mod power;

pub use device_type::DeviceType;
pub use power::{ControlAction, PowerState};
