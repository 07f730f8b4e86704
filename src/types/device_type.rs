// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device kind selecting the protocol variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Kind of physical device.
///
/// Plugs and bulbs speak different dialects of the local control
/// protocol, so the kind decides which connector variant handles a
/// record. Serialized as `"Plug"` / `"Bulb"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Smart plug with a single relay.
    Plug,
    /// Smart bulb.
    Bulb,
}

impl DeviceType {
    /// Returns the registry string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plug => "Plug",
            Self::Bulb => "Bulb",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Plug" => Ok(Self::Plug),
            "Bulb" => Ok(Self::Bulb),
            _ => Err(ValueError::InvalidDeviceType(s.to_string())),
        }
    }
}
