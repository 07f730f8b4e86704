// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power-related types.
//!
//! [`PowerState`] is what the registry stores and what a device reports.
//! [`ControlAction`] is what a caller may ask for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Power state of a device relay as last observed.
///
/// Serialized in lowercase (`"on"`, `"off"`, `"unknown"`) to match the
/// registry file format.
///
/// # Examples
///
/// ```
/// use switchboard_lib::types::PowerState;
///
/// assert_eq!(PowerState::On.as_str(), "on");
/// assert_eq!(PowerState::from(false), PowerState::Off);
/// assert!(PowerState::On.is_on());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// Relay is closed.
    On,
    /// Relay is open.
    Off,
    /// No confirmed observation exists yet.
    #[default]
    Unknown,
}

impl PowerState {
    /// Returns the registry string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Unknown => "unknown",
        }
    }

    /// Returns `true` if the relay is known to be on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "1" | "true" => Ok(Self::On),
            "off" | "0" | "false" => Ok(Self::Off),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ValueError::InvalidPowerState(s.to_string())),
        }
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<ControlAction> for PowerState {
    fn from(action: ControlAction) -> Self {
        match action {
            ControlAction::On => Self::On,
            ControlAction::Off => Self::Off,
        }
    }
}

/// A power command a caller may request.
///
/// Parsed from the router's raw action string; anything other than
/// `on`/`off` (case-insensitive) is rejected.
///
/// # Examples
///
/// ```
/// use switchboard_lib::types::ControlAction;
///
/// let action: ControlAction = "ON".parse().unwrap();
/// assert_eq!(action, ControlAction::On);
/// assert!(action.as_bool());
/// assert!("toggle".parse::<ControlAction>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Switch the relay on.
    On,
    /// Switch the relay off.
    Off,
}

impl ControlAction {
    /// Returns the lowercase action name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Returns the relay value to send: `true` for on.
    #[must_use]
    pub const fn as_bool(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlAction {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("on") {
            Ok(Self::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(Self::Off)
        } else {
            Err(ValueError::InvalidAction(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_state_as_str() {
        assert_eq!(PowerState::On.as_str(), "on");
        assert_eq!(PowerState::Off.as_str(), "off");
        assert_eq!(PowerState::Unknown.as_str(), "unknown");
    }

    #[test]
    fn power_state_from_str() {
        assert_eq!("ON".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!("off".parse::<PowerState>().unwrap(), PowerState::Off);
        assert_eq!("1".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!("false".parse::<PowerState>().unwrap(), PowerState::Off);
        assert!(matches!(
            "dim".parse::<PowerState>(),
            Err(ValueError::InvalidPowerState(_))
        ));
    }

    #[test]
    fn power_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PowerState::On).unwrap(), "\"on\"");
        let parsed: PowerState = serde_json::from_str("\"off\"").unwrap();
        assert_eq!(parsed, PowerState::Off);
        assert!(serde_json::from_str::<PowerState>("\"OFF\"").is_err());
    }

    #[test]
    fn power_state_from_bool_and_action() {
        assert_eq!(PowerState::from(true), PowerState::On);
        assert_eq!(PowerState::from(ControlAction::Off), PowerState::Off);
    }

    #[test]
    fn control_action_parses_case_insensitively() {
        assert_eq!("on".parse::<ControlAction>().unwrap(), ControlAction::On);
        assert_eq!("Off".parse::<ControlAction>().unwrap(), ControlAction::Off);
    }

    #[test]
    fn control_action_rejects_everything_else() {
        for raw in ["", "toggle", "1", "onn", " on"] {
            assert_eq!(
                raw.parse::<ControlAction>(),
                Err(ValueError::InvalidAction(raw.to_string()))
            );
        }
    }
}
