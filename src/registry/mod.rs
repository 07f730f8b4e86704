// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Durable device registry.
//!
//! The registry is an ordered list of [`DeviceRecord`]s persisted as a
//! JSON array. It is the single source of truth for device metadata and
//! the last confirmed power state of every device.
//!
//! # File Format
//!
//! ```json
//! [
//!   {
//!     "id": "d1",
//!     "name": "Desk Lamp",
//!     "room": "Office",
//!     "type": "Plug",
//!     "ip": "10.0.0.5",
//!     "status": "off"
//!   }
//! ]
//! ```
//!
//! All access to the file goes through [`RegistryStore`], which
//! serializes every write.

mod store;

pub use store::{LoadedRegistry, RegistryStore};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::RegistryError;
use crate::types::{DeviceType, PowerState};

/// One physical device.
///
/// The id is fixed at construction; there is no setter for it, so a
/// registry mutation can never re-key a record.
///
/// # Examples
///
/// ```
/// use switchboard_lib::registry::DeviceRecord;
/// use switchboard_lib::types::{DeviceType, PowerState};
///
/// let record = DeviceRecord::new("d1", DeviceType::Plug, "10.0.0.5")
///     .with_name("Desk Lamp")
///     .with_room("Office");
/// assert_eq!(record.id(), "d1");
/// assert_eq!(record.status(), PowerState::Unknown);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    id: String,
    name: String,
    room: String,
    #[serde(rename = "type")]
    device_type: DeviceType,
    ip: String,
    status: PowerState,
    /// Keys this version does not know about, kept in file order.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl DeviceRecord {
    /// Creates a record with empty labels and an unknown status.
    #[must_use]
    pub fn new(id: impl Into<String>, device_type: DeviceType, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            room: String::new(),
            device_type,
            ip: ip.into(),
            status: PowerState::Unknown,
            extra: Map::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the room label.
    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    /// Sets the initial status.
    #[must_use]
    pub fn with_status(mut self, status: PowerState) -> Self {
        self.status = status;
        self
    }

    /// Returns the unique device id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the room label.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Returns the device kind.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Returns the network address.
    #[must_use]
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Returns the last confirmed power state.
    #[must_use]
    pub fn status(&self) -> PowerState {
        self.status
    }

    /// Records a confirmed power state.
    pub fn set_status(&mut self, status: PowerState) {
        self.status = status;
    }

    /// Updates the network address after the device moved.
    pub fn set_ip(&mut self, ip: impl Into<String>) {
        self.ip = ip.into();
    }
}

/// Ordered collection of device records with unique ids.
///
/// Deserialization rejects duplicate ids, so a file that breaks the
/// uniqueness invariant is reported as unreadable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<DeviceRecord>")]
pub struct Registry {
    devices: Vec<DeviceRecord>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record, keeping insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if a record with the same id
    /// already exists.
    pub fn insert(&mut self, record: DeviceRecord) -> Result<(), RegistryError> {
        if self.find_by_id(record.id()).is_some() {
            return Err(RegistryError::DuplicateId(record.id));
        }
        self.devices.push(record);
        Ok(())
    }

    /// Looks a record up by id.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub(crate) fn find_by_id_mut(&mut self, id: &str) -> Option<&mut DeviceRecord> {
        self.devices.iter_mut().find(|d| d.id == id)
    }

    /// Returns the records in registry order.
    #[must_use]
    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    /// Iterates over the records in registry order.
    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRecord> {
        self.devices.iter()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if the registry holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Consumes the registry, returning its records.
    #[must_use]
    pub fn into_devices(self) -> Vec<DeviceRecord> {
        self.devices
    }
}

impl TryFrom<Vec<DeviceRecord>> for Registry {
    type Error = RegistryError;

    fn try_from(devices: Vec<DeviceRecord>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for record in devices {
            registry.insert(record)?;
        }
        Ok(registry)
    }
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.devices.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a DeviceRecord;
    type IntoIter = std::slice::Iter<'a, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plug(id: &str) -> DeviceRecord {
        DeviceRecord::new(id, DeviceType::Plug, "10.0.0.5").with_status(PowerState::Off)
    }

    #[test]
    fn insert_preserves_order() {
        let mut registry = Registry::new();
        registry.insert(plug("b")).unwrap();
        registry.insert(plug("a")).unwrap();
        let ids: Vec<_> = registry.iter().map(DeviceRecord::id).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut registry = Registry::new();
        registry.insert(plug("d1")).unwrap();
        let err = registry.insert(plug("d1")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId(id) if id == "d1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deserialize_rejects_duplicate_ids() {
        let json = r#"[
            {"id":"d1","name":"","room":"","type":"Plug","ip":"1","status":"on"},
            {"id":"d1","name":"","room":"","type":"Bulb","ip":"2","status":"off"}
        ]"#;
        assert!(serde_json::from_str::<Registry>(json).is_err());
    }

    #[test]
    fn record_uses_type_key_and_keeps_unknown_fields() {
        let json = r#"{"id":"d1","name":"Lamp","room":"Den","type":"Bulb","ip":"10.0.0.7","status":"on","model":"LB100"}"#;
        let record: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.device_type(), DeviceType::Bulb);
        assert_eq!(record.status(), PowerState::On);

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["type"], "Bulb");
        assert_eq!(back["model"], "LB100");
    }

    #[test]
    fn find_by_id() {
        let registry = Registry::try_from(vec![plug("d1"), plug("d2")]).unwrap();
        assert_eq!(registry.find_by_id("d2").map(DeviceRecord::id), Some("d2"));
        assert!(registry.find_by_id("missing").is_none());
    }
}
