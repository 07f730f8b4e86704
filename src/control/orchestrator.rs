// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control orchestrator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::audit::{AuditRecorder, ClientInfo};
use crate::config::EngineConfig;
use crate::error::{ControlError, DegradedCondition, PersistenceFailure, Result};
use crate::protocol::{DeviceConnection, DeviceConnector, bounded};
use crate::registry::{DeviceRecord, RegistryStore};
use crate::types::{ControlAction, PowerState};

use super::{ControlOutcome, ControlRequest, ControlStage, DeviceListing, StatusReport};

/// Drives devices and keeps the registry in sync with what they report.
///
/// The orchestrator holds no per-request state. It can be shared behind an
/// `Arc` and called concurrently; registry writes are serialized by the
/// [`RegistryStore`], device connections are opened per request.
///
/// Every confirmation is stamped with a sequence number when it completes.
/// A confirmation older than the one already persisted for the same device
/// is not written, so the registry always ends on the latest observation
/// even when requests for one device overlap.
///
/// # Examples
///
/// ```ignore
/// use switchboard_lib::audit::ClientInfo;
/// use switchboard_lib::control::{ControlOrchestrator, ControlRequest};
/// use switchboard_lib::protocol::TypedConnector;
/// use switchboard_lib::EngineConfig;
///
/// let engine = ControlOrchestrator::new(
///     EngineConfig::new("devices.json"),
///     TypedConnector::new(PlugConnector::default(), BulbConnector::default()),
/// );
///
/// let outcome = engine
///     .control(&ControlRequest::new("d1", "on"), &ClientInfo::unknown())
///     .await?;
/// println!("d1 is now {}", outcome.status());
/// ```
#[derive(Debug)]
pub struct ControlOrchestrator<C> {
    config: EngineConfig,
    connector: C,
    store: RegistryStore,
    recorder: AuditRecorder,
    last_degraded: RwLock<Option<DegradedCondition>>,
    /// Source of confirmation sequence numbers.
    confirmations: AtomicU64,
    /// Sequence number of the newest confirmation persisted per device.
    persisted: Mutex<HashMap<String, u64>>,
}

/// A device state observation, stamped in completion order.
#[derive(Debug, Clone, Copy)]
struct Confirmation {
    status: PowerState,
    seq: u64,
}

impl<C: DeviceConnector> ControlOrchestrator<C> {
    /// Creates an orchestrator using the registry and audit locations from
    /// `config`.
    #[must_use]
    pub fn new(config: EngineConfig, connector: C) -> Self {
        let store = RegistryStore::new(config.registry_path());
        let recorder = AuditRecorder::new(config.audit_dir());
        Self {
            config,
            connector,
            store,
            recorder,
            last_degraded: RwLock::new(None),
            confirmations: AtomicU64::new(0),
            persisted: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the protocol connector.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns the registry store.
    #[must_use]
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Returns the audit recorder.
    #[must_use]
    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    /// Returns the most recent degraded condition, if it has not cleared.
    ///
    /// A registry read failure clears on the next successful read; a
    /// persistence failure clears on the next successful write.
    #[must_use]
    pub fn last_degraded(&self) -> Option<DegradedCondition> {
        self.last_degraded.read().clone()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Lists all devices in registry order.
    ///
    /// Never fails: an unreadable registry yields an empty listing with
    /// the `RegistryUnavailable` condition attached.
    pub async fn list_devices(&self) -> DeviceListing {
        let loaded = self.store.load().await;
        let degraded = loaded.degraded();
        self.note_load(degraded.as_ref());
        let (registry, _) = loaded.into_parts();
        DeviceListing {
            devices: registry.into_devices(),
            degraded,
        }
    }

    /// Queries a device's live power state and records it in the registry.
    ///
    /// Same resolution, connection and persistence rules as
    /// [`control`](Self::control), without sending a command or waiting to
    /// settle. Status queries are not audited.
    ///
    /// # Errors
    ///
    /// Returns `RegistryUnavailable`, `DeviceNotFound`, `DeviceUnreachable`
    /// or `ConfirmationFailed`.
    #[tracing::instrument(skip_all, fields(device_id = %device_id))]
    pub async fn confirmed_status(&self, device_id: &str) -> Result<StatusReport> {
        let mut attempt = Attempt::new(device_id);
        let record = self.resolve(&mut attempt).await?;

        attempt.advance(ControlStage::Connecting);
        let mut connection = self.connect(&mut attempt, &record).await?;

        // Every path past a successful connect goes through this close.
        let observed = self.observe(&mut attempt, &mut connection).await;
        connection.close().await;
        let (status, persistence) = observed?;
        attempt.advance(ControlStage::Done);

        tracing::info!(device_id = %device_id, status = %status, "Live status confirmed");
        Ok(StatusReport {
            device_id: device_id.to_string(),
            status,
            persistence,
        })
    }

    /// Switches a device and returns its confirmed state.
    ///
    /// The attempt is audited whatever the result.
    ///
    /// # Errors
    ///
    /// Returns `RegistryUnavailable`, `DeviceNotFound`, `InvalidAction`,
    /// `DeviceUnreachable`, `CommandFailed` or `ConfirmationFailed`. A
    /// failed registry write after confirmation is not an error; it is
    /// reported through [`ControlOutcome::persistence_failure`].
    ///
    /// # Cancellation
    ///
    /// Dropping the returned future before it completes abandons the
    /// request where it stands: an open connection is dropped without
    /// [`DeviceConnection::close`] and no audit line is written. Callers
    /// that may be cancelled, such as request handlers, should run the call
    /// on its own task (`tokio::spawn`) and await the handle.
    #[tracing::instrument(
        skip_all,
        fields(device_id = %request.device_id, action = %request.action, client = %client.address())
    )]
    pub async fn control(
        &self,
        request: &ControlRequest,
        client: &ClientInfo,
    ) -> Result<ControlOutcome> {
        let result = self.execute(request).await;
        self.recorder
            .record(&request.audit_details(&result), client)
            .await;
        result
    }

    // =========================================================================
    // Stages
    // =========================================================================

    async fn execute(&self, request: &ControlRequest) -> Result<ControlOutcome> {
        let device_id = request.device_id.as_str();
        let mut attempt = Attempt::new(device_id);
        let record = self.resolve(&mut attempt).await?;

        let action = request.action.parse::<ControlAction>().map_err(|_| {
            attempt.fail(ControlError::InvalidAction {
                device_id: device_id.to_string(),
                action: request.action.clone(),
            })
        })?;

        attempt.advance(ControlStage::Connecting);
        let mut connection = self.connect(&mut attempt, &record).await?;

        // Every path past a successful connect goes through this close.
        let driven = self.drive(&mut attempt, &mut connection, action).await;
        connection.close().await;
        let (status, persistence) = driven?;
        attempt.advance(ControlStage::Done);

        if status == PowerState::from(action) {
            tracing::info!(device_id = %device_id, status = %status, "Device switched");
        } else {
            tracing::warn!(
                device_id = %device_id,
                requested = %action,
                status = %status,
                "Device acknowledged command but reports a different state"
            );
        }

        Ok(ControlOutcome {
            device_id: device_id.to_string(),
            action,
            status,
            persistence,
        })
    }

    async fn resolve(&self, attempt: &mut Attempt<'_>) -> Result<DeviceRecord> {
        let device_id = attempt.device_id;
        let loaded = self.store.load().await;
        let degraded = loaded.degraded();
        self.note_load(degraded.as_ref());

        let (registry, error) = loaded.into_parts();
        if let Some(source) = error {
            return Err(attempt.fail(ControlError::RegistryUnavailable {
                device_id: device_id.to_string(),
                source,
            }));
        }

        registry.find_by_id(device_id).cloned().ok_or_else(|| {
            attempt.fail(ControlError::DeviceNotFound {
                device_id: device_id.to_string(),
            })
        })
    }

    async fn connect(
        &self,
        attempt: &mut Attempt<'_>,
        record: &DeviceRecord,
    ) -> Result<C::Connection> {
        bounded(
            self.config.connect_timeout(),
            self.connector.connect(record.ip(), record.device_type()),
        )
        .await
        .map_err(|source| {
            attempt.fail(ControlError::DeviceUnreachable {
                device_id: record.id().to_string(),
                address: record.ip().to_string(),
                source,
            })
        })
    }

    /// Command, confirm and persist on an open connection.
    async fn drive(
        &self,
        attempt: &mut Attempt<'_>,
        connection: &mut C::Connection,
        action: ControlAction,
    ) -> Result<(PowerState, Option<PersistenceFailure>)> {
        let confirmation = self
            .command_and_confirm(attempt, connection, action)
            .await?;

        attempt.advance(ControlStage::Persisting);
        let persistence = self.persist_status(attempt.device_id, confirmation).await;
        Ok((confirmation.status, persistence))
    }

    /// Query and persist on an open connection, without commanding.
    async fn observe(
        &self,
        attempt: &mut Attempt<'_>,
        connection: &mut C::Connection,
    ) -> Result<(PowerState, Option<PersistenceFailure>)> {
        let device_id = attempt.device_id;

        attempt.advance(ControlStage::Confirming);
        let status = bounded(self.config.query_timeout(), connection.power_state())
            .await
            .map_err(|source| {
                attempt.fail(ControlError::ConfirmationFailed {
                    device_id: device_id.to_string(),
                    action: None,
                    source,
                })
            })?;
        let confirmation = self.stamp(status);

        attempt.advance(ControlStage::Persisting);
        let persistence = self.persist_status(device_id, confirmation).await;
        Ok((status, persistence))
    }

    async fn command_and_confirm(
        &self,
        attempt: &mut Attempt<'_>,
        connection: &mut C::Connection,
        action: ControlAction,
    ) -> Result<Confirmation> {
        let device_id = attempt.device_id;

        attempt.advance(ControlStage::Commanding);
        bounded(
            self.config.command_timeout(),
            connection.set_power(action.as_bool()),
        )
        .await
        .map_err(|source| {
            attempt.fail(ControlError::CommandFailed {
                device_id: device_id.to_string(),
                action,
                source,
            })
        })?;

        attempt.advance(ControlStage::Confirming);
        let status = self
            .config
            .settle_policy()
            .confirm(connection, action.into(), self.config.query_timeout())
            .await
            .map_err(|source| {
                attempt.fail(ControlError::ConfirmationFailed {
                    device_id: device_id.to_string(),
                    action: Some(action),
                    source,
                })
            })?;
        Ok(self.stamp(status))
    }

    fn stamp(&self, status: PowerState) -> Confirmation {
        Confirmation {
            status,
            seq: self.confirmations.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    /// Writes a confirmed state back, reporting rather than failing on error.
    ///
    /// Skips the write if a newer confirmation for the device is already
    /// persisted.
    async fn persist_status(
        &self,
        device_id: &str,
        confirmation: Confirmation,
    ) -> Option<PersistenceFailure> {
        let Confirmation { status, seq } = confirmation;
        let result = self
            .store
            .update_one_if(device_id, |record| {
                let mut persisted = self.persisted.lock();
                let latest = persisted.entry(device_id.to_string()).or_default();
                if *latest > seq {
                    return false;
                }
                *latest = seq;
                record.set_status(status);
                true
            })
            .await;

        match result {
            Ok((_, true)) => {
                *self.last_degraded.write() = None;
                None
            }
            Ok((stored, false)) => {
                tracing::debug!(
                    device_id = %device_id,
                    status = %status,
                    stored = %stored.status(),
                    "Newer confirmation already persisted, write skipped"
                );
                None
            }
            Err(e) => {
                let failure = PersistenceFailure {
                    device_id: device_id.to_string(),
                    status,
                    reason: e.to_string(),
                };
                tracing::error!(
                    device_id = %device_id,
                    status = %status,
                    error = %e,
                    "Confirmed state not persisted, registry and device disagree"
                );
                *self.last_degraded.write() =
                    Some(DegradedCondition::PersistenceFailed(failure.clone()));
                Some(failure)
            }
        }
    }

    fn note_load(&self, degraded: Option<&DegradedCondition>) {
        let mut last = self.last_degraded.write();
        match degraded {
            Some(condition) => *last = Some(condition.clone()),
            None => {
                if matches!(*last, Some(DegradedCondition::RegistryUnavailable { .. })) {
                    *last = None;
                }
            }
        }
    }
}

/// Stage tracker for one request.
struct Attempt<'a> {
    device_id: &'a str,
    stage: ControlStage,
}

impl<'a> Attempt<'a> {
    fn new(device_id: &'a str) -> Self {
        tracing::debug!(device_id = %device_id, stage = %ControlStage::Resolving, "Request started");
        Self {
            device_id,
            stage: ControlStage::Resolving,
        }
    }

    fn advance(&mut self, next: ControlStage) {
        tracing::debug!(device_id = %self.device_id, from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
    }

    /// Moves to the terminal failure state and hands the error back.
    fn fail(&mut self, error: ControlError) -> ControlError {
        let next = ControlStage::Failed(error.kind());
        tracing::warn!(
            device_id = %self.device_id,
            from = %self.stage,
            to = %next,
            error = %error,
            "Request failed"
        );
        self.stage = next;
        error
    }
}
