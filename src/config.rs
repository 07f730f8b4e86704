// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::control::SettlePolicy;

/// Configuration for a [`ControlOrchestrator`](crate::control::ControlOrchestrator).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use switchboard_lib::EngineConfig;
/// use switchboard_lib::control::SettlePolicy;
///
/// // Defaults: ./devices.json, ./logs, 500 ms settle, 5 s step timeouts
/// let config = EngineConfig::default();
///
/// let config = EngineConfig::new("/var/lib/switchboard/devices.json")
///     .with_audit_dir("/var/log/switchboard")
///     .with_settle_policy(SettlePolicy::Fixed(Duration::from_millis(300)))
///     .with_timeouts(Duration::from_secs(2));
/// assert_eq!(config.connect_timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    registry_path: PathBuf,
    audit_dir: PathBuf,
    settle: SettlePolicy,
    connect_timeout: Duration,
    command_timeout: Duration,
    query_timeout: Duration,
}

impl EngineConfig {
    /// Default registry file.
    pub const DEFAULT_REGISTRY_PATH: &str = "devices.json";
    /// Default audit segment directory.
    pub const DEFAULT_AUDIT_DIR: &str = "logs";
    /// Default bound on each network step.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration for the registry file at `registry_path`.
    #[must_use]
    pub fn new(registry_path: impl Into<PathBuf>) -> Self {
        Self {
            registry_path: registry_path.into(),
            audit_dir: PathBuf::from(Self::DEFAULT_AUDIT_DIR),
            settle: SettlePolicy::default(),
            connect_timeout: Self::DEFAULT_TIMEOUT,
            command_timeout: Self::DEFAULT_TIMEOUT,
            query_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the audit segment directory.
    #[must_use]
    pub fn with_audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = dir.into();
        self
    }

    /// Sets how to wait for a relay to settle before confirming.
    #[must_use]
    pub fn with_settle_policy(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    /// Sets the connect bound.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the power command bound.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the state query bound.
    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the same bound on every network step.
    #[must_use]
    pub fn with_timeouts(self, timeout: Duration) -> Self {
        self.with_connect_timeout(timeout)
            .with_command_timeout(timeout)
            .with_query_timeout(timeout)
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Returns the audit segment directory.
    #[must_use]
    pub fn audit_dir(&self) -> &Path {
        &self.audit_dir
    }

    /// Returns the settle policy.
    #[must_use]
    pub fn settle_policy(&self) -> SettlePolicy {
        self.settle
    }

    /// Returns the connect bound.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the power command bound.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns the state query bound.
    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Returns the worst-case duration of one control request's network
    /// phase: connect, command, settle and confirmation query.
    #[must_use]
    pub fn worst_case_latency(&self) -> Duration {
        let queries = match self.settle {
            SettlePolicy::Fixed(_) => self.query_timeout,
            SettlePolicy::Poll { interval, .. } => self.query_timeout + interval,
        };
        self.connect_timeout + self.command_timeout + self.settle.max_settle() + queries
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REGISTRY_PATH)
    }
}
