// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settle-and-confirm policies.
//!
//! Devices may acknowledge a power command before the relay has physically
//! switched. A [`SettlePolicy`] decides how long to wait before the state
//! query whose answer is trusted as the confirmed state.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::ProtocolError;
use crate::protocol::{DeviceConnection, bounded};
use crate::types::PowerState;

/// How to wait for a relay to settle after a command.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use switchboard_lib::control::SettlePolicy;
///
/// let fixed = SettlePolicy::default();
/// assert_eq!(fixed, SettlePolicy::Fixed(Duration::from_millis(500)));
///
/// let poll = SettlePolicy::poll(Duration::from_millis(100), Duration::from_secs(2));
/// assert_eq!(poll.max_settle(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Wait a fixed delay, then query once.
    Fixed(Duration),
    /// Query every `interval` until the relay reports the requested state
    /// or `max_wait` has elapsed; the last observation is the confirmed
    /// state either way.
    Poll {
        /// Delay before each query.
        interval: Duration,
        /// Upper bound on the total settle time.
        max_wait: Duration,
    },
}

impl SettlePolicy {
    /// Default settle delay.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

    /// Creates a poll-until-stable policy.
    #[must_use]
    pub const fn poll(interval: Duration, max_wait: Duration) -> Self {
        Self::Poll { interval, max_wait }
    }

    /// Returns the longest time spent waiting, excluding query time.
    #[must_use]
    pub fn max_settle(&self) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Poll { max_wait, .. } => *max_wait,
        }
    }

    /// Waits for the relay to settle and returns its observed state.
    ///
    /// Each query is bounded by `query_timeout`. The returned state is
    /// what the device reported, which may differ from `requested`.
    pub(crate) async fn confirm<C: DeviceConnection>(
        &self,
        connection: &mut C,
        requested: PowerState,
        query_timeout: Duration,
    ) -> Result<PowerState, ProtocolError> {
        match *self {
            Self::Fixed(delay) => {
                sleep(delay).await;
                bounded(query_timeout, connection.power_state()).await
            }
            Self::Poll { interval, max_wait } => {
                let deadline = Instant::now() + max_wait;
                loop {
                    sleep(interval).await;
                    let observed = bounded(query_timeout, connection.power_state()).await?;
                    if observed == requested || Instant::now() >= deadline {
                        return Ok(observed);
                    }
                    tracing::trace!(observed = %observed, requested = %requested, "Relay not settled yet");
                }
            }
        }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::Fixed(Self::DEFAULT_DELAY)
    }
}
