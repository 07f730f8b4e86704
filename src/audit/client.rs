// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request attribution supplied by the router.

/// Placeholder for attribution that was not supplied.
pub const UNKNOWN: &str = "Unknown";

/// Who issued a control request.
///
/// # Examples
///
/// ```
/// use switchboard_lib::audit::ClientInfo;
///
/// let client = ClientInfo::from_request(
///     None,
///     Some("::ffff:192.168.1.20"),
///     Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"),
/// );
/// assert_eq!(client.address(), "192.168.1.20");
/// assert_eq!(client.agent_token(), "(Windows NT 10.0; Win64; x64)");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    address: Option<String>,
    agent: Option<String>,
}

impl ClientInfo {
    /// Creates attribution from an address and a raw user agent.
    #[must_use]
    pub fn new(address: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            agent: Some(agent.into()),
        }
    }

    /// Attribution for a request with no client metadata.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Derives attribution from raw request metadata.
    ///
    /// A non-empty forwarded-for header wins verbatim; otherwise the socket
    /// address is used with any IPv4-mapped `::ffff:` prefix removed.
    #[must_use]
    pub fn from_request(
        forwarded_for: Option<&str>,
        remote_addr: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        let address = forwarded_for
            .filter(|header| !header.is_empty())
            .map(str::to_string)
            .or_else(|| {
                remote_addr.map(|addr| addr.strip_prefix("::ffff:").unwrap_or(addr).to_string())
            });

        Self {
            address,
            agent: user_agent.map(str::to_string),
        }
    }

    /// Returns the client address, or `Unknown`.
    #[must_use]
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(UNKNOWN)
    }

    /// Returns the raw user agent, if supplied.
    #[must_use]
    pub fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    /// Returns the compact attribution token stored in audit lines.
    ///
    /// This is the first parenthesised group of the user agent, kept with
    /// its parentheses, or `Unknown` when there is none.
    #[must_use]
    pub fn agent_token(&self) -> String {
        self.agent
            .as_deref()
            .and_then(platform_token)
            .map_or_else(|| UNKNOWN.to_string(), |token| format!("({token})"))
    }
}

/// Finds the first non-empty `(...)` group.
fn platform_token(agent: &str) -> Option<&str> {
    let mut rest = agent;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        match after.find(')')? {
            0 => rest = after,
            close => return Some(&after[..close]),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_wins() {
        let client =
            ClientInfo::from_request(Some("203.0.113.7, 10.0.0.1"), Some("10.0.0.1"), None);
        assert_eq!(client.address(), "203.0.113.7, 10.0.0.1");
    }

    #[test]
    fn empty_forwarded_for_falls_back_to_socket() {
        let client = ClientInfo::from_request(Some(""), Some("::ffff:10.0.0.9"), None);
        assert_eq!(client.address(), "10.0.0.9");
    }

    #[test]
    fn ipv6_socket_address_is_kept() {
        let client = ClientInfo::from_request(None, Some("fe80::1"), None);
        assert_eq!(client.address(), "fe80::1");
    }

    #[test]
    fn missing_metadata_is_unknown() {
        let client = ClientInfo::unknown();
        assert_eq!(client.address(), UNKNOWN);
        assert_eq!(client.agent_token(), UNKNOWN);
        assert!(client.agent().is_none());
    }

    #[test]
    fn agent_token_extraction() {
        let cases = [
            (
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Safari",
                "(iPhone; CPU iPhone OS 17_0 like Mac OS X)",
            ),
            ("curl/8.4.0", UNKNOWN),
            ("broken (no close", UNKNOWN),
            ("empty () then (Linux)", "(Linux)"),
            ("nested ((X) tail)", "((X)"),
        ];
        for (agent, expected) in cases {
            assert_eq!(
                ClientInfo::new("10.0.0.1", agent).agent_token(),
                expected,
                "agent: {agent}"
            );
        }
    }
}
