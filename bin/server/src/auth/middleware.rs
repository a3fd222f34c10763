//! Trusted-peer extractor for Axum.
//!
//! The server must only be reachable through the reverse proxy. Any caller
//! that is not in the configured peer list is rejected before the request
//! is looked at, so the OAuth client secret can't be exercised by someone
//! bypassing the proxy.

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::request::Parts,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::AppState;
use crate::error::AuthError;

/// Set of peer addresses allowed to call the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedPeers {
    addrs: Vec<IpAddr>,
}

impl TrustedPeers {
    #[must_use]
    pub fn new(addrs: Vec<IpAddr>) -> Self {
        Self {
            addrs: addrs.into_iter().map(|ip| ip.to_canonical()).collect(),
        }
    }

    /// Returns true if `ip` may call the server.
    ///
    /// IPv4-mapped IPv6 addresses are compared as their IPv4 form.
    #[must_use]
    pub fn allows(&self, ip: IpAddr) -> bool {
        self.addrs.contains(&ip.to_canonical())
    }
}

impl Default for TrustedPeers {
    fn default() -> Self {
        Self::new(vec![
            IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
        ])
    }
}

/// Extractor that only succeeds for trusted peers.
pub struct TrustedPeer(pub SocketAddr);

impl<S> FromRequestParts<S> for TrustedPeer
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr)
            .ok_or(AuthError::UntrustedPeer { peer: None })?;

        if !app_state.trusted_peers.allows(peer.ip()) {
            return Err(AuthError::UntrustedPeer { peer: Some(peer) });
        }

        Ok(TrustedPeer(peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_loopback_only() {
        let peers = TrustedPeers::default();

        assert!(peers.allows("127.0.0.1".parse().expect("ip")));
        assert!(peers.allows("::1".parse().expect("ip")));
        assert!(!peers.allows("10.0.0.1".parse().expect("ip")));
        assert!(!peers.allows("127.0.0.2".parse().expect("ip")));
    }

    #[test]
    fn mapped_ipv4_matches_ipv4_entry() {
        let peers = TrustedPeers::default();
        assert!(peers.allows("::ffff:127.0.0.1".parse().expect("ip")));
    }

    #[test]
    fn configured_peers_replace_defaults() {
        let peers = TrustedPeers::new(vec!["192.0.2.10".parse().expect("ip")]);

        assert!(peers.allows("192.0.2.10".parse().expect("ip")));
        assert!(!peers.allows("127.0.0.1".parse().expect("ip")));
    }
}
