//! Session tunables.

use std::time::Duration;

/// A STUN/TURN server entry handed to peer-connection implementations.
/// The default list is STUN-only; without a TURN relay the mesh may fail
/// across symmetric NATs, a known limitation.
#[derive(Debug, Clone)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Tunables for one board session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a signaling exchange may sit without completing before the
    /// pending connection is torn down.
    pub negotiation_timeout: Duration,
    /// Maximum document mutations queued while the channel is disconnected.
    /// Overflow drops the oldest entry.
    pub outbound_queue_limit: usize,
    /// Capacity of per-client inbound signal channels.
    pub channel_capacity: usize,
    /// ICE servers for NAT traversal.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Duration::from_secs(10),
            outbound_queue_limit: 256,
            channel_capacity: 256,
            ice_servers: vec![IceServerConfig {
                urls: vec!["stun:stun.l.google.com:19302".into()],
                username: None,
                credential: None,
            }],
        }
    }
}
