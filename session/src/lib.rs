//! Per-board session control: shared-state synchronization and signaling.
//!
//! A [`session::BoardSession`] is an explicit session object owned by the
//! board controller — created on board entry, disposed on exit, never a
//! process-wide singleton (two boards in one process must not cross-talk).
//! It is a synchronous state machine: local input, inbound channel signals,
//! and periodic ticks all mutate it from one driver task, so no locking is
//! needed and every handler runs to completion before the next.
//!
//! Data flows one way: inbound message → reducer → store mutation → effects
//! out to the host. Handlers never call back into each other mid-dispatch.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Session tunables and ICE server list |
//! | [`transport`] | Broadcast channel boundary trait and inbound signals |
//! | [`hub`] | In-process channel implementation (rooms, fan-out, presence) |
//! | [`peer`] | Peer-connection boundary traits |
//! | [`media`] | Media capture boundary traits |
//! | [`effect`] | Host-facing effects emitted by the session |
//! | [`share`] | Screen-share signaling state machine |
//! | [`voice`] | Voice-mesh signaling state machine |
//! | [`session`] | The board session reducer tying it all together |
//! | [`driver`] | Async task pumping signals/commands through a session |

pub mod config;
pub mod driver;
pub mod effect;
pub mod hub;
pub mod media;
pub mod peer;
pub mod session;
pub mod share;
pub mod transport;
pub mod voice;

#[cfg(test)]
pub(crate) mod testutil;
