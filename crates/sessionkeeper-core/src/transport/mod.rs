//! Session transport capability interface.
//!
//! A transport owns the browser-automation session for one account. The
//! supervision layer never inspects it beyond this trait:
//!
//! - readiness (`is_ready`) and session presence (`has_session`)
//! - `initialize` / `destroy`, both async and safe to repeat
//! - an optional browser PID for process cleanup
//! - a broadcast stream of [`TransportEvent`]s
//!
//! Raw automation-layer messages are classified once, at the adapter, by
//! [`classify::classify_message`].

pub mod classify;
pub mod sidecar;

#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

use async_trait::async_trait;
use sessionkeeper_types::TransportError;
use tokio::sync::broadcast;

pub use classify::classify_message;
pub use sidecar::{SidecarEvent, SidecarTransport};

/// Capacity of per-transport event channels.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Asynchronous notification emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A new QR code must be scanned to link the device
    Qr(String),
    /// Session authenticated and usable
    Ready,
    /// Session dropped, with the transport-supplied reason
    Disconnected(String),
    /// Automation-layer failure, already classified
    Error(TransportError),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether the session is authenticated and connected.
    fn is_ready(&self) -> bool;

    /// Whether a session client currently exists (ready or not).
    fn has_session(&self) -> bool;

    /// Begin or resume the underlying session.
    async fn initialize(&self) -> Result<(), TransportError>;

    /// Tear the session down. Must be safe even if never initialized.
    async fn destroy(&self) -> Result<(), TransportError>;

    /// OS process id of the browser backing this session, if known.
    fn browser_pid(&self) -> Option<u32> {
        None
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}
