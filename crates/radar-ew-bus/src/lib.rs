//! # radar-ew-bus
//!
//! The intelligence/feedback channel between the sensor and effector roles:
//! two independent bounded FIFO queues ([`IntelligencePacket`] one way,
//! [`AttackPacket`] the other), with non-blocking, timeout-bounded publish and
//! receive. A full queue drops the packet and counts it; the producing tick
//! is never stalled by a slow consumer, and the bus never retries.
//!
//! Receivers run their own [`PacketGate`] for schema validation and staleness
//! checks, and a [`DirectoryTransport`] offers a file-based alternative wire
//! for offline or cross-process runs.
//!
//! [`IntelligencePacket`]: radar_ew_core::IntelligencePacket
//! [`AttackPacket`]: radar_ew_core::AttackPacket

#![warn(missing_docs)]

pub mod bus;
pub mod gate;
pub mod transport;

pub use bus::{BusConfig, BusStats, BusStatsSnapshot, EffectorEndpoint, EventBus, SensorEndpoint};
pub use gate::{GateCounters, GateDecision, PacketGate, StalePacketPolicy};
pub use transport::DirectoryTransport;

use radar_ew_core::ValidationError;
use thiserror::Error;

/// Errors raised by the event bus and its transports.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BusError {
    /// The bus could not be constructed. This is the only fatal condition:
    /// without the bus nothing can be isolated.
    #[error("bus initialization failed: {reason}")]
    Init {
        /// Diagnostic for the rejected configuration.
        reason: String,
    },

    /// The destination queue was full within the publish timeout; the packet
    /// was dropped and counted. Never retried by the bus.
    #[error("queue '{direction}' full, packet dropped")]
    QueueFull {
        /// Which direction dropped ("intel" or "attack").
        direction: &'static str,
    },

    /// The far end of a queue is gone.
    #[error("queue '{direction}' disconnected")]
    Disconnected {
        /// Which direction was disconnected.
        direction: &'static str,
    },

    /// A received packet failed schema validation; rejected and counted.
    #[error("packet validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// File-transport I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File-transport encode/decode failure.
    #[error("transport serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BusError {
    /// Returns `true` if the run can continue after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Init { .. })
    }
}

/// A specialized `Result` for bus operations.
pub type BusResult<T> = Result<T, BusError>;
