//! The bounded two-directional event bus.
//!
//! One [`EventBus`] is constructed by the orchestrator at startup and split
//! into role endpoints that are handed to the sensor and effector tasks
//! (dependency injection; there is no global bus). Each queue has exactly one
//! writer and one reader; the endpoints encode that discipline in the type
//! system.
//!
//! Delivery is at-most-once: a packet that does not fit within the publish
//! timeout is dropped, counted, and never retried. FIFO order holds within
//! one direction; nothing is guaranteed across directions.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use radar_ew_core::{AttackPacket, IntelligencePacket};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{BusError, BusResult};

/// Queue capacities for the two directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Capacity of the sensor→effector intelligence queue.
    pub intel_capacity: usize,
    /// Capacity of the effector→sensor attack queue.
    pub attack_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            intel_capacity: 100,
            attack_capacity: 100,
        }
    }
}

/// Shared per-direction delivery counters.
#[derive(Debug, Default)]
pub struct BusStats {
    intel_published: AtomicU64,
    intel_dropped: AtomicU64,
    intel_delivered: AtomicU64,
    attack_published: AtomicU64,
    attack_dropped: AtomicU64,
    attack_delivered: AtomicU64,
}

/// Point-in-time copy of the bus counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStatsSnapshot {
    /// Intelligence packets accepted into the queue.
    pub intel_published: u64,
    /// Intelligence packets dropped on a full queue.
    pub intel_dropped: u64,
    /// Intelligence packets handed to the consumer.
    pub intel_delivered: u64,
    /// Attack packets accepted into the queue.
    pub attack_published: u64,
    /// Attack packets dropped on a full queue.
    pub attack_dropped: u64,
    /// Attack packets handed to the consumer.
    pub attack_delivered: u64,
}

impl BusStats {
    /// Copy the counters.
    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            intel_published: self.intel_published.load(Ordering::Relaxed),
            intel_dropped: self.intel_dropped.load(Ordering::Relaxed),
            intel_delivered: self.intel_delivered.load(Ordering::Relaxed),
            attack_published: self.attack_published.load(Ordering::Relaxed),
            attack_dropped: self.attack_dropped.load(Ordering::Relaxed),
            attack_delivered: self.attack_delivered.load(Ordering::Relaxed),
        }
    }
}

/// The bus itself; split into endpoints before use.
pub struct EventBus {
    intel_tx: Sender<IntelligencePacket>,
    intel_rx: Receiver<IntelligencePacket>,
    attack_tx: Sender<AttackPacket>,
    attack_rx: Receiver<AttackPacket>,
    stats: Arc<BusStats>,
}

impl EventBus {
    /// Build the bus. Zero capacity on either queue is rejected; a
    /// rendezvous queue would let a slow consumer stall the producer tick.
    pub fn new(config: BusConfig) -> BusResult<Self> {
        if config.intel_capacity == 0 || config.attack_capacity == 0 {
            return Err(BusError::Init {
                reason: format!(
                    "queue capacities must be nonzero (intel={}, attack={})",
                    config.intel_capacity, config.attack_capacity
                ),
            });
        }
        let (intel_tx, intel_rx) = bounded(config.intel_capacity);
        let (attack_tx, attack_rx) = bounded(config.attack_capacity);
        Ok(Self {
            intel_tx,
            intel_rx,
            attack_tx,
            attack_rx,
            stats: Arc::new(BusStats::default()),
        })
    }

    /// Shared counter handle, for reporting outside either role.
    pub fn stats(&self) -> Arc<BusStats> {
        Arc::clone(&self.stats)
    }

    /// Split into the two role endpoints, consuming the bus so each queue
    /// ends up with exactly one writer and one reader.
    pub fn split(self) -> (SensorEndpoint, EffectorEndpoint) {
        let sensor = SensorEndpoint {
            intel_tx: self.intel_tx,
            attack_rx: self.attack_rx,
            stats: Arc::clone(&self.stats),
        };
        let effector = EffectorEndpoint {
            intel_rx: self.intel_rx,
            attack_tx: self.attack_tx,
            stats: self.stats,
        };
        (sensor, effector)
    }
}

/// Sensor-side endpoint: publishes intelligence, polls for attack feedback.
pub struct SensorEndpoint {
    intel_tx: Sender<IntelligencePacket>,
    attack_rx: Receiver<AttackPacket>,
    stats: Arc<BusStats>,
}

impl SensorEndpoint {
    /// Publish the tactical picture without ever blocking past `timeout`.
    ///
    /// A full queue drops the packet, bumps the drop counter and returns
    /// [`BusError::QueueFull`]; the caller decides whether that matters.
    pub fn publish_intel(
        &self,
        packet: IntelligencePacket,
        timeout: Duration,
    ) -> BusResult<()> {
        // Fast path first; fall back to a bounded wait only when full.
        let packet = match self.intel_tx.try_send(packet) {
            Ok(()) => {
                self.stats.intel_published.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(BusError::Disconnected { direction: "intel" });
            }
            Err(TrySendError::Full(p)) => p,
        };
        match self.intel_tx.send_timeout(packet, timeout) {
            Ok(()) => {
                self.stats.intel_published.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(crossbeam_channel::SendTimeoutError::Timeout(_)) => {
                self.stats.intel_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("intel queue full, packet dropped");
                Err(BusError::QueueFull { direction: "intel" })
            }
            Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => {
                Err(BusError::Disconnected { direction: "intel" })
            }
        }
    }

    /// Pop the next attack packet, waiting at most `timeout`.
    pub fn recv_attack(&self, timeout: Duration) -> Option<AttackPacket> {
        match self.attack_rx.recv_timeout(timeout) {
            Ok(packet) => {
                self.stats.attack_delivered.fetch_add(1, Ordering::Relaxed);
                Some(packet)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Non-blocking poll for an attack packet.
    pub fn try_recv_attack(&self) -> Option<AttackPacket> {
        let packet = self.attack_rx.try_recv().ok()?;
        self.stats.attack_delivered.fetch_add(1, Ordering::Relaxed);
        Some(packet)
    }

    /// Current counters.
    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Effector-side endpoint: polls intelligence, publishes attack feedback.
pub struct EffectorEndpoint {
    intel_rx: Receiver<IntelligencePacket>,
    attack_tx: Sender<AttackPacket>,
    stats: Arc<BusStats>,
}

impl EffectorEndpoint {
    /// Pop the next intelligence packet, waiting at most `timeout`.
    pub fn recv_intel(&self, timeout: Duration) -> Option<IntelligencePacket> {
        match self.intel_rx.recv_timeout(timeout) {
            Ok(packet) => {
                self.stats.intel_delivered.fetch_add(1, Ordering::Relaxed);
                Some(packet)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Non-blocking poll for an intelligence packet.
    pub fn try_recv_intel(&self) -> Option<IntelligencePacket> {
        let packet = self.intel_rx.try_recv().ok()?;
        self.stats.intel_delivered.fetch_add(1, Ordering::Relaxed);
        Some(packet)
    }

    /// Publish countermeasure feedback without ever blocking past `timeout`.
    pub fn publish_attack(&self, packet: AttackPacket, timeout: Duration) -> BusResult<()> {
        let packet = match self.attack_tx.try_send(packet) {
            Ok(()) => {
                self.stats.attack_published.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(BusError::Disconnected { direction: "attack" });
            }
            Err(TrySendError::Full(p)) => p,
        };
        match self.attack_tx.send_timeout(packet, timeout) {
            Ok(()) => {
                self.stats.attack_published.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(crossbeam_channel::SendTimeoutError::Timeout(_)) => {
                self.stats.attack_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("attack queue full, packet dropped");
                Err(BusError::QueueFull { direction: "attack" })
            }
            Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => {
                Err(BusError::Disconnected { direction: "attack" })
            }
        }
    }

    /// Current counters.
    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use radar_ew_core::SceneContext;

    fn intel(frame_id: u64) -> IntelligencePacket {
        IntelligencePacket {
            frame_id,
            sensor_id: "sensor-test".into(),
            timestamp: Utc::now(),
            tracks: vec![],
            threat_assessments: vec![],
            scene_context: SceneContext::default(),
            overall_confidence: 0.5,
        }
    }

    fn attack() -> AttackPacket {
        AttackPacket {
            effector_id: "effector-test".into(),
            timestamp: Utc::now(),
            countermeasures: vec![],
            engagement_status: vec![],
            overall_effectiveness: 0.0,
            decision_confidence: 0.5,
            expected_impact: 0.0,
        }
    }

    #[test]
    fn zero_capacity_is_init_failure() {
        let err = EventBus::new(BusConfig {
            intel_capacity: 0,
            attack_capacity: 100,
        })
        .err()
        .unwrap();
        assert!(matches!(err, BusError::Init { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn overflow_drops_exactly_the_excess() {
        let bus = EventBus::new(BusConfig {
            intel_capacity: 100,
            attack_capacity: 10,
        })
        .unwrap();
        let (sensor, _effector) = bus.split();

        let mut enqueued = 0u64;
        let mut dropped = 0u64;
        for frame in 0..101 {
            match sensor.publish_intel(intel(frame), Duration::from_millis(1)) {
                Ok(()) => enqueued += 1,
                Err(BusError::QueueFull { .. }) => dropped += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(enqueued, 100);
        assert_eq!(dropped, 1);
        assert_eq!(sensor.stats().intel_dropped, 1);
        assert_eq!(sensor.stats().intel_published, 100);
    }

    #[test]
    fn fifo_order_within_a_direction() {
        let bus = EventBus::new(BusConfig::default()).unwrap();
        let (sensor, effector) = bus.split();

        for frame in 0..5 {
            sensor
                .publish_intel(intel(frame), Duration::from_millis(1))
                .unwrap();
        }
        for expected in 0..5 {
            let got = effector.recv_intel(Duration::from_millis(10)).unwrap();
            assert_eq!(got.frame_id, expected);
        }
    }

    #[test]
    fn recv_times_out_empty() {
        let bus = EventBus::new(BusConfig::default()).unwrap();
        let (sensor, effector) = bus.split();

        assert!(effector.recv_intel(Duration::from_millis(5)).is_none());
        assert!(sensor.recv_attack(Duration::from_millis(5)).is_none());
        assert!(sensor.try_recv_attack().is_none());
    }

    #[test]
    fn both_directions_flow_independently() {
        let bus = EventBus::new(BusConfig::default()).unwrap();
        let (sensor, effector) = bus.split();

        sensor
            .publish_intel(intel(1), Duration::from_millis(1))
            .unwrap();
        effector
            .publish_attack(attack(), Duration::from_millis(1))
            .unwrap();

        assert!(effector.try_recv_intel().is_some());
        assert!(sensor.try_recv_attack().is_some());

        let stats = sensor.stats();
        assert_eq!(stats.intel_delivered, 1);
        assert_eq!(stats.attack_delivered, 1);
    }
}
