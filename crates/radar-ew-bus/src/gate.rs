//! Receiver-side packet gate: schema validation and staleness checks.
//!
//! The bus delivers whatever was published; every receiver runs its own gate
//! before acting on a packet. Invalid packets are rejected and counted. Stale
//! packets are flagged and counted, and configured policy decides whether
//! they are still processed. Neither condition is fatal.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use radar_ew_core::{AttackPacket, IntelligencePacket};
use serde::{Deserialize, Serialize};

/// What to do with a packet that is older than the staleness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StalePacketPolicy {
    /// Process it anyway (flag and count only).
    Process,
    /// Drop it (count only).
    Discard,
}

/// Outcome of gating one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Fresh and valid: process normally.
    Process,
    /// Valid but stale, and policy says process.
    ProcessStale,
    /// Rejected (invalid, or stale under a discard policy).
    Discard,
}

/// Running rejection counters for one receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCounters {
    /// Packets that failed schema validation.
    pub validation_failures: u64,
    /// Packets older than the staleness threshold.
    pub stale_packets: u64,
    /// Packets discarded (either cause).
    pub discarded: u64,
}

/// Per-receiver validation and staleness gate.
#[derive(Debug)]
pub struct PacketGate {
    staleness_threshold: ChronoDuration,
    policy: StalePacketPolicy,
    counters: GateCounters,
}

impl PacketGate {
    /// Build a gate with the given staleness threshold.
    pub fn new(staleness_threshold: std::time::Duration, policy: StalePacketPolicy) -> Self {
        Self {
            staleness_threshold: ChronoDuration::from_std(staleness_threshold)
                .unwrap_or_else(|_| ChronoDuration::seconds(3600)),
            policy,
            counters: GateCounters::default(),
        }
    }

    /// Gate an intelligence packet received at `reception_time`.
    pub fn gate_intel(
        &mut self,
        packet: &IntelligencePacket,
        reception_time: DateTime<Utc>,
    ) -> GateDecision {
        if let Err(err) = packet.validate() {
            self.counters.validation_failures += 1;
            self.counters.discarded += 1;
            tracing::warn!(frame = packet.frame_id, %err, "invalid intelligence packet rejected");
            return GateDecision::Discard;
        }
        self.staleness_decision(packet.timestamp, reception_time)
    }

    /// Gate an attack packet received at `reception_time`.
    pub fn gate_attack(
        &mut self,
        packet: &AttackPacket,
        reception_time: DateTime<Utc>,
    ) -> GateDecision {
        if let Err(err) = packet.validate() {
            self.counters.validation_failures += 1;
            self.counters.discarded += 1;
            tracing::warn!(effector = %packet.effector_id, %err, "invalid attack packet rejected");
            return GateDecision::Discard;
        }
        self.staleness_decision(packet.timestamp, reception_time)
    }

    fn staleness_decision(
        &mut self,
        sent: DateTime<Utc>,
        received: DateTime<Utc>,
    ) -> GateDecision {
        let age = received - sent;
        if age <= self.staleness_threshold {
            return GateDecision::Process;
        }
        self.counters.stale_packets += 1;
        tracing::debug!(age_ms = age.num_milliseconds(), "stale packet");
        match self.policy {
            StalePacketPolicy::Process => GateDecision::ProcessStale,
            StalePacketPolicy::Discard => {
                self.counters.discarded += 1;
                GateDecision::Discard
            }
        }
    }

    /// Current counters.
    pub fn counters(&self) -> GateCounters {
        self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_ew_core::SceneContext;
    use std::time::Duration;

    fn intel_at(timestamp: DateTime<Utc>) -> IntelligencePacket {
        IntelligencePacket {
            frame_id: 1,
            sensor_id: "sensor".into(),
            timestamp,
            tracks: vec![],
            threat_assessments: vec![],
            scene_context: SceneContext::default(),
            overall_confidence: 0.9,
        }
    }

    #[test]
    fn fresh_valid_packet_passes() {
        let mut gate = PacketGate::new(Duration::from_secs(2), StalePacketPolicy::Discard);
        let now = Utc::now();
        assert_eq!(gate.gate_intel(&intel_at(now), now), GateDecision::Process);
        assert_eq!(gate.counters().validation_failures, 0);
    }

    #[test]
    fn invalid_packet_is_counted_and_discarded() {
        let mut gate = PacketGate::new(Duration::from_secs(2), StalePacketPolicy::Process);
        let now = Utc::now();
        let mut packet = intel_at(now);
        packet.sensor_id.clear();

        assert_eq!(gate.gate_intel(&packet, now), GateDecision::Discard);
        assert_eq!(gate.counters().validation_failures, 1);
        assert_eq!(gate.counters().discarded, 1);
    }

    #[test]
    fn stale_packet_processed_under_process_policy() {
        let mut gate = PacketGate::new(Duration::from_secs(1), StalePacketPolicy::Process);
        let sent = Utc::now() - ChronoDuration::seconds(5);
        let packet = intel_at(sent);

        assert_eq!(
            gate.gate_intel(&packet, Utc::now()),
            GateDecision::ProcessStale
        );
        assert_eq!(gate.counters().stale_packets, 1);
        assert_eq!(gate.counters().discarded, 0);
    }

    #[test]
    fn stale_packet_dropped_under_discard_policy() {
        let mut gate = PacketGate::new(Duration::from_secs(1), StalePacketPolicy::Discard);
        let sent = Utc::now() - ChronoDuration::seconds(5);
        let packet = intel_at(sent);

        assert_eq!(gate.gate_intel(&packet, Utc::now()), GateDecision::Discard);
        assert_eq!(gate.counters().stale_packets, 1);
        assert_eq!(gate.counters().discarded, 1);
    }
}
