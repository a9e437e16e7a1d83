//! The effector execution unit.
//!
//! Polls the intelligence queue at a fixed interval, gates each packet,
//! decides countermeasures and publishes the resulting attack packet. The
//! poll itself is the task's only suspension point; a tick with no packet is
//! a normal, quiet cycle.

use chrono::Utc;
use std::time::Duration;

use radar_ew_bus::{BusError, EffectorEndpoint, GateCounters, GateDecision, PacketGate};
use thiserror::Error;

use crate::effector::EffectorLogic;
use crate::SimConfig;

/// Errors from one effector cycle.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EffectorCycleError {
    /// The bus is gone (a full queue is tolerated and counted instead).
    #[error("bus failure: {0}")]
    Bus(BusError),
}

/// The effector execution unit's private state.
pub struct EffectorWorker {
    logic: EffectorLogic,
    gate: PacketGate,
    endpoint: EffectorEndpoint,
    poll_interval: Duration,
    publish_timeout: Duration,
    decisions_published: u64,
}

impl EffectorWorker {
    /// Assemble the worker from the run configuration and the effector's bus
    /// endpoint.
    pub fn new(config: &SimConfig, endpoint: EffectorEndpoint) -> Self {
        Self {
            logic: EffectorLogic::new(config.effector, config.effector_id.clone()),
            gate: PacketGate::new(
                Duration::from_millis(config.staleness_threshold_ms),
                config.stale_policy,
            ),
            endpoint,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            publish_timeout: Duration::from_millis(config.publish_timeout_ms),
            decisions_published: 0,
        }
    }

    /// One poll/decide/publish cycle.
    ///
    /// Returns `Ok(true)` when a packet was consumed, `Ok(false)` on a quiet
    /// poll or a gated-out packet.
    pub fn run_cycle(&mut self) -> Result<bool, EffectorCycleError> {
        let Some(intel) = self.endpoint.recv_intel(self.poll_interval) else {
            return Ok(false);
        };

        match self.gate.gate_intel(&intel, Utc::now()) {
            GateDecision::Discard => Ok(false),
            GateDecision::Process | GateDecision::ProcessStale => {
                let attack = self.logic.decide(&intel);
                match self.endpoint.publish_attack(attack, self.publish_timeout) {
                    Ok(()) => {
                        self.decisions_published += 1;
                        Ok(true)
                    }
                    // Dropped feedback is tolerated: the sensor simply keeps
                    // its current picture for a tick.
                    Err(BusError::QueueFull { .. }) => Ok(true),
                    Err(err) => Err(EffectorCycleError::Bus(err)),
                }
            }
        }
    }

    /// Attack packets successfully enqueued.
    pub fn decisions_published(&self) -> u64 {
        self.decisions_published
    }

    /// Receiver-gate counters.
    pub fn gate_counters(&self) -> GateCounters {
        self.gate.counters()
    }
}
