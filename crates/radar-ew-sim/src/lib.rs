//! # radar-ew-sim
//!
//! The engagement half of the radar/EW closed-loop simulation: multi-target
//! Kalman tracking with optimal association, the EW degradation model, the
//! effector decision logic, and the synchronized orchestrator with fail-safe
//! supervision that runs both roles as independent threads around the event
//! bus.
//!
//! ## Closed loop
//!
//! ```text
//!      ┌────────── sensor thread ──────────┐      ┌── effector thread ──┐
//! targets → synth → RD map → CFAR → track ─┼─intel─►  gate → decide     │
//!      ▲                                   │      │          │          │
//!      └── degradation ◄── gate ◄──attack──┼──────┼──────────┘          │
//!      └───────────────────────────────────┘      └─────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use radar_ew_sim::{SimConfig, Simulation};
//!
//! let config = SimConfig::builder().tick_rate_hz(50.0).seed(7).build();
//! let summary = Simulation::new(config)?.run(200)?;
//! println!("confirmed {} tracks", summary.confirmed_tracks);
//! # Ok::<(), radar_ew_sim::SimError>(())
//! ```

#![warn(missing_docs)]

pub mod classifier;
pub mod effector;
pub mod ew;
pub mod orchestrator;
pub mod threat;
pub mod tracking;

pub use classifier::HeuristicClassifier;
pub use effector::{EffectorConfig, EffectorLogic};
pub use ew::{DegradationModel, DegradationReport, EwConfig};
pub use orchestrator::{
    CfarKind, EffectorWorker, FrameClock, SensorPipeline, SimSummary, Simulation, SubsystemId,
    Supervisor, SupervisorConfig,
};
pub use threat::assess_threats;
pub use tracking::{LifecycleConfig, TrackManager, TrackerConfig};

use radar_ew_bus::{BusConfig, StalePacketPolicy};
use radar_ew_signal::{CfarConfig, SynthConfig, TargetTruth};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort or refuse a run.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SimError {
    /// The event bus could not be constructed, the only fatal runtime
    /// condition: without the bus nothing can be isolated.
    #[error("bus initialization failed: {reason}")]
    BusInit {
        /// Diagnostic for the rejected bus configuration.
        reason: String,
    },

    /// Rejected run configuration.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Diagnostic for the rejected value.
        reason: String,
    },

    /// A worker thread could not be spawned.
    #[error("thread spawn failed: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Full configuration of one closed-loop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Sensor identity stamped on intelligence packets.
    pub sensor_id: String,
    /// Effector identity stamped on attack packets.
    pub effector_id: String,
    /// Sensor tick rate in Hz.
    pub tick_rate_hz: f64,
    /// Waveform and receiver parameters.
    pub synth: SynthConfig,
    /// CFAR window parameters.
    pub cfar: CfarConfig,
    /// Which CFAR estimator to run.
    pub cfar_kind: CfarKind,
    /// Tracker parameters.
    pub tracker: TrackerConfig,
    /// EW effect limits.
    pub ew: EwConfig,
    /// Effector engagement rules.
    pub effector: EffectorConfig,
    /// Event-bus queue capacities.
    pub bus: BusConfig,
    /// Fail-safe thresholds.
    pub supervisor: SupervisorConfig,
    /// Effector poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Bus publish timeout in milliseconds.
    pub publish_timeout_ms: u64,
    /// Packet staleness threshold in milliseconds.
    pub staleness_threshold_ms: u64,
    /// What receivers do with stale packets.
    pub stale_policy: StalePacketPolicy,
    /// Bounded join timeout at shutdown, in milliseconds.
    pub join_timeout_ms: u64,
    /// RNG seed for synthesis and EW perturbations.
    pub seed: u64,
    /// Ground-truth targets in the scene.
    pub targets: Vec<TargetTruth>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sensor_id: "sensor-01".into(),
            effector_id: "effector-01".into(),
            tick_rate_hz: 20.0,
            synth: SynthConfig::default(),
            cfar: CfarConfig::default(),
            cfar_kind: CfarKind::CellAveraging,
            tracker: TrackerConfig::default(),
            ew: EwConfig::default(),
            effector: EffectorConfig::default(),
            bus: BusConfig::default(),
            supervisor: SupervisorConfig::default(),
            poll_interval_ms: 20,
            publish_timeout_ms: 5,
            staleness_threshold_ms: 500,
            stale_policy: StalePacketPolicy::Process,
            join_timeout_ms: 1000,
            seed: 1234,
            targets: vec![
                TargetTruth {
                    range_m: 1200.0,
                    velocity_mps: -45.0,
                    snr_db: 25.0,
                },
                TargetTruth {
                    range_m: 3500.0,
                    velocity_mps: 18.0,
                    snr_db: 20.0,
                },
            ],
        }
    }
}

impl SimConfig {
    /// Create a configuration builder.
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::default()
    }
}

/// Builder for [`SimConfig`].
#[derive(Debug, Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    /// Set the sensor tick rate in Hz (floored at 0.1).
    pub fn tick_rate_hz(mut self, hz: f64) -> Self {
        self.config.tick_rate_hz = hz.max(0.1);
        self
    }

    /// Set the RNG seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Replace the ground-truth target set.
    pub fn targets(mut self, targets: Vec<TargetTruth>) -> Self {
        self.config.targets = targets;
        self
    }

    /// Select the CFAR estimator.
    pub fn cfar_kind(mut self, kind: CfarKind) -> Self {
        self.config.cfar_kind = kind;
        self
    }

    /// Set the event-bus queue capacities.
    pub fn bus(mut self, bus: BusConfig) -> Self {
        self.config.bus = bus;
        self
    }

    /// Set the packet staleness threshold in milliseconds.
    pub fn staleness_threshold_ms(mut self, ms: u64) -> Self {
        self.config.staleness_threshold_ms = ms;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SimConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = SimConfig::builder()
            .tick_rate_hz(50.0)
            .seed(9)
            .cfar_kind(CfarKind::OrderedStatistic)
            .build();
        assert!((config.tick_rate_hz - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.seed, 9);
        assert_eq!(config.cfar_kind, CfarKind::OrderedStatistic);
    }

    #[test]
    fn tick_rate_is_floored() {
        let config = SimConfig::builder().tick_rate_hz(-5.0).build();
        assert!(config.tick_rate_hz > 0.0);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
