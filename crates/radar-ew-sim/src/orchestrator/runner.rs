//! The synchronized closed-loop runner.
//!
//! Spawns the sensor and effector as independent threads, each owning its
//! private state; the only shared resources are the bus endpoints and the
//! supervisor registry. The sensor thread drives the frame clock for the
//! requested number of ticks; the effector thread polls until told to stop.
//! Shutdown is cooperative (an atomic stop flag) and joins are bounded.

use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use radar_ew_bus::{BusError, BusStatsSnapshot, EventBus, GateCounters};
use radar_ew_core::SubsystemStatus;
use serde::{Deserialize, Serialize};

use super::clock::FrameClock;
use super::effector_task::EffectorWorker;
use super::sensor::SensorPipeline;
use super::supervisor::{Supervisor, SubsystemId};
use crate::classifier::HeuristicClassifier;
use crate::{SimConfig, SimError};

/// End-of-run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSummary {
    /// Sensor ticks actually executed.
    pub ticks: u64,
    /// Sensor frames that published an intelligence packet.
    pub frames_published: u64,
    /// Confirmed tracks at the end of the run.
    pub confirmed_tracks: usize,
    /// Live tracks at the end of the run.
    pub live_tracks: usize,
    /// Bus delivery counters.
    pub bus: BusStatsSnapshot,
    /// Final health of every subsystem.
    pub health: Vec<SubsystemStatus>,
    /// Sensor-side gate counters.
    pub sensor_gate: GateCounters,
    /// Effector-side gate counters.
    pub effector_gate: GateCounters,
    /// Attack decisions the effector published.
    pub effector_decisions: u64,
}

struct SensorOutcome {
    ticks: u64,
    frames_published: u64,
    confirmed_tracks: usize,
    live_tracks: usize,
    gate: GateCounters,
}

struct EffectorOutcome {
    decisions: u64,
    gate: GateCounters,
}

/// Owns one closed-loop run.
pub struct Simulation {
    config: SimConfig,
}

impl Simulation {
    /// Validate the configuration and prepare a run.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        if config.tick_rate_hz <= 0.0 {
            return Err(SimError::Config {
                reason: format!("tick rate must be positive, got {}", config.tick_rate_hz),
            });
        }
        Ok(Self { config })
    }

    /// Run the closed loop for `num_ticks` sensor ticks.
    ///
    /// The only fatal condition is failing to construct the bus; every other
    /// failure degrades subsystem health and the run completes with the
    /// degradation visible in the summary.
    pub fn run(&self, num_ticks: u64) -> Result<SimSummary, SimError> {
        let bus = EventBus::new(self.config.bus).map_err(|err| match err {
            BusError::Init { reason } => SimError::BusInit { reason },
            other => SimError::BusInit {
                reason: other.to_string(),
            },
        })?;
        let bus_stats = bus.stats();
        let (sensor_ep, effector_ep) = bus.split();

        let supervisor = Arc::new(Supervisor::new(self.config.supervisor));
        let stop = Arc::new(AtomicBool::new(false));
        let tick_period = Duration::from_secs_f64(1.0 / self.config.tick_rate_hz);

        tracing::info!(
            ticks = num_ticks,
            rate_hz = self.config.tick_rate_hz,
            targets = self.config.targets.len(),
            "starting closed-loop run"
        );

        // ----------------------------------------------------------------
        // Effector thread
        // ----------------------------------------------------------------
        let (effector_done_tx, effector_done_rx) = crossbeam_channel::bounded(1);
        let effector_handle = {
            let config = self.config.clone();
            let supervisor = Arc::clone(&supervisor);
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("effector".into())
                .spawn(move || {
                    let mut worker = EffectorWorker::new(&config, effector_ep);
                    let idle = Duration::from_millis(config.poll_interval_ms);
                    while !stop.load(Ordering::Relaxed) {
                        if !supervisor.begin_tick(SubsystemId::Effector) {
                            // Paused or disabled: stay parked, stay cheap.
                            std::thread::sleep(idle);
                            continue;
                        }
                        match worker.run_cycle() {
                            Ok(_) => supervisor.record_success(SubsystemId::Effector),
                            Err(err) => {
                                supervisor
                                    .record_failure(SubsystemId::Effector, &err.to_string());
                            }
                        }
                    }
                    let outcome = EffectorOutcome {
                        decisions: worker.decisions_published(),
                        gate: worker.gate_counters(),
                    };
                    let _ = effector_done_tx.send(outcome);
                })
                .map_err(SimError::ThreadSpawn)?
        };

        // ----------------------------------------------------------------
        // Sensor thread
        // ----------------------------------------------------------------
        let (sensor_done_tx, sensor_done_rx) = crossbeam_channel::bounded(1);
        let sensor_handle = {
            let config = self.config.clone();
            let supervisor = Arc::clone(&supervisor);
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("sensor".into())
                .spawn(move || {
                    let pipeline =
                        SensorPipeline::new(&config, sensor_ep, Box::new(HeuristicClassifier::new()));
                    let mut pipeline = match pipeline {
                        Ok(p) => p,
                        Err(err) => {
                            supervisor.record_failure(SubsystemId::Sensor, &err.to_string());
                            let _ = sensor_done_tx.send(SensorOutcome {
                                ticks: 0,
                                frames_published: 0,
                                confirmed_tracks: 0,
                                live_tracks: 0,
                                gate: GateCounters::default(),
                            });
                            return;
                        }
                    };

                    let mut clock = FrameClock::new(tick_period);
                    let mut ticks = 0u64;
                    let mut frames_published = 0u64;
                    for _ in 0..num_ticks {
                        if stop.load(Ordering::Relaxed) {
                            break;
                        }
                        let tick = clock.wait_next_tick();
                        if let Some(overrun) = tick.overrun {
                            tracing::warn!(
                                tick = tick.index,
                                overrun_us = overrun.as_micros() as u64,
                                "sensor tick missed its deadline"
                            );
                        }
                        if !supervisor.begin_tick(SubsystemId::Sensor) {
                            continue;
                        }
                        ticks += 1;
                        match pipeline.tick() {
                            Ok(report) => {
                                if report.published {
                                    frames_published += 1;
                                }
                                supervisor.record_success(SubsystemId::Sensor);
                            }
                            Err(err) => {
                                supervisor.record_failure(SubsystemId::Sensor, &err.to_string());
                            }
                        }
                    }

                    let _ = sensor_done_tx.send(SensorOutcome {
                        ticks,
                        frames_published,
                        confirmed_tracks: pipeline.tracker().confirmed_count(),
                        live_tracks: pipeline.tracker().live_count(),
                        gate: pipeline.gate_counters(),
                    });
                })
                .map_err(SimError::ThreadSpawn)?
        };

        // ----------------------------------------------------------------
        // Wait for the sensor to finish its tick budget, then stop the loop.
        // ----------------------------------------------------------------
        let run_budget = tick_period
            .mul_f64(num_ticks as f64)
            .saturating_add(Duration::from_secs(30));
        let sensor_outcome = match sensor_done_rx.recv_timeout(run_budget) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                tracing::error!("sensor task did not finish within its budget");
                None
            }
        };

        stop.store(true, Ordering::Relaxed);

        let join_timeout = Duration::from_millis(self.config.join_timeout_ms);
        let effector_outcome = match effector_done_rx.recv_timeout(join_timeout) {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                tracing::warn!("effector task did not stop within the join timeout");
                None
            }
        };

        // Joins are bounded: the done-channels already synchronized with task
        // exit, so a join only runs when it cannot block meaningfully. A task
        // that failed to report is left detached and logged, never waited on.
        // A panicked task is logged, never propagated.
        if sensor_outcome.is_some() {
            if sensor_handle.join().is_err() {
                tracing::error!("sensor thread panicked");
            }
        } else {
            drop(sensor_handle);
        }
        if effector_outcome.is_some() {
            if effector_handle.join().is_err() {
                tracing::error!("effector thread panicked");
            }
        } else {
            drop(effector_handle);
        }

        let sensor_outcome = sensor_outcome.unwrap_or(SensorOutcome {
            ticks: 0,
            frames_published: 0,
            confirmed_tracks: 0,
            live_tracks: 0,
            gate: GateCounters::default(),
        });

        let (effector_decisions, effector_gate) = effector_outcome
            .map(|o| (o.decisions, o.gate))
            .unwrap_or((0, GateCounters::default()));

        let summary = SimSummary {
            ticks: sensor_outcome.ticks,
            frames_published: sensor_outcome.frames_published,
            confirmed_tracks: sensor_outcome.confirmed_tracks,
            live_tracks: sensor_outcome.live_tracks,
            bus: bus_stats.snapshot(),
            health: supervisor.health_report(),
            sensor_gate: sensor_outcome.gate,
            effector_gate,
            effector_decisions,
        };
        tracing::info!(
            ticks = summary.ticks,
            published = summary.frames_published,
            confirmed = summary.confirmed_tracks,
            intel_dropped = summary.bus.intel_dropped,
            "run complete"
        );
        Ok(summary)
    }
}
