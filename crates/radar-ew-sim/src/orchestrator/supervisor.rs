//! Fail-safe supervisor.
//!
//! Every subsystem tick reports its outcome here. Failures accumulate
//! through Healthy → Degraded → Failed; success resets the streak. The one
//! cross-subsystem rule is isolation: a failed sensor forces the effector to
//! pause (it must never act on a dead sensor), while an effector failure
//! leaves the sensor untouched. A failed subsystem gets a restart attempt
//! with a bounded grace window; exhausting it disables the subsystem for the
//! rest of the run: a degraded end state, never a fatal one.

use parking_lot::Mutex;
use radar_ew_core::{SubsystemState, SubsystemStatus};
use serde::{Deserialize, Serialize};

/// The two supervised execution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemId {
    /// The radar sensor pipeline.
    Sensor,
    /// The EW effector.
    Effector,
}

impl SubsystemId {
    fn name(&self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Effector => "effector",
        }
    }
}

/// Failure thresholds and recovery window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Consecutive failures before Healthy → Degraded.
    pub degraded_threshold: u32,
    /// Consecutive failures before → Failed.
    pub failed_threshold: u32,
    /// Recovery ticks allowed before a failed subsystem is permanently
    /// disabled.
    pub recovery_grace_ticks: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            degraded_threshold: 3,
            failed_threshold: 5,
            recovery_grace_ticks: 10,
        }
    }
}

#[derive(Debug)]
struct Entry {
    status: SubsystemStatus,
    permanently_disabled: bool,
    recovery_ticks: u32,
}

impl Entry {
    fn new(name: &str) -> Self {
        Self {
            status: SubsystemStatus::healthy(name),
            permanently_disabled: false,
            recovery_ticks: 0,
        }
    }
}

#[derive(Debug)]
struct Inner {
    sensor: Entry,
    effector: Entry,
}

impl Inner {
    fn entry_mut(&mut self, id: SubsystemId) -> &mut Entry {
        match id {
            SubsystemId::Sensor => &mut self.sensor,
            SubsystemId::Effector => &mut self.effector,
        }
    }

    fn entry(&self, id: SubsystemId) -> &Entry {
        match id {
            SubsystemId::Sensor => &self.sensor,
            SubsystemId::Effector => &self.effector,
        }
    }
}

/// Shared supervisor; one instance is handed to every task.
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    inner: Mutex<Inner>,
}

impl Supervisor {
    /// Create the supervisor with both subsystems healthy.
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                sensor: Entry::new("sensor"),
                effector: Entry::new("effector"),
            }),
        }
    }

    /// Tick-boundary bookkeeping; returns whether the subsystem should run.
    ///
    /// A failed subsystem that still has grace left is moved into Recovering
    /// and allowed to run; one that has exhausted its grace window is
    /// permanently disabled. Paused and disabled subsystems do not run.
    pub fn begin_tick(&self, id: SubsystemId) -> bool {
        let mut inner = self.inner.lock();
        let grace = self.config.recovery_grace_ticks;
        let entry = inner.entry_mut(id);

        if entry.permanently_disabled {
            return false;
        }
        match entry.status.state {
            SubsystemState::Healthy | SubsystemState::Degraded => true,
            SubsystemState::Paused => false,
            SubsystemState::Failed => {
                // Restart attempt.
                entry.status.state = SubsystemState::Recovering;
                entry.status.consecutive_failures = 0;
                tracing::warn!(subsystem = id.name(), "restarting failed subsystem");
                true
            }
            SubsystemState::Recovering => {
                entry.recovery_ticks += 1;
                if entry.recovery_ticks > grace {
                    entry.permanently_disabled = true;
                    entry.status.state = SubsystemState::Failed;
                    tracing::error!(
                        subsystem = id.name(),
                        grace_ticks = grace,
                        "recovery window exhausted, subsystem disabled for this run"
                    );
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Record a successful tick.
    pub fn record_success(&self, id: SubsystemId) {
        let mut inner = self.inner.lock();
        let entry = inner.entry_mut(id);
        if entry.permanently_disabled {
            return;
        }
        entry.status.consecutive_failures = 0;
        entry.recovery_ticks = 0;
        match entry.status.state {
            SubsystemState::Degraded | SubsystemState::Recovering => {
                entry.status.state = SubsystemState::Healthy;
                tracing::info!(subsystem = id.name(), "subsystem healthy again");
            }
            _ => {}
        }

        // A recovered sensor releases a paused effector.
        if id == SubsystemId::Sensor
            && inner.sensor.status.state == SubsystemState::Healthy
            && inner.effector.status.state == SubsystemState::Paused
            && !inner.effector.permanently_disabled
        {
            inner.effector.status.state = SubsystemState::Healthy;
            tracing::info!("effector resumed, sensor is healthy");
        }
    }

    /// Record a failed tick; drives the state machine and the isolation
    /// rule. Log severity scales with the failure streak.
    pub fn record_failure(&self, id: SubsystemId, error: &str) {
        let mut inner = self.inner.lock();
        let degraded = self.config.degraded_threshold;
        let failed = self.config.failed_threshold;

        let entry = inner.entry_mut(id);
        if entry.permanently_disabled {
            return;
        }
        entry.status.failure_count += 1;
        entry.status.consecutive_failures += 1;
        entry.status.last_error = Some(error.to_string());
        let streak = entry.status.consecutive_failures;

        if streak >= failed {
            entry.status.state = SubsystemState::Failed;
            tracing::error!(subsystem = id.name(), streak, error, "subsystem failed");
        } else if streak >= degraded {
            if entry.status.state == SubsystemState::Healthy {
                entry.status.state = SubsystemState::Degraded;
            }
            tracing::warn!(subsystem = id.name(), streak, error, "subsystem degraded");
        } else {
            tracing::debug!(subsystem = id.name(), streak, error, "subsystem tick failed");
        }

        // Isolation: a failed sensor pauses the effector in the same tick;
        // an effector failure never touches the sensor.
        if id == SubsystemId::Sensor && inner.sensor.status.state == SubsystemState::Failed {
            let effector = &mut inner.effector;
            if !effector.permanently_disabled
                && !matches!(
                    effector.status.state,
                    SubsystemState::Failed | SubsystemState::Paused
                )
            {
                effector.status.state = SubsystemState::Paused;
                tracing::warn!("effector paused: sensor has failed");
            }
        }
    }

    /// Current state of one subsystem.
    pub fn state(&self, id: SubsystemId) -> SubsystemState {
        self.inner.lock().entry(id).status.state
    }

    /// Full status record of one subsystem.
    pub fn status(&self, id: SubsystemId) -> SubsystemStatus {
        self.inner.lock().entry(id).status.clone()
    }

    /// True once a subsystem has been disabled for the rest of the run.
    pub fn is_disabled(&self, id: SubsystemId) -> bool {
        self.inner.lock().entry(id).permanently_disabled
    }

    /// Status records for every subsystem.
    pub fn health_report(&self) -> Vec<SubsystemStatus> {
        let inner = self.inner.lock();
        vec![inner.sensor.status.clone(), inner.effector.status.clone()]
    }
}
