//! EW degradation model.
//!
//! Translates an [`AttackPacket`] into physical effect on the current frame:
//! broadband attenuation of the Range-Doppler map, quality loss and kinematic
//! drift on targeted tracks, and ghost tracks from deception jamming. Every
//! effect is clamped to a configured maximum regardless of how much power the
//! countermeasures claim.
//!
//! All four effects are data transforms over the frame's map and track
//! arena; a per-frame guard ensures they run at most once per tick even if a
//! caller tries to apply the same frame twice.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use radar_ew_core::utils::{db_reduction_to_amplitude_factor, dbm_to_milliwatts, linear_to_db};
use radar_ew_core::{AttackPacket, CountermeasureType, TrackId};
use radar_ew_signal::RangeDopplerMap;

use crate::tracking::TrackManager;

/// EW effect limits and probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EwConfig {
    /// Upper bound on noise-jamming SNR reduction in dB.
    pub max_snr_degradation_db: f64,
    /// Upper bound on per-frame quality loss per track.
    pub max_quality_degradation: f64,
    /// Probability that one deception countermeasure spawns a ghost track.
    pub false_track_probability: f64,
    /// Hard clamp on accumulated EW range drift in metres.
    pub max_drift_range_m: f64,
    /// Hard clamp on accumulated EW velocity drift in m/s.
    pub max_drift_velocity_mps: f64,
    /// Ghost tracks spawn within this range offset of their seduced target.
    pub ghost_range_offset_m: f64,
    /// Ghost tracks spawn within this velocity offset of their seduced target.
    pub ghost_velocity_offset_mps: f64,
}

impl Default for EwConfig {
    fn default() -> Self {
        Self {
            max_snr_degradation_db: 20.0,
            max_quality_degradation: 0.5,
            false_track_probability: 0.3,
            max_drift_range_m: 75.0,
            max_drift_velocity_mps: 7.5,
            ghost_range_offset_m: 250.0,
            ghost_velocity_offset_mps: 15.0,
        }
    }
}

/// What one application of the model actually did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DegradationReport {
    /// False when the per-frame guard suppressed a duplicate application.
    pub applied: bool,
    /// Broadband SNR reduction applied to the map, in dB (post-clamp).
    pub snr_reduction_db: f64,
    /// Ghost tracks spawned this frame.
    pub ghosts: Vec<TrackId>,
    /// Tracks whose quality was degraded this frame.
    pub degraded: Vec<TrackId>,
    /// Tracks that received kinematic drift this frame.
    pub drifted: Vec<TrackId>,
}

/// Noise-jamming SNR reduction for a linear jammer-to-signal ratio.
///
/// `10·log10(1 + J/S)`, clamped to `max_db`. Monotonic in `J/S`.
pub fn snr_reduction_db(j_over_s_linear: f64, max_db: f64) -> f64 {
    if j_over_s_linear <= 0.0 {
        return 0.0;
    }
    (10.0 * (1.0 + j_over_s_linear).log10()).min(max_db)
}

/// The degradation model itself.
pub struct DegradationModel {
    config: EwConfig,
    rng: StdRng,
    /// Per-tick idempotency guard: last frame the model was applied to.
    last_applied_frame: Option<u64>,
}

impl std::fmt::Debug for DegradationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationModel")
            .field("config", &self.config)
            .field("last_applied_frame", &self.last_applied_frame)
            .finish()
    }
}

impl DegradationModel {
    /// Create a model with a deterministic seed.
    pub fn new(config: EwConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            last_applied_frame: None,
        }
    }

    /// The model configuration.
    pub fn config(&self) -> EwConfig {
        self.config
    }

    /// Apply the packet's countermeasures to this frame's map and tracks.
    ///
    /// Calling again with the same `frame_id` is a no-op that returns
    /// `applied = false`; effects never double-apply within a tick.
    pub fn apply(
        &mut self,
        frame_id: u64,
        attack: &AttackPacket,
        map: &mut RangeDopplerMap,
        tracker: &mut TrackManager,
    ) -> DegradationReport {
        if self.last_applied_frame == Some(frame_id) {
            tracing::warn!(frame = frame_id, "duplicate degradation apply suppressed");
            return DegradationReport::default();
        }
        self.last_applied_frame = Some(frame_id);

        let mut report = DegradationReport {
            applied: true,
            ..Default::default()
        };

        if attack.countermeasures.is_empty() {
            return report;
        }

        report.snr_reduction_db = self.apply_noise_jamming(attack, map);
        self.apply_quality_degradation(attack, tracker, &mut report);
        self.apply_kinematic_drift(attack, tracker, &mut report);
        self.apply_deception(attack, tracker, &mut report);

        tracing::debug!(
            frame = frame_id,
            snr_db = report.snr_reduction_db,
            ghosts = report.ghosts.len(),
            degraded = report.degraded.len(),
            "EW degradation applied"
        );
        report
    }

    /// Broadband noise jamming: aggregate effective jammer power, form the
    /// J/S ratio against the map's peak power, attenuate the whole map by
    /// the clamped reduction.
    fn apply_noise_jamming(&self, attack: &AttackPacket, map: &mut RangeDopplerMap) -> f64 {
        let jammer_mw: f64 = attack
            .countermeasures
            .iter()
            .filter(|cm| matches!(cm.cm_type, CountermeasureType::NoiseJam))
            .map(|cm| dbm_to_milliwatts(cm.power_dbm) * cm.effectiveness)
            .sum();
        if jammer_mw <= 0.0 {
            return 0.0;
        }

        let signal_power = map.peak_power();
        if signal_power <= 0.0 {
            return 0.0;
        }

        let j_over_s = jammer_mw / signal_power;
        let reduction_db = snr_reduction_db(j_over_s, self.config.max_snr_degradation_db);
        map.attenuate(db_reduction_to_amplitude_factor(reduction_db));
        tracing::debug!(
            j_over_s_db = linear_to_db(j_over_s),
            reduction_db,
            "noise jamming applied"
        );
        reduction_db
    }

    /// Quality loss: per-type weight × effectiveness, summed over all
    /// countermeasures aimed at the same track, clamped per frame.
    fn apply_quality_degradation(
        &self,
        attack: &AttackPacket,
        tracker: &mut TrackManager,
        report: &mut DegradationReport,
    ) {
        use std::collections::BTreeMap;
        let mut per_track: BTreeMap<TrackId, f64> = BTreeMap::new();
        for cm in &attack.countermeasures {
            let loss = cm.cm_type.quality_weight() * cm.effectiveness;
            *per_track.entry(cm.target_track_id).or_insert(0.0) += loss;
        }
        for (id, loss) in per_track {
            let loss = loss.min(self.config.max_quality_degradation);
            if tracker.degrade_quality(id, loss) {
                report.degraded.push(id);
            }
        }
    }

    /// Kinematic drift: bounded random range/velocity perturbation scaled by
    /// effectiveness, applied to targeted real tracks.
    fn apply_kinematic_drift(
        &mut self,
        attack: &AttackPacket,
        tracker: &mut TrackManager,
        report: &mut DegradationReport,
    ) {
        let unit = Uniform::new_inclusive(-1.0f64, 1.0);
        for cm in &attack.countermeasures {
            let dr = unit.sample(&mut self.rng)
                * self.config.max_drift_range_m
                * cm.effectiveness;
            let dv = unit.sample(&mut self.rng)
                * self.config.max_drift_velocity_mps
                * cm.effectiveness;
            if tracker.apply_drift(
                cm.target_track_id,
                dr,
                dv,
                self.config.max_drift_range_m,
                self.config.max_drift_velocity_mps,
            ) {
                report.drifted.push(cm.target_track_id);
            }
        }
    }

    /// Deception jamming: each deception countermeasure may spawn one ghost
    /// track near its target, with bounded uniform offsets.
    fn apply_deception(
        &mut self,
        attack: &AttackPacket,
        tracker: &mut TrackManager,
        report: &mut DegradationReport,
    ) {
        let unit = Uniform::new_inclusive(-1.0f64, 1.0);
        for cm in &attack.countermeasures {
            if !matches!(cm.cm_type, CountermeasureType::DeceptionJam) {
                continue;
            }
            if self.rng.gen::<f64>() >= self.config.false_track_probability {
                continue;
            }
            let Some(target) = tracker.track(cm.target_track_id) else {
                continue;
            };
            let pos = target.kalman.position();
            let range = pos[0] + unit.sample(&mut self.rng) * self.config.ghost_range_offset_m;
            let velocity =
                pos[1] + unit.sample(&mut self.rng) * self.config.ghost_velocity_offset_mps;
            let quality = 0.3 + 0.3 * cm.effectiveness;
            if let Some(ghost) = tracker.spawn_false_track(range.max(0.0), velocity, quality) {
                tracing::debug!(ghost = %ghost, seduced = %cm.target_track_id, "ghost track spawned");
                report.ghosts.push(ghost);
            }
        }
    }
}
