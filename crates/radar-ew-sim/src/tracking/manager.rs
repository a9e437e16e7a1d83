//! The track manager: arena of live tracks, data association and lifecycle.
//!
//! All tracks live in a `BTreeMap` keyed by [`TrackId`] and owned exclusively
//! by the manager; everything outside refers to tracks by id. EW effects
//! enter through the narrow mutators (`degrade_quality`, `apply_drift`,
//! `spawn_false_track`) so the degradation model never touches filter state
//! directly.

use radar_ew_core::{Detection, TrackId, TrackSnapshot, TrackStatus, FALSE_TRACK_ID_BASE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::assignment::min_cost_assignment;
use super::kalman::KalmanState;
use super::lifecycle::{LifecycleConfig, TrackLifecycle};

/// Per-tick quality healing applied to tracks that are not under attack.
const QUALITY_RECOVERY_STEP: f64 = 0.05;

/// Tracker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum association distance in the measurement plane; beyond this a
    /// track/detection pair is infeasible.
    pub gating_threshold: f64,
    /// Confirmation/deletion thresholds.
    pub lifecycle: LifecycleConfig,
    /// Upper bound on simultaneous live (non-deleted) tracks.
    pub max_tracks: usize,
    /// Deleted tracks are purged every this many ticks.
    pub purge_interval_ticks: u64,
    /// Kalman process noise variance.
    pub process_noise_var: f64,
    /// Kalman measurement noise variance.
    pub obs_noise_var: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            gating_threshold: 150.0,
            lifecycle: LifecycleConfig::default(),
            max_tracks: 64,
            purge_interval_ticks: 10,
            process_noise_var: 1.0,
            obs_noise_var: 25.0,
        }
    }
}

/// One live track in the arena.
#[derive(Debug, Clone)]
pub struct Track {
    /// Stable id.
    pub id: TrackId,
    /// Kalman filter state.
    pub kalman: KalmanState,
    /// Lifecycle state machine.
    pub lifecycle: TrackLifecycle,
    /// Quality in [0, 1]; reduced by countermeasures, heals when left alone.
    pub quality: f64,
    /// Set while a countermeasure degraded this track this frame.
    pub ew_degraded: bool,
    /// True for ghost tracks injected by deception jamming.
    pub is_false_track: bool,
    /// Accumulated EW range drift in metres (hard-clamped).
    pub drift_range_m: f64,
    /// Accumulated EW velocity drift in m/s (hard-clamped).
    pub drift_velocity_mps: f64,
}

impl Track {
    /// Wire-facing snapshot of this track.
    pub fn snapshot(&self) -> TrackSnapshot {
        let pos = self.kalman.position();
        let vel = self.kalman.velocity();
        TrackSnapshot {
            id: self.id,
            status: self.lifecycle.status(),
            range_m: pos[0],
            velocity_mps: pos[1],
            range_rate: vel[0],
            velocity_rate: vel[1],
            measurement_count: self.lifecycle.measurement_count(),
            missed_count: self.lifecycle.missed_count(),
            quality: self.quality,
            confidence: self.lifecycle.confidence(),
            ew_degraded: self.ew_degraded,
            is_false_track: self.is_false_track,
            drift_range_m: self.drift_range_m,
            drift_velocity_mps: self.drift_velocity_mps,
            class_label: None,
            class_confidence: None,
        }
    }
}

/// Result of one tracker update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Tracks that matched a detection this tick.
    pub matched: Vec<TrackId>,
    /// Tracks born from unmatched detections.
    pub born: Vec<TrackId>,
    /// Tracks that transitioned to Deleted this tick.
    pub deleted: Vec<TrackId>,
    /// Deleted tracks removed by the purge sweep this tick.
    pub purged: Vec<TrackId>,
}

/// Arena of tracks plus the association and lifecycle machinery.
pub struct TrackManager {
    config: TrackerConfig,
    tracks: BTreeMap<TrackId, Track>,
    next_id: u64,
    next_false_id: u64,
    tick: u64,
}

impl TrackManager {
    /// Create an empty manager.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
            next_id: 1,
            next_false_id: FALSE_TRACK_ID_BASE,
            tick: 0,
        }
    }

    /// The tracker configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Reset per-frame EW flags and heal quality on untouched tracks.
    ///
    /// Called once at the top of each sensor tick, before any degradation
    /// for the new frame is ingested.
    pub fn begin_frame(&mut self) {
        for track in self.tracks.values_mut() {
            track.ew_degraded = false;
            track.quality = (track.quality + QUALITY_RECOVERY_STEP).min(1.0);
        }
    }

    /// Main per-tick update: predict, associate, update, spawn, retire.
    pub fn update(&mut self, detections: &[Detection], dt_secs: f64) -> UpdateSummary {
        self.tick += 1;
        let mut summary = UpdateSummary::default();

        // Predict all live tracks forward.
        for track in self.tracks.values_mut() {
            if !track.lifecycle.is_deleted() {
                track.kalman.predict(dt_secs);
            }
        }

        let alive_ids: Vec<TrackId> = self
            .tracks
            .values()
            .filter(|t| !t.lifecycle.is_deleted())
            .map(|t| t.id)
            .collect();

        // Gated cost matrix: Euclidean distance in the measurement plane,
        // infeasible beyond the gate.
        let costs: Vec<Vec<f64>> = alive_ids
            .iter()
            .map(|id| {
                let track = &self.tracks[id];
                detections
                    .iter()
                    .map(|det| {
                        let d = track.kalman.distance_to(det.measurement());
                        if d < self.config.gating_threshold {
                            d
                        } else {
                            f64::INFINITY
                        }
                    })
                    .collect()
            })
            .collect();

        let assignment = min_cost_assignment(&costs);

        let mut detection_taken = vec![false; detections.len()];
        for (row, det_idx) in assignment.iter().enumerate() {
            let id = alive_ids[row];
            let Some(track) = self.tracks.get_mut(&id) else {
                continue;
            };
            match det_idx {
                Some(di) => {
                    detection_taken[*di] = true;
                    track.kalman.update(detections[*di].measurement());
                    track.lifecycle.hit();
                    summary.matched.push(id);
                }
                None => {
                    track.lifecycle.miss();
                    if track.lifecycle.is_deleted() {
                        summary.deleted.push(id);
                        tracing::debug!(track = %id, "track deleted after coasting out");
                    }
                }
            }
        }

        // Unmatched detections become tentative tracks, up to the cap.
        for (di, det) in detections.iter().enumerate() {
            if detection_taken[di] {
                continue;
            }
            if self.live_count() >= self.config.max_tracks {
                tracing::debug!("track cap reached, detection discarded");
                continue;
            }
            let id = TrackId::new(self.next_id);
            self.next_id += 1;
            let track = self.make_track(id, det.measurement(), false, 1.0);
            self.tracks.insert(id, track);
            summary.born.push(id);
        }

        // Periodic purge of Deleted tracks (not every tick, so a deleted
        // track stays inspectable for a few frames).
        if self.tick % self.config.purge_interval_ticks == 0 {
            let purged: Vec<TrackId> = self
                .tracks
                .values()
                .filter(|t| t.lifecycle.is_deleted())
                .map(|t| t.id)
                .collect();
            for id in &purged {
                self.tracks.remove(id);
            }
            summary.purged = purged;
        }

        summary
    }

    fn make_track(&self, id: TrackId, measurement: [f64; 2], is_false: bool, quality: f64) -> Track {
        Track {
            id,
            kalman: KalmanState::new(
                measurement,
                self.config.process_noise_var,
                self.config.obs_noise_var,
            ),
            lifecycle: TrackLifecycle::new(self.config.lifecycle),
            quality,
            ew_degraded: is_false,
            is_false_track: is_false,
            drift_range_m: 0.0,
            drift_velocity_mps: 0.0,
        }
    }

    // -----------------------------------------------------------------
    // EW entry points
    // -----------------------------------------------------------------

    /// Reduce a track's quality by `loss`, flagging it degraded.
    ///
    /// Returns `false` if the track does not exist or is deleted.
    pub fn degrade_quality(&mut self, id: TrackId, loss: f64) -> bool {
        match self.tracks.get_mut(&id) {
            Some(track) if !track.lifecycle.is_deleted() => {
                track.quality = (track.quality - loss).clamp(0.0, 1.0);
                track.ew_degraded = true;
                true
            }
            _ => false,
        }
    }

    /// Apply EW kinematic drift to a real (non-false) track.
    ///
    /// The accumulated drift is hard-clamped to the supplied maxima no matter
    /// what the countermeasure power was; only the clamped delta reaches the
    /// filter state.
    pub fn apply_drift(
        &mut self,
        id: TrackId,
        delta_range_m: f64,
        delta_velocity_mps: f64,
        max_range_m: f64,
        max_velocity_mps: f64,
    ) -> bool {
        match self.tracks.get_mut(&id) {
            Some(track) if !track.lifecycle.is_deleted() && !track.is_false_track => {
                let new_dr =
                    (track.drift_range_m + delta_range_m).clamp(-max_range_m, max_range_m);
                let new_dv = (track.drift_velocity_mps + delta_velocity_mps)
                    .clamp(-max_velocity_mps, max_velocity_mps);
                let applied_dr = new_dr - track.drift_range_m;
                let applied_dv = new_dv - track.drift_velocity_mps;
                track.drift_range_m = new_dr;
                track.drift_velocity_mps = new_dv;
                track.kalman.nudge_position(applied_dr, applied_dv);
                track.ew_degraded = true;
                true
            }
            _ => false,
        }
    }

    /// Inject a ghost track from deception jamming.
    ///
    /// Ghosts draw ids from the disjoint false-track space and enter the
    /// arena as Tentative; they age out through the normal lifecycle.
    pub fn spawn_false_track(
        &mut self,
        range_m: f64,
        velocity_mps: f64,
        quality: f64,
    ) -> Option<TrackId> {
        if self.live_count() >= self.config.max_tracks {
            return None;
        }
        let id = TrackId::new(self.next_false_id);
        self.next_false_id += 1;
        let track = self.make_track(id, [range_m, velocity_mps], true, quality);
        self.tracks.insert(id, track);
        Some(id)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Snapshots of all live (non-deleted) tracks, id order.
    pub fn snapshots(&self) -> Vec<TrackSnapshot> {
        self.tracks
            .values()
            .filter(|t| !t.lifecycle.is_deleted())
            .map(Track::snapshot)
            .collect()
    }

    /// Look up one track.
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Number of live (non-deleted) tracks.
    pub fn live_count(&self) -> usize {
        self.tracks
            .values()
            .filter(|t| !t.lifecycle.is_deleted())
            .count()
    }

    /// Number of confirmed tracks.
    pub fn confirmed_count(&self) -> usize {
        self.tracks
            .values()
            .filter(|t| t.lifecycle.status() == TrackStatus::Confirmed)
            .count()
    }

    /// Number of tentative tracks.
    pub fn tentative_count(&self) -> usize {
        self.tracks
            .values()
            .filter(|t| t.lifecycle.status() == TrackStatus::Tentative)
            .count()
    }

    /// Total tracks in the arena, deleted-but-unpurged included.
    pub fn arena_len(&self) -> usize {
        self.tracks.len()
    }
}
