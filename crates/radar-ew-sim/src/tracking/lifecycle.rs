//! Track lifecycle state machine.
//!
//! Tentative → Confirmed once enough updates accumulate; any state → Deleted
//! once the track has been missed past the limit. Deleted tracks linger in
//! the arena until the manager's periodic purge sweep.

use radar_ew_core::TrackStatus;
use serde::{Deserialize, Serialize};

/// Configuration for track confirmation and deletion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Measurement updates required to promote Tentative → Confirmed.
    pub confirmation_threshold: u32,
    /// A track is deleted once `missed_count` strictly exceeds this.
    pub max_missed: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            confirmation_threshold: 3,
            max_missed: 5,
        }
    }
}

/// Per-track lifecycle bookkeeping.
#[derive(Debug, Clone)]
pub struct TrackLifecycle {
    status: TrackStatus,
    measurement_count: u32,
    missed_count: u32,
    config: LifecycleConfig,
}

impl TrackLifecycle {
    /// Create a lifecycle for a freshly spawned track. The birth detection
    /// counts as the first measurement.
    pub fn new(config: LifecycleConfig) -> Self {
        let mut lc = Self {
            status: TrackStatus::Tentative,
            measurement_count: 0,
            missed_count: 0,
            config,
        };
        lc.hit();
        lc
    }

    /// Register a matched detection this tick.
    pub fn hit(&mut self) {
        if self.status == TrackStatus::Deleted {
            return;
        }
        self.measurement_count += 1;
        self.missed_count = 0;
        if self.status == TrackStatus::Tentative
            && self.measurement_count >= self.config.confirmation_threshold
        {
            self.status = TrackStatus::Confirmed;
        }
    }

    /// Register a tick with no matching detection.
    pub fn miss(&mut self) {
        if self.status == TrackStatus::Deleted {
            return;
        }
        self.missed_count += 1;
        if self.missed_count > self.config.max_missed {
            self.status = TrackStatus::Deleted;
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TrackStatus {
        self.status
    }

    /// Total successful measurement updates.
    pub fn measurement_count(&self) -> u32 {
        self.measurement_count
    }

    /// Consecutive missed ticks.
    pub fn missed_count(&self) -> u32 {
        self.missed_count
    }

    /// True once the track has been deleted (awaiting purge).
    pub fn is_deleted(&self) -> bool {
        self.status == TrackStatus::Deleted
    }

    /// Track confidence from the lifecycle model.
    ///
    /// Tentative confidence grows linearly with measurement count, capped at
    /// 0.5. Confirmed confidence is
    /// `0.7 + 0.2·min(measurement_count/10, 1) − 0.05·missed_count`,
    /// clamped to [0.5, 1.0]. Deleted tracks report zero.
    pub fn confidence(&self) -> f64 {
        match self.status {
            TrackStatus::Tentative => (0.1 * self.measurement_count as f64).min(0.5),
            TrackStatus::Confirmed => {
                let maturity = (self.measurement_count as f64 / 10.0).min(1.0);
                (0.7 + 0.2 * maturity - 0.05 * self.missed_count as f64).clamp(0.5, 1.0)
            }
            TrackStatus::Deleted => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> TrackLifecycle {
        TrackLifecycle::new(LifecycleConfig::default())
    }

    #[test]
    fn third_update_confirms_with_threshold_three() {
        // Birth counts as the first measurement.
        let mut lc = lifecycle();
        assert_eq!(lc.status(), TrackStatus::Tentative);
        assert_eq!(lc.measurement_count(), 1);

        lc.hit();
        assert_eq!(lc.status(), TrackStatus::Tentative);

        lc.hit();
        assert_eq!(lc.measurement_count(), 3);
        assert_eq!(lc.status(), TrackStatus::Confirmed);
    }

    #[test]
    fn sixth_consecutive_miss_deletes_with_max_five() {
        let mut lc = lifecycle();
        lc.hit();
        lc.hit();
        assert_eq!(lc.status(), TrackStatus::Confirmed);

        for _ in 0..5 {
            lc.miss();
            assert_ne!(lc.status(), TrackStatus::Deleted);
        }
        lc.miss();
        assert_eq!(lc.status(), TrackStatus::Deleted);
    }

    #[test]
    fn hit_resets_missed_count() {
        let mut lc = lifecycle();
        lc.miss();
        lc.miss();
        assert_eq!(lc.missed_count(), 2);
        lc.hit();
        assert_eq!(lc.missed_count(), 0);
    }

    #[test]
    fn tentative_tracks_can_be_deleted_too() {
        let mut lc = lifecycle();
        for _ in 0..6 {
            lc.miss();
        }
        assert_eq!(lc.status(), TrackStatus::Deleted);
    }

    #[test]
    fn deleted_is_terminal() {
        let mut lc = lifecycle();
        for _ in 0..6 {
            lc.miss();
        }
        lc.hit();
        assert_eq!(lc.status(), TrackStatus::Deleted);
        assert_eq!(lc.confidence(), 0.0);
    }

    #[test]
    fn tentative_confidence_caps_at_half() {
        let config = LifecycleConfig {
            confirmation_threshold: 100,
            max_missed: 5,
        };
        let mut lc = TrackLifecycle::new(config);
        assert!((lc.confidence() - 0.1).abs() < 1e-12);
        for _ in 0..20 {
            lc.hit();
        }
        assert!((lc.confidence() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn confirmed_confidence_formula() {
        let mut lc = lifecycle();
        lc.hit();
        lc.hit(); // measurement_count = 3, Confirmed
        let expected = 0.7 + 0.2 * 0.3;
        assert!((lc.confidence() - expected).abs() < 1e-12);

        lc.miss();
        let expected = 0.7 + 0.2 * 0.3 - 0.05;
        assert!((lc.confidence() - expected).abs() < 1e-12);

        // Confidence never falls below 0.5 while Confirmed.
        for _ in 0..4 {
            lc.miss();
        }
        assert!(lc.confidence() >= 0.5);
    }
}
