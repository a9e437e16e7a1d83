//! Threat assessment over the confirmed track table.
//!
//! A simple kinematic ranking: close, fast-closing, high-quality tracks rank
//! highest. Only confirmed real tracks are assessed; tentative tracks and
//! known ghosts carry no engagement recommendation.

use radar_ew_core::{ThreatAssessment, ThreatLevel, TrackSnapshot, TrackStatus};

/// Range inside which a closing target is automatically high threat.
const CLOSE_RANGE_M: f64 = 1500.0;

/// Closing speed that marks a target as fast.
const FAST_CLOSING_MPS: f64 = 25.0;

/// Rank the confirmed tracks by threat.
pub fn assess_threats(tracks: &[TrackSnapshot]) -> Vec<ThreatAssessment> {
    let mut assessments: Vec<ThreatAssessment> = tracks
        .iter()
        .filter(|t| t.status == TrackStatus::Confirmed && !t.is_false_track)
        .map(assess_one)
        .collect();
    assessments.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    assessments
}

fn assess_one(track: &TrackSnapshot) -> ThreatAssessment {
    // Negative velocity is closing in the measurement convention.
    let closing_speed = (-track.velocity_mps).max(0.0);
    let close = track.range_m < CLOSE_RANGE_M;
    let fast = closing_speed >= FAST_CLOSING_MPS;

    let threat_level = match (close, fast) {
        (true, true) => ThreatLevel::High,
        (true, false) | (false, true) => ThreatLevel::Medium,
        (false, false) => ThreatLevel::Low,
    };

    // Priority blends proximity, closing rate and how much we trust the
    // track; normalized to [0, 1].
    let proximity = (1.0 - track.range_m / 10_000.0).clamp(0.0, 1.0);
    let closing = (closing_speed / 100.0).clamp(0.0, 1.0);
    let priority =
        (0.45 * proximity + 0.35 * closing + 0.2 * track.confidence * track.quality).clamp(0.0, 1.0);

    ThreatAssessment {
        track_id: track.id,
        threat_level,
        priority,
    }
}
