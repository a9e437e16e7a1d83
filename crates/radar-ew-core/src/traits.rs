//! The classifier seam.
//!
//! The neural classifier that labels tracks is an external collaborator; the
//! core only defines the capability and the feature vector handed to it. Any
//! implementor can be plugged into the sensor role.

use crate::types::{SceneContext, TrackSnapshot};

/// Kinematic feature vector extracted from a track for classification.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicFeatures {
    /// Estimated range in metres.
    pub range_m: f64,
    /// Absolute radial speed in m/s.
    pub speed_mps: f64,
    /// Signed radial velocity in m/s.
    pub velocity_mps: f64,
    /// Track quality in [0, 1].
    pub quality: f64,
    /// Number of measurement updates backing the estimate.
    pub measurement_count: u32,
}

impl KinematicFeatures {
    /// Extract features from a track snapshot.
    pub fn from_snapshot(track: &TrackSnapshot) -> Self {
        Self {
            range_m: track.range_m,
            speed_mps: track.velocity_mps.abs(),
            velocity_mps: track.velocity_mps,
            quality: track.quality,
            measurement_count: track.measurement_count,
        }
    }
}

/// Label/confidence pair returned by a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Class label (opaque to the core).
    pub label: String,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
}

/// An opaque capability that labels tracks.
///
/// The sensor role calls this once per confirmed track per frame and only
/// consumes the returned pair; implementors are free to ignore any input.
pub trait TrackClassifier: Send + Sync {
    /// Classify one track given the scene it lives in.
    fn classify(&self, scene: &SceneContext, features: &KinematicFeatures) -> Classification;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TrackId, TrackStatus};

    #[test]
    fn features_from_snapshot() {
        let track = TrackSnapshot {
            id: TrackId::new(1),
            status: TrackStatus::Confirmed,
            range_m: 800.0,
            velocity_mps: -42.0,
            range_rate: -42.0,
            velocity_rate: 0.0,
            measurement_count: 6,
            missed_count: 1,
            quality: 0.8,
            confidence: 0.8,
            ew_degraded: false,
            is_false_track: false,
            drift_range_m: 0.0,
            drift_velocity_mps: 0.0,
            class_label: None,
            class_confidence: None,
        };
        let features = KinematicFeatures::from_snapshot(&track);
        assert!((features.speed_mps - 42.0).abs() < f64::EPSILON);
        assert!((features.velocity_mps + 42.0).abs() < f64::EPSILON);
        assert_eq!(features.measurement_count, 6);
    }
}
