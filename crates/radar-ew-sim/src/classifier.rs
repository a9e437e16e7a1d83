//! Default track classifier.
//!
//! The production classifier is an external neural collaborator; the sensor
//! only depends on the [`TrackClassifier`] capability and consumes the
//! label/confidence pair. This module provides the rule-based implementation
//! used in simulation runs.

use radar_ew_core::{Classification, KinematicFeatures, SceneContext, TrackClassifier};

/// Speed-banded rule classifier.
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    /// Create the classifier.
    pub fn new() -> Self {
        Self
    }
}

impl TrackClassifier for HeuristicClassifier {
    fn classify(&self, scene: &SceneContext, features: &KinematicFeatures) -> Classification {
        let label = if features.speed_mps >= 40.0 {
            "fast-mover"
        } else if features.speed_mps >= 10.0 {
            "cruiser"
        } else {
            "slow-mover"
        };

        // Confidence tracks data support and quality; a jammed scene is
        // worth less trust.
        let maturity = (features.measurement_count as f64 / 10.0).min(1.0);
        let mut confidence = 0.4 + 0.3 * maturity + 0.3 * features.quality;
        if scene.jamming_suspected {
            confidence *= 0.8;
        }

        Classification {
            label: label.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(speed: f64, quality: f64, count: u32) -> KinematicFeatures {
        KinematicFeatures {
            range_m: 1000.0,
            speed_mps: speed,
            velocity_mps: -speed,
            quality,
            measurement_count: count,
        }
    }

    #[test]
    fn speed_bands_select_labels() {
        let clf = HeuristicClassifier::new();
        let scene = SceneContext::default();
        assert_eq!(clf.classify(&scene, &features(55.0, 1.0, 10)).label, "fast-mover");
        assert_eq!(clf.classify(&scene, &features(20.0, 1.0, 10)).label, "cruiser");
        assert_eq!(clf.classify(&scene, &features(2.0, 1.0, 10)).label, "slow-mover");
    }

    #[test]
    fn mature_high_quality_tracks_score_higher() {
        let clf = HeuristicClassifier::new();
        let scene = SceneContext::default();
        let young = clf.classify(&scene, &features(20.0, 0.5, 1)).confidence;
        let mature = clf.classify(&scene, &features(20.0, 1.0, 15)).confidence;
        assert!(mature > young);
    }

    #[test]
    fn jamming_discounts_confidence() {
        let clf = HeuristicClassifier::new();
        let clean = clf
            .classify(&SceneContext::default(), &features(20.0, 1.0, 10))
            .confidence;
        let jammed_scene = SceneContext {
            jamming_suspected: true,
            ..Default::default()
        };
        let jammed = clf.classify(&jammed_scene, &features(20.0, 1.0, 10)).confidence;
        assert!(jammed < clean);
    }
}
