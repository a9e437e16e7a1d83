//! Effector decision logic.
//!
//! Consumes the sensor's tactical picture and decides which countermeasures
//! to field: noise jamming against high-threat tracks, deception against
//! medium threats, nothing against the rest. The output is an
//! [`AttackPacket`] that closes the loop through the event bus.

use chrono::Utc;
use radar_ew_core::{
    AttackPacket, Countermeasure, CountermeasureType, EngagementStatus, IntelligencePacket,
    ThreatLevel,
};
use serde::{Deserialize, Serialize};

/// Engagement rules and transmitter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectorConfig {
    /// Maximum simultaneous engagements per decision cycle.
    pub max_engagements: usize,
    /// Noise jammer transmit power in dBm.
    pub noise_power_dbm: f64,
    /// Deception jammer transmit power in dBm.
    pub deception_power_dbm: f64,
    /// Threats below this priority are ignored.
    pub min_priority: f64,
}

impl Default for EffectorConfig {
    fn default() -> Self {
        Self {
            max_engagements: 4,
            noise_power_dbm: 33.0,
            deception_power_dbm: 30.0,
            min_priority: 0.15,
        }
    }
}

/// Stateful effector decision engine.
pub struct EffectorLogic {
    config: EffectorConfig,
    effector_id: String,
    next_cm_id: u64,
    /// Decision cycles executed.
    cycles: u64,
}

impl EffectorLogic {
    /// Create the engine with a stable effector identity.
    pub fn new(config: EffectorConfig, effector_id: impl Into<String>) -> Self {
        Self {
            config,
            effector_id: effector_id.into(),
            next_cm_id: 1,
            cycles: 0,
        }
    }

    /// The effector identity used on outgoing packets.
    pub fn effector_id(&self) -> &str {
        &self.effector_id
    }

    /// Number of decision cycles executed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Turn one intelligence packet into an attack packet.
    ///
    /// Engages the highest-priority threats first, up to the configured
    /// engagement limit. An empty threat table produces an empty (but valid)
    /// packet so the sensor still sees a heartbeat.
    pub fn decide(&mut self, intel: &IntelligencePacket) -> AttackPacket {
        self.cycles += 1;

        let mut countermeasures = Vec::new();
        let mut engagement_status = Vec::new();

        for assessment in intel
            .threat_assessments
            .iter()
            .filter(|a| a.priority >= self.config.min_priority)
            .take(self.config.max_engagements)
        {
            let (cm_type, power_dbm) = match assessment.threat_level {
                ThreatLevel::High => (CountermeasureType::NoiseJam, self.config.noise_power_dbm),
                ThreatLevel::Medium => (
                    CountermeasureType::DeceptionJam,
                    self.config.deception_power_dbm,
                ),
                ThreatLevel::Low => continue,
            };

            // Effectiveness scales with how confident the sensor is in the
            // track and how urgent the threat is.
            let effectiveness = (0.4 + 0.6 * assessment.priority).clamp(0.0, 1.0);
            let predicted_snr_reduction_db = match cm_type {
                CountermeasureType::NoiseJam => 14.0 * effectiveness,
                CountermeasureType::DeceptionJam => 6.0 * effectiveness,
                CountermeasureType::FalseTarget => 3.0 * effectiveness,
            };

            let cm = Countermeasure {
                id: self.next_cm_id,
                target_track_id: assessment.track_id,
                cm_type,
                power_dbm,
                effectiveness,
                confidence: (assessment.priority * intel.overall_confidence).clamp(0.0, 1.0),
                predicted_snr_reduction_db,
            };
            self.next_cm_id += 1;

            engagement_status.push(EngagementStatus {
                countermeasure_id: cm.id,
                track_id: cm.target_track_id,
                engaged: true,
                notes: format!("{} vs {}", cm.cm_type, cm.target_track_id),
            });
            tracing::debug!(
                cm = cm.id,
                target = %cm.target_track_id,
                technique = %cm.cm_type,
                effectiveness = cm.effectiveness,
                "engagement decided"
            );
            countermeasures.push(cm);
        }

        let overall_effectiveness = if countermeasures.is_empty() {
            0.0
        } else {
            countermeasures.iter().map(|cm| cm.effectiveness).sum::<f64>()
                / countermeasures.len() as f64
        };
        let expected_impact = countermeasures
            .iter()
            .map(|cm| cm.predicted_snr_reduction_db)
            .fold(0.0f64, f64::max);

        AttackPacket {
            effector_id: self.effector_id.clone(),
            timestamp: Utc::now(),
            countermeasures,
            engagement_status,
            overall_effectiveness,
            decision_confidence: (0.5 + 0.5 * intel.overall_confidence).clamp(0.0, 1.0),
            expected_impact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_ew_core::{SceneContext, ThreatAssessment, TrackId};

    fn intel_with(assessments: Vec<ThreatAssessment>) -> IntelligencePacket {
        IntelligencePacket {
            frame_id: 1,
            sensor_id: "sensor".into(),
            timestamp: Utc::now(),
            tracks: vec![],
            threat_assessments: assessments,
            scene_context: SceneContext::default(),
            overall_confidence: 0.8,
        }
    }

    fn threat(id: u64, level: ThreatLevel, priority: f64) -> ThreatAssessment {
        ThreatAssessment {
            track_id: TrackId::new(id),
            threat_level: level,
            priority,
        }
    }

    #[test]
    fn high_threat_gets_noise_jam() {
        let mut logic = EffectorLogic::new(EffectorConfig::default(), "fx-1");
        let attack = logic.decide(&intel_with(vec![threat(1, ThreatLevel::High, 0.9)]));
        assert_eq!(attack.countermeasures.len(), 1);
        assert_eq!(
            attack.countermeasures[0].cm_type,
            CountermeasureType::NoiseJam
        );
        assert!(attack.validate().is_ok());
    }

    #[test]
    fn medium_threat_gets_deception() {
        let mut logic = EffectorLogic::new(EffectorConfig::default(), "fx-1");
        let attack = logic.decide(&intel_with(vec![threat(2, ThreatLevel::Medium, 0.5)]));
        assert_eq!(
            attack.countermeasures[0].cm_type,
            CountermeasureType::DeceptionJam
        );
    }

    #[test]
    fn low_threats_and_low_priorities_are_ignored() {
        let mut logic = EffectorLogic::new(EffectorConfig::default(), "fx-1");
        let attack = logic.decide(&intel_with(vec![
            threat(1, ThreatLevel::Low, 0.9),
            threat(2, ThreatLevel::High, 0.05),
        ]));
        assert!(attack.countermeasures.is_empty());
        assert_eq!(attack.overall_effectiveness, 0.0);
        assert!(attack.validate().is_ok());
    }

    #[test]
    fn engagement_limit_is_respected() {
        let config = EffectorConfig {
            max_engagements: 2,
            ..Default::default()
        };
        let mut logic = EffectorLogic::new(config, "fx-1");
        let assessments = (1..=5)
            .map(|i| threat(i, ThreatLevel::High, 0.9))
            .collect();
        let attack = logic.decide(&intel_with(assessments));
        assert_eq!(attack.countermeasures.len(), 2);
        assert_eq!(attack.engagement_status.len(), 2);
    }

    #[test]
    fn countermeasure_ids_are_unique_across_cycles() {
        let mut logic = EffectorLogic::new(EffectorConfig::default(), "fx-1");
        let a = logic.decide(&intel_with(vec![threat(1, ThreatLevel::High, 0.9)]));
        let b = logic.decide(&intel_with(vec![threat(1, ThreatLevel::High, 0.9)]));
        assert_ne!(a.countermeasures[0].id, b.countermeasures[0].id);
        assert_eq!(logic.cycles(), 2);
    }
}
