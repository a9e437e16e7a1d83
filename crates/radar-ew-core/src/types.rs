//! Core data model: tracks, detections, countermeasures, wire packets and
//! subsystem health records.
//!
//! Everything that crosses the sensor/effector boundary is plain data with
//! `serde` derives; the bus and the file transport both ship these types as
//! self-describing JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// TrackId
// ---------------------------------------------------------------------------

/// Start of the id space reserved for EW-injected false tracks.
///
/// Real tracks are numbered from 1 upward; ghost tracks spawned by deception
/// jamming live at `FALSE_TRACK_ID_BASE` and above so the two populations can
/// never collide.
pub const FALSE_TRACK_ID_BASE: u64 = 1_000_000;

/// Stable identifier for a single tracked target.
///
/// Ids are allocated monotonically by the track manager and are never reused,
/// even after the underlying track is deleted and purged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TrackId(u64);

impl TrackId {
    /// Wrap a raw id value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// True if this id belongs to the false-track id space.
    pub const fn is_false_track_id(&self) -> bool {
        self.0 >= FALSE_TRACK_ID_BASE
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// One raw detection out of the CFAR stage, expressed both in map bins and in
/// physical measurement coordinates.
///
/// `range_m`/`velocity_mps` are derived once from the map's bin resolution so
/// the tracker never needs to know the map geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Range bin index in the Range-Doppler map.
    pub range_bin: usize,
    /// Doppler bin index in the Range-Doppler map.
    pub doppler_bin: usize,
    /// Cell magnitude at the detection (cluster centroids carry the summed
    /// cluster amplitude).
    pub amplitude: f64,
    /// Range in metres.
    pub range_m: f64,
    /// Radial velocity in metres per second (signed; negative is closing).
    pub velocity_mps: f64,
}

impl Detection {
    /// Position of this detection in the tracker's measurement plane.
    pub fn measurement(&self) -> [f64; 2] {
        [self.range_m, self.velocity_mps]
    }
}

// ---------------------------------------------------------------------------
// Track snapshot
// ---------------------------------------------------------------------------

/// Lifecycle state of a track as exported over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackStatus {
    /// Newly spawned, not yet confirmed.
    Tentative,
    /// Confirmed by enough consecutive updates.
    Confirmed,
    /// Coasted too long; awaiting the periodic purge sweep.
    Deleted,
}

/// Wire-facing view of one track.
///
/// The track manager owns the live track records (Kalman state included); this
/// snapshot is what gets classified, threat-assessed and published. EW effects
/// mutate snapshots, never the manager's internal state directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Stable track id.
    pub id: TrackId,
    /// Lifecycle state at snapshot time.
    pub status: TrackStatus,
    /// Estimated range in metres.
    pub range_m: f64,
    /// Estimated radial velocity in m/s.
    pub velocity_mps: f64,
    /// Estimated range rate of the filter state (m/s per tick axis).
    pub range_rate: f64,
    /// Estimated velocity rate of the filter state.
    pub velocity_rate: f64,
    /// Number of successful measurement updates.
    pub measurement_count: u32,
    /// Consecutive missed updates.
    pub missed_count: u32,
    /// Track quality in [0, 1]; degraded by active countermeasures.
    pub quality: f64,
    /// Track confidence in [0, 1] from the lifecycle model.
    pub confidence: f64,
    /// True once any countermeasure has degraded this track this frame.
    pub ew_degraded: bool,
    /// True for ghost tracks injected by deception jamming.
    pub is_false_track: bool,
    /// Accumulated EW-induced range drift in metres.
    pub drift_range_m: f64,
    /// Accumulated EW-induced velocity drift in m/s.
    pub drift_velocity_mps: f64,
    /// Classifier label, once enriched.
    pub class_label: Option<String>,
    /// Classifier confidence for `class_label`.
    pub class_confidence: Option<f64>,
}

// ---------------------------------------------------------------------------
// Countermeasures
// ---------------------------------------------------------------------------

/// Closed set of countermeasure techniques the effector can field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountermeasureType {
    /// Broadband noise jamming: raises the noise floor across the whole map.
    NoiseJam,
    /// Deception jamming: seduces the tracker and may spawn ghost tracks.
    DeceptionJam,
    /// Expendable false-target generation.
    FalseTarget,
}

impl CountermeasureType {
    /// Relative weight this technique contributes to track quality loss.
    pub const fn quality_weight(&self) -> f64 {
        match self {
            Self::NoiseJam => 0.30,
            Self::DeceptionJam => 0.45,
            Self::FalseTarget => 0.20,
        }
    }
}

impl std::fmt::Display for CountermeasureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoiseJam => "noise-jam",
            Self::DeceptionJam => "deception-jam",
            Self::FalseTarget => "false-target",
        };
        f.write_str(name)
    }
}

/// A single countermeasure engagement against one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Countermeasure {
    /// Countermeasure instance id (unique within one attack packet stream).
    pub id: u64,
    /// The track this countermeasure is directed at.
    pub target_track_id: TrackId,
    /// Technique in use.
    pub cm_type: CountermeasureType,
    /// Transmit power in dBm.
    pub power_dbm: f64,
    /// Modelled effectiveness in [0, 1].
    pub effectiveness: f64,
    /// Effector confidence that this engagement is worthwhile.
    pub confidence: f64,
    /// Effector-side prediction of the SNR reduction it will cause, in dB.
    pub predicted_snr_reduction_db: f64,
}

impl Countermeasure {
    /// Convenience constructor for a noise-jamming engagement.
    pub fn noise_jam(target: TrackId, power_dbm: f64, effectiveness: f64) -> Self {
        Self {
            id: 0,
            target_track_id: target,
            cm_type: CountermeasureType::NoiseJam,
            power_dbm,
            effectiveness: effectiveness.clamp(0.0, 1.0),
            confidence: effectiveness.clamp(0.0, 1.0),
            predicted_snr_reduction_db: 0.0,
        }
    }

    /// Convenience constructor for a deception-jamming engagement.
    pub fn deception_jam(target: TrackId, power_dbm: f64, effectiveness: f64) -> Self {
        Self {
            id: 0,
            target_track_id: target,
            cm_type: CountermeasureType::DeceptionJam,
            power_dbm,
            effectiveness: effectiveness.clamp(0.0, 1.0),
            confidence: effectiveness.clamp(0.0, 1.0),
            predicted_snr_reduction_db: 0.0,
        }
    }

    /// Field-range sanity check used by packet validation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.effectiveness.is_finite() || !(0.0..=1.0).contains(&self.effectiveness) {
            return Err(ValidationError::FieldOutOfRange {
                field: "effectiveness",
                value: self.effectiveness,
            });
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::FieldOutOfRange {
                field: "confidence",
                value: self.confidence,
            });
        }
        if !self.power_dbm.is_finite() {
            return Err(ValidationError::FieldOutOfRange {
                field: "power_dbm",
                value: self.power_dbm,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Threat assessment and scene context
// ---------------------------------------------------------------------------

/// Coarse threat ranking attached to a track by the sensor role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreatLevel {
    /// No engagement recommended.
    Low,
    /// Engagement optional.
    Medium,
    /// Engagement recommended.
    High,
}

/// Per-track threat assessment carried in an intelligence packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    /// Track being assessed.
    pub track_id: TrackId,
    /// Ranked threat level.
    pub threat_level: ThreatLevel,
    /// Engagement priority; higher engages first.
    pub priority: f64,
}

/// Scene-level context shipped to the classifier and the effector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneContext {
    /// Number of currently confirmed tracks.
    pub confirmed_tracks: usize,
    /// Number of tentative tracks.
    pub tentative_tracks: usize,
    /// Whether the sensor believes it is currently being jammed.
    pub jamming_suspected: bool,
    /// Mean map noise floor estimate in dB.
    pub noise_floor_db: f64,
}

impl Default for SceneContext {
    fn default() -> Self {
        Self {
            confirmed_tracks: 0,
            tentative_tracks: 0,
            jamming_suspected: false,
            noise_floor_db: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire packets
// ---------------------------------------------------------------------------

/// Sensor → effector tactical picture for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligencePacket {
    /// Monotonic frame counter on the sensor side.
    pub frame_id: u64,
    /// Identity of the publishing sensor.
    pub sensor_id: String,
    /// Publication timestamp.
    pub timestamp: DateTime<Utc>,
    /// Current track table snapshot.
    pub tracks: Vec<TrackSnapshot>,
    /// Threat ranking over the confirmed tracks.
    pub threat_assessments: Vec<ThreatAssessment>,
    /// Scene-level context.
    pub scene_context: SceneContext,
    /// Aggregate confidence over the published picture.
    pub overall_confidence: f64,
}

impl IntelligencePacket {
    /// Schema sanity check applied by receivers before processing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sensor_id.is_empty() {
            return Err(ValidationError::MissingField { field: "sensor_id" });
        }
        if !self.overall_confidence.is_finite()
            || !(0.0..=1.0).contains(&self.overall_confidence)
        {
            return Err(ValidationError::FieldOutOfRange {
                field: "overall_confidence",
                value: self.overall_confidence,
            });
        }
        for track in &self.tracks {
            if !track.quality.is_finite() || !(0.0..=1.0).contains(&track.quality) {
                return Err(ValidationError::FieldOutOfRange {
                    field: "track.quality",
                    value: track.quality,
                });
            }
        }
        Ok(())
    }
}

/// Status of one countermeasure engagement reported back by the effector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementStatus {
    /// Countermeasure this status refers to.
    pub countermeasure_id: u64,
    /// Track under engagement.
    pub track_id: TrackId,
    /// Whether the engagement is live.
    pub engaged: bool,
    /// Free-form effector notes.
    pub notes: String,
}

/// Effector → sensor countermeasure feedback for one decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackPacket {
    /// Identity of the publishing effector.
    pub effector_id: String,
    /// Publication timestamp.
    pub timestamp: DateTime<Utc>,
    /// Countermeasures active this cycle.
    pub countermeasures: Vec<Countermeasure>,
    /// Per-engagement status.
    pub engagement_status: Vec<EngagementStatus>,
    /// Aggregate modelled effectiveness in [0, 1].
    pub overall_effectiveness: f64,
    /// Effector decision confidence in [0, 1].
    pub decision_confidence: f64,
    /// Expected impact description (e.g. predicted dB of SNR loss).
    pub expected_impact: f64,
}

impl AttackPacket {
    /// Schema sanity check applied by receivers before processing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.effector_id.is_empty() {
            return Err(ValidationError::MissingField { field: "effector_id" });
        }
        if !self.overall_effectiveness.is_finite()
            || !(0.0..=1.0).contains(&self.overall_effectiveness)
        {
            return Err(ValidationError::FieldOutOfRange {
                field: "overall_effectiveness",
                value: self.overall_effectiveness,
            });
        }
        for cm in &self.countermeasures {
            cm.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Subsystem health
// ---------------------------------------------------------------------------

/// Health state of one supervised subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsystemState {
    /// Operating normally.
    Healthy,
    /// Accumulating failures, still running.
    Degraded,
    /// Over the failure threshold; not ticking.
    Failed,
    /// Restart in progress, inside the grace window.
    Recovering,
    /// Deliberately held by the supervisor (cross-subsystem isolation).
    Paused,
}

impl std::fmt::Display for SubsystemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Recovering => "recovering",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Supervisor-maintained health record for one subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemStatus {
    /// Subsystem name ("sensor", "effector").
    pub name: String,
    /// Current state.
    pub state: SubsystemState,
    /// Lifetime failure count.
    pub failure_count: u64,
    /// Consecutive failures since the last success.
    pub consecutive_failures: u32,
    /// Message from the most recent failure, if any.
    pub last_error: Option<String>,
}

impl SubsystemStatus {
    /// Fresh healthy record.
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SubsystemState::Healthy,
            failure_count: 0,
            consecutive_failures: 0,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track(id: u64) -> TrackSnapshot {
        TrackSnapshot {
            id: TrackId::new(id),
            status: TrackStatus::Confirmed,
            range_m: 1200.0,
            velocity_mps: -35.0,
            range_rate: -35.0,
            velocity_rate: 0.0,
            measurement_count: 8,
            missed_count: 0,
            quality: 0.9,
            confidence: 0.86,
            ew_degraded: false,
            is_false_track: false,
            drift_range_m: 0.0,
            drift_velocity_mps: 0.0,
            class_label: Some("fast-mover".into()),
            class_confidence: Some(0.77),
        }
    }

    fn sample_intel() -> IntelligencePacket {
        IntelligencePacket {
            frame_id: 42,
            sensor_id: "sensor-alpha".into(),
            timestamp: Utc::now(),
            tracks: vec![sample_track(3), sample_track(5)],
            threat_assessments: vec![ThreatAssessment {
                track_id: TrackId::new(3),
                threat_level: ThreatLevel::High,
                priority: 0.92,
            }],
            scene_context: SceneContext {
                confirmed_tracks: 2,
                tentative_tracks: 1,
                jamming_suspected: false,
                noise_floor_db: -94.0,
            },
            overall_confidence: 0.81,
        }
    }

    fn sample_attack() -> AttackPacket {
        let mut cm = Countermeasure::noise_jam(TrackId::new(3), 33.0, 0.75);
        cm.id = 1;
        cm.predicted_snr_reduction_db = 9.5;
        AttackPacket {
            effector_id: "effector-bravo".into(),
            timestamp: Utc::now(),
            countermeasures: vec![cm],
            engagement_status: vec![EngagementStatus {
                countermeasure_id: 1,
                track_id: TrackId::new(3),
                engaged: true,
                notes: "initial burn-through".into(),
            }],
            overall_effectiveness: 0.75,
            decision_confidence: 0.8,
            expected_impact: 9.5,
        }
    }

    #[test]
    fn intelligence_packet_round_trip() {
        let packet = sample_intel();
        let json = serde_json::to_string(&packet).unwrap();
        let back: IntelligencePacket = serde_json::from_str(&json).unwrap();
        assert_eq!(packet, back);
    }

    #[test]
    fn attack_packet_round_trip() {
        let packet = sample_attack();
        let json = serde_json::to_string(&packet).unwrap();
        let back: AttackPacket = serde_json::from_str(&json).unwrap();
        assert_eq!(packet, back);
    }

    #[test]
    fn intel_validation_rejects_empty_sensor_id() {
        let mut packet = sample_intel();
        packet.sensor_id.clear();
        assert!(matches!(
            packet.validate(),
            Err(ValidationError::MissingField { field: "sensor_id" })
        ));
    }

    #[test]
    fn attack_validation_rejects_bad_effectiveness() {
        let mut packet = sample_attack();
        packet.countermeasures[0].effectiveness = 1.7;
        assert!(packet.validate().is_err());
    }

    #[test]
    fn false_track_id_space_is_disjoint() {
        let real = TrackId::new(999_999);
        let ghost = TrackId::new(FALSE_TRACK_ID_BASE);
        assert!(!real.is_false_track_id());
        assert!(ghost.is_false_track_id());
    }

    #[test]
    fn threat_levels_are_ordered() {
        assert!(ThreatLevel::High > ThreatLevel::Medium);
        assert!(ThreatLevel::Medium > ThreatLevel::Low);
    }
}
