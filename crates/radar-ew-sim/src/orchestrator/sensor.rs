//! The sensor pipeline: one full per-tick processing chain.
//!
//! Tick order is fixed: target physics → pulse synthesis → Range-Doppler map
//! → CFAR detection → non-blocking poll for EW feedback → (if the map was
//! jammed) re-detection on the degraded map → tracking/association →
//! classifier enrichment → threat assessment → intelligence publish.
//! Detection always precedes tracking, and EW ingestion always precedes the
//! tracking pass it can affect.

use chrono::Utc;
use std::time::Duration;

use radar_ew_bus::{BusError, GateCounters, GateDecision, PacketGate, SensorEndpoint};
use radar_ew_core::utils::linear_to_db;
use radar_ew_core::{
    IntelligencePacket, KinematicFeatures, SceneContext, TrackClassifier, TrackStatus,
};
use radar_ew_signal::{
    cluster_detections, CaCfar, OsCfar, PulseSynthesizer, RangeDopplerMap, RangeDopplerProcessor,
    SignalError, TargetTruth,
};
use thiserror::Error;

use crate::ew::DegradationModel;
use crate::threat::assess_threats;
use crate::tracking::TrackManager;
use crate::SimConfig;

/// Which CFAR estimator the detection stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CfarKind {
    /// Cell-averaging CFAR (sliding window).
    CellAveraging,
    /// Ordered-statistic CFAR (median rank).
    OrderedStatistic,
}

enum Detector {
    Ca(CaCfar),
    Os(OsCfar),
}

impl Detector {
    fn detect(&self, map: &RangeDopplerMap) -> ndarray::Array2<bool> {
        match self {
            Self::Ca(cfar) => cfar.detect(map),
            Self::Os(cfar) => cfar.detect(map),
        }
    }
}

/// Errors from one sensor tick.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SensorTickError {
    /// Signal-processing stage failed.
    #[error("signal stage failed: {0}")]
    Signal(#[from] SignalError),

    /// The bus is gone (not a full queue, which is tolerated).
    #[error("bus failure: {0}")]
    Bus(BusError),
}

/// What one sensor tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTickReport {
    /// Frame counter.
    pub frame_id: u64,
    /// Detections handed to the tracker (post-clustering, post-EW).
    pub detections: usize,
    /// Live tracks after the update.
    pub live_tracks: usize,
    /// Confirmed tracks after the update.
    pub confirmed_tracks: usize,
    /// Whether the intelligence packet was enqueued (false = dropped).
    pub published: bool,
    /// Broadband SNR reduction applied by EW feedback this tick, in dB.
    pub snr_reduction_db: f64,
}

/// The sensor execution unit's private state.
pub struct SensorPipeline {
    sensor_id: String,
    dt_secs: f64,
    publish_timeout: Duration,
    synthesizer: PulseSynthesizer,
    processor: RangeDopplerProcessor,
    detector: Detector,
    tracker: TrackManager,
    degradation: DegradationModel,
    classifier: Box<dyn TrackClassifier>,
    gate: PacketGate,
    endpoint: SensorEndpoint,
    targets: Vec<TargetTruth>,
    max_range_m: f64,
    frame_id: u64,
}

impl SensorPipeline {
    /// Assemble the pipeline from the run configuration and the sensor's bus
    /// endpoint.
    pub fn new(
        config: &SimConfig,
        endpoint: SensorEndpoint,
        classifier: Box<dyn TrackClassifier>,
    ) -> Result<Self, SignalError> {
        let detector = match config.cfar_kind {
            CfarKind::CellAveraging => Detector::Ca(CaCfar::new(config.cfar)?),
            CfarKind::OrderedStatistic => Detector::Os(OsCfar::new(config.cfar)?),
        };
        Ok(Self {
            sensor_id: config.sensor_id.clone(),
            dt_secs: 1.0 / config.tick_rate_hz,
            publish_timeout: Duration::from_millis(config.publish_timeout_ms),
            synthesizer: PulseSynthesizer::new(config.synth, config.seed)?,
            processor: RangeDopplerProcessor::new(config.synth.geometry()),
            detector,
            tracker: TrackManager::new(config.tracker),
            degradation: DegradationModel::new(config.ew, config.seed.wrapping_add(1)),
            classifier,
            gate: PacketGate::new(
                Duration::from_millis(config.staleness_threshold_ms),
                config.stale_policy,
            ),
            endpoint,
            targets: config.targets.clone(),
            max_range_m: config.synth.max_range_m(),
            frame_id: 0,
        })
    }

    /// Run one full sensor tick.
    pub fn tick(&mut self) -> Result<SensorTickReport, SensorTickError> {
        self.frame_id += 1;
        let frame_id = self.frame_id;

        // Target physics.
        for target in &mut self.targets {
            target.advance(self.dt_secs, self.max_range_m);
        }

        // New frame: clear last frame's EW flags before new feedback lands.
        self.tracker.begin_frame();

        // Signal synthesis and map formation.
        let pulses = self.synthesizer.synthesize(&self.targets)?;
        let mut map = self.processor.process(&pulses)?;

        // First detection pass.
        let mut detections = cluster_detections(&map, &self.detector.detect(&map));

        // Non-blocking EW feedback ingestion; at most one packet per tick.
        let mut snr_reduction_db = 0.0;
        let mut jamming_suspected = false;
        if let Some(attack) = self.endpoint.try_recv_attack() {
            match self.gate.gate_attack(&attack, Utc::now()) {
                GateDecision::Discard => {}
                GateDecision::Process | GateDecision::ProcessStale => {
                    let report =
                        self.degradation
                            .apply(frame_id, &attack, &mut map, &mut self.tracker);
                    if report.applied {
                        jamming_suspected = !attack.countermeasures.is_empty();
                        snr_reduction_db = report.snr_reduction_db;
                        if report.snr_reduction_db > 0.0 {
                            // The map changed under us: detect again on the
                            // degraded picture.
                            detections =
                                cluster_detections(&map, &self.detector.detect(&map));
                        }
                    }
                }
            }
        }

        // Tracking and association.
        self.tracker.update(&detections, self.dt_secs);

        // Snapshot, classify, assess.
        let mut tracks = self.tracker.snapshots();
        let scene_context = SceneContext {
            confirmed_tracks: self.tracker.confirmed_count(),
            tentative_tracks: self.tracker.tentative_count(),
            jamming_suspected,
            noise_floor_db: linear_to_db(map.mean_magnitude().max(f64::MIN_POSITIVE)),
        };
        for track in &mut tracks {
            if track.status == TrackStatus::Confirmed {
                let classification = self
                    .classifier
                    .classify(&scene_context, &KinematicFeatures::from_snapshot(track));
                track.class_label = Some(classification.label);
                track.class_confidence = Some(classification.confidence);
            }
        }
        let threat_assessments = assess_threats(&tracks);

        let overall_confidence = if tracks.is_empty() {
            0.5
        } else {
            (tracks.iter().map(|t| t.confidence).sum::<f64>() / tracks.len() as f64)
                .clamp(0.0, 1.0)
        };

        let packet = IntelligencePacket {
            frame_id,
            sensor_id: self.sensor_id.clone(),
            timestamp: Utc::now(),
            tracks: tracks.clone(),
            threat_assessments,
            scene_context,
            overall_confidence,
        };

        // Publish; a full queue is a tolerated drop, a dead bus is not.
        let published = match self.endpoint.publish_intel(packet, self.publish_timeout) {
            Ok(()) => true,
            Err(BusError::QueueFull { .. }) => false,
            Err(err) => return Err(SensorTickError::Bus(err)),
        };

        let report = SensorTickReport {
            frame_id,
            detections: detections.len(),
            live_tracks: self.tracker.live_count(),
            confirmed_tracks: self.tracker.confirmed_count(),
            published,
            snr_reduction_db,
        };
        tracing::debug!(
            frame = report.frame_id,
            detections = report.detections,
            tracks = report.live_tracks,
            confirmed = report.confirmed_tracks,
            published = report.published,
            "sensor tick complete"
        );
        Ok(report)
    }

    /// The tracker, for end-of-run reporting.
    pub fn tracker(&self) -> &TrackManager {
        &self.tracker
    }

    /// Receiver-gate counters.
    pub fn gate_counters(&self) -> GateCounters {
        self.gate.counters()
    }

    /// Frames processed so far.
    pub fn frames(&self) -> u64 {
        self.frame_id
    }
}
