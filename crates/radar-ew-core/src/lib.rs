//! # radar-ew-core
//!
//! Shared vocabulary for the radar/EW closed-loop simulation: the wire packets
//! exchanged between the sensor and effector roles, track and countermeasure
//! records, subsystem health states, and the classifier seam.
//!
//! The crate is deliberately thin. The sensor pipeline, the tracker, the event
//! bus and the orchestrator all live in their own crates and agree only on the
//! types defined here; tracks in particular are referenced across crate
//! boundaries exclusively by [`TrackId`], never by pointer.
//!
//! # Example
//!
//! ```rust
//! use radar_ew_core::{Countermeasure, CountermeasureType, TrackId};
//!
//! let cm = Countermeasure::noise_jam(TrackId::new(7), 30.0, 0.8);
//! assert!(matches!(cm.cm_type, CountermeasureType::NoiseJam));
//! assert!(cm.validate().is_ok());
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::{CoreError, CoreResult, ValidationError};
pub use traits::{Classification, KinematicFeatures, TrackClassifier};
pub use types::{
    AttackPacket, Countermeasure, CountermeasureType, Detection, EngagementStatus,
    IntelligencePacket, SceneContext, SubsystemState, SubsystemStatus, ThreatAssessment,
    ThreatLevel, TrackId, TrackSnapshot, TrackStatus, FALSE_TRACK_ID_BASE,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
