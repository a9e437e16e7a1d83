//! # radar-ew-signal
//!
//! Signal-level half of the radar/EW simulation: synthesizing pulse returns
//! for a set of point targets, turning a pulse matrix into a Range-Doppler
//! map with a 2D FFT, and extracting detections with adaptive (CFAR)
//! thresholding plus connected-component clustering.
//!
//! The map is ephemeral: the sensor rebuilds it every tick and hands cluster
//! centroids to the tracker, so nothing in this crate holds state across
//! frames except the FFT plans.
//!
//! # Processing chain
//!
//! ```text
//! targets ──► PulseSynthesizer ──► PulseMatrix ──► RangeDopplerProcessor
//!                                                       │ 2D FFT + shift
//!                                                       ▼
//!                    detections ◄── cluster ◄── CFAR ◄── RangeDopplerMap
//! ```

#![warn(missing_docs)]

pub mod cfar;
pub mod clustering;
pub mod range_doppler;
pub mod synth;

pub use cfar::{CaCfar, CfarConfig, OsCfar};
pub use clustering::cluster_detections;
pub use range_doppler::{MapGeometry, PulseMatrix, RangeDopplerMap, RangeDopplerProcessor};
pub use synth::{PulseSynthesizer, SynthConfig, TargetTruth};

use thiserror::Error;

/// Errors raised by the signal-processing chain.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SignalError {
    /// CFAR window does not fit the supplied map, or a parameter is invalid.
    #[error("invalid CFAR parameters: {reason}")]
    InvalidCfarParameters {
        /// Diagnostic for the rejected configuration.
        reason: String,
    },

    /// The pulse matrix has a degenerate shape.
    #[error("invalid pulse matrix shape: {pulses} pulses x {samples} samples")]
    InvalidPulseMatrix {
        /// Number of pulses (slow-time rows).
        pulses: usize,
        /// Samples per pulse (fast-time columns).
        samples: usize,
    },

    /// A synthesis parameter is out of range.
    #[error("invalid synthesis config: {reason}")]
    InvalidSynthConfig {
        /// Diagnostic for the rejected configuration.
        reason: String,
    },
}

/// A specialized `Result` for signal operations.
pub type SignalResult<T> = Result<T, SignalError>;
