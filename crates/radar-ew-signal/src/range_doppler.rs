//! Range-Doppler map formation.
//!
//! A coherent processing interval arrives as a pulse matrix (slow time x fast
//! time). Fast-time FFT resolves range, slow-time FFT resolves Doppler; the
//! Doppler axis is FFT-shifted so zero velocity sits in the centre row.

use ndarray::Array2;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::{SignalError, SignalResult};

/// One coherent processing interval of complex baseband samples.
///
/// Rows are pulses (slow time), columns are samples within a pulse (fast
/// time).
#[derive(Debug, Clone)]
pub struct PulseMatrix {
    /// Complex samples, shape `(pulses, samples_per_pulse)`.
    pub data: Array2<Complex64>,
}

impl PulseMatrix {
    /// Wrap a sample matrix, rejecting degenerate shapes.
    pub fn new(data: Array2<Complex64>) -> SignalResult<Self> {
        let (pulses, samples) = data.dim();
        if pulses < 2 || samples < 2 {
            return Err(SignalError::InvalidPulseMatrix { pulses, samples });
        }
        Ok(Self { data })
    }

    /// Number of pulses (slow-time length, Doppler bins after processing).
    pub fn pulses(&self) -> usize {
        self.data.nrows()
    }

    /// Samples per pulse (fast-time length, range bins after processing).
    pub fn samples_per_pulse(&self) -> usize {
        self.data.ncols()
    }
}

/// Physical scaling of the map axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapGeometry {
    /// Metres per range bin.
    pub range_resolution_m: f64,
    /// Metres/second per Doppler bin.
    pub velocity_resolution_mps: f64,
}

impl MapGeometry {
    /// Range of a bin centre in metres.
    pub fn range_at(&self, range_bin: usize) -> f64 {
        range_bin as f64 * self.range_resolution_m
    }

    /// Signed radial velocity of a (shifted) Doppler bin, given the number of
    /// Doppler rows in the map.
    pub fn velocity_at(&self, doppler_bin: usize, doppler_bins: usize) -> f64 {
        (doppler_bin as f64 - (doppler_bins / 2) as f64) * self.velocity_resolution_mps
    }
}

/// Magnitude Range-Doppler map for one frame.
///
/// Axes are `(doppler_bin, range_bin)`; all amplitudes are non-negative. The
/// map is rebuilt from scratch every tick.
#[derive(Debug, Clone)]
pub struct RangeDopplerMap {
    /// Cell magnitudes, shape `(doppler_bins, range_bins)`.
    pub magnitude: Array2<f64>,
    /// Axis scaling.
    pub geometry: MapGeometry,
}

impl RangeDopplerMap {
    /// Number of Doppler rows.
    pub fn doppler_bins(&self) -> usize {
        self.magnitude.nrows()
    }

    /// Number of range columns.
    pub fn range_bins(&self) -> usize {
        self.magnitude.ncols()
    }

    /// Peak cell power (squared magnitude) over the whole map.
    pub fn peak_power(&self) -> f64 {
        self.magnitude
            .iter()
            .fold(0.0f64, |acc, &m| acc.max(m * m))
    }

    /// Mean cell magnitude, a crude noise-floor proxy used for scene context.
    pub fn mean_magnitude(&self) -> f64 {
        if self.magnitude.is_empty() {
            return 0.0;
        }
        self.magnitude.sum() / self.magnitude.len() as f64
    }

    /// Scale every cell by `factor` (broadband attenuation).
    pub fn attenuate(&mut self, factor: f64) {
        self.magnitude.mapv_inplace(|m| m * factor);
    }

    /// Range in metres of a range bin centre.
    pub fn range_at(&self, range_bin: usize) -> f64 {
        self.geometry.range_at(range_bin)
    }

    /// Signed radial velocity of a Doppler row.
    pub fn velocity_at(&self, doppler_bin: usize) -> f64 {
        self.geometry.velocity_at(doppler_bin, self.doppler_bins())
    }
}

/// Turns pulse matrices into Range-Doppler maps.
///
/// FFT plans are created once per matrix shape and reused across frames.
pub struct RangeDopplerProcessor {
    geometry: MapGeometry,
    fast_fft: Option<(usize, Arc<dyn Fft<f64>>)>,
    slow_fft: Option<(usize, Arc<dyn Fft<f64>>)>,
    planner: FftPlanner<f64>,
}

impl std::fmt::Debug for RangeDopplerProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeDopplerProcessor")
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl RangeDopplerProcessor {
    /// Create a processor producing maps with the given axis scaling.
    pub fn new(geometry: MapGeometry) -> Self {
        Self {
            geometry,
            fast_fft: None,
            slow_fft: None,
            planner: FftPlanner::new(),
        }
    }

    /// The axis scaling applied to produced maps.
    pub fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    fn plan_fast(&mut self, len: usize) -> Arc<dyn Fft<f64>> {
        match &self.fast_fft {
            Some((cached_len, fft)) if *cached_len == len => Arc::clone(fft),
            _ => {
                let fft = self.planner.plan_fft_forward(len);
                self.fast_fft = Some((len, Arc::clone(&fft)));
                fft
            }
        }
    }

    fn plan_slow(&mut self, len: usize) -> Arc<dyn Fft<f64>> {
        match &self.slow_fft {
            Some((cached_len, fft)) if *cached_len == len => Arc::clone(fft),
            _ => {
                let fft = self.planner.plan_fft_forward(len);
                self.slow_fft = Some((len, Arc::clone(&fft)));
                fft
            }
        }
    }

    /// Compute the magnitude Range-Doppler map for one pulse matrix.
    ///
    /// Fast-time FFT per pulse row, then slow-time FFT per range column, then
    /// an FFT shift of the Doppler axis so zero velocity is the centre row.
    pub fn process(&mut self, pulses: &PulseMatrix) -> SignalResult<RangeDopplerMap> {
        let n_pulses = pulses.pulses();
        let n_samples = pulses.samples_per_pulse();

        let fast = self.plan_fast(n_samples);
        let slow = self.plan_slow(n_pulses);

        // Fast-time FFT: range compression per pulse.
        let mut stage = pulses.data.clone();
        let mut row_buf = vec![Complex64::new(0.0, 0.0); n_samples];
        for mut row in stage.rows_mut() {
            for (dst, src) in row_buf.iter_mut().zip(row.iter()) {
                *dst = *src;
            }
            fast.process(&mut row_buf);
            for (dst, src) in row.iter_mut().zip(row_buf.iter()) {
                *dst = *src;
            }
        }

        // Slow-time FFT: Doppler resolution per range bin, with FFT shift.
        let mut magnitude = Array2::<f64>::zeros((n_pulses, n_samples));
        let mut col_buf = vec![Complex64::new(0.0, 0.0); n_pulses];
        let half = n_pulses / 2;
        for range_bin in 0..n_samples {
            for (pulse, value) in col_buf.iter_mut().enumerate() {
                *value = stage[(pulse, range_bin)];
            }
            slow.process(&mut col_buf);
            for (k, value) in col_buf.iter().enumerate() {
                let shifted = (k + half) % n_pulses;
                magnitude[(shifted, range_bin)] = value.norm();
            }
        }

        Ok(RangeDopplerMap {
            magnitude,
            geometry: self.geometry,
        })
    }
}
