//! Adaptive (CFAR) thresholding over a Range-Doppler map.
//!
//! Two estimators are provided. Cell-averaging CFAR runs in O(1) per cell via
//! a summed-area table, which is what lets it keep up with full-size maps.
//! Ordered-statistic CFAR sorts each cell's local training window and is more
//! robust near clutter edges at a higher per-cell cost.

use ndarray::Array2;

use crate::range_doppler::RangeDopplerMap;
use crate::{SignalError, SignalResult};

/// CFAR window and false-alarm-rate parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CfarConfig {
    /// Guard cell radius around the cell under test.
    pub guard: usize,
    /// Training cell radius beyond the guard band.
    pub train: usize,
    /// Target probability of false alarm.
    pub pfa: f64,
}

impl Default for CfarConfig {
    fn default() -> Self {
        Self {
            guard: 2,
            train: 8,
            pfa: 1e-6,
        }
    }
}

impl CfarConfig {
    /// Number of training cells in the full (untruncated) window:
    /// `(2(t+g)+1)^2 - (2g+1)^2`.
    pub fn num_train(&self) -> usize {
        let full = 2 * (self.train + self.guard) + 1;
        let inner = 2 * self.guard + 1;
        full * full - inner * inner
    }

    /// CFAR threshold multiplier `alpha = N * (Pfa^(-1/N) - 1)`.
    pub fn alpha(&self) -> f64 {
        let n = self.num_train() as f64;
        n * (self.pfa.powf(-1.0 / n) - 1.0)
    }

    fn validate(&self) -> SignalResult<()> {
        if self.train == 0 {
            return Err(SignalError::InvalidCfarParameters {
                reason: "train radius must be at least 1".into(),
            });
        }
        if !(self.pfa > 0.0 && self.pfa < 1.0) {
            return Err(SignalError::InvalidCfarParameters {
                reason: format!("pfa must be in (0, 1), got {}", self.pfa),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Summed-area table
// ---------------------------------------------------------------------------

/// Integral image over the map magnitudes; rectangle sums in O(1).
struct SummedArea {
    /// `(rows+1) x (cols+1)` cumulative sums.
    table: Array2<f64>,
    rows: usize,
    cols: usize,
}

impl SummedArea {
    fn build(map: &Array2<f64>) -> Self {
        let (rows, cols) = map.dim();
        let mut table = Array2::<f64>::zeros((rows + 1, cols + 1));
        for r in 0..rows {
            for c in 0..cols {
                table[(r + 1, c + 1)] =
                    map[(r, c)] + table[(r, c + 1)] + table[(r + 1, c)] - table[(r, c)];
            }
        }
        Self { table, rows, cols }
    }

    /// Sum and cell count of the window centred at `(r, c)` with `radius`,
    /// truncated at the map boundary.
    fn window(&self, r: usize, c: usize, radius: usize) -> (f64, usize) {
        let r0 = r.saturating_sub(radius);
        let c0 = c.saturating_sub(radius);
        let r1 = (r + radius).min(self.rows - 1);
        let c1 = (c + radius).min(self.cols - 1);
        let sum = self.table[(r1 + 1, c1 + 1)] - self.table[(r0, c1 + 1)]
            - self.table[(r1 + 1, c0)]
            + self.table[(r0, c0)];
        (sum, (r1 - r0 + 1) * (c1 - c0 + 1))
    }
}

// ---------------------------------------------------------------------------
// CA-CFAR
// ---------------------------------------------------------------------------

/// Cell-averaging CFAR with a sliding-window (integral image) noise estimate.
#[derive(Debug, Clone)]
pub struct CaCfar {
    config: CfarConfig,
    alpha: f64,
}

impl CaCfar {
    /// Build the detector, pre-computing the threshold multiplier.
    pub fn new(config: CfarConfig) -> SignalResult<Self> {
        config.validate()?;
        Ok(Self {
            alpha: config.alpha(),
            config,
        })
    }

    /// The detector configuration.
    pub fn config(&self) -> CfarConfig {
        self.config
    }

    /// Threshold each cell against the local training mean.
    ///
    /// The training region is the full window minus the guard window; at map
    /// edges both windows truncate and the mean uses the cells actually
    /// available.
    pub fn detect(&self, map: &RangeDopplerMap) -> Array2<bool> {
        let (rows, cols) = map.magnitude.dim();
        let sat = SummedArea::build(&map.magnitude);
        let full_radius = self.config.train + self.config.guard;
        let guard_radius = self.config.guard;

        let mut hits = Array2::<bool>::from_elem((rows, cols), false);
        for r in 0..rows {
            for c in 0..cols {
                let (full_sum, full_count) = sat.window(r, c, full_radius);
                let (guard_sum, guard_count) = sat.window(r, c, guard_radius);
                let train_count = full_count - guard_count;
                if train_count == 0 {
                    continue;
                }
                let noise = (full_sum - guard_sum) / train_count as f64;
                let threshold = self.alpha * noise;
                if map.magnitude[(r, c)] > threshold {
                    hits[(r, c)] = true;
                }
            }
        }
        hits
    }
}

// ---------------------------------------------------------------------------
// OS-CFAR
// ---------------------------------------------------------------------------

/// Ordered-statistic CFAR: the noise estimate is the k-th smallest training
/// cell in the local window (guard band excluded), default the median.
#[derive(Debug, Clone)]
pub struct OsCfar {
    config: CfarConfig,
    /// Rank of the order statistic; `None` selects the median of the cells
    /// actually present in the (possibly truncated) window.
    rank: Option<usize>,
    alpha: f64,
}

impl OsCfar {
    /// Build the detector with the median order statistic.
    pub fn new(config: CfarConfig) -> SignalResult<Self> {
        Self::with_rank(config, None)
    }

    /// Build the detector with an explicit order-statistic rank (0-based
    /// index into the sorted training cells of the full window).
    pub fn with_rank(config: CfarConfig, rank: Option<usize>) -> SignalResult<Self> {
        config.validate()?;
        if let Some(k) = rank {
            if k >= config.num_train() {
                return Err(SignalError::InvalidCfarParameters {
                    reason: format!(
                        "rank {} exceeds training cell count {}",
                        k,
                        config.num_train()
                    ),
                });
            }
        }
        Ok(Self {
            alpha: config.alpha(),
            config,
            rank,
        })
    }

    /// Threshold each cell against the k-th smallest training cell.
    ///
    /// Per-cell windows truncate at map boundaries; a fixed rank is clamped
    /// to the cells actually present.
    pub fn detect(&self, map: &RangeDopplerMap) -> Array2<bool> {
        let (rows, cols) = map.magnitude.dim();
        let full_radius = (self.config.train + self.config.guard) as isize;
        let guard_radius = self.config.guard as isize;

        let mut hits = Array2::<bool>::from_elem((rows, cols), false);
        let mut training = Vec::with_capacity(self.config.num_train());

        for r in 0..rows {
            for c in 0..cols {
                training.clear();
                let ri = r as isize;
                let ci = c as isize;
                for dr in -full_radius..=full_radius {
                    for dc in -full_radius..=full_radius {
                        if dr.abs() <= guard_radius && dc.abs() <= guard_radius {
                            continue;
                        }
                        let rr = ri + dr;
                        let cc = ci + dc;
                        if rr < 0 || cc < 0 || rr >= rows as isize || cc >= cols as isize {
                            continue;
                        }
                        training.push(map.magnitude[(rr as usize, cc as usize)]);
                    }
                }
                if training.is_empty() {
                    continue;
                }
                let k = self
                    .rank
                    .unwrap_or(training.len() / 2)
                    .min(training.len() - 1);
                let (_, kth, _) =
                    training.select_nth_unstable_by(k, |a, b| a.total_cmp(b));
                let threshold = self.alpha * *kth;
                if map.magnitude[(r, c)] > threshold {
                    hits[(r, c)] = true;
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_doppler::MapGeometry;

    fn flat_map(rows: usize, cols: usize, level: f64) -> RangeDopplerMap {
        RangeDopplerMap {
            magnitude: Array2::from_elem((rows, cols), level),
            geometry: MapGeometry {
                range_resolution_m: 50.0,
                velocity_resolution_mps: 2.0,
            },
        }
    }

    #[test]
    fn num_train_and_alpha_reference_values() {
        let config = CfarConfig {
            guard: 2,
            train: 8,
            pfa: 1e-6,
        };
        assert_eq!(config.num_train(), 416);
        assert!((config.alpha() - 14.05).abs() < 0.01);
    }

    #[test]
    fn alpha_at_least_one_across_parameterizations() {
        for guard in 0..4 {
            for train in 1..10 {
                for pfa in [1e-2, 1e-4, 1e-6, 1e-8] {
                    let config = CfarConfig { guard, train, pfa };
                    assert!(config.num_train() > 0);
                    assert!(
                        config.alpha() >= 1.0,
                        "alpha {} for guard={guard} train={train} pfa={pfa}",
                        config.alpha()
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_zero_train_radius() {
        let config = CfarConfig {
            guard: 1,
            train: 0,
            pfa: 1e-4,
        };
        assert!(CaCfar::new(config).is_err());
        assert!(OsCfar::new(config).is_err());
    }

    #[test]
    fn ca_cfar_finds_isolated_peak() {
        let mut map = flat_map(64, 64, 1.0);
        map.magnitude[(30, 30)] = 100.0;

        let cfar = CaCfar::new(CfarConfig {
            guard: 1,
            train: 4,
            pfa: 1e-4,
        })
        .unwrap();
        let hits = cfar.detect(&map);

        assert!(hits[(30, 30)]);
        assert_eq!(hits.iter().filter(|&&h| h).count(), 1);
    }

    #[test]
    fn ca_cfar_quiet_on_flat_map() {
        let map = flat_map(64, 64, 1.0);
        let cfar = CaCfar::new(CfarConfig::default()).unwrap();
        let hits = cfar.detect(&map);
        assert!(hits.iter().all(|&h| !h));
    }

    #[test]
    fn os_cfar_finds_peak_near_clutter_edge() {
        // Left half quiet, right half heavy clutter; a target in the quiet
        // half close to the edge must still be detected by the median rank.
        let mut map = flat_map(48, 48, 1.0);
        for r in 0..48 {
            for c in 30..48 {
                map.magnitude[(r, c)] = 20.0;
            }
        }
        map.magnitude[(24, 26)] = 400.0;

        let cfar = OsCfar::new(CfarConfig {
            guard: 1,
            train: 4,
            pfa: 1e-4,
        })
        .unwrap();
        let hits = cfar.detect(&map);
        assert!(hits[(24, 26)]);
    }

    #[test]
    fn os_cfar_rank_must_fit_window() {
        let config = CfarConfig {
            guard: 1,
            train: 2,
            pfa: 1e-4,
        };
        assert!(OsCfar::with_rank(config, Some(config.num_train())).is_err());
        assert!(OsCfar::with_rank(config, Some(0)).is_ok());
    }

    #[test]
    fn boundary_cells_do_not_panic_and_use_truncated_windows() {
        let mut map = flat_map(16, 16, 1.0);
        map.magnitude[(0, 0)] = 500.0;

        let cfar = CaCfar::new(CfarConfig {
            guard: 2,
            train: 8,
            pfa: 1e-6,
        })
        .unwrap();
        let hits = cfar.detect(&map);
        assert!(hits[(0, 0)]);
    }
}
