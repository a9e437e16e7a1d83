//! Detection clustering.
//!
//! A single physical target usually trips CFAR in several adjacent cells.
//! Before anything reaches the tracker, connected regions of the boolean
//! detection map are reduced to one amplitude-weighted centroid each, so the
//! association stage sees one detection per target.

use ndarray::Array2;
use radar_ew_core::Detection;

use crate::range_doppler::RangeDopplerMap;

/// Reduce the CFAR hit map to centroid detections.
///
/// Connectivity is 8-way; each component becomes one [`Detection`] whose bin
/// coordinates are the amplitude-weighted centroid (rounded to the nearest
/// cell) and whose amplitude is the component's peak magnitude.
pub fn cluster_detections(map: &RangeDopplerMap, hits: &Array2<bool>) -> Vec<Detection> {
    let (rows, cols) = hits.dim();
    let mut visited = Array2::<bool>::from_elem((rows, cols), false);
    let mut detections = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for r in 0..rows {
        for c in 0..cols {
            if !hits[(r, c)] || visited[(r, c)] {
                continue;
            }

            // Flood-fill one component.
            let mut weight_sum = 0.0;
            let mut r_weighted = 0.0;
            let mut c_weighted = 0.0;
            let mut peak = 0.0f64;

            visited[(r, c)] = true;
            stack.push((r, c));
            while let Some((cr, cc)) = stack.pop() {
                let magnitude = map.magnitude[(cr, cc)];
                weight_sum += magnitude;
                r_weighted += magnitude * cr as f64;
                c_weighted += magnitude * cc as f64;
                peak = peak.max(magnitude);

                for dr in -1isize..=1 {
                    for dc in -1isize..=1 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        let nr = cr as isize + dr;
                        let nc = cc as isize + dc;
                        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                            continue;
                        }
                        let (nr, nc) = (nr as usize, nc as usize);
                        if hits[(nr, nc)] && !visited[(nr, nc)] {
                            visited[(nr, nc)] = true;
                            stack.push((nr, nc));
                        }
                    }
                }
            }

            if weight_sum <= 0.0 {
                continue;
            }
            let centroid_r = r_weighted / weight_sum;
            let centroid_c = c_weighted / weight_sum;
            let doppler_bin = centroid_r.round() as usize;
            let range_bin = centroid_c.round() as usize;

            detections.push(Detection {
                range_bin,
                doppler_bin,
                amplitude: peak,
                range_m: map.geometry.range_at(range_bin),
                velocity_mps: map.geometry.velocity_at(doppler_bin, rows),
            });
        }
    }

    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_doppler::MapGeometry;

    fn empty_map(rows: usize, cols: usize) -> RangeDopplerMap {
        RangeDopplerMap {
            magnitude: Array2::zeros((rows, cols)),
            geometry: MapGeometry {
                range_resolution_m: 50.0,
                velocity_resolution_mps: 2.0,
            },
        }
    }

    #[test]
    fn no_hits_no_detections() {
        let map = empty_map(32, 32);
        let hits = Array2::from_elem((32, 32), false);
        assert!(cluster_detections(&map, &hits).is_empty());
    }

    #[test]
    fn adjacent_hits_collapse_to_one_detection() {
        let mut map = empty_map(32, 32);
        let mut hits = Array2::from_elem((32, 32), false);
        for (r, c, m) in [(10, 10, 5.0), (10, 11, 10.0), (11, 10, 5.0), (11, 11, 5.0)] {
            map.magnitude[(r, c)] = m;
            hits[(r, c)] = true;
        }

        let detections = cluster_detections(&map, &hits);
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        // Centroid is pulled toward the strongest cell.
        assert!(d.doppler_bin == 10 || d.doppler_bin == 11);
        assert!((d.amplitude - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn separated_hits_stay_separate() {
        let mut map = empty_map(32, 32);
        let mut hits = Array2::from_elem((32, 32), false);
        for (r, c) in [(5, 5), (20, 25)] {
            map.magnitude[(r, c)] = 7.0;
            hits[(r, c)] = true;
        }

        let detections = cluster_detections(&map, &hits);
        assert_eq!(detections.len(), 2);
    }

    #[test]
    fn diagonal_hits_are_connected() {
        let mut map = empty_map(16, 16);
        let mut hits = Array2::from_elem((16, 16), false);
        for (r, c) in [(4, 4), (5, 5), (6, 6)] {
            map.magnitude[(r, c)] = 3.0;
            hits[(r, c)] = true;
        }

        let detections = cluster_detections(&map, &hits);
        assert_eq!(detections.len(), 1);
    }

    #[test]
    fn detection_carries_physical_coordinates() {
        let mut map = empty_map(32, 64);
        let mut hits = Array2::from_elem((32, 64), false);
        map.magnitude[(20, 24)] = 9.0;
        hits[(20, 24)] = true;

        let detections = cluster_detections(&map, &hits);
        let d = &detections[0];
        assert!((d.range_m - 24.0 * 50.0).abs() < 1e-9);
        // Row 20 of 32 is 4 bins above the zero-Doppler centre row 16.
        assert!((d.velocity_mps - 8.0).abs() < 1e-9);
    }
}
