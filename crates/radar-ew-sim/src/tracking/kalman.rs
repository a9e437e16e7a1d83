//! Kalman filter for target tracking in the measurement plane.
//!
//! Implements a constant-velocity model over the two measured axes.
//! State: [x, y, vx, vy] where x is range (metres) and y is radial
//! velocity (m/s); observation: [x, y].

/// 4×4 matrix type (row-major)
type Mat4 = [[f64; 4]; 4];
/// 2×2 matrix type (row-major)
type Mat2 = [[f64; 2]; 2];
/// 4-vector
type Vec4 = [f64; 4];
/// 2-vector
type Vec2 = [f64; 2];

/// Initial covariance scale: high uncertainty in all state components.
const INITIAL_COVARIANCE: f64 = 100.0;

/// Kalman filter state for one tracked target.
///
/// The filter uses a constant-velocity motion model with additive white
/// Gaussian process noise (piecewise-constant acceleration discretization).
#[derive(Debug, Clone)]
pub struct KalmanState {
    /// State estimate [x, y, vx, vy]
    pub x: Vec4,
    /// State covariance (4×4, symmetric positive-definite)
    pub p: Mat4,
    /// Process noise: σ_accel squared
    process_noise_var: f64,
    /// Measurement noise: σ_obs squared
    obs_noise_var: f64,
}

impl KalmanState {
    /// Create new state from an initial position observation.
    ///
    /// Initial velocity components are zero and the initial covariance is a
    /// large multiple of the identity.
    pub fn new(initial_position: Vec2, process_noise_var: f64, obs_noise_var: f64) -> Self {
        let x: Vec4 = [initial_position[0], initial_position[1], 0.0, 0.0];

        let mut p = [[0.0f64; 4]; 4];
        for i in 0..4 {
            p[i][i] = INITIAL_COVARIANCE;
        }

        Self {
            x,
            p,
            process_noise_var,
            obs_noise_var,
        }
    }

    /// Predict forward by `dt_secs` using the constant-velocity model.
    ///
    /// State transition: x += dt·vx, y += dt·vy.
    /// Covariance: P ← F·P·Fᵀ + Q with the usual discrete process-noise
    /// blocks (dt⁴/4, dt³/2, dt²) scaled by the acceleration variance.
    pub fn predict(&mut self, dt_secs: f64) {
        for i in 0..2 {
            self.x[i] += dt_secs * self.x[i + 2];
        }

        let mut f = mat4_identity();
        for i in 0..2 {
            f[i][i + 2] = dt_secs;
        }

        let ft = mat4_transpose(&f);
        let fp = mat4_mul(&f, &self.p);
        let fpft = mat4_mul(&fp, &ft);

        let q = build_process_noise(dt_secs, self.process_noise_var);
        self.p = mat4_add(&fpft, &q);
    }

    /// Update the filter with a position observation.
    ///
    /// Observation model: H = [I₂ | 0₂] (only position is observed).
    ///
    /// Innovation:     y = z − H·x
    /// Innovation cov: S = H·P·Hᵀ + R   (2×2, R = σ_obs² · I₂)
    /// Kalman gain:    K = P·Hᵀ · S⁻¹   (4×2)
    /// State update:   x ← x + K·y
    /// Cov update:     P ← (I₄ − K·H)·P
    pub fn update(&mut self, observation: Vec2) {
        let hx: Vec2 = [self.x[0], self.x[1]];
        let y = [observation[0] - hx[0], observation[1] - hx[1]];

        // P·Hᵀ = first 2 columns of P (4×2 matrix)
        let mut ph_t = [[0.0f64; 2]; 4];
        for i in 0..4 {
            for j in 0..2 {
                ph_t[i][j] = self.p[i][j];
            }
        }

        // S = top-left 2×2 of P + R
        let mut s: Mat2 = [[self.p[0][0], self.p[0][1]], [self.p[1][0], self.p[1][1]]];
        for i in 0..2 {
            s[i][i] += self.obs_noise_var;
        }

        let s_inv = match mat2_inv(&s) {
            Some(m) => m,
            // Singular S: skip the update rather than corrupt the state.
            None => return,
        };

        // K = P·Hᵀ · S⁻¹ (4×2)
        let mut k = [[0.0f64; 2]; 4];
        for i in 0..4 {
            for j in 0..2 {
                for l in 0..2 {
                    k[i][j] += ph_t[i][l] * s_inv[l][j];
                }
            }
        }

        // x ← x + K·y
        for i in 0..4 {
            self.x[i] += k[i][0] * y[0] + k[i][1] * y[1];
        }

        // P ← (I₄ − K·H)·P; (K·H)ᵢⱼ = K[i][j] for j < 2, else 0.
        let mut kh = [[0.0f64; 4]; 4];
        for i in 0..4 {
            for j in 0..2 {
                kh[i][j] = k[i][j];
            }
        }
        let i_minus_kh = mat4_sub(&mat4_identity(), &kh);
        self.p = mat4_mul(&i_minus_kh, &self.p);
    }

    /// Euclidean distance from the predicted position to `observation`,
    /// used for association gating.
    pub fn distance_to(&self, observation: Vec2) -> f64 {
        let dx = observation[0] - self.x[0];
        let dy = observation[1] - self.x[1];
        (dx * dx + dy * dy).sqrt()
    }

    /// Current position estimate [x, y].
    pub fn position(&self) -> Vec2 {
        [self.x[0], self.x[1]]
    }

    /// Current velocity estimate [vx, vy].
    pub fn velocity(&self) -> Vec2 {
        [self.x[2], self.x[3]]
    }

    /// Shift the position estimate directly (EW-induced drift).
    pub fn nudge_position(&mut self, dx: f64, dy: f64) {
        self.x[0] += dx;
        self.x[1] += dy;
    }
}

// ---------------------------------------------------------------------------
// Private math helpers
// ---------------------------------------------------------------------------

/// 4×4 matrix multiply: C = A · B.
fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut c = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                c[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    c
}

/// 4×4 matrix element-wise add.
fn mat4_add(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut c = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            c[i][j] = a[i][j] + b[i][j];
        }
    }
    c
}

/// 4×4 matrix element-wise subtract: A − B.
fn mat4_sub(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut c = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            c[i][j] = a[i][j] - b[i][j];
        }
    }
    c
}

/// 4×4 identity matrix.
fn mat4_identity() -> Mat4 {
    let mut m = [[0.0f64; 4]; 4];
    for i in 0..4 {
        m[i][i] = 1.0;
    }
    m
}

/// Transpose of a 4×4 matrix.
fn mat4_transpose(a: &Mat4) -> Mat4 {
    let mut t = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            t[j][i] = a[i][j];
        }
    }
    t
}

/// Analytical inverse of a 2×2 matrix.
///
/// Returns `None` if |det| < 1e-12.
fn mat2_inv(m: &Mat2) -> Option<Mat2> {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [m[1][1] * inv_det, -m[0][1] * inv_det],
        [-m[1][0] * inv_det, m[0][0] * inv_det],
    ])
}

/// Discrete-time process-noise matrix Q for piecewise-constant acceleration.
fn build_process_noise(dt: f64, q_a: f64) -> Mat4 {
    let dt2 = dt * dt;
    let dt3 = dt2 * dt;
    let dt4 = dt3 * dt;

    let qpp = dt4 / 4.0 * q_a;
    let qpv = dt3 / 2.0 * q_a;
    let qvv = dt2 * q_a;

    let mut q = [[0.0f64; 4]; 4];
    for i in 0..2 {
        q[i][i] = qpp;
        q[i + 2][i + 2] = qvv;
        q[i][i + 2] = qpv;
        q[i + 2][i] = qpv;
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A filter born with zero velocity should stay put through prediction.
    #[test]
    fn stationary_predict_does_not_move() {
        let mut state = KalmanState::new([1000.0, -20.0], 0.01, 1.0);
        state.predict(0.5);

        let pos = state.position();
        assert!((pos[0] - 1000.0).abs() < 0.01);
        assert!((pos[1] + 20.0).abs() < 0.01);
    }

    /// Repeated predict/update cycles toward a fixed observation converge.
    #[test]
    fn update_converges_to_observation() {
        let mut state = KalmanState::new([0.0, 0.0], 1.0, 1.0);
        let target = [500.0, 10.0];

        for _ in 0..10 {
            state.predict(0.5);
            state.update(target);
        }

        let pos = state.position();
        assert!((pos[0] - 500.0).abs() < 50.0, "x converged to {}", pos[0]);
        assert!((pos[1] - 10.0).abs() < 5.0, "y converged to {}", pos[1]);
    }

    /// A constant-rate observation stream teaches the filter the velocity.
    #[test]
    fn velocity_is_learned_from_motion() {
        let mut state = KalmanState::new([0.0, 0.0], 1.0, 1.0);
        let dt = 1.0;
        for step in 1..=20 {
            state.predict(dt);
            state.update([step as f64 * 30.0, 0.0]);
        }
        let vel = state.velocity();
        assert!((vel[0] - 30.0).abs() < 5.0, "vx estimated as {}", vel[0]);
    }

    #[test]
    fn gating_distance_is_euclidean() {
        let state = KalmanState::new([100.0, 0.0], 0.1, 1.0);
        let d = state.distance_to([103.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn nudge_shifts_the_estimate() {
        let mut state = KalmanState::new([100.0, 5.0], 0.1, 1.0);
        state.nudge_position(25.0, -2.0);
        let pos = state.position();
        assert!((pos[0] - 125.0).abs() < f64::EPSILON);
        assert!((pos[1] - 3.0).abs() < f64::EPSILON);
    }
}
