//! Multi-target tracking: Kalman filtering, optimal association and track
//! lifecycle management.

pub mod assignment;
pub mod kalman;
pub mod lifecycle;
pub mod manager;

pub use assignment::min_cost_assignment;
pub use kalman::KalmanState;
pub use lifecycle::{LifecycleConfig, TrackLifecycle};
pub use manager::{Track, TrackManager, TrackerConfig, UpdateSummary};
