//! Electronic-warfare degradation model.

pub mod degradation;

pub use degradation::{DegradationModel, DegradationReport, EwConfig};
