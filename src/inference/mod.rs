//! Inference module
//!
//! Serving-side guard around a trained salary model:
//! - Structural, completeness and domain validation against the snapshots
//!   taken at training time
//! - Integer, non-negative salary predictions
//! - Append-only CSV audit log of every prediction

mod audit;
mod predictor;
mod validator;

pub use audit::PredictionAuditLog;
pub use predictor::{PredictionRequest, SalaryPredictor};
pub use validator::{InferenceValidator, ValidationError, Violation};
