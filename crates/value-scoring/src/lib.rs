//! Value/quality scoring engine.
//!
//! Turns one [`RawMetrics`](value_core::RawMetrics) record into a 0-100 score,
//! a 35-92 confidence estimate, profile tags and a short rationale. Every
//! function here is pure and synchronous; malformed inputs degrade to
//! "no credit" instead of failing.

pub mod confidence;
pub mod sanitizer;
pub mod scorer;

pub use confidence::{estimate_confidence, ConfidenceReport};
pub use sanitizer::SanitizedMetrics;
pub use scorer::{Evaluation, FactorScorer, ScoreCard};
