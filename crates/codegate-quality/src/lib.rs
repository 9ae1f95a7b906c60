#![warn(missing_docs)]

//! Quality gate for generated TypeScript
//!
//! Analyzes source text with line-level heuristics, scores it against
//! configurable rule weights, rejects malformed generation requests before
//! any text exists, and applies an ordered, idempotent set of automatic fixes.
//! [`GenerationGate`] ties these together around a pluggable template renderer.

pub mod autofix;
pub mod config;
pub mod error;
pub mod gate;
pub mod imports;
pub mod lexer;
pub mod metrics;
pub mod models;
pub mod patterns;
pub mod prevalidate;
pub mod render;
pub mod rules;
pub mod scoring;
pub mod suggestions;

// Re-export public API
pub use autofix::{AutoFixPipeline, FixNote, FixOutcome, FixPass};
pub use config::{QualityConfig, ScoreWeights, ENV_PREFIX};
pub use error::{GateError, RequestError, Result};
pub use gate::{GenerationGate, GenerationOutcome, QualityGate};
pub use metrics::MetricsExtractor;
pub use models::{
    FunctionRecord, GenerationRequest, Parameter, QualityReport, RuleId, Severity,
    ValidationOutcome, Violation, ViolationCategory,
};
pub use prevalidate::{estimate_lines, parse_params, PreValidator};
pub use render::{PlaceholderRenderer, TemplateRenderer};
pub use rules::{Rule, RuleEngine};
pub use scoring::{Scorer, MAX_SCORE};
pub use suggestions::{suggest, suggestion_for};
