//! Quality gate facade and generation orchestrator
//!
//! [`QualityGate`] owns one immutable [`QualityConfig`] and exposes every
//! operation of the gate. [`GenerationGate`] drives one generation cycle:
//! pre-validate, render, fix once, analyze the fixed text.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    autofix::{AutoFixPipeline, FixNote, FixOutcome},
    config::QualityConfig,
    error::Result,
    lexer::scan,
    metrics::MetricsExtractor,
    models::{GenerationRequest, QualityReport, RuleId, Severity, ValidationOutcome, Violation},
    prevalidate::PreValidator,
    render::TemplateRenderer,
    rules::RuleEngine,
    scoring::Scorer,
    suggestions::suggest,
};

/// Analysis, scoring, pre-validation and fixing over one configuration
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    config: QualityConfig,
    scorer: Scorer,
}

impl QualityGate {
    /// Creates a gate with `config`
    pub fn new(config: QualityConfig) -> Self {
        let scorer = Scorer::new(config.weights.clone());
        Self { config, scorer }
    }

    /// Creates a gate from an optional TOML file layered with the environment
    pub fn from_config_file(path: Option<&Path>) -> Result<Self> {
        Ok(Self::new(QualityConfig::load(path)?))
    }

    /// Active configuration
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Validates the shape of a generation request
    pub fn pre_validate(&self, request: &GenerationRequest) -> ValidationOutcome {
        PreValidator::new(&self.config).validate(request)
    }

    /// Analyzes source text; never fails
    pub fn analyze(&self, text: &str) -> QualityReport {
        let lines = scan(text);
        let functions = MetricsExtractor::extract_lines(&lines);
        let violations = RuleEngine::new(&self.config).evaluate_lines(&lines, &functions);
        let report = self.report(violations);
        debug!(
            "Analyzed {} lines: score {}, {} violations",
            lines.len(),
            report.score,
            report.violations.len()
        );
        report
    }

    /// Builds a report from a violation list
    pub fn report(&self, violations: Vec<Violation>) -> QualityReport {
        QualityReport {
            valid: !violations.iter().any(Violation::is_error),
            score: self.scorer.score(&violations),
            suggestions: suggest(&violations),
            violations,
        }
    }

    /// Runs the fix pipeline and returns the new text
    pub fn fix(&self, text: &str) -> String {
        AutoFixPipeline::new(&self.config).fix(text)
    }

    /// Runs the fix pipeline with pass and skip details
    pub fn fix_with_report(&self, text: &str) -> FixOutcome {
        AutoFixPipeline::new(&self.config).run(text)
    }

    /// Analyzes independent units in parallel, preserving input order
    pub fn analyze_batch<S>(&self, texts: &[S]) -> Vec<QualityReport>
    where
        S: AsRef<str> + Sync,
    {
        texts.par_iter().map(|t| self.analyze(t.as_ref())).collect()
    }

    /// Fixes independent units in parallel, preserving input order
    pub fn fix_batch<S>(&self, texts: &[S]) -> Vec<String>
    where
        S: AsRef<str> + Sync,
    {
        texts.par_iter().map(|t| self.fix(t.as_ref())).collect()
    }
}

/// Result of one generation cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Fixed text
    pub content: String,
    /// Analysis of the fixed text
    pub report: QualityReport,
    /// Rewrites the fix pipeline declined
    pub fix_notes: Vec<FixNote>,
    /// Soft pre-validation failures and, in strict mode, final errors
    pub warnings: Vec<String>,
}

/// Orchestrates pre-validation, rendering, fixing and final analysis
pub struct GenerationGate<R: TemplateRenderer> {
    gate: QualityGate,
    renderer: R,
}

impl<R: TemplateRenderer> GenerationGate<R> {
    /// Creates an orchestrator
    pub fn new(gate: QualityGate, renderer: R) -> Self {
        Self { gate, renderer }
    }

    /// Underlying quality gate
    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    /// Runs one generation cycle.
    ///
    /// # Errors
    ///
    /// Returns `GateError::InvalidRequest` when pre-validation rejects the
    /// request (the renderer is never called), or the renderer's error.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        let mut warnings = self.gate.pre_validate(request).into_result()?;

        let rendered = self
            .renderer
            .render(&request.template_name, &request.variables())?;
        let fixed = self.gate.fix_with_report(&rendered);
        let mut report = self.gate.analyze(&fixed.content);

        let config = self.gate.config();
        if config.report_fix_skips && !fixed.notes.is_empty() {
            let mut violations = report.violations;
            violations.extend(fixed.notes.iter().map(|note| {
                Violation::new(
                    RuleId::FixSkipped,
                    note.category,
                    Severity::Warning,
                    format!("{}: {}", note.pass.name(), note.message),
                    Some(note.line),
                )
            }));
            report = self.gate.report(violations);
        }

        if config.strict {
            for violation in report.errors() {
                let message = match violation.line {
                    Some(line) => format!(
                        "{} (line {}): {}",
                        violation.rule_id.as_str(),
                        line,
                        violation.message
                    ),
                    None => format!("{}: {}", violation.rule_id.as_str(), violation.message),
                };
                warn!("Generated code still violates {}", message);
                warnings.push(message);
            }
        }

        debug!(
            "Generated '{}' with score {}",
            request.template_name, report.score
        );
        Ok(GenerationOutcome {
            content: fixed.content,
            report,
            fix_notes: fixed.notes,
            warnings,
        })
    }
}
