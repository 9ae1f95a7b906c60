//! Quality gate configuration
//!
//! One immutable [`QualityConfig`] is built at process start and shared by the
//! rule engine, scorer, pre-validator and fix pipeline. Values come from the
//! defaults below, an optional TOML file, and `CODEGATE__*` environment
//! variables, in that order of precedence.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{GateError, Result},
    models::{RuleId, Severity},
};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CODEGATE";

/// Per-rule score deductions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// `any` in a type position
    pub no_explicit_any: u32,
    /// Type-check suppression comment
    pub ts_suppression: u32,
    /// Lint suppression comment
    pub eslint_suppression: u32,
    /// `console.*` call
    pub no_console: u32,
    /// Oversized function
    pub max_function_lines: u32,
    /// Overly complex function
    pub max_complexity: u32,
    /// File above the hard limit
    pub max_file_lines: u32,
    /// File above the soft limit
    pub file_lines_warning: u32,
    /// Too many parameters
    pub max_parameters: u32,
    /// Missing doc comment
    pub require_jsdoc: u32,
    /// Duplicate import
    pub duplicate_import: u32,
    /// Repeated line
    pub duplicate_lines: u32,
    /// Missing guard clause
    pub early_validation: u32,
    /// Unchecked result access
    pub unchecked_result_access: u32,
    /// Loose type annotation
    pub loose_type_assignment: u32,
    /// Unguarded property chain
    pub unguarded_property_chain: u32,
    /// Skipped fix
    pub fix_skipped: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            no_explicit_any: 10,
            ts_suppression: 15,
            eslint_suppression: 15,
            no_console: 5,
            max_function_lines: 5,
            max_complexity: 5,
            max_file_lines: 15,
            file_lines_warning: 5,
            max_parameters: 5,
            require_jsdoc: 5,
            duplicate_import: 8,
            duplicate_lines: 5,
            early_validation: 3,
            unchecked_result_access: 3,
            loose_type_assignment: 4,
            unguarded_property_chain: 2,
            fix_skipped: 0,
        }
    }
}

impl ScoreWeights {
    /// Deduction for one violation of `rule`
    pub fn weight(&self, rule: RuleId) -> u32 {
        match rule {
            RuleId::NoExplicitAny => self.no_explicit_any,
            RuleId::TsSuppression => self.ts_suppression,
            RuleId::EslintSuppression => self.eslint_suppression,
            RuleId::NoConsole => self.no_console,
            RuleId::MaxFunctionLines => self.max_function_lines,
            RuleId::MaxComplexity => self.max_complexity,
            RuleId::MaxFileLines => self.max_file_lines,
            RuleId::FileLinesWarning => self.file_lines_warning,
            RuleId::MaxParameters => self.max_parameters,
            RuleId::RequireJsdoc => self.require_jsdoc,
            RuleId::DuplicateImport => self.duplicate_import,
            RuleId::DuplicateLines => self.duplicate_lines,
            RuleId::EarlyValidation => self.early_validation,
            RuleId::UncheckedResultAccess => self.unchecked_result_access,
            RuleId::LooseTypeAssignment => self.loose_type_assignment,
            RuleId::UnguardedPropertyChain => self.unguarded_property_chain,
            RuleId::FixSkipped => self.fix_skipped,
        }
    }
}

/// Configuration for analysis, scoring, pre-validation and fixing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Maximum non-blank lines per function
    pub max_function_lines: usize,
    /// Maximum heuristic complexity per function
    pub max_complexity: usize,
    /// Maximum parameters per function or request
    pub max_parameters: usize,
    /// Hard limit on non-blank lines per file
    pub max_file_lines: usize,
    /// Soft limit on non-blank lines per file ("approaching the limit")
    pub file_lines_warning: usize,
    /// Functions longer than this must start with a guard clause
    pub early_validation_min_lines: usize,
    /// A code line may occur this many times before it counts as duplicated
    pub max_line_repeats: usize,
    /// Severity of `console.*` calls
    pub logging_severity: Severity,
    /// Surface error violations of the final report as caller warnings
    pub strict: bool,
    /// Add skipped fixes to the final report as `fix-skipped` warnings
    pub report_fix_skips: bool,
    /// Score deductions per rule
    pub weights: ScoreWeights,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_function_lines: 30,
            max_complexity: 10,
            max_parameters: 4,
            max_file_lines: 300,
            file_lines_warning: 250,
            early_validation_min_lines: 10,
            max_line_repeats: 2,
            logging_severity: Severity::Error,
            strict: false,
            report_fix_skips: true,
            weights: ScoreWeights::default(),
        }
    }
}

impl QualityConfig {
    /// Loads configuration from an optional TOML file and the environment.
    ///
    /// Nested keys use `__` in environment variables, for example
    /// `CODEGATE__WEIGHTS__NO_CONSOLE=2`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading quality configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(false));
        }
        let loaded = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let config: QualityConfig = loaded.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_parameters == 0 {
            return Err(GateError::InvalidConfig(
                "max_parameters must be greater than 0".to_string(),
            ));
        }
        if self.max_function_lines == 0 || self.max_file_lines == 0 {
            return Err(GateError::InvalidConfig(
                "line limits must be greater than 0".to_string(),
            ));
        }
        if self.file_lines_warning > self.max_file_lines {
            return Err(GateError::InvalidConfig(format!(
                "file_lines_warning ({}) must not exceed max_file_lines ({})",
                self.file_lines_warning, self.max_file_lines
            )));
        }
        Ok(())
    }

    /// Serializes the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = QualityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_parameters, 4);
        assert_eq!(config.weights.weight(RuleId::NoExplicitAny), 10);
        assert_eq!(config.weights.weight(RuleId::FixSkipped), 0);
    }

    #[test]
    fn test_soft_limit_above_hard_limit_is_rejected() {
        let config = QualityConfig {
            file_lines_warning: 400,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("file_lines_warning"));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_function_lines = 40\nstrict = true\n\n[weights]\nno_console = 1").unwrap();

        let config = QualityConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_function_lines, 40);
        assert!(config.strict);
        assert_eq!(config.weights.no_console, 1);
        assert_eq!(config.weights.no_explicit_any, 10);
        assert_eq!(config.max_parameters, 4);
    }

    #[test]
    fn test_toml_round_trip_through_loader() {
        let config = QualityConfig {
            logging_severity: Severity::Warning,
            max_file_lines: 500,
            ..Default::default()
        };
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes()).unwrap();

        let loaded = QualityConfig::load(Some(file.path())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_parameters = 0").unwrap();
        assert!(QualityConfig::load(Some(file.path())).is_err());
    }
}
