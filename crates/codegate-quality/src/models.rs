//! Core data models for the quality gate

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GateError, RequestError};

/// A declared function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name (destructuring patterns are kept verbatim)
    pub name: String,
    /// Type annotation, if any
    pub ty: Option<String>,
}

/// Structural metrics of one function found in source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Function name (dotted for field assignments)
    pub name: String,
    /// First and last line of the function, 1-based and inclusive
    pub line_span: (usize, usize),
    /// Non-blank lines within the span
    pub line_count: usize,
    /// 1 + number of branching tokens in the span
    pub complexity: usize,
    /// Declared parameters in order
    pub parameters: Vec<Parameter>,
    /// Return type annotation, if any
    pub return_type: Option<String>,
    /// Whether a guard clause appears near the top of the body
    pub has_early_validation: bool,
    /// Whether a parameter or the return annotation uses `any`
    pub uses_any_type: bool,
    /// Whether a numeric literal other than 0 and 1 appears outside a constant
    pub uses_magic_number: bool,
}

/// Violation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Makes the report invalid
    Error,
    /// Reported, does not invalidate
    Warning,
}

/// Stable violation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationCategory {
    /// Unsafe type usage and type-check suppression
    Typescript,
    /// Debug logging left in code
    Logging,
    /// Lint suppression
    EslintAnalog,
    /// Function size and branching
    Complexity,
    /// Parameter count
    Parameters,
    /// Missing documentation comments
    Jsdoc,
    /// Import hygiene
    Import,
    /// File length
    FileSize,
    /// Repeated lines
    Duplication,
    /// Unguarded property chains
    NullSafety,
    /// Unchecked result-object access
    PropertyAccess,
    /// Overly loose type annotations
    TypeAssignment,
    /// Missing early validation
    Pattern,
}

impl ViolationCategory {
    /// Identifier used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typescript => "typescript",
            Self::Logging => "logging",
            Self::EslintAnalog => "eslint-analog",
            Self::Complexity => "complexity",
            Self::Parameters => "parameters",
            Self::Jsdoc => "jsdoc",
            Self::Import => "import",
            Self::FileSize => "file-size",
            Self::Duplication => "duplication",
            Self::NullSafety => "null-safety",
            Self::PropertyAccess => "property-access",
            Self::TypeAssignment => "type-assignment",
            Self::Pattern => "pattern",
        }
    }
}

/// Identifier of the rule that produced a violation.
///
/// Score deductions are attached to the rule, not to the severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    /// `any` in a type position
    NoExplicitAny,
    /// `@ts-ignore` and friends
    TsSuppression,
    /// `eslint-disable` markers
    EslintSuppression,
    /// `console.*` calls
    NoConsole,
    /// Function longer than the configured maximum
    MaxFunctionLines,
    /// Function more complex than the configured maximum
    MaxComplexity,
    /// File above the hard line limit
    MaxFileLines,
    /// File approaching the line limit
    FileLinesWarning,
    /// Too many parameters
    MaxParameters,
    /// Exported declaration without a doc comment
    RequireJsdoc,
    /// Module imported more than once
    DuplicateImport,
    /// Line repeated verbatim
    DuplicateLines,
    /// Long function without a guard clause
    EarlyValidation,
    /// `result.data` without a success check
    UncheckedResultAccess,
    /// `Object`, `object`, `Function` or `{}` annotations
    LooseTypeAssignment,
    /// Deep property chain without a null guard
    UnguardedPropertyChain,
    /// A fix pass declined to rewrite a construct
    FixSkipped,
}

impl RuleId {
    /// Identifier used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoExplicitAny => "no-explicit-any",
            Self::TsSuppression => "ts-suppression",
            Self::EslintSuppression => "eslint-suppression",
            Self::NoConsole => "no-console",
            Self::MaxFunctionLines => "max-function-lines",
            Self::MaxComplexity => "max-complexity",
            Self::MaxFileLines => "max-file-lines",
            Self::FileLinesWarning => "file-lines-warning",
            Self::MaxParameters => "max-parameters",
            Self::RequireJsdoc => "require-jsdoc",
            Self::DuplicateImport => "duplicate-import",
            Self::DuplicateLines => "duplicate-lines",
            Self::EarlyValidation => "early-validation",
            Self::UncheckedResultAccess => "unchecked-result-access",
            Self::LooseTypeAssignment => "loose-type-assignment",
            Self::UnguardedPropertyChain => "unguarded-property-chain",
            Self::FixSkipped => "fix-skipped",
        }
    }
}

/// One detected deviation from a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule that produced the violation
    pub rule_id: RuleId,
    /// Category used for suggestions
    pub category: ViolationCategory,
    /// Severity
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// 1-based line number, when the violation is tied to a line
    pub line: Option<usize>,
}

impl Violation {
    /// Creates a violation
    pub fn new(
        rule_id: RuleId,
        category: ViolationCategory,
        severity: Severity,
        message: impl Into<String>,
        line: Option<usize>,
    ) -> Self {
        Self {
            rule_id,
            category,
            severity,
            message: message.into(),
            line,
        }
    }

    /// Whether this violation has error severity
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Result of analyzing one unit of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    /// True when no error-severity violation is present
    pub valid: bool,
    /// Violations in rule-table order
    pub violations: Vec<Violation>,
    /// Deduplicated remediation suggestions in priority order
    pub suggestions: Vec<String>,
    /// Quality score in `[0, 100]`
    pub score: u32,
}

impl QualityReport {
    /// Violations with error severity
    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_error())
    }

    /// Whether any violation belongs to `category`
    pub fn has_category(&self, category: ViolationCategory) -> bool {
        self.violations.iter().any(|v| v.category == category)
    }

    /// Serializes the report as pretty JSON
    pub fn to_json(&self) -> Result<String, GateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A request to generate code from a named template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Template to render
    pub template_name: String,
    /// Name of the generated item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Comma-separated `name:type` parameter list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// Declared return type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Template-specific fields
    #[serde(flatten)]
    pub fields: HashMap<String, String>,
}

impl GenerationRequest {
    /// Creates a request for `template_name`
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            ..Default::default()
        }
    }

    /// Sets the item name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the parameter list
    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Sets the return type
    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a template-specific field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Variables handed to the template renderer.
    ///
    /// Free-form fields are inserted first so the well-known keys win.
    pub fn variables(&self) -> HashMap<String, String> {
        let mut vars = self.fields.clone();
        if let Some(name) = &self.name {
            vars.insert("name".to_string(), name.clone());
        }
        if let Some(params) = &self.params {
            vars.insert("params".to_string(), params.clone());
        }
        if let Some(return_type) = &self.return_type {
            vars.insert("returnType".to_string(), return_type.clone());
        }
        if let Some(description) = &self.description {
            vars.insert("description".to_string(), description.clone());
        }
        vars
    }
}

/// Outcome of pre-validating a generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Generation may proceed; soft failures are listed as warnings
    Accepted {
        /// Soft-failure messages
        warnings: Vec<String>,
    },
    /// Generation must abort
    Rejected(RequestError),
}

impl ValidationOutcome {
    /// Whether the request was accepted
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Rejection message, verbatim
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected(err) => Some(err.to_string()),
        }
    }

    /// Converts into a `Result`, keeping soft warnings on success
    pub fn into_result(self) -> Result<Vec<String>, RequestError> {
        match self {
            Self::Accepted { warnings } => Ok(warnings),
            Self::Rejected(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_id_serializes_kebab_case() {
        let json = serde_json::to_string(&RuleId::NoExplicitAny).unwrap();
        assert_eq!(json, "\"no-explicit-any\"");
        assert_eq!(RuleId::NoExplicitAny.as_str(), "no-explicit-any");
    }

    #[test]
    fn test_category_serializes_kebab_case() {
        let json = serde_json::to_string(&ViolationCategory::EslintAnalog).unwrap();
        assert_eq!(json, "\"eslint-analog\"");
        assert_eq!(ViolationCategory::FileSize.as_str(), "file-size");
    }

    #[test]
    fn test_request_deserializes_free_form_fields() {
        let json = r#"{"templateName":"service","name":"loadUser","params":"id:string","kind":"async"}"#;
        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.template_name, "service");
        assert_eq!(request.params.as_deref(), Some("id:string"));
        assert_eq!(request.fields.get("kind").map(String::as_str), Some("async"));
    }

    #[test]
    fn test_request_variables_prefer_known_keys() {
        let request = GenerationRequest::new("fn")
            .with_name("loadUser")
            .with_field("name", "shadowed")
            .with_field("extra", "1");
        let vars = request.variables();
        assert_eq!(vars["name"], "loadUser");
        assert_eq!(vars["extra"], "1");
    }

    #[test]
    fn test_outcome_reason() {
        let outcome = ValidationOutcome::Rejected(RequestError::TooManyParameters { count: 6, max: 4 });
        assert!(!outcome.is_ok());
        assert!(outcome.reason().unwrap().contains('6'));
        assert!(ValidationOutcome::Accepted { warnings: vec![] }.reason().is_none());
    }
}
