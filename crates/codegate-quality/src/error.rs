//! Error types for the quality gate

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GateError>;

/// Errors that can occur while gating a generation cycle
#[derive(Debug, Error)]
pub enum GateError {
    /// The generation request failed a hard pre-validation constraint
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but violates a constraint
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Template not registered with the renderer
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Template rendering error
    #[error("Render error: {0}")]
    RenderError(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),
}

/// Hard pre-validation failures of a generation request.
///
/// Every message names the offending field and the violated constraint, and
/// is surfaced verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No template name supplied
    #[error("templateName: must not be empty")]
    MissingTemplateName,

    /// Too many parameters
    #[error("params: {count} parameters exceeds the maximum of {max}")]
    TooManyParameters {
        /// Number of parameters requested
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// A parameter is declared with the unsafe universal type
    #[error("params: parameter '{name}' is declared as 'any'; use a specific type or 'unknown'")]
    UnsafeParameterType {
        /// Parameter name
        name: String,
    },

    /// A parameter name is too short to be descriptive
    #[error("params: parameter name '{name}' is shorter than 2 characters (only i, j, k are allowed)")]
    ParameterNameTooShort {
        /// Parameter name
        name: String,
    },

    /// Two parameters share a name
    #[error("params: duplicate parameter name '{name}'")]
    DuplicateParameter {
        /// Parameter name
        name: String,
    },

    /// A `name:type` entry without a name
    #[error("params: malformed parameter entry '{entry}'")]
    MalformedParameter {
        /// The raw entry text
        entry: String,
    },
}
