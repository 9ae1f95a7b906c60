//! Generation request pre-validation
//!
//! Checks the shape of a [`GenerationRequest`] before any text exists. Hard
//! failures reject the request; soft failures are logged and returned as
//! warnings while generation continues.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{
    config::QualityConfig,
    error::RequestError,
    lexer::{has_word, split_top_level},
    models::{GenerationRequest, Parameter, ValidationOutcome},
};

/// Single-character names accepted as loop counters
const LOOP_COUNTERS: &[&str] = &["i", "j", "k"];

/// Identifiers a generated item should not shadow
const BUILTIN_GLOBALS: &[&str] = &[
    "Object", "Array", "String", "Number", "Boolean", "Function", "Symbol", "Map", "Set",
    "Promise", "Date", "Error", "JSON", "Math", "RegExp", "console", "window", "document",
    "globalThis", "process", "require", "module", "exports", "undefined", "NaN", "Infinity",
    "eval", "parseInt", "parseFloat", "fetch", "setTimeout", "setInterval",
];

/// Markers that each add to the size estimate
const SIZE_MARKERS: &[&str] = &["promise", "async", "throws"];

/// Base lines of any generated item
const BASE_ESTIMATE: usize = 20;

/// Estimated lines per parameter or marker
const LINES_PER_UNIT: usize = 10;

/// Parses a comma-separated `name:type` list.
///
/// Blank entries (a trailing comma) are ignored.
pub fn parse_params(params: &str) -> Vec<Parameter> {
    split_top_level(params, ',')
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, ty) = match entry.split_once(':') {
                Some((name, ty)) => (name.trim(), Some(ty.trim().to_string())),
                None => (entry, None),
            };
            Parameter {
                name: name.trim_end_matches('?').to_string(),
                ty: ty.filter(|t| !t.is_empty()),
            }
        })
        .collect()
}

/// Validates generation requests against the configured limits
#[derive(Debug, Clone, Copy)]
pub struct PreValidator<'a> {
    config: &'a QualityConfig,
}

impl<'a> PreValidator<'a> {
    /// Creates a validator over `config`
    pub fn new(config: &'a QualityConfig) -> Self {
        Self { config }
    }

    /// Validates `request`
    pub fn validate(&self, request: &GenerationRequest) -> ValidationOutcome {
        debug!("Pre-validating request for template '{}'", request.template_name);
        let params = request.params.as_deref().map(parse_params).unwrap_or_default();
        match self.check_hard(request, &params) {
            Err(err) => {
                debug!("Request rejected: {}", err);
                ValidationOutcome::Rejected(err)
            }
            Ok(()) => ValidationOutcome::Accepted {
                warnings: self.check_soft(request, &params),
            },
        }
    }

    fn check_hard(
        &self,
        request: &GenerationRequest,
        params: &[Parameter],
    ) -> Result<(), RequestError> {
        if request.template_name.trim().is_empty() {
            return Err(RequestError::MissingTemplateName);
        }
        if params.len() > self.config.max_parameters {
            return Err(RequestError::TooManyParameters {
                count: params.len(),
                max: self.config.max_parameters,
            });
        }

        let mut seen = HashSet::new();
        for param in params {
            if param.name.is_empty() {
                return Err(RequestError::MalformedParameter {
                    entry: format!(":{}", param.ty.as_deref().unwrap_or_default()),
                });
            }
            if param.ty.as_deref().is_some_and(|ty| has_word(ty, "any")) {
                return Err(RequestError::UnsafeParameterType {
                    name: param.name.clone(),
                });
            }
            if param.name.chars().count() < 2 && !LOOP_COUNTERS.contains(&param.name.as_str()) {
                return Err(RequestError::ParameterNameTooShort {
                    name: param.name.clone(),
                });
            }
            if !seen.insert(param.name.as_str()) {
                return Err(RequestError::DuplicateParameter {
                    name: param.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_soft(&self, request: &GenerationRequest, params: &[Parameter]) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(name) = &request.name {
            let described = request
                .description
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty());
            if !described {
                warnings.push(format!("description: missing for '{}'", name));
            }
            if BUILTIN_GLOBALS.contains(&name.as_str()) {
                warnings.push(format!("name: '{}' shadows a built-in global", name));
            }
        }

        let estimate = estimate_lines(request, params);
        if estimate > self.config.file_lines_warning {
            warnings.push(format!(
                "size: estimated {} lines exceeds the warning threshold of {}",
                estimate, self.config.file_lines_warning
            ));
        }

        for warning in &warnings {
            warn!("Generation request '{}': {}", request.template_name, warning);
        }
        warnings
    }
}

/// Heuristic size of the item a request will generate
pub fn estimate_lines(request: &GenerationRequest, params: &[Parameter]) -> usize {
    let mut text = String::new();
    for part in [&request.return_type, &request.description]
        .into_iter()
        .flatten()
    {
        text.push_str(part);
        text.push(' ');
    }
    let mut keys: Vec<&String> = request.fields.keys().collect();
    keys.sort();
    for key in keys {
        text.push_str(key);
        text.push(' ');
        text.push_str(&request.fields[key]);
        text.push(' ');
    }
    let text = text.to_lowercase();
    let markers = SIZE_MARKERS.iter().filter(|m| text.contains(*m)).count();
    BASE_ESTIMATE + LINES_PER_UNIT * (params.len() + markers)
}
