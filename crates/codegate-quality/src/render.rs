//! Template rendering seam
//!
//! The gate treats rendered output as opaque text. [`PlaceholderRenderer`]
//! is a small in-process renderer with `{{variable}}` substitution, enough
//! to drive a full generation cycle without an external template engine.

use std::{collections::HashMap, sync::OnceLock};

use regex::Regex;
use tracing::debug;

use crate::error::{GateError, Result};

/// Renders a named template with string variables
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template_name`, failing if it is unknown or a variable is missing
    fn render(&self, template_name: &str, variables: &HashMap<String, String>) -> Result<String>;
}

fn placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("Invalid regex")
    })
}

/// Renderer over registered template bodies
#[derive(Debug, Clone, Default)]
pub struct PlaceholderRenderer {
    templates: HashMap<String, String>,
}

impl PlaceholderRenderer {
    /// Creates a renderer with no templates
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template, replacing any previous body with the same name
    pub fn with_template(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.register(name, body);
        self
    }

    /// Registers a template in place
    pub fn register(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.templates.insert(name.into(), body.into());
    }

    /// Substitutes every `{{variable}}` in `body`
    pub fn substitute(body: &str, variables: &HashMap<String, String>) -> Result<String> {
        let mut out = String::with_capacity(body.len());
        let mut last = 0;
        for caps in placeholder_regex().captures_iter(body) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = variables.get(name.as_str()).ok_or_else(|| {
                GateError::RenderError(format!("Variable not provided: {}", name.as_str()))
            })?;
            out.push_str(&body[last..whole.start()]);
            out.push_str(value);
            last = whole.end();
        }
        out.push_str(&body[last..]);
        Ok(out)
    }
}

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template_name: &str, variables: &HashMap<String, String>) -> Result<String> {
        let body = self
            .templates
            .get(template_name)
            .ok_or_else(|| GateError::TemplateNotFound(template_name.to_string()))?;
        debug!("Rendering template '{}'", template_name);
        Self::substitute(body, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_placeholders() {
        let renderer = PlaceholderRenderer::new()
            .with_template("fn", "export function {{name}}({{ params }}): {{returnType}} {}");
        let out = renderer
            .render(
                "fn",
                &vars(&[("name", "load"), ("params", "id: string"), ("returnType", "void")]),
            )
            .unwrap();
        assert_eq!(out, "export function load(id: string): void {}");
    }

    #[test]
    fn test_repeated_placeholder_values_are_not_rescanned() {
        let out =
            PlaceholderRenderer::substitute("{{a}}-{{a}}", &vars(&[("a", "{{b}}")])).unwrap();
        assert_eq!(out, "{{b}}-{{b}}");
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let err = PlaceholderRenderer::substitute("{{missing}}", &HashMap::new()).unwrap_err();
        assert!(matches!(err, GateError::RenderError(_)));
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        let err = PlaceholderRenderer::new()
            .render("nope", &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, GateError::TemplateNotFound(name) if name == "nope"));
    }
}
