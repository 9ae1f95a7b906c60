//! Remediation suggestions keyed by violation category

use crate::models::{Violation, ViolationCategory};

/// Suggestion text per category, in priority order
const SUGGESTIONS: [(ViolationCategory, &str); 13] = [
    (
        ViolationCategory::Jsdoc,
        "Add JSDoc comments (/** ... */) to exported functions and declarations",
    ),
    (
        ViolationCategory::Import,
        "Merge duplicate imports of the same module into a single statement",
    ),
    (
        ViolationCategory::Parameters,
        "Group related parameters into a single options object",
    ),
    (
        ViolationCategory::FileSize,
        "Split the file into smaller, focused modules",
    ),
    (
        ViolationCategory::Duplication,
        "Extract repeated lines into a shared helper or constant",
    ),
    (
        ViolationCategory::PropertyAccess,
        "Check the result's success flag before reading .data or .error",
    ),
    (
        ViolationCategory::TypeAssignment,
        "Replace Object, Function and {} annotations with specific structural types",
    ),
    (
        ViolationCategory::NullSafety,
        "Guard nested property access with optional chaining or explicit null checks",
    ),
    (
        ViolationCategory::Typescript,
        "Replace 'any' with 'unknown' or a specific type, and remove @ts-ignore style suppressions",
    ),
    (
        ViolationCategory::Complexity,
        "Break long or heavily branched functions into smaller helpers",
    ),
    (
        ViolationCategory::Pattern,
        "Validate inputs with early returns at the top of long functions",
    ),
    (
        ViolationCategory::Logging,
        "Remove console statements or route them through a structured logger",
    ),
    (
        ViolationCategory::EslintAnalog,
        "Fix the underlying lint issues instead of disabling eslint rules",
    ),
];

/// Suggestion text for `category`
pub fn suggestion_for(category: ViolationCategory) -> &'static str {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, text)| *text)
        .unwrap_or_default()
}

/// At most one suggestion per distinct category present, in priority order
pub fn suggest(violations: &[Violation]) -> Vec<String> {
    SUGGESTIONS
        .iter()
        .filter(|(category, _)| violations.iter().any(|v| v.category == *category))
        .map(|(_, text)| text.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RuleId, Severity};

    fn violation(category: ViolationCategory) -> Violation {
        Violation::new(RuleId::NoExplicitAny, category, Severity::Warning, "x", None)
    }

    #[test]
    fn test_no_violations_no_suggestions() {
        assert!(suggest(&[]).is_empty());
    }

    #[test]
    fn test_one_suggestion_per_category_in_priority_order() {
        let violations = vec![
            violation(ViolationCategory::Typescript),
            violation(ViolationCategory::Typescript),
            violation(ViolationCategory::Logging),
            violation(ViolationCategory::Jsdoc),
        ];
        let suggestions = suggest(&violations);
        assert_eq!(
            suggestions,
            vec![
                suggestion_for(ViolationCategory::Jsdoc).to_string(),
                suggestion_for(ViolationCategory::Typescript).to_string(),
                suggestion_for(ViolationCategory::Logging).to_string(),
            ]
        );
    }

    #[test]
    fn test_every_category_has_text() {
        for (category, _) in SUGGESTIONS {
            assert!(!suggestion_for(category).is_empty());
        }
    }
}
