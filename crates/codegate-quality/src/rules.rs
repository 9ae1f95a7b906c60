//! Rule table and evaluation
//!
//! Rules are a closed set of variants evaluated in a fixed order, so the same
//! input always yields the same ordered violation list. Function-level rules
//! read [`FunctionRecord`]s; text-level rules scan the code views directly.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    config::QualityConfig,
    imports::scan_imports,
    lexer::{is_structural, scan, LineKind, SourceLine},
    models::{FunctionRecord, RuleId, Severity, Violation, ViolationCategory},
    patterns::{
        any_type_spans, chain_guarded, console_calls, exported_declaration, is_assignment_target,
        is_doc_line, loose_types, property_chains, result_accesses, result_checked,
        ESLINT_SUPPRESSION, TS_SUPPRESSIONS,
    },
};

/// Preceding lines searched for a result check
pub const RESULT_CHECK_WINDOW: usize = 10;

/// Preceding lines searched for a null guard
pub const CHAIN_GUARD_WINDOW: usize = 3;

/// One entry of the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `any` in a type position
    NoExplicitAny,
    /// Type-check suppression comments
    TsSuppression,
    /// Lint suppression comments
    EslintSuppression,
    /// `console.*` calls
    NoConsole,
    /// Function length
    FunctionLines,
    /// Function branching
    FunctionComplexity,
    /// File length, hard and soft limits
    FileLines,
    /// Parameter count
    Parameters,
    /// Doc comments on exported declarations
    RequireJsdoc,
    /// Modules imported more than once
    DuplicateImports,
    /// Lines repeated verbatim
    DuplicateLines,
    /// Guard clauses in long functions
    EarlyValidation,
    /// `.data`/`.error` without an outcome check
    UncheckedResultAccess,
    /// `Object`, `object`, `Function` and `{}` annotations
    LooseTypeAssignment,
    /// Deep member chains without a null guard
    UnguardedPropertyChain,
}

impl Rule {
    /// Evaluation order
    pub const ALL: [Rule; 15] = [
        Rule::NoExplicitAny,
        Rule::TsSuppression,
        Rule::EslintSuppression,
        Rule::NoConsole,
        Rule::FunctionLines,
        Rule::FunctionComplexity,
        Rule::FileLines,
        Rule::Parameters,
        Rule::RequireJsdoc,
        Rule::DuplicateImports,
        Rule::DuplicateLines,
        Rule::EarlyValidation,
        Rule::UncheckedResultAccess,
        Rule::LooseTypeAssignment,
        Rule::UnguardedPropertyChain,
    ];

    /// Category of every violation this rule produces
    pub fn category(&self) -> ViolationCategory {
        match self {
            Rule::NoExplicitAny | Rule::TsSuppression => ViolationCategory::Typescript,
            Rule::EslintSuppression => ViolationCategory::EslintAnalog,
            Rule::NoConsole => ViolationCategory::Logging,
            Rule::FunctionLines | Rule::FunctionComplexity => ViolationCategory::Complexity,
            Rule::FileLines => ViolationCategory::FileSize,
            Rule::Parameters => ViolationCategory::Parameters,
            Rule::RequireJsdoc => ViolationCategory::Jsdoc,
            Rule::DuplicateImports => ViolationCategory::Import,
            Rule::DuplicateLines => ViolationCategory::Duplication,
            Rule::EarlyValidation => ViolationCategory::Pattern,
            Rule::UncheckedResultAccess => ViolationCategory::PropertyAccess,
            Rule::LooseTypeAssignment => ViolationCategory::TypeAssignment,
            Rule::UnguardedPropertyChain => ViolationCategory::NullSafety,
        }
    }

    fn check(
        &self,
        lines: &[SourceLine<'_>],
        functions: &[FunctionRecord],
        config: &QualityConfig,
        out: &mut Vec<Violation>,
    ) {
        let category = self.category();
        let mut push = |rule_id: RuleId, severity: Severity, message: String, line: Option<usize>| {
            out.push(Violation::new(rule_id, category, severity, message, line));
        };

        match self {
            Rule::NoExplicitAny => {
                for line in lines.iter().filter(|l| l.is_code()) {
                    for _ in any_type_spans(&line.code) {
                        push(
                            RuleId::NoExplicitAny,
                            Severity::Error,
                            "Unsafe 'any' type; use 'unknown' or a specific type".to_string(),
                            Some(line.number()),
                        );
                    }
                }
            }
            Rule::TsSuppression => {
                for line in lines {
                    for marker in TS_SUPPRESSIONS {
                        for _ in line.comment.matches(marker) {
                            push(
                                RuleId::TsSuppression,
                                Severity::Error,
                                format!("Type checking suppressed with {}", marker),
                                Some(line.number()),
                            );
                        }
                    }
                }
            }
            Rule::EslintSuppression => {
                for line in lines {
                    for _ in line.comment.matches(ESLINT_SUPPRESSION) {
                        push(
                            RuleId::EslintSuppression,
                            Severity::Error,
                            "Lint rules disabled with an eslint-disable comment".to_string(),
                            Some(line.number()),
                        );
                    }
                }
            }
            Rule::NoConsole => {
                for line in lines.iter().filter(|l| l.is_code()) {
                    for _ in console_calls(&line.code) {
                        push(
                            RuleId::NoConsole,
                            config.logging_severity,
                            "console statement left in code".to_string(),
                            Some(line.number()),
                        );
                    }
                }
            }
            Rule::FunctionLines => {
                for f in functions.iter().filter(|f| f.line_count > config.max_function_lines) {
                    push(
                        RuleId::MaxFunctionLines,
                        Severity::Error,
                        format!(
                            "Function '{}' has {} lines (max {})",
                            f.name, f.line_count, config.max_function_lines
                        ),
                        Some(f.line_span.0),
                    );
                }
            }
            Rule::FunctionComplexity => {
                for f in functions.iter().filter(|f| f.complexity > config.max_complexity) {
                    push(
                        RuleId::MaxComplexity,
                        Severity::Warning,
                        format!(
                            "Function '{}' has complexity {} (max {})",
                            f.name, f.complexity, config.max_complexity
                        ),
                        Some(f.line_span.0),
                    );
                }
            }
            Rule::FileLines => {
                let count = lines.iter().filter(|l| l.kind != LineKind::Blank).count();
                if count > config.max_file_lines {
                    push(
                        RuleId::MaxFileLines,
                        Severity::Error,
                        format!(
                            "File has {} non-blank lines (max {})",
                            count, config.max_file_lines
                        ),
                        None,
                    );
                } else if count > config.file_lines_warning {
                    push(
                        RuleId::FileLinesWarning,
                        Severity::Warning,
                        format!(
                            "File has {} non-blank lines, approaching the limit of {}",
                            count, config.max_file_lines
                        ),
                        None,
                    );
                }
            }
            Rule::Parameters => {
                for f in functions
                    .iter()
                    .filter(|f| f.parameters.len() > config.max_parameters)
                {
                    push(
                        RuleId::MaxParameters,
                        Severity::Error,
                        format!(
                            "Function '{}' takes {} parameters (max {})",
                            f.name,
                            f.parameters.len(),
                            config.max_parameters
                        ),
                        Some(f.line_span.0),
                    );
                }
            }
            Rule::RequireJsdoc => {
                for line in lines.iter().filter(|l| l.is_code()) {
                    let Some(decl) = exported_declaration(&line.code) else {
                        continue;
                    };
                    let documented = line
                        .index
                        .checked_sub(1)
                        .is_some_and(|prev| is_doc_line(lines[prev].raw));
                    if !documented {
                        push(
                            RuleId::RequireJsdoc,
                            Severity::Error,
                            format!(
                                "Exported {} '{}' has no JSDoc comment",
                                decl.keyword,
                                decl.name.as_deref().unwrap_or("default")
                            ),
                            Some(line.number()),
                        );
                    }
                }
            }
            Rule::DuplicateImports => {
                let scan = scan_imports(lines);
                let mut seen: HashMap<&str, usize> = HashMap::new();
                for statement in &scan.statements {
                    let count = seen.entry(statement.module.as_str()).or_insert(0);
                    *count += 1;
                    if *count == 2 {
                        push(
                            RuleId::DuplicateImport,
                            Severity::Error,
                            format!("Module '{}' is imported more than once", statement.module),
                            Some(statement.start + 1),
                        );
                    }
                }
            }
            Rule::DuplicateLines => {
                let mut order: Vec<(&str, usize)> = Vec::new();
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for line in lines.iter().filter(|l| l.is_code()) {
                    let text = line.raw.trim();
                    if is_structural(line.code.trim()) {
                        continue;
                    }
                    let count = counts.entry(text).or_insert(0);
                    if *count == 0 {
                        order.push((text, line.number()));
                    }
                    *count += 1;
                }
                for (text, first) in order {
                    let count = counts.get(text).copied().unwrap_or(0);
                    if count > config.max_line_repeats {
                        push(
                            RuleId::DuplicateLines,
                            Severity::Warning,
                            format!("Line repeated {} times: {}", count, text),
                            Some(first),
                        );
                    }
                }
            }
            Rule::EarlyValidation => {
                for f in functions.iter().filter(|f| {
                    f.line_count > config.early_validation_min_lines && !f.has_early_validation
                }) {
                    push(
                        RuleId::EarlyValidation,
                        Severity::Warning,
                        format!(
                            "Function '{}' has {} lines but no guard clause near the top",
                            f.name, f.line_count
                        ),
                        Some(f.line_span.0),
                    );
                }
            }
            Rule::UncheckedResultAccess => {
                for line in lines.iter().filter(|l| l.is_code()) {
                    let start = line.index.saturating_sub(RESULT_CHECK_WINDOW);
                    let window = || lines[start..=line.index].iter().map(|l| l.code.as_str());
                    for access in result_accesses(&line.code) {
                        if is_assignment_target(&line.code, access.range.end)
                            || result_checked(window(), &access.receiver)
                        {
                            continue;
                        }
                        push(
                            RuleId::UncheckedResultAccess,
                            Severity::Warning,
                            format!(
                                "'{}.{}' read without checking '{}.success' first",
                                access.receiver, access.property, access.receiver
                            ),
                            Some(line.number()),
                        );
                    }
                }
            }
            Rule::LooseTypeAssignment => {
                for line in lines.iter().filter(|l| l.is_code()) {
                    for (range, kind) in loose_types(&line.code) {
                        push(
                            RuleId::LooseTypeAssignment,
                            Severity::Warning,
                            format!(
                                "Loose type '{}'; prefer '{}' or a specific shape",
                                &line.code[range],
                                kind.narrowed()
                            ),
                            Some(line.number()),
                        );
                    }
                }
            }
            Rule::UnguardedPropertyChain => {
                for line in lines.iter().filter(|l| l.is_code()) {
                    let start = line.index.saturating_sub(CHAIN_GUARD_WINDOW);
                    let window = || lines[start..line.index].iter().map(|l| l.code.as_str());
                    for chain in property_chains(&line.code) {
                        if is_assignment_target(&line.code, chain.range.end)
                            || chain_guarded(window(), &line.code, &chain.root)
                        {
                            continue;
                        }
                        push(
                            RuleId::UnguardedPropertyChain,
                            Severity::Warning,
                            format!(
                                "'{}' may be null or undefined; guard it or use optional chaining",
                                &line.code[chain.range]
                            ),
                            Some(line.number()),
                        );
                    }
                }
            }
        }
    }
}

/// Evaluates the rule table against source text
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    config: &'a QualityConfig,
}

impl<'a> RuleEngine<'a> {
    /// Creates an engine over `config`
    pub fn new(config: &'a QualityConfig) -> Self {
        Self { config }
    }

    /// Evaluates every rule in table order
    pub fn evaluate(&self, text: &str, functions: &[FunctionRecord]) -> Vec<Violation> {
        let lines = scan(text);
        self.evaluate_lines(&lines, functions)
    }

    /// Evaluates every rule over already-scanned lines
    pub fn evaluate_lines(
        &self,
        lines: &[SourceLine<'_>],
        functions: &[FunctionRecord],
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in Rule::ALL {
            rule.check(lines, functions, self.config, &mut violations);
        }
        debug!(
            "Evaluated {} rules over {} lines: {} violations",
            Rule::ALL.len(),
            lines.len(),
            violations.len()
        );
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsExtractor;

    fn evaluate(text: &str) -> Vec<Violation> {
        let config = QualityConfig::default();
        let functions = MetricsExtractor::extract(text);
        RuleEngine::new(&config).evaluate(text, &functions)
    }

    fn ids(violations: &[Violation]) -> Vec<RuleId> {
        violations.iter().map(|v| v.rule_id).collect()
    }

    #[test]
    fn test_clean_text_has_no_violations() {
        assert!(evaluate("").is_empty());
        assert!(evaluate("const limit = 1;\nlet name = 'x';\n").is_empty());
    }

    #[test]
    fn test_any_and_suppressions() {
        let text = "// @ts-ignore\nlet a: any;\n/* eslint-disable no-console */\n";
        let violations = evaluate(text);
        assert_eq!(
            ids(&violations),
            vec![
                RuleId::NoExplicitAny,
                RuleId::TsSuppression,
                RuleId::EslintSuppression
            ]
        );
        assert_eq!(violations[0].line, Some(2));
        assert!(violations.iter().all(Violation::is_error));
    }

    #[test]
    fn test_console_severity_follows_config() {
        let config = QualityConfig {
            logging_severity: Severity::Warning,
            ..Default::default()
        };
        let violations = RuleEngine::new(&config).evaluate("console.log('x');", &[]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].category, ViolationCategory::Logging);
    }

    #[test]
    fn test_markers_inside_strings_are_ignored() {
        let text = "const s = 'console.log(x) any @ts-ignore';\nconst t: string = \"eslint-disable\";";
        assert!(evaluate(text).is_empty());
    }

    #[test]
    fn test_function_rules() {
        let mut text = String::from("function big(a: number, b: number, c: number, d: number, e: number) {\n");
        for i in 0..32 {
            text.push_str(&format!("  const v{} = a + {};\n", i, i % 2));
        }
        text.push_str("  return a;\n}\n");
        let violations = evaluate(&text);
        let found = ids(&violations);
        assert!(found.contains(&RuleId::MaxFunctionLines));
        assert!(found.contains(&RuleId::MaxParameters));
        assert!(found.contains(&RuleId::EarlyValidation));
        assert!(!found.contains(&RuleId::MaxComplexity));
        let size = violations
            .iter()
            .find(|v| v.rule_id == RuleId::MaxFunctionLines)
            .unwrap();
        assert_eq!(size.category, ViolationCategory::Complexity);
        assert_eq!(size.line, Some(1));
    }

    #[test]
    fn test_file_size_thresholds() {
        let soft: String = (0..260).map(|i| format!("let v{} = {};\n", i, i % 2)).collect();
        let violations = evaluate(&soft);
        assert_eq!(ids(&violations), vec![RuleId::FileLinesWarning]);

        let hard: String = (0..301).map(|i| format!("let v{} = {};\n", i, i % 2)).collect();
        let violations = evaluate(&hard);
        assert_eq!(ids(&violations), vec![RuleId::MaxFileLines]);
        assert!(violations[0].is_error());
    }

    #[test]
    fn test_require_jsdoc() {
        let text = "/** Documented */\nexport const a = 1;\n\nexport function b() {}\n";
        let violations = evaluate(text);
        let docs: Vec<_> = violations
            .iter()
            .filter(|v| v.rule_id == RuleId::RequireJsdoc)
            .collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].line, Some(4));
    }

    #[test]
    fn test_duplicate_imports_reported_once_per_module() {
        let text = "import { a } from './m';\nimport { b } from './m';\nimport { c } from './m';\nimport type { T } from './m';";
        let violations = evaluate(text);
        assert_eq!(ids(&violations), vec![RuleId::DuplicateImport]);
        assert_eq!(violations[0].line, Some(2));
    }

    #[test]
    fn test_type_only_import_of_same_module_is_a_duplicate() {
        let violations = evaluate("import { a } from './m';\nimport type { T } from './m';");
        assert_eq!(ids(&violations), vec![RuleId::DuplicateImport]);
        assert_eq!(violations[0].line, Some(2));
    }

    #[test]
    fn test_module_named_in_a_comment_is_not_a_duplicate() {
        let text = "import { b } from './b';\nimport {\n  a, // see also from './b'\n} from './a';";
        assert!(evaluate(text).is_empty());
    }

    #[test]
    fn test_duplicate_lines_skip_structural_lines() {
        let text = "if (a) {\n  total += 1;\n}\nif (b) {\n  total += 1;\n}\nif (c) {\n  total += 1;\n}\n";
        let violations = evaluate(text);
        assert_eq!(ids(&violations), vec![RuleId::DuplicateLines]);
        assert_eq!(violations[0].line, Some(2));
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn test_result_access_rule() {
        let unchecked = evaluate("const user = result.data;");
        assert_eq!(ids(&unchecked), vec![RuleId::UncheckedResultAccess]);

        let checked = evaluate("if (!result.success) {\n  return;\n}\nconst user = result.data;");
        assert!(checked.is_empty());
    }

    #[test]
    fn test_loose_types_and_chains() {
        let violations = evaluate("let o: Object = {};\nconst city = user.address.city;");
        assert_eq!(
            ids(&violations),
            vec![RuleId::LooseTypeAssignment, RuleId::UnguardedPropertyChain]
        );

        let guarded = evaluate("if (user) {\n  const city = user.address.city;\n}");
        assert!(guarded.is_empty());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let text = "let a: any;\nconsole.log(a);\nconst c = user.address.city;\nlet b: any;";
        assert_eq!(evaluate(text), evaluate(text));
    }
}
