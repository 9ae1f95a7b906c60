//! Property-based tests for quality scoring
//!
//! Property: the score starts at 100, deducts per violation instance and
//! never increases when violations are added.

use codegate_quality::{
    QualityGate, RuleId, Scorer, Severity, Violation, ViolationCategory, MAX_SCORE,
};
use proptest::prelude::*;

fn rule_strategy() -> impl Strategy<Value = RuleId> {
    prop::sample::select(vec![
        RuleId::NoExplicitAny,
        RuleId::TsSuppression,
        RuleId::EslintSuppression,
        RuleId::NoConsole,
        RuleId::MaxFunctionLines,
        RuleId::MaxComplexity,
        RuleId::MaxFileLines,
        RuleId::FileLinesWarning,
        RuleId::MaxParameters,
        RuleId::RequireJsdoc,
        RuleId::DuplicateImport,
        RuleId::DuplicateLines,
        RuleId::EarlyValidation,
        RuleId::UncheckedResultAccess,
        RuleId::LooseTypeAssignment,
        RuleId::UnguardedPropertyChain,
        RuleId::FixSkipped,
    ])
}

/// Generator output lines, hazards included
const VOCABULARY: &[&str] = &[
    "",
    "import fs from 'fs';",
    "let value: any;",
    "let label: Object;",
    "console.log('loaded');",
    "const city = user.address.city;",
    "const data = result.data;",
    "const failure = response.error;",
    "export const LIMIT = 5;",
    "const total = count + 1;",
];

/// Constructs that each trigger an error-severity rule
const ERROR_CONSTRUCTS: &[&str] = &[
    "console.log(result.success);",
    "console.info(response.ok);",
    "let extra: any;",
    "// @ts-ignore",
    "// eslint-disable-next-line",
];

fn violation(rule_id: RuleId) -> Violation {
    Violation::new(
        rule_id,
        ViolationCategory::Pattern,
        Severity::Warning,
        "generated",
        None,
    )
}

proptest! {
    /// Property: n distinct `any` declarations cost 10 points each
    #[test]
    fn prop_any_declarations_deduct_ten_each(n in 0usize..=10) {
        let source: Vec<String> = (0..n).map(|i| format!("let x{}: any;", i)).collect();
        let report = QualityGate::default().analyze(&source.join("\n"));
        prop_assert_eq!(report.score, 100 - 10 * n as u32);
        prop_assert_eq!(report.valid, n == 0);
    }

    /// Property: adding a violation never raises the score
    #[test]
    fn prop_score_is_monotonic(
        rules in prop::collection::vec(rule_strategy(), 0..30),
        extra in rule_strategy(),
    ) {
        let scorer = Scorer::default();
        let mut violations: Vec<Violation> = rules.into_iter().map(violation).collect();
        let before = scorer.score(&violations);
        violations.push(violation(extra));
        let after = scorer.score(&violations);
        prop_assert!(after <= before);
        prop_assert!(after <= MAX_SCORE);
    }

    /// Property: adding an error construct to the text never raises its score
    #[test]
    fn prop_error_construct_never_raises_score(
        lines in prop::collection::vec(prop::sample::select(VOCABULARY.to_vec()), 0..20),
        construct in prop::sample::select(ERROR_CONSTRUCTS.to_vec()),
        position in any::<prop::sample::Index>(),
    ) {
        let gate = QualityGate::default();
        let before = gate.analyze(&lines.join("\n"));

        let mut extended = lines.clone();
        extended.insert(position.index(lines.len() + 1), construct);
        let after = gate.analyze(&extended.join("\n"));

        prop_assert!(
            after.score <= before.score,
            "score rose from {} to {} after inserting {:?}",
            before.score,
            after.score,
            construct
        );
        prop_assert!(!after.valid);
    }

    /// Property: clean declarations score full marks
    #[test]
    fn prop_clean_text_scores_full_marks(names in prop::collection::hash_set("[a-z]{3,8}", 0..12)) {
        let source: Vec<String> = names
            .iter()
            .map(|name| format!("const {}Label = '{}';", name, name))
            .collect();
        let report = QualityGate::default().analyze(&source.join("\n"));
        prop_assert!(report.valid);
        prop_assert!(report.violations.is_empty());
        prop_assert_eq!(report.score, 100);
    }
}
