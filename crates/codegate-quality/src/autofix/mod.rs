//! Ordered auto-fix pipeline
//!
//! Eight passes run in a fixed order over the lines of a file. Each pass
//! checks whether its rewrite is already present before acting, so running
//! the pipeline on its own output changes nothing. A pass that cannot rewrite
//! a construct safely leaves it untouched and records a [`FixNote`].
//!
//! Line endings are normalized to `\n`; a trailing newline is preserved.

mod passes;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{config::QualityConfig, models::ViolationCategory};

/// One rewrite step of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixPass {
    /// `any` annotations become `unknown`
    WidenAny,
    /// Stable sort of import statements
    OrganizeImports,
    /// Standalone `console.*` lines are removed
    StripConsole,
    /// Doc comments above undocumented exports
    InjectJsdoc,
    /// Refactor note above functions with too many parameters
    AnnotateParameters,
    /// Consecutive duplicate code lines are collapsed
    RemoveDuplicateLines,
    /// Size warning banner at the top of large files
    SizeBanner,
    /// Result access, loose types and unguarded chains
    RewriteTypeHazards,
}

impl FixPass {
    /// Execution order
    pub const ALL: [FixPass; 8] = [
        FixPass::WidenAny,
        FixPass::OrganizeImports,
        FixPass::StripConsole,
        FixPass::InjectJsdoc,
        FixPass::AnnotateParameters,
        FixPass::RemoveDuplicateLines,
        FixPass::SizeBanner,
        FixPass::RewriteTypeHazards,
    ];

    /// Identifier used in notes and logs
    pub fn name(&self) -> &'static str {
        match self {
            FixPass::WidenAny => "widen-any",
            FixPass::OrganizeImports => "organize-imports",
            FixPass::StripConsole => "strip-console",
            FixPass::InjectJsdoc => "inject-jsdoc",
            FixPass::AnnotateParameters => "annotate-parameters",
            FixPass::RemoveDuplicateLines => "remove-duplicate-lines",
            FixPass::SizeBanner => "size-banner",
            FixPass::RewriteTypeHazards => "rewrite-type-hazards",
        }
    }

    fn apply(&self, lines: &mut Vec<String>, config: &QualityConfig, notes: &mut Vec<FixNote>) {
        match self {
            FixPass::WidenAny => passes::widen_any(lines),
            FixPass::OrganizeImports => passes::organize_imports(lines, notes),
            FixPass::StripConsole => passes::strip_console(lines, notes),
            FixPass::InjectJsdoc => passes::inject_jsdoc(lines),
            FixPass::AnnotateParameters => passes::annotate_parameters(lines, config),
            FixPass::RemoveDuplicateLines => passes::remove_duplicate_lines(lines, notes),
            FixPass::SizeBanner => passes::size_banner(lines, config),
            FixPass::RewriteTypeHazards => passes::rewrite_type_hazards(lines, notes),
        }
    }
}

/// A construct a pass declined to rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixNote {
    /// Pass that skipped the construct
    pub pass: FixPass,
    /// 1-based line number in the final content
    pub line: usize,
    /// Hazard category the construct belongs to
    pub category: ViolationCategory,
    /// Why the rewrite was skipped
    pub message: String,
}

impl FixNote {
    fn new(
        pass: FixPass,
        line: usize,
        category: ViolationCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            pass,
            line,
            category,
            message: message.into(),
        }
    }
}

/// Result of running the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOutcome {
    /// Rewritten text
    pub content: String,
    /// Passes that changed the text, in execution order
    pub applied: Vec<FixPass>,
    /// Skipped rewrites
    pub notes: Vec<FixNote>,
}

/// Maps each line index of `before` to its index in `after`.
///
/// Passes only insert or remove whole lines when the count changes. A removed
/// line maps to the line that follows it.
fn line_map(before: &[String], after: &[String]) -> Vec<usize> {
    let mut map = Vec::with_capacity(before.len());
    let mut j = 0;
    for (i, line) in before.iter().enumerate() {
        while j < after.len() && after[j] != *line && after.len() - j > before.len() - i {
            j += 1;
        }
        if after.get(j) == Some(line) {
            map.push(j);
            j += 1;
        } else {
            map.push(j.min(after.len().saturating_sub(1)));
        }
    }
    map
}

/// Runs the fix passes in order
#[derive(Debug, Clone, Copy)]
pub struct AutoFixPipeline<'a> {
    config: &'a QualityConfig,
}

impl<'a> AutoFixPipeline<'a> {
    /// Creates a pipeline over `config`
    pub fn new(config: &'a QualityConfig) -> Self {
        Self { config }
    }

    /// Rewrites `text`, returning only the new content
    pub fn fix(&self, text: &str) -> String {
        self.run(text).content
    }

    /// Rewrites `text`, reporting which passes acted and which skipped
    pub fn run(&self, text: &str) -> FixOutcome {
        if text.is_empty() {
            return FixOutcome::default();
        }

        let trailing_newline = text.ends_with('\n');
        let mut lines: Vec<String> = text
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        let mut outcome = FixOutcome::default();

        for pass in FixPass::ALL {
            let before = lines.clone();
            let noted = outcome.notes.len();
            pass.apply(&mut lines, self.config, &mut outcome.notes);

            if lines != before {
                debug!("Fix pass '{}' rewrote the text", pass.name());
                outcome.applied.push(pass);
                if lines.len() != before.len() {
                    let map = line_map(&before, &lines);
                    for note in &mut outcome.notes {
                        if let Some(&line) = map.get(note.line - 1) {
                            note.line = line + 1;
                        }
                    }
                }
            }
            for note in &outcome.notes[noted..] {
                warn!(
                    "Fix pass '{}' skipped line {}: {}",
                    note.pass.name(),
                    note.line,
                    note.message
                );
            }
        }

        outcome.content = lines.join("\n");
        if trailing_newline && !lines.is_empty() {
            outcome.content.push('\n');
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> FixOutcome {
        let config = QualityConfig::default();
        AutoFixPipeline::new(&config).run(text)
    }

    fn fix(text: &str) -> String {
        run(text).content
    }

    #[test]
    fn test_empty_input_is_unchanged() {
        let outcome = run("");
        assert_eq!(outcome.content, "");
        assert!(outcome.applied.is_empty());
        assert!(outcome.notes.is_empty());
    }

    #[test]
    fn test_clean_input_is_unchanged() {
        let text = "const limit = 1;\nlet label = 'x';\n";
        let outcome = run(text);
        assert_eq!(outcome.content, text);
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_trailing_newline_is_preserved() {
        assert_eq!(fix("let a: any;\n"), "let a: unknown;\n");
        assert_eq!(fix("let a: any;"), "let a: unknown;");
        assert_eq!(fix("let a = 1;\r\nlet b = 2;\r\n"), "let a = 1;\nlet b = 2;\n");
    }

    #[test]
    fn test_exported_any_function() {
        let outcome = run("export function f(data: any): any { return data; }");
        assert!(!outcome.content.contains("any"));
        assert!(outcome.content.contains("export function f(data: unknown): unknown"));
        assert!(outcome.content.starts_with("/**\n * F\n"));
        assert_eq!(
            outcome.applied,
            vec![FixPass::WidenAny, FixPass::InjectJsdoc]
        );
    }

    #[test]
    fn test_passes_run_in_order() {
        let text = "import { z } from './z';\nimport fs from 'fs';\nconsole.log('start');\nconst user = result.data;\n";
        let outcome = run(text);
        assert_eq!(
            outcome.content,
            "import fs from 'fs';\nimport { z } from './z';\nconst user = (result.success ? result.data : undefined);\n"
        );
        assert_eq!(
            outcome.applied,
            vec![
                FixPass::OrganizeImports,
                FixPass::StripConsole,
                FixPass::RewriteTypeHazards
            ]
        );
    }

    #[test]
    fn test_fix_is_idempotent_on_mixed_input() {
        let text = "import b from './b';\nimport a from 'node:path';\n\
                    export function load(a1: any, b2: string, c3: number, d4: Object, e5: Function) {\n\
                    \x20 if (!a1) {\n    return;\n  }\n  console.debug(a1);\n  const city = a1.address.city;\n\
                    \x20 const out = response.error;\n  const out = response.error;\n  return city;\n}\n";
        let once = fix(text);
        assert_eq!(fix(&once), once);
    }

    #[test]
    fn test_line_map_tracks_insertions_and_removals() {
        let before = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let inserted: Vec<String> = ["x", "a", "y", "b", "c"].map(String::from).to_vec();
        assert_eq!(line_map(&before, &inserted), vec![1, 3, 4]);

        let removed: Vec<String> = ["a", "c"].map(String::from).to_vec();
        assert_eq!(line_map(&before, &removed), vec![0, 1, 1]);
    }

    #[test]
    fn test_note_lines_follow_later_insertions() {
        let outcome = run("export function announce(ready: boolean): void {\n  if (ready)\n    console.log('ready');\n}\n");
        assert_eq!(outcome.applied, vec![FixPass::InjectJsdoc]);
        assert_eq!(outcome.notes.len(), 1);
        assert_eq!(outcome.notes[0].line, 9);
        let lines: Vec<&str> = outcome.content.lines().collect();
        assert_eq!(lines[8], "    console.log('ready');");
    }

    #[test]
    fn test_notes_do_not_change_content() {
        let outcome = run("if (debug)\n  console.log('x');\n");
        assert_eq!(outcome.content, "if (debug)\n  console.log('x');\n");
        assert_eq!(outcome.notes.len(), 1);
        assert_eq!(outcome.notes[0].pass, FixPass::StripConsole);
        assert_eq!(outcome.notes[0].line, 2);
    }
}
