//! Individual fix passes
//!
//! Every pass rescans the current lines, decides on its edits against that
//! snapshot, then rewrites the line vector in one step.

use std::{collections::BTreeMap, ops::Range, sync::OnceLock};

use heck::ToSnakeCase;
use regex::Regex;

use super::{FixNote, FixPass};
use crate::{
    config::QualityConfig,
    imports::scan_imports,
    lexer::{indentation, is_structural, scan, LineKind, SourceLine},
    metrics::MetricsExtractor,
    models::ViolationCategory,
    patterns::{
        any_type_spans, chain_guarded, console_calls, exported_declaration, is_assignment_target,
        is_doc_line, loose_types, property_chains, result_accesses, result_checked,
    },
    rules::{CHAIN_GUARD_WINDOW, RESULT_CHECK_WINDOW},
};

/// Marker of a parameter refactor note
const REFACTOR_MARKER: &str = "// REFACTOR:";

/// Prefix of the size banner
const BANNER_PREFIX: &str = "// NOTE: this file has";

/// Comment appended to lines rewritten with optional chaining
const NULL_CHECK_TODO: &str = "// TODO: add an explicit null check";

/// Line endings that continue an expression onto the next line
const CONTINUATIONS: &[&str] = &["=>", ",", "(", "=", "?", ":", "&&", "||", "+", "-", "return"];

fn header_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(?:\}\s*)?(?:else\s+)?(?:if|for|while)\b.*\)$").expect("Invalid regex")
    })
}

/// Scans `text`, padding with blank lines up to `len`.
///
/// `str::lines` drops one final empty line, the line vector does not.
fn scan_padded(text: &str, len: usize) -> Vec<SourceLine<'_>> {
    let mut scanned = scan(text);
    while scanned.len() < len {
        let ends_open = scanned.last().is_some_and(|l| l.ends_open);
        scanned.push(SourceLine {
            index: scanned.len(),
            raw: "",
            code: String::new(),
            comment: String::new(),
            kind: LineKind::Blank,
            ends_open,
        });
    }
    scanned
}

/// Whether the line starts or ends inside a block comment or template literal
fn is_open(scanned: &[SourceLine<'_>], i: usize) -> bool {
    scanned[i].ends_open || (i > 0 && scanned[i - 1].ends_open)
}

fn previous_code<'s, 'a>(scanned: &'s [SourceLine<'a>], i: usize) -> Option<&'s SourceLine<'a>> {
    scanned[..i].iter().rev().find(|l| l.is_code())
}

fn next_code<'s, 'a>(scanned: &'s [SourceLine<'a>], i: usize) -> Option<&'s SourceLine<'a>> {
    scanned.get(i + 1..)?.iter().find(|l| l.is_code())
}

/// Applies non-overlapping edits right to left; `None` if any overlap
fn apply_edits(raw: &str, mut edits: Vec<(Range<usize>, String)>) -> Option<String> {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start).then(b.0.end.cmp(&a.0.end)));
    let mut out = raw.to_string();
    let mut limit = raw.len();
    for (range, replacement) in edits {
        if range.end > limit {
            return None;
        }
        out.replace_range(range.clone(), &replacement);
        limit = range.start;
    }
    Some(out)
}

pub(super) fn widen_any(lines: &mut [String]) {
    let text = lines.join("\n");
    let scanned = scan_padded(&text, lines.len());
    for (line, source) in lines.iter_mut().zip(&scanned) {
        if !source.is_code() {
            continue;
        }
        let edits: Vec<_> = any_type_spans(&source.code)
            .into_iter()
            .map(|span| (span, "unknown".to_string()))
            .collect();
        if edits.is_empty() {
            continue;
        }
        if let Some(rewritten) = apply_edits(line, edits) {
            *line = rewritten;
        }
    }
}

pub(super) fn organize_imports(lines: &mut Vec<String>, notes: &mut Vec<FixNote>) {
    let text = lines.join("\n");
    let scanned = scan_padded(&text, lines.len());
    let found = scan_imports(&scanned);

    if !found.unterminated.is_empty() {
        for start in &found.unterminated {
            notes.push(FixNote::new(
                FixPass::OrganizeImports,
                start + 1,
                ViolationCategory::Import,
                "import statement without a module path; imports left in place",
            ));
        }
        return;
    }

    let statements = found.statements;
    let mut order: Vec<usize> = (0..statements.len()).collect();
    order.sort_by(|&a, &b| statements[a].sort_key().cmp(&statements[b].sort_key()));
    if order.iter().enumerate().all(|(slot, &idx)| slot == idx) {
        return;
    }

    let mut out = Vec::with_capacity(lines.len());
    let mut slot = 0;
    let mut i = 0;
    while i < lines.len() {
        match statements.get(slot) {
            Some(statement) if statement.start == i => {
                let moved = &statements[order[slot]];
                out.extend_from_slice(&lines[moved.start..=moved.end]);
                i = statement.end + 1;
                slot += 1;
            }
            _ => {
                out.push(lines[i].clone());
                i += 1;
            }
        }
    }
    *lines = out;
}

fn is_braceless_header(code: &str) -> bool {
    let trimmed = code.trim();
    matches!(trimmed, "else" | "} else" | "do") || header_regex().is_match(trimmed)
}

/// `case X:` or `default:`, whose colon ends a label rather than an expression
fn is_switch_label(code: &str) -> bool {
    code.ends_with(':') && (code.starts_with("case ") || code.trim_end_matches(':').trim() == "default")
}

/// Byte offset just past the `)` closing the call whose `(` ends `call`
fn call_end(code: &str, call: &Range<usize>) -> Option<usize> {
    let mut depth = 0i32;
    for (pos, c) in code[call.end - 1..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(call.end + pos);
                }
            }
            _ => {}
        }
    }
    None
}

pub(super) fn strip_console(lines: &mut Vec<String>, notes: &mut Vec<FixNote>) {
    let text = lines.join("\n");
    let scanned = scan_padded(&text, lines.len());
    let mut remove = vec![false; lines.len()];

    for (i, line) in scanned.iter().enumerate() {
        if !line.is_code() || !line.code.trim_start().starts_with("console") {
            continue;
        }
        let calls = console_calls(&line.code);
        let Some(call) = calls.first() else {
            continue;
        };
        if call.start != indentation(&line.code).len() {
            continue;
        }
        let note = |message: &str| {
            FixNote::new(FixPass::StripConsole, i + 1, ViolationCategory::Logging, message)
        };

        if is_open(&scanned, i) {
            notes.push(note("console call inside a multi-line comment or template literal"));
            continue;
        }
        let Some(end) = call_end(&line.code, call) else {
            notes.push(note("console call spans several lines"));
            continue;
        };
        if !matches!(line.code[end..].trim(), "" | ";") {
            continue;
        }
        if next_code(&scanned, i).is_some_and(|n| {
            let t = n.code.trim_start();
            t.starts_with('.') || t.starts_with("?.")
        }) {
            notes.push(note("console call result is chained on the next line"));
            continue;
        }
        if let Some(prev) = previous_code(&scanned, i) {
            let prev_code = prev.code.trim();
            if is_braceless_header(prev_code) {
                notes.push(note("console call is the only body of a control statement"));
                continue;
            }
            if !is_switch_label(prev_code) && CONTINUATIONS.iter().any(|c| prev_code.ends_with(c)) {
                notes.push(note("console call continues the previous expression"));
                continue;
            }
        }
        remove[i] = true;
    }

    if remove.iter().any(|r| *r) {
        let kept = lines
            .drain(..)
            .zip(remove)
            .filter_map(|(line, removed)| (!removed).then_some(line))
            .collect();
        *lines = kept;
    }
}

/// One-line summary derived from an identifier
fn summary(name: Option<&str>) -> String {
    let Some(name) = name else {
        return "Default export".to_string();
    };
    let words = name.to_snake_case().replace('_', " ");
    let mut chars = words.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name.to_string(),
    }
}

pub(super) fn inject_jsdoc(lines: &mut Vec<String>) {
    let text = lines.join("\n");
    let scanned = scan_padded(&text, lines.len());
    let mut blocks: BTreeMap<usize, Vec<String>> = BTreeMap::new();

    for (i, line) in scanned.iter().enumerate() {
        if !line.is_code() || (i > 0 && scanned[i - 1].ends_open) {
            continue;
        }
        let Some(decl) = exported_declaration(&line.code) else {
            continue;
        };
        if i > 0 && is_doc_line(&lines[i - 1]) {
            continue;
        }
        let indent = indentation(&lines[i]);
        let mut block = vec![
            format!("{indent}/**"),
            format!("{indent} * {}", summary(decl.name.as_deref())),
        ];
        if decl.is_function(&line.code) {
            block.push(format!("{indent} *"));
            block.push(format!("{indent} * @returns Description of the return value"));
            block.push(format!("{indent} * @throws {{Error}} Description of failure conditions"));
        }
        block.push(format!("{indent} */"));
        blocks.insert(i, block);
    }

    if blocks.is_empty() {
        return;
    }
    let mut out = Vec::with_capacity(lines.len() + blocks.len() * 6);
    for (i, line) in lines.drain(..).enumerate() {
        if let Some(block) = blocks.remove(&i) {
            out.extend(block);
        }
        out.push(line);
    }
    *lines = out;
}

pub(super) fn annotate_parameters(lines: &mut Vec<String>, config: &QualityConfig) {
    let text = lines.join("\n");
    let scanned = scan_padded(&text, lines.len());
    let mut inserts: BTreeMap<usize, String> = BTreeMap::new();

    for record in MetricsExtractor::extract_lines(&scanned) {
        let count = record.parameters.len();
        if count <= config.max_parameters {
            continue;
        }
        let decl = record.line_span.0 - 1;
        let mut at = decl;
        while at > 0 && is_doc_line(&lines[at - 1]) {
            at -= 1;
            if lines[at].trim_start().starts_with("/**") {
                break;
            }
        }
        if at > 0 && lines[at - 1].trim_start().starts_with(REFACTOR_MARKER) {
            continue;
        }
        inserts.entry(at).or_insert_with(|| {
            format!(
                "{}{} {} takes {} parameters; group them into an options object",
                indentation(&lines[decl]),
                REFACTOR_MARKER,
                record.name,
                count
            )
        });
    }

    if inserts.is_empty() {
        return;
    }
    let mut out = Vec::with_capacity(lines.len() + inserts.len());
    for (i, line) in lines.drain(..).enumerate() {
        if let Some(note) = inserts.remove(&i) {
            out.push(note);
        }
        out.push(line);
    }
    *lines = out;
}

pub(super) fn remove_duplicate_lines(lines: &mut Vec<String>, notes: &mut Vec<FixNote>) {
    let text = lines.join("\n");
    let scanned = scan_padded(&text, lines.len());
    let mut remove = vec![false; lines.len()];

    for i in 1..lines.len() {
        let (prev, line) = (&scanned[i - 1], &scanned[i]);
        if !line.is_code() || !prev.is_code() || lines[i] != lines[i - 1] {
            continue;
        }
        if is_open(&scanned, i) || is_open(&scanned, i - 1) {
            notes.push(FixNote::new(
                FixPass::RemoveDuplicateLines,
                i + 1,
                ViolationCategory::Duplication,
                "duplicate line inside a multi-line comment or template literal",
            ));
            continue;
        }
        if !is_structural(line.code.trim()) {
            remove[i] = true;
        }
    }

    if remove.iter().any(|r| *r) {
        let kept = lines
            .drain(..)
            .zip(remove)
            .filter_map(|(line, removed)| (!removed).then_some(line))
            .collect();
        *lines = kept;
    }
}

pub(super) fn size_banner(lines: &mut Vec<String>, config: &QualityConfig) {
    let count = lines.iter().filter(|l| !l.trim().is_empty()).count();
    if count <= config.file_lines_warning {
        return;
    }
    let at = usize::from(lines.first().is_some_and(|l| l.starts_with("#!")));
    if lines.get(at).is_some_and(|l| l.starts_with(BANNER_PREFIX)) {
        return;
    }
    let relation = if count > config.max_file_lines {
        "exceeding"
    } else {
        "approaching"
    };
    lines.insert(
        at,
        format!(
            "{} {} non-blank lines, {} the {}-line limit; consider splitting it",
            BANNER_PREFIX, count, relation, config.max_file_lines
        ),
    );
}

/// Candidate rewrite of one line in the type-hazard pass
struct HazardRewrite {
    text: String,
    category: ViolationCategory,
}

fn rewrite_hazards(
    scanned: &[SourceLine<'_>],
    raw: &str,
    i: usize,
    notes: &mut Vec<FixNote>,
) -> Option<HazardRewrite> {
    let line = &scanned[i];
    if !line.is_code() {
        return None;
    }
    let code = line.code.as_str();
    let note = |category, message: String| {
        FixNote::new(FixPass::RewriteTypeHazards, i + 1, category, message)
    };

    let window_start = i.saturating_sub(RESULT_CHECK_WINDOW);
    let mut accesses = Vec::new();
    for access in result_accesses(code) {
        let window = scanned[window_start..=i].iter().map(|l| l.code.as_str());
        if result_checked(window, &access.receiver) {
            continue;
        }
        if is_assignment_target(code, access.range.end) {
            notes.push(note(
                ViolationCategory::PropertyAccess,
                format!("assignment target '{}' left unchanged", &code[access.range.clone()]),
            ));
            continue;
        }
        accesses.push(access);
    }

    let loose = loose_types(code);

    let guard_start = i.saturating_sub(CHAIN_GUARD_WINDOW);
    let mut chains = Vec::new();
    for chain in property_chains(code) {
        let window = scanned[guard_start..i].iter().map(|l| l.code.as_str());
        if chain_guarded(window, code, &chain.root) {
            continue;
        }
        if is_assignment_target(code, chain.range.end) {
            notes.push(note(
                ViolationCategory::NullSafety,
                format!("assignment target '{}' left unchanged", &code[chain.range.clone()]),
            ));
            continue;
        }
        chains.push(chain);
    }

    let category = if !accesses.is_empty() {
        ViolationCategory::PropertyAccess
    } else if !loose.is_empty() {
        ViolationCategory::TypeAssignment
    } else if !chains.is_empty() {
        ViolationCategory::NullSafety
    } else {
        return None;
    };
    if is_open(scanned, i) {
        notes.push(note(
            category,
            "line is part of a multi-line comment or template literal".to_string(),
        ));
        return None;
    }

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    for access in &accesses {
        let r = &access.receiver;
        let guarded = if access.property == "data" {
            format!("({r}.success ? {r}.data : undefined)")
        } else {
            format!("({r}.success ? undefined : {r}.error)")
        };
        edits.push((access.range.clone(), guarded));
    }
    for (range, kind) in &loose {
        edits.push((range.clone(), kind.narrowed().to_string()));
    }
    for chain in &chains {
        for &pos in &chain.accessors {
            if code[pos..].starts_with('[') {
                edits.push((pos..pos, "?.".to_string()));
            } else {
                edits.push((pos..pos + 1, "?.".to_string()));
            }
        }
    }

    let Some(mut text) = apply_edits(raw, edits) else {
        notes.push(note(category, "overlapping rewrites".to_string()));
        return None;
    };
    if !chains.is_empty() {
        text.push_str("  ");
        text.push_str(NULL_CHECK_TODO);
    }
    Some(HazardRewrite { text, category })
}

pub(super) fn rewrite_type_hazards(lines: &mut [String], notes: &mut Vec<FixNote>) {
    let text = lines.join("\n");
    let scanned = scan_padded(&text, lines.len());
    let candidates: Vec<Option<HazardRewrite>> = (0..lines.len())
        .map(|i| rewrite_hazards(&scanned, &lines[i], i, notes))
        .collect();

    for (i, candidate) in candidates.iter().enumerate() {
        let Some(candidate) = candidate else {
            continue;
        };
        let duplicates_prev = i > 0 && lines[i - 1] == candidate.text;
        let duplicates_next = lines.get(i + 1).is_some_and(|next| *next == candidate.text)
            || candidates
                .get(i + 1)
                .and_then(Option::as_ref)
                .is_some_and(|next| next.text == candidate.text);
        if duplicates_prev || duplicates_next {
            notes.push(FixNote::new(
                FixPass::RewriteTypeHazards,
                i + 1,
                candidate.category,
                "rewrite would duplicate an adjacent line",
            ));
            continue;
        }
        lines[i] = candidate.text.clone();
    }
}
