//! Construct detectors shared by the rule engine and the fix pipeline
//!
//! Every detector works on a single code view produced by [`crate::lexer`],
//! so the positions it returns can be used to rewrite the raw line.

use std::{ops::Range, sync::OnceLock};

use regex::Regex;

use crate::lexer::words;

/// Type-check suppression markers
pub const TS_SUPPRESSIONS: &[&str] = &["@ts-ignore", "@ts-nocheck", "@ts-expect-error"];

/// Lint suppression marker prefix (`eslint-disable`, `-line`, `-next-line`)
pub const ESLINT_SUPPRESSION: &str = "eslint-disable";

/// Properties that check the outcome of a result-like object
const RESULT_GUARDS: &[&str] = &[
    "success", "ok", "isOk", "isErr", "isSuccess", "isError", "isFailure",
];

/// Lowercase chain roots that are never nullish. Capitalized roots are
/// namespaces, enums or classes and are skipped as well.
const SAFE_ROOTS: &[&str] = &[
    "this", "super", "console", "process", "window", "document", "globalThis", "module",
    "exports", "require", "import",
];

fn console_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\bconsole\s*\.\s*(log|debug|info|warn|error|trace|dir|table)\s*\(")
            .expect("Invalid regex")
    })
}

fn loose_type_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r":\s*(?:(Object|object|Function)\b|(\{\s*\}))").expect("Invalid regex")
    })
}

fn result_access_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_$][\w$]*)\.(data|error)\b").expect("Invalid regex")
    })
}

fn chain_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\[[^\[\]]*\])+").expect("Invalid regex")
    })
}

fn export_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"^\s*export\s+(?:default\s+)?(?:declare\s+)?(?:async\s+)?(?:abstract\s+)?(function|class|interface|type|enum|const|let|var|namespace)\b\s*\*?\s*([A-Za-z_$][\w$]*)?",
        )
        .expect("Invalid regex")
    })
}

fn next_non_space(code: &str, from: usize) -> Option<char> {
    code[from..].chars().find(|c| !c.is_whitespace())
}

fn prev_non_space(code: &str, before: usize) -> Option<char> {
    code[..before].chars().rev().find(|c| !c.is_whitespace())
}

/// Whether the text after `from` assigns to the preceding expression
pub fn is_assignment_target(code: &str, from: usize) -> bool {
    let rest = code[from..].trim_start();
    if rest.starts_with("++") || rest.starts_with("--") {
        return true;
    }
    let mut chars = rest.chars();
    match chars.next() {
        Some('=') => !matches!(chars.next(), Some('=') | Some('>')),
        Some('+') | Some('-') | Some('*') | Some('/') | Some('|') | Some('&') | Some('?') => {
            rest.len() > 1 && rest[1..].starts_with('=')
        }
        _ => false,
    }
}

/// Byte ranges of `any` used in a type position
pub fn any_type_spans(code: &str) -> Vec<Range<usize>> {
    let trimmed = code.trim_start();
    let type_alias = trimmed.starts_with("type ") || trimmed.starts_with("export type ");

    let found = words(code);
    let mut spans = Vec::new();
    for (idx, &(pos, word)) in found.iter().enumerate() {
        if word != "any" {
            continue;
        }
        let end = pos + word.len();
        let next = next_non_space(code, end);
        if matches!(next, Some('(') | Some('.') | Some(':')) {
            continue;
        }
        let prev = prev_non_space(code, pos);
        let prev_word = idx
            .checked_sub(1)
            .map(|p| found[p])
            .filter(|(p, w)| code[p + w.len()..pos].trim().is_empty())
            .map(|(_, w)| w);

        let in_type = match prev {
            Some(':') | Some('<') | Some('|') | Some('&') => true,
            Some(',') => matches!(next, Some('>') | Some(']') | Some('|') | Some('&')),
            Some('=') => type_alias,
            _ => matches!(prev_word, Some("as") | Some("extends") | Some("keyof")),
        };
        if in_type {
            spans.push(pos..end);
        }
    }
    spans
}

/// Byte ranges of `console.<method>(` calls
pub fn console_calls(code: &str) -> Vec<Range<usize>> {
    console_regex().find_iter(code).map(|m| m.range()).collect()
}

/// Kind of overly loose type annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LooseType {
    /// `Object`, `object` or `{}`
    Object,
    /// `Function`
    Function,
}

impl LooseType {
    /// Structural replacement for the loose type
    pub fn narrowed(&self) -> &'static str {
        match self {
            Self::Object => "Record<string, unknown>",
            Self::Function => "((...args: unknown[]) => unknown)",
        }
    }
}

/// Loose type annotations with the byte range of the type itself
pub fn loose_types(code: &str) -> Vec<(Range<usize>, LooseType)> {
    let mut found = Vec::new();
    for caps in loose_type_regex().captures_iter(code) {
        let Some(colon) = caps.get(0).map(|m| m.start()) else {
            continue;
        };
        if !is_annotation_colon(code, colon) {
            continue;
        }
        if let Some(word) = caps.get(1) {
            if matches!(next_non_space(code, word.end()), Some('.') | Some('(')) {
                continue;
            }
            let kind = if word.as_str() == "Function" {
                LooseType::Function
            } else {
                LooseType::Object
            };
            found.push((word.range(), kind));
        } else if let Some(braces) = caps.get(2) {
            let next = next_non_space(code, braces.end());
            if matches!(next, None | Some('=') | Some(';') | Some(')') | Some('|') | Some('>')) {
                found.push((braces.range(), LooseType::Object));
            }
        }
    }
    found
}

/// Whether the `:` at `colon` starts a type annotation.
///
/// Colons closing a ternary branch or a `case` / `default` label are not
/// annotations. `name?: T` is.
fn is_annotation_colon(code: &str, colon: usize) -> bool {
    let before = &code[..colon];
    let label = before.trim();
    if (label.starts_with("case ") && !label.contains(':')) || label == "default" {
        return false;
    }

    let bytes = before.as_bytes();
    let mut depth = 0usize;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b')' | b']' | b'}' => depth += 1,
            b'(' | b'[' | b'{' => {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            }
            b';' | b',' if depth == 0 => return true,
            b'?' if depth == 0 => {
                let chained = matches!(bytes.get(i + 1), Some(b'.') | Some(b'?'))
                    || (i > 0 && bytes[i - 1] == b'?');
                if chained {
                    continue;
                }
                return before[i + 1..].trim().is_empty();
            }
            _ => {}
        }
    }
    true
}

/// Whether a line tests a value: a branch, an early exit, a short-circuit
/// or a ternary
fn is_condition(code: &str) -> bool {
    ["if", "while", "return", "throw"]
        .iter()
        .any(|word| crate::lexer::has_word(code, word))
        || code.contains("&&")
        || code.contains("||")
        || has_ternary(code)
}

fn has_ternary(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'?'
            && !matches!(bytes.get(i + 1), Some(b'.') | Some(b'?') | Some(b':'))
            && (i == 0 || bytes[i - 1] != b'?')
    })
}

/// A `.data` / `.error` access on a result-like receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultAccess {
    /// Receiver identifier
    pub receiver: String,
    /// Accessed property (`data` or `error`)
    pub property: String,
    /// Byte range of `receiver.property`
    pub range: Range<usize>,
}

fn is_result_like(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "res"
        || lower.ends_with("result")
        || lower.ends_with("response")
        || lower.ends_with("outcome")
}

/// `.data` / `.error` accesses on result-like receivers
pub fn result_accesses(code: &str) -> Vec<ResultAccess> {
    result_access_regex()
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let receiver = caps.get(1)?.as_str();
            if !is_result_like(receiver) || prev_char(code, whole.start()) == Some('.') {
                return None;
            }
            Some(ResultAccess {
                receiver: receiver.to_string(),
                property: caps.get(2)?.as_str().to_string(),
                range: whole.range(),
            })
        })
        .collect()
}

fn prev_char(code: &str, before: usize) -> Option<char> {
    code[..before].chars().next_back()
}

fn mentions_member(code: &str, receiver: &str, member: &str) -> bool {
    let needle = format!("{receiver}.{member}");
    code.match_indices(&needle).any(|(pos, _)| {
        let before_ok = prev_char(code, pos)
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'));
        let after_ok = code[pos + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'));
        before_ok && after_ok
    })
}

/// Whether `receiver` was checked within `window` (preceding lines plus the
/// access line itself).
///
/// An outcome property (`success`, `ok`, `isOk`, ...) counts only where it is
/// tested, as does an `if` condition that tests `.data` or `.error`. Merely
/// reading the outcome, as in `console.log(result.success)`, is no check.
pub fn result_checked<'a>(window: impl IntoIterator<Item = &'a str>, receiver: &str) -> bool {
    window.into_iter().any(|code| {
        (RESULT_GUARDS
            .iter()
            .any(|guard| mentions_member(code, receiver, guard))
            && is_condition(code))
            || (crate::lexer::has_word(code, "if")
                && (mentions_member(code, receiver, "data")
                    || mentions_member(code, receiver, "error")))
    })
}

/// An unguarded member chain such as `a.b.c` or `items[0].name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChain {
    /// Root identifier
    pub root: String,
    /// Byte range of the whole chain
    pub range: Range<usize>,
    /// Byte offsets of every member access after the first (`.` or `[`)
    pub accessors: Vec<usize>,
}

/// Deep or subscripted member chains that are not already optional
pub fn property_chains(code: &str) -> Vec<PropertyChain> {
    let mut chains = Vec::new();
    for m in chain_regex().find_iter(code) {
        if matches!(prev_char(code, m.start()), Some('.') | Some('?')) {
            continue;
        }
        if next_non_space(code, m.end()) == Some('(') || code[m.end()..].starts_with("?.") {
            continue;
        }
        let text = m.as_str();
        let root_len = text
            .find(|c: char| c == '.' || c == '[')
            .unwrap_or(text.len());
        let root = &text[..root_len];
        if SAFE_ROOTS.contains(&root) || root.starts_with(|c: char| c.is_ascii_uppercase()) {
            continue;
        }

        let mut accessors = Vec::new();
        let mut properties = 0;
        let mut saw_subscript = false;
        let mut subscript_then_property = false;
        let mut depth = 0;
        for (offset, c) in text.char_indices().skip(root_len) {
            match c {
                '[' => {
                    if depth == 0 {
                        accessors.push(m.start() + offset);
                        saw_subscript = true;
                    }
                    depth += 1;
                }
                ']' => depth -= 1,
                '.' if depth == 0 => {
                    accessors.push(m.start() + offset);
                    properties += 1;
                    if saw_subscript {
                        subscript_then_property = true;
                    }
                }
                _ => {}
            }
        }

        if properties >= 2 || subscript_then_property {
            accessors.remove(0);
            chains.push(PropertyChain {
                root: root.to_string(),
                range: m.range(),
                accessors,
            });
        }
    }
    chains
}

/// Whether `root` is null-checked on the access line or just above it.
///
/// `window` holds the preceding lines; `line` is the access line.
pub fn chain_guarded<'a>(window: impl IntoIterator<Item = &'a str>, line: &str, root: &str) -> bool {
    let inline = [
        format!("{root} &&"),
        format!("{root}?."),
        format!("{root} ??"),
        format!("{root} != null"),
        format!("{root} !== null"),
        format!("{root} !== undefined"),
    ];
    if inline.iter().any(|guard| line.contains(guard.as_str())) {
        return true;
    }
    window
        .into_iter()
        .any(|code| crate::lexer::has_word(code, "if") && crate::lexer::has_word(code, root))
}

/// An exported declaration found on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDeclaration {
    /// Declaration keyword (`function`, `class`, `const`, ...)
    pub keyword: String,
    /// Declared identifier, absent for anonymous default exports
    pub name: Option<String>,
}

impl ExportedDeclaration {
    /// Whether the declaration introduces a callable
    pub fn is_function(&self, code: &str) -> bool {
        self.keyword == "function"
            || (matches!(self.keyword.as_str(), "const" | "let" | "var")
                && (code.contains("=>") || crate::lexer::has_word(code, "function")))
    }
}

/// Parses an exported declaration from a code view
pub fn exported_declaration(code: &str) -> Option<ExportedDeclaration> {
    let caps = export_regex().captures(code)?;
    Some(ExportedDeclaration {
        keyword: caps.get(1)?.as_str().to_string(),
        name: caps.get(2).map(|m| m.as_str().to_string()),
    })
}

/// Whether a raw line belongs to a documentation comment
pub fn is_doc_line(raw: &str) -> bool {
    let trimmed = raw.trim_start();
    trimmed.starts_with("/**") || trimmed.starts_with('*')
}
