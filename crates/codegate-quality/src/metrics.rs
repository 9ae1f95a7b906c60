//! Function-level metrics extraction
//!
//! Finds function-like declarations in raw source text and measures each one:
//! - named `function` statements (including `export`, `async`, generators)
//! - `const`/`let`/`var`, field and dotted assignments of function
//!   expressions or arrow functions
//! - class and object-literal methods
//!
//! Extraction never fails. Malformed input yields fewer records, empty input
//! yields none. Nested functions get their own record while the enclosing
//! function's span still covers their lines.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::{
    lexer::{count_word, has_word, scan, split_top_level, LineKind, SourceLine},
    models::{FunctionRecord, Parameter},
};

/// Lines a declaration header (parameters and return type) may span
const HEADER_LINES: usize = 20;

/// Body lines inspected for a guard clause
const EARLY_VALIDATION_WINDOW: usize = 5;

/// Tokens counted as branches
const BRANCH_WORDS: &[&str] = &["if", "for", "while", "case"];

/// Identifiers that look like method names but open control flow
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "else", "do", "try",
    "new", "typeof", "await", "yield", "super", "import",
];

/// Parameter modifiers stripped before reading the name
const PARAMETER_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

fn function_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^(]*>)?\s*\(",
        )
        .expect("Invalid regex")
    })
}

fn assignment_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"^\s*(?:export\s+)?(?:(?:const|let|var)\s+([A-Za-z_$][\w$]*)|([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)+)|(?:(?:public|private|protected|static|readonly)\s+)*([A-Za-z_$][\w$]*))\s*(?::[^=]+)?=\s*(?:async\s+)?(function\b\s*\*?\s*(?:[A-Za-z_$][\w$]*)?\s*)?(?:<[^(=]*>\s*)?\(",
        )
        .expect("Invalid regex")
    })
}

fn method_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(?:public|private|protected|static|async|override|get|set)\s+)*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^(]*>)?\s*\(",
        )
        .expect("Invalid regex")
    })
}

fn constant_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"^\s*(?:export\s+)?const\s+[A-Za-z_$][\w$]*\s*(?::[^=]+)?=\s*-?[\d_.xXa-fA-F]+\s*;?\s*$",
        )
        .expect("Invalid regex")
    })
}

fn number_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b(?:0[xX][0-9a-fA-F_]+|\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?)\b")
            .expect("Invalid regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    /// `function` keyword: block body, no arrow
    Function,
    /// Arrow function: `=>` required
    Arrow,
    /// Method shorthand: block body, no arrow
    Method,
}

#[derive(Debug)]
struct Declaration {
    name: String,
    line: usize,
    paren: usize,
    kind: DeclKind,
}

#[derive(Debug, Clone, Copy)]
enum Body {
    Block { line: usize, col: usize },
    Expression { line: usize, col: usize },
}

#[derive(Debug)]
struct Header {
    params: String,
    return_type: Option<String>,
    body: Body,
}

/// Extracts function records from source text
pub struct MetricsExtractor;

impl MetricsExtractor {
    /// Extracts one record per function-like declaration in `source`
    pub fn extract(source: &str) -> Vec<FunctionRecord> {
        let lines = scan(source);
        Self::extract_lines(&lines)
    }

    /// Extracts records from already-scanned lines
    pub fn extract_lines(lines: &[SourceLine<'_>]) -> Vec<FunctionRecord> {
        let records: Vec<FunctionRecord> = lines
            .iter()
            .filter(|line| line.is_code())
            .filter_map(|line| find_declaration(line))
            .filter_map(|decl| measure(lines, &decl))
            .collect();
        debug!("Extracted {} function records", records.len());
        records
    }
}

fn find_declaration(line: &SourceLine<'_>) -> Option<Declaration> {
    let code = line.code.as_str();

    if let Some(caps) = function_regex().captures(code) {
        let whole = caps.get(0)?;
        return Some(Declaration {
            name: caps.get(1)?.as_str().to_string(),
            line: line.index,
            paren: whole.end() - 1,
            kind: DeclKind::Function,
        });
    }

    if let Some(caps) = assignment_regex().captures(code) {
        let whole = caps.get(0)?;
        let name = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
        if !CONTROL_KEYWORDS.contains(&name.as_str()) {
            let kind = if caps.get(4).is_some() {
                DeclKind::Function
            } else {
                DeclKind::Arrow
            };
            return Some(Declaration {
                name: name.as_str().to_string(),
                line: line.index,
                paren: whole.end() - 1,
                kind,
            });
        }
    }

    let caps = method_regex().captures(code)?;
    let whole = caps.get(0)?;
    let name = caps.get(1)?.as_str();
    if CONTROL_KEYWORDS.contains(&name) {
        return None;
    }
    Some(Declaration {
        name: name.to_string(),
        line: line.index,
        paren: whole.end() - 1,
        kind: DeclKind::Method,
    })
}

/// Characters of the code views from `(line, col)` onward, with a `'\n'`
/// marker at the end of every line.
fn chars_from<'a>(
    lines: &'a [SourceLine<'_>],
    line: usize,
    col: usize,
    max_lines: usize,
) -> impl Iterator<Item = (usize, usize, char)> + 'a {
    let last = line.saturating_add(max_lines).min(lines.len());
    (line..last).flat_map(move |l| {
        let code: &'a str = lines[l].code.as_str();
        let start = if l == line { col.min(code.len()) } else { 0 };
        code[start..]
            .char_indices()
            .map(move |(i, ch)| (l, start + i, ch))
            .chain(std::iter::once((l, code.len(), '\n')))
    })
}

fn parse_header(lines: &[SourceLine<'_>], decl: &Declaration) -> Option<Header> {
    let mut chars = chars_from(lines, decl.line, decl.paren, HEADER_LINES);

    let mut params = String::new();
    let mut depth = 0i32;
    let mut closed = false;
    for (_, _, ch) in chars.by_ref() {
        match ch {
            '(' => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    closed = true;
                    break;
                }
            }
            _ => {}
        }
        params.push(if ch == '\n' { ' ' } else { ch });
    }
    if !closed {
        return None;
    }

    let mut return_type = String::new();
    let mut in_return = false;
    let mut depth = 0i32;
    let mut prev = '\0';
    while let Some((l, c, ch)) = chars.next() {
        if !in_return {
            if ch.is_whitespace() {
                continue;
            }
            if ch == ':' && prev == '\0' {
                in_return = true;
                prev = ch;
                continue;
            }
        }

        if depth == 0 {
            let typed = !return_type.trim().is_empty();
            if ch == '{' && (!in_return || typed) {
                return match decl.kind {
                    DeclKind::Arrow => None,
                    _ => Some(Header {
                        params,
                        return_type: in_return.then(|| return_type.trim().to_string()),
                        body: Body::Block { line: l, col: c },
                    }),
                };
            }
            if ch == '>' && prev == '=' && !(in_return && decl.kind != DeclKind::Arrow) {
                if decl.kind != DeclKind::Arrow {
                    return None;
                }
                if in_return {
                    return_type.pop();
                }
                let body = match chars.find(|(_, _, next)| !next.is_whitespace()) {
                    Some((bl, bc, '{')) => Body::Block { line: bl, col: bc },
                    Some((bl, bc, _)) => Body::Expression { line: bl, col: bc },
                    None => Body::Expression { line: l, col: c },
                };
                return Some(Header {
                    params,
                    return_type: in_return.then(|| return_type.trim().to_string()),
                    body,
                });
            }
            if ch == ';' || ch == ',' || ch == ')' || ch == '}' {
                return None;
            }
            if !in_return && ch != '=' {
                return None;
            }
        }

        if in_return {
            match ch {
                '(' | '[' | '{' | '<' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                '>' if prev != '=' => depth -= 1,
                _ => {}
            }
            return_type.push(if ch == '\n' { ' ' } else { ch });
        }
        prev = ch;
    }
    None
}

fn block_end(lines: &[SourceLine<'_>], line: usize, col: usize) -> usize {
    let mut depth = 0i32;
    for (l, _, ch) in chars_from(lines, line, col, usize::MAX) {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return l;
                }
            }
            _ => {}
        }
    }
    lines.len().saturating_sub(1)
}

fn expression_end(lines: &[SourceLine<'_>], line: usize, col: usize) -> usize {
    let mut depth = 0i32;
    for (l, _, ch) in chars_from(lines, line, col, usize::MAX) {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return l;
                }
            }
            ';' if depth == 0 => return l,
            '\n' if depth <= 0 => return l,
            _ => {}
        }
    }
    lines.len().saturating_sub(1)
}

fn parse_parameters(text: &str) -> Vec<Parameter> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    split_top_level(text, ',')
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let mut entry = part.trim();
            loop {
                let stripped = PARAMETER_MODIFIERS.iter().find_map(|m| {
                    entry
                        .strip_prefix(m)
                        .filter(|rest| rest.starts_with(char::is_whitespace))
                });
                match stripped {
                    Some(rest) => entry = rest.trim_start(),
                    None => break,
                }
            }
            let entry = strip_default(entry.trim_start_matches("..."));
            let mut pieces = split_top_level(entry, ':').into_iter();
            let name = pieces.next().unwrap_or_default().trim().trim_end_matches('?').trim();
            let ty = pieces
                .collect::<Vec<_>>()
                .join(":")
                .trim()
                .to_string();
            Parameter {
                name: name.to_string(),
                ty: (!ty.is_empty()).then_some(ty),
            }
        })
        .collect()
}

/// Drops a `= default` initializer, leaving arrow types intact
fn strip_default(entry: &str) -> &str {
    let bytes = entry.as_bytes();
    let mut depth = 0i32;
    for (pos, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if pos > 0 && bytes[pos - 1] != b'=' => depth -= 1,
            b'=' if depth <= 0 && bytes.get(pos + 1) != Some(&b'>') => {
                return &entry[..pos];
            }
            _ => {}
        }
    }
    entry
}

fn body_lines<'a>(lines: &'a [SourceLine<'_>], body: Body, end: usize) -> Vec<&'a str> {
    let Body::Block { line, col } = body else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let first = &lines[line].code[(col + 1).min(lines[line].code.len())..];
    if !first.trim().is_empty() {
        out.push(first);
    }
    out.extend(
        lines[(line + 1).min(end + 1)..=end]
            .iter()
            .filter(|l| l.is_code())
            .map(|l| l.code.as_str()),
    );
    out
}

fn has_guard_clause(body: &[&str]) -> bool {
    let window = &body[..body.len().min(EARLY_VALIDATION_WINDOW)];
    let exits = |code: &str| has_word(code, "return") || has_word(code, "throw");
    window.iter().enumerate().any(|(i, code)| {
        has_word(code, "if") && (exits(code) || window.get(i + 1).is_some_and(|next| exits(next)))
    })
}

fn is_magic(literal: &str) -> bool {
    let cleaned = literal.replace('_', "");
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).map_or(true, |v| v > 1);
    }
    cleaned.parse::<f64>().map_or(true, |v| v != 0.0 && v != 1.0)
}

fn measure(lines: &[SourceLine<'_>], decl: &Declaration) -> Option<FunctionRecord> {
    let header = parse_header(lines, decl)?;
    let end = match header.body {
        Body::Block { line, col } => block_end(lines, line, col),
        Body::Expression { line, col } => expression_end(lines, line, col),
    };
    let span = &lines[decl.line..=end.max(decl.line)];

    let line_count = span.iter().filter(|l| l.kind != LineKind::Blank).count();
    let branches: usize = span
        .iter()
        .map(|l| {
            BRANCH_WORDS.iter().map(|w| count_word(&l.code, w)).sum::<usize>()
                + l.code.matches("&&").count()
                + l.code.matches("||").count()
        })
        .sum();

    let parameters = parse_parameters(&header.params);
    let return_type = header.return_type.filter(|t| !t.is_empty());
    let uses_any_type = parameters
        .iter()
        .filter_map(|p| p.ty.as_deref())
        .chain(return_type.as_deref())
        .any(|ty| has_word(ty, "any"));

    let uses_magic_number = span.iter().filter(|l| l.is_code()).any(|l| {
        !constant_regex().is_match(&l.code)
            && number_regex().find_iter(&l.code).any(|m| {
                let before = l.code[..m.start()].chars().next_back();
                !matches!(before, Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '$')
                    && is_magic(m.as_str())
            })
    });

    Some(FunctionRecord {
        name: decl.name.clone(),
        line_span: (decl.line + 1, end.max(decl.line) + 1),
        line_count,
        complexity: 1 + branches,
        has_early_validation: has_guard_clause(&body_lines(lines, header.body, end)),
        parameters,
        return_type,
        uses_any_type,
        uses_magic_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_has_no_functions() {
        assert!(MetricsExtractor::extract("").is_empty());
        assert!(MetricsExtractor::extract("const x = 1;\nlet y = x + 2;").is_empty());
    }

    #[test]
    fn test_named_function_statement() {
        let source = "export function add(a: number, b: number): number {\n  return a + b;\n}\n";
        let records = MetricsExtractor::extract(source);
        assert_eq!(records.len(), 1);
        let f = &records[0];
        assert_eq!(f.name, "add");
        assert_eq!(f.line_span, (1, 3));
        assert_eq!(f.line_count, 3);
        assert_eq!(f.complexity, 1);
        assert_eq!(f.parameters.len(), 2);
        assert_eq!(f.parameters[1].name, "b");
        assert_eq!(f.parameters[1].ty.as_deref(), Some("number"));
        assert_eq!(f.return_type.as_deref(), Some("number"));
        assert!(!f.uses_any_type);
        assert!(!f.uses_magic_number);
    }

    #[test]
    fn test_arrow_and_function_expression_assignments() {
        let source = "const double = (x: number) => x * 2;\n\
                      export const load = async (id: string): Promise<User> => {\n  return fetchUser(id);\n};\n\
                      handlers.onClick = function (event) {\n  return event;\n};";
        let records = MetricsExtractor::extract(source);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["double", "load", "handlers.onClick"]);
        assert_eq!(records[0].line_span, (1, 1));
        assert!(records[0].uses_magic_number);
        assert_eq!(records[1].return_type.as_deref(), Some("Promise<User>"));
        assert_eq!(records[1].line_span, (2, 4));
        assert_eq!(records[2].line_span, (5, 7));
    }

    #[test]
    fn test_plain_assignments_are_not_functions() {
        let source = "const total = (a + b) * 2;\nresult = (x);\nconst items = [1, 2];";
        assert!(MetricsExtractor::extract(source).is_empty());
    }

    #[test]
    fn test_overload_signatures_are_skipped() {
        let source = "function parse(x: string): number;\nfunction parse(x: any): any {\n  return x;\n}";
        let records = MetricsExtractor::extract(source);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line_span, (2, 4));
        assert!(records[0].uses_any_type);
    }

    #[test]
    fn test_function_typed_return_annotation() {
        let source = "function factory(): (...args: unknown[]) => unknown {\n  return () => 0;\n}";
        let records = MetricsExtractor::extract(source);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].return_type.as_deref(), Some("(...args: unknown[]) => unknown"));
        assert_eq!(records[0].line_span, (1, 3));
    }

    #[test]
    fn test_parenthesized_function_type_annotations() {
        let source = "function factory(): ((...args: unknown[]) => unknown) {\n  return () => 0;\n}\nconst wrap = (cb: ((...args: unknown[]) => unknown)[]): ((...args: unknown[]) => unknown) => cb[0];";
        let records = MetricsExtractor::extract(source);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].return_type.as_deref(),
            Some("((...args: unknown[]) => unknown)")
        );
        assert_eq!(records[0].line_span, (1, 3));
        assert_eq!(records[1].name, "wrap");
        assert_eq!(records[1].parameters.len(), 1);
        assert_eq!(records[1].line_span, (4, 4));
    }

    #[test]
    fn test_methods_and_control_flow() {
        let source = "class Repo {\n  async find(id: string) {\n    if (!id) {\n      throw new Error('id');\n    }\n    for (const r of this.rows) {\n      if (r.id === id && r.live) return r;\n    }\n  }\n}";
        let records = MetricsExtractor::extract(source);
        assert_eq!(records.len(), 1);
        let find = &records[0];
        assert_eq!(find.name, "find");
        assert_eq!(find.line_span, (2, 9));
        // if, for, if, &&
        assert_eq!(find.complexity, 5);
        assert!(find.has_early_validation);
    }

    #[test]
    fn test_branch_tokens_in_strings_are_ignored() {
        let source = "function f() {\n  const s = 'if for while && ||';\n  return s;\n}";
        let records = MetricsExtractor::extract(source);
        assert_eq!(records[0].complexity, 1);
    }

    #[test]
    fn test_nested_functions_double_count_lines() {
        let source = "function outer() {\n  function inner() {\n    return 1;\n  }\n  return inner();\n}";
        let records = MetricsExtractor::extract(source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "outer");
        assert_eq!(records[0].line_count, 6);
        assert_eq!(records[1].name, "inner");
        assert_eq!(records[1].line_count, 3);
    }

    #[test]
    fn test_parameters_with_modifiers_defaults_and_rest() {
        let params = parse_parameters(
            "private readonly repo: Repo, limit = 10, opts?: Map<string, number>, ...rest: string[]",
        );
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["repo", "limit", "opts", "rest"]);
        assert_eq!(params[0].ty.as_deref(), Some("Repo"));
        assert_eq!(params[1].ty, None);
        assert_eq!(params[2].ty.as_deref(), Some("Map<string, number>"));
        assert_eq!(params[3].ty.as_deref(), Some("string[]"));

        let params = parse_parameters("cb: (x: number) => void = noop");
        assert_eq!(params[0].name, "cb");
        assert_eq!(params[0].ty.as_deref(), Some("(x: number) => void"));
    }

    #[test]
    fn test_magic_numbers() {
        let source = "const LIMIT = 50;\nfunction f(x: number) {\n  return x > LIMIT ? -1 : 0;\n}\nfunction g(x: number) {\n  return x * 42;\n}";
        let records = MetricsExtractor::extract(source);
        assert!(!records[0].uses_magic_number);
        assert!(records[1].uses_magic_number);
    }

    #[test]
    fn test_missing_early_validation() {
        let source = "function f(x: number) {\n  const y = x + 1;\n  return y;\n}";
        let records = MetricsExtractor::extract(source);
        assert!(!records[0].has_early_validation);
    }

    #[test]
    fn test_unbalanced_input_degrades() {
        let source = "function broken(a: string {\n  if (a) {\n";
        let _ = MetricsExtractor::extract(source);
        let source = "function open(a: string) {\n  if (a) {\n    return a;\n";
        let records = MetricsExtractor::extract(source);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line_span, (1, 3));
    }
}
