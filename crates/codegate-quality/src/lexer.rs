//! Line-oriented source scanner
//!
//! Every heuristic in this crate works on a *code view* of each line: string
//! literal contents and comments are replaced by spaces so that keywords or
//! punctuation inside them never match. Byte offsets are preserved, so a
//! position found in the code view is valid in the raw line as well.
//!
//! The scanner tracks block comments and template literals across lines.
//! Regular-expression literals are not recognized and are scanned as code.

/// Classification of a scanned line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Only whitespace
    Blank,
    /// Only comment text
    Comment,
    /// Contains code or string literal content
    Code,
}

/// One line of source with its code view
#[derive(Debug, Clone)]
pub struct SourceLine<'a> {
    /// Zero-based line index
    pub index: usize,
    /// The line exactly as written (without the line terminator)
    pub raw: &'a str,
    /// The line with strings and comments blanked, same byte length as `raw`
    pub code: String,
    /// Concatenated comment text found on this line
    pub comment: String,
    /// Line classification
    pub kind: LineKind,
    /// Whether a block comment or template literal is still open at line end
    pub ends_open: bool,
}

impl SourceLine<'_> {
    /// One-based line number
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Whether the line holds code
    pub fn is_code(&self) -> bool {
        self.kind == LineKind::Code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    BlockComment,
    Template,
}

/// Scans `text` into lines with code views.
pub fn scan(text: &str) -> Vec<SourceLine<'_>> {
    let mut state = State::Normal;
    text.lines()
        .enumerate()
        .map(|(index, raw)| scan_line(index, raw, &mut state))
        .collect()
}

fn blank(out: &mut String, c: char) {
    for _ in 0..c.len_utf8() {
        out.push(' ');
    }
}

fn scan_line<'a>(index: usize, raw: &'a str, state: &mut State) -> SourceLine<'a> {
    let chars: Vec<char> = raw.chars().collect();
    let mut code = String::with_capacity(raw.len());
    let mut comment = String::new();
    let mut has_code = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match *state {
            State::BlockComment => {
                comment.push(c);
                if c == '*' && next == Some('/') {
                    comment.push('/');
                    code.push_str("  ");
                    *state = State::Normal;
                    i += 2;
                    continue;
                }
                blank(&mut code, c);
            }
            State::Template => {
                has_code = true;
                if c == '\\' {
                    blank(&mut code, c);
                    if let Some(escaped) = next {
                        blank(&mut code, escaped);
                        i += 2;
                        continue;
                    }
                } else if c == '`' {
                    code.push('`');
                    *state = State::Normal;
                } else {
                    blank(&mut code, c);
                }
            }
            State::Normal => {
                if c == '/' && next == Some('/') {
                    for &rest in &chars[i..] {
                        comment.push(rest);
                        blank(&mut code, rest);
                    }
                    break;
                }
                if c == '/' && next == Some('*') {
                    comment.push_str("/*");
                    code.push_str("  ");
                    *state = State::BlockComment;
                    i += 2;
                    continue;
                }
                if c == '\'' || c == '"' {
                    has_code = true;
                    code.push(c);
                    i += 1;
                    while i < chars.len() {
                        let s = chars[i];
                        if s == '\\' {
                            blank(&mut code, s);
                            if let Some(&escaped) = chars.get(i + 1) {
                                blank(&mut code, escaped);
                                i += 1;
                            }
                        } else if s == c {
                            code.push(c);
                            break;
                        } else {
                            blank(&mut code, s);
                        }
                        i += 1;
                    }
                    i += 1;
                    continue;
                }
                if c == '`' {
                    has_code = true;
                    code.push('`');
                    *state = State::Template;
                    i += 1;
                    continue;
                }
                if !c.is_whitespace() {
                    has_code = true;
                }
                code.push(c);
            }
        }
        i += 1;
    }

    let kind = if raw.trim().is_empty() {
        LineKind::Blank
    } else if has_code {
        LineKind::Code
    } else {
        LineKind::Comment
    };

    SourceLine {
        index,
        raw,
        code,
        comment,
        kind,
        ends_open: *state != State::Normal,
    }
}

/// Returns identifier-like words in `code` with their byte offsets.
pub fn words(code: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (pos, c) in code.char_indices() {
        let ident = c.is_ascii_alphanumeric() || c == '_' || c == '$';
        match (start, ident) {
            (None, true) => start = Some(pos),
            (Some(s), false) => {
                out.push((s, &code[s..pos]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &code[s..]));
    }
    out
}

/// Whether `word` occurs in `code` as a whole identifier
pub fn has_word(code: &str, word: &str) -> bool {
    words(code).iter().any(|(_, w)| *w == word)
}

/// Counts whole-identifier occurrences of `word` in `code`
pub fn count_word(code: &str, word: &str) -> usize {
    words(code).iter().filter(|(_, w)| *w == word).count()
}

/// Splits `s` on `sep` at bracket depth zero.
///
/// Parentheses, brackets, braces and angle brackets all nest; the `>` of an
/// arrow `=>` does not close an angle bracket.
pub fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut last = 0;
    let mut prev = '\0';
    for (pos, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '>' if prev != '=' => depth -= 1,
            _ if c == sep && depth <= 0 => {
                parts.push(&s[last..pos]);
                last = pos + c.len_utf8();
            }
            _ => {}
        }
        prev = c;
    }
    parts.push(&s[last..]);
    parts
}

/// Keywords that may stand alone on a structural line
const STRUCTURAL_WORDS: &[&str] = &[
    "else", "return", "break", "continue", "default", "try", "finally", "do",
];

/// Whether a trimmed code line carries no content of its own.
///
/// Punctuation-only lines (`}`, `});`) and lone keywords (`} else {`,
/// `return;`) repeat naturally in any file with more than one block.
pub fn is_structural(trimmed: &str) -> bool {
    let found = words(trimmed);
    match found.as_slice() {
        [] => true,
        [(_, word)] => STRUCTURAL_WORDS.contains(word),
        _ => false,
    }
}

/// Leading whitespace of a line
pub fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Net `{`/`}` balance of a code view
pub fn brace_delta(code: &str) -> i32 {
    code.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_are_blanked() {
        let lines = scan(r#"const s = "if (x) { return; }";"#);
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].code.contains("if"));
        assert!(lines[0].code.contains("\"") && lines[0].code.contains("const s"));
        assert_eq!(lines[0].code.len(), lines[0].raw.len());
    }

    #[test]
    fn test_line_comment_is_captured() {
        let lines = scan("let a = 1; // eslint-disable-line");
        assert_eq!(lines[0].kind, LineKind::Code);
        assert!(lines[0].comment.contains("eslint-disable-line"));
        assert!(!lines[0].code.contains("eslint"));
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let lines = scan("/**\n * if while\n */\nfunction f() {}");
        assert_eq!(lines[0].kind, LineKind::Comment);
        assert_eq!(lines[1].kind, LineKind::Comment);
        assert_eq!(lines[2].kind, LineKind::Comment);
        assert_eq!(lines[3].kind, LineKind::Code);
        assert!(!has_word(&lines[1].code, "if"));
        assert!(lines[0].ends_open && !lines[2].ends_open);
    }

    #[test]
    fn test_template_literal_spans_lines() {
        let lines = scan("const t = `line one\nif (x) {\n`;\nif (y) {}");
        assert!(!has_word(&lines[1].code, "if"));
        assert_eq!(lines[1].kind, LineKind::Code);
        assert!(has_word(&lines[3].code, "if"));
    }

    #[test]
    fn test_multibyte_characters_keep_offsets() {
        let lines = scan("const s = 'héllo'; // ünïcode");
        assert_eq!(lines[0].code.len(), lines[0].raw.len());
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let lines = scan(r#"const s = 'it\'s'; if (a) {}"#);
        assert!(has_word(&lines[0].code, "if"));
    }

    #[test]
    fn test_words_and_counts() {
        assert_eq!(count_word("if (a) { if (b) {} } iffy", "if"), 2);
        let found = words("foo.bar_baz($x)");
        assert_eq!(found, vec![(0, "foo"), (4, "bar_baz"), (12, "$x")]);
    }

    #[test]
    fn test_split_top_level() {
        let parts = split_top_level("a: Map<string, number>, b: (x: number, y) => void, c", ',');
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].trim(), "b: (x: number, y) => void");
    }

    #[test]
    fn test_structural_lines() {
        assert!(is_structural("});"));
        assert!(is_structural("} else {"));
        assert!(is_structural("return;"));
        assert!(!is_structural("return value;"));
        assert!(!is_structural("console.log(x);"));
    }

    #[test]
    fn test_empty_input() {
        assert!(scan("").is_empty());
    }
}
