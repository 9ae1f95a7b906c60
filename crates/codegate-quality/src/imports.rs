//! Import statement discovery

use std::sync::OnceLock;

use regex::Regex;

use crate::lexer::SourceLine;

/// Node.js built-in modules, sorted ahead of everything else
const NODE_BUILTINS: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "crypto", "dgram", "dns",
    "events", "fs", "fs/promises", "http", "http2", "https", "net", "os", "path", "perf_hooks",
    "process", "querystring", "readline", "stream", "string_decoder", "timers", "tls", "url",
    "util", "v8", "vm", "worker_threads", "zlib",
];

/// Upper bound on lines an import statement may span
const MAX_IMPORT_LINES: usize = 50;

/// One import statement, possibly spanning several lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Zero-based index of the first line
    pub start: usize,
    /// Zero-based index of the last line
    pub end: usize,
    /// Imported module path
    pub module: String,
}

impl ImportStatement {
    /// Whether the module is a Node.js built-in
    pub fn is_builtin(&self) -> bool {
        self.module.starts_with("node:") || NODE_BUILTINS.contains(&self.module.as_str())
    }

    /// Sort key: built-ins first, then by module path
    pub fn sort_key(&self) -> (bool, &str) {
        (!self.is_builtin(), self.module.as_str())
    }
}

/// Import scan result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportScan {
    /// Complete statements in source order
    pub statements: Vec<ImportStatement>,
    /// Zero-based start lines of statements whose module could not be found
    pub unterminated: Vec<usize>,
}

fn module_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?:\bfrom\s*|^\s*import\s*)['"]([^'"]+)['"]"#).expect("Invalid regex")
    })
}

fn starts_import(code: &str) -> bool {
    let trimmed = code.trim_start();
    match trimmed.strip_prefix("import") {
        Some(rest) => matches!(
            rest.chars().next(),
            Some(' ') | Some('\t') | Some('{') | Some('*') | Some('\'') | Some('"')
        ),
        None => false,
    }
}

/// Finds the top-level import statements of a scanned file
pub fn scan_imports(lines: &[SourceLine<'_>]) -> ImportScan {
    let mut scan = ImportScan::default();
    let mut i = 0;
    while i < lines.len() {
        if !lines[i].is_code() || !starts_import(&lines[i].code) {
            i += 1;
            continue;
        }
        let last = (i + MAX_IMPORT_LINES).min(lines.len());
        let mut found = None;
        for j in i..last {
            if j > i && lines[j].is_code() && starts_import(&lines[j].code) {
                break;
            }
            // quotes survive in the code view, so the path is read back from raw
            if let Some(m) = module_regex()
                .captures(&lines[j].code)
                .and_then(|caps| caps.get(1))
            {
                let module = lines[j].raw.get(m.range()).unwrap_or_default();
                found = Some((j, module.to_string()));
                break;
            }
        }
        match found {
            Some((end, module)) => {
                scan.statements.push(ImportStatement {
                    start: i,
                    end,
                    module,
                });
                i = end + 1;
            }
            None => {
                scan.unterminated.push(i);
                i += 1;
            }
        }
    }
    scan
}
