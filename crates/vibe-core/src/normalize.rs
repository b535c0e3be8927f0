//! Text normalization applied before anything is hashed.

use regex::Regex;
use std::sync::LazyLock;

/// `__main__.Node` style qualification left behind by some declaration producers.
static DUNDER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b__\w+__\.").expect("dunder prefix pattern is valid"));

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid"));

fn is_punct(ch: char) -> bool {
    matches!(
        ch,
        ',' | ':' | ';' | '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | '=' | '|' | '&' | '*'
            | '+' | '-' | '/' | '.' | '?' | '!'
    )
}

/// Normalize annotation or default-value text.
///
/// Strips dunder-qualified prefixes, drops whitespace next to punctuation,
/// collapses other whitespace runs to one space and writes exactly one space
/// after each comma. Quoted segments are copied untouched.
pub fn normalize_type_text(text: &str) -> String {
    let stripped = DUNDER_PREFIX.replace_all(text, "");
    let mut out = String::with_capacity(stripped.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    for ch in stripped.chars() {
        if let Some(q) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space {
            let prev_is_break = out.chars().last().map_or(true, |c| c == ' ' || is_punct(c));
            if !prev_is_break && !is_punct(ch) {
                out.push(' ');
            }
            pending_space = false;
        }

        if ch == ',' {
            // Re-emitted with a single trailing space below.
            while out.ends_with(' ') {
                out.pop();
            }
        }

        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        out.push(ch);
        if ch == ',' {
            out.push(' ');
        }
    }

    out.trim().to_string()
}

/// Identifiers mentioned in a piece of annotation text.
pub fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    IDENTIFIER.find_iter(text).map(|m| m.as_str())
}

/// True when `name` is an ASCII identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Clean a docstring the way documentation tools do.
///
/// The first line is stripped, the common indentation of the remaining
/// lines is removed, trailing whitespace is dropped and blank lines at
/// either end are discarded.
pub fn clean_docstring(doc: &str) -> String {
    let doc = doc.replace('\t', "    ");
    let mut lines: Vec<&str> = doc.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    cleaned.push(lines.remove(0).trim().to_string());
    for line in lines {
        if line.trim().is_empty() {
            cleaned.push(String::new());
        } else {
            let dedented = line.get(indent..).unwrap_or_else(|| line.trim_start());
            cleaned.push(dedented.trim_end().to_string());
        }
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_dunder_prefix() {
        assert_eq!(normalize_type_text("__main__.Node"), "Node");
        assert_eq!(normalize_type_text("list[__main__.Node]"), "list[Node]");
    }

    #[test]
    fn whitespace_is_canonical() {
        assert_eq!(normalize_type_text("Dict[ str ,int ]"), "Dict[str, int]");
        assert_eq!(normalize_type_text("  list [ int ]  "), "list[int]");
        assert_eq!(normalize_type_text("Dict[str,   int]"), "Dict[str, int]");
    }

    #[test]
    fn quoted_text_is_preserved() {
        assert_eq!(normalize_type_text("\"hello   world\""), "\"hello   world\"");
        assert_eq!(normalize_type_text("'a,b'"), "'a,b'");
    }

    #[test]
    fn words_keep_one_space() {
        assert_eq!(normalize_type_text("unsigned    long"), "unsigned long");
    }

    #[test]
    fn identifier_check() {
        assert!(is_identifier("fib"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn identifiers_in_annotation() {
        let found: Vec<&str> = identifiers("Dict[str, list[Node]]").collect();
        assert_eq!(found, vec!["Dict", "str", "list", "Node"]);
    }

    #[test]
    fn docstring_cleaning() {
        let doc = "\n    Return the nth Fibonacci number.\n\n    Uses iteration.\n    ";
        assert_eq!(
            clean_docstring(doc),
            "Return the nth Fibonacci number.\n\nUses iteration."
        );
    }

    #[test]
    fn docstring_single_line() {
        assert_eq!(clean_docstring("  Say hi.  "), "Say hi.");
        assert_eq!(clean_docstring(""), "");
    }
}
