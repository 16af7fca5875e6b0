//! # List Quoting
//!
//! Every dump record is one line holding a whitespace-separated list of
//! fields. Fields that contain whitespace or list metacharacters are quoted
//! so the line splits back into exactly the fields that were written.
//!
//! ## Quoting Rules
//!
//! | Element | Written as |
//! |---------|------------|
//! | empty | `{}` |
//! | no metacharacters | as-is |
//! | balanced braces, no backslash, no line break | `{element}` |
//! | anything else | backslash-escaped |
//!
//! Line breaks are always escaped (`\n`, `\r`) so a record never spans two
//! lines.

use eyre::{bail, Result};

fn is_special(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '[' | ']' | '$' | '"' | ';' | '\\')
}

fn braces_balanced(s: &str) -> bool {
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Quotes one list element.
pub fn quote_element(s: &str) -> String {
    if s.is_empty() {
        return "{}".to_string();
    }
    if !s.chars().any(is_special) && !s.starts_with('#') {
        return s.to_string();
    }
    if braces_balanced(s) && !s.contains(['\\', '\n', '\r']) {
        return format!("{{{}}}", s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if is_special(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    if out.starts_with('#') {
        out.insert(0, '\\');
    }
    out
}

pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| quote_element(s.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        other => other,
    }
}

/// Splits a list into its elements, undoing [`quote_element`].
pub fn split_list(s: &str) -> Result<Vec<String>> {
    let mut items = Vec::new();
    let mut chars = s.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(first) = chars.next() else {
            return Ok(items);
        };
        let mut item = String::new();
        match first {
            '{' => {
                let mut depth = 1;
                loop {
                    match chars.next() {
                        None => bail!("unmatched open brace in list"),
                        Some('\\') => {
                            item.push('\\');
                            if let Some(c) = chars.next() {
                                item.push(c);
                            }
                        }
                        Some('{') => {
                            depth += 1;
                            item.push('{');
                        }
                        Some('}') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            item.push('}');
                        }
                        Some(c) => item.push(c),
                    }
                }
                if let Some(c) = chars.peek() {
                    if !c.is_whitespace() {
                        bail!("list element in braces followed by \"{}\" instead of space", c);
                    }
                }
            }
            '"' => loop {
                match chars.next() {
                    None => bail!("unmatched open quote in list"),
                    Some('\\') => match chars.next() {
                        Some(c) => item.push(unescape(c)),
                        None => bail!("list ends in a backslash"),
                    },
                    Some('"') => break,
                    Some(c) => item.push(c),
                }
            },
            first => {
                let mut next = Some(first);
                while let Some(c) = next {
                    if c.is_whitespace() {
                        break;
                    }
                    if c == '\\' {
                        match chars.next() {
                            Some(e) => item.push(unescape(e)),
                            None => bail!("list ends in a backslash"),
                        }
                    } else {
                        item.push(c);
                    }
                    next = chars.next();
                }
            }
        }
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_are_unquoted() {
        assert_eq!(quote_element("abc"), "abc");
        assert_eq!(join_list(&["a", "b c", ""]), "a {b c} {}");
    }

    #[test]
    fn unbalanced_braces_are_escaped() {
        let q = quote_element("a}b");
        assert_eq!(q, "a\\}b");
        assert_eq!(split_list(&q).unwrap(), vec!["a}b"]);
    }

    #[test]
    fn newlines_stay_on_one_line() {
        let q = quote_element("two\nlines");
        assert!(!q.contains('\n'));
        assert_eq!(split_list(&q).unwrap(), vec!["two\nlines"]);
    }

    #[test]
    fn awkward_elements_survive() {
        let items = [
            "",
            "x",
            "with space",
            "{nested {braces}}",
            "back\\slash",
            "#hash",
            "tab\there",
            "quote\"d",
            "$dollar [bracket]",
        ];
        let line = join_list(&items);
        assert_eq!(split_list(&line).unwrap(), items);
    }

    #[test]
    fn nested_list_field() {
        let tags = join_list(&["odd", "first row"]);
        let line = join_list(&["r", "0", "r1", tags.as_str()]);
        let fields = split_list(&line).unwrap();
        assert_eq!(split_list(&fields[3]).unwrap(), vec!["odd", "first row"]);
    }

    #[test]
    fn malformed_lists_fail() {
        assert!(split_list("{open").is_err());
        assert!(split_list("{a}b").is_err());
        assert!(split_list("\"open").is_err());
    }
}
