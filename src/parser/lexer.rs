//! Primitive scanning helpers shared by the statement classifier: indent
//! measurement, comment stripping, and quote/paren-aware character search.

/// Tabs count as 4 columns, spaces as 1; indent level is the floor of
/// total columns divided by 4. Returns `(indent_level, rest)` where `rest`
/// is the line with its leading whitespace run removed.
pub fn count_indent(line: &str) -> (usize, &str) {
    let mut columns = 0usize;
    let mut byte_idx = 0usize;
    for c in line.chars() {
        match c {
            ' ' => {
                columns += 1;
                byte_idx += 1;
            }
            '\t' => {
                columns += 4;
                byte_idx += 1;
            }
            _ => break,
        }
    }
    (columns / 4, &line[byte_idx..])
}

pub fn is_empty_or_comment(trimmed: &str) -> bool {
    let t = trimmed.trim_start();
    t.is_empty() || t.starts_with(';') || t.starts_with("//")
}

/// Strips a trailing comment (`;` or `//`) that starts outside a
/// double-quoted string. Single quotes are not tracked here, matching the
/// reference parser's comment stripper.
pub fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_dquote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_dquote = !in_dquote,
            b';' if !in_dquote => return &line[..i],
            b'/' if !in_dquote && i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                return &line[..i]
            }
            _ => {}
        }
        i += 1;
    }
    line
}

/// Finds the first occurrence of any of `targets` outside both single- and
/// double-quoted runs. Returns the byte offset.
pub fn find_unquoted_char(s: &str, targets: &[char]) -> Option<usize> {
    let mut in_quote: Option<char> = None;
    for (idx, c) in s.char_indices() {
        match in_quote {
            Some(q) => {
                if c == q {
                    in_quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    in_quote = Some(c);
                } else if targets.contains(&c) {
                    return Some(idx);
                }
            }
        }
    }
    None
}

/// Finds the index (byte offset) of the `)` matching the `(` at
/// `open_idx`, respecting nested parens and quoted runs.
pub fn find_matching_paren(s: &str, open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    for (idx, c) in s.char_indices().skip(open_idx) {
        match in_quote {
            Some(q) => {
                if c == q {
                    in_quote = None;
                }
            }
            None => match c {
                '"' | '\'' => in_quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Splits `s` on commas at depth 0, outside quotes. Nested parens/brackets
/// are preserved literally inside a single element.
pub fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    let mut last_idx = 0usize;
    for (idx, c) in s.char_indices() {
        last_idx = idx + c.len_utf8();
        match in_quote {
            Some(q) => {
                if c == q {
                    in_quote = None;
                }
            }
            None => match c {
                '"' | '\'' => in_quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(s[start..idx].trim().to_string());
                    start = idx + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(s[start..last_idx.max(start)].trim().to_string());
    parts
}

/// True if `s` is a single identifier, optionally followed by
/// `[index-expr]`, i.e. the left-hand side shape `VarAssign`/`IndexAssign`
/// require.
pub fn is_single_identifier_before_eq(s: &str) -> bool {
    let s = s.trim();
    let ident_end = s
        .char_indices()
        .take_while(|(i, c)| {
            if *i == 0 {
                c.is_ascii_alphabetic() || *c == '_'
            } else {
                c.is_ascii_alphanumeric() || *c == '_'
            }
        })
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    if ident_end == 0 {
        return false;
    }
    let rest = &s[ident_end..];
    rest.is_empty() || (rest.starts_with('[') && rest.ends_with(']'))
}
