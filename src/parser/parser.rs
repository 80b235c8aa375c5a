//! Turns Mewofile lines into the flat `Statement` stream described by the
//! component design's per-line processing and classification rules.

use crate::ast::{Statement, StatementKind};
use crate::parser::lexer::{
    count_indent, find_matching_paren, find_unquoted_char, is_empty_or_comment,
    is_single_identifier_before_eq, split_top_level_commas, strip_comment,
};
use crate::parser::types::{ParseException, MAX_ATTR_PARAMS};
use crate::parser::ParseOutcome;

pub struct Parser {
    lines: Vec<String>,
    pos: usize,
    statements: Vec<Statement>,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self {
            lines: source.lines().map(|l| l.to_string()).collect(),
            pos: 0,
            statements: Vec::new(),
        }
    }

    pub fn parse(mut self) -> ParseOutcome {
        let mut error = None;
        while self.pos < self.lines.len() {
            let line_number = self.pos + 1;
            let raw = self.lines[self.pos].clone();
            self.pos += 1;
            if let Err(e) = self.process_line(&raw, line_number) {
                tracing::debug!(line = line_number, error = %e, "parse error");
                error = Some(e);
                break;
            }
        }
        ParseOutcome {
            statements: self.statements,
            error,
        }
    }

    fn process_line(&mut self, raw: &str, line_number: usize) -> Result<(), ParseException> {
        if is_empty_or_comment(raw) {
            return Ok(());
        }
        let stripped = strip_comment(raw);
        if is_empty_or_comment(stripped) {
            return Ok(());
        }
        let (indent, rest) = count_indent(stripped);
        let rest = rest.trim_end().to_string();
        if rest.is_empty() {
            return Ok(());
        }
        self.classify(indent, rest, line_number)
    }

    fn classify(
        &mut self,
        indent: usize,
        mut remainder: String,
        line_number: usize,
    ) -> Result<(), ParseException> {
        loop {
            if !remainder.starts_with('#') {
                break;
            }
            if remainder == "#else" {
                self.push(StatementKind::Else, indent, line_number);
                return Ok(());
            }
            if remainder == "#endif" {
                self.push(StatementKind::Endif, indent, line_number);
                return Ok(());
            }
            if let Some(cond_rest) = remainder.strip_prefix("#if(") {
                let close = find_matching_paren(&remainder, 3).ok_or_else(|| {
                    ParseException::new(line_number, "Unterminated #if condition")
                })?;
                let _ = cond_rest;
                let cond = remainder[4..close].to_string();
                let mut after = remainder[close + 1..].trim_start();
                if let Some(stripped) = after.strip_prefix(':') {
                    after = stripped.trim_start();
                }
                if !after.is_empty() {
                    return Err(ParseException::new(line_number, "Unexpected text after #if"));
                }
                self.push(
                    StatementKind::If {
                        raw_condition: cond,
                    },
                    indent,
                    line_number,
                );
                return Ok(());
            }

            match parse_attribute_prefix(&remainder, line_number)? {
                Some((name, params, after)) => {
                    self.push(StatementKind::Attr { name, params }, indent, line_number);
                    if after.is_empty() {
                        return Ok(());
                    }
                    remainder = after;
                    continue;
                }
                None => return Err(ParseException::new(line_number, "Unknown directive")),
            }
        }

        if indent == 0 {
            if let Some(idx) = find_unquoted_char(&remainder, &[':']) {
                let name = remainder[..idx].trim().to_string();
                let after = remainder[idx + 1..].trim();
                if !after.is_empty() {
                    return Err(ParseException::new(
                        line_number,
                        "Unexpected text after label",
                    ));
                }
                self.push(StatementKind::Label { name }, indent, line_number);
                return Ok(());
            }
        }

        if let Some(idx) = find_unquoted_char(&remainder, &['=']) {
            let lhs = remainder[..idx].trim();
            if is_single_identifier_before_eq(lhs) {
                let rhs = remainder[idx + 1..].trim().to_string();
                if let Some(bracket) = lhs.find('[') {
                    let name = lhs[..bracket].to_string();
                    let raw_index = lhs[bracket + 1..lhs.len() - 1].to_string();
                    self.push(
                        StatementKind::IndexAssign {
                            name,
                            raw_index,
                            raw_value: rhs,
                        },
                        indent,
                        line_number,
                    );
                } else {
                    self.push(
                        StatementKind::VarAssign {
                            name: lhs.to_string(),
                            raw_value: rhs,
                        },
                        indent,
                        line_number,
                    );
                }
                return Ok(());
            }
        }

        if let Some(target) = remainder.strip_prefix("goto ") {
            let target = target.trim();
            if starts_with_ident_char(target) {
                self.push(
                    StatementKind::Goto {
                        target_label: target.to_string(),
                    },
                    indent,
                    line_number,
                );
                return Ok(());
            }
        }
        if let Some(target) = remainder.strip_prefix("call ") {
            let target = target.trim();
            if starts_with_ident_char(target) {
                self.push(
                    StatementKind::Call {
                        target_label: target.to_string(),
                    },
                    indent,
                    line_number,
                );
                return Ok(());
            }
        }

        let full_text = self.consume_command_with_continuations(remainder);
        self.push(
            StatementKind::Command { raw_line: full_text },
            indent,
            line_number,
        );
        Ok(())
    }

    fn consume_command_with_continuations(&mut self, mut text: String) -> String {
        loop {
            let (continues, trimmed) = strip_trailing_continuation(&text);
            if !continues {
                return trimmed;
            }
            text = trimmed;
            if self.pos >= self.lines.len() {
                return text;
            }
            let next_raw = self.lines[self.pos].clone();
            self.pos += 1;
            let next_stripped = strip_comment(&next_raw);
            let next_trimmed = next_stripped.trim();
            text.push(' ');
            text.push_str(next_trimmed);
        }
    }

    fn push(&mut self, kind: StatementKind, indent_level: usize, line_number: usize) {
        self.statements
            .push(Statement::new(kind, indent_level, line_number));
    }
}

fn starts_with_ident_char(s: &str) -> bool {
    s.chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
}

fn strip_trailing_continuation(s: &str) -> (bool, String) {
    let bytes = s.as_bytes();
    let mut count = 0usize;
    let mut i = bytes.len();
    while i > 0 && bytes[i - 1] == b'\\' {
        count += 1;
        i -= 1;
    }
    if count % 2 == 1 {
        (true, s[..s.len() - 1].to_string())
    } else {
        (false, s.to_string())
    }
}

/// Recognizes a single `#name(params...)` or bare `#name` prefix at the
/// start of `remainder`. Returns `(name, params, rest_after)` on success.
/// `Ok(None)` means `remainder` starts with `#` but isn't a valid
/// attribute prefix (the caller raises "Unknown directive").
fn parse_attribute_prefix(
    remainder: &str,
    line_number: usize,
) -> Result<Option<(String, Vec<String>, String)>, ParseException> {
    debug_assert!(remainder.starts_with('#'));
    let name_end = remainder
        .char_indices()
        .skip(1)
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(1);
    let name = &remainder[1..name_end];
    if name.is_empty() {
        return Ok(None);
    }
    let after_name = &remainder[name_end..];

    if after_name.trim().is_empty() {
        return Ok(Some((name.to_string(), Vec::new(), String::new())));
    }

    if let Some(rest) = after_name.strip_prefix('(') {
        let _ = rest;
        let open_idx = name_end;
        let close_idx = find_matching_paren(remainder, open_idx).ok_or_else(|| {
            ParseException::new(line_number, "Unterminated attribute parameters")
        })?;
        let inner = &remainder[open_idx + 1..close_idx];
        let mut after = remainder[close_idx + 1..].trim_start();
        if let Some(stripped) = after.strip_prefix(':') {
            after = stripped.trim_start();
        }

        let mut params = if name == "features" {
            vec![inner.trim().to_string()]
        } else if inner.trim().is_empty() {
            Vec::new()
        } else {
            split_top_level_commas(inner)
        };

        if name != "features" && params.len() > MAX_ATTR_PARAMS {
            params.truncate(MAX_ATTR_PARAMS);
        }

        return Ok(Some((name.to_string(), params, after.to_string())));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StatementKind;

    fn parse_ok(src: &str) -> Vec<Statement> {
        let outcome = Parser::new(src).parse();
        assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error.map(|e| e.message));
        outcome.statements
    }

    #[test]
    fn parses_label_and_command() {
        let stmts = parse_ok("greet:\n    echo hello\n");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].label_name(), Some("greet"));
        match &stmts[1].kind {
            StatementKind::Command { raw_line } => assert_eq!(raw_line, "echo hello"),
            other => panic!("expected Command, got {:?}", other),
        }
        assert_eq!(stmts[1].indent_level, 1);
    }

    #[test]
    fn parses_var_and_index_assign() {
        let stmts = parse_ok("x = 1\ny[0] = 2\n");
        match &stmts[0].kind {
            StatementKind::VarAssign { name, raw_value } => {
                assert_eq!(name, "x");
                assert_eq!(raw_value, "1");
            }
            other => panic!("expected VarAssign, got {:?}", other),
        }
        match &stmts[1].kind {
            StatementKind::IndexAssign {
                name,
                raw_index,
                raw_value,
            } => {
                assert_eq!(name, "y");
                assert_eq!(raw_index, "0");
                assert_eq!(raw_value, "2");
            }
            other => panic!("expected IndexAssign, got {:?}", other),
        }
    }

    #[test]
    fn parses_attribute_with_params_then_command() {
        let stmts = parse_ok("#cwd(/tmp)\npwd\n");
        match &stmts[0].kind {
            StatementKind::Attr { name, params } => {
                assert_eq!(name, "cwd");
                assert_eq!(params, &vec!["/tmp".to_string()]);
            }
            other => panic!("expected Attr, got {:?}", other),
        }
    }

    #[test]
    fn multiple_attribute_prefixes_on_one_line() {
        let stmts = parse_ok("#expect(0)#cwd(/tmp) false\n");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0].kind, StatementKind::Attr { .. }));
        assert!(matches!(stmts[1].kind, StatementKind::Attr { .. }));
        assert!(matches!(stmts[2].kind, StatementKind::Command { .. }));
    }

    #[test]
    fn bare_attribute_stands_alone_on_its_line() {
        let stmts = parse_ok("#ignorefail\nfalse\n");
        assert!(matches!(stmts[0].kind, StatementKind::Attr { .. }));
        assert!(matches!(stmts[1].kind, StatementKind::Command { .. }));
    }

    #[test]
    fn features_attribute_keeps_single_raw_param() {
        let stmts = parse_ok("#features(a, b, c)\n");
        match &stmts[0].kind {
            StatementKind::Attr { name, params } => {
                assert_eq!(name, "features");
                assert_eq!(params.len(), 1);
                assert_eq!(params[0], "a, b, c");
            }
            other => panic!("expected Attr, got {:?}", other),
        }
    }

    #[test]
    fn extra_attribute_params_are_truncated_not_rejected() {
        let stmts = parse_ok("#retry(1, 2, 3, 4, 5)\ntrue\n");
        match &stmts[0].kind {
            StatementKind::Attr { name, params } => {
                assert_eq!(name, "retry");
                assert_eq!(params.len(), MAX_ATTR_PARAMS);
                assert_eq!(params, &vec!["1".to_string(), "2".to_string(), "3".to_string()]);
            }
            other => panic!("expected Attr, got {:?}", other),
        }
    }

    #[test]
    fn goto_and_call() {
        let stmts = parse_ok("goto done\ncall setup\n");
        assert!(matches!(stmts[0].kind, StatementKind::Goto { .. }));
        assert!(matches!(stmts[1].kind, StatementKind::Call { .. }));
    }

    #[test]
    fn if_else_endif() {
        let stmts = parse_ok("#if(linux)\necho a\n#else\necho b\n#endif\n");
        assert!(matches!(stmts[0].kind, StatementKind::If { .. }));
        assert!(matches!(stmts[2].kind, StatementKind::Else));
        assert!(matches!(stmts[4].kind, StatementKind::Endif));
    }

    #[test]
    fn backslash_continuation_joins_lines() {
        let stmts = parse_ok("echo one \\\n    two\n");
        match &stmts[0].kind {
            StatementKind::Command { raw_line } => assert_eq!(raw_line, "echo one two"),
            other => panic!("expected Command, got {:?}", other),
        }
    }

    #[test]
    fn comment_only_and_blank_lines_are_skipped() {
        let stmts = parse_ok("; a comment\n\n// also a comment\nx = 1\n");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn unknown_directive_is_syntax_error() {
        let outcome = Parser::new("#$nope\n").parse();
        assert!(outcome.error.is_some());
    }

    #[test]
    fn unterminated_if_is_syntax_error() {
        let outcome = Parser::new("#if(linux\necho hi\n").parse();
        assert!(outcome.error.is_some());
    }
}
