//! `${...}` expansion. Scans left to right, longest match first, and
//! recurses into `${<expr>}` bodies before dispatching on the expanded
//! expression text.

use std::future::Future;
use std::pin::Pin;

use crate::interpreter::errors::MewoError;
use crate::interpreter::spawner::exec_capture;
use crate::parser::lexer::split_top_level_commas;
use crate::store::value::is_identifier;
use crate::store::{FeatureStore, Value, VariableStore};

/// Nested `${...}` expansion is bounded to guard against pathological
/// input driving unbounded recursion.
const MAX_RECURSION_DEPTH: usize = 64;

pub struct InterpContext<'a> {
    pub vars: &'a VariableStore,
    pub features: &'a FeatureStore,
    pub argv: &'a [String],
    pub last_exit_code: i32,
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub fn interpolate<'a>(
    template: &'a str,
    ctx: &'a InterpContext<'a>,
    line: usize,
) -> BoxFut<'a, Result<String, MewoError>> {
    Box::pin(interpolate_depth(template, ctx, line, 0))
}

fn interpolate_depth<'a>(
    template: &'a str,
    ctx: &'a InterpContext<'a>,
    line: usize,
    depth: usize,
) -> BoxFut<'a, Result<String, MewoError>> {
    Box::pin(async move {
        if depth > MAX_RECURSION_DEPTH {
            return Err(MewoError::syntax(line, "Interpolation nested too deeply"));
        }

        let bytes = template.as_bytes();
        let mut out = String::with_capacity(template.len());
        let mut i = 0usize;

        while i < bytes.len() {
            if bytes[i] != b'$' {
                let start = i;
                while i < bytes.len() && bytes[i] != b'$' {
                    i += 1;
                }
                out.push_str(&template[start..i]);
                continue;
            }

            let rest = &template[i..];

            if rest.starts_with("$${") {
                let brace_open = i + 2;
                match find_matching_brace(template, brace_open) {
                    Some(close) => {
                        out.push_str("${");
                        out.push_str(&template[brace_open + 1..close]);
                        out.push('}');
                        i = close + 1;
                        continue;
                    }
                    None => return Err(MewoError::syntax(line, "Unterminated ${")),
                }
            }

            if rest.len() >= 3 && rest.as_bytes()[1] == b'$' && rest.as_bytes()[2].is_ascii_digit()
            {
                out.push('$');
                out.push(rest.as_bytes()[2] as char);
                i += 3;
                continue;
            }

            if rest.starts_with("${") {
                let brace_open = i + 1;
                let close = find_matching_brace(template, brace_open)
                    .ok_or_else(|| MewoError::syntax(line, "Unterminated ${"))?;
                let raw_expr = &template[brace_open + 1..close];
                let expanded_expr =
                    interpolate_depth(raw_expr, ctx, line, depth + 1).await?;
                let piece = dispatch_expr(expanded_expr.trim(), ctx, line, depth).await?;
                out.push_str(&piece);
                i = close + 1;
                continue;
            }

            if rest.len() >= 2 && rest.as_bytes()[1] == b'?' {
                out.push_str(&ctx.last_exit_code.to_string());
                i += 2;
                continue;
            }

            if rest.len() >= 2 && rest.as_bytes()[1].is_ascii_digit() {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                let idx: usize = template[i + 1..j].parse().unwrap_or(0);
                out.push_str(&positional_arg(ctx, idx));
                i = j;
                continue;
            }

            out.push('$');
            i += 1;
        }

        Ok(out)
    })
}

fn positional_arg(ctx: &InterpContext<'_>, idx: usize) -> String {
    ctx.argv.get(idx).cloned().unwrap_or_default()
}

fn find_matching_brace(s: &str, open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (idx, c) in s.char_indices().skip(open_idx) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn dispatch_expr<'a>(
    expr: &'a str,
    ctx: &'a InterpContext<'a>,
    line: usize,
    depth: usize,
) -> BoxFut<'a, Result<String, MewoError>> {
    Box::pin(async move {
        if !expr.is_empty() && expr.chars().all(|c| c.is_ascii_digit()) {
            let idx: usize = expr.parse().unwrap_or(0);
            return Ok(positional_arg(ctx, idx));
        }

        if expr == "argv" {
            return Ok(ctx.argv.iter().skip(1).cloned().collect::<Vec<_>>().join(" "));
        }

        if let Some(inner) = strip_call(expr, "#len") {
            return Ok(len_of(inner.trim(), ctx).to_string());
        }

        if let Some(inner) = strip_call(expr, "#env") {
            let parts = split_top_level_commas(inner);
            let name = parts.first().map(|s| s.trim()).unwrap_or("");
            let default = parts.get(1).map(|s| s.trim().to_string());
            return Ok(std::env::var(name).unwrap_or_else(|_| default.unwrap_or_default()));
        }

        if let Some(inner) = strip_call(expr, "#exec") {
            let parts = split_top_level_commas(inner);
            let cmd_raw = parts.first().map(|s| s.trim()).unwrap_or("");
            let cmd = strip_quotes(cmd_raw).unwrap_or(cmd_raw).to_string();
            let shell = parts.get(1).map(|s| s.trim().to_string());
            let captured = exec_capture(&cmd, shell.as_deref())
                .await
                .map_err(|e| MewoError::runtime(line, format!("#exec failed: {}", e)))?;
            let mut text = String::from_utf8_lossy(&captured).into_owned();
            if text.ends_with('\n') {
                text.pop();
            }
            return Ok(text);
        }

        if let Some(bracket_pos) = expr.find('[') {
            if expr.ends_with(']') {
                let ident = &expr[..bracket_pos];
                let idx_str = &expr[bracket_pos + 1..expr.len() - 1];
                if is_identifier(ident) {
                    let idx: usize = idx_str.trim().parse().unwrap_or(usize::MAX);
                    return Ok(index_into(ident, idx, ctx));
                }
            }
        }

        if is_identifier(expr) {
            return ctx
                .vars
                .get(expr)
                .map(Value::coerce_to_string)
                .ok_or_else(|| MewoError::runtime(line, format!("Undefined variable '{}'", expr)));
        }

        let _ = depth;
        Err(MewoError::runtime(line, format!("Invalid interpolation expression '{}'", expr)))
    })
}

fn len_of(name_or_text: &str, ctx: &InterpContext<'_>) -> usize {
    if is_identifier(name_or_text) {
        match ctx.vars.get(name_or_text) {
            Some(v) => v.len(),
            None => 0,
        }
    } else {
        name_or_text.as_bytes().len()
    }
}

fn index_into(ident: &str, idx: usize, ctx: &InterpContext<'_>) -> String {
    match ctx.vars.get(ident) {
        None => String::new(),
        Some(Value::Array(items)) => items
            .get(idx)
            .map(Value::coerce_to_string)
            .unwrap_or_default(),
        Some(Value::String(s)) => s
            .as_bytes()
            .get(idx)
            .map(|b| (*b as char).to_string())
            .unwrap_or_default(),
        Some(other) => other.coerce_to_string(),
    }
}

fn strip_call<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    let prefix = format!("{}(", name);
    if let Some(rest) = expr.strip_prefix(&prefix) {
        rest.strip_suffix(')')
    } else {
        None
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(vars: &'a VariableStore, features: &'a FeatureStore, argv: &'a [String]) -> InterpContext<'a> {
        InterpContext {
            vars,
            features,
            argv,
            last_exit_code: 0,
        }
    }

    #[tokio::test]
    async fn identity_when_no_dollar() {
        let vars = VariableStore::new();
        let features = FeatureStore::new();
        let argv: Vec<String> = vec![];
        let c = ctx(&vars, &features, &argv);
        assert_eq!(interpolate("hello world", &c, 1).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn escaped_brace_is_literal() {
        let vars = VariableStore::new();
        let features = FeatureStore::new();
        let argv: Vec<String> = vec![];
        let c = ctx(&vars, &features, &argv);
        assert_eq!(interpolate("$${x}", &c, 1).await.unwrap(), "${x}");
    }

    #[tokio::test]
    async fn positional_and_last_exit_code() {
        let vars = VariableStore::new();
        let features = FeatureStore::new();
        let argv = vec!["mewo".to_string(), "first".to_string()];
        let mut c = ctx(&vars, &features, &argv);
        c.last_exit_code = 7;
        assert_eq!(interpolate("$1 $?", &c, 1).await.unwrap(), "first 7");
    }

    #[tokio::test]
    async fn variable_and_array_index() {
        let mut vars = VariableStore::new();
        vars.set(
            "y".to_string(),
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]),
        );
        let features = FeatureStore::new();
        let argv: Vec<String> = vec![];
        let c = ctx(&vars, &features, &argv);
        assert_eq!(interpolate("${y[1]}", &c, 1).await.unwrap(), "2");
    }

    #[tokio::test]
    async fn len_of_undefined_is_zero() {
        let vars = VariableStore::new();
        let features = FeatureStore::new();
        let argv: Vec<String> = vec![];
        let c = ctx(&vars, &features, &argv);
        assert_eq!(interpolate("${#len(missing)}", &c, 1).await.unwrap(), "0");
    }

    #[tokio::test]
    async fn undefined_bare_identifier_is_runtime_error() {
        let vars = VariableStore::new();
        let features = FeatureStore::new();
        let argv: Vec<String> = vec![];
        let c = ctx(&vars, &features, &argv);
        assert!(interpolate("${missing}", &c, 5).await.is_err());
    }
}
