//! Predicate evaluation shared by `#if`, `#assert`, the recognized
//! conditional attributes (`#windows`, `#feature(...)`, ...), and label
//! registration's predecessor check.

use crate::interpreter::errors::MewoError;
use crate::interpreter::types::Interpreter;
use crate::interpolator::interpolate;
use crate::parser::lexer::split_top_level_commas;
use crate::store::value::is_identifier;

pub const CONDITIONAL_ATTR_NAMES: &[&str] = &[
    "windows", "win32", "linux", "macos", "darwin", "unix", "arch", "distro", "feature", "env",
    "exists",
];

pub fn is_conditional_attr_name(name: &str) -> bool {
    CONDITIONAL_ATTR_NAMES.contains(&name)
}

/// Evaluates the free-form text of a `#if(<cond>)`/`#assert(<cond>)`
/// condition: first as one of the fixed named predicates, otherwise by
/// interpolating it and checking truthiness.
pub async fn eval_condition(
    raw: &str,
    interp: &Interpreter,
    line: usize,
) -> Result<bool, MewoError> {
    let trimmed = raw.trim();
    let (name, params) = split_predicate_call(trimmed);
    if is_conditional_attr_name(&name) {
        return eval_named_predicate(&name, &params, interp, line).await;
    }

    let expanded = interpolate(trimmed, &interp.interp_ctx(), line).await?;
    Ok(truthy(&expanded))
}

/// Evaluates one of the fixed conditional-attribute predicates by name,
/// used both from `eval_condition` and directly for bare `#windows`-style
/// attribute statements.
pub async fn eval_named_predicate(
    name: &str,
    params: &[String],
    interp: &Interpreter,
    line: usize,
) -> Result<bool, MewoError> {
    match name {
        "windows" | "win32" => Ok(cfg!(target_os = "windows")),
        "linux" => Ok(cfg!(target_os = "linux")),
        "macos" | "darwin" => Ok(cfg!(target_os = "macos")),
        "unix" => Ok(cfg!(unix)),
        "arch" => {
            let want = params.first().map(|s| s.trim()).unwrap_or("");
            Ok(want.eq_ignore_ascii_case(std::env::consts::ARCH))
        }
        "distro" => {
            let want = params.first().map(|s| s.trim()).unwrap_or("");
            Ok(detect_distro_id()
                .map(|id| id.eq_ignore_ascii_case(want))
                .unwrap_or(false))
        }
        "feature" => {
            let feature_name = params.first().map(|s| s.trim()).unwrap_or("");
            Ok(interp.features.exists(feature_name))
        }
        "env" => {
            let var_name = params.first().map(|s| s.trim()).unwrap_or("");
            match params.get(1) {
                Some(expect_val) => Ok(std::env::var(var_name)
                    .map(|v| v == expect_val.trim())
                    .unwrap_or(false)),
                None => Ok(std::env::var(var_name)
                    .map(|v| !v.is_empty())
                    .unwrap_or(false)),
            }
        }
        "exists" => {
            let raw_path = params.first().cloned().unwrap_or_default();
            let resolved = resolve_path_param(&raw_path, interp, line).await?;
            Ok(std::path::Path::new(&resolved).exists())
        }
        other => Err(MewoError::runtime(line, format!("Unknown condition '{}'", other))),
    }
}

async fn resolve_path_param(
    raw: &str,
    interp: &Interpreter,
    line: usize,
) -> Result<String, MewoError> {
    let trimmed = raw.trim();
    if let Some(inner) = strip_quotes(trimmed) {
        return Ok(inner.to_string());
    }
    if is_identifier(trimmed) {
        if let Some(v) = interp.vars.get(trimmed) {
            return Ok(v.coerce_to_string());
        }
    }
    interpolate(trimmed, &interp.interp_ctx(), line).await
}

fn truthy(s: &str) -> bool {
    let t = s.trim();
    if t.is_empty() || t == "false" {
        return false;
    }
    if t == "true" {
        return true;
    }
    if let Ok(n) = t.parse::<f64>() {
        return n != 0.0;
    }
    true
}

fn split_predicate_call(s: &str) -> (String, Vec<String>) {
    if let Some(idx) = s.find('(') {
        if s.ends_with(')') {
            let name = s[..idx].trim().to_string();
            let inner = &s[idx + 1..s.len() - 1];
            let params = if inner.trim().is_empty() {
                Vec::new()
            } else {
                split_top_level_commas(inner)
            };
            return (name, params);
        }
    }
    (s.trim().to_string(), Vec::new())
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

fn detect_distro_id() -> Option<String> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let contents = std::fs::read_to_string("/etc/os-release").ok()?;
    for line in contents.lines() {
        if let Some(value) = line.strip_prefix("ID=") {
            return Some(value.trim_matches('"').to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_rules() {
        assert!(!truthy(""));
        assert!(!truthy("false"));
        assert!(!truthy("0"));
        assert!(truthy("true"));
        assert!(truthy("1"));
        assert!(truthy("anything"));
    }

    #[tokio::test]
    async fn feature_predicate_reflects_feature_store() {
        let mut interp = Interpreter::new(vec![], false, None);
        interp.features.enable("fast");
        assert!(eval_condition("feature(fast)", &interp, 1).await.unwrap());
        assert!(!eval_condition("feature(slow)", &interp, 1).await.unwrap());
    }

    #[tokio::test]
    async fn unix_predicate_is_true_on_this_platform() {
        let interp = Interpreter::new(vec![], false, None);
        assert!(eval_condition("unix", &interp, 1).await.unwrap());
    }

    #[tokio::test]
    async fn generic_fallback_checks_truthiness_of_interpolated_text() {
        let mut interp = Interpreter::new(vec![], false, None);
        interp.vars.set_bool("flag".to_string(), false);
        assert!(!eval_condition("${flag}", &interp, 1).await.unwrap());
    }
}
