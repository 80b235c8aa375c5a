//! The command spawner (§4.6): resolves shell/attributes, spawns a real
//! child process, applies capture/expect/ignorefail/timeout semantics, and
//! restores any scoped state (cwd) on every exit path.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use crate::ast::{Statement, StatementKind};
use crate::interpreter::errors::MewoError;
use crate::interpreter::types::Interpreter;
use crate::interpolator::interpolate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Default)]
pub struct CmdAttrs {
    pub ignorefail: bool,
    pub expect: Option<i32>,
    pub cwd: Option<String>,
    pub shell_override: Option<String>,
    pub shell_bypass: bool,
    pub shell_global: Option<String>,
    pub shell_global_clear: bool,
    pub timeout_ms: Option<u64>,
    pub once: bool,
    pub save: Option<(SaveStream, String)>,
}

impl CmdAttrs {
    /// Interpolates and folds each pending command-attribute statement into
    /// a `CmdAttrs`. Attribute parameter *values* are interpolated here,
    /// individually, at the point they're consumed — not when the `Attr`
    /// statement was first produced by the parser.
    pub async fn from_pending(
        pending: &[Statement],
        interp: &Interpreter,
        line: usize,
    ) -> Result<CmdAttrs, MewoError> {
        let ctx = interp.interp_ctx();
        let mut attrs = CmdAttrs::default();

        for stmt in pending {
            let StatementKind::Attr { name, params } = &stmt.kind else {
                continue;
            };
            match name.as_str() {
                "ignorefail" => attrs.ignorefail = true,
                "expect" => {
                    let raw = params.first().cloned().unwrap_or_default();
                    let text = interpolate(&raw, &ctx, line).await?;
                    let n: i32 = text.trim().parse().map_err(|_| {
                        MewoError::runtime(line, format!("Invalid #expect value '{}'", text))
                    })?;
                    attrs.expect = Some(n);
                }
                "cwd" => {
                    let raw = params.first().cloned().unwrap_or_default();
                    attrs.cwd = Some(interpolate(&raw, &ctx, line).await?);
                }
                "shell" => {
                    let raw_name = params.first().cloned().unwrap_or_default();
                    let shell_name = interpolate(&raw_name, &ctx, line).await?;
                    let is_global = params
                        .get(1)
                        .map(|p| p.trim() == "global")
                        .unwrap_or(false);
                    if shell_name.trim() == "default" {
                        attrs.shell_bypass = true;
                        if is_global {
                            attrs.shell_global_clear = true;
                        }
                    } else if is_global {
                        attrs.shell_global = Some(shell_name);
                    } else {
                        attrs.shell_override = Some(shell_name);
                    }
                }
                "timeout" => {
                    let raw = params.first().cloned().unwrap_or_default();
                    let text = interpolate(&raw, &ctx, line).await?;
                    let ms: u64 = text.trim().parse().map_err(|_| {
                        MewoError::runtime(line, format!("Invalid #timeout value '{}'", text))
                    })?;
                    attrs.timeout_ms = Some(ms);
                }
                "once" => attrs.once = true,
                "save" => {
                    let raw_stream = params.first().cloned().unwrap_or_default();
                    let stream_text = interpolate(&raw_stream, &ctx, line).await?;
                    let stream = match stream_text.trim() {
                        "stdout" => SaveStream::Stdout,
                        "stderr" => SaveStream::Stderr,
                        other => {
                            return Err(MewoError::runtime(
                                line,
                                format!("Invalid #save stream '{}'", other),
                            ))
                        }
                    };
                    let var_name = params
                        .get(1)
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default();
                    attrs.save = Some((stream, var_name));
                }
                other => {
                    return Err(MewoError::runtime(
                        line,
                        format!("Unknown command attribute '#{}'", other),
                    ))
                }
            }
        }

        Ok(attrs)
    }
}

struct CwdGuard {
    prev: Option<PathBuf>,
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            let _ = std::env::set_current_dir(prev);
        }
    }
}

fn default_platform_shell() -> String {
    if cfg!(windows) {
        "cmd".to_string()
    } else {
        "/bin/sh".to_string()
    }
}

/// Whitespace word-splitting respecting quoted runs (no escape processing);
/// used for `#shell(default)`'s true shell-less exec and for `#exec`'s
/// direct-spawn path.
fn shell_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut has_current = false;
    let mut in_quote: Option<char> = None;
    for c in s.chars() {
        match in_quote {
            Some(q) => {
                if c == q {
                    in_quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '"' | '\'' => {
                    in_quote = Some(c);
                    has_current = true;
                }
                c if c.is_whitespace() => {
                    if has_current {
                        words.push(std::mem::take(&mut current));
                        has_current = false;
                    }
                }
                c => {
                    current.push(c);
                    has_current = true;
                }
            },
        }
    }
    if has_current {
        words.push(current);
    }
    words
}

fn strip_one_trailing_newline(mut s: String) -> String {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    s
}

/// The exit code reported when a `#timeout` fires, matching the
/// conventional value used by the `timeout(1)` utility.
const TIMEOUT_EXIT_CODE: i32 = 124;

/// Dispatches one already-interpolated command line with its resolved
/// attributes, per the component design's ordered steps.
pub async fn spawn_command(
    cmd_text: &str,
    attrs: CmdAttrs,
    interp: &mut Interpreter,
    line: usize,
) -> Result<(), MewoError> {
    if attrs.once {
        if interp.once_seen.contains(&line) {
            return Ok(());
        }
        interp.once_seen.insert(line);
    }

    if interp.dry_run {
        println!("[dry-run] {}", cmd_text);
        interp.last_exit_code = 0;
        return Ok(());
    }

    if attrs.shell_global_clear {
        interp.global_shell = None;
    } else if let Some(g) = &attrs.shell_global {
        interp.global_shell = Some(g.clone());
    }

    let _cwd_guard = if let Some(path) = &attrs.cwd {
        let prev = std::env::current_dir()
            .map_err(|e| MewoError::runtime(line, format!("Could not read cwd: {}", e)))?;
        std::env::set_current_dir(path)
            .map_err(|e| MewoError::runtime(line, format!("Could not chdir to '{}': {}", path, e)))?;
        Some(CwdGuard { prev: Some(prev) })
    } else {
        None
    };

    let mut command = if attrs.shell_bypass {
        let mut words = shell_words(cmd_text);
        if words.is_empty() {
            interp.last_exit_code = 0;
            return Ok(());
        }
        let program = words.remove(0);
        let mut c = tokio::process::Command::new(program);
        c.args(words);
        c
    } else {
        let shell = attrs
            .shell_override
            .clone()
            .or_else(|| interp.global_shell.clone())
            .unwrap_or_else(default_platform_shell);
        if let Some(pos) = shell.find("%s") {
            let (prefix, suffix) = shell.split_at(pos);
            let suffix = &suffix[2..];
            let mut words = shell_words(prefix);
            if words.is_empty() {
                return Err(MewoError::runtime(line, "Empty #shell template"));
            }
            let program = words.remove(0);
            let mut c = tokio::process::Command::new(program);
            c.args(words);
            c.arg(cmd_text);
            for w in shell_words(suffix) {
                c.arg(w);
            }
            c
        } else {
            let flag = if cfg!(windows) { "/c" } else { "-c" };
            let mut c = tokio::process::Command::new(&shell);
            c.arg(flag).arg(cmd_text);
            c
        }
    };

    match &attrs.save {
        Some((SaveStream::Stdout, _)) => {
            command.stdout(Stdio::piped());
        }
        Some((SaveStream::Stderr, _)) => {
            command.stderr(Stdio::piped());
        }
        None => {}
    }

    let mut child = command
        .spawn()
        .map_err(|e| MewoError::runtime(line, format!("Failed to spawn '{}': {}", cmd_text, e)))?;

    let (code, captured) = if let Some(ms) = attrs.timeout_ms {
        match tokio::time::timeout(Duration::from_millis(ms), wait_with_output(&mut child)).await {
            Ok(result) => result?,
            Err(_) => {
                let _ = child.kill().await;
                (TIMEOUT_EXIT_CODE, None)
            }
        }
    } else {
        wait_with_output(&mut child).await?
    };

    if let Some((stream, var_name)) = &attrs.save {
        let text = captured
            .map(|bytes| strip_one_trailing_newline(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or_default();
        let _ = stream;
        interp
            .vars
            .set(var_name.clone(), crate::store::Value::String(text));
    }

    interp.last_exit_code = code;

    if let Some(expected) = attrs.expect {
        if code != expected && !attrs.ignorefail {
            return Err(MewoError::runtime(
                line,
                format!("Command exited with {} (expected {})", code, expected),
            ));
        }
    } else if code != 0 && !attrs.ignorefail {
        return Err(MewoError::runtime(line, format!("Command exited with {}", code)));
    }

    Ok(())
}

async fn wait_with_output(
    child: &mut tokio::process::Child,
) -> Result<(i32, Option<Vec<u8>>), MewoError> {
    use tokio::io::AsyncReadExt;

    let mut captured = None;
    if let Some(mut stdout) = child.stdout.take() {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf).await;
        captured = Some(buf);
    } else if let Some(mut stderr) = child.stderr.take() {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        captured = Some(buf);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| MewoError::runtime(0, format!("Failed waiting for child: {}", e)))?;
    Ok((status.code().unwrap_or(1), captured))
}

/// Raw subprocess capture for the interpolator's `#exec` intrinsic,
/// independent of the attributed command-statement dispatch above.
pub async fn exec_capture(cmd: &str, shell: Option<&str>) -> std::io::Result<Vec<u8>> {
    let mut command = if let Some(sh) = shell {
        let mut c = tokio::process::Command::new(sh);
        c.arg("-c").arg(cmd);
        c
    } else {
        let mut words = shell_words(cmd);
        if words.is_empty() {
            return Ok(Vec::new());
        }
        let program = words.remove(0);
        let mut c = tokio::process::Command::new(program);
        c.args(words);
        c
    };
    command.stdout(Stdio::piped());
    command.stderr(Stdio::null());
    let output = command.output().await?;
    let mut stdout = output.stdout;
    stdout.truncate(1024);
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_words_respects_quotes() {
        let words = shell_words("echo \"a b\" c");
        assert_eq!(words, vec!["echo", "a b", "c"]);
    }

    #[test]
    fn strip_one_trailing_newline_only_removes_one() {
        assert_eq!(strip_one_trailing_newline("hi\n\n".to_string()), "hi\n");
        assert_eq!(strip_one_trailing_newline("hi".to_string()), "hi");
    }

    #[tokio::test]
    async fn spawn_runs_real_command_and_sets_exit_code() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], false, None);
        let attrs = CmdAttrs::default();
        let result = spawn_command("true", attrs, &mut interp, 1).await;
        assert!(result.is_ok());
        assert_eq!(interp.last_exit_code, 0);
    }

    #[tokio::test]
    async fn ignorefail_suppresses_nonzero_exit_error() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], false, None);
        let mut attrs = CmdAttrs::default();
        attrs.ignorefail = true;
        let result = spawn_command("false", attrs, &mut interp, 1).await;
        assert!(result.is_ok());
        assert_eq!(interp.last_exit_code, 1);
    }

    #[tokio::test]
    async fn dry_run_does_not_spawn() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], true, None);
        let attrs = CmdAttrs::default();
        let result = spawn_command("false", attrs, &mut interp, 1).await;
        assert!(result.is_ok());
        assert_eq!(interp.last_exit_code, 0);
    }

    #[tokio::test]
    async fn save_captures_stdout_into_variable() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], false, None);
        let mut attrs = CmdAttrs::default();
        attrs.save = Some((SaveStream::Stdout, "out".to_string()));
        attrs.shell_bypass = true;
        let result = spawn_command("printf hi", attrs, &mut interp, 1).await;
        assert!(result.is_ok());
        assert_eq!(
            interp.vars.get("out"),
            Some(&crate::store::Value::String("hi".to_string()))
        );
    }

    #[tokio::test]
    async fn once_runs_a_single_time() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], false, None);
        let mut attrs = CmdAttrs::default();
        attrs.once = true;
        assert!(spawn_command("true", attrs, &mut interp, 42).await.is_ok());
        let mut attrs_again = CmdAttrs::default();
        attrs_again.once = true;
        interp.last_exit_code = 99;
        assert!(spawn_command("false", attrs_again, &mut interp, 42).await.is_ok());
        assert_eq!(interp.last_exit_code, 99);
    }
}
