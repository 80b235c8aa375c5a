//! Statement executor: label table, pending-attribute buffer, call/goto
//! control flow, and nested `#if`/`#else`/`#endif` handling.

use crate::ast::{Statement, StatementKind};
use crate::interpolator::interpolate;
use crate::interpreter::conditionals::{
    eval_condition, eval_named_predicate, is_conditional_attr_name,
};
use crate::interpreter::errors::MewoError;
use crate::interpreter::spawner::{spawn_command, CmdAttrs};
use crate::interpreter::types::{Interpreter, LabelTable};
use crate::parser::lexer::split_top_level_commas;
use crate::store::value::parse_value;
use crate::store::Value;

enum RangeOutcome {
    Completed,
    /// A `Goto` fired somewhere in the range; the statement index execution
    /// should resume at, at the top level.
    Jump(usize),
}

pub struct Executor<'a> {
    statements: &'a [Statement],
    labels: LabelTable,
}

impl<'a> Executor<'a> {
    /// Builds the label table once before execution begins: registers every
    /// top-level label whose single preceding statement isn't a
    /// false-evaluating conditional attribute, and rejects duplicates.
    pub async fn new(
        statements: &'a [Statement],
        interp: &Interpreter,
    ) -> Result<Executor<'a>, MewoError> {
        let mut labels = LabelTable::new();
        for (i, stmt) in statements.iter().enumerate() {
            if stmt.indent_level != 0 {
                continue;
            }
            let name = match &stmt.kind {
                StatementKind::Label { name } if !name.is_empty() => name,
                _ => continue,
            };

            let mut skip = false;
            if i > 0 {
                if let StatementKind::Attr { name: attr_name, params } = &statements[i - 1].kind {
                    if is_conditional_attr_name(attr_name)
                        && !eval_named_predicate(attr_name, params, interp, statements[i - 1].line_number)
                            .await?
                    {
                        skip = true;
                    }
                }
            }
            if skip {
                tracing::debug!(label = name.as_str(), "skipping label registration, predecessor predicate false");
                continue;
            }

            if labels.contains_key(name) {
                return Err(MewoError::runtime(
                    stmt.line_number,
                    format!("Duplicate label '{}'", name),
                ));
            }
            labels.insert(name.clone(), i);
        }
        Ok(Executor { statements, labels })
    }

    /// Executes the requested label, or the top-level body when `label` is
    /// `None`.
    pub async fn run(&self, interp: &mut Interpreter, label: Option<&str>) -> Result<(), MewoError> {
        match label {
            Some(name) => match self.exec_label(name, interp, 0).await? {
                RangeOutcome::Completed => Ok(()),
                RangeOutcome::Jump(idx) => self.drive_from(idx, interp).await,
            },
            None => self.drive_from(0, interp).await,
        }
    }

    /// The driving top-level loop: walks from `start` to the end of the
    /// statement list, resolving any `Goto`-triggered jump by re-entering
    /// itself at the new index, until the walk completes normally.
    async fn drive_from(&self, mut start: usize, interp: &mut Interpreter) -> Result<(), MewoError> {
        loop {
            let mut pending = Vec::new();
            let outcome = self
                .walk_range(start, self.statements.len(), interp, &mut pending, false, false, true)
                .await?;
            match outcome {
                RangeOutcome::Completed => return Ok(()),
                RangeOutcome::Jump(idx) => start = idx,
            }
        }
    }

    /// Invokes `name`: re-runs the top-level statements (skipping `Call`
    /// and `Goto`, and skipping non-anonymous label bodies) so the label is
    /// self-contained regardless of entry path, then executes its body.
    ///
    /// A `Goto` inside the body is returned to the caller as a `Jump`
    /// rather than driven to completion here: the call's own continuation
    /// must never resume once a jump fires inside it, so the outcome has
    /// to keep propagating up to whichever driving loop is outermost.
    async fn exec_label(
        &self,
        name: &str,
        interp: &mut Interpreter,
        call_line: usize,
    ) -> Result<RangeOutcome, MewoError> {
        let mut rerun_pending = Vec::new();
        Box::pin(self.walk_range(
            0,
            self.statements.len(),
            interp,
            &mut rerun_pending,
            false,
            true,
            true,
        ))
        .await?;

        let idx = *self
            .labels
            .get(name)
            .ok_or_else(|| MewoError::runtime(call_line, format!("Unknown label '{}'", name)))?;
        let (start, end) = self.label_body_range(idx);

        let mut body_pending = Vec::new();
        Box::pin(self.walk_range(start, end, interp, &mut body_pending, true, false, false)).await
    }

    fn label_body_range(&self, label_idx: usize) -> (usize, usize) {
        (label_idx + 1, self.find_block_end(label_idx))
    }

    fn find_block_end(&self, from_idx: usize) -> usize {
        let base = self.statements[from_idx].indent_level;
        let mut i = from_idx + 1;
        while i < self.statements.len() {
            if self.statements[i].indent_level <= base {
                return i;
            }
            i += 1;
        }
        self.statements.len()
    }

    fn find_if_boundaries(&self, if_idx: usize) -> Result<(Option<usize>, usize), MewoError> {
        let target_indent = self.statements[if_idx].indent_level;
        let mut depth = 0i32;
        let mut else_idx = None;
        let mut i = if_idx + 1;
        while i < self.statements.len() {
            let s = &self.statements[i];
            if s.indent_level == target_indent {
                match &s.kind {
                    StatementKind::If { .. } => depth += 1,
                    StatementKind::Else if depth == 0 => {
                        if else_idx.is_none() {
                            else_idx = Some(i);
                        }
                    }
                    StatementKind::Endif if depth == 0 => return Ok((else_idx, i)),
                    StatementKind::Endif => depth -= 1,
                    _ => {}
                }
            }
            i += 1;
        }
        Err(MewoError::syntax(
            self.statements[if_idx].line_number,
            "Missing #endif",
        ))
    }

    /// Evaluates the pending buffer's conditional attributes; `Ok(false)`
    /// means the caller should skip the consuming statement and clear the
    /// buffer.
    async fn conditionals_hold(
        &self,
        pending: &[Statement],
        interp: &Interpreter,
    ) -> Result<bool, MewoError> {
        for stmt in pending {
            if let StatementKind::Attr { name, params } = &stmt.kind {
                if is_conditional_attr_name(name)
                    && !eval_named_predicate(name, params, interp, stmt.line_number).await?
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Walks `[start, end)`. `handle_top_level_labels` enables the
    /// indent-0 label-skip behavior (only true for the unbounded top-level
    /// walk); `skip_calls_and_gotos` makes `Call`/`Goto` no-ops (used while
    /// re-running the top level as part of entering a label);  `in_label`
    /// gates the implicit command-as-label-call syntax.
    async fn walk_range(
        &self,
        mut idx: usize,
        end: usize,
        interp: &mut Interpreter,
        pending: &mut Vec<Statement>,
        in_label: bool,
        skip_calls_and_gotos: bool,
        handle_top_level_labels: bool,
    ) -> Result<RangeOutcome, MewoError> {
        while idx < end {
            let stmt = self.statements[idx].clone();

            match &stmt.kind {
                StatementKind::Label { .. } if handle_top_level_labels => {
                    pending.clear();
                    idx = if stmt.label_name().map(str::is_empty).unwrap_or(true) {
                        idx + 1
                    } else {
                        self.find_block_end(idx)
                    };
                    continue;
                }
                StatementKind::If { raw_condition } => {
                    let (else_idx, endif_idx) = self.find_if_boundaries(idx)?;
                    let cond = eval_condition(raw_condition, interp, stmt.line_number).await?;
                    let (branch_start, branch_end) = if cond {
                        (idx + 1, else_idx.unwrap_or(endif_idx))
                    } else if let Some(e) = else_idx {
                        (e + 1, endif_idx)
                    } else {
                        (endif_idx, endif_idx)
                    };
                    let outcome = Box::pin(self.walk_range(
                        branch_start,
                        branch_end,
                        interp,
                        pending,
                        in_label,
                        skip_calls_and_gotos,
                        false,
                    ))
                    .await?;
                    if let RangeOutcome::Jump(j) = outcome {
                        return Ok(RangeOutcome::Jump(j));
                    }
                    idx = endif_idx + 1;
                }
                StatementKind::Else | StatementKind::Endif => {
                    idx += 1;
                }
                StatementKind::Attr { name, params } => {
                    if name == "features" {
                        let raw = params.first().cloned().unwrap_or_default();
                        let ctx = interp.interp_ctx();
                        let expanded = interpolate(&raw, &ctx, stmt.line_number).await?;
                        for n in split_top_level_commas(&expanded) {
                            if !n.is_empty() {
                                interp.features.enable(n);
                            }
                        }
                    } else if name == "assert" {
                        let raw = params.first().cloned().unwrap_or_default();
                        if !eval_condition(&raw, interp, stmt.line_number).await? {
                            return Err(MewoError::runtime(
                                stmt.line_number,
                                format!("Assertion failed: {}", raw),
                            ));
                        }
                    } else {
                        pending.push(stmt.clone());
                    }
                    idx += 1;
                }
                StatementKind::Goto { target_label } => {
                    if skip_calls_and_gotos {
                        idx += 1;
                        continue;
                    }
                    pending.clear();
                    let target_idx = *self.labels.get(target_label).ok_or_else(|| {
                        MewoError::runtime(
                            stmt.line_number,
                            format!("Unknown label '{}'", target_label),
                        )
                    })?;
                    return Ok(RangeOutcome::Jump(target_idx + 1));
                }
                StatementKind::Call { target_label } => {
                    if skip_calls_and_gotos {
                        idx += 1;
                        continue;
                    }
                    let outcome =
                        Box::pin(self.exec_label(target_label, interp, stmt.line_number)).await?;
                    if let RangeOutcome::Jump(j) = outcome {
                        return Ok(RangeOutcome::Jump(j));
                    }
                    idx += 1;
                }
                StatementKind::VarAssign { name, raw_value } => {
                    if !self.conditionals_hold(pending, interp).await? {
                        pending.clear();
                        idx += 1;
                        continue;
                    }
                    let ctx = interp.interp_ctx();
                    let text = interpolate(raw_value, &ctx, stmt.line_number).await?;
                    let value = parse_value(&text, stmt.line_number, &interp.vars)?;
                    interp.vars.set(name.clone(), value);
                    pending.clear();
                    idx += 1;
                }
                StatementKind::IndexAssign {
                    name,
                    raw_index,
                    raw_value,
                } => {
                    if !self.conditionals_hold(pending, interp).await? {
                        pending.clear();
                        idx += 1;
                        continue;
                    }
                    let ctx = interp.interp_ctx();
                    let idx_text = interpolate(raw_index, &ctx, stmt.line_number).await?;
                    let index: usize = idx_text.trim().parse().map_err(|_| {
                        MewoError::runtime(stmt.line_number, format!("Invalid index '{}'", idx_text))
                    })?;
                    let value_text = interpolate(raw_value, &ctx, stmt.line_number).await?;
                    let value = parse_value(&value_text, stmt.line_number, &interp.vars)?;
                    match interp.vars.get(name).cloned() {
                        Some(Value::Array(mut items)) => {
                            while items.len() <= index {
                                items.push(Value::String(String::new()));
                            }
                            items[index] = value;
                            interp.vars.set(name.clone(), Value::Array(items));
                        }
                        _ => {
                            return Err(MewoError::runtime(
                                stmt.line_number,
                                format!("'{}' is not an array", name),
                            ))
                        }
                    }
                    pending.clear();
                    idx += 1;
                }
                StatementKind::Command { raw_line } => {
                    if !self.conditionals_hold(pending, interp).await? {
                        pending.clear();
                        idx += 1;
                        continue;
                    }
                    let ctx = interp.interp_ctx();
                    let cmd_text = interpolate(raw_line, &ctx, stmt.line_number).await?;
                    let trimmed = cmd_text.trim();
                    if in_label && self.labels.contains_key(trimmed) {
                        pending.clear();
                        let target = trimmed.to_string();
                        let outcome =
                            Box::pin(self.exec_label(&target, interp, stmt.line_number)).await?;
                        if let RangeOutcome::Jump(j) = outcome {
                            return Ok(RangeOutcome::Jump(j));
                        }
                    } else {
                        let attrs = CmdAttrs::from_pending(pending, interp, stmt.line_number).await?;
                        pending.clear();
                        spawn_command(&cmd_text, attrs, interp, stmt.line_number).await?;
                    }
                    idx += 1;
                }
                StatementKind::Label { .. } => {
                    // Indented (non-top-level) labels never participate.
                    pending.clear();
                    idx += 1;
                }
            }
        }
        Ok(RangeOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    async fn run_script(src: &str, interp: &mut Interpreter) -> Result<(), MewoError> {
        let outcome = parse(src);
        assert!(outcome.error.is_none());
        let executor = Executor::new(&outcome.statements, interp).await?;
        executor.run(interp, None).await
    }

    #[tokio::test]
    async fn var_assign_then_index_read_through_command() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], true, None);
        run_script("x = 1\ny = [1, 2, 3]\necho ${y[1]}\n", &mut interp)
            .await
            .unwrap();
        assert_eq!(interp.vars.get("x"), Some(&Value::Number(1.0)));
    }

    #[tokio::test]
    async fn if_false_branch_is_skipped() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], true, None);
        run_script("#if(false)\nx = 1\n#else\nx = 2\n#endif\n", &mut interp)
            .await
            .unwrap();
        assert_eq!(interp.vars.get("x"), Some(&Value::Number(2.0)));
    }

    #[tokio::test]
    async fn unregistered_label_on_false_predecessor() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], true, None);
        let outcome = parse("#feature(nope)\nbuild:\n    echo hi\n");
        let executor = Executor::new(&outcome.statements, &interp).await.unwrap();
        let result = executor.run(&mut interp, Some("build")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn call_then_resume_after() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], true, None);
        run_script(
            "call setup\nx = 2\ngoto done\nsetup:\n    y = 1\ndone:\n    z = 3\n",
            &mut interp,
        )
        .await
        .unwrap();
        assert_eq!(interp.vars.get("y"), Some(&Value::Number(1.0)));
        assert_eq!(interp.vars.get("x"), Some(&Value::Number(2.0)));
        assert_eq!(interp.vars.get("z"), Some(&Value::Number(3.0)));
    }

    #[tokio::test]
    async fn goto_inside_called_label_discards_call_continuation() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], true, None);
        run_script(
            "call setup\nafter_call = 1\nsetup:\n    goto done\ndone:\n    z = 3\n",
            &mut interp,
        )
        .await
        .unwrap();
        assert_eq!(interp.vars.get("z"), Some(&Value::Number(3.0)));
        assert_eq!(interp.vars.get("after_call"), None);
    }

    #[tokio::test]
    async fn ignorefail_lets_following_command_run() {
        let mut interp = Interpreter::new(vec!["mewo".to_string()], false, None);
        run_script("#ignorefail\nfalse\necho after\n", &mut interp)
            .await
            .unwrap();
        assert_eq!(interp.last_exit_code, 0);
    }

    #[tokio::test]
    async fn duplicate_label_is_rejected() {
        let interp = Interpreter::new(vec!["mewo".to_string()], true, None);
        let outcome = parse("a:\n    echo hi\na:\n    echo bye\n");
        let result = Executor::new(&outcome.statements, &interp).await;
        assert!(result.is_err());
    }
}
