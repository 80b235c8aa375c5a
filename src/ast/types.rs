//! The flat, ordered statement stream the parser hands to the executor.
//!
//! Every statement carries its own `indent_level` and `line_number`; the
//! executor never walks a tree, only this flat sequence indexed by position.

/// One attribute's raw, uninterpolated parameters (0 to 3 of them, except
/// `#features` which always carries exactly one raw string later split by
/// the executor on commas).
pub type AttrParams = Vec<String>;

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `#name(params...)` or bare `#name`.
    Attr { name: String, params: AttrParams },
    /// `name = raw_value` (uninterpolated right-hand side).
    VarAssign { name: String, raw_value: String },
    /// `name[raw_index] = raw_value`.
    IndexAssign {
        name: String,
        raw_index: String,
        raw_value: String,
    },
    /// `name:` at indent 0. Empty name marks an anonymous top-level block.
    Label { name: String },
    /// Any line that isn't an attribute, assignment, label, goto, or call.
    Command { raw_line: String },
    If { raw_condition: String },
    Else,
    Endif,
    Goto { target_label: String },
    Call { target_label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub indent_level: usize,
    pub line_number: usize,
}

impl Statement {
    pub fn new(kind: StatementKind, indent_level: usize, line_number: usize) -> Self {
        Self {
            kind,
            indent_level,
            line_number,
        }
    }

    pub fn is_attr(&self) -> bool {
        matches!(self.kind, StatementKind::Attr { .. })
    }

    pub fn is_label(&self) -> bool {
        matches!(self.kind, StatementKind::Label { .. })
    }

    pub fn label_name(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Label { name } => Some(name.as_str()),
            _ => None,
        }
    }
}
