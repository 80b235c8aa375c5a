//! Top-level glue: ties the parser and executor together behind one
//! entry point, analogous to a `Bash`/`BashOptions` pairing.

use crate::interpreter::errors::MewoError;
use crate::interpreter::types::Interpreter;
use crate::interpreter::Executor;
use crate::parser::parse;
use crate::store::Value;

/// Options for creating a Mewo run, mirroring `BashOptions`'s shape.
#[derive(Default)]
pub struct MewoOptions {
    /// `-D name=value` overrides applied to the variable store before
    /// execution.
    pub defines: Vec<(String, Value)>,
    /// `+F name` / `-F name` feature toggles applied before execution.
    pub feature_overrides: Vec<(String, bool)>,
    /// Arguments available as `$1`, `$2`, ... and `#argv`; `argv[0]` is
    /// conventionally the program name.
    pub argv: Vec<String>,
    /// `--shell` override for the process-wide default shell.
    pub default_shell: Option<String>,
    /// `--dry-run`: print commands instead of spawning them.
    pub dry_run: bool,
}

/// The result of one `Mewo::run` invocation.
pub struct MewoResult {
    pub exit_code: i32,
    pub error: Option<MewoError>,
}

/// Owns the interpreter state across a run; parsing happens fresh each
/// time since a Mewofile is small and re-parsing is cheap, matching how
/// the original CLI is a one-shot process per invocation.
pub struct Mewo {
    interp: Interpreter,
}

impl Mewo {
    pub fn new(options: MewoOptions) -> Self {
        let mut interp = Interpreter::new(options.argv, options.dry_run, options.default_shell);
        for (name, value) in options.defines {
            interp.vars.set(name, value);
        }
        for (name, enabled) in options.feature_overrides {
            if enabled {
                interp.features.enable(name);
            } else {
                interp.features.disable(&name);
            }
        }
        Self { interp }
    }

    /// Parses `source` and executes `label` (or the top level, if `None`).
    pub async fn run(&mut self, source: &str, label: Option<&str>) -> MewoResult {
        let outcome = parse(source);
        if let Some(err) = outcome.error {
            let err: MewoError = err.into();
            return MewoResult {
                exit_code: 1,
                error: Some(err),
            };
        }

        let executor = match Executor::new(&outcome.statements, &self.interp).await {
            Ok(e) => e,
            Err(err) => {
                return MewoResult {
                    exit_code: 1,
                    error: Some(err),
                }
            }
        };

        match executor.run(&mut self.interp, label).await {
            Ok(()) => MewoResult {
                exit_code: 0,
                error: None,
            },
            Err(err) => MewoResult {
                exit_code: 1,
                error: Some(err),
            },
        }
    }

    pub fn last_exit_code(&self) -> i32 {
        self.interp.last_exit_code
    }

    pub fn vars(&self) -> &crate::store::VariableStore {
        &self.interp.vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_variable_assignment_and_if() {
        let mut mewo = Mewo::new(MewoOptions {
            dry_run: true,
            argv: vec!["mewo".to_string()],
            ..Default::default()
        });
        let result = mewo
            .run(
                "x = 1\n#if(x)\ny = 2\n#else\ny = 3\n#endif\n",
                None,
            )
            .await;
        assert!(result.error.is_none());
        assert_eq!(mewo.vars().get("y"), Some(&Value::Number(2.0)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reports_parse_errors() {
        let mut mewo = Mewo::new(MewoOptions::default());
        let result = mewo.run("#if(true)\n", None).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.error.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_requested_label_only() {
        let mut mewo = Mewo::new(MewoOptions {
            dry_run: true,
            argv: vec!["mewo".to_string()],
            ..Default::default()
        });
        let result = mewo
            .run("a = 1\nbuild:\n    b = 2\nother:\n    c = 3\n", Some("build"))
            .await;
        assert!(result.error.is_none());
        assert_eq!(mewo.vars().get("a"), Some(&Value::Number(1.0)));
        assert_eq!(mewo.vars().get("b"), Some(&Value::Number(2.0)));
        assert_eq!(mewo.vars().get("c"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn defines_are_applied_before_execution() {
        let mut mewo = Mewo::new(MewoOptions {
            dry_run: true,
            argv: vec!["mewo".to_string()],
            defines: vec![("name".to_string(), Value::String("world".to_string()))],
            ..Default::default()
        });
        let result = mewo.run("greeting = \"hi ${name}\"\n", None).await;
        assert!(result.error.is_none());
        assert_eq!(
            mewo.vars().get("greeting"),
            Some(&Value::String("hi world".to_string()))
        );
    }
}
