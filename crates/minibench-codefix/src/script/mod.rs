//! Embedded interpreter for the JavaScript subset codefix scenarios use.
//!
//! Supports function declarations (optionally `export`ed), `const`/`let`/`var`
//! bindings with arrow and function expressions, the usual statements and
//! operators, and a small standard library (`Math`, `JSON`, array and string
//! methods). TypeScript annotations are skipped. Execution is bounded by a
//! step budget and a call-depth limit.

mod ast;
mod builtins;
mod error;
mod interp;
mod lexer;
mod parser;
mod value;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::error::HostError;
use crate::host::{FunctionHost, ScriptValue};

pub use error::{ScriptError, ScriptResult};
pub use interp::Limits;
pub use value::number_to_json;

use interp::Interpreter;
use parser::parse_program;
use value::Value;

/// Stack for the interpreter thread; recursion depth is capped well below it.
const INTERPRETER_STACK_BYTES: usize = 64 * 1024 * 1024;

/// Evaluate `program`, bind `entry` and call it once per argument tuple.
///
/// Synchronous; all calls share one interpreter and one step budget. With
/// the default call-depth limit this needs more than a default thread stack,
/// which is why only [`EmbeddedHost`] is public.
pub(crate) fn run_entry(
    program: &str,
    entry: &str,
    calls: &[Vec<Json>],
    limits: Limits,
) -> Result<Vec<ScriptValue>, HostError> {
    let ast = parse_program(program)?;
    let mut interp = Interpreter::new(limits);
    interp.run(&ast)?;

    let f = match interp.global(entry) {
        Some(f) if f.is_callable() => f,
        _ => return Err(HostError::EntryNotFound(entry.to_string())),
    };

    calls
        .iter()
        .map(|args| -> Result<ScriptValue, HostError> {
            let args = args.iter().map(Value::from_json).collect();
            let got = interp.call(&f, args)?;
            Ok(got.to_host())
        })
        .collect()
}

/// In-process host backed by the embedded interpreter.
///
/// Each invocation runs on its own thread with a large stack, so deeply
/// nested scripts cannot exhaust a runtime worker's stack.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedHost {
    limits: Limits,
}

impl EmbeddedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }
}

#[async_trait]
impl FunctionHost for EmbeddedHost {
    fn name(&self) -> &str {
        "embedded"
    }

    async fn invoke_all(
        &self,
        program: &str,
        entry: &str,
        calls: &[Vec<Json>],
    ) -> Result<Vec<ScriptValue>, HostError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let program = program.to_string();
        let entry = entry.to_string();
        let calls = calls.to_vec();
        let limits = self.limits;

        std::thread::Builder::new()
            .name("minibench-script".to_string())
            .stack_size(INTERPRETER_STACK_BYTES)
            .spawn(move || {
                let _ = tx.send(run_entry(&program, &entry, &calls, limits));
            })
            .map_err(|e| HostError::Unavailable(format!("cannot start interpreter thread: {}", e)))?;

        rx.await
            .map_err(|_| HostError::Protocol("interpreter thread ended without a result".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbers(values: &[ScriptValue]) -> Vec<f64> {
        values
            .iter()
            .map(|v| match v {
                ScriptValue::Number(n) => *n,
                other => panic!("expected number, got {:?}", other),
            })
            .collect()
    }

    #[test]
    fn runs_entry_for_each_call() {
        let got = run_entry(
            "function add(a, b) { return a + b; }",
            "add",
            &[vec![json!(1), json!(1)], vec![json!(2), json!(3)]],
            Limits::default(),
        )
        .unwrap();
        assert_eq!(numbers(&got), vec![2.0, 5.0]);
    }

    #[test]
    fn exported_typescript_functions_are_callable() {
        let src = "export function add(a: number, b: number): number {\n  return a + b;\n}\n";
        let got = run_entry(src, "add", &[vec![json!(2), json!(2)]], Limits::default()).unwrap();
        assert_eq!(numbers(&got), vec![4.0]);
    }

    #[test]
    fn const_arrow_entry_is_callable() {
        let got = run_entry(
            "const square = (x) => x * x;",
            "square",
            &[vec![json!(7)]],
            Limits::default(),
        )
        .unwrap();
        assert_eq!(numbers(&got), vec![49.0]);
    }

    #[test]
    fn missing_or_non_callable_entry() {
        let err = run_entry("const add = 3;", "add", &[], Limits::default()).unwrap_err();
        assert_eq!(err, HostError::EntryNotFound("add".into()));
        let err = run_entry("function sub() {}", "add", &[], Limits::default()).unwrap_err();
        assert_eq!(err, HostError::EntryNotFound("add".into()));
    }

    #[test]
    fn syntax_errors_surface_as_script_errors() {
        let err = run_entry("function add(a, b) { return a +; }", "add", &[], Limits::default())
            .unwrap_err();
        assert!(matches!(err, HostError::Script(ScriptError::Syntax { .. })));
    }

    #[test]
    fn deeply_nested_source_is_a_syntax_error_on_a_default_thread() {
        let src = format!(
            "function f() {{ return {}1{}; }}",
            "(".repeat(200),
            ")".repeat(200)
        );
        let err = run_entry(&src, "f", &[vec![]], Limits::default()).unwrap_err();
        assert_eq!(
            err,
            HostError::Script(ScriptError::syntax(1, "Maximum nesting depth exceeded"))
        );
    }

    #[test]
    fn returns_keep_their_type() {
        let got = run_entry(
            "function f(x) { if (x === 0) return 'zero'; if (x === 1) return null; if (x === 2) return [x]; }",
            "f",
            &[vec![json!(0)], vec![json!(1)], vec![json!(2)], vec![json!(3)]],
            Limits::default(),
        )
        .unwrap();
        assert_eq!(
            got,
            vec![
                ScriptValue::String("zero".into()),
                ScriptValue::Null,
                ScriptValue::Composite(json!([2])),
                ScriptValue::Undefined,
            ]
        );
    }

    #[tokio::test]
    async fn embedded_host_runs_off_the_runtime_thread() {
        let host = EmbeddedHost::new();
        let got = host
            .invoke_all(
                "function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }",
                "fact",
                &[vec![json!(5)], vec![json!(10)]],
            )
            .await
            .unwrap();
        assert_eq!(numbers(&got), vec![120.0, 3_628_800.0]);
    }

    #[tokio::test]
    async fn runaway_loops_are_stopped() {
        let host = EmbeddedHost::with_limits(Limits {
            max_steps: 5_000,
            max_call_depth: 50,
        });
        let err = host
            .invoke_all("function spin() { for (;;) {} }", "spin", &[vec![]])
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Script(ScriptError::Range(_))));
    }

    #[tokio::test]
    async fn deep_recursion_is_a_range_error() {
        let err = EmbeddedHost::new()
            .invoke_all("function down(n) { return down(n + 1); }", "down", &[vec![json!(0)]])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            HostError::Script(ScriptError::Range("Maximum call stack size exceeded".into()))
        );
    }
}
