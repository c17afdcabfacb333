//! Function host that runs patched code under a `node` subprocess.
//!
//! A generated CommonJS harness reads the program and the argument tuples
//! from stdin, builds the entry function with `new Function`, calls it once
//! per tuple and prints a tagged JSON verdict on its last line.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

use crate::error::HostError;
use crate::host::{FunctionHost, ScriptValue};
use crate::script::ScriptError;

/// Prefix of the verdict line on the harness's stdout.
const VERDICT_MARKER: &str = "__MINIBENCH__";

const HARNESS: &str = r#""use strict";
const __input = JSON.parse(require("fs").readFileSync(0, "utf8"));
const __program = __input.program;
const __calls = __input.calls;
const __encode = (v) => {
  if (v === undefined) return { t: "undefined" };
  if (v === null) return { t: "null" };
  switch (typeof v) {
    case "boolean": return { t: "bool", v };
    case "number": return Number.isFinite(v) ? { t: "number", v } : { t: "number", s: String(v) };
    case "string": return { t: "string", v };
    default:
      try { return { t: "composite", v: JSON.parse(JSON.stringify(v) ?? "null") }; }
      catch (e) { return { t: "composite", v: null }; }
  }
};
let __verdict;
try {
  const __fn = new Function(`"use strict"; ${__program}; return typeof __ENTRY__ === "function" ? __ENTRY__ : null;`)();
  if (typeof __fn !== "function") {
    __verdict = { ok: false, kind: "entry-not-found" };
  } else {
    __verdict = { ok: true, results: __calls.map((args) => __encode(__fn(...args))) };
  }
} catch (e) {
  __verdict = {
    ok: false,
    kind: "exception",
    name: e && e.name ? String(e.name) : "Error",
    message: String(e && e.message !== undefined ? e.message : e),
  };
}
process.stdout.write("\n__MINIBENCH__" + JSON.stringify(__verdict) + "\n");
"#;

#[derive(Debug, Deserialize)]
#[serde(tag = "t", rename_all = "lowercase")]
enum Encoded {
    Undefined,
    Null,
    Bool { v: bool },
    Number {
        #[serde(default)]
        v: Option<f64>,
        #[serde(default)]
        s: Option<String>,
    },
    String { v: String },
    Composite { v: Value },
}

impl From<Encoded> for ScriptValue {
    fn from(encoded: Encoded) -> Self {
        match encoded {
            Encoded::Undefined => ScriptValue::Undefined,
            Encoded::Null => ScriptValue::Null,
            Encoded::Bool { v } => ScriptValue::Bool(v),
            Encoded::Number { v: Some(n), .. } => ScriptValue::Number(n),
            Encoded::Number { s, .. } => ScriptValue::Number(match s.as_deref() {
                Some("Infinity") => f64::INFINITY,
                Some("-Infinity") => f64::NEG_INFINITY,
                _ => f64::NAN,
            }),
            Encoded::String { v } => ScriptValue::String(v),
            Encoded::Composite { v } => ScriptValue::Composite(v),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Verdict {
    ok: bool,
    #[serde(default)]
    results: Vec<Encoded>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Whether `entry` can be spliced into the harness as a bare identifier.
fn is_identifier(entry: &str) -> bool {
    let mut chars = entry.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Drop leading `export` / `export default` keywords, which are not valid
/// inside a function body.
fn strip_exports(program: &str) -> String {
    program
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let indent = &line[..line.len() - trimmed.len()];
            match trimmed.strip_prefix("export ") {
                Some(rest) => {
                    let rest = rest.trim_start();
                    let rest = rest.strip_prefix("default ").unwrap_or(rest);
                    format!("{}{}", indent, rest)
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_harness(entry: &str) -> String {
    HARNESS.replace("__ENTRY__", entry)
}

fn render_input(program: &str, calls: &[Vec<Value>]) -> String {
    json!({ "program": strip_exports(program), "calls": calls }).to_string()
}

fn parse_verdict(stdout: &str, entry: &str, expected: usize) -> Result<Vec<ScriptValue>, HostError> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|l| l.strip_prefix(VERDICT_MARKER))
        .ok_or_else(|| HostError::Protocol("no verdict line in node output".to_string()))?;
    let verdict: Verdict = serde_json::from_str(line)
        .map_err(|e| HostError::Protocol(format!("malformed verdict: {}", e)))?;

    if verdict.ok {
        if verdict.results.len() != expected {
            return Err(HostError::Protocol(format!(
                "expected {} results, got {}",
                expected,
                verdict.results.len()
            )));
        }
        return Ok(verdict.results.into_iter().map(ScriptValue::from).collect());
    }

    match verdict.kind.as_deref() {
        Some("entry-not-found") => Err(HostError::EntryNotFound(entry.to_string())),
        _ => {
            let message = verdict.message.unwrap_or_default();
            let err = match verdict.name.as_deref() {
                Some("TypeError") => ScriptError::Type(message),
                Some("RangeError") => ScriptError::Range(message),
                Some("ReferenceError") => ScriptError::Reference(message),
                Some("SyntaxError") => ScriptError::syntax(0, message),
                _ => ScriptError::Thrown(message),
            };
            Err(HostError::Script(err))
        }
    }
}

/// Runs each verification in a fresh `node` process.
#[derive(Debug, Clone)]
pub struct NodeHost {
    node_bin: PathBuf,
    timeout_ms: u64,
}

impl NodeHost {
    pub fn new(node_bin: impl AsRef<Path>, timeout_ms: u64) -> Self {
        Self {
            node_bin: node_bin.as_ref().to_path_buf(),
            timeout_ms,
        }
    }

    /// Whether the configured binary starts at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.node_bin)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl FunctionHost for NodeHost {
    fn name(&self) -> &str {
        "node"
    }

    async fn invoke_all(
        &self,
        program: &str,
        entry: &str,
        calls: &[Vec<Value>],
    ) -> Result<Vec<ScriptValue>, HostError> {
        if !is_identifier(entry) {
            return Err(HostError::EntryNotFound(entry.to_string()));
        }
        let harness = render_harness(entry);
        let input = render_input(program, calls);

        let mut script = tempfile::Builder::new()
            .prefix("minibench-")
            .suffix(".cjs")
            .tempfile()
            .map_err(|e| HostError::Unavailable(format!("cannot create harness file: {}", e)))?;
        script
            .write_all(harness.as_bytes())
            .and_then(|_| script.flush())
            .map_err(|e| HostError::Unavailable(format!("cannot write harness file: {}", e)))?;

        let mut child = Command::new(&self.node_bin)
            .arg(script.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HostError::Unavailable(format!("cannot start {}: {}", self.node_bin.display(), e))
            })?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| HostError::Unavailable("node stdin is not piped".to_string()))?;

        let run = async move {
            stdin.write_all(input.as_bytes()).await?;
            drop(stdin);
            child.wait_with_output().await
        };
        let output = tokio::time::timeout(Duration::from_millis(self.timeout_ms), run)
            .await
            .map_err(|_| {
                warn!(
                    node_bin = %self.node_bin.display(),
                    timeout_ms = self.timeout_ms,
                    "node host timed out"
                );
                HostError::Timeout { ms: self.timeout_ms }
            })?
            .map_err(|e| HostError::Unavailable(format!("node did not finish: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_verdict(&stdout, entry, calls.len()).map_err(|err| match err {
            HostError::Protocol(reason) if !output.status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
                HostError::Protocol(format!("{} (node exited with {}: {})", reason, output.status, last))
            }
            other => other,
        })
    }
}
