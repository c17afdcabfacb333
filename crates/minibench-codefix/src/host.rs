//! Function hosts: materialize a program's entry function and call it.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HostError;
use crate::script::number_to_json;

/// A value returned across the host boundary.
///
/// Scalars keep their identity; arrays and objects are carried as JSON for
/// reporting and never compare equal to anything.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Composite(Value),
}

impl ScriptValue {
    pub fn from_json(json: &Value) -> Self {
        match json {
            Value::Null => ScriptValue::Null,
            Value::Bool(b) => ScriptValue::Bool(*b),
            Value::Number(n) => ScriptValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => ScriptValue::String(s.clone()),
            composite => ScriptValue::Composite(composite.clone()),
        }
    }

    /// Report form; `undefined` becomes `null`.
    pub fn to_json(&self) -> Value {
        match self {
            ScriptValue::Undefined | ScriptValue::Null => Value::Null,
            ScriptValue::Bool(b) => Value::Bool(*b),
            ScriptValue::Number(n) => number_to_json(*n),
            ScriptValue::String(s) => Value::String(s.clone()),
            ScriptValue::Composite(v) => v.clone(),
        }
    }

    /// `===` between a returned value and an expectation.
    pub fn strict_eq(&self, other: &ScriptValue) -> bool {
        match (self, other) {
            (ScriptValue::Undefined, ScriptValue::Undefined)
            | (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            _ => false,
        }
    }
}

/// Evaluates a program, binds `entry`, and calls it once per argument tuple.
///
/// Each `invoke_all` starts from a fresh environment. An exception in any
/// call fails the whole invocation.
#[async_trait]
pub trait FunctionHost: Send + Sync {
    /// Host name as selected by configuration (`embedded`, `node`).
    fn name(&self) -> &str;

    async fn invoke_all(
        &self,
        program: &str,
        entry: &str,
        calls: &[Vec<Value>],
    ) -> Result<Vec<ScriptValue>, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_compare_by_value() {
        assert!(ScriptValue::Number(2.0).strict_eq(&ScriptValue::from_json(&json!(2))));
        assert!(ScriptValue::String("a".into()).strict_eq(&ScriptValue::from_json(&json!("a"))));
        assert!(!ScriptValue::Number(2.0).strict_eq(&ScriptValue::String("2".into())));
        assert!(!ScriptValue::Undefined.strict_eq(&ScriptValue::Null));
        assert!(!ScriptValue::Number(f64::NAN).strict_eq(&ScriptValue::Number(f64::NAN)));
    }

    #[test]
    fn composites_are_never_equal() {
        let a = ScriptValue::from_json(&json!([1, 2]));
        assert!(!a.strict_eq(&a.clone()));
    }

    #[test]
    fn undefined_reports_as_null() {
        assert_eq!(ScriptValue::Undefined.to_json(), Value::Null);
        assert_eq!(ScriptValue::Number(3.0).to_json(), json!(3));
        assert_eq!(ScriptValue::Number(0.5).to_json(), json!(0.5));
    }
}
