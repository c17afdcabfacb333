//! Runtime values and the primitive conversions the interpreter relies on.

use serde_json::{Map, Number, Value as Json};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::interp::Closure;
use crate::host::ScriptValue;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
/// Insertion-ordered properties.
pub type ObjectRef = Rc<RefCell<Vec<(String, Value)>>>;

/// JSON nesting beyond this renders as `null` (also stops cycles).
const MAX_JSON_DEPTH: usize = 64;

/// A builtin function, identified by its qualified name (`Math.floor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Native(pub &'static str);

/// A builtin method already bound to its receiver (`[1, 2].map`).
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<Closure>),
    Native(Native),
    Method(Rc<BoundMethod>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(props: Vec<(String, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(props)))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_) | Value::Method(_))
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) | Value::Native(_) | Value::Method(_) => "function",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Property lookup on plain objects.
    pub fn get_own(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(props) => props
                .borrow()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    /// Arrays and objects become strings, everything else is unchanged.
    pub fn to_primitive(&self) -> Value {
        match self {
            Value::Array(_) | Value::Object(_) => Value::string(self.to_display_string()),
            other => other.clone(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_display_string()),
            _ => f64::NAN,
        }
    }

    pub fn to_display_string(&self) -> String {
        self.display_at(0)
    }

    fn display_at(&self, depth: usize) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => {
                if depth > MAX_JSON_DEPTH {
                    return String::new();
                }
                items
                    .borrow()
                    .iter()
                    .map(|v| {
                        if v.is_nullish() {
                            String::new()
                        } else {
                            v.display_at(depth + 1)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            }
            Value::Object(_) => match (self.get_own("name"), self.get_own("message")) {
                (Some(name), Some(message)) => {
                    format!("{}: {}", name.to_display_string(), message.to_display_string())
                }
                _ => "[object Object]".to_string(),
            },
            Value::Function(closure) => {
                format!("function {}() {{ [code] }}", closure.def.name.as_deref().unwrap_or(""))
            }
            Value::Native(native) => format!("function {}() {{ [native code] }}", native.0),
            Value::Method(method) => format!("function {}() {{ [native code] }}", method.name),
        }
    }

    /// Build a runtime value from JSON test data.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::string(s.as_str()),
            Json::Array(items) => Value::array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON rendering with `JSON.stringify` conventions: undefined and
    /// functions vanish from objects and become `null` in arrays, and
    /// non-finite numbers become `null`.
    pub fn to_json(&self) -> Json {
        self.json_at(0).unwrap_or(Json::Null)
    }

    fn json_at(&self, depth: usize) -> Option<Json> {
        if depth > MAX_JSON_DEPTH {
            return Some(Json::Null);
        }
        match self {
            Value::Undefined | Value::Function(_) | Value::Native(_) | Value::Method(_) => None,
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(Json::Bool(*b)),
            Value::Number(n) => Some(number_to_json(*n)),
            Value::Str(s) => Some(Json::String(s.to_string())),
            Value::Array(items) => Some(Json::Array(
                items
                    .borrow()
                    .iter()
                    .map(|v| v.json_at(depth + 1).unwrap_or(Json::Null))
                    .collect(),
            )),
            Value::Object(props) => {
                let mut map = Map::new();
                for (k, v) in props.borrow().iter() {
                    if let Some(json) = v.json_at(depth + 1) {
                        map.insert(k.clone(), json);
                    }
                }
                Some(Json::Object(map))
            }
        }
    }

    /// `JSON.stringify`: `None` where the script would get `undefined`.
    pub fn stringify(&self) -> Option<String> {
        self.json_at(0).map(|json| json.to_string())
    }

    /// Hand a result across the host boundary.
    pub fn to_host(&self) -> ScriptValue {
        match self {
            Value::Undefined => ScriptValue::Undefined,
            Value::Null => ScriptValue::Null,
            Value::Bool(b) => ScriptValue::Bool(*b),
            Value::Number(n) => ScriptValue::Number(*n),
            Value::Str(s) => ScriptValue::String(s.to_string()),
            other => ScriptValue::Composite(other.to_json()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// `===`: primitives by value, everything else by identity.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => x == y,
        (Value::Method(x), Value::Method(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// `includes` semantics: like `===` except NaN equals NaN.
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

/// `==` with the usual coercions.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (x, y) if x.is_nullish() || y.is_nullish() => x.is_nullish() && y.is_nullish(),
        (Value::Number(_), Value::Number(_))
        | (Value::Str(_), Value::Str(_))
        | (Value::Bool(_), Value::Bool(_)) => strict_equals(a, b),
        (Value::Bool(x), other) => loose_equals(&Value::Number(f64::from(u8::from(*x))), other),
        (other, Value::Bool(y)) => loose_equals(other, &Value::Number(f64::from(u8::from(*y)))),
        (Value::Number(n), Value::Str(_)) | (Value::Str(_), Value::Number(n)) => {
            let other = if matches!(a, Value::Number(_)) { b } else { a };
            *n == other.to_number()
        }
        (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::Str(_)) => {
            loose_equals(&a.to_primitive(), b)
        }
        (Value::Number(_) | Value::Str(_), Value::Array(_) | Value::Object(_)) => {
            loose_equals(a, &b.to_primitive())
        }
        _ => strict_equals(a, b),
    }
}

/// `Number("...")`: whitespace-trimmed, empty is zero, hex/octal/binary
/// prefixes and `Infinity` accepted, anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    let radix = match t.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => 10,
    };
    if radix != 10 {
        let digits = &t[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return f64::NAN;
        }
        return digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let looks_numeric = t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !looks_numeric {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// `Number.prototype.toString()` for radix 10.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let sign = if n < 0.0 { "-" } else { "" };
    // Shortest round-trip digits and exponent, e.g. "1.5e-7".
    let sci = format!("{:e}", n.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exp: i32 = exp.parse().unwrap_or(0);
    let k = digits.len() as i32;
    // Value is 0.DIGITS x 10^point.
    let point = exp + 1;

    let body = if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let e = point - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, e_sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, e_sign, e.abs())
        }
    };
    format!("{}{}", sign, body)
}

/// Integral values in the safe range serialize without a fraction.
pub fn number_to_json(n: f64) -> Json {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Json::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
    }
}

pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

pub fn to_uint32(n: f64) -> u32 {
    to_int32(n) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_print_like_scripts_do() {
        assert_eq!(number_to_string(42.0), "42");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(123456789012345680000.0), "123456789012345680000");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(-2.5e-8), "-2.5e-8");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn string_to_number_coercions() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn strict_equality_rules() {
        assert!(strict_equals(&Value::Number(2.0), &Value::Number(2.0)));
        assert!(!strict_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(!strict_equals(&Value::Number(2.0), &Value::string("2")));
        assert!(!strict_equals(&Value::Null, &Value::Undefined));
        let a = Value::array(vec![]);
        assert!(strict_equals(&a, &a.clone()));
        assert!(!strict_equals(&a, &Value::array(vec![])));
    }

    #[test]
    fn loose_equality_rules() {
        assert!(loose_equals(&Value::Null, &Value::Undefined));
        assert!(loose_equals(&Value::Number(2.0), &Value::string("2")));
        assert!(loose_equals(&Value::Bool(true), &Value::Number(1.0)));
        assert!(!loose_equals(&Value::Null, &Value::Number(0.0)));
        assert!(loose_equals(
            &Value::array(vec![Value::Number(1.0)]),
            &Value::string("1")
        ));
    }

    #[test]
    fn json_conversion_follows_stringify() {
        let v = Value::object(vec![
            ("a".into(), Value::Number(1.0)),
            ("skip".into(), Value::Undefined),
            (
                "list".into(),
                Value::array(vec![Value::Undefined, Value::Number(f64::NAN), Value::Number(0.5)]),
            ),
        ]);
        assert_eq!(v.to_json(), json!({"a": 1, "list": [null, null, 0.5]}));
        assert_eq!(Value::from_json(&json!([1, "x"])).to_display_string(), "1,x");
    }

    #[test]
    fn int32_wraps() {
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_uint32(-1.0), u32::MAX);
        assert_eq!(to_int32(f64::NAN), 0);
    }
}
