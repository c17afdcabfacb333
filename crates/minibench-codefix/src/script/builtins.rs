//! Global objects and the methods of arrays, strings and numbers.

use serde::Serialize;
use serde_json::Value as Json;
use std::rc::Rc;

use super::error::ScriptError;
use super::interp::{check_len, make_error, Exec, Interpreter, Thrown};
use super::value::{
    number_to_string, same_value_zero, strict_equals, to_int32, to_uint32, ArrayRef, Native,
    Value,
};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

const GLOBAL_FUNCTIONS: &[&str] = &[
    "Number",
    "String",
    "Boolean",
    "Array",
    "Object",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "Error",
    "TypeError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
];

const STATICS: &[&str] = &[
    "Number.isInteger",
    "Number.isSafeInteger",
    "Number.isFinite",
    "Number.isNaN",
    "Number.parseInt",
    "Number.parseFloat",
    "Array.isArray",
    "Array.from",
    "Array.of",
    "Object.keys",
    "Object.values",
    "Object.entries",
    "Object.fromEntries",
    "String.fromCharCode",
];

const MATH_FUNCTIONS: &[&str] = &[
    "Math.abs",
    "Math.floor",
    "Math.ceil",
    "Math.round",
    "Math.trunc",
    "Math.sign",
    "Math.sqrt",
    "Math.cbrt",
    "Math.pow",
    "Math.min",
    "Math.max",
    "Math.log",
    "Math.log2",
    "Math.log10",
    "Math.exp",
    "Math.sin",
    "Math.cos",
    "Math.tan",
    "Math.asin",
    "Math.acos",
    "Math.atan",
    "Math.atan2",
    "Math.hypot",
];

const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("PI", std::f64::consts::PI),
    ("E", std::f64::consts::E),
    ("LN2", std::f64::consts::LN_2),
    ("LN10", std::f64::consts::LN_10),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("SQRT2", std::f64::consts::SQRT_2),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
];

const JSON_FUNCTIONS: &[&str] = &["JSON.stringify", "JSON.parse"];

const CONSOLE_FUNCTIONS: &[&str] = &[
    "console.log",
    "console.info",
    "console.warn",
    "console.error",
    "console.debug",
];

pub(super) const ARRAY_METHODS: &[&str] = &[
    "push",
    "pop",
    "shift",
    "unshift",
    "slice",
    "splice",
    "concat",
    "join",
    "toString",
    "reverse",
    "indexOf",
    "lastIndexOf",
    "includes",
    "at",
    "fill",
    "flat",
    "flatMap",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "filter",
    "map",
    "forEach",
    "some",
    "every",
    "reduce",
    "reduceRight",
    "sort",
];

pub(super) const STRING_METHODS: &[&str] = &[
    "charAt",
    "charCodeAt",
    "codePointAt",
    "indexOf",
    "lastIndexOf",
    "includes",
    "startsWith",
    "endsWith",
    "slice",
    "substring",
    "substr",
    "toUpperCase",
    "toLowerCase",
    "trim",
    "trimStart",
    "trimEnd",
    "padStart",
    "padEnd",
    "repeat",
    "split",
    "replace",
    "replaceAll",
    "concat",
    "at",
    "localeCompare",
    "toString",
];

pub(super) const NUMBER_METHODS: &[&str] = &["toFixed", "toString"];

/// Natives that may be used with `new`.
pub(super) fn is_constructor(name: &str) -> bool {
    matches!(
        name,
        "Array" | "Object" | "Error" | "TypeError" | "RangeError" | "ReferenceError" | "SyntaxError"
    )
}

/// `Number.MAX_SAFE_INTEGER`, `Array.isArray` and friends.
pub(super) fn native_static(owner: &str, key: &str) -> Option<Value> {
    if owner == "Number" {
        let constant = match key {
            "MAX_SAFE_INTEGER" => Some(MAX_SAFE_INTEGER),
            "MIN_SAFE_INTEGER" => Some(-MAX_SAFE_INTEGER),
            "EPSILON" => Some(f64::EPSILON),
            "MAX_VALUE" => Some(f64::MAX),
            "MIN_VALUE" => Some(5e-324),
            "POSITIVE_INFINITY" => Some(f64::INFINITY),
            "NEGATIVE_INFINITY" => Some(f64::NEG_INFINITY),
            "NaN" => Some(f64::NAN),
            _ => None,
        };
        if let Some(n) = constant {
            return Some(Value::Number(n));
        }
    }
    STATICS
        .iter()
        .find(|q| q.split_once('.') == Some((owner, key)))
        .map(|&q| Value::Native(Native(q)))
}

fn namespace(functions: &[&'static str], constants: &[(&str, f64)]) -> Value {
    let mut props: Vec<(String, Value)> = functions
        .iter()
        .map(|&q| {
            let member = q.rsplit('.').next().unwrap_or(q);
            (member.to_string(), Value::Native(Native(q)))
        })
        .collect();
    props.extend(
        constants
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Number(*v))),
    );
    Value::object(props)
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn type_error<T>(message: String) -> Exec<T> {
    Err(Thrown::Error(ScriptError::Type(message)))
}

fn range_error<T>(message: String) -> Exec<T> {
    Err(Thrown::Error(ScriptError::Range(message)))
}

fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

/// Resolve a possibly negative index argument against `len`.
fn relative_index(v: &Value, len: usize, default: usize) -> usize {
    if matches!(v, Value::Undefined) {
        return default;
    }
    let n = to_integer(v.to_number());
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn item_at(items: &ArrayRef, i: usize) -> Option<Value> {
    items.borrow().get(i).cloned()
}

fn own_entries(v: &Value) -> Vec<(String, Value)> {
    match v {
        Value::Object(props) => props.borrow().clone(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        Value::Str(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::string(c.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn char_value(c: char) -> Value {
    Value::string(c.to_string())
}

fn find_chars(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(hay.len()));
    }
    if needle.len() > hay.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()] == *needle)
}

fn rfind_chars(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > hay.len() {
        return None;
    }
    let last = (hay.len() - needle.len()).min(from);
    (0..=last)
        .rev()
        .find(|&i| hay[i..i + needle.len()] == *needle)
}

/// `Math.round`: halves round towards positive infinity.
pub(super) fn js_round(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// `parseInt`: leading whitespace and sign, optional `0x` prefix, then as
/// many digits of `radix` as are present.
pub(super) fn parse_int(input: &str, radix: f64) -> f64 {
    let s = input.trim_start();
    let (negative, mut s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut radix = to_int32(radix);
    let strip_prefix = radix == 0 || radix == 16;
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if strip_prefix && (s.starts_with("0x") || s.starts_with("0X")) {
        s = &s[2..];
        radix = 16;
    }

    let mut value = 0.0;
    let mut any = false;
    for c in s.chars() {
        match c.to_digit(radix as u32) {
            Some(d) => {
                value = value * radix as f64 + f64::from(d);
                any = true;
            }
            None => break,
        }
    }
    match (any, negative) {
        (false, _) => f64::NAN,
        (true, true) => -value,
        (true, false) => value,
    }
}

/// `parseFloat`: the longest numeric prefix after leading whitespace.
pub(super) fn parse_float(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;
    let negative = matches!(bytes.first(), Some(b'-'));
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        i += 1;
    }
    if s[i..].starts_with("Infinity") {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = &s[int_start..i];
    let mut frac_digits = "";
    if i < bytes.len() && bytes[i] == b'.' {
        let start = i + 1;
        let mut j = start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = &s[start..j];
        i = j;
    }
    if int_digits.is_empty() && frac_digits.is_empty() {
        return f64::NAN;
    }

    let mut exponent = "";
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > digits_start {
            exponent = &s[i + 1..j];
        }
    }

    let text = format!(
        "{}{}.{}e{}",
        if negative { "-" } else { "" },
        if int_digits.is_empty() { "0" } else { int_digits },
        if frac_digits.is_empty() { "0" } else { frac_digits },
        if exponent.is_empty() { "0" } else { exponent },
    );
    text.parse().unwrap_or(f64::NAN)
}

/// `toFixed`, rounding the exact binary value with ties going up.
fn to_fixed(x: f64, digits: usize) -> String {
    if !x.is_finite() || x.abs() >= 1e21 {
        return number_to_string(x);
    }
    let exact = format!("{:.1100}", x.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut out: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(digits))
        .map(|b| b - b'0')
        .collect();
    if frac_part.as_bytes().get(digits).is_some_and(|b| *b >= b'5') {
        let mut i = out.len();
        loop {
            if i == 0 {
                out.insert(0, 1);
                break;
            }
            i -= 1;
            if out[i] == 9 {
                out[i] = 0;
            } else {
                out[i] += 1;
                break;
            }
        }
    }

    let int_len = out.len() - digits;
    let mut text = String::with_capacity(out.len() + 2);
    if x < 0.0 {
        text.push('-');
    }
    text.extend(out[..int_len].iter().map(|d| char::from(b'0' + d)));
    if digits > 0 {
        text.push('.');
        text.extend(out[int_len..].iter().map(|d| char::from(b'0' + d)));
    }
    text
}

fn radix_string(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() {
        return number_to_string(n);
    }
    let r = f64::from(radix);
    let mut int = n.abs().trunc();
    let mut frac = n.abs() - int;

    let mut digits = Vec::new();
    if int == 0.0 {
        digits.push('0');
    }
    while int > 0.0 {
        let d = (int % r) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('0'));
        int = (int / r).trunc();
    }
    if n < 0.0 {
        digits.push('-');
    }
    digits.reverse();

    if frac > 0.0 {
        digits.push('.');
        for _ in 0..52 {
            frac *= r;
            let d = frac.trunc();
            digits.push(char::from_digit(d as u32, radix).unwrap_or('0'));
            frac -= d;
            if frac == 0.0 {
                break;
            }
        }
    }
    digits.into_iter().collect()
}

/// `JSON.stringify(value, null, indent)`.
fn json_text(value: &Value, indent: usize) -> Option<String> {
    if indent == 0 {
        return value.stringify();
    }
    value.stringify()?;
    let json: Json = value.to_json();
    let pad = " ".repeat(indent.min(10));
    let formatter = serde_json::ser::PrettyFormatter::with_indent(pad.as_bytes());
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    json.serialize(&mut ser).ok()?;
    String::from_utf8(buf).ok()
}

/// `$$` and `$&` substitutions in a replacement string.
fn expand_replacement(template: &str, matched: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    out.push('$');
                    continue;
                }
                Some('&') => {
                    chars.next();
                    out.push_str(matched);
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

fn math(name: &str, args: &[Value]) -> f64 {
    let x = arg(args, 0).to_number();
    let y = arg(args, 1).to_number();
    match name {
        "Math.abs" => x.abs(),
        "Math.floor" => x.floor(),
        "Math.ceil" => x.ceil(),
        "Math.round" => js_round(x),
        "Math.trunc" => x.trunc(),
        "Math.sign" => {
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        "Math.sqrt" => x.sqrt(),
        "Math.cbrt" => x.cbrt(),
        "Math.pow" => {
            if y.is_nan() || (x.abs() == 1.0 && y.is_infinite()) {
                f64::NAN
            } else {
                x.powf(y)
            }
        }
        "Math.min" => args.iter().fold(f64::INFINITY, |acc, v| {
            let n = v.to_number();
            if acc.is_nan() || n.is_nan() {
                f64::NAN
            } else {
                acc.min(n)
            }
        }),
        "Math.max" => args.iter().fold(f64::NEG_INFINITY, |acc, v| {
            let n = v.to_number();
            if acc.is_nan() || n.is_nan() {
                f64::NAN
            } else {
                acc.max(n)
            }
        }),
        "Math.log" => x.ln(),
        "Math.log2" => x.log2(),
        "Math.log10" => x.log10(),
        "Math.exp" => x.exp(),
        "Math.sin" => x.sin(),
        "Math.cos" => x.cos(),
        "Math.tan" => x.tan(),
        "Math.asin" => x.asin(),
        "Math.acos" => x.acos(),
        "Math.atan" => x.atan(),
        "Math.atan2" => x.atan2(y),
        "Math.hypot" => args
            .iter()
            .map(|v| v.to_number())
            .fold(0.0, |acc: f64, n| acc.hypot(n)),
        _ => f64::NAN,
    }
}

impl Interpreter {
    pub(super) fn install_globals(&mut self) {
        self.declare_global("undefined", Value::Undefined);
        self.declare_global("NaN", Value::Number(f64::NAN));
        self.declare_global("Infinity", Value::Number(f64::INFINITY));
        for &name in GLOBAL_FUNCTIONS {
            self.declare_global(name, Value::Native(Native(name)));
        }
        self.declare_global("Math", namespace(MATH_FUNCTIONS, MATH_CONSTANTS));
        self.declare_global("JSON", namespace(JSON_FUNCTIONS, &[]));
        self.declare_global("console", namespace(CONSOLE_FUNCTIONS, &[]));
    }

    pub(super) fn call_native(&mut self, name: &'static str, args: Vec<Value>) -> Exec<Value> {
        let a0 = arg(&args, 0);
        let value = match name {
            "Number" => Value::Number(if args.is_empty() { 0.0 } else { a0.to_number() }),
            "String" => Value::string(if args.is_empty() {
                String::new()
            } else {
                a0.to_display_string()
            }),
            "Boolean" => Value::Bool(a0.truthy()),
            "Array" => match (&a0, args.len()) {
                (Value::Number(n), 1) => {
                    let n = *n;
                    if n < 0.0 || n.fract() != 0.0 || !n.is_finite() {
                        return range_error("Invalid array length".into());
                    }
                    check_len(n as usize, "array")?;
                    Value::array(vec![Value::Undefined; n as usize])
                }
                _ => Value::array(args),
            },
            "Array.of" => Value::array(args),
            "Object" => match a0 {
                Value::Object(_) | Value::Array(_) => a0,
                _ => Value::object(Vec::new()),
            },
            "parseInt" | "Number.parseInt" => Value::Number(parse_int(
                &a0.to_display_string(),
                arg(&args, 1).to_number(),
            )),
            "parseFloat" | "Number.parseFloat" => {
                Value::Number(parse_float(&a0.to_display_string()))
            }
            "isNaN" => Value::Bool(a0.to_number().is_nan()),
            "isFinite" => Value::Bool(a0.to_number().is_finite()),
            "Number.isNaN" => Value::Bool(matches!(a0, Value::Number(n) if n.is_nan())),
            "Number.isFinite" => Value::Bool(matches!(a0, Value::Number(n) if n.is_finite())),
            "Number.isInteger" => Value::Bool(
                matches!(a0, Value::Number(n) if n.is_finite() && n.fract() == 0.0),
            ),
            "Number.isSafeInteger" => Value::Bool(matches!(
                a0,
                Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
            )),
            "Error" | "TypeError" | "RangeError" | "ReferenceError" | "SyntaxError" => {
                let message = match a0 {
                    Value::Undefined => String::new(),
                    other => other.to_display_string(),
                };
                make_error(name, &message)
            }
            "Array.isArray" => Value::Bool(matches!(a0, Value::Array(_))),
            "Array.from" => {
                let items: Vec<Value> = match &a0 {
                    Value::Array(items) => items.borrow().clone(),
                    Value::Str(s) => s.chars().map(char_value).collect(),
                    _ => Vec::new(),
                };
                let mapper = arg(&args, 1);
                if mapper.is_callable() {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.into_iter().enumerate() {
                        out.push(self.call_value(&mapper, vec![item, Value::Number(i as f64)])?);
                    }
                    Value::array(out)
                } else {
                    Value::array(items)
                }
            }
            "Object.keys" => Value::array(
                own_entries(&a0)
                    .into_iter()
                    .map(|(k, _)| Value::string(k))
                    .collect(),
            ),
            "Object.values" => {
                Value::array(own_entries(&a0).into_iter().map(|(_, v)| v).collect())
            }
            "Object.entries" => Value::array(
                own_entries(&a0)
                    .into_iter()
                    .map(|(k, v)| Value::array(vec![Value::string(k), v]))
                    .collect(),
            ),
            "Object.fromEntries" => {
                let mut props: Vec<(String, Value)> = Vec::new();
                if let Value::Array(pairs) = &a0 {
                    for pair in pairs.borrow().iter() {
                        let Value::Array(kv) = pair else {
                            return type_error("Iterator value is not an entry object".into());
                        };
                        let kv = kv.borrow();
                        let key = kv.first().cloned().unwrap_or(Value::Undefined);
                        let value = kv.get(1).cloned().unwrap_or(Value::Undefined);
                        let key = key.to_display_string();
                        match props.iter_mut().find(|(k, _)| *k == key) {
                            Some(slot) => slot.1 = value,
                            None => props.push((key, value)),
                        }
                    }
                }
                Value::object(props)
            }
            "String.fromCharCode" => Value::string(
                args.iter()
                    .map(|a| char::from_u32(to_uint32(a.to_number()) & 0xFFFF).unwrap_or('\u{FFFD}'))
                    .collect::<String>(),
            ),
            "JSON.stringify" => {
                let indent = match arg(&args, 2) {
                    Value::Number(n) if n >= 1.0 => n as usize,
                    _ => 0,
                };
                json_text(&a0, indent)
                    .map(Value::string)
                    .unwrap_or(Value::Undefined)
            }
            "JSON.parse" => match serde_json::from_str::<Json>(&a0.to_display_string()) {
                Ok(json) => Value::from_json(&json),
                Err(e) => return Err(Thrown::Value(make_error("SyntaxError", &e.to_string()))),
            },
            "console.log" | "console.info" | "console.warn" | "console.error"
            | "console.debug" => {
                let line = args
                    .iter()
                    .map(Value::to_display_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::debug!(target: "minibench::script", stream = name, "{}", line);
                Value::Undefined
            }
            _ if name.starts_with("Math.") => Value::Number(math(name, &args)),
            _ => return type_error(format!("{} is not a function", name)),
        };
        Ok(value)
    }

    pub(super) fn call_method(&mut self, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
        match receiver {
            Value::Array(items) => self.array_method(receiver, items, name, args),
            Value::Str(s) => self.string_method(s, name, args),
            Value::Number(n) => number_method(*n, name, &args),
            Value::Bool(b) if name == "toString" => Ok(Value::string(b.to_string())),
            _ => type_error(format!("{} is not a function", name)),
        }
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    fn array_method(
        &mut self,
        this: &Value,
        items: &ArrayRef,
        name: &str,
        args: Vec<Value>,
    ) -> Exec<Value> {
        let len = items.borrow().len();
        let a0 = arg(&args, 0);
        let value = match name {
            "push" => {
                let mut v = items.borrow_mut();
                check_len(v.len() + args.len(), "array")?;
                v.extend(args);
                Value::Number(v.len() as f64)
            }
            "pop" => items.borrow_mut().pop().unwrap_or(Value::Undefined),
            "shift" => {
                let mut v = items.borrow_mut();
                if v.is_empty() {
                    Value::Undefined
                } else {
                    v.remove(0)
                }
            }
            "unshift" => {
                let mut v = items.borrow_mut();
                check_len(v.len() + args.len(), "array")?;
                v.splice(0..0, args);
                Value::Number(v.len() as f64)
            }
            "slice" => {
                let start = relative_index(&a0, len, 0);
                let end = relative_index(&arg(&args, 1), len, len);
                let v = items.borrow();
                Value::array(if start < end {
                    v[start..end].to_vec()
                } else {
                    Vec::new()
                })
            }
            "splice" => {
                let start = relative_index(&a0, len, 0);
                let delete = match args.len() {
                    0 => 0,
                    1 => len - start,
                    _ => (to_integer(args[1].to_number()).max(0.0) as usize).min(len - start),
                };
                let inserts: Vec<Value> = args.into_iter().skip(2).collect();
                let mut v = items.borrow_mut();
                check_len(v.len() + inserts.len(), "array")?;
                let removed: Vec<Value> = v.splice(start..start + delete, inserts).collect();
                Value::array(removed)
            }
            "concat" => {
                let mut out = items.borrow().clone();
                for a in args {
                    match a {
                        Value::Array(other) => {
                            let other = other.borrow().clone();
                            out.extend(other);
                        }
                        other => out.push(other),
                    }
                    check_len(out.len(), "array")?;
                }
                Value::array(out)
            }
            "join" | "toString" => {
                let sep = match (name, &a0) {
                    ("join", Value::Undefined) | ("toString", _) => ",".to_string(),
                    (_, sep) => sep.to_display_string(),
                };
                let parts: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|v| {
                        if v.is_nullish() {
                            String::new()
                        } else {
                            v.to_display_string()
                        }
                    })
                    .collect();
                let joined = parts.join(&sep);
                check_len(joined.len(), "string")?;
                Value::string(joined)
            }
            "reverse" => {
                items.borrow_mut().reverse();
                this.clone()
            }
            "indexOf" => {
                let from = relative_index(&arg(&args, 1), len, 0);
                let v = items.borrow();
                let found = (from..len).find(|&i| strict_equals(&v[i], &a0));
                Value::Number(found.map_or(-1.0, |i| i as f64))
            }
            "lastIndexOf" => {
                let v = items.borrow();
                let found = (0..len).rev().find(|&i| strict_equals(&v[i], &a0));
                Value::Number(found.map_or(-1.0, |i| i as f64))
            }
            "includes" => {
                let from = relative_index(&arg(&args, 1), len, 0);
                let v = items.borrow();
                Value::Bool(v[from..].iter().any(|x| same_value_zero(x, &a0)))
            }
            "at" => {
                let n = to_integer(a0.to_number());
                let index = if n < 0.0 { len as f64 + n } else { n };
                if index < 0.0 {
                    Value::Undefined
                } else {
                    item_at(items, index as usize).unwrap_or(Value::Undefined)
                }
            }
            "fill" => {
                let start = relative_index(&arg(&args, 1), len, 0);
                let end = relative_index(&arg(&args, 2), len, len);
                let mut v = items.borrow_mut();
                for slot in v.iter_mut().take(end).skip(start) {
                    *slot = a0.clone();
                }
                this.clone()
            }
            "flat" => {
                let depth = match a0 {
                    Value::Undefined => 1.0,
                    other => to_integer(other.to_number()).min(128.0),
                };
                let mut out = Vec::new();
                flatten_into(&mut out, &items.borrow(), depth)?;
                Value::array(out)
            }
            "sort" => {
                let cmp = match a0 {
                    Value::Undefined => None,
                    f if f.is_callable() => Some(f),
                    _ => {
                        return type_error(
                            "The comparison function must be either a function or undefined"
                                .into(),
                        )
                    }
                };
                let snapshot = items.borrow().clone();
                let sorted = self.merge_sort(snapshot, cmp.as_ref())?;
                *items.borrow_mut() = sorted;
                this.clone()
            }
            "reduce" | "reduceRight" => {
                let f = callback(&a0)?;
                let order: Vec<usize> = if name == "reduce" {
                    (0..len).collect()
                } else {
                    (0..len).rev().collect()
                };
                let mut order = order.into_iter();
                let mut acc = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match order.next().and_then(|i| item_at(items, i)) {
                        Some(first) => first,
                        None => {
                            return type_error("Reduce of empty array with no initial value".into())
                        }
                    },
                };
                for i in order {
                    let Some(item) = item_at(items, i) else {
                        continue;
                    };
                    acc = self.call_value(
                        &f,
                        vec![acc, item, Value::Number(i as f64), this.clone()],
                    )?;
                }
                acc
            }
            _ => return self.array_iteration(this, items, name, &a0),
        };
        Ok(value)
    }

    /// Methods that call a predicate or mapper once per element.
    fn array_iteration(
        &mut self,
        this: &Value,
        items: &ArrayRef,
        name: &str,
        f: &Value,
    ) -> Exec<Value> {
        let f = callback(f)?;
        let len = items.borrow().len();
        let order: Vec<usize> = if matches!(name, "findLast" | "findLastIndex") {
            (0..len).rev().collect()
        } else {
            (0..len).collect()
        };

        let mut out = Vec::new();
        for i in order {
            let item = item_at(items, i).unwrap_or(Value::Undefined);
            let result =
                self.call_value(&f, vec![item.clone(), Value::Number(i as f64), this.clone()])?;
            match name {
                "find" | "findLast" if result.truthy() => return Ok(item),
                "findIndex" | "findLastIndex" if result.truthy() => {
                    return Ok(Value::Number(i as f64))
                }
                "some" if result.truthy() => return Ok(Value::Bool(true)),
                "every" if !result.truthy() => return Ok(Value::Bool(false)),
                "filter" if result.truthy() => out.push(item),
                "map" => out.push(result),
                "flatMap" => match result {
                    Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
                    other => out.push(other),
                },
                _ => {}
            }
            check_len(out.len(), "array")?;
        }

        Ok(match name {
            "find" | "findLast" | "forEach" => Value::Undefined,
            "findIndex" | "findLastIndex" => Value::Number(-1.0),
            "some" => Value::Bool(false),
            "every" => Value::Bool(true),
            "filter" | "map" | "flatMap" => Value::array(out),
            _ => return type_error(format!("{} is not a function", name)),
        })
    }

    /// Stable merge sort; undefined elements always sort last.
    fn merge_sort(&mut self, mut v: Vec<Value>, cmp: Option<&Value>) -> Exec<Vec<Value>> {
        if v.len() <= 1 {
            return Ok(v);
        }
        let right = v.split_off(v.len() / 2);
        let left = self.merge_sort(v, cmp)?;
        let right = self.merge_sort(right, cmp)?;

        let mut out = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            if self.sort_order(&left[i], &right[j], cmp)? > 0.0 {
                out.push(right[j].clone());
                j += 1;
            } else {
                out.push(left[i].clone());
                i += 1;
            }
        }
        out.extend_from_slice(&left[i..]);
        out.extend_from_slice(&right[j..]);
        Ok(out)
    }

    fn sort_order(&mut self, a: &Value, b: &Value, cmp: Option<&Value>) -> Exec<f64> {
        match (a, b) {
            (Value::Undefined, Value::Undefined) => return Ok(0.0),
            (Value::Undefined, _) => return Ok(1.0),
            (_, Value::Undefined) => return Ok(-1.0),
            _ => {}
        }
        match cmp {
            Some(f) => {
                let n = self.call_value(f, vec![a.clone(), b.clone()])?.to_number();
                Ok(if n.is_nan() { 0.0 } else { n })
            }
            None => Ok(match a.to_display_string().cmp(&b.to_display_string()) {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    fn string_method(&mut self, s: &Rc<str>, name: &str, args: Vec<Value>) -> Exec<Value> {
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len();
        let a0 = arg(&args, 0);
        let a1 = arg(&args, 1);
        let text_of = |v: &Value| -> Vec<char> { v.to_display_string().chars().collect() };

        let value = match name {
            "charAt" => {
                let i = to_integer(a0.to_number());
                Value::string(
                    (i >= 0.0)
                        .then(|| chars.get(i as usize))
                        .flatten()
                        .map(|c| c.to_string())
                        .unwrap_or_default(),
                )
            }
            "charCodeAt" | "codePointAt" => {
                let i = to_integer(a0.to_number());
                match (i >= 0.0).then(|| chars.get(i as usize)).flatten() {
                    Some(c) => Value::Number(f64::from(u32::from(*c))),
                    None if name == "charCodeAt" => Value::Number(f64::NAN),
                    None => Value::Undefined,
                }
            }
            "at" => {
                let n = to_integer(a0.to_number());
                let index = if n < 0.0 { len as f64 + n } else { n };
                if index < 0.0 {
                    Value::Undefined
                } else {
                    chars
                        .get(index as usize)
                        .map(|c| char_value(*c))
                        .unwrap_or(Value::Undefined)
                }
            }
            "indexOf" => {
                let from = relative_index(&a1, len, 0).min(len);
                let from = if to_integer(a1.to_number()) < 0.0 { 0 } else { from };
                Value::Number(find_chars(&chars, &text_of(&a0), from).map_or(-1.0, |i| i as f64))
            }
            "lastIndexOf" => {
                let from = match a1.to_number() {
                    n if n.is_nan() => len,
                    n => n.max(0.0).min(len as f64) as usize,
                };
                Value::Number(rfind_chars(&chars, &text_of(&a0), from).map_or(-1.0, |i| i as f64))
            }
            "includes" => {
                let from = relative_index(&a1, len, 0);
                Value::Bool(find_chars(&chars, &text_of(&a0), from).is_some())
            }
            "startsWith" => {
                let needle = text_of(&a0);
                let pos = relative_index(&a1, len, 0);
                Value::Bool(chars[pos..].starts_with(&needle))
            }
            "endsWith" => {
                let needle = text_of(&a0);
                let end = relative_index(&a1, len, len);
                Value::Bool(chars[..end].ends_with(&needle))
            }
            "slice" => {
                let start = relative_index(&a0, len, 0);
                let end = relative_index(&a1, len, len);
                Value::string(if start < end {
                    chars[start..end].iter().collect::<String>()
                } else {
                    String::new()
                })
            }
            "substring" => {
                let clamp = |v: &Value, default: usize| match v {
                    Value::Undefined => default,
                    other => to_integer(other.to_number()).max(0.0).min(len as f64) as usize,
                };
                let (a, b) = (clamp(&a0, 0), clamp(&a1, len));
                let (start, end) = if a <= b { (a, b) } else { (b, a) };
                Value::string(chars[start..end].iter().collect::<String>())
            }
            "substr" => {
                let start = relative_index(&a0, len, 0);
                let count = match a1 {
                    Value::Undefined => len - start,
                    other => (to_integer(other.to_number()).max(0.0) as usize).min(len - start),
                };
                Value::string(chars[start..start + count].iter().collect::<String>())
            }
            "toUpperCase" => Value::string(s.to_uppercase()),
            "toLowerCase" => Value::string(s.to_lowercase()),
            "trim" => Value::string(s.trim()),
            "trimStart" => Value::string(s.trim_start()),
            "trimEnd" => Value::string(s.trim_end()),
            "padStart" | "padEnd" => {
                let target = to_integer(a0.to_number()).max(0.0) as usize;
                check_len(target, "string")?;
                let filler: Vec<char> = match a1 {
                    Value::Undefined => vec![' '],
                    other => text_of(&other),
                };
                if target <= len || filler.is_empty() {
                    Value::Str(s.clone())
                } else {
                    let pad: String = filler.iter().cycle().take(target - len).collect();
                    Value::string(if name == "padStart" {
                        format!("{}{}", pad, s)
                    } else {
                        format!("{}{}", s, pad)
                    })
                }
            }
            "repeat" => {
                let n = to_integer(a0.to_number());
                if n < 0.0 || n.is_infinite() {
                    return range_error(format!("Invalid count value: {}", number_to_string(n)));
                }
                check_len(s.len().saturating_mul(n as usize), "string")?;
                Value::string(s.repeat(n as usize))
            }
            "split" => {
                let limit = match a1 {
                    Value::Undefined => usize::MAX,
                    other => to_uint32(other.to_number()) as usize,
                };
                let parts: Vec<Value> = match a0 {
                    Value::Undefined => vec![Value::Str(s.clone())],
                    sep => {
                        let sep = sep.to_display_string();
                        if sep.is_empty() {
                            chars.iter().map(|c| char_value(*c)).collect()
                        } else {
                            s.split(sep.as_str()).map(Value::string).collect()
                        }
                    }
                };
                Value::array(parts.into_iter().take(limit).collect())
            }
            "replace" | "replaceAll" => {
                let pattern = a0.to_display_string();
                let matches: Vec<usize> = if name == "replace" {
                    s.find(pattern.as_str()).into_iter().collect()
                } else {
                    s.match_indices(pattern.as_str()).map(|(i, _)| i).collect()
                };
                let mut out = String::with_capacity(s.len());
                let mut last = 0;
                for offset in matches {
                    out.push_str(&s[last..offset]);
                    let replacement = if a1.is_callable() {
                        let position = s[..offset].chars().count();
                        self.call_value(
                            &a1,
                            vec![
                                Value::string(pattern.as_str()),
                                Value::Number(position as f64),
                                Value::Str(s.clone()),
                            ],
                        )?
                        .to_display_string()
                    } else {
                        expand_replacement(&a1.to_display_string(), &pattern)
                    };
                    out.push_str(&replacement);
                    check_len(out.len(), "string")?;
                    last = offset + pattern.len();
                }
                out.push_str(&s[last..]);
                Value::string(out)
            }
            "concat" => {
                let mut out = s.to_string();
                for a in &args {
                    out.push_str(&a.to_display_string());
                }
                check_len(out.len(), "string")?;
                Value::string(out)
            }
            "localeCompare" => {
                let other = a0.to_display_string();
                Value::Number(match (**s).cmp(other.as_str()) {
                    std::cmp::Ordering::Less => -1.0,
                    std::cmp::Ordering::Equal => 0.0,
                    std::cmp::Ordering::Greater => 1.0,
                })
            }
            "toString" => Value::Str(s.clone()),
            _ => return type_error(format!("{} is not a function", name)),
        };
        Ok(value)
    }
}

fn callback(f: &Value) -> Exec<Value> {
    if f.is_callable() {
        Ok(f.clone())
    } else {
        type_error(format!("{} is not a function", f.to_display_string()))
    }
}

fn flatten_into(out: &mut Vec<Value>, items: &[Value], depth: f64) -> Exec<()> {
    for item in items {
        match item {
            Value::Array(inner) if depth >= 1.0 => {
                let inner = inner.borrow().clone();
                flatten_into(out, &inner, depth - 1.0)?;
            }
            other => out.push(other.clone()),
        }
        check_len(out.len(), "array")?;
    }
    Ok(())
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Exec<Value> {
    match name {
        "toFixed" => {
            let digits = to_integer(arg(args, 0).to_number());
            if !(0.0..=100.0).contains(&digits) {
                return range_error("toFixed() digits argument must be between 0 and 100".into());
            }
            Ok(Value::string(to_fixed(n, digits as usize)))
        }
        "toString" => {
            let radix = match arg(args, 0) {
                Value::Undefined => 10.0,
                other => to_integer(other.to_number()),
            };
            if !(2.0..=36.0).contains(&radix) {
                return range_error("toString() radix must be between 2 and 36".into());
            }
            Ok(Value::string(radix_string(n, radix as u32)))
        }
        _ => type_error(format!("{} is not a function", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::interp::Limits;
    use crate::script::parser::parse_program;

    fn eval(body: &str) -> Value {
        let src = format!("function main() {{ {} }}", body);
        let program = parse_program(&src).unwrap();
        let mut interp = Interpreter::new(Limits::default());
        interp.run(&program).unwrap();
        let main = interp.global("main").unwrap();
        interp.call(&main, vec![]).unwrap()
    }

    fn text(body: &str) -> String {
        eval(body).to_display_string()
    }

    #[test]
    fn math_functions() {
        assert_eq!(text("return [Math.floor(2.7), Math.ceil(2.1), Math.abs(-3)];"), "2,3,3");
        assert_eq!(text("return [Math.round(2.5), Math.round(-2.5), Math.round(0.49)];"), "3,-2,0");
        assert_eq!(text("return [Math.max(1, 9, 3), Math.min(), Math.max()];"), "9,Infinity,-Infinity");
        assert_eq!(text("return Math.max(1, NaN);"), "NaN");
        assert_eq!(text("return Math.PI > 3.14 && Math.PI < 3.15;"), "true");
    }

    #[test]
    fn array_methods() {
        assert_eq!(text("const a = [1, 2, 3]; a.push(4); return a.map(x => x * 2).join('-');"), "2-4-6-8");
        assert_eq!(text("return [1, 2, 3, 4].filter(x => x % 2 === 0);"), "2,4");
        assert_eq!(text("return [1, 2, 3].reduce((a, b) => a + b, 10);"), "16");
        assert_eq!(text("return [1, 2, 3].reduce((a, b) => a + b);"), "6");
        assert_eq!(text("return [3, 1, 2].find(x => x < 3);"), "1");
        assert_eq!(text("return [3, 1, 2].findIndex(x => x > 5);"), "-1");
        assert_eq!(text("return [1, [2, [3]]].flat();"), "1,2,3");
        assert_eq!(text("return [1, 2, 3, 4, 5].slice(-2);"), "4,5");
        assert_eq!(text("const a = [1, 2, 3, 4]; const r = a.splice(1, 2, 'x'); return a.join() + '|' + r.join();"), "1,x,4|2,3");
        assert_eq!(text("return [NaN].includes(NaN) && [NaN].indexOf(NaN) === -1;"), "true");
        assert_eq!(text("return [1, 2, 3].at(-1);"), "3");
    }

    #[test]
    fn sort_is_stable_and_defaults_to_string_order() {
        assert_eq!(text("return [10, 9, 1, 100].sort();"), "1,10,100,9");
        assert_eq!(text("return [10, 9, 1, 100].sort((a, b) => a - b);"), "1,9,10,100");
        let stable = "const xs = [{k: 1, v: 'a'}, {k: 0, v: 'b'}, {k: 1, v: 'c'}, {k: 0, v: 'd'}];\
                      return xs.sort((p, q) => p.k - q.k).map(x => x.v).join('');";
        assert_eq!(text(stable), "bdac");
    }

    #[test]
    fn reduce_of_empty_array_throws() {
        let program = parse_program("function f() { return [].reduce((a, b) => a + b); }").unwrap();
        let mut interp = Interpreter::new(Limits::default());
        interp.run(&program).unwrap();
        let f = interp.global("f").unwrap();
        let err = interp.call(&f, vec![]).unwrap_err();
        assert_eq!(err, ScriptError::Type("Reduce of empty array with no initial value".into()));
    }

    #[test]
    fn string_methods() {
        assert_eq!(text("return 'Hello'.toUpperCase() + 'WORLD'.toLowerCase();"), "HELLOworld");
        assert_eq!(text("return '  pad '.trim().padStart(5, '*');"), "**pad");
        assert_eq!(text("return 'a,b,,c'.split(',').length;"), "4");
        assert_eq!(text("return 'abc'.split('');"), "a,b,c");
        assert_eq!(text("return 'banana'.indexOf('an', 2);"), "3");
        assert_eq!(text("return 'banana'.lastIndexOf('an');"), "3");
        assert_eq!(text("return 'banana'.replace('a', 'o');"), "bonana");
        assert_eq!(text("return 'banana'.replaceAll('a', 'o');"), "bonono");
        assert_eq!(text("return 'abc'.replace('b', m => m.toUpperCase());"), "aBc");
        assert_eq!(text("return 'hello'.slice(1, -1) + 'hello'.substring(3, 1);"), "ellel");
        assert_eq!(text("return 'ab'.repeat(3);"), "ababab");
        assert_eq!(text("return 'héllo'.length;"), "5");
        assert_eq!(text("return 'abc'.charCodeAt(1);"), "98");
    }

    #[test]
    fn repeat_rejects_negative_counts() {
        let program = parse_program("function f() { return 'x'.repeat(-1); }").unwrap();
        let mut interp = Interpreter::new(Limits::default());
        interp.run(&program).unwrap();
        let f = interp.global("f").unwrap();
        let err = interp.call(&f, vec![]).unwrap_err();
        assert_eq!(err, ScriptError::Range("Invalid count value: -1".into()));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(text("return (1.005).toFixed(2);"), "1.00");
        assert_eq!(text("return (2.5).toFixed(0);"), "3");
        assert_eq!(text("return (1234.5678).toFixed(1);"), "1234.6");
        assert_eq!(text("return (-0.004).toFixed(2);"), "-0.00");
        assert_eq!(text("return (255).toString(16);"), "ff");
        assert_eq!(text("return (5).toString(2);"), "101");
        assert_eq!(text("return (-0.5).toString(2);"), "-0.1");
    }

    #[test]
    fn global_conversions() {
        assert_eq!(text("return [parseInt('42px'), parseInt('0x1A'), parseInt('z', 36)];"), "42,26,35");
        assert_eq!(text("return isNaN(parseInt('px'));"), "true");
        assert_eq!(text("return [parseFloat('3.14abc'), parseFloat('.5'), parseFloat('-1e3x')];"), "3.14,0.5,-1000");
        assert_eq!(text("return [Number('12'), Number(''), String(12), Boolean('')];"), "12,0,12,false");
        assert_eq!(text("return Number.isInteger(5) && !Number.isInteger(5.5);"), "true");
        assert_eq!(text("return Number.MAX_SAFE_INTEGER;"), "9007199254740991");
    }

    #[test]
    fn json_round_trip() {
        assert_eq!(text("return JSON.stringify({a: [1, 'x', null], b: undefined});"), r#"{"a":[1,"x",null]}"#);
        assert_eq!(text("return JSON.parse('[1, 2, 3]').length;"), "3");
        assert!(matches!(eval("return JSON.stringify(undefined);"), Value::Undefined));
        assert_eq!(text("return JSON.stringify([1], null, 2);"), "[\n  1\n]");
    }

    #[test]
    fn object_statics() {
        assert_eq!(text("return Object.keys({a: 1, b: 2});"), "a,b");
        assert_eq!(text("return Object.values({a: 1, b: 2});"), "1,2");
        assert_eq!(text("return Object.entries({a: 1}).length;"), "1");
        assert_eq!(text("return Object.fromEntries([['x', 1]]).x;"), "1");
        assert_eq!(text("return Array.isArray([]) && !Array.isArray('x');"), "true");
        assert_eq!(text("return Array.from('abc', c => c + c);"), "aa,bb,cc");
    }

    #[test]
    fn error_constructors_build_catchable_objects() {
        assert_eq!(text("try { throw new RangeError('nope'); } catch (e) { return e.name + ':' + e.message; }"), "RangeError:nope");
        assert_eq!(text("return String(new Error('x'));"), "Error: x");
    }
}
