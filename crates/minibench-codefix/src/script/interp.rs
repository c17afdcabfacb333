//! Tree-walking evaluator.
//!
//! Execution is bounded by [`Limits`]: every statement, loop iteration and
//! call consumes one step, and closure calls may nest only so deep. Running
//! out of steps cannot be caught by the script.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::ast::{
    AssignOp, BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, LogicalOp, Stmt, UnaryOp,
};
use super::error::{ScriptError, ScriptResult};
use super::value::{
    loose_equals, number_to_string, strict_equals, to_int32, to_uint32, BoundMethod, Native,
    Value,
};

/// Upper bound on string and array lengths a script may build.
pub(super) const MAX_COLLECTION_LEN: usize = 1 << 24;

/// Execution budget for one interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_steps: u64,
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 500_000,
            max_call_depth: 200,
        }
    }
}

// ----------------------------------------------------------------------
// Scopes and closures
// ----------------------------------------------------------------------

#[derive(Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

pub struct Scope {
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<Rc<Scope>>,
    function_scope: bool,
}

impl Scope {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.vars.borrow().get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref()?.lookup(name)
    }

    fn assign(&self, name: &str, value: Value) -> ScriptResult<()> {
        {
            let mut vars = self.vars.borrow_mut();
            if let Some(binding) = vars.get_mut(name) {
                if !binding.mutable {
                    return Err(ScriptError::Type("Assignment to constant variable.".into()));
                }
                binding.value = value;
                return Ok(());
            }
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(ScriptError::Reference(format!("{} is not defined", name))),
        }
    }

    fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.vars
            .borrow_mut()
            .insert(name.to_string(), Binding { value, mutable });
    }
}

/// A function value together with the scope it closed over.
pub struct Closure {
    pub def: Rc<FunctionDef>,
    scope: Rc<Scope>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.def.name)
            .field("params", &self.def.params.len())
            .finish()
    }
}

// ----------------------------------------------------------------------
// Control flow
// ----------------------------------------------------------------------

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Why evaluation unwound.
pub(super) enum Thrown {
    /// A catchable engine error.
    Error(ScriptError),
    /// A value raised with `throw`.
    Value(Value),
    /// Budget exhaustion; skips `catch` and `finally`.
    Abort(ScriptError),
}

impl From<ScriptError> for Thrown {
    fn from(err: ScriptError) -> Self {
        Thrown::Error(err)
    }
}

pub(super) type Exec<T> = Result<T, Thrown>;

enum Place<'e> {
    Var(&'e str),
    Prop(Value, Value),
}

enum ForOfSource {
    Array(super::value::ArrayRef),
    Chars(Vec<char>),
}

/// `{ name, message }` as produced by the `Error` constructors.
pub(super) fn make_error(name: &str, message: &str) -> Value {
    Value::object(vec![
        ("name".to_string(), Value::string(name)),
        ("message".to_string(), Value::string(message)),
    ])
}

/// Map an uncaught throw back to an engine error.
fn error_from_thrown(value: &Value) -> ScriptError {
    let Some(message) = value.get_own("message") else {
        return ScriptError::Thrown(value.to_display_string());
    };
    let message = message.to_display_string();
    let name = value
        .get_own("name")
        .map(|n| n.to_display_string())
        .unwrap_or_default();
    match name.as_str() {
        "TypeError" => ScriptError::Type(message),
        "RangeError" => ScriptError::Range(message),
        "ReferenceError" => ScriptError::Reference(message),
        _ => ScriptError::Thrown(message),
    }
}

/// Human-readable name of a callee for error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => format!("{}.{}", describe(object), property),
        Expr::Index { object, .. } => format!("{}[...]", describe(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

pub(super) fn check_len(len: usize, what: &str) -> ScriptResult<()> {
    if len > MAX_COLLECTION_LEN {
        return Err(ScriptError::Range(format!("Invalid {} length", what)));
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Operators
// ----------------------------------------------------------------------

fn js_pow(base: f64, exp: f64) -> f64 {
    if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exp)
    }
}

/// `<` style comparison; `None` when either side is NaN.
fn compare(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    let (l, r) = (l.to_primitive(), r.to_primitive());
    match (&l, &r) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    }
}

pub(super) fn binary_op(op: BinaryOp, l: &Value, r: &Value) -> ScriptResult<Value> {
    use std::cmp::Ordering::{Equal, Greater, Less};

    let num = |f: fn(f64, f64) -> f64| Value::Number(f(l.to_number(), r.to_number()));
    let value = match op {
        BinaryOp::Add => {
            let (lp, rp) = (l.to_primitive(), r.to_primitive());
            if matches!(lp, Value::Str(_)) || matches!(rp, Value::Str(_)) {
                let joined = format!("{}{}", lp.to_display_string(), rp.to_display_string());
                check_len(joined.len(), "string")?;
                Value::string(joined)
            } else {
                Value::Number(lp.to_number() + rp.to_number())
            }
        }
        BinaryOp::Sub => num(|a, b| a - b),
        BinaryOp::Mul => num(|a, b| a * b),
        BinaryOp::Div => num(|a, b| a / b),
        BinaryOp::Rem => num(|a, b| a % b),
        BinaryOp::Pow => num(js_pow),
        BinaryOp::Eq => Value::Bool(loose_equals(l, r)),
        BinaryOp::NotEq => Value::Bool(!loose_equals(l, r)),
        BinaryOp::StrictEq => Value::Bool(strict_equals(l, r)),
        BinaryOp::StrictNotEq => Value::Bool(!strict_equals(l, r)),
        BinaryOp::Lt => Value::Bool(compare(l, r) == Some(Less)),
        BinaryOp::LtEq => Value::Bool(matches!(compare(l, r), Some(Less | Equal))),
        BinaryOp::Gt => Value::Bool(compare(l, r) == Some(Greater)),
        BinaryOp::GtEq => Value::Bool(matches!(compare(l, r), Some(Greater | Equal))),
        BinaryOp::BitAnd => Value::Number(f64::from(to_int32(l.to_number()) & to_int32(r.to_number()))),
        BinaryOp::BitOr => Value::Number(f64::from(to_int32(l.to_number()) | to_int32(r.to_number()))),
        BinaryOp::BitXor => Value::Number(f64::from(to_int32(l.to_number()) ^ to_int32(r.to_number()))),
        BinaryOp::Shl => {
            let shift = to_uint32(r.to_number()) & 31;
            Value::Number(f64::from(to_int32(l.to_number()).wrapping_shl(shift)))
        }
        BinaryOp::Shr => {
            let shift = to_uint32(r.to_number()) & 31;
            Value::Number(f64::from(to_int32(l.to_number()) >> shift))
        }
        BinaryOp::UShr => {
            let shift = to_uint32(r.to_number()) & 31;
            Value::Number(f64::from(to_uint32(l.to_number()) >> shift))
        }
    };
    Ok(value)
}

/// Whether a logical operator returns its left operand without evaluating
/// the right one.
fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.truthy(),
        LogicalOp::Or => left.truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

// ----------------------------------------------------------------------
// Interpreter
// ----------------------------------------------------------------------

pub struct Interpreter {
    global: Rc<Scope>,
    /// Every scope ever created, so reference cycles through closures can
    /// be cut when the interpreter goes away.
    arena: Vec<Weak<Scope>>,
    compact_at: usize,
    steps: u64,
    depth: usize,
    limits: Limits,
}

impl Interpreter {
    pub fn new(limits: Limits) -> Self {
        let global = Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: None,
            function_scope: true,
        });
        let mut interp = Self {
            arena: vec![Rc::downgrade(&global)],
            global,
            compact_at: 1024,
            steps: 0,
            depth: 0,
            limits,
        };
        interp.install_globals();
        interp
    }

    /// Execute a program's top level.
    pub fn run(&mut self, program: &[Stmt]) -> ScriptResult<()> {
        let global = self.global.clone();
        self.exec_stmts(program, &global)
            .map(|_| ())
            .map_err(|t| self.into_error(t))
    }

    /// Read a global binding.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.global.lookup(name)
    }

    pub(super) fn declare_global(&self, name: &str, value: Value) {
        self.global.declare(name, value, true);
    }

    /// Call a function value from outside the script.
    pub fn call(&mut self, f: &Value, args: Vec<Value>) -> ScriptResult<Value> {
        if !f.is_callable() {
            return Err(ScriptError::Type(format!("{} is not a function", f.type_of())));
        }
        self.call_value(f, args).map_err(|t| self.into_error(t))
    }

    fn into_error(&self, thrown: Thrown) -> ScriptError {
        match thrown {
            Thrown::Error(e) | Thrown::Abort(e) => e,
            Thrown::Value(v) => error_from_thrown(&v),
        }
    }

    fn tick(&mut self) -> Exec<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(Thrown::Abort(ScriptError::Range(format!(
                "Execution step budget of {} exceeded",
                self.limits.max_steps
            ))));
        }
        Ok(())
    }

    fn new_scope(&mut self, parent: &Rc<Scope>, function_scope: bool) -> Rc<Scope> {
        self.scope_with(parent.clone(), function_scope, HashMap::new())
    }

    fn scope_with(
        &mut self,
        parent: Rc<Scope>,
        function_scope: bool,
        vars: HashMap<String, Binding>,
    ) -> Rc<Scope> {
        let scope = Rc::new(Scope {
            vars: RefCell::new(vars),
            parent: Some(parent),
            function_scope,
        });
        self.arena.push(Rc::downgrade(&scope));
        if self.arena.len() >= self.compact_at {
            self.arena.retain(|w| w.strong_count() > 0);
            self.compact_at = (self.arena.len() * 2).max(1024);
        }
        scope
    }

    /// A fresh scope holding copies of `scope`'s bindings (per-iteration
    /// `let` bindings in `for` loops).
    fn copy_scope(&mut self, scope: &Rc<Scope>) -> Rc<Scope> {
        let vars = scope.vars.borrow().clone();
        match &scope.parent {
            Some(parent) => self.scope_with(parent.clone(), scope.function_scope, vars),
            None => scope.clone(),
        }
    }

    fn function_scope_of(scope: &Rc<Scope>) -> Rc<Scope> {
        let mut current = scope.clone();
        while !current.function_scope {
            match &current.parent {
                Some(parent) => {
                    let parent = parent.clone();
                    current = parent;
                }
                None => break,
            }
        }
        current
    }

    fn closure(&mut self, def: &Rc<FunctionDef>, scope: &Rc<Scope>, bind_own_name: bool) -> Value {
        match (&def.name, bind_own_name) {
            (Some(name), true) => {
                let own = self.new_scope(scope, false);
                let value = Value::Function(Rc::new(Closure {
                    def: def.clone(),
                    scope: own.clone(),
                }));
                own.declare(name, value.clone(), false);
                value
            }
            _ => Value::Function(Rc::new(Closure {
                def: def.clone(),
                scope: scope.clone(),
            })),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Run a statement list in `scope`, hoisting function declarations.
    fn exec_stmts(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> Exec<Flow> {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt {
                if let Some(name) = &def.name {
                    let value = self.closure(def, scope, false);
                    scope.declare(name, value, true);
                }
            }
        }
        for stmt in stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> Exec<Flow> {
        self.tick()?;
        match stmt {
            Stmt::Empty | Stmt::Function(_) => Ok(Flow::Normal),
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
            Stmt::VarDecl { kind, decls } => {
                for decl in decls {
                    let value = match &decl.init {
                        Some(init) => self.eval(init, scope)?,
                        None => Value::Undefined,
                    };
                    match kind {
                        DeclKind::Var => {
                            let target = Self::function_scope_of(scope);
                            let existing = target.vars.borrow().contains_key(&decl.name);
                            if !existing || decl.init.is_some() {
                                target.declare(&decl.name, value, true);
                            }
                        }
                        DeclKind::Let => scope.declare(&decl.name, value, true),
                        DeclKind::Const => scope.declare(&decl.name, value, false),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(arg) => {
                let value = match arg {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.exec_stmt(then, scope)
                } else if let Some(otherwise) = otherwise {
                    self.exec_stmt(otherwise, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { test, body } => {
                while self.eval(test, scope)?.truthy() {
                    self.tick()?;
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Continue | Flow::Normal => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile { body, test } => {
                loop {
                    self.tick()?;
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Continue | Flow::Normal => {}
                    }
                    if !self.eval(test, scope)?.truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let mut iter_scope = self.new_scope(scope, false);
                if let Some(init) = init {
                    self.exec_stmt(init, &iter_scope)?;
                }
                loop {
                    self.tick()?;
                    if let Some(test) = test {
                        if !self.eval(test, &iter_scope)?.truthy() {
                            break;
                        }
                    }
                    match self.exec_stmt(body, &iter_scope)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Continue | Flow::Normal => {}
                    }
                    iter_scope = self.copy_scope(&iter_scope);
                    if let Some(update) = update {
                        self.eval(update, &iter_scope)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ForOf {
                kind,
                name,
                iterable,
                body,
            } => self.exec_for_of(*kind, name, iterable, body, scope),
            Stmt::Block(stmts) => {
                let inner = self.new_scope(scope, false);
                self.exec_stmts(stmts, &inner)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => {
                let value = self.eval(expr, scope)?;
                Err(Thrown::Value(value))
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let inner = self.new_scope(scope, false);
                let result = match (self.exec_stmts(block, &inner), handler.as_deref()) {
                    (Err(Thrown::Error(e)), Some(handler)) => {
                        let caught = make_error(e.class_name(), e.message());
                        self.exec_catch(param.as_deref(), caught, handler, scope)
                    }
                    (Err(Thrown::Value(v)), Some(handler)) => {
                        self.exec_catch(param.as_deref(), v, handler, scope)
                    }
                    (other, _) => other,
                };

                if matches!(result, Err(Thrown::Abort(_))) {
                    return result;
                }
                if let Some(finalizer) = finalizer {
                    let fin_scope = self.new_scope(scope, false);
                    match self.exec_stmts(finalizer, &fin_scope)? {
                        Flow::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                result
            }
        }
    }

    fn exec_catch(
        &mut self,
        param: Option<&str>,
        caught: Value,
        handler: &[Stmt],
        scope: &Rc<Scope>,
    ) -> Exec<Flow> {
        let catch_scope = self.new_scope(scope, false);
        if let Some(param) = param {
            catch_scope.declare(param, caught, true);
        }
        self.exec_stmts(handler, &catch_scope)
    }

    fn exec_for_of(
        &mut self,
        kind: DeclKind,
        name: &str,
        iterable: &Expr,
        body: &Stmt,
        scope: &Rc<Scope>,
    ) -> Exec<Flow> {
        let source = match self.eval(iterable, scope)? {
            Value::Array(items) => ForOfSource::Array(items),
            Value::Str(s) => ForOfSource::Chars(s.chars().collect()),
            _ => {
                return Err(ScriptError::Type(format!("{} is not iterable", describe(iterable))).into())
            }
        };

        let mut index = 0;
        loop {
            self.tick()?;
            let item = match &source {
                ForOfSource::Array(items) => items.borrow().get(index).cloned(),
                ForOfSource::Chars(chars) => chars.get(index).map(|c| Value::string(c.to_string())),
            };
            let Some(item) = item else {
                break;
            };
            index += 1;

            let iter_scope = self.new_scope(scope, false);
            match kind {
                DeclKind::Var => Self::function_scope_of(scope).declare(name, item, true),
                DeclKind::Let => iter_scope.declare(name, item, true),
                DeclKind::Const => iter_scope.declare(name, item, false),
            }
            match self.exec_stmt(body, &iter_scope)? {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Continue | Flow::Normal => {}
            }
        }
        Ok(Flow::Normal)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Exec<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::string(s.as_str())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| ScriptError::Reference(format!("{} is not defined", name)).into()),
            Expr::Array(items) => {
                let values = self.eval_list(items, scope)?;
                Ok(Value::array(values))
            }
            Expr::Object(props) => {
                let mut out: Vec<(String, Value)> = Vec::with_capacity(props.len());
                for (key, expr) in props {
                    let value = self.eval(expr, scope)?;
                    match out.iter_mut().find(|(k, _)| k == key) {
                        Some(slot) => slot.1 = value,
                        None => out.push((key.clone(), value)),
                    }
                }
                Ok(Value::object(out))
            }
            Expr::Function(def) => Ok(self.closure(def, scope, true)),
            Expr::Spread(_) => {
                Err(ScriptError::Type("Spread syntax is not allowed here".into()).into())
            }
            Expr::Unary { op, arg } => self.eval_unary(*op, arg, scope),
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let place = self.resolve_place(target, scope)?;
                let old = self.read_place(&place, scope)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write_place(&place, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                Ok(binary_op(*op, &l, &r)?)
            }
            Expr::Logical { op, left, right } => {
                let l = self.eval(left, scope)?;
                if short_circuits(*op, &l) {
                    Ok(l)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Assign { op, target, value } => {
                let place = self.resolve_place(target, scope)?;
                let new = match op {
                    AssignOp::Assign => self.eval(value, scope)?,
                    AssignOp::Binary(bop) => {
                        let current = self.read_place(&place, scope)?;
                        let rhs = self.eval(value, scope)?;
                        binary_op(*bop, &current, &rhs)?
                    }
                    AssignOp::Logical(lop) => {
                        let current = self.read_place(&place, scope)?;
                        if short_circuits(*lop, &current) {
                            return Ok(current);
                        }
                        self.eval(value, scope)?
                    }
                };
                self.write_place(&place, new.clone(), scope)?;
                Ok(new)
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            }
            Expr::New { callee, args } => {
                let ctor = self.eval(callee, scope)?;
                let args = self.eval_list(args, scope)?;
                match ctor {
                    Value::Native(Native(name)) if super::builtins::is_constructor(name) => {
                        self.call_native(name, args)
                    }
                    _ => Err(ScriptError::Type(format!("{} is not a constructor", describe(callee))).into()),
                }
            }
            Expr::Call { .. } | Expr::Member { .. } | Expr::Index { .. } => {
                Ok(self.eval_chain(expr, scope)?.unwrap_or(Value::Undefined))
            }
        }
    }

    /// Member/index/call chains; `None` when an optional link short-circuits.
    fn eval_chain(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Exec<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(obj) = self.eval_chain(object, scope)? else {
                    return Ok(None);
                };
                if *optional && obj.is_nullish() {
                    return Ok(None);
                }
                Ok(Some(self.get_property(&obj, property)?))
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let Some(obj) = self.eval_chain(object, scope)? else {
                    return Ok(None);
                };
                if *optional && obj.is_nullish() {
                    return Ok(None);
                }
                let key = self.eval(index, scope)?;
                Ok(Some(self.get_indexed(&obj, &key)?))
            }
            Expr::Call { callee, args } => {
                let Some(f) = self.eval_chain(callee, scope)? else {
                    return Ok(None);
                };
                let args = self.eval_list(args, scope)?;
                if !f.is_callable() {
                    return Err(
                        ScriptError::Type(format!("{} is not a function", describe(callee))).into(),
                    );
                }
                Ok(Some(self.call_value(&f, args)?))
            }
            other => Ok(Some(self.eval(other, scope)?)),
        }
    }

    /// Evaluate array elements or call arguments, expanding spreads.
    fn eval_list(&mut self, items: &[Expr], scope: &Rc<Scope>) -> Exec<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Expr::Spread(inner) => match self.eval(inner, scope)? {
                    Value::Array(values) => out.extend(values.borrow().iter().cloned()),
                    Value::Str(s) => out.extend(s.chars().map(|c| Value::string(c.to_string()))),
                    _ => {
                        return Err(ScriptError::Type(format!(
                            "{} is not iterable",
                            describe(inner)
                        ))
                        .into())
                    }
                },
                other => out.push(self.eval(other, scope)?),
            }
            check_len(out.len(), "array")?;
        }
        Ok(out)
    }

    fn eval_unary(&mut self, op: UnaryOp, arg: &Expr, scope: &Rc<Scope>) -> Exec<Value> {
        if op == UnaryOp::Typeof {
            if let Expr::Ident(name) = arg {
                return Ok(Value::string(
                    scope.lookup(name).map_or("undefined", |v| v.type_of()),
                ));
            }
            return Ok(Value::string(self.eval(arg, scope)?.type_of()));
        }
        let value = self.eval(arg, scope)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::BitNot => Value::Number(f64::from(!to_int32(value.to_number()))),
            UnaryOp::Void | UnaryOp::Typeof => Value::Undefined,
        })
    }

    fn resolve_place<'e>(&mut self, target: &'e Expr, scope: &Rc<Scope>) -> Exec<Place<'e>> {
        match target {
            Expr::Ident(name) => Ok(Place::Var(name.as_str())),
            Expr::Member {
                object, property, ..
            } => {
                let obj = self.eval(object, scope)?;
                Ok(Place::Prop(obj, Value::string(property.as_str())))
            }
            Expr::Index { object, index, .. } => {
                let obj = self.eval(object, scope)?;
                let key = self.eval(index, scope)?;
                Ok(Place::Prop(obj, key))
            }
            _ => Err(ScriptError::Type("Invalid assignment target".into()).into()),
        }
    }

    fn read_place(&mut self, place: &Place<'_>, scope: &Rc<Scope>) -> Exec<Value> {
        match place {
            Place::Var(name) => scope
                .lookup(name)
                .ok_or_else(|| ScriptError::Reference(format!("{} is not defined", name)).into()),
            Place::Prop(obj, key) => self.get_indexed(obj, key),
        }
    }

    fn write_place(&mut self, place: &Place<'_>, value: Value, scope: &Rc<Scope>) -> Exec<()> {
        match place {
            Place::Var(name) => Ok(scope.assign(name, value)?),
            Place::Prop(obj, key) => Ok(self.set_property(obj, key, value)?),
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    fn get_indexed(&mut self, obj: &Value, key: &Value) -> Exec<Value> {
        if let Value::Number(n) = key {
            if *n >= 0.0 && n.fract() == 0.0 {
                let index = *n as usize;
                match obj {
                    Value::Array(items) => {
                        return Ok(items.borrow().get(index).cloned().unwrap_or(Value::Undefined))
                    }
                    Value::Str(s) => {
                        return Ok(s
                            .chars()
                            .nth(index)
                            .map(|c| Value::string(c.to_string()))
                            .unwrap_or(Value::Undefined))
                    }
                    _ => {}
                }
            }
        }
        let key = match key {
            Value::Number(n) => number_to_string(*n),
            other => other.to_display_string(),
        };
        self.get_property(obj, &key)
    }

    pub(super) fn get_property(&mut self, obj: &Value, key: &str) -> Exec<Value> {
        let method = |name: &str| {
            Value::Method(Rc::new(BoundMethod {
                receiver: obj.clone(),
                name: name.to_string(),
            }))
        };
        let value = match obj {
            Value::Undefined | Value::Null => {
                return Err(ScriptError::Type(format!(
                    "Cannot read properties of {} (reading '{}')",
                    obj.to_display_string(),
                    key
                ))
                .into())
            }
            Value::Array(items) => {
                if key == "length" {
                    Value::Number(items.borrow().len() as f64)
                } else if let Some(index) = array_index(key) {
                    items.borrow().get(index).cloned().unwrap_or(Value::Undefined)
                } else if super::builtins::ARRAY_METHODS.contains(&key) {
                    method(key)
                } else {
                    Value::Undefined
                }
            }
            Value::Str(s) => {
                if key == "length" {
                    Value::Number(s.chars().count() as f64)
                } else if let Some(index) = array_index(key) {
                    s.chars()
                        .nth(index)
                        .map(|c| Value::string(c.to_string()))
                        .unwrap_or(Value::Undefined)
                } else if super::builtins::STRING_METHODS.contains(&key) {
                    method(key)
                } else {
                    Value::Undefined
                }
            }
            Value::Number(_) if super::builtins::NUMBER_METHODS.contains(&key) => method(key),
            Value::Bool(_) if key == "toString" => method(key),
            Value::Object(_) => obj.get_own(key).unwrap_or(Value::Undefined),
            Value::Native(native) => match key {
                "name" => Value::string(native.0.rsplit('.').next().unwrap_or(native.0)),
                _ => super::builtins::native_static(native.0, key).unwrap_or(Value::Undefined),
            },
            Value::Function(closure) => match key {
                "name" => Value::string(closure.def.name.as_deref().unwrap_or("")),
                "length" => Value::Number(closure.def.params.iter().filter(|p| !p.rest && p.default.is_none()).count() as f64),
                _ => Value::Undefined,
            },
            Value::Method(bound) if key == "name" => Value::string(bound.name.as_str()),
            _ => Value::Undefined,
        };
        Ok(value)
    }

    fn set_property(&mut self, obj: &Value, key: &Value, value: Value) -> ScriptResult<()> {
        let key_text = match key {
            Value::Number(n) => number_to_string(*n),
            other => other.to_display_string(),
        };
        match obj {
            Value::Array(items) => {
                if let Some(index) = array_index(&key_text) {
                    check_len(index + 1, "array")?;
                    let mut items = items.borrow_mut();
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                } else if key_text == "length" {
                    let n = value.to_number();
                    if n < 0.0 || n.fract() != 0.0 || !n.is_finite() {
                        return Err(ScriptError::Range("Invalid array length".into()));
                    }
                    check_len(n as usize, "array")?;
                    items.borrow_mut().resize(n as usize, Value::Undefined);
                }
                Ok(())
            }
            Value::Object(props) => {
                let mut props = props.borrow_mut();
                match props.iter_mut().find(|(k, _)| *k == key_text) {
                    Some(slot) => slot.1 = value,
                    None => props.push((key_text, value)),
                }
                Ok(())
            }
            Value::Undefined | Value::Null => Err(ScriptError::Type(format!(
                "Cannot set properties of {} (setting '{}')",
                obj.to_display_string(),
                key_text
            ))),
            other => Err(ScriptError::Type(format!(
                "Cannot create property '{}' on {} '{}'",
                key_text,
                other.type_of(),
                other.to_display_string()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    pub(super) fn call_value(&mut self, f: &Value, args: Vec<Value>) -> Exec<Value> {
        self.tick()?;
        match f {
            Value::Function(closure) => {
                if self.depth >= self.limits.max_call_depth {
                    return Err(
                        ScriptError::Range("Maximum call stack size exceeded".into()).into(),
                    );
                }
                self.depth += 1;
                let result = self.invoke_closure(closure, args);
                self.depth -= 1;
                result
            }
            Value::Native(native) => self.call_native(native.0, args),
            Value::Method(bound) => {
                let bound = bound.clone();
                self.call_method(&bound.receiver, &bound.name, args)
            }
            other => Err(ScriptError::Type(format!("{} is not a function", other.type_of())).into()),
        }
    }

    fn invoke_closure(&mut self, closure: &Rc<Closure>, args: Vec<Value>) -> Exec<Value> {
        let scope = self.new_scope(&closure.scope, true);
        for (i, param) in closure.def.params.iter().enumerate() {
            let value = if param.rest {
                Value::array(args.get(i..).map(<[Value]>::to_vec).unwrap_or_default())
            } else {
                match (args.get(i), &param.default) {
                    (None | Some(Value::Undefined), Some(default)) => self.eval(default, &scope)?,
                    (Some(v), _) => v.clone(),
                    (None, None) => Value::Undefined,
                }
            };
            scope.declare(&param.name, value, true);
        }
        match &closure.def.body {
            FunctionBody::Block(stmts) => match self.exec_stmts(stmts, &scope)? {
                Flow::Return(v) => Ok(v),
                _ => Ok(Value::Undefined),
            },
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        for weak in self.arena.drain(..) {
            if let Some(scope) = weak.upgrade() {
                let vars = std::mem::take(&mut *scope.vars.borrow_mut());
                drop(vars);
            }
        }
    }
}

/// Canonical array index (`"3"`, not `"03"` or `"3.0"`).
fn array_index(key: &str) -> Option<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|i| i.to_string() == key)
}
