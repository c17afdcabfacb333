//! Recursive-descent parser for the script subset.
//!
//! TypeScript annotations on bindings, parameters and return types are
//! skipped rather than checked, as are `type`/`interface` declarations.

use std::rc::Rc;

use super::ast::{
    AssignOp, BinaryOp, DeclKind, Declarator, Expr, FunctionBody, FunctionDef, LogicalOp, Param,
    Stmt, UnaryOp,
};
use super::error::{ScriptError, ScriptResult};
use super::lexer::{tokenize, Tok, Token};

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "false", "finally", "for", "function", "if", "import", "in",
    "instanceof", "let", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "yield",
];

/// Parse a whole program.
pub(crate) fn parse_program(src: &str) -> ScriptResult<Vec<Stmt>> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.at_eof() {
        body.push(parser.statement()?);
    }
    Ok(body)
}

#[derive(Clone, Copy)]
enum BinKind {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Nesting deeper than this is rejected before it can exhaust the stack.
///
/// Each level costs a full precedence chain of frames; 64 levels fit a
/// default 2 MiB thread stack in debug builds.
const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn token(&self) -> &Token {
        // The token stream always ends with Eof and the cursor never passes it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Tok {
        &self.token().tok
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Tok::Eof)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Tok::Punct(q) if *q == p)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> ScriptResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Tok::Ident(name) if name == kw)
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::syntax(self.token().line, message)
    }

    fn unexpected(&self) -> ScriptError {
        let message = match self.peek() {
            Tok::Eof => "Unexpected end of input".to_string(),
            Tok::Num(_) => "Unexpected number".to_string(),
            Tok::Str(_) => "Unexpected string".to_string(),
            Tok::Ident(name) if RESERVED.contains(&name.as_str()) => {
                format!("Unexpected token '{}'", name)
            }
            Tok::Ident(name) => format!("Unexpected identifier '{}'", name),
            Tok::Punct(p) => format!("Unexpected token '{}'", p),
        };
        self.error(message)
    }

    /// A binding name: any identifier that is not a reserved word.
    fn identifier(&mut self) -> ScriptResult<String> {
        match self.peek() {
            Tok::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Property names after `.` may be reserved words.
    fn property_name(&mut self) -> ScriptResult<String> {
        match self.peek() {
            Tok::Ident(name) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Automatic semicolon insertion, restricted to the common cases.
    fn consume_semicolon(&mut self) -> ScriptResult<()> {
        if self.eat_punct(";") || self.is_punct("}") || self.at_eof() || self.token().newline_before {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Skip a type annotation, stopping at a depth-0 token in `stops`, a
    /// `;`, a line break, or an unbalanced closing bracket.
    fn skip_type(&mut self, stops: &[&str]) {
        let mut depth: usize = 0;
        let mut consumed = 0;
        loop {
            let tok = self.peek().clone();
            if depth == 0
                && consumed > 0
                && self.token().newline_before
                && !matches!(tok, Tok::Punct("|" | "&"))
            {
                return;
            }
            match tok {
                Tok::Eof => return,
                Tok::Punct(p) => {
                    // `: { a: number }` opens an object type, not a body.
                    let leading_object = consumed == 0 && p == "{";
                    if depth == 0 && !leading_object && (stops.contains(&p) || p == ";") {
                        return;
                    }
                    match p {
                        "(" | "[" | "{" | "<" => depth += 1,
                        ")" | "]" | "}" => {
                            if depth == 0 {
                                return;
                            }
                            depth -= 1;
                        }
                        ">" => depth = depth.saturating_sub(1),
                        ">>" => depth = depth.saturating_sub(2),
                        ">>>" => depth = depth.saturating_sub(3),
                        _ => {}
                    }
                }
                _ => {}
            }
            self.pos += 1;
            consumed += 1;
        }
    }

    /// Skip from an opening bracket through its matching close.
    fn skip_group(&mut self) -> ScriptResult<()> {
        let mut depth: usize = 0;
        loop {
            match self.peek() {
                Tok::Punct("{" | "(" | "[") => depth += 1,
                Tok::Punct("}" | ")" | "]") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                Tok::Eof => return Err(self.unexpected()),
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Advance to the next depth-0 occurrence of `p`.
    fn skip_until(&mut self, p: &str) -> ScriptResult<()> {
        while !self.is_punct(p) {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            self.pos += 1;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> ScriptResult<Stmt> {
        self.enter()?;
        let stmt = self.statement_inner();
        self.depth -= 1;
        stmt
    }

    fn enter(&mut self) -> ScriptResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            self.depth -= 1;
            return Err(self.error("Maximum nesting depth exceeded"));
        }
        Ok(())
    }

    fn statement_inner(&mut self) -> ScriptResult<Stmt> {
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }

        let keyword = match self.peek() {
            Tok::Ident(name) => name.clone(),
            _ => return self.expression_statement(),
        };

        match keyword.as_str() {
            "export" => {
                self.pos += 1;
                self.eat_keyword("default");
                self.statement()
            }
            "function" => {
                self.pos += 1;
                let def = self.function_rest(true)?;
                Ok(Stmt::Function(Rc::new(def)))
            }
            "var" | "let" | "const" => {
                let stmt = self.var_decl()?;
                self.consume_semicolon()?;
                Ok(stmt)
            }
            "return" => {
                self.pos += 1;
                let arg = if self.is_punct(";")
                    || self.is_punct("}")
                    || self.at_eof()
                    || self.token().newline_before
                {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(arg))
            }
            "if" => {
                self.pos += 1;
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let then = Box::new(self.statement()?);
                let otherwise = if self.eat_keyword("else") {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    then,
                    otherwise,
                })
            }
            "while" => {
                self.pos += 1;
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While { test, body })
            }
            "do" => {
                self.pos += 1;
                let body = Box::new(self.statement()?);
                if !self.eat_keyword("while") {
                    return Err(self.unexpected());
                }
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                self.eat_punct(";");
                Ok(Stmt::DoWhile { body, test })
            }
            "for" => self.for_statement(),
            "break" => {
                self.pos += 1;
                self.consume_semicolon()?;
                Ok(Stmt::Break)
            }
            "continue" => {
                self.pos += 1;
                self.consume_semicolon()?;
                Ok(Stmt::Continue)
            }
            "throw" => {
                self.pos += 1;
                if self.token().newline_before {
                    return Err(self.error("Illegal newline after throw"));
                }
                let arg = self.expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(arg))
            }
            "try" => self.try_statement(),
            "interface" if matches!(self.peek_at(1), Tok::Ident(_)) => {
                self.pos += 2;
                self.skip_until("{")?;
                self.skip_group()?;
                Ok(Stmt::Empty)
            }
            "type"
                if matches!(self.peek_at(1), Tok::Ident(_))
                    && !self.tokens[self.pos + 1].newline_before =>
            {
                self.pos += 2;
                self.skip_until("=")?;
                self.pos += 1;
                self.skip_type(&[]);
                self.consume_semicolon()?;
                Ok(Stmt::Empty)
            }
            "class" | "import" | "switch" | "with" | "async" if !matches!(self.peek_at(1), Tok::Punct("=" | "(" | ".")) => {
                Err(self.error(format!("'{}' is not supported", keyword)))
            }
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> ScriptResult<Stmt> {
        let expr = self.expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> ScriptResult<Vec<Stmt>> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            body.push(self.statement()?);
        }
        self.pos += 1;
        Ok(body)
    }

    fn decl_kind(&mut self) -> Option<DeclKind> {
        let kind = match self.peek() {
            Tok::Ident(k) if k == "var" => DeclKind::Var,
            Tok::Ident(k) if k == "let" => DeclKind::Let,
            Tok::Ident(k) if k == "const" => DeclKind::Const,
            _ => return None,
        };
        self.pos += 1;
        Some(kind)
    }

    /// `let a = 1, b: number = 2` without the trailing semicolon.
    fn var_decl(&mut self) -> ScriptResult<Stmt> {
        let kind = self.decl_kind().ok_or_else(|| self.unexpected())?;
        let mut decls = Vec::new();
        loop {
            let name = self.identifier()?;
            self.eat_punct("!");
            if self.eat_punct(":") {
                self.skip_type(&[",", "="]);
            }
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                if kind == DeclKind::Const {
                    return Err(self.error("Missing initializer in const declaration"));
                }
                None
            };
            decls.push(Declarator { name, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::VarDecl { kind, decls })
    }

    fn for_statement(&mut self) -> ScriptResult<Stmt> {
        self.pos += 1;
        self.expect_punct("(")?;

        // for (const x of xs)
        let head = match (self.peek(), self.peek_at(1), self.peek_at(2)) {
            (Tok::Ident(k), Tok::Ident(_), Tok::Ident(w))
                if matches!(k.as_str(), "var" | "let" | "const") && (w == "of" || w == "in") =>
            {
                Some(w == "in")
            }
            _ => None,
        };
        if let Some(is_in) = head {
            if is_in {
                return Err(self.error("for-in loops are not supported"));
            }
            let kind = self.decl_kind().ok_or_else(|| self.unexpected())?;
            let name = self.identifier()?;
            self.pos += 1;
            let iterable = self.assignment()?;
            self.expect_punct(")")?;
            let body = Box::new(self.statement()?);
            return Ok(Stmt::ForOf {
                kind,
                name,
                iterable,
                body,
            });
        }

        let init = if self.is_punct(";") {
            None
        } else if matches!(self.peek(), Tok::Ident(k) if matches!(k.as_str(), "var" | "let" | "const")) {
            Some(Box::new(self.var_decl()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect_punct(";")?;
        let test = if self.is_punct(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> ScriptResult<Stmt> {
        self.pos += 1;
        let block = self.block()?;
        let mut param = None;
        let mut handler = None;
        if self.eat_keyword("catch") {
            if self.eat_punct("(") {
                param = Some(self.identifier()?);
                if self.eat_punct(":") {
                    self.skip_type(&[")"]);
                }
                self.expect_punct(")")?;
            }
            handler = Some(self.block()?);
        }
        let finalizer = if self.eat_keyword("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    /// Everything after the `function` keyword.
    fn function_rest(&mut self, require_name: bool) -> ScriptResult<FunctionDef> {
        let name = if matches!(self.peek(), Tok::Ident(_)) {
            Some(self.identifier()?)
        } else if require_name {
            return Err(self.error("Function statements require a function name"));
        } else {
            None
        };
        if self.is_punct("<") {
            self.skip_type(&["("]);
        }
        self.expect_punct("(")?;
        let params = self.params()?;
        if self.eat_punct(":") {
            self.skip_type(&["{"]);
        }
        let body = self.block()?;
        Ok(FunctionDef {
            name,
            params,
            body: FunctionBody::Block(body),
        })
    }

    /// Parameter list after `(`, consuming the closing `)`.
    fn params(&mut self) -> ScriptResult<Vec<Param>> {
        let mut params = Vec::new();
        while !self.eat_punct(")") {
            let rest = self.eat_punct("...");
            let name = self.identifier()?;
            self.eat_punct("?");
            if self.eat_punct(":") {
                self.skip_type(&[",", ")", "="]);
            }
            let default = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            params.push(Param {
                name,
                default,
                rest,
            });
            if rest {
                self.expect_punct(")")?;
                break;
            }
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    fn arrow_body(&mut self) -> ScriptResult<FunctionBody> {
        if self.is_punct("{") {
            Ok(FunctionBody::Block(self.block()?))
        } else {
            Ok(FunctionBody::Expr(Box::new(self.assignment()?)))
        }
    }

    /// Parse an arrow function if one starts here; otherwise leave the
    /// cursor untouched.
    fn try_arrow(&mut self) -> ScriptResult<Option<FunctionDef>> {
        if let (Tok::Ident(name), Tok::Punct("=>")) = (self.peek(), self.peek_at(1)) {
            if RESERVED.contains(&name.as_str()) {
                return Ok(None);
            }
            let param = Param {
                name: name.clone(),
                default: None,
                rest: false,
            };
            self.pos += 2;
            let body = self.arrow_body()?;
            return Ok(Some(FunctionDef {
                name: None,
                params: vec![param],
                body,
            }));
        }

        if !self.is_punct("(") {
            return Ok(None);
        }
        let save = self.pos;
        self.pos += 1;
        let params = match self.params() {
            Ok(params) => params,
            Err(_) => {
                self.pos = save;
                return Ok(None);
            }
        };
        if self.eat_punct(":") {
            self.skip_type(&["=>"]);
        }
        if !self.is_punct("=>") || self.token().newline_before {
            self.pos = save;
            return Ok(None);
        }
        self.pos += 1;
        let body = self.arrow_body()?;
        Ok(Some(FunctionDef {
            name: None,
            params,
            body,
        }))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> ScriptResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ScriptResult<Expr> {
        self.enter()?;
        let expr = self.assignment_inner();
        self.depth -= 1;
        expr
    }

    fn assignment_inner(&mut self) -> ScriptResult<Expr> {
        if let Some(def) = self.try_arrow()? {
            return Ok(Expr::Function(Rc::new(def)));
        }

        let left = self.conditional()?;
        let op = match self.peek() {
            Tok::Punct(p) => assign_op(p),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        if !left.is_assignable() {
            return Err(self.error("Invalid left-hand side in assignment"));
        }
        self.pos += 1;
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(left),
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> ScriptResult<Expr> {
        let test = self.binary(1)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let then = self.assignment()?;
        self.expect_punct(":")?;
        let otherwise = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn binary_op(&self) -> Option<(u8, BinKind)> {
        let Tok::Punct(p) = self.peek() else {
            return None;
        };
        let op = match *p {
            "??" => (1, BinKind::Logical(LogicalOp::Nullish)),
            "||" => (2, BinKind::Logical(LogicalOp::Or)),
            "&&" => (3, BinKind::Logical(LogicalOp::And)),
            "|" => (4, BinKind::Binary(BinaryOp::BitOr)),
            "^" => (5, BinKind::Binary(BinaryOp::BitXor)),
            "&" => (6, BinKind::Binary(BinaryOp::BitAnd)),
            "==" => (7, BinKind::Binary(BinaryOp::Eq)),
            "!=" => (7, BinKind::Binary(BinaryOp::NotEq)),
            "===" => (7, BinKind::Binary(BinaryOp::StrictEq)),
            "!==" => (7, BinKind::Binary(BinaryOp::StrictNotEq)),
            "<" => (8, BinKind::Binary(BinaryOp::Lt)),
            "<=" => (8, BinKind::Binary(BinaryOp::LtEq)),
            ">" => (8, BinKind::Binary(BinaryOp::Gt)),
            ">=" => (8, BinKind::Binary(BinaryOp::GtEq)),
            "<<" => (9, BinKind::Binary(BinaryOp::Shl)),
            ">>" => (9, BinKind::Binary(BinaryOp::Shr)),
            ">>>" => (9, BinKind::Binary(BinaryOp::UShr)),
            "+" => (10, BinKind::Binary(BinaryOp::Add)),
            "-" => (10, BinKind::Binary(BinaryOp::Sub)),
            "*" => (11, BinKind::Binary(BinaryOp::Mul)),
            "/" => (11, BinKind::Binary(BinaryOp::Div)),
            "%" => (11, BinKind::Binary(BinaryOp::Rem)),
            "**" => (12, BinKind::Binary(BinaryOp::Pow)),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing; `**` is right-associative.
    fn binary(&mut self, min_prec: u8) -> ScriptResult<Expr> {
        let mut left = self.unary()?;
        while let Some((prec, kind)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let right_assoc = matches!(kind, BinKind::Binary(BinaryOp::Pow));
            let right = self.binary(if right_assoc { prec } else { prec + 1 })?;
            left = match kind {
                BinKind::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                BinKind::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> ScriptResult<Expr> {
        let op = match self.peek() {
            Tok::Punct("!") => Some(UnaryOp::Not),
            Tok::Punct("-") => Some(UnaryOp::Neg),
            Tok::Punct("+") => Some(UnaryOp::Plus),
            Tok::Punct("~") => Some(UnaryOp::BitNot),
            Tok::Ident(k) if k == "typeof" => Some(UnaryOp::Typeof),
            Tok::Ident(k) if k == "void" => Some(UnaryOp::Void),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            self.enter()?;
            let arg = self.unary();
            self.depth -= 1;
            let arg = arg?;
            return Ok(Expr::Unary {
                op,
                arg: Box::new(arg),
            });
        }

        if self.is_punct("++") || self.is_punct("--") {
            let increment = self.is_punct("++");
            self.pos += 1;
            self.enter()?;
            let target = self.unary();
            self.depth -= 1;
            let target = target?;
            if !target.is_assignable() {
                return Err(self.error("Invalid left-hand side expression in prefix operation"));
            }
            return Ok(Expr::Update {
                increment,
                prefix: true,
                target: Box::new(target),
            });
        }

        let expr = self.call_member()?;
        if (self.is_punct("++") || self.is_punct("--")) && !self.token().newline_before {
            let increment = self.is_punct("++");
            if !expr.is_assignable() {
                return Err(self.error("Invalid left-hand side expression in postfix operation"));
            }
            self.pos += 1;
            return Ok(Expr::Update {
                increment,
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> ScriptResult<Vec<Expr>> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            if self.eat_punct("...") {
                args.push(Expr::Spread(Box::new(self.assignment()?)));
            } else {
                args.push(self.assignment()?);
            }
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn call_member(&mut self) -> ScriptResult<Expr> {
        let mut expr = if self.eat_keyword("new") {
            let mut callee = self.primary()?;
            while self.eat_punct(".") {
                let property = self.property_name()?;
                callee = Expr::Member {
                    object: Box::new(callee),
                    property,
                    optional: false,
                };
            }
            let args = if self.is_punct("(") {
                self.arguments()?
            } else {
                Vec::new()
            };
            Expr::New {
                callee: Box::new(callee),
                args,
            }
        } else {
            self.primary()?
        };

        loop {
            if self.eat_punct(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat_punct("?.") {
                if self.eat_punct("[") {
                    let index = self.expression()?;
                    self.expect_punct("]")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                    };
                } else {
                    let property = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: true,
                    };
                }
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                };
            } else if self.is_punct("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.is_punct("!")
                && !self.token().newline_before
                && matches!(
                    self.peek_at(1),
                    Tok::Punct("." | ")" | ";" | "," | "]" | "[" | "}") | Tok::Eof
                )
            {
                // TypeScript non-null assertion.
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ScriptResult<Expr> {
        match self.peek().clone() {
            Tok::Num(n) => {
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            Tok::Str(s) => {
                self.pos += 1;
                Ok(Expr::Str(s))
            }
            Tok::Punct("(") => {
                self.pos += 1;
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Tok::Punct("[") => {
                self.pos += 1;
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    if self.eat_punct("...") {
                        items.push(Expr::Spread(Box::new(self.assignment()?)));
                    } else {
                        items.push(self.assignment()?);
                    }
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            Tok::Punct("{") => self.object_literal(),
            Tok::Ident(name) => {
                self.pos += 1;
                match name.as_str() {
                    "true" => Ok(Expr::Bool(true)),
                    "false" => Ok(Expr::Bool(false)),
                    "null" => Ok(Expr::Null),
                    "undefined" | "this" => Ok(Expr::Undefined),
                    "function" => {
                        let def = self.function_rest(false)?;
                        Ok(Expr::Function(Rc::new(def)))
                    }
                    _ if RESERVED.contains(&name.as_str()) => {
                        self.pos -= 1;
                        Err(self.unexpected())
                    }
                    _ => Ok(Expr::Ident(name)),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn object_literal(&mut self) -> ScriptResult<Expr> {
        self.expect_punct("{")?;
        let mut props = Vec::new();
        while !self.eat_punct("}") {
            let key = match self.peek() {
                Tok::Ident(name) => name.clone(),
                Tok::Str(s) => s.clone(),
                Tok::Num(n) => super::value::number_to_string(*n),
                _ => return Err(self.unexpected()),
            };
            self.pos += 1;

            let value = if self.eat_punct(":") {
                self.assignment()?
            } else if self.eat_punct("(") {
                let params = self.params()?;
                if self.eat_punct(":") {
                    self.skip_type(&["{"]);
                }
                let body = self.block()?;
                Expr::Function(Rc::new(FunctionDef {
                    name: Some(key.clone()),
                    params,
                    body: FunctionBody::Block(body),
                }))
            } else {
                // Shorthand `{ a }`.
                Expr::Ident(key.clone())
            };
            props.push((key, value));

            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(props))
    }
}

fn assign_op(p: &str) -> Option<AssignOp> {
    let op = match p {
        "=" => AssignOp::Assign,
        "+=" => AssignOp::Binary(BinaryOp::Add),
        "-=" => AssignOp::Binary(BinaryOp::Sub),
        "*=" => AssignOp::Binary(BinaryOp::Mul),
        "/=" => AssignOp::Binary(BinaryOp::Div),
        "%=" => AssignOp::Binary(BinaryOp::Rem),
        "**=" => AssignOp::Binary(BinaryOp::Pow),
        "<<=" => AssignOp::Binary(BinaryOp::Shl),
        ">>=" => AssignOp::Binary(BinaryOp::Shr),
        ">>>=" => AssignOp::Binary(BinaryOp::UShr),
        "&=" => AssignOp::Binary(BinaryOp::BitAnd),
        "|=" => AssignOp::Binary(BinaryOp::BitOr),
        "^=" => AssignOp::Binary(BinaryOp::BitXor),
        "&&=" => AssignOp::Logical(LogicalOp::And),
        "||=" => AssignOp::Logical(LogicalOp::Or),
        "??=" => AssignOp::Logical(LogicalOp::Nullish),
        _ => return None,
    };
    Some(op)
}
