//! Tokenizer for the script subset.
//!
//! Regex literals are not recognised: `/` is always division. Template
//! literals are accepted only without `${}` interpolation.

use super::error::{ScriptError, ScriptResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    /// Identifiers and keywords alike; the parser tells them apart.
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: u32,
    /// A line terminator sits between this token and the previous one.
    pub newline_before: bool,
}

// Longest first so that maximal munch falls out of a linear scan.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==", "!=",
    "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%",
    "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

pub fn tokenize(src: &str) -> ScriptResult<Vec<Token>> {
    Lexer {
        chars: src.chars().collect(),
        pos: 0,
        line: 1,
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::syntax(self.line, message)
    }

    fn run(mut self) -> ScriptResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut newline_before = false;

        loop {
            newline_before |= self.skip_trivia()?;
            let line = self.line;
            let Some(c) = self.peek(0) else {
                tokens.push(Token {
                    tok: Tok::Eof,
                    line,
                    newline_before: true,
                });
                return Ok(tokens);
            };

            let tok = if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
                self.number()?
            } else if c == '"' || c == '\'' {
                self.string(c)?
            } else if c == '`' {
                self.template()?
            } else if is_ident_start(c) {
                let start = self.pos;
                while self.peek(0).is_some_and(is_ident_part) {
                    self.pos += 1;
                }
                Tok::Ident(self.chars[start..self.pos].iter().collect())
            } else {
                self.punct()?
            };

            tokens.push(Token {
                tok,
                line,
                newline_before,
            });
            newline_before = false;
        }
    }

    /// Skip whitespace and comments; report whether a newline was crossed.
    fn skip_trivia(&mut self) -> ScriptResult<bool> {
        let mut crossed = false;
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    crossed = true;
                    self.line += 1;
                    self.pos += 1;
                }
                c if c.is_whitespace() || c == '\u{feff}' => self.pos += 1,
                '/' if self.peek(1) == Some('/') => {
                    while self.peek(0).is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                '/' if self.peek(1) == Some('*') => {
                    self.pos += 2;
                    loop {
                        match self.peek(0) {
                            None => return Err(self.error("Unterminated comment")),
                            Some('*') if self.peek(1) == Some('/') => {
                                self.pos += 2;
                                break;
                            }
                            Some('\n') => {
                                crossed = true;
                                self.line += 1;
                                self.pos += 1;
                            }
                            Some(_) => self.pos += 1,
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(crossed)
    }

    fn digits(&mut self, radix: u32) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek(0) {
            if c == '_' {
                self.pos += 1;
            } else if c.is_digit(radix) {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        out
    }

    fn number(&mut self) -> ScriptResult<Tok> {
        let radix = match (self.peek(0), self.peek(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };

        let value = if radix != 10 {
            self.pos += 2;
            let digits = self.digits(radix);
            if digits.is_empty() {
                return Err(self.error("Invalid or unexpected token"));
            }
            digits
                .chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0.0_f64, |acc, d| acc * radix as f64 + d as f64)
        } else {
            let mut text = self.digits(10);
            if self.peek(0) == Some('.') {
                self.pos += 1;
                text.push('.');
                text.push_str(&self.digits(10));
            }
            if matches!(self.peek(0), Some('e' | 'E')) {
                let sign_len = usize::from(matches!(self.peek(1), Some('+' | '-')));
                if self.peek(1 + sign_len).is_some_and(|c| c.is_ascii_digit()) {
                    text.push('e');
                    if sign_len == 1 {
                        text.extend(self.peek(1));
                    }
                    self.pos += 1 + sign_len;
                    text.push_str(&self.digits(10));
                }
            }
            text.parse::<f64>()
                .map_err(|_| self.error("Invalid or unexpected token"))?
        };

        if self.peek(0).is_some_and(is_ident_start) {
            return Err(self.error("Invalid or unexpected token"));
        }
        Ok(Tok::Num(value))
    }

    fn escape(&mut self) -> ScriptResult<Option<char>> {
        let Some(c) = self.peek(0) else {
            return Err(self.error("Invalid or unexpected token"));
        };
        self.pos += 1;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            '\n' => {
                self.line += 1;
                return Ok(None);
            }
            'x' => self.hex_escape(2)?,
            'u' if self.peek(0) == Some('{') => {
                self.pos += 1;
                let start = self.pos;
                while self.peek(0).is_some_and(|c| c != '}') {
                    self.pos += 1;
                }
                let hex: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("Invalid Unicode escape sequence"))?
            }
            'u' => self.hex_escape(4)?,
            other => other,
        };
        Ok(Some(decoded))
    }

    fn hex_escape(&mut self, len: usize) -> ScriptResult<char> {
        let end = (self.pos + len).min(self.chars.len());
        let hex: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|_| hex.len() == len)
            // Lone surrogates have no `char`; substitute like a lossy decode.
            .map(|code| char::from_u32(code).unwrap_or('\u{fffd}'))
            .ok_or_else(|| self.error("Invalid hexadecimal escape sequence"))
    }

    fn string(&mut self, quote: char) -> ScriptResult<Tok> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek(0) {
                None | Some('\n') => return Err(self.error("Invalid or unexpected token")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(Tok::Str(out));
                }
                Some('\\') => {
                    self.pos += 1;
                    out.extend(self.escape()?);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn template(&mut self) -> ScriptResult<Tok> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek(0) {
                None => return Err(self.error("Unterminated template literal")),
                Some('`') => {
                    self.pos += 1;
                    return Ok(Tok::Str(out));
                }
                Some('$') if self.peek(1) == Some('{') => {
                    return Err(self.error("Template literal interpolation is not supported"));
                }
                Some('\\') => {
                    self.pos += 1;
                    out.extend(self.escape()?);
                }
                Some(c) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn punct(&mut self) -> ScriptResult<Tok> {
        for p in PUNCTUATORS {
            let len = p.chars().count();
            let matches = p
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek(i) == Some(c));
            if !matches {
                continue;
            }
            // `a?.5:b` is a conditional, not optional chaining.
            if *p == "?." && self.peek(2).is_some_and(|c| c.is_ascii_digit()) {
                continue;
            }
            self.pos += len;
            return Ok(Tok::Punct(p));
        }
        let c = self.peek(0).unwrap_or(' ');
        Err(self.error(format!("Invalid or unexpected token '{}'", c)))
    }
}
