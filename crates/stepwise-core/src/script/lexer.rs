//! Tokenizer for block source.

use super::error::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Del,
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    StarStar,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    /// Augmented assignment; carries the arithmetic operator (`+=` → `Plus`).
    AugAssign(Box<Token>),
    LParen,
    RParen,
    Comma,
    /// Statement separator: a newline or `;`.
    Separator,
    Eof,
}

/// A token with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
    line: usize,
    /// Open parentheses; newlines inside them do not separate statements.
    depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices().peekable(),
            src,
            line: 1,
            depth: 0,
        }
    }

    fn syntax(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    /// Tokenize the whole source, ending with [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, ScriptError> {
        let mut out = Vec::new();
        loop {
            let line = self.line;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            out.push(Spanned { token, line });
            if done {
                return Ok(out);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ScriptError> {
        loop {
            let Some((start, c)) = self.chars.next() else {
                return Ok(Token::Eof);
            };
            let token = match c {
                '\n' => {
                    self.line += 1;
                    if self.depth > 0 {
                        continue;
                    }
                    Token::Separator
                }
                ';' => Token::Separator,
                c if c.is_whitespace() => continue,
                '#' => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                    continue;
                }
                '(' => {
                    self.depth += 1;
                    Token::LParen
                }
                ')' => {
                    self.depth = self.depth.saturating_sub(1);
                    Token::RParen
                }
                ',' => Token::Comma,
                '+' => self.maybe_aug(Token::Plus),
                '-' => self.maybe_aug(Token::Minus),
                '%' => self.maybe_aug(Token::Percent),
                '*' => {
                    if self.eat('*') {
                        self.maybe_aug(Token::StarStar)
                    } else {
                        self.maybe_aug(Token::Star)
                    }
                }
                '/' => {
                    if self.eat('/') {
                        self.maybe_aug(Token::SlashSlash)
                    } else {
                        self.maybe_aug(Token::Slash)
                    }
                }
                '=' => {
                    if self.eat('=') {
                        Token::EqEq
                    } else {
                        Token::Assign
                    }
                }
                '!' => {
                    if self.eat('=') {
                        Token::NotEq
                    } else {
                        return Err(self.syntax("unexpected '!'"));
                    }
                }
                '<' => {
                    if self.eat('=') {
                        Token::Le
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    if self.eat('=') {
                        Token::Ge
                    } else {
                        Token::Gt
                    }
                }
                '"' | '\'' => self.string(c)?,
                c if c.is_ascii_digit() => self.number(start)?,
                c if c.is_alphabetic() || c == '_' => self.word(start, c),
                other => return Err(self.syntax(format!("unexpected character '{other}'"))),
            };
            return Ok(token);
        }
    }

    fn maybe_aug(&mut self, op: Token) -> Token {
        if self.eat('=') {
            Token::AugAssign(Box::new(op))
        } else {
            op
        }
    }

    fn string(&mut self, quote: char) -> Result<Token, ScriptError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                None | Some((_, '\n')) => return Err(self.syntax("unterminated string")),
                Some((_, c)) if c == quote => return Ok(Token::Str(s)),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => s.push('\n'),
                    Some((_, 't')) => s.push('\t'),
                    Some((_, '\\')) => s.push('\\'),
                    Some((_, '\'')) => s.push('\''),
                    Some((_, '"')) => s.push('"'),
                    Some((_, other)) => {
                        return Err(self.syntax(format!("unknown escape '\\{other}'")))
                    }
                    None => return Err(self.syntax("unterminated string")),
                },
                Some((_, c)) => s.push(c),
            }
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, ScriptError> {
        let mut end = start + 1;
        let mut is_float = false;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() || c == '_' {
                end = i + 1;
                self.chars.next();
            } else if c == '.' && !is_float {
                is_float = true;
                end = i + 1;
                self.chars.next();
            } else if c == 'e' || c == 'E' {
                is_float = true;
                end = i + 1;
                self.chars.next();
                if let Some(&(j, sign)) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        end = j + 1;
                        self.chars.next();
                    }
                }
            } else {
                break;
            }
        }
        let text: String = self.src[start..end].chars().filter(|&c| c != '_').collect();
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.syntax(format!("invalid number '{text}'")))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| self.syntax(format!("integer literal '{text}' out of range")))
        }
    }

    fn word(&mut self, start: usize, first: char) -> Token {
        let mut end = start + first.len_utf8();
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        match &self.src[start..end] {
            "true" => Token::True,
            "false" => Token::False,
            "none" => Token::None,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "del" => Token::Del,
            ident => Token::Ident(ident.to_string()),
        }
    }
}
