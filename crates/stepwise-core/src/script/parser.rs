//! Recursive-descent parser producing the block AST.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons, `+ -`,
//! `* / // %`, unary `- +`, `**` (right-associative), calls and atoms.

use super::error::ScriptError;
use super::lexer::{Lexer, Spanned, Token};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    fn arithmetic(token: &Token) -> Option<Self> {
        Some(match token {
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            Token::SlashSlash => BinOp::FloorDiv,
            Token::Percent => BinOp::Mod,
            Token::StarStar => BinOp::Pow,
            _ => return None,
        })
    }

    fn comparison(token: &Token) -> Option<Self> {
        Some(match token {
            Token::EqEq => BinOp::Eq,
            Token::NotEq => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::Le => BinOp::Le,
            Token::Gt => BinOp::Gt,
            Token::Ge => BinOp::Ge,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign(String, Expr),
    /// `name op= expr`
    AugAssign(String, BinOp, Expr),
    Delete(String),
    Expr(Expr),
}

/// A statement with the block-relative line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

/// A parsed code block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Parse block source into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ScriptError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser {
        tokens,
        pos: 0,
        depth: 0,
    }
    .program()
}

/// Deepest expression tree the parser builds; evaluation recurses once per level.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let i = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[i].token
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ScriptError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {what}, found {}", describe(self.peek()))))
        }
    }

    fn program(mut self) -> Result<Program, ScriptError> {
        let mut statements = Vec::new();
        loop {
            while *self.peek() == Token::Separator {
                self.advance();
            }
            if *self.peek() == Token::Eof {
                return Ok(Program { statements });
            }
            statements.push(self.statement()?);
            match self.peek() {
                Token::Separator | Token::Eof => {}
                other => {
                    return Err(self.error(format!(
                        "expected end of statement, found {}",
                        describe(other)
                    )))
                }
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.line();
        let kind = match (self.peek().clone(), self.peek_at(1).clone()) {
            (Token::Del, _) => {
                self.advance();
                match self.advance() {
                    Token::Ident(name) => StmtKind::Delete(name),
                    other => {
                        return Err(self.error(format!(
                            "expected a name after 'del', found {}",
                            describe(&other)
                        )))
                    }
                }
            }
            (Token::Ident(name), Token::Assign) => {
                self.advance();
                self.advance();
                StmtKind::Assign(name, self.expression()?)
            }
            (Token::Ident(name), Token::AugAssign(op)) => {
                self.advance();
                self.advance();
                let op = BinOp::arithmetic(&op)
                    .ok_or_else(|| self.error("invalid augmented assignment"))?;
                StmtKind::AugAssign(name, op, self.expression()?)
            }
            _ => {
                let expr = self.expression()?;
                if matches!(self.peek(), Token::Assign | Token::AugAssign(_)) {
                    return Err(self.error("can only assign to a plain name"));
                }
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt { kind, line })
    }

    /// Count one more level of the tree being built. Callers undo it with
    /// [`ascend`](Self::ascend) once the level is complete.
    fn descend(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.descend()?;
        let expr = self.or_expr()?;
        self.ascend(1);
        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and_expr()?;
        let mut levels = 0;
        while *self.peek() == Token::Or {
            self.advance();
            self.descend()?;
            levels += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.ascend(levels);
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.not_expr()?;
        let mut levels = 0;
        while *self.peek() == Token::And {
            self.advance();
            self.descend()?;
            levels += 1;
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.ascend(levels);
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ScriptError> {
        if *self.peek() == Token::Not {
            self.advance();
            self.descend()?;
            let operand = self.not_expr()?;
            self.ascend(1);
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let left = self.additive()?;
        if let Some(op) = BinOp::comparison(self.peek()) {
            self.advance();
            let right = self.additive()?;
            if BinOp::comparison(self.peek()).is_some() {
                return Err(self.error("chained comparisons are not supported"));
            }
            return Ok(Expr::Binary(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.multiplicative()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.descend()?;
            levels += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.ascend(levels);
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::SlashSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            self.descend()?;
            levels += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.ascend(levels);
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        self.descend()?;
        let operand = self.unary()?;
        self.ascend(1);
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    /// `-2 ** 2` is `-(2 ** 2)`; the exponent may itself be unary (`2 ** -1`).
    fn power(&mut self) -> Result<Expr, ScriptError> {
        let base = self.call()?;
        if *self.peek() == Token::StarStar {
            self.advance();
            self.descend()?;
            let exponent = self.unary()?;
            self.ascend(1);
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn call(&mut self) -> Result<Expr, ScriptError> {
        let callee = match (self.peek(), self.peek_at(1)) {
            (Token::Ident(name), Token::LParen) => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = callee {
            self.advance();
            self.advance();
            let mut args = Vec::new();
            if *self.peek() != Token::RParen {
                loop {
                    args.push(self.expression()?);
                    if *self.peek() == Token::Comma {
                        self.advance();
                        if *self.peek() == Token::RParen {
                            break;
                        }
                    } else {
                        break;
                    }
                }
            }
            self.expect(Token::RParen, "')'")?;
            return Ok(Expr::Call(name, args));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, ScriptError> {
        let expr = match self.advance() {
            Token::Int(n) => Expr::Literal(Value::Int(n)),
            Token::Float(n) => Expr::Literal(Value::Float(n)),
            Token::Str(s) => Expr::Literal(Value::Str(s)),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::None => Expr::Literal(Value::None),
            Token::Ident(name) => Expr::Name(name),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                inner
            }
            other => {
                return Err(self.error(format!("expected an expression, found {}", describe(&other))))
            }
        };
        Ok(expr)
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(n) => format!("number {n}"),
        Token::Float(n) => format!("number {n}"),
        Token::Str(_) => "string".to_string(),
        Token::Ident(name) => format!("name '{name}'"),
        Token::Separator => "end of statement".to_string(),
        Token::Eof => "end of block".to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(src: &str) -> StmtKind {
        let program = parse(src).unwrap();
        assert_eq!(program.statements.len(), 1);
        program.statements[0].kind.clone()
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            single("a = 9"),
            StmtKind::Assign("a".into(), Expr::Literal(Value::Int(9)))
        );
    }

    #[test]
    fn test_parse_augmented_assignment() {
        assert_eq!(
            single("a *= b"),
            StmtKind::AugAssign("a".into(), BinOp::Mul, Expr::Name("b".into()))
        );
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let StmtKind::Expr(expr) = single("1 + 2 * 3") else {
            panic!("expected expression statement");
        };
        assert_eq!(
            expr,
            Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Literal(Value::Int(1))),
                Box::new(Expr::Binary(
                    BinOp::Mul,
                    Box::new(Expr::Literal(Value::Int(2))),
                    Box::new(Expr::Literal(Value::Int(3)))
                ))
            )
        );
    }

    #[test]
    fn test_power_binds_tighter_than_negation() {
        let StmtKind::Expr(expr) = single("-2 ** 2") else {
            panic!("expected expression statement");
        };
        assert!(matches!(expr, Expr::Unary(UnaryOp::Neg, _)));
    }

    #[test]
    fn test_multiple_statements_and_lines() {
        let program = parse("a = 1; b = 2\n\n# note\nc = a + b\n").unwrap();
        assert_eq!(program.statements.len(), 3);
        assert_eq!(program.statements[2].line, 4);
    }

    #[test]
    fn test_call_with_trailing_comma() {
        assert_eq!(
            single("max(1, 2,)"),
            StmtKind::Expr(Expr::Call(
                "max".into(),
                vec![Expr::Literal(Value::Int(1)), Expr::Literal(Value::Int(2))]
            ))
        );
    }

    #[test]
    fn test_del_statement() {
        assert_eq!(single("del a"), StmtKind::Delete("a".into()));
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").unwrap().statements.is_empty());
        assert!(parse("\n# only a comment\n").unwrap().statements.is_empty());
    }

    #[test]
    fn test_assign_to_expression_is_error() {
        assert!(matches!(
            parse("a + 1 = 2"),
            Err(ScriptError::Syntax { .. })
        ));
    }

    #[test]
    fn test_missing_operand_reports_line() {
        let err = parse("a = 1\nb = ").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_two_expressions_without_separator() {
        assert!(parse("a = 1 2").is_err());
    }

    fn nested_too_deeply(src: &str) -> bool {
        matches!(
            parse(src),
            Err(ScriptError::Syntax { ref message, .. }) if message == "expression nested too deeply"
        )
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let src = format!("a = {}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(nested_too_deeply(&src));
    }

    #[test]
    fn test_long_operator_chains_are_rejected() {
        assert!(nested_too_deeply(&format!("a = {}1", "-".repeat(100_000))));
        assert!(nested_too_deeply(&format!("a = {}true", "not ".repeat(100_000))));
        assert!(nested_too_deeply(&format!("a = 1{}", " + 1".repeat(100_000))));
        assert!(nested_too_deeply(&format!("a = 2{}", " ** 2".repeat(100_000))));
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let src = format!("a = {}1{} + 2 * 3", "(".repeat(50), ")".repeat(50));
        assert!(parse(&src).is_ok());
    }
}
