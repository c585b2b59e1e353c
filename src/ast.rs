use crate::{
    error::{Error, ErrorInfo, IntoErrorInfo},
    tokenizer::{Op, Token, TokenKind},
};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::Negate => write!(f, "-"),
            Self::Not => write!(f, "!"),
        };
    }
}

/// An expression always evaluates to a single 64 bit signed integer.
///
/// String literals are the only exception: they may only appear as the direct
/// argument of a `print` statement, which the code generator enforces.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression<'src> {
    Int(i64),
    Str { text: &'src str, col: usize },
    Variable { name: &'src str },
    Binary { lhs: Box<Expression<'src>>, op: Op, rhs: Box<Expression<'src>> },
    Unary { op: UnaryOp, operand: Box<Expression<'src>> },
    Call { name: &'src str, args: Vec<Expression<'src>>, col: usize },
}

impl Display for Expression<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Str { text, .. } => write!(f, "\"{}\"", text),
            Self::Variable { name } => write!(f, "{}", name),
            Self::Binary { lhs, op, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Self::Unary { op, operand } => write!(f, "{}{}", op, operand),
            Self::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                let mut args_iter = args.iter();
                if let Some(first) = args_iter.next() {
                    write!(f, "{}", first)?;
                    for arg in args_iter {
                        write!(f, ", {}", arg)?;
                    }
                }
                write!(f, ")")
            }
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node<'src> {
    Assign {
        name: &'src str,
        value: Expression<'src>,
    },
    Print {
        value: Expression<'src>,
    },
    If {
        condition: Expression<'src>,
        then_block: Vec<Node<'src>>,
        else_block: Option<Vec<Node<'src>>>,
    },
    While {
        condition: Expression<'src>,
        body: Vec<Node<'src>>,
    },
    For {
        init_name: &'src str,
        init: Expression<'src>,
        condition: Expression<'src>,
        update_name: &'src str,
        update: Expression<'src>,
        body: Vec<Node<'src>>,
    },
    Break {
        col: usize,
    },
    Continue {
        col: usize,
    },
    Return {
        value: Option<Expression<'src>>,
        col: usize,
    },

    /// A call used as a statement, its return value gets discarded.
    Call(Expression<'src>),
}

impl Display for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::Assign { name, value } => write!(f, "{} = {};", name, value),
            Self::Print { value } => write!(f, "print {};", value),
            Self::If { condition, else_block, .. } => match else_block {
                Some(_) => write!(f, "if {} {{ ... }} else {{ ... }}", condition),
                None => write!(f, "if {} {{ ... }}", condition),
            },
            Self::While { condition, .. } => write!(f, "while {} {{ ... }}", condition),
            Self::For { init_name, init, condition, update_name, update, .. } => {
                write!(f, "for {} = {}; {}; {} = {} {{ ... }}", init_name, init, condition, update_name, update)
            }
            Self::Break { .. } => write!(f, "break;"),
            Self::Continue { .. } => write!(f, "continue;"),
            Self::Return { value: Some(value), .. } => write!(f, "return {};", value),
            Self::Return { value: None, .. } => write!(f, "return;"),
            Self::Call(call) => write!(f, "{};", call),
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subroutine<'src> {
    pub name: &'src str,

    /// absolute byte offset of the subroutine's name
    pub col: usize,
    pub params: Vec<&'src str>,
    pub body: Vec<Node<'src>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item<'src> {
    Statement(Node<'src>),
    Subroutine(Subroutine<'src>),
}

/// Ordered sequence of top-level statements and subroutine definitions, in
/// source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program<'src> {
    pub items: Vec<Item<'src>>,
}

#[derive(Debug, Clone)]
pub enum ErrorKind {
    ExpectedStatement,
    ExpectedAssignmentOrCall,
    ExpectedExpression,
    ExpectedSemicolon,
    ExpectedEquals,
    ExpectedOpenCurly(&'static str),
    ExpectedCloseRound,
    ExpectedOpenRound,
    ExpectedCommaOrCloseRound,
    ExpectedIdentifier(&'static str),
    ChainedComparison,
    StrayElse,
    NestedSubroutine,
    PrematureEndOfFile(&'static str),
}

impl IntoErrorInfo for ErrorKind {
    fn info(&self) -> ErrorInfo {
        return match self {
            Self::ExpectedStatement => ErrorInfo {
                msg: "invalid statement".into(),
                cause: "expected a statement".into(),
            },
            Self::ExpectedAssignmentOrCall => ErrorInfo {
                msg: "invalid statement".into(),
                cause: "expected '=' or '(' after this identifier".into(),
            },
            Self::ExpectedExpression => ErrorInfo {
                msg: "invalid expression".into(),
                cause: "expected an expression".into(),
            },
            Self::ExpectedSemicolon => ErrorInfo {
                msg: "invalid statement".into(),
                cause: "expected ';' after this".into(),
            },
            Self::ExpectedEquals => ErrorInfo {
                msg: "invalid assignment".into(),
                cause: "expected '=' after this identifier".into(),
            },
            Self::ExpectedOpenCurly(after) => ErrorInfo {
                msg: "invalid block".into(),
                cause: format!("expected '{{' after {}", after).into(),
            },
            Self::ExpectedCloseRound => ErrorInfo {
                msg: "invalid expression".into(),
                cause: "expected ')' to close this parenthesis".into(),
            },
            Self::ExpectedOpenRound => ErrorInfo {
                msg: "invalid subroutine definition".into(),
                cause: "expected '(' after the subroutine name".into(),
            },
            Self::ExpectedCommaOrCloseRound => ErrorInfo {
                msg: "invalid call".into(),
                cause: "expected ',' or ')' in argument list".into(),
            },
            Self::ExpectedIdentifier(what) => ErrorInfo {
                msg: "invalid statement".into(),
                cause: format!("expected {} name", what).into(),
            },
            Self::ChainedComparison => ErrorInfo {
                msg: "invalid expression".into(),
                cause: "comparison operators cannot be chained".into(),
            },
            Self::StrayElse => ErrorInfo {
                msg: "stray 'else'".into(),
                cause: "no preceding 'if' block".into(),
            },
            Self::NestedSubroutine => ErrorInfo {
                msg: "invalid subroutine definition".into(),
                cause: "subroutines may only be defined at the top level".into(),
            },
            Self::PrematureEndOfFile(expected) => ErrorInfo {
                msg: format!("expected {}", expected).into(),
                cause: "file ended after here instead".into(),
            },
        };
    }
}

/// Recursive descent parser over the token stream, producing a [`Program`].
///
/// Parsing stops at the first error.
#[derive(Debug)]
pub struct Parser<'src, 'tokens> {
    tokens: &'tokens [Token<'src>],
    token: usize,
}

impl<'src, 'tokens> Parser<'src, 'tokens> {
    pub fn parse(tokens: &'tokens [Token<'src>]) -> Result<Program<'src>, Error<ErrorKind>> {
        let mut this = Self { tokens, token: 0 };

        let mut items = Vec::new();
        while let Some(token) = this.tokens.get(this.token) {
            let item = match token.kind {
                TokenKind::Sub => Item::Subroutine(this.subroutine()?),
                _ => Item::Statement(this.statement()?),
            };
            items.push(item);
        }

        return Ok(Program { items });
    }
}

// iteration over tokens
impl<'src, 'tokens> Parser<'src, 'tokens> {
    fn current_token(&self) -> Option<&'tokens Token<'src>> {
        return self.tokens.get(self.token);
    }

    fn peek_next_token(&self) -> Option<&'tokens Token<'src>> {
        return self.tokens.get(self.token + 1);
    }

    fn next_token(&mut self) -> Option<&'tokens Token<'src>> {
        self.token += 1;
        return self.tokens.get(self.token);
    }

    fn previous_token(&self) -> &'tokens Token<'src> {
        return &self.tokens[self.token.saturating_sub(1).min(self.tokens.len() - 1)];
    }

    fn current_token_bounded(
        &self,
        expected: &'static str,
    ) -> Result<&'tokens Token<'src>, Error<ErrorKind>> {
        let Some(token) = self.tokens.get(self.token) else {
            let previous = self.previous_token();
            return Err(Error {
                kind: ErrorKind::PrematureEndOfFile(expected),
                col: previous.col,
                pointers_count: previous.kind.src_code_len(),
            });
        };

        return Ok(token);
    }

    fn error_at(&self, kind: ErrorKind, token: &Token<'src>) -> Error<ErrorKind> {
        return Error { kind, col: token.col, pointers_count: token.kind.src_code_len() };
    }

    fn semicolon(&mut self) -> Result<(), Error<ErrorKind>> {
        let token = self.current_token_bounded("';'")?;
        let TokenKind::SemiColon = token.kind else {
            let previous = self.previous_token();
            return Err(self.error_at(ErrorKind::ExpectedSemicolon, previous));
        };

        let _ = self.next_token();
        return Ok(());
    }
}

// parsing of statements
impl<'src, 'tokens> Parser<'src, 'tokens> {
    fn statement(&mut self) -> Result<Node<'src>, Error<ErrorKind>> {
        let current_token = self.current_token_bounded("a statement")?;

        return match current_token.kind {
            TokenKind::Identifier(name) => match self.peek_next_token() {
                Some(Token { kind: TokenKind::Equals, .. }) => {
                    let _ = self.next_token(); // the identifier
                    let _ = self.next_token(); // the '='
                    let value = self.expression()?;
                    self.semicolon()?;
                    Ok(Node::Assign { name, value })
                }
                Some(Token { kind: TokenKind::OpenRound, .. }) => {
                    let call = self.expression()?;
                    self.semicolon()?;
                    Ok(Node::Call(call))
                }
                _ => Err(self.error_at(ErrorKind::ExpectedAssignmentOrCall, current_token)),
            },
            TokenKind::Print => {
                let _ = self.next_token();
                let value = self.expression()?;
                self.semicolon()?;
                Ok(Node::Print { value })
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Break => {
                let col = current_token.col;
                let _ = self.next_token();
                self.semicolon()?;
                Ok(Node::Break { col })
            }
            TokenKind::Continue => {
                let col = current_token.col;
                let _ = self.next_token();
                self.semicolon()?;
                Ok(Node::Continue { col })
            }
            TokenKind::Return => {
                let col = current_token.col;
                let value = match self.next_token() {
                    Some(Token { kind: TokenKind::SemiColon, .. }) => None,
                    _ => Some(self.expression()?),
                };
                self.semicolon()?;
                Ok(Node::Return { value, col })
            }
            TokenKind::Else => Err(self.error_at(ErrorKind::StrayElse, current_token)),
            TokenKind::Sub => Err(self.error_at(ErrorKind::NestedSubroutine, current_token)),
            _ => Err(self.error_at(ErrorKind::ExpectedStatement, current_token)),
        };
    }

    fn block(&mut self, after: &'static str) -> Result<Vec<Node<'src>>, Error<ErrorKind>> {
        let open_token = self.current_token_bounded("'{'")?;
        let TokenKind::OpenCurly = open_token.kind else {
            return Err(self.error_at(ErrorKind::ExpectedOpenCurly(after), open_token));
        };
        let _ = self.next_token();

        let mut nodes = Vec::new();
        loop {
            let token = self.current_token_bounded("'}'")?;
            if let TokenKind::CloseCurly = token.kind {
                let _ = self.next_token();
                break;
            }

            nodes.push(self.statement()?);
        }

        return Ok(nodes);
    }

    fn if_statement(&mut self) -> Result<Node<'src>, Error<ErrorKind>> {
        let _ = self.next_token(); // the 'if'
        let condition = self.expression()?;
        let then_block = self.block("the if condition")?;

        let else_block = match self.current_token() {
            Some(Token { kind: TokenKind::Else, .. }) => {
                let _ = self.next_token();
                Some(self.block("'else'")?)
            }
            _ => None,
        };

        return Ok(Node::If { condition, then_block, else_block });
    }

    fn while_statement(&mut self) -> Result<Node<'src>, Error<ErrorKind>> {
        let _ = self.next_token(); // the 'while'
        let condition = self.expression()?;
        let body = self.block("the while condition")?;

        return Ok(Node::While { condition, body });
    }

    /// `for init; condition; update { body }`, where `init` and `update` are
    /// assignments without trailing semicolons.
    fn for_statement(&mut self) -> Result<Node<'src>, Error<ErrorKind>> {
        let _ = self.next_token(); // the 'for'

        let (init_name, init) = self.assignment_clause()?;
        self.semicolon()?;

        let condition = self.expression()?;
        self.semicolon()?;

        let (update_name, update) = self.assignment_clause()?;
        let body = self.block("the for clauses")?;

        return Ok(Node::For { init_name, init, condition, update_name, update, body });
    }

    fn assignment_clause(&mut self) -> Result<(&'src str, Expression<'src>), Error<ErrorKind>> {
        let name_token = self.current_token_bounded("an assignment")?;
        let TokenKind::Identifier(name) = name_token.kind else {
            return Err(self.error_at(ErrorKind::ExpectedIdentifier("variable"), name_token));
        };

        match self.next_token() {
            Some(Token { kind: TokenKind::Equals, .. }) => {}
            _ => return Err(self.error_at(ErrorKind::ExpectedEquals, name_token)),
        }
        let _ = self.next_token();

        let value = self.expression()?;
        return Ok((name, value));
    }

    fn subroutine(&mut self) -> Result<Subroutine<'src>, Error<ErrorKind>> {
        let name_token = self.next_token();
        let Some(&Token { kind: TokenKind::Identifier(name), col }) = name_token else {
            let previous = self.previous_token();
            return Err(self.error_at(ErrorKind::ExpectedIdentifier("subroutine"), previous));
        };

        let open_round = self.next_token();
        let Some(Token { kind: TokenKind::OpenRound, .. }) = open_round else {
            let previous = self.previous_token();
            return Err(self.error_at(ErrorKind::ExpectedOpenRound, previous));
        };
        let _ = self.next_token();

        let mut params = Vec::new();
        loop {
            let token = self.current_token_bounded("')'")?;
            match token.kind {
                TokenKind::CloseRound => {
                    let _ = self.next_token();
                    break;
                }
                TokenKind::Identifier(param) => {
                    params.push(param);
                    match self.next_token() {
                        Some(Token { kind: TokenKind::Comma, .. }) => {
                            let _ = self.next_token();
                        }
                        Some(Token { kind: TokenKind::CloseRound, .. }) => {}
                        _ => return Err(self.error_at(ErrorKind::ExpectedCommaOrCloseRound, token)),
                    }
                }
                _ => return Err(self.error_at(ErrorKind::ExpectedIdentifier("parameter"), token)),
            }
        }

        let body = self.block("the parameter list")?;
        return Ok(Subroutine { name, col, params, body });
    }
}

// parsing of expressions
impl<'src, 'tokens> Parser<'src, 'tokens> {
    fn operator(&mut self, ops: &[Op]) -> Option<Op> {
        let token = self.current_token()?;
        let TokenKind::Op(op) = token.kind else {
            return None;
        };

        if ops.contains(&op) {
            let _ = self.next_token();
            return Some(op);
        }
        return None;
    }

    fn primary_expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        let current_token = self.current_token_bounded("an expression")?;

        return match current_token.kind {
            TokenKind::Int(value) => {
                let _ = self.next_token();
                Ok(Expression::Int(value))
            }
            TokenKind::Str(text) => {
                let col = current_token.col;
                let _ = self.next_token();
                Ok(Expression::Str { text, col })
            }
            TokenKind::Identifier(name) => match self.peek_next_token() {
                Some(Token { kind: TokenKind::OpenRound, .. }) => self.call_expression(),
                _ => {
                    let _ = self.next_token();
                    Ok(Expression::Variable { name })
                }
            },
            TokenKind::OpenRound => {
                let _ = self.next_token();
                let inner = self.expression()?;

                let close_token = self.current_token_bounded("')'")?;
                let TokenKind::CloseRound = close_token.kind else {
                    return Err(self.error_at(ErrorKind::ExpectedCloseRound, close_token));
                };
                let _ = self.next_token();

                Ok(inner)
            }
            _ => Err(self.error_at(ErrorKind::ExpectedExpression, current_token)),
        };
    }

    fn call_expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        let name_token = self.current_token_bounded("a call")?;
        let TokenKind::Identifier(name) = name_token.kind else {
            return Err(self.error_at(ErrorKind::ExpectedExpression, name_token));
        };
        let col = name_token.col;

        let _ = self.next_token(); // the identifier
        let _ = self.next_token(); // the '('

        let mut args = Vec::new();
        loop {
            let token = self.current_token_bounded("')'")?;
            if let TokenKind::CloseRound = token.kind {
                let _ = self.next_token();
                break;
            }

            args.push(self.expression()?);

            let separator = self.current_token_bounded("')'")?;
            match separator.kind {
                TokenKind::Comma => {
                    let _ = self.next_token();
                }
                TokenKind::CloseRound => {}
                _ => return Err(self.error_at(ErrorKind::ExpectedCommaOrCloseRound, separator)),
            }
        }

        return Ok(Expression::Call { name, args, col });
    }

    fn unary_expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        if let Some(op) = self.operator(&[Op::Minus, Op::Not]) {
            let operand = self.unary_expression()?;
            let unary_op = match op {
                Op::Minus => UnaryOp::Negate,
                Op::Not => UnaryOp::Not,
                _ => unreachable!(),
            };
            return Ok(Expression::Unary { op: unary_op, operand: Box::new(operand) });
        }

        return self.primary_expression();
    }

    fn multiplicative_expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        let mut lhs = self.unary_expression()?;

        while let Some(op) = self.operator(&[Op::Times, Op::Divide]) {
            let rhs = self.unary_expression()?;
            lhs = Expression::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) };
        }

        return Ok(lhs);
    }

    fn additive_expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        let mut lhs = self.multiplicative_expression()?;

        while let Some(op) = self.operator(&[Op::Plus, Op::Minus]) {
            let rhs = self.multiplicative_expression()?;
            lhs = Expression::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) };
        }

        return Ok(lhs);
    }

    fn comparison_expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        let ops = [
            Op::EqualsEquals,
            Op::NotEquals,
            Op::Less,
            Op::LessOrEquals,
            Op::Greater,
            Op::GreaterOrEquals,
        ];

        let mut lhs = self.additive_expression()?;

        let mut is_chained = false;
        while let Some(op) = self.operator(&ops) {
            let op_token = self.previous_token();
            let rhs = self.additive_expression()?;

            if is_chained {
                return Err(self.error_at(ErrorKind::ChainedComparison, op_token));
            }
            is_chained = true;

            lhs = Expression::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) };
        }

        return Ok(lhs);
    }

    fn and_expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        let mut lhs = self.comparison_expression()?;

        while let Some(op) = self.operator(&[Op::And]) {
            let rhs = self.comparison_expression()?;
            lhs = Expression::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) };
        }

        return Ok(lhs);
    }

    fn or_expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        let mut lhs = self.and_expression()?;

        while let Some(op) = self.operator(&[Op::Or]) {
            let rhs = self.and_expression()?;
            lhs = Expression::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) };
        }

        return Ok(lhs);
    }

    fn expression(&mut self) -> Result<Expression<'src>, Error<ErrorKind>> {
        return self.or_expression();
    }
}
