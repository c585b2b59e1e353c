use crate::{
    error::{Error, ErrorInfo, IntoErrorInfo},
    src_file::SrcFile,
};
use std::fmt::Display;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // unary operators
    Not,

    // binary operators
    Times,
    Divide,
    Plus,
    Minus,

    EqualsEquals,
    NotEquals,
    Greater,
    GreaterOrEquals,
    Less,
    LessOrEquals,

    And,
    Or,
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::Not => write!(f, "!"),
            Self::Times => write!(f, "*"),
            Self::Divide => write!(f, "/"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::EqualsEquals => write!(f, "=="),
            Self::NotEquals => write!(f, "!="),
            Self::Greater => write!(f, ">"),
            Self::GreaterOrEquals => write!(f, ">="),
            Self::Less => write!(f, "<"),
            Self::LessOrEquals => write!(f, "<="),
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
        };
    }
}

impl Op {
    pub(crate) fn src_code_len(self) -> usize {
        return match self {
            Self::Not | Self::Times | Self::Divide | Self::Plus | Self::Minus | Self::Greater | Self::Less => 1,
            Self::EqualsEquals
            | Self::NotEquals
            | Self::GreaterOrEquals
            | Self::LessOrEquals
            | Self::And
            | Self::Or => 2,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'src> {
    OpenRound,
    CloseRound,
    OpenCurly,
    CloseCurly,
    Comma,
    SemiColon,
    Equals,
    Op(Op),

    Int(i64),
    Str(&'src str),
    Identifier(&'src str),

    // keywords
    Print,
    If,
    Else,
    While,
    For,
    Sub,
    Return,
    Break,
    Continue,
}

impl Display for TokenKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::OpenRound => write!(f, "("),
            Self::CloseRound => write!(f, ")"),
            Self::OpenCurly => write!(f, "{{"),
            Self::CloseCurly => write!(f, "}}"),
            Self::Comma => write!(f, ","),
            Self::SemiColon => write!(f, ";"),
            Self::Equals => write!(f, "="),
            Self::Op(op) => write!(f, "{}", op),
            Self::Int(value) => write!(f, "{}", value),
            Self::Str(text) => write!(f, "\"{}\"", text),
            Self::Identifier(name) => write!(f, "{}", name),
            Self::Print => write!(f, "print"),
            Self::If => write!(f, "if"),
            Self::Else => write!(f, "else"),
            Self::While => write!(f, "while"),
            Self::For => write!(f, "for"),
            Self::Sub => write!(f, "sub"),
            Self::Return => write!(f, "return"),
            Self::Break => write!(f, "break"),
            Self::Continue => write!(f, "continue"),
        };
    }
}

impl TokenKind<'_> {
    pub(crate) fn src_code_len(&self) -> usize {
        return match self {
            Self::OpenRound
            | Self::CloseRound
            | Self::OpenCurly
            | Self::CloseCurly
            | Self::Comma
            | Self::SemiColon
            | Self::Equals => 1,
            Self::Op(op) => op.src_code_len(),
            Self::Int(value) => value.to_string().len(),
            Self::Str(text) => text.len() + 2,
            Self::Identifier(name) => name.len(),
            Self::If => 2,
            Self::Sub | Self::For => 3,
            Self::Else => 4,
            Self::Print | Self::While | Self::Break => 5,
            Self::Return => 6,
            Self::Continue => 8,
        };
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Token<'src> {
    pub kind: TokenKind<'src>,

    /// absolute byte offset of the first character of this token
    pub col: usize,
}

#[derive(Debug, Clone)]
pub enum ErrorKind {
    UnrecognizedCharacter(String),
    NonAsciiInIdentifier(String),
    NonDigitInIntegerLiteral,
    IntegerLiteralOverflow,
    UnterminatedString,
    StrayAmpersand,
    StrayPipe,
}

impl IntoErrorInfo for ErrorKind {
    fn info(&self) -> ErrorInfo {
        return match self {
            Self::UnrecognizedCharacter(grapheme) => ErrorInfo {
                msg: format!("unrecognized character '{}'", grapheme).into(),
                cause: "unexpected".into(),
            },
            Self::NonAsciiInIdentifier(grapheme) => ErrorInfo {
                msg: format!("invalid identifier character '{}'", grapheme).into(),
                cause: "identifiers may only contain ASCII letters, digits and underscores".into(),
            },
            Self::NonDigitInIntegerLiteral => ErrorInfo {
                msg: "invalid integer literal".into(),
                cause: "contains non-digit characters".into(),
            },
            Self::IntegerLiteralOverflow => ErrorInfo {
                msg: "invalid integer literal".into(),
                cause: format!("overflows a {} bit signed integer (over {})", i64::BITS, i64::MAX).into(),
            },
            Self::UnterminatedString => ErrorInfo {
                msg: "invalid string literal".into(),
                cause: "missing closing double quote before the end of the line".into(),
            },
            Self::StrayAmpersand => ErrorInfo {
                msg: "unrecognized character '&'".into(),
                cause: "did you mean '&&'?".into(),
            },
            Self::StrayPipe => ErrorInfo {
                msg: "unrecognized character '|'".into(),
                cause: "did you mean '||'?".into(),
            },
        };
    }
}

#[derive(Debug)]
pub struct Tokenizer<'src> {
    code: &'src str,
    col: usize,
    token_start_col: usize,
    tokens: Vec<Token<'src>>,
}

impl<'src> Tokenizer<'src> {
    pub fn tokenize(src: &'src SrcFile) -> Result<Vec<Token<'src>>, Error<ErrorKind>> {
        let mut this = Self { code: src.code(), col: 0, token_start_col: 0, tokens: Vec::new() };

        loop {
            match this.tokenize_next()? {
                Some(kind) => {
                    let token = Token { kind, col: this.token_start_col };
                    this.tokens.push(token);
                }
                None => {
                    if this.col >= this.code.len() {
                        break;
                    }
                }
            }
        }

        return Ok(this.tokens);
    }

    fn peek(&self) -> Option<u8> {
        return self.code.as_bytes().get(self.col).copied();
    }

    fn error(&self, kind: ErrorKind, col: usize, pointers_count: usize) -> Error<ErrorKind> {
        return Error { kind, col, pointers_count: pointers_count.max(1) };
    }

    fn grapheme_at(&self, col: usize) -> &'src str {
        return self.code[col..].graphemes(true).next().unwrap_or("");
    }

    /// Scans the next token, skipping whitespace and comments.
    ///
    /// Returns `Ok(None)` when only whitespace or a comment was consumed, so
    /// the caller decides whether the end of the source was reached.
    fn tokenize_next(&mut self) -> Result<Option<TokenKind<'src>>, Error<ErrorKind>> {
        // skipping whitespace
        while let Some(byte) = self.peek() {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.col += 1;
        }

        let Some(next) = self.peek() else {
            return Ok(None);
        };

        self.token_start_col = self.col;
        self.col += 1;

        return match next {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while let Some(byte) = self.peek() {
                    match byte {
                        b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.col += 1,
                        _ if byte.is_ascii() => break,
                        _ => {
                            let grapheme = self.grapheme_at(self.col);
                            return Err(self.error(
                                ErrorKind::NonAsciiInIdentifier(grapheme.to_owned()),
                                self.col,
                                grapheme.width_cjk(),
                            ));
                        }
                    }
                }

                let identifier = &self.code[self.token_start_col..self.col];
                let kind = match identifier {
                    "print" => TokenKind::Print,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    "while" => TokenKind::While,
                    "for" => TokenKind::For,
                    "sub" => TokenKind::Sub,
                    "return" => TokenKind::Return,
                    "break" => TokenKind::Break,
                    "continue" => TokenKind::Continue,
                    _ => TokenKind::Identifier(identifier),
                };

                Ok(Some(kind))
            }
            b'0'..=b'9' => {
                let mut contains_non_digit = false;
                while let Some(byte) = self.peek() {
                    match byte {
                        b'0'..=b'9' => self.col += 1,
                        b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                            contains_non_digit = true;
                            self.col += 1;
                        }
                        _ => break,
                    }
                }

                let literal = &self.code[self.token_start_col..self.col];
                if contains_non_digit {
                    return Err(self.error(
                        ErrorKind::NonDigitInIntegerLiteral,
                        self.token_start_col,
                        literal.len(),
                    ));
                }

                match literal.parse() {
                    Ok(value) => Ok(Some(TokenKind::Int(value))),
                    Err(_) => Err(self.error(
                        ErrorKind::IntegerLiteralOverflow,
                        self.token_start_col,
                        literal.len(),
                    )),
                }
            }
            b'"' => {
                loop {
                    match self.peek() {
                        Some(b'"') => {
                            self.col += 1;
                            break;
                        }
                        Some(b'\n') | None => {
                            return Err(self.error(
                                ErrorKind::UnterminatedString,
                                self.token_start_col,
                                self.col - self.token_start_col,
                            ));
                        }
                        Some(_) => self.col += 1,
                    }
                }

                let text = &self.code[self.token_start_col + 1..self.col - 1];
                Ok(Some(TokenKind::Str(text)))
            }
            b'/' => match self.peek() {
                Some(b'/') => {
                    // consuming the rest of the line
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.col += 1;
                    }
                    Ok(None)
                }
                _ => Ok(Some(TokenKind::Op(Op::Divide))),
            },
            b'(' => Ok(Some(TokenKind::OpenRound)),
            b')' => Ok(Some(TokenKind::CloseRound)),
            b'{' => Ok(Some(TokenKind::OpenCurly)),
            b'}' => Ok(Some(TokenKind::CloseCurly)),
            b',' => Ok(Some(TokenKind::Comma)),
            b';' => Ok(Some(TokenKind::SemiColon)),
            b'*' => Ok(Some(TokenKind::Op(Op::Times))),
            b'+' => Ok(Some(TokenKind::Op(Op::Plus))),
            b'-' => Ok(Some(TokenKind::Op(Op::Minus))),
            b'!' => match self.peek() {
                Some(b'=') => {
                    self.col += 1;
                    Ok(Some(TokenKind::Op(Op::NotEquals)))
                }
                _ => Ok(Some(TokenKind::Op(Op::Not))),
            },
            b'=' => match self.peek() {
                Some(b'=') => {
                    self.col += 1;
                    Ok(Some(TokenKind::Op(Op::EqualsEquals)))
                }
                _ => Ok(Some(TokenKind::Equals)),
            },
            b'>' => match self.peek() {
                Some(b'=') => {
                    self.col += 1;
                    Ok(Some(TokenKind::Op(Op::GreaterOrEquals)))
                }
                _ => Ok(Some(TokenKind::Op(Op::Greater))),
            },
            b'<' => match self.peek() {
                Some(b'=') => {
                    self.col += 1;
                    Ok(Some(TokenKind::Op(Op::LessOrEquals)))
                }
                _ => Ok(Some(TokenKind::Op(Op::Less))),
            },
            b'&' => match self.peek() {
                Some(b'&') => {
                    self.col += 1;
                    Ok(Some(TokenKind::Op(Op::And)))
                }
                _ => Err(self.error(ErrorKind::StrayAmpersand, self.token_start_col, 1)),
            },
            b'|' => match self.peek() {
                Some(b'|') => {
                    self.col += 1;
                    Ok(Some(TokenKind::Op(Op::Or)))
                }
                _ => Err(self.error(ErrorKind::StrayPipe, self.token_start_col, 1)),
            },
            _ => {
                self.col -= 1;
                let grapheme = self.grapheme_at(self.col);
                let col = self.col;
                self.col += grapheme.len().max(1);
                Err(self.error(
                    ErrorKind::UnrecognizedCharacter(grapheme.to_owned()),
                    col,
                    grapheme.width_cjk(),
                ))
            }
        };
    }
}
