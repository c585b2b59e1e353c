use crate::{
    color::{Bg, Colored, ColoredStr, Fg, Flag},
    src_file::{DisplayPosition, SrcFile},
};
use std::{borrow::Cow, fmt::Debug, fmt::Display, io::ErrorKind, path::Path};

const ERR_FG: Fg = Fg::LightRed;
const BAR_FG: Fg = Fg::LightBlue;

pub static ERROR: ColoredStr =
    ColoredStr { text: "Error", fg: ERR_FG, bg: Bg::Default, flags: Flag::Bold };
pub static CAUSE: ColoredStr =
    ColoredStr { text: "Cause", fg: ERR_FG, bg: Bg::Default, flags: Flag::Bold };
pub static AT: ColoredStr = ColoredStr { text: "at", fg: ERR_FG, bg: Bg::Default, flags: Flag::Bold };
pub static BAR: ColoredStr = ColoredStr { text: "|", fg: BAR_FG, bg: Bg::Default, flags: Flag::Bold };

#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub msg: Cow<'static, str>,
    pub cause: Cow<'static, str>,
}

pub trait IntoErrorInfo: Debug + Clone {
    fn info(&self) -> ErrorInfo;
}

/// An error anchored to a byte offset in the source code.
///
/// The `kind` only knows what went wrong; where it went wrong is resolved
/// against the source file when the error gets displayed.
#[derive(Debug, Clone)]
pub struct Error<K: IntoErrorInfo> {
    pub kind: K,

    /// absolute source code byte position
    pub col: usize,
    pub pointers_count: usize,
}

impl<K: IntoErrorInfo> Error<K> {
    pub fn display<'src>(&self, src: &'src SrcFile) -> ErrorDisplay<'src> {
        let DisplayPosition { line, col, display_col } = src.display_position(self.col);
        let ErrorInfo { msg, cause } = self.kind.info();

        return ErrorDisplay {
            msg,
            path: src.path(),
            line,
            col,
            line_text: src.line_text(self.col),
            pointers_offset: display_col,
            pointers_count: self.pointers_count,
            cause,
        };
    }
}

#[derive(Debug, Clone)]
pub struct ErrorDisplay<'src> {
    pub msg: Cow<'static, str>,
    pub path: &'src Path,
    pub line: usize,
    pub col: usize,
    pub line_text: &'src str,
    pub pointers_offset: usize,
    pub pointers_count: usize,
    pub cause: Cow<'static, str>,
}

impl Display for ErrorDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let error_msg = Colored {
            text: self.msg.to_string(),
            fg: Fg::White,
            bg: Bg::Default,
            flags: Flag::Bold,
        };

        let line_number = Colored {
            text: self.line.to_string(),
            fg: BAR_FG,
            bg: Bg::Default,
            flags: Flag::Bold,
        };

        let visualization_padding = line_number.text.len() + 1 + BAR.text.len();
        let at_padding = visualization_padding - 1;

        let pointers_and_cause = Colored {
            text: format!(
                "{spaces:>pointers_offset$}{spaces:^>pointers_count$} {cause}",
                spaces = "",
                pointers_offset = self.pointers_offset - 1,
                pointers_count = self.pointers_count,
                cause = self.cause,
            ),
            fg: ERR_FG,
            bg: Bg::Default,
            flags: Flag::Bold,
        };

        return write!(
            f,
            "{ERROR}: {error_msg}\
            \n{AT:>at_padding$}: {path}:{line}:{col}\
            \n{BAR:>visualization_padding$}\
            \n{line_number} {BAR} {line_text}\
            \n{BAR:>visualization_padding$} {pointers_and_cause}",
            path = self.path.display(),
            line = self.line,
            col = self.col,
            line_text = self.line_text,
        );
    }
}

impl std::error::Error for ErrorDisplay<'_> {}

#[derive(Debug)]
pub struct CliError {
    pub msg: Cow<'static, str>,
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}: {}", ERROR, self.msg);
    }
}

impl std::error::Error for CliError {}

#[derive(Debug)]
pub struct IoError {
    pub kind: ErrorKind,
    pub msg: Cow<'static, str>,
    pub cause: Cow<'static, str>,
}

impl Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(
            f,
            "{}: {} [{}]\
            \n{}: {}",
            ERROR, self.msg, self.kind, CAUSE, self.cause
        );
    }
}

impl std::error::Error for IoError {}
