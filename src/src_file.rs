use crate::error::IoError;
use std::{
    fs::File,
    io::{ErrorKind, Read},
    path::{Path, PathBuf},
};
use unicode_width::UnicodeWidthChar;

/// Byte span of a single source line, not including the line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    /// inclusive
    pub start: usize,

    /// not inclusive
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPosition {
    pub line: usize,
    pub col: usize,
    pub display_col: usize,
}

#[derive(Debug)]
pub struct SrcFile {
    pub(crate) path: PathBuf,
    pub(crate) code: String,
    pub(crate) lines: Vec<Line>,
}

impl SrcFile {
    pub fn load(path: &Path) -> Result<Self, IoError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                return Err(IoError {
                    kind: err.kind(),
                    msg: format!("could not open '{}'", path.display()).into(),
                    cause: err.to_string().into(),
                })
            }
        };

        let metadata = match file.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                return Err(IoError {
                    kind: err.kind(),
                    msg: format!("could not read metadata of '{}'", path.display()).into(),
                    cause: err.to_string().into(),
                })
            }
        };

        if !metadata.is_file() {
            return Err(IoError {
                kind: ErrorKind::InvalidInput,
                msg: format!("invalid path '{}'", path.display()).into(),
                cause: "expected a file but got a directory".into(),
            });
        }

        let mut code = String::new();
        if let Err(err) = file.read_to_string(&mut code) {
            return Err(IoError {
                kind: err.kind(),
                msg: format!("could not read '{}'", path.display()).into(),
                cause: err.to_string().into(),
            });
        }

        return Ok(Self::from_code(path, code));
    }

    /// Builds a source file from an in-memory string, allowing compilation of
    /// sources that do not live on disk.
    pub fn from_code(path: &Path, code: impl Into<String>) -> Self {
        let code = code.into();
        let mut lines = Vec::new();

        let mut line_start = 0;
        let bytes = code.as_bytes();
        for (index, byte) in bytes.iter().enumerate() {
            if *byte == b'\n' {
                let mut line_end = index;
                if line_end > line_start && bytes[line_end - 1] == b'\r' {
                    line_end -= 1;
                }
                lines.push(Line { start: line_start, end: line_end });
                line_start = index + 1;
            }
        }
        lines.push(Line { start: line_start, end: code.len() });

        return Self { path: path.to_owned(), code, lines };
    }

    pub fn path(&self) -> &Path {
        return &self.path;
    }

    pub fn code(&self) -> &str {
        return &self.code;
    }

    fn line_index(&self, col: usize) -> usize {
        let mut left = 0;
        let mut right = self.lines.len() - 1;
        while left < right {
            let middle = left + (right - left) / 2;
            if col <= self.lines[middle].end {
                right = middle;
            } else {
                left = middle + 1;
            }
        }
        return left;
    }

    /// Maps an absolute byte offset to its 1-indexed line and column.
    pub fn position(&self, col: usize) -> Position {
        let line_index = self.line_index(col);
        let line = self.lines[line_index];
        let line_text_before = &self.code[line.start..col.min(line.end)];

        let mut utf8_col = 1;
        for _character in line_text_before.chars() {
            utf8_col += 1;
        }

        return Position { line: line_index + 1, col: utf8_col };
    }

    /// Like [`Self::position`] but also tracking the on-screen column, so that
    /// error pointers line up under wide characters.
    pub fn display_position(&self, col: usize) -> DisplayPosition {
        let line_index = self.line_index(col);
        let line = self.lines[line_index];
        let line_text_before = &self.code[line.start..col.min(line.end)];

        let mut display_col = 1;
        let mut utf8_col = 1;
        for character in line_text_before.chars() {
            display_col += character.width_cjk().unwrap_or_default();
            utf8_col += 1;
        }

        return DisplayPosition { line: line_index + 1, col: utf8_col, display_col };
    }

    pub(crate) fn line_text(&self, col: usize) -> &str {
        let line = self.lines[self.line_index(col)];
        return &self.code[line.start..line.end];
    }
}
