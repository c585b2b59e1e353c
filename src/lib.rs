//! Compiler for the Toy language, lowering source text to freestanding
//! x86-64 Linux assembly in NASM syntax.
//!
//! The pipeline is split into small stages that can be driven separately:
//! - [`src_file`] loads the source and maps byte offsets to positions.
//! - [`tokenizer`] performs lexical analysis.
//! - [`ast`] owns the syntax tree and the parser.
//! - [`compiler`] lowers the tree to assembly through a sectioned writer.

use crate::{
    error::CliError,
    logging::{FILE, MODE, OPTIONS, VERSION},
};
use std::{env, fmt::Display, io::IsTerminal, path::PathBuf};

pub mod ast;
pub mod color;
pub mod compiler;
pub mod error;
pub mod logging;
pub mod src_file;
pub mod tokenizer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::Auto => write!(f, "auto"),
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
        };
    }
}

impl Color {
    pub fn set(self, stream: &impl IsTerminal) {
        unsafe {
            color::display = match self {
                Self::Auto => {
                    if stream.is_terminal() {
                        color::color
                    } else {
                        color::no_color
                    }
                }
                Self::Always => color::color,
                Self::Never => color::no_color,
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Normal,
    Quiet,
    Verbose,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::Quiet => write!(f, "quiet"),
            Self::Normal => write!(f, "normal"),
            Self::Verbose => write!(f, "verbose"),
        };
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Help,
    Version,
    Compile {
        src_path: PathBuf,
        out_path: PathBuf,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct Version;

impl Version {
    pub fn print(color: Color) {
        color.set(&std::io::stdout());
        println!("Toy compiler, version {}", VERSION);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Help;

impl Help {
    pub fn print(color: Color) {
        Version::print(color);

        println!(
            r"
Usage: toyc [{OPTIONS}] <input {FILE}> <output {FILE}>

Compiles the input source file to x86-64 assembly in NASM syntax, written to
the output file.

{OPTIONS}:
-h, --help            Display this message (selected when no file arguments are provided)
-v, --version         Display the compiler version
-c, --color <{MODE}>    Whether to display colored output ({MODE}: auto (default), never, always)
-q, --quiet           Don't display any diagnostic messages
-V, --verbose         Display extra diagnostic messages"
        );
    }
}

#[derive(Debug, Default, Clone)]
pub struct Args {
    pub color: Color,
    pub verbosity: Verbosity,
    pub run_mode: RunMode,
}

impl TryFrom<Vec<String>> for Args {
    type Error = CliError;

    fn try_from(args: Vec<String>) -> Result<Self, Self::Error> {
        let mut args_iter = args.iter();
        let _ = args_iter.next(); // skipping the name of this executable

        // the color mode is resolved first so every diagnostic, including
        // errors about the remaining arguments, gets displayed correctly
        let mut color: Option<Color> = None;

        let mut color_args = args_iter.clone();
        while let Some(arg) = color_args.next() {
            if arg == "-c" || arg == "--color" {
                if let Some(mode) = color {
                    return Err(CliError { msg: format!("'{}' color mode already selected", mode).into() });
                }

                let Some(mode) = color_args.next() else {
                    return Err(CliError { msg: "expected color mode".into() });
                };

                color = match mode.as_str() {
                    "auto" => Some(Color::Auto),
                    "always" => Some(Color::Always),
                    "never" => Some(Color::Never),
                    _ => return Err(CliError { msg: format!("unrecognized color mode '{}'", mode).into() }),
                };
            }
        }

        let color = color.unwrap_or_default();
        color.set(&std::io::stderr());

        let mut verbosity: Option<Verbosity> = None;
        let mut help = false;
        let mut version = false;
        let mut src_path: Option<PathBuf> = None;
        let mut out_path: Option<PathBuf> = None;

        while let Some(arg) = args_iter.next() {
            match arg.as_str() {
                "-h" | "--help" => help = true,
                "-v" | "--version" => version = true,
                "-c" | "--color" => {
                    let _ = args_iter.next();
                }
                "-q" | "--quiet" | "-V" | "--verbose" => {
                    if let Some(mode) = verbosity {
                        return Err(CliError {
                            msg: format!("'{}' verbosity mode already selected", mode).into(),
                        });
                    }

                    verbosity = match arg.as_str() {
                        "-q" | "--quiet" => Some(Verbosity::Quiet),
                        "-V" | "--verbose" => Some(Verbosity::Verbose),
                        _ => unreachable!(),
                    };
                }
                _ if arg.starts_with('-') => {
                    return Err(CliError { msg: format!("unrecognized option '{}'", arg).into() });
                }
                _ if src_path.is_none() => src_path = Some(PathBuf::from(arg)),
                _ if out_path.is_none() => out_path = Some(PathBuf::from(arg)),
                _ => {
                    return Err(CliError { msg: format!("unexpected argument '{}'", arg).into() });
                }
            }
        }

        let run_mode = if help {
            RunMode::Help
        } else if version {
            RunMode::Version
        } else {
            match (src_path, out_path) {
                (Some(src_path), Some(out_path)) => RunMode::Compile { src_path, out_path },
                (Some(_), None) => {
                    return Err(CliError { msg: "missing output file path".into() });
                }
                (None, _) => RunMode::Help,
            }
        };

        return Ok(Self { color, verbosity: verbosity.unwrap_or_default(), run_mode });
    }
}

impl TryFrom<env::Args> for Args {
    type Error = CliError;

    fn try_from(args: env::Args) -> Result<Self, Self::Error> {
        return Self::try_from(args.collect::<Vec<String>>());
    }
}
