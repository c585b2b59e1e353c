use crate::{
    color::{Bg, ColoredStr, Colored, Fg, Flag},
    Verbosity,
};
use std::{path::Path, time::Instant};

// main compilation steps (displayed when verbosity level is normal or verbose)
pub(crate) const STEP_FG: Fg = Fg::LightGreen;
pub(crate) const STEP_PADDING: usize = 9;

pub static COMPILING: ColoredStr =
    ColoredStr { text: "Compiling", fg: STEP_FG, bg: Bg::Default, flags: Flag::Bold };
pub static DONE: ColoredStr =
    ColoredStr { text: "Done", fg: STEP_FG, bg: Bg::Default, flags: Flag::Bold };

// sub compilation steps (displayed when verbosity level is verbose)
pub(crate) const SUBSTEP_FG: Fg = Fg::LightBlue;
pub(crate) const SUBSTEP_PADDING: usize = 14;

pub static LOADING_SOURCE: ColoredStr =
    ColoredStr { text: "Loading Source", fg: SUBSTEP_FG, bg: Bg::Default, flags: Flag::Bold };
pub static LEXING: ColoredStr =
    ColoredStr { text: "Lexing", fg: SUBSTEP_FG, bg: Bg::Default, flags: Flag::Bold };
pub static AST_BUILDING: ColoredStr =
    ColoredStr { text: "Ast building", fg: SUBSTEP_FG, bg: Bg::Default, flags: Flag::Bold };
pub static ASM_GENERATION: ColoredStr =
    ColoredStr { text: "Asm Generation", fg: SUBSTEP_FG, bg: Bg::Default, flags: Flag::Bold };
pub static SUBSTEP_DONE: ColoredStr =
    ColoredStr { text: "Done", fg: SUBSTEP_FG, bg: Bg::Default, flags: Flag::Bold };

// help message labels
const HELP_FG: Fg = Fg::White;

pub(crate) static VERSION: ColoredStr =
    ColoredStr { text: env!("CARGO_PKG_VERSION"), fg: HELP_FG, bg: Bg::Default, flags: Flag::Bold };
pub(crate) static OPTIONS: ColoredStr =
    ColoredStr { text: "Options", fg: HELP_FG, bg: Bg::Default, flags: Flag::Bold };
pub(crate) static MODE: ColoredStr =
    ColoredStr { text: "mode", fg: HELP_FG, bg: Bg::Default, flags: Flag::Bold };
pub(crate) static FILE: ColoredStr =
    ColoredStr { text: "file", fg: HELP_FG, bg: Bg::Default, flags: Flag::Bold };

/// Displays the progress of each compilation step on stderr, gated by the
/// selected [`Verbosity`].
#[derive(Debug)]
pub struct Logger {
    start_time: Instant,
    step_time: Instant,
    substep_time: Instant,
    verbosity: Verbosity,
}

impl Logger {
    pub fn new(verbosity: Verbosity) -> Self {
        let now = Instant::now();
        return Self { start_time: now, step_time: now, substep_time: now, verbosity };
    }

    fn step_display(step: &'static ColoredStr, path: &Path) {
        eprintln!("{:>STEP_PADDING$}: {}", step, path.display());
    }

    fn substep_display(start_time: &Instant, indent: usize, step: &'static ColoredStr, padding: usize) {
        let elapsed_time = Colored {
            text: format!("{}s", start_time.elapsed().as_secs_f64()),
            fg: Fg::White,
            ..Default::default()
        };

        eprintln!("{:indent$}{:>padding$}: in {}", "", step, elapsed_time);
    }

    pub fn step(&mut self, step: &'static ColoredStr, path: &Path) {
        match self.verbosity {
            Verbosity::Quiet => {}
            Verbosity::Normal | Verbosity::Verbose => Self::step_display(step, path),
        }
    }

    pub fn done(&mut self) {
        match self.verbosity {
            Verbosity::Quiet => {}
            Verbosity::Normal | Verbosity::Verbose => {
                Self::substep_display(&self.start_time, 0, &DONE, STEP_PADDING);
            }
        }
    }

    pub fn substep(&mut self, step: &'static ColoredStr) {
        match self.verbosity {
            Verbosity::Quiet | Verbosity::Normal => {}
            Verbosity::Verbose => {
                Self::substep_display(&self.substep_time, 4, step, SUBSTEP_PADDING);
                self.substep_time = Instant::now();
            }
        }
    }

    pub fn substep_done(&mut self) {
        match self.verbosity {
            Verbosity::Quiet | Verbosity::Normal => {}
            Verbosity::Verbose => {
                Self::substep_display(&self.step_time, 4, &SUBSTEP_DONE, SUBSTEP_PADDING);
                let new_step_time = Instant::now();
                (self.step_time, self.substep_time) = (new_step_time, new_step_time);
            }
        }
    }
}
