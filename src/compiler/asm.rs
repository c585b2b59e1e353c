use std::collections::BTreeMap;
use std::fmt::Display;

/// Logical sections of the emitted assembly file, rendered in the order
/// `.data`, `.bss`, `.text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Data,
    Bss,
    Text,
}

impl Section {
    pub(crate) fn name(self) -> &'static str {
        return match self {
            Self::Data => "data",
            Self::Bss => "bss",
            Self::Text => "text",
        };
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "section .{}", self.name());
    }
}

/// Buffered assembly emitter.
///
/// Lines accumulate in per-section buffers and are only concatenated once, by
/// [`AsmWriter::render`]. Label counters advance independently per label
/// class, so every minted label is unique within one compilation.
#[derive(Debug, Default)]
pub struct AsmWriter {
    data: String,
    bss: String,
    text: String,
    label_counters: BTreeMap<&'static str, usize>,
}

const INDENT: &str = "  ";

impl AsmWriter {
    pub fn new() -> Self {
        return Self::default();
    }

    fn buffer(&mut self, section: Section) -> &mut String {
        return match section {
            Section::Data => &mut self.data,
            Section::Bss => &mut self.bss,
            Section::Text => &mut self.text,
        };
    }

    /// Appends one indented line of code to a section.
    pub fn emit_line(&mut self, section: Section, line: impl AsRef<str>) {
        let buffer = self.buffer(section);
        *buffer += INDENT;
        *buffer += line.as_ref();
        buffer.push('\n');
    }

    /// Appends one line without indentation, for directives and separators.
    pub fn emit_raw(&mut self, section: Section, line: impl AsRef<str>) {
        let buffer = self.buffer(section);
        *buffer += line.as_ref();
        buffer.push('\n');
    }

    /// Appends a `name:` label definition at column zero.
    pub fn emit_label(&mut self, section: Section, name: impl AsRef<str>) {
        let buffer = self.buffer(section);
        *buffer += name.as_ref();
        *buffer += ":\n";
    }

    /// Appends an indented `; text` comment line.
    pub fn emit_comment(&mut self, section: Section, text: impl AsRef<str>) {
        let buffer = self.buffer(section);
        *buffer += INDENT;
        *buffer += "; ";
        *buffer += text.as_ref();
        buffer.push('\n');
    }

    /// Mints a fresh `class.N` label, advancing the class's counter.
    pub fn new_label(&mut self, class: &'static str) -> String {
        let counter = self.label_counters.entry(class).or_insert(0);
        let label = format!("{}.{}", class, counter);
        *counter += 1;
        return label;
    }

    /// Concatenates the sections into the final assembly text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.data.len() + self.bss.len() + self.text.len() + 64,
        );

        for (section, buffer) in [
            (Section::Data, &self.data),
            (Section::Bss, &self.bss),
            (Section::Text, &self.text),
        ] {
            out += &section.to_string();
            out.push('\n');
            out += buffer;
            out.push('\n');
        }

        // dropping the trailing separator so the file ends with a single newline
        out.pop();
        return out;
    }
}
