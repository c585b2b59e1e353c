pub mod asm;
pub mod scope;

use self::{
    asm::{AsmWriter, Section},
    scope::{Scope, StringTable, SLOT_SIZE},
};
use crate::{
    ast::{Expression, Item, Node, Program, Subroutine, UnaryOp},
    error::{Error, ErrorInfo, IntoErrorInfo},
    tokenizer::Op,
};

#[derive(Debug, Clone)]
pub enum ErrorKind {
    ReturnOutsideSubroutine,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    UndefinedSubroutine(String),
    RedefinedSubroutine(String),
    ArityMismatch { name: String, expected: usize, found: usize },
    StringOutsidePrint,
}

impl IntoErrorInfo for ErrorKind {
    fn info(&self) -> ErrorInfo {
        return match self {
            Self::ReturnOutsideSubroutine => ErrorInfo {
                msg: "invalid return statement".into(),
                cause: "can only be used inside a subroutine".into(),
            },
            Self::BreakOutsideLoop => ErrorInfo {
                msg: "invalid break statement".into(),
                cause: "can only be used inside a loop".into(),
            },
            Self::ContinueOutsideLoop => ErrorInfo {
                msg: "invalid continue statement".into(),
                cause: "can only be used inside a loop".into(),
            },
            Self::UndefinedSubroutine(name) => ErrorInfo {
                msg: format!("call to undefined subroutine '{}'", name).into(),
                cause: "not defined anywhere in this program".into(),
            },
            Self::RedefinedSubroutine(name) => ErrorInfo {
                msg: format!("redefinition of subroutine '{}'", name).into(),
                cause: "a subroutine with this name was already defined".into(),
            },
            Self::ArityMismatch { name, expected, found } => ErrorInfo {
                msg: format!("invalid call to subroutine '{}'", name).into(),
                cause: format!("expected {} arguments but got {}", expected, found).into(),
            },
            Self::StringOutsidePrint => ErrorInfo {
                msg: "invalid string literal".into(),
                cause: "strings may only appear as the argument of a print statement".into(),
            },
        };
    }
}

/// Jump targets of the innermost enclosing loop.
#[derive(Debug)]
struct LoopContext {
    continue_label: String,
    break_label: String,
}

/// Lowers a [`Program`] to NASM x86-64 assembly text.
///
/// Every expression leaves its result in `rax`; binary operators spill the
/// left operand to the stack while the right one is evaluated. A single
/// active scope map is held at any point: the main program's while lowering
/// top-level code, the subroutine's while lowering its body.
#[derive(Debug)]
pub struct Compiler<'src> {
    writer: AsmWriter,
    strings: StringTable<'src>,
    subroutines: Vec<(&'src str, usize)>,

    scope: Scope<'src>,
    in_subroutine: bool,
    loop_stack: Vec<LoopContext>,
}

impl<'src> Compiler<'src> {
    pub fn compile(program: &Program<'src>) -> Result<String, Error<ErrorKind>> {
        let mut subroutines: Vec<(&'src str, usize)> = Vec::new();
        for item in &program.items {
            if let Item::Subroutine(subroutine) = item {
                if subroutines.iter().any(|(name, _)| *name == subroutine.name) {
                    return Err(Error {
                        kind: ErrorKind::RedefinedSubroutine(subroutine.name.to_owned()),
                        col: subroutine.col,
                        pointers_count: subroutine.name.len(),
                    });
                }
                subroutines.push((subroutine.name, subroutine.params.len()));
            }
        }

        let mut this = Self {
            writer: AsmWriter::new(),
            strings: StringTable::collect(program),
            subroutines,
            scope: Scope::of_program(program),
            in_subroutine: false,
            loop_stack: Vec::new(),
        };

        this.string_constants();
        this.text_header();
        this.main_program(program)?;

        // subroutines are placed after the exit syscall so the instruction
        // stream cannot fall through into them
        for item in &program.items {
            if let Item::Subroutine(subroutine) = item {
                this.subroutine(subroutine)?;
            }
        }

        return Ok(this.writer.render());
    }

    fn string_constants(&mut self) {
        for (index, text) in self.strings.iter().collect::<Vec<_>>() {
            self.writer.emit_raw(Section::Data, format!("const.{}: db \"{}\", 0", index, text));
            self.writer
                .emit_raw(Section::Data, format!("const.{}_len equ $ - const.{} - 1", index, index));
        }
    }

    fn text_header(&mut self) {
        self.writer.emit_raw(Section::Text, "global _start");
        self.writer.emit_raw(Section::Text, "extern print_int");
        self.writer.emit_raw(Section::Text, "extern print_newline");
        self.writer.emit_raw(Section::Text, "");
        self.writer.emit_comment(
            Section::Text,
            "call arguments are evaluated right to left and pushed as computed,",
        );
        self.writer.emit_comment(Section::Text, "so the first argument ends up at [rbp+16]");
        self.writer.emit_raw(Section::Text, "");
    }

    fn main_program(&mut self, program: &Program<'src>) -> Result<(), Error<ErrorKind>> {
        self.writer.emit_label(Section::Text, "_start");
        self.prologue();

        for item in &program.items {
            if let Item::Statement(node) = item {
                self.node(node)?;
            }
        }

        self.writer.emit_raw(Section::Text, "");
        self.writer.emit_comment(Section::Text, "exit with status 0");
        self.writer.emit_line(Section::Text, "mov rsp, rbp");
        self.writer.emit_line(Section::Text, "pop rbp");
        self.writer.emit_line(Section::Text, "mov rax, 60");
        self.writer.emit_line(Section::Text, "xor rdi, rdi");
        self.writer.emit_line(Section::Text, "syscall");

        return Ok(());
    }

    fn subroutine(&mut self, subroutine: &Subroutine<'src>) -> Result<(), Error<ErrorKind>> {
        let enclosing_scope = std::mem::replace(&mut self.scope, Scope::of_subroutine(subroutine));
        self.in_subroutine = true;

        self.writer.emit_raw(Section::Text, "");
        self.writer
            .emit_comment(Section::Text, format!("===== subroutine {} =====", subroutine.name));
        self.writer.emit_label(Section::Text, subroutine.name);
        self.prologue();

        for node in &subroutine.body {
            self.node(node)?;
        }

        // implicit `return 0` for bodies that do not end in a return statement
        if !matches!(subroutine.body.last(), Some(Node::Return { .. })) {
            self.writer.emit_line(Section::Text, "xor rax, rax");
            self.return_sequence();
        }

        self.in_subroutine = false;
        self.scope = enclosing_scope;
        return Ok(());
    }

    /// Frame setup shared by `_start` and every subroutine: save the caller's
    /// frame pointer, reserve one slot per local, zero them all.
    fn prologue(&mut self) {
        self.writer.emit_line(Section::Text, "push rbp");
        self.writer.emit_line(Section::Text, "mov rbp, rsp");

        let locals_count = self.scope.locals_count();
        if locals_count > 0 {
            self.writer
                .emit_line(Section::Text, format!("sub rsp, {}", SLOT_SIZE * locals_count as i64));
        }

        self.layout_comments();

        for (_, offset) in self.scope.locals().to_vec() {
            self.writer.emit_line(Section::Text, format!("mov qword [rbp{:+}], 0", offset));
        }
        self.writer.emit_raw(Section::Text, "");
    }

    fn layout_comments(&mut self) {
        if self.scope.params().is_empty() && self.scope.locals().is_empty() {
            return;
        }

        self.writer.emit_comment(Section::Text, "variable layout (offsets from rbp):");

        let mut params = self.scope.params().to_vec();
        params.sort_by_key(|param| -param.1);
        for (name, offset) in params {
            self.writer.emit_comment(Section::Text, format!("  [rbp{:+}] = {}", offset, name));
        }

        if self.in_subroutine {
            self.writer.emit_comment(Section::Text, "  [rbp+8] = return address");
            self.writer.emit_comment(Section::Text, "  [rbp+0] = saved rbp");
        }

        for (name, offset) in self.scope.locals().to_vec() {
            self.writer.emit_comment(Section::Text, format!("  [rbp{:+}] = {}", offset, name));
        }
    }

    fn return_sequence(&mut self) {
        self.writer.emit_line(Section::Text, "mov rsp, rbp");
        self.writer.emit_line(Section::Text, "pop rbp");
        self.writer.emit_line(Section::Text, "ret");
    }
}

// statements
impl<'src> Compiler<'src> {
    fn node(&mut self, node: &Node<'src>) -> Result<(), Error<ErrorKind>> {
        self.writer.emit_comment(Section::Text, node.to_string());

        match node {
            Node::Assign { name, value } => {
                self.assignment(name, value)?;
            }
            Node::Print { value } => match value {
                Expression::Str { text, .. } => self.print_string(text),
                _ => {
                    self.expression(value)?;
                    self.writer.emit_line(Section::Text, "mov rdi, rax");
                    self.writer.emit_line(Section::Text, "call print_int");
                    self.writer.emit_line(Section::Text, "call print_newline");
                }
            },
            Node::If { condition, then_block, else_block } => {
                let if_label = self.writer.new_label("if");
                let endif_label = self.writer.new_label("endif");

                self.writer.emit_label(Section::Text, &if_label);
                self.expression(condition)?;
                self.writer.emit_line(Section::Text, "test rax, rax");

                match else_block {
                    Some(else_block) => {
                        let else_label = self.writer.new_label("else");
                        self.writer.emit_line(Section::Text, format!("jz {}", else_label));

                        for node in then_block {
                            self.node(node)?;
                        }
                        self.writer.emit_line(Section::Text, format!("jmp {}", endif_label));

                        self.writer.emit_label(Section::Text, &else_label);
                        for node in else_block {
                            self.node(node)?;
                        }
                    }
                    None => {
                        self.writer.emit_line(Section::Text, format!("jz {}", endif_label));
                        for node in then_block {
                            self.node(node)?;
                        }
                    }
                }

                self.writer.emit_label(Section::Text, &endif_label);
            }
            Node::While { condition, body } => {
                let while_label = self.writer.new_label("while");
                let endwhile_label = self.writer.new_label("endwhile");

                self.writer.emit_label(Section::Text, &while_label);
                self.expression(condition)?;
                self.writer.emit_line(Section::Text, "test rax, rax");
                self.writer.emit_line(Section::Text, format!("jz {}", endwhile_label));

                self.loop_stack.push(LoopContext {
                    continue_label: while_label.clone(),
                    break_label: endwhile_label.clone(),
                });
                for node in body {
                    self.node(node)?;
                }
                let _ = self.loop_stack.pop();

                self.writer.emit_line(Section::Text, format!("jmp {}", while_label));
                self.writer.emit_label(Section::Text, &endwhile_label);
            }
            Node::For { init_name, init, condition, update_name, update, body } => {
                let for_label = self.writer.new_label("for");
                let update_label = self.writer.new_label("update");
                let endfor_label = self.writer.new_label("endfor");

                self.assignment(init_name, init)?;

                self.writer.emit_label(Section::Text, &for_label);
                self.expression(condition)?;
                self.writer.emit_line(Section::Text, "test rax, rax");
                self.writer.emit_line(Section::Text, format!("jz {}", endfor_label));

                self.loop_stack.push(LoopContext {
                    continue_label: update_label.clone(),
                    break_label: endfor_label.clone(),
                });
                for node in body {
                    self.node(node)?;
                }
                let _ = self.loop_stack.pop();

                self.writer.emit_label(Section::Text, &update_label);
                self.assignment(update_name, update)?;
                self.writer.emit_line(Section::Text, format!("jmp {}", for_label));
                self.writer.emit_label(Section::Text, &endfor_label);
            }
            Node::Break { col } => {
                let Some(context) = self.loop_stack.last() else {
                    return Err(Error {
                        kind: ErrorKind::BreakOutsideLoop,
                        col: *col,
                        pointers_count: "break".len(),
                    });
                };
                let break_label = context.break_label.clone();
                self.writer.emit_line(Section::Text, format!("jmp {}", break_label));
            }
            Node::Continue { col } => {
                let Some(context) = self.loop_stack.last() else {
                    return Err(Error {
                        kind: ErrorKind::ContinueOutsideLoop,
                        col: *col,
                        pointers_count: "continue".len(),
                    });
                };
                let continue_label = context.continue_label.clone();
                self.writer.emit_line(Section::Text, format!("jmp {}", continue_label));
            }
            Node::Return { value, col } => {
                if !self.in_subroutine {
                    return Err(Error {
                        kind: ErrorKind::ReturnOutsideSubroutine,
                        col: *col,
                        pointers_count: "return".len(),
                    });
                }

                match value {
                    Some(value) => self.expression(value)?,
                    None => self.writer.emit_line(Section::Text, "xor rax, rax"),
                }
                self.return_sequence();
            }
            Node::Call(call) => {
                // return value in rax gets discarded
                self.expression(call)?;
            }
        }

        return Ok(());
    }

    fn assignment(&mut self, name: &str, value: &Expression<'src>) -> Result<(), Error<ErrorKind>> {
        self.expression(value)?;
        let offset = self.scope.offset(name);
        self.writer.emit_line(Section::Text, format!("mov [rbp{:+}], rax", offset));
        return Ok(());
    }

    fn print_string(&mut self, text: &str) {
        // the empty string has nothing to write, only the newline remains
        if let Some(index) = self.strings.label_index(text) {
            self.writer.emit_line(Section::Text, "mov rax, 1");
            self.writer.emit_line(Section::Text, "mov rdi, 1");
            self.writer.emit_line(Section::Text, format!("lea rsi, [rel const.{}]", index));
            self.writer.emit_line(Section::Text, format!("mov rdx, const.{}_len", index));
            self.writer.emit_line(Section::Text, "syscall");
        }
        self.writer.emit_line(Section::Text, "call print_newline");
    }
}

// expressions
impl<'src> Compiler<'src> {
    /// Lowers an expression, leaving its value in `rax`.
    fn expression(&mut self, expression: &Expression<'src>) -> Result<(), Error<ErrorKind>> {
        match expression {
            Expression::Int(value) => {
                self.writer.emit_line(Section::Text, format!("mov rax, {}", value));
            }
            Expression::Str { text, col } => {
                return Err(Error {
                    kind: ErrorKind::StringOutsidePrint,
                    col: *col,
                    pointers_count: text.len() + 2,
                });
            }
            Expression::Variable { name } => {
                let offset = self.scope.offset(name);
                self.writer.emit_line(Section::Text, format!("mov rax, [rbp{:+}]", offset));
            }
            Expression::Binary { lhs, op: op @ (Op::And | Op::Or), rhs } => {
                self.short_circuit(lhs, *op, rhs)?;
            }
            Expression::Binary { lhs, op, rhs } => {
                self.expression(lhs)?;
                self.writer.emit_line(Section::Text, "push rax");
                self.expression(rhs)?;
                self.writer.emit_line(Section::Text, "pop rcx");

                // left operand in rcx, right operand in rax
                match op {
                    Op::Plus => self.writer.emit_line(Section::Text, "add rax, rcx"),
                    Op::Minus => {
                        self.writer.emit_line(Section::Text, "sub rcx, rax");
                        self.writer.emit_line(Section::Text, "mov rax, rcx");
                    }
                    Op::Times => self.writer.emit_line(Section::Text, "imul rax, rcx"),
                    Op::Divide => {
                        self.writer.emit_line(Section::Text, "xchg rax, rcx");
                        self.writer.emit_line(Section::Text, "cqo");
                        self.writer.emit_line(Section::Text, "idiv rcx");
                    }
                    Op::EqualsEquals
                    | Op::NotEquals
                    | Op::Less
                    | Op::LessOrEquals
                    | Op::Greater
                    | Op::GreaterOrEquals => {
                        let condition = match op {
                            Op::EqualsEquals => "e",
                            Op::NotEquals => "ne",
                            Op::Less => "l",
                            Op::LessOrEquals => "le",
                            Op::Greater => "g",
                            Op::GreaterOrEquals => "ge",
                            _ => unreachable!(),
                        };

                        self.writer.emit_line(Section::Text, "cmp rcx, rax");
                        self.writer.emit_line(Section::Text, format!("set{} al", condition));
                        self.writer.emit_line(Section::Text, "movzx rax, al");
                    }
                    Op::And | Op::Or => unreachable!("short-circuit operators are lowered above"),
                    Op::Not => unreachable!("'!' only appears in unary expressions"),
                }
            }
            Expression::Unary { op, operand } => {
                self.expression(operand)?;
                match op {
                    UnaryOp::Negate => self.writer.emit_line(Section::Text, "neg rax"),
                    UnaryOp::Not => {
                        self.writer.emit_line(Section::Text, "test rax, rax");
                        self.writer.emit_line(Section::Text, "sete al");
                        self.writer.emit_line(Section::Text, "movzx rax, al");
                    }
                }
            }
            Expression::Call { name, args, col } => {
                let Some((_, expected)) =
                    self.subroutines.iter().find(|(subroutine, _)| subroutine == name).copied()
                else {
                    return Err(Error {
                        kind: ErrorKind::UndefinedSubroutine((*name).to_owned()),
                        col: *col,
                        pointers_count: name.len(),
                    });
                };

                if expected != args.len() {
                    return Err(Error {
                        kind: ErrorKind::ArityMismatch {
                            name: (*name).to_owned(),
                            expected,
                            found: args.len(),
                        },
                        col: *col,
                        pointers_count: name.len(),
                    });
                }

                for arg in args.iter().rev() {
                    self.expression(arg)?;
                    self.writer.emit_line(Section::Text, "push rax");
                }

                self.writer.emit_line(Section::Text, format!("call {}", name));
                if !args.is_empty() {
                    self.writer.emit_line(
                        Section::Text,
                        format!("add rsp, {}", SLOT_SIZE * args.len() as i64),
                    );
                }
            }
        }

        return Ok(());
    }

    /// `&&` and `||` evaluate their right operand only when the left one does
    /// not already decide the result; both normalize to 0 or 1.
    fn short_circuit(
        &mut self,
        lhs: &Expression<'src>,
        op: Op,
        rhs: &Expression<'src>,
    ) -> Result<(), Error<ErrorKind>> {
        let sc_label = self.writer.new_label("sc");
        let end_label = format!("{}_end", sc_label);

        self.expression(lhs)?;
        self.writer.emit_line(Section::Text, "test rax, rax");

        let short_label = match op {
            Op::And => {
                let false_label = format!("{}_false", sc_label);
                self.writer.emit_line(Section::Text, format!("jz {}", false_label));
                false_label
            }
            Op::Or => {
                let true_label = format!("{}_true", sc_label);
                self.writer.emit_line(Section::Text, format!("jnz {}", true_label));
                true_label
            }
            _ => unreachable!("only '&&' and '||' short-circuit"),
        };

        self.expression(rhs)?;
        self.writer.emit_line(Section::Text, "test rax, rax");
        self.writer.emit_line(Section::Text, "setne al");
        self.writer.emit_line(Section::Text, "movzx rax, al");
        self.writer.emit_line(Section::Text, format!("jmp {}", end_label));

        self.writer.emit_label(Section::Text, &short_label);
        match op {
            Op::And => self.writer.emit_line(Section::Text, "xor rax, rax"),
            Op::Or => self.writer.emit_line(Section::Text, "mov rax, 1"),
            _ => unreachable!(),
        }

        self.writer.emit_label(Section::Text, &end_label);
        return Ok(());
    }
}
