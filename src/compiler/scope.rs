use crate::ast::{Expression, Item, Node, Program, Subroutine};

/// Every variable occupies one 8-byte stack slot.
pub(crate) const SLOT_SIZE: i64 = 8;

/// The first parameter lives at `rbp + 16`, past the saved `rbp` and the
/// return address pushed by `call`.
pub(crate) const PARAM_OFFSET_START: i64 = 16;

/// Maps every variable of one scope (the main program or one subroutine body)
/// to its rbp-relative byte offset.
///
/// The language has exactly two scope kinds and no block-local declarations,
/// so a scope is flat: parameters above the frame pointer, everything else
/// below it.
#[derive(Debug, Default)]
pub struct Scope<'src> {
    params: Vec<(&'src str, i64)>,
    locals: Vec<(&'src str, i64)>,
}

impl<'src> Scope<'src> {
    /// Scope of the main program: every variable touched by top-level code,
    /// excluding anything inside `sub` bodies.
    pub fn of_program(program: &Program<'src>) -> Self {
        let mut names = Vec::new();
        for item in &program.items {
            if let Item::Statement(node) = item {
                collect_node(node, &mut names);
            }
        }

        return Self { params: Vec::new(), locals: local_offsets(&names) };
    }

    /// Scope of one subroutine body: parameters first, then every other name
    /// assigned or referenced within the body.
    pub fn of_subroutine(subroutine: &Subroutine<'src>) -> Self {
        let params = subroutine
            .params
            .iter()
            .enumerate()
            .map(|(index, name)| (*name, PARAM_OFFSET_START + SLOT_SIZE * index as i64))
            .collect();

        let mut names = Vec::new();
        collect_nodes(&subroutine.body, &mut names);
        names.retain(|name| !subroutine.params.contains(name));

        return Self { params, locals: local_offsets(&names) };
    }

    pub fn offset(&self, name: &str) -> i64 {
        for (param, offset) in &self.params {
            if *param == name {
                return *offset;
            }
        }
        for (local, offset) in &self.locals {
            if *local == name {
                return *offset;
            }
        }

        unreachable!("variable '{}' should have been collected during scope analysis", name);
    }

    pub fn params(&self) -> &[(&'src str, i64)] {
        return &self.params;
    }

    pub fn locals(&self) -> &[(&'src str, i64)] {
        return &self.locals;
    }

    pub fn locals_count(&self) -> usize {
        return self.locals.len();
    }
}

fn local_offsets<'src>(names: &[&'src str]) -> Vec<(&'src str, i64)> {
    return names
        .iter()
        .enumerate()
        .map(|(index, name)| (*name, -(SLOT_SIZE * (index as i64 + 1))))
        .collect();
}

/// Collects every variable name reachable from `nodes`, in first-appearance
/// order of a pre-order traversal.
pub fn collect_variables<'src>(nodes: &[Node<'src>]) -> Vec<&'src str> {
    let mut names = Vec::new();
    collect_nodes(nodes, &mut names);
    return names;
}

fn push_unique<'src>(names: &mut Vec<&'src str>, name: &'src str) {
    if !names.contains(&name) {
        names.push(name);
    }
}

fn collect_nodes<'src>(nodes: &[Node<'src>], names: &mut Vec<&'src str>) {
    for node in nodes {
        collect_node(node, names);
    }
}

fn collect_node<'src>(node: &Node<'src>, names: &mut Vec<&'src str>) {
    match node {
        Node::Assign { name, value } => {
            push_unique(names, *name);
            collect_expression(value, names);
        }
        Node::Print { value } => collect_expression(value, names),
        Node::If { condition, then_block, else_block } => {
            collect_expression(condition, names);
            collect_nodes(then_block, names);
            if let Some(else_block) = else_block {
                collect_nodes(else_block, names);
            }
        }
        Node::While { condition, body } => {
            collect_expression(condition, names);
            collect_nodes(body, names);
        }
        Node::For { init_name, init, condition, update_name, update, body } => {
            push_unique(names, *init_name);
            collect_expression(init, names);
            collect_expression(condition, names);
            push_unique(names, *update_name);
            collect_expression(update, names);
            collect_nodes(body, names);
        }
        Node::Break { .. } | Node::Continue { .. } => {}
        Node::Return { value, .. } => {
            if let Some(value) = value {
                collect_expression(value, names);
            }
        }
        Node::Call(call) => collect_expression(call, names),
    }
}

fn collect_expression<'src>(expression: &Expression<'src>, names: &mut Vec<&'src str>) {
    match expression {
        Expression::Int(_) | Expression::Str { .. } => {}
        Expression::Variable { name } => push_unique(names, *name),
        Expression::Binary { lhs, rhs, .. } => {
            collect_expression(lhs, names);
            collect_expression(rhs, names);
        }
        Expression::Unary { operand, .. } => collect_expression(operand, names),
        Expression::Call { args, .. } => {
            for arg in args {
                collect_expression(arg, names);
            }
        }
    }
}

/// Interning table for `print` string literals.
///
/// Each distinct non-empty text gets a `const.N` label, N being its
/// first-appearance index. Empty strings are elided entirely: printing one
/// only emits the trailing newline.
#[derive(Debug, Default)]
pub struct StringTable<'src> {
    strings: Vec<&'src str>,
}

impl<'src> StringTable<'src> {
    pub fn collect(program: &Program<'src>) -> Self {
        let mut this = Self { strings: Vec::new() };

        for item in &program.items {
            match item {
                Item::Statement(node) => this.collect_node(node),
                Item::Subroutine(subroutine) => {
                    for node in &subroutine.body {
                        this.collect_node(node);
                    }
                }
            }
        }

        return this;
    }

    fn collect_node(&mut self, node: &Node<'src>) {
        match node {
            Node::Print { value: Expression::Str { text, .. } } => {
                if !text.is_empty() && !self.strings.contains(text) {
                    self.strings.push(*text);
                }
            }
            Node::If { then_block, else_block, .. } => {
                for node in then_block {
                    self.collect_node(node);
                }
                if let Some(else_block) = else_block {
                    for node in else_block {
                        self.collect_node(node);
                    }
                }
            }
            Node::While { body, .. } | Node::For { body, .. } => {
                for node in body {
                    self.collect_node(node);
                }
            }
            _ => {}
        }
    }

    pub fn label_index(&self, text: &str) -> Option<usize> {
        return self.strings.iter().position(|string| *string == text);
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &'src str)> + '_ {
        return self.strings.iter().copied().enumerate();
    }

    pub fn len(&self) -> usize {
        return self.strings.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.strings.is_empty();
    }
}
