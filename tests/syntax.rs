use std::path::Path;
use toyc::{
    ast::{ErrorKind as ParseErrorKind, Item, Node, Parser, Program},
    src_file::{Position, SrcFile},
    tokenizer::{ErrorKind as TokenErrorKind, Op, TokenKind, Tokenizer},
};

fn src(code: &str) -> SrcFile {
    return SrcFile::from_code(Path::new("test.toy"), code);
}

fn parse(code: &str) -> Program<'_> {
    // leaking keeps the source alive for the returned borrows, fine in tests
    let src = Box::leak(Box::new(src(code)));
    let tokens = Box::leak(Box::new(Tokenizer::tokenize(src).expect("tokenizing should succeed")));
    return Parser::parse(tokens).expect("parsing should succeed");
}

fn parse_error(code: &str) -> ParseErrorKind {
    let src = src(code);
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");
    return Parser::parse(&tokens).expect_err("parsing should fail").kind;
}

fn print_argument(code: &str) -> String {
    let program = parse(code);
    let Some(Item::Statement(Node::Print { value })) = program.items.into_iter().next() else {
        panic!("expected a print statement");
    };
    return value.to_string();
}

#[test]
fn token_stream_of_an_assignment() {
    let src = src("answer = 42;");
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");

    let kinds: Vec<TokenKind<'_>> = tokens.iter().map(|token| token.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier("answer"),
            TokenKind::Equals,
            TokenKind::Int(42),
            TokenKind::SemiColon,
        ]
    );
}

#[test]
fn comments_are_stripped() {
    let src = src("// nothing to see here\nx = 1; // trailing\n// last line");
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");

    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[0].kind, TokenKind::Identifier("x"));
}

#[test]
fn string_literals_keep_their_exact_text() {
    let src = src("print \"hello, world\";");
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");

    assert!(tokens.iter().any(|token| token.kind == TokenKind::Str("hello, world")));
}

#[test]
fn keywords_are_not_identifiers() {
    let src = src("while break continue sub return for");
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");

    let kinds: Vec<TokenKind<'_>> = tokens.iter().map(|token| token.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::While,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::Sub,
            TokenKind::Return,
            TokenKind::For,
        ]
    );
}

#[test]
fn two_character_operators() {
    let src = src("a == b != c <= d >= e && f || g");
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");

    let ops: Vec<Op> = tokens
        .iter()
        .filter_map(|token| match token.kind {
            TokenKind::Op(op) => Some(op),
            _ => None,
        })
        .collect();
    assert_eq!(
        ops,
        vec![
            Op::EqualsEquals,
            Op::NotEquals,
            Op::LessOrEquals,
            Op::GreaterOrEquals,
            Op::And,
            Op::Or,
        ]
    );
}

#[test]
fn unrecognized_character_is_rejected_with_its_position() {
    let src = src("x = 1;\ny = $;");
    let error = Tokenizer::tokenize(&src).expect_err("tokenizing should fail");

    assert!(matches!(error.kind, TokenErrorKind::UnrecognizedCharacter(_)));
    assert_eq!(src.position(error.col), Position { line: 2, col: 5 });
}

#[test]
fn unterminated_string_is_rejected() {
    let error = Tokenizer::tokenize(&src("print \"oops;")).expect_err("tokenizing should fail");
    assert!(matches!(error.kind, TokenErrorKind::UnterminatedString));
}

#[test]
fn strings_must_close_before_the_end_of_the_line() {
    let error =
        Tokenizer::tokenize(&src("print \"first\nsecond\";")).expect_err("tokenizing should fail");
    assert!(matches!(error.kind, TokenErrorKind::UnterminatedString));
}

#[test]
fn integer_literals_may_only_contain_digits() {
    let error = Tokenizer::tokenize(&src("x = 123abc;")).expect_err("tokenizing should fail");
    assert!(matches!(error.kind, TokenErrorKind::NonDigitInIntegerLiteral));
}

#[test]
fn overflowing_integer_literals_are_rejected() {
    let error =
        Tokenizer::tokenize(&src("x = 99999999999999999999;")).expect_err("tokenizing should fail");
    assert!(matches!(error.kind, TokenErrorKind::IntegerLiteralOverflow));
}

#[test]
fn single_ampersand_suggests_the_boolean_operator() {
    let error = Tokenizer::tokenize(&src("x = 1 & 2;")).expect_err("tokenizing should fail");
    assert!(matches!(error.kind, TokenErrorKind::StrayAmpersand));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(print_argument("print 2 + 3 * 4;"), "(2 + (3 * 4))");
    assert_eq!(print_argument("print (2 + 3) * 4;"), "((2 + 3) * 4)");
}

#[test]
fn boolean_operators_bind_loosest() {
    assert_eq!(print_argument("print 1 || 2 && 3;"), "(1 || (2 && 3))");
    assert_eq!(print_argument("print 1 == 2 && 3 < 4;"), "((1 == 2) && (3 < 4))");
}

#[test]
fn comparison_binds_looser_than_arithmetic() {
    assert_eq!(print_argument("print 1 + 2 < 3 * 4;"), "((1 + 2) < (3 * 4))");
}

#[test]
fn unary_operators_bind_tightest() {
    assert_eq!(print_argument("print -2 + 3;"), "(-2 + 3)");
    assert_eq!(print_argument("print !x && y;"), "(!x && y)");
    assert_eq!(print_argument("print --x;"), "--x");
}

#[test]
fn arithmetic_left_associates() {
    assert_eq!(print_argument("print 10 - 3 - 2;"), "((10 - 3) - 2)");
    assert_eq!(print_argument("print 100 / 10 / 5;"), "((100 / 10) / 5)");
}

#[test]
fn calls_parse_anywhere_an_expression_may_appear() {
    assert_eq!(print_argument("print f(1, g(2), 3 + 4);"), "f(1, g(2), (3 + 4))");
}

#[test]
fn comparisons_cannot_be_chained() {
    let error = parse_error("print 1 < 2 < 3;");
    assert!(matches!(error, ParseErrorKind::ChainedComparison));
}

#[test]
fn statements_require_a_terminating_semicolon() {
    let error = parse_error("x = 1 y = 2;");
    assert!(matches!(error, ParseErrorKind::ExpectedSemicolon));

    let error = parse_error("x = 1");
    assert!(matches!(error, ParseErrorKind::PrematureEndOfFile(_)));
}

#[test]
fn a_bare_identifier_is_not_a_statement() {
    let error = parse_error("x;");
    assert!(matches!(error, ParseErrorKind::ExpectedAssignmentOrCall));
}

#[test]
fn a_bare_expression_is_not_a_statement() {
    let error = parse_error("1 + 2;");
    assert!(matches!(error, ParseErrorKind::ExpectedStatement));
}

#[test]
fn else_requires_a_preceding_if() {
    let error = parse_error("else { x = 1; }");
    assert!(matches!(error, ParseErrorKind::StrayElse));
}

#[test]
fn subroutines_may_only_be_defined_at_the_top_level() {
    let error = parse_error("sub f() { sub g() { return 0; } }");
    assert!(matches!(error, ParseErrorKind::NestedSubroutine));

    let error = parse_error("if 1 { sub g() { return 0; } }");
    assert!(matches!(error, ParseErrorKind::NestedSubroutine));
}

#[test]
fn subroutine_definitions_carry_their_parameters() {
    let program = parse("sub add(a, b) { return a + b; }");

    let Some(Item::Subroutine(subroutine)) = program.items.into_iter().next() else {
        panic!("expected a subroutine definition");
    };
    assert_eq!(subroutine.name, "add");
    assert_eq!(subroutine.params, vec!["a", "b"]);
    assert_eq!(subroutine.body.len(), 1);
}

#[test]
fn top_level_statements_and_subroutines_interleave() {
    let program = parse("x = 1;\nsub f() { return 0; }\ny = 2;");

    assert_eq!(program.items.len(), 3);
    assert!(matches!(program.items[0], Item::Statement(Node::Assign { name: "x", .. })));
    assert!(matches!(program.items[1], Item::Subroutine(_)));
    assert!(matches!(program.items[2], Item::Statement(Node::Assign { name: "y", .. })));
}

#[test]
fn if_else_blocks_parse() {
    let program = parse("if x > 5 { print 100; } else { print 200; }");

    let Some(Item::Statement(Node::If { else_block, .. })) = program.items.into_iter().next()
    else {
        panic!("expected an if statement");
    };
    assert!(else_block.is_some());
}

#[test]
fn for_loops_parse_their_three_clauses() {
    let program = parse("for i = 0; i < 10; i = i + 1 { print i; }");

    let Some(Item::Statement(Node::For { init_name, update_name, body, .. })) =
        program.items.into_iter().next()
    else {
        panic!("expected a for statement");
    };
    assert_eq!(init_name, "i");
    assert_eq!(update_name, "i");
    assert_eq!(body.len(), 1);
}

#[test]
fn return_without_a_value_parses() {
    let program = parse("sub f() { return; }");

    let Some(Item::Subroutine(subroutine)) = program.items.into_iter().next() else {
        panic!("expected a subroutine definition");
    };
    assert!(matches!(subroutine.body[0], Node::Return { value: None, .. }));
}

#[test]
fn error_display_includes_path_line_and_column() {
    let src = src("x = 1;\ny = $;");
    let error = Tokenizer::tokenize(&src).expect_err("tokenizing should fail");

    let displayed = error.display(&src).to_string();
    assert!(displayed.contains("test.toy:2:5"));
    assert!(displayed.contains("y = $;"));
}
