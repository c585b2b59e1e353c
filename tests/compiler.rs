use std::collections::HashSet;
use std::path::Path;
use toyc::{
    ast::{Item, Parser},
    compiler::{scope::collect_variables, Compiler, ErrorKind},
    src_file::SrcFile,
    tokenizer::Tokenizer,
};

fn compile(code: &str) -> String {
    let src = SrcFile::from_code(Path::new("test.toy"), code);
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");
    let program = Parser::parse(&tokens).expect("parsing should succeed");
    return Compiler::compile(&program).expect("compilation should succeed");
}

fn compile_error(code: &str) -> ErrorKind {
    let src = SrcFile::from_code(Path::new("test.toy"), code);
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");
    let program = Parser::parse(&tokens).expect("parsing should succeed");
    return Compiler::compile(&program).expect_err("compilation should fail").kind;
}

/// Byte offset of `needle` within the generated assembly, for asserting on
/// the relative order of emitted chunks.
fn offset_of(asm: &str, needle: &str) -> usize {
    return asm.find(needle).unwrap_or_else(|| panic!("'{}' not found in:\n{}", needle, asm));
}

#[test]
fn empty_program_still_exits_cleanly() {
    let asm = compile("");

    assert!(asm.contains("section .data"));
    assert!(asm.contains("section .bss"));
    assert!(asm.contains("section .text"));
    assert!(asm.contains("global _start"));
    assert!(asm.contains("extern print_int"));
    assert!(asm.contains("extern print_newline"));
    assert!(asm.contains("_start:"));
    assert!(asm.contains("mov rax, 60"));
    assert!(asm.contains("xor rdi, rdi"));
    assert!(asm.contains("syscall"));
}

#[test]
fn sections_render_in_data_bss_text_order() {
    let asm = compile("print \"hi\";");

    let data = offset_of(&asm, "section .data");
    let bss = offset_of(&asm, "section .bss");
    let text = offset_of(&asm, "section .text");
    assert!(data < bss && bss < text);
}

#[test]
fn assignment_stores_into_the_variable_slot() {
    let asm = compile("x = 42;");

    assert!(asm.contains("sub rsp, 8"));
    assert!(asm.contains("mov rax, 42"));
    assert!(asm.contains("mov [rbp-8], rax"));
}

#[test]
fn every_slot_is_zero_initialized() {
    let asm = compile("x = 1; y = 2; z = 3;");

    assert!(asm.contains("sub rsp, 24"));
    assert!(asm.contains("mov qword [rbp-8], 0"));
    assert!(asm.contains("mov qword [rbp-16], 0"));
    assert!(asm.contains("mov qword [rbp-24], 0"));
}

#[test]
fn variables_are_collected_in_first_appearance_order() {
    let src =
        SrcFile::from_code(Path::new("test.toy"), "x = y + z; a = x; while b { c = 1; }");
    let tokens = Tokenizer::tokenize(&src).expect("tokenizing should succeed");
    let program = Parser::parse(&tokens).expect("parsing should succeed");

    let nodes: Vec<_> = program
        .items
        .into_iter()
        .map(|item| match item {
            Item::Statement(node) => node,
            Item::Subroutine(_) => panic!("expected only statements"),
        })
        .collect();

    assert_eq!(collect_variables(&nodes), vec!["x", "y", "z", "a", "b", "c"]);
}

#[test]
fn slots_are_assigned_in_first_appearance_order() {
    let asm = compile("x = 1; y = x + 1; print y;");

    assert!(asm.contains("; variable layout (offsets from rbp):"));
    assert!(asm.contains("[rbp-8] = x"));
    assert!(asm.contains("[rbp-16] = y"));
}

#[test]
fn a_variable_only_ever_read_still_gets_a_slot() {
    // reading an unassigned variable yields its zero-initialized slot
    let asm = compile("print nothing;");

    assert!(asm.contains("sub rsp, 8"));
    assert!(asm.contains("mov qword [rbp-8], 0"));
    assert!(asm.contains("mov rax, [rbp-8]"));
}

#[test]
fn print_of_an_integer_expression() {
    let asm = compile("print 42;");

    assert!(asm.contains("mov rax, 42"));
    assert!(asm.contains("mov rdi, rax"));
    assert!(asm.contains("call print_int"));
    assert!(asm.contains("call print_newline"));
}

#[test]
fn print_of_a_string_literal() {
    let asm = compile("print \"hello, world\";");

    assert!(asm.contains("const.0: db \"hello, world\", 0"));
    assert!(asm.contains("const.0_len equ $ - const.0 - 1"));
    assert!(asm.contains("mov rax, 1"));
    assert!(asm.contains("mov rdi, 1"));
    assert!(asm.contains("lea rsi, [rel const.0]"));
    assert!(asm.contains("mov rdx, const.0_len"));
    assert!(asm.contains("call print_newline"));
}

#[test]
fn identical_strings_are_interned_once() {
    let asm = compile("print \"same\"; print \"same\"; print \"other\";");

    assert_eq!(asm.matches("db \"same\", 0").count(), 1);
    assert!(asm.contains("const.0: db \"same\", 0"));
    assert!(asm.contains("const.1: db \"other\", 0"));
    assert!(!asm.contains("const.2"));
}

#[test]
fn printing_the_empty_string_only_emits_the_newline() {
    let asm = compile("print \"\";");

    assert!(!asm.contains("db \"\""));
    assert!(!asm.contains("lea rsi"));
    assert!(asm.contains("call print_newline"));
}

#[test]
fn addition_subtraction_multiplication() {
    let asm = compile("x = 1 + 2; y = 5 - 3; z = 4 * 6;");

    assert!(asm.contains("push rax"));
    assert!(asm.contains("pop rcx"));
    assert!(asm.contains("add rax, rcx"));
    assert!(asm.contains("sub rcx, rax"));
    assert!(asm.contains("mov rax, rcx"));
    assert!(asm.contains("imul rax, rcx"));
}

#[test]
fn division_sign_extends_the_dividend() {
    let asm = compile("x = 10 / 2;");

    assert!(asm.contains("xchg rax, rcx"));
    assert!(asm.contains("cqo"));
    assert!(asm.contains("idiv rcx"));
}

#[test]
fn comparisons_normalize_to_zero_or_one() {
    let cases = [
        ("x = a == b;", "sete al"),
        ("x = a != b;", "setne al"),
        ("x = a < b;", "setl al"),
        ("x = a <= b;", "setle al"),
        ("x = a > b;", "setg al"),
        ("x = a >= b;", "setge al"),
    ];

    for (code, expected) in cases {
        let asm = compile(code);
        assert!(asm.contains("cmp rcx, rax"), "missing comparison in: {}", code);
        assert!(asm.contains(expected), "missing '{}' in: {}", expected, code);
        assert!(asm.contains("movzx rax, al"), "result not normalized in: {}", code);
    }
}

#[test]
fn unary_negation_and_not() {
    let asm = compile("x = -y;");
    assert!(asm.contains("neg rax"));

    let asm = compile("x = !y;");
    assert!(asm.contains("test rax, rax"));
    assert!(asm.contains("sete al"));
    assert!(asm.contains("movzx rax, al"));
}

#[test]
fn logical_and_short_circuits() {
    let asm = compile("sub side() { return 1; }\nx = 0 && side();");

    assert!(asm.contains("jz sc.0_false"));
    assert!(asm.contains("setne al"));
    assert!(asm.contains("jmp sc.0_end"));
    assert!(asm.contains("sc.0_false:"));
    assert!(asm.contains("sc.0_end:"));

    // the right operand is only reached when the left one was true
    assert!(offset_of(&asm, "jz sc.0_false") < offset_of(&asm, "call side"));
}

#[test]
fn logical_or_short_circuits() {
    let asm = compile("x = 1 || 2;");

    assert!(asm.contains("jnz sc.0_true"));
    assert!(asm.contains("sc.0_true:"));
    assert!(asm.contains("mov rax, 1"));
    assert!(asm.contains("sc.0_end:"));
}

#[test]
fn if_without_else_jumps_past_the_then_block() {
    let asm = compile("x = 10; if x > 5 { print 100; }");

    assert!(asm.contains("if.0:"));
    assert!(asm.contains("test rax, rax"));
    assert!(asm.contains("jz endif.0"));
    assert!(asm.contains("endif.0:"));
    assert!(!asm.contains("else."));
}

#[test]
fn if_else_lowers_both_branches() {
    let asm = compile("x = 10; if x > 5 { print 100; } else { print 200; }");

    assert!(asm.contains("jz else.0"));
    assert!(asm.contains("jmp endif.0"));
    assert!(asm.contains("else.0:"));
    assert!(asm.contains("endif.0:"));
}

#[test]
fn while_loops_check_the_condition_first() {
    let asm = compile("i = 0; while i < 5 { i = i + 1; }");

    assert!(asm.contains("while.0:"));
    assert!(asm.contains("jz endwhile.0"));
    assert!(asm.contains("jmp while.0"));
    assert!(asm.contains("endwhile.0:"));

    let condition = offset_of(&asm, "while.0:");
    let exit_check = offset_of(&asm, "jz endwhile.0");
    let back_edge = offset_of(&asm, "jmp while.0");
    assert!(condition < exit_check && exit_check < back_edge);
}

#[test]
fn break_and_continue_target_the_innermost_loop() {
    let asm = compile("i = 0; while i < 5 { i = i + 1; if i == 3 { continue; } break; }");

    // the loop's back edge plus the continue
    assert_eq!(asm.matches("jmp while.0").count(), 2);
    // the condition's exit plus the break
    assert_eq!(asm.matches("endwhile.0").count(), 3);
}

#[test]
fn nested_loops_mint_distinct_labels() {
    let asm = compile("while 1 { while 2 { break; } break; }");

    assert!(asm.contains("while.0:"));
    assert!(asm.contains("while.1:"));
    assert!(asm.contains("endwhile.0:"));
    assert!(asm.contains("endwhile.1:"));
}

#[test]
fn for_loops_lower_init_condition_and_update() {
    let asm = compile("for i = 0; i < 10; i = i + 1 { print i; }");

    assert!(asm.contains("for.0:"));
    assert!(asm.contains("jz endfor.0"));
    assert!(asm.contains("update.0:"));
    assert!(asm.contains("jmp for.0"));
    assert!(asm.contains("endfor.0:"));

    let update = offset_of(&asm, "update.0:");
    let back_edge = offset_of(&asm, "jmp for.0");
    assert!(update < back_edge);
}

#[test]
fn continue_in_a_for_loop_targets_the_update_section() {
    let asm = compile("for i = 0; i < 10; i = i + 1 { if i == 5 { continue; } print i; }");

    assert_eq!(asm.matches("jmp update.0").count(), 1);
}

#[test]
fn subroutines_are_emitted_after_the_exit_syscall() {
    let asm = compile("sub foo() { return 1; }\nx = foo();");

    assert!(offset_of(&asm, "mov rax, 60") < offset_of(&asm, "foo:"));
}

#[test]
fn subroutine_frames_mirror_the_main_frame() {
    let asm = compile("sub foo() { x = 1; y = 2; }\nfoo();");

    assert!(asm.contains("foo:"));
    assert!(asm.contains("sub rsp, 16"));
    assert!(asm.contains("mov [rbp-8], rax"));
    assert!(asm.contains("mov [rbp-16], rax"));
    assert!(asm.contains("ret"));
}

#[test]
fn parameters_live_above_the_frame_pointer() {
    let asm = compile("sub add(a, b) { return a + b; }\nx = add(1, 2);");

    assert!(asm.contains("mov rax, [rbp+16]"));
    assert!(asm.contains("mov rax, [rbp+24]"));
    assert!(asm.contains("[rbp+16] = a"));
    assert!(asm.contains("[rbp+24] = b"));
}

#[test]
fn arguments_are_evaluated_right_to_left() {
    let asm = compile("sub add(a, b) { return a + b; }\nx = add(1, 2);");

    let call_site = offset_of(&asm, "call add");
    let second_arg = offset_of(&asm, "mov rax, 2");
    let first_arg = offset_of(&asm, "mov rax, 1");
    assert!(second_arg < first_arg && first_arg < call_site);
    assert!(asm.contains("add rsp, 16"));
}

#[test]
fn calls_with_no_arguments_skip_the_stack_cleanup() {
    let asm = compile("sub f() { return 1; }\nx = f();");

    assert!(asm.contains("call f"));
    assert!(!asm.contains("add rsp,"));
}

#[test]
fn a_body_not_ending_in_return_returns_zero() {
    let asm = compile("sub f() { x = 1; }\nf();");

    assert!(asm.contains("xor rax, rax"));
    assert!(asm.contains("mov rsp, rbp"));
    assert!(asm.contains("ret"));
}

#[test]
fn bare_return_returns_zero() {
    let asm = compile("sub f() { return; }\nf();");

    let zeroing = offset_of(&asm, "f:\n");
    assert!(asm[zeroing..].contains("xor rax, rax"));
}

#[test]
fn recursion_compiles_to_plain_calls() {
    let asm = compile(
        "sub factorial(n) { if n <= 1 { return 1; } return n * factorial(n - 1); }\n\
         print factorial(5);",
    );

    assert_eq!(asm.matches("call factorial").count(), 2);
    assert!(asm.contains("setle al"));
    assert!(asm.contains("imul rax, rcx"));
}

#[test]
fn global_and_subroutine_scopes_are_disjoint() {
    let asm = compile("x = 1; sub f() { x = 2; return x; }\ny = f();");

    // main holds x and y, the subroutine holds its own x
    assert!(asm.contains("sub rsp, 16"));
    assert!(asm.contains("sub rsp, 8"));
}

#[test]
fn statement_echo_comments_are_emitted() {
    let asm = compile("x = 1 + 2;\nprint x;");

    assert!(asm.contains("; x = (1 + 2);"));
    assert!(asm.contains("; print x;"));
}

#[test]
fn compiling_twice_is_deterministic() {
    let code = "sub fib(n) { if n <= 1 { return n; } return fib(n - 1) + fib(n - 2); }\n\
                i = 0;\n\
                while i < 10 { print fib(i); i = i + 1; }\n\
                print \"done\";";

    assert_eq!(compile(code), compile(code));
}

#[test]
fn every_label_is_defined_at_most_once() {
    let asm = compile(
        "sub side() { print 999; return 1; }\n\
         x = 0;\n\
         if x && side() { print 1; }\n\
         for i = 0; i < 3; i = i + 1 { if i == 1 { continue; } print i; }\n\
         while x < 2 { x = x + 1; if x == 1 { break; } }\n\
         print \"a\"; print \"b\";",
    );

    let mut seen = HashSet::new();
    for line in asm.lines() {
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        if let Some(label) = first.strip_suffix(':') {
            assert!(seen.insert(label.to_owned()), "label '{}' defined twice", label);
        }
    }
}

#[test]
fn label_classes_advance_independently() {
    let asm = compile("if 1 { print 1; }\nif 2 { print 2; } else { print 3; }");

    assert!(asm.contains("if.0:"));
    assert!(asm.contains("endif.0:"));
    assert!(asm.contains("if.1:"));
    assert!(asm.contains("endif.1:"));
    // only the second if has an else branch, so the else class is still at 0
    assert!(asm.contains("else.0:"));
    assert!(!asm.contains("else.1"));
}

#[test]
fn conditional_scenario_lowers_both_outcomes() {
    let asm = compile("x = 10; if x > 5 { print 100; } else { print 200; }");

    assert!(asm.contains("mov rax, 100"));
    assert!(asm.contains("mov rax, 200"));
    assert!(asm.contains("setg al"));
}

#[test]
fn short_circuit_keeps_the_side_effect_behind_the_check() {
    let asm = compile(
        "sub side() { print 999; return 1; }\n\
         if 0 && side() { print 1; }\n\
         print 7;",
    );

    assert!(offset_of(&asm, "jz sc.0_false") < offset_of(&asm, "call side"));
}

#[test]
fn return_outside_a_subroutine_is_rejected() {
    let error = compile_error("return 5;");
    assert!(matches!(error, ErrorKind::ReturnOutsideSubroutine));
}

#[test]
fn break_and_continue_outside_a_loop_are_rejected() {
    assert!(matches!(compile_error("break;"), ErrorKind::BreakOutsideLoop));
    assert!(matches!(compile_error("continue;"), ErrorKind::ContinueOutsideLoop));

    // a loop inside a subroutine does not extend to the caller
    let error = compile_error("sub f() { return 0; }\nwhile 0 { f(); }\nbreak;");
    assert!(matches!(error, ErrorKind::BreakOutsideLoop));
}

#[test]
fn calls_to_undefined_subroutines_are_rejected() {
    let error = compile_error("x = missing();");
    assert!(matches!(error, ErrorKind::UndefinedSubroutine(name) if name == "missing"));
}

#[test]
fn calls_may_reference_subroutines_defined_later() {
    let asm = compile("x = later();\nsub later() { return 1; }");
    assert!(asm.contains("call later"));
}

#[test]
fn arity_mismatches_are_rejected() {
    let error = compile_error("sub f(a) { return a; }\nx = f(1, 2);");
    assert!(matches!(error, ErrorKind::ArityMismatch { expected: 1, found: 2, .. }));
}

#[test]
fn strings_outside_print_are_rejected() {
    assert!(matches!(compile_error("x = \"hi\";"), ErrorKind::StringOutsidePrint));
    assert!(matches!(compile_error("print \"a\" + 1;"), ErrorKind::StringOutsidePrint));
    assert!(matches!(
        compile_error("sub f(a) { return a; }\nx = f(\"hi\");"),
        ErrorKind::StringOutsidePrint
    ));
}

#[test]
fn redefined_subroutines_are_rejected() {
    let error = compile_error("sub f() { return 1; }\nsub f() { return 2; }");
    assert!(matches!(error, ErrorKind::RedefinedSubroutine(name) if name == "f"));
}
