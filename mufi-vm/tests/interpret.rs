use mufi_vm::{InterpretResult, Value, Vm, VmConfig};
use pretty_assertions::assert_eq;

struct Run {
    result: InterpretResult,
    stdout: String,
    stderr: String,
}

fn run(source: &str) -> Run {
    let mut vm = Vm::with_output(VmConfig::default(), Vec::new(), Vec::new());
    let result = vm.interpret(source);
    Run {
        result,
        stdout: String::from_utf8_lossy(vm.output()).into_owned(),
        stderr: String::from_utf8_lossy(vm.error_output()).into_owned(),
    }
}

#[test]
fn prints_integer_sum() {
    let r = run("print 1 + 2;");
    assert_eq!(r.result, InterpretResult::Ok);
    assert_eq!(r.stdout, "3\n");
    assert_eq!(r.stderr, "");
}

#[test]
fn concatenates_strings() {
    let r = run("print \"a\" + \"b\";");
    assert_eq!(r.result, InterpretResult::Ok);
    assert_eq!(r.stdout, "ab\n");
}

#[test]
fn undefined_variable_names_the_line() {
    let r = run("print 1;\n\nx + 1;\nprint 2;");
    assert_eq!(r.result, InterpretResult::RuntimeError);
    assert_eq!(r.stdout, "1\n");
    assert_eq!(r.stderr, "Undefined variable 'x'.\n[line 3] in script\n");
}

#[test]
fn mixed_number_kinds_fail() {
    let r = run("1 + 1.0;");
    assert_eq!(r.result, InterpretResult::RuntimeError);
    assert_eq!(
        r.stderr,
        "Operands must be either both integer or both double numbers.\n[line 1] in script\n"
    );
}

#[test]
fn arithmetic_and_comparison() {
    let r = run(
        "print (1 + 2) * 3 - 4 / 2;\n\
         print 1.5 * 2.0;\n\
         print -(3);\n\
         print 2 >= 2;\n\
         print 1 != 1;\n\
         print !nil;\n\
         print 10 / 4;\n\
         print 1.0 / 3.0;",
    );
    assert_eq!(r.result, InterpretResult::Ok);
    assert_eq!(r.stdout, "7\n3\n-3\ntrue\nfalse\ntrue\n2\n0.333333\n");
}

#[test]
fn equality_is_tag_strict() {
    let r = run("print 0 == 0.0; print nil == false; print \"x\" == \"x\";");
    assert_eq!(r.stdout, "false\nfalse\ntrue\n");
}

#[test]
fn globals_define_assign_read() {
    let r = run(
        "var greeting = \"hello\";\n\
         var count;\n\
         print count;\n\
         count = 1;\n\
         count = count + 41;\n\
         print greeting + \" world\";\n\
         print count;",
    );
    assert_eq!(r.result, InterpretResult::Ok);
    assert_eq!(r.stdout, "nil\nhello world\n42\n");
}

#[test]
fn assignment_to_undefined_global_fails() {
    let mut vm = Vm::with_output(VmConfig::default(), Vec::new(), Vec::new());
    assert_eq!(vm.interpret("y = 1;"), InterpretResult::RuntimeError);
    assert_eq!(vm.global("y"), None);
    assert_eq!(
        String::from_utf8_lossy(vm.error_output()),
        "Undefined variable 'y'.\n[line 1] in script\n"
    );
}

#[test]
fn globals_persist_across_runs() {
    let mut vm = Vm::with_output(VmConfig::default(), Vec::new(), Vec::new());
    assert_eq!(vm.interpret("var a = 1;"), InterpretResult::Ok);
    assert_eq!(vm.interpret("a = a + 1;"), InterpretResult::Ok);
    assert_eq!(vm.interpret("print a;"), InterpretResult::Ok);
    assert_eq!(vm.global("a"), Some(Value::Int(2)));
    assert_eq!(String::from_utf8_lossy(vm.output()), "2\n");
    assert!(vm.stack().is_empty());
}

#[test]
fn runtime_error_keeps_earlier_globals() {
    let mut vm = Vm::with_output(VmConfig::default(), Vec::new(), Vec::new());
    assert_eq!(
        vm.interpret("var a = 1; var b = a + nil;"),
        InterpretResult::RuntimeError
    );
    assert_eq!(vm.global("a"), Some(Value::Int(1)));
    assert_eq!(vm.global("b"), None);
    assert!(vm.stack().is_empty());
}

#[test]
fn compile_errors_do_not_run() {
    let mut vm = Vm::with_output(VmConfig::default(), Vec::new(), Vec::new());
    let result = vm.interpret("var a = 1;\nprint a\nprint 2;");
    assert_eq!(result, InterpretResult::CompileError);
    assert_eq!(String::from_utf8_lossy(vm.output()), "");
    assert_eq!(
        String::from_utf8_lossy(vm.error_output()),
        "[line 3] Error at 'print': Expect ';' after value.\n"
    );
    // Nothing executed, so `a` was never defined.
    assert_eq!(vm.global("a"), None);
}

#[test]
fn comparisons_require_matching_numbers() {
    let r = run("print \"a\" < \"b\";");
    assert_eq!(r.result, InterpretResult::RuntimeError);
    assert_eq!(
        r.stderr,
        "Operands must be either both integer or both double numbers.\n[line 1] in script\n"
    );
}

#[test]
fn deep_expression_overflows_small_stack() {
    let mut vm = Vm::with_output(
        VmConfig::default().with_stack_max(2),
        Vec::new(),
        Vec::new(),
    );
    assert_eq!(vm.interpret("print 1 + (2 + 3);"), InterpretResult::RuntimeError);
    assert_eq!(
        String::from_utf8_lossy(vm.error_output()),
        "Stack overflow (limit=2).\n[line 1] in script\n"
    );
}

#[test]
fn deep_nesting_is_a_compile_error() {
    let mut vm = Vm::with_output(VmConfig::default(), Vec::new(), Vec::new());
    let source = format!("print {}1{};", "(".repeat(10_000), ")".repeat(10_000));
    assert_eq!(vm.interpret(&source), InterpretResult::CompileError);
    assert_eq!(
        String::from_utf8_lossy(vm.error_output()),
        "[line 1] Error at '(': Expression nesting too deep.\n"
    );

    // The VM is still usable afterwards.
    assert_eq!(vm.interpret("print 1;"), InterpretResult::Ok);
    assert_eq!(String::from_utf8_lossy(vm.output()), "1\n");
}
