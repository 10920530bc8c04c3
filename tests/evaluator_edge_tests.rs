use std::io;

use minipy::evaluator::{ErrorKind, Interpreter, RuntimeError, Value};
use minipy::lexer::tokenize;
use minipy::parser::Parser;
use pretty_assertions::assert_eq;

fn run_err(src: &str) -> (RuntimeError, Interpreter) {
    let tokens = tokenize(src).expect("lexer should succeed");
    let program = Parser::new(tokens)
        .parse_program()
        .expect("parser should succeed");

    let mut interpreter = Interpreter::with_output(Box::new(io::sink()));
    let err = interpreter
        .eval_program(&program)
        .expect_err("evaluation should fail");
    (err, interpreter)
}

#[test]
fn division_by_zero_aborts_the_script() {
    let src = "\
before = 1
bad = 10 / 0
after = 2
";
    let (err, interpreter) = run_err(src);
    assert_eq!(err.kind, ErrorKind::Arithmetic);
    assert_eq!(err.message, "division by zero");
    assert_eq!(err.pos.line, 2);

    // Statements before the failure took effect; later ones never ran.
    assert_eq!(interpreter.variable("before"), Some(Value::Int(1)));
    assert_eq!(interpreter.variable("bad"), None);
    assert_eq!(interpreter.variable("after"), None);
}

#[test]
fn modulo_by_zero_is_reported_separately() {
    let (err, _) = run_err("x = 5 % 0\n");
    assert_eq!(err.kind, ErrorKind::Arithmetic);
    assert_eq!(err.message, "modulo by zero");
}

#[test]
fn index_past_the_end_is_out_of_range() {
    let (err, _) = run_err("x = [1, 2, 3][5]\n");
    assert_eq!(err.kind, ErrorKind::Bounds);
    assert_eq!(err.message, "index out of range");
}

#[test]
fn negative_indices_are_out_of_range() {
    let (err, _) = run_err("x = [1, 2, 3][-1]\n");
    assert_eq!(err.kind, ErrorKind::Bounds);
    assert_eq!(err.message, "index out of range");
}

#[test]
fn non_integer_index_is_rejected() {
    let (err, _) = run_err("x = [1][True]\n");
    assert_eq!(err.kind, ErrorKind::Bounds);
    assert_eq!(err.message, "index must be an integer");
}

#[test]
fn only_lists_support_indexing() {
    let (err, _) = run_err("x = 5[0]\n");
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(err.message, "only lists can be indexed");
}

#[test]
fn index_assignment_requires_a_variable_root() {
    let (err, _) = run_err("[1, 2][0] = 5\n");
    assert_eq!(err.kind, ErrorKind::Structure);
    assert_eq!(err.message, "only variables can be modified");
}

#[test]
fn undefined_name_lookup_fails() {
    let (err, _) = run_err("x = missing + 1\n");
    assert_eq!(err.kind, ErrorKind::Lookup);
    assert_eq!(err.message, "name 'missing' is not defined");
}

#[test]
fn undefined_function_call_fails() {
    let (err, _) = run_err("x = conjure(1)\n");
    assert_eq!(err.kind, ErrorKind::Lookup);
    assert_eq!(err.message, "function 'conjure' is not defined");
}

#[test]
fn wrong_argument_count_is_an_arity_error() {
    let src = "\
def pair(a, b):
    return a
x = pair(1)
";
    let (err, _) = run_err(src);
    assert_eq!(err.kind, ErrorKind::Arity);
    assert_eq!(err.message, "pair() takes 2 argument(s), got 1");
}

#[test]
fn builtin_arity_is_checked_too() {
    let (err, _) = run_err("x = len([1], [2])\n");
    assert_eq!(err.kind, ErrorKind::Arity);
    assert_eq!(err.message, "len() takes 1 argument(s), got 2");
}

#[test]
fn adding_int_and_string_names_both_types() {
    let (err, _) = run_err("x = 1 + \"s\"\n");
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(
        err.message,
        "unsupported operand types for '+': 'int' and 'str'"
    );
}

#[test]
fn logical_not_requires_a_bool() {
    let (err, _) = run_err("x = not 1\n");
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(err.message, "unsupported operand type for unary 'not': 'int'");
}

#[test]
fn logical_and_requires_bools() {
    let (err, _) = run_err("x = 1 and True\n");
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(
        err.message,
        "unsupported operand types for 'and': 'int' and 'bool'"
    );
}

#[test]
fn logical_or_evaluates_both_operands() {
    // A short-circuiting `or` would succeed here; both operands are
    // evaluated and type-checked.
    let (err, _) = run_err("x = True or 1\n");
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(
        err.message,
        "unsupported operand types for 'or': 'bool' and 'int'"
    );
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let src = "\
def loop(n):
    return loop(n + 1)
x = loop(0)
";
    let (err, _) = run_err(src);
    assert_eq!(err.kind, ErrorKind::Resource);
    assert!(err.is_fatal());
    assert!(err.message.contains("maximum call depth"));
}

#[test]
fn ordinary_errors_are_not_fatal() {
    let (err, _) = run_err("x = 1 / 0\n");
    assert!(!err.is_fatal());
}

#[test]
fn range_with_zero_step_is_rejected() {
    let (err, _) = run_err("r = range(0, 10, 0)\n");
    assert_eq!(err.kind, ErrorKind::Arithmetic);
    assert_eq!(err.message, "range step cannot be zero");
}

#[test]
fn range_arguments_must_be_integers() {
    let (err, _) = run_err("r = range(\"a\")\n");
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(err.message, "range arguments must be integers, got 'str'");
}

#[test]
fn range_takes_at_most_three_arguments() {
    let (err, _) = run_err("r = range(1, 2, 3, 4)\n");
    assert_eq!(err.kind, ErrorKind::Arity);
    assert_eq!(err.message, "range() takes 1 to 3 argument(s), got 4");
}

#[test]
fn len_of_an_int_has_no_meaning() {
    let (err, _) = run_err("x = len(5)\n");
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(err.message, "object of type 'int' has no len()");
}

#[test]
fn for_loops_require_a_list_or_range() {
    let src = "\
for x in 5:
    y = x
";
    let (err, _) = run_err(src);
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(err.message, "for loop iterable must be a list or range, got 'int'");
}

#[test]
fn integer_overflow_is_detected() {
    let src = "\
big = 4611686018427387904
x = big * 2 + 1
";
    let (err, _) = run_err(src);
    assert_eq!(err.kind, ErrorKind::Arithmetic);
    assert_eq!(err.message, "integer overflow");
}

#[test]
fn errors_inside_functions_report_the_failing_line() {
    let src = "\
def explode():
    return 1 / 0
x = explode()
";
    let (err, _) = run_err(src);
    assert_eq!(err.message, "division by zero");
    assert_eq!(err.pos.line, 2);
}

#[test]
fn failed_call_still_unwinds_the_frame() {
    let src = "\
def bad():
    local = 7
    return 1 / 0
x = bad()
";
    let (err, interpreter) = run_err(src);
    assert_eq!(err.message, "division by zero");
    assert_eq!(interpreter.variable("local"), None);
}
