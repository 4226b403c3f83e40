mod common;

use common::{eval, eval_err, render};
use runtime::{ErrorKind, MAX_NESTING, MAX_VALUE_DEPTH, Value};

#[test]
fn test_program_value_is_last_statement() {
    assert_eq!(render("1 + 2 * 3"), "7");
    assert_eq!(render("x = 2; y = 3\nx * y"), "6");
    assert_eq!(render(""), "null");
    assert_eq!(render("// only a comment"), "null");
}

#[test]
fn test_assignment_yields_value_definitions_yield_null() {
    assert_eq!(render("x = 5"), "5");
    assert_eq!(render("Set x 5"), "5");
    assert_eq!(render("Func f() { 1 }"), "null");
    assert_eq!(render("While False { 1 }"), "null");
}

#[test]
fn test_rendering() {
    assert_eq!(render(r#""hi""#), "hi");
    assert_eq!(render(r#"[1, "a", {k: Null}]"#), r#"[1, "a", {"k": null}]"#);
    assert_eq!(render("0.1 + 0.2"), "0.30000000000000004");
    assert_eq!(render("10 / 4"), "2.5");
    assert_eq!(render("True"), "true");
    assert_eq!(render("LEN"), "<builtin LEN>");
    assert_eq!(render("Func f() { 1 }\nf"), "<function f>");
    assert_eq!(render("Func(x) { x }"), "<function <anonymous>>");
}

#[test]
fn test_if_is_an_expression() {
    assert_eq!(render(r#"x = If 1 > 2 { "a" } Else { "b" }; x"#), "b");
    let source = "n = 0\nIf n > 0 {\n  \"pos\"\n}\nElif n < 0 {\n  \"neg\"\n}\nElse {\n  \"zero\"\n}";
    assert_eq!(render(source), "zero");
    assert_eq!(render("If False { 1 }"), "null");
}

#[test]
fn test_while_with_break_and_continue() {
    let source = r#"
total = 0
i = 0
While True {
    i = i + 1
    If i > 10 { Break }
    If i % 2 == 0 { Continue }
    total = total + i
}
total
"#;
    assert_eq!(render(source), "25");
}

#[test]
fn test_for_loops() {
    assert_eq!(
        render(r#"s = ""; For i, c In "ab" { s = s + TO_STRING(i) + c }; s"#),
        "0a1b"
    );
    assert_eq!(
        render("ks = []\nFor k In {b: 1, a: 2} { ks = PUSH(ks, k) }\nks"),
        r#"["a", "b"]"#
    );
    assert_eq!(
        render("t = 0\nFor k, v In {a: 1, b: 2} { t = t + v }\nt"),
        "3"
    );
    assert_eq!(
        eval_err("For x In 5 { x }").to_string(),
        "type error: cannot iterate over number"
    );
}

#[test]
fn test_recursion() {
    let source = r#"
Func fact(n) {
    If n <= 1 { Return 1 }
    n * fact(n - 1)
}
fact(10)
"#;
    assert_eq!(render(source), "3628800");
}

#[test]
fn test_nested_named_function_can_recurse() {
    let source = r#"
Func outer() {
    Func count(n) { If n == 0 { 0 } Else { 1 + count(n - 1) } }
    count(4)
}
outer()
"#;
    assert_eq!(render(source), "4");
}

#[test]
fn test_closures_capture_by_value() {
    let source = r#"
Func make_adder(n) { Func(x) { x + n } }
add5 = make_adder(5)
add5(10)
"#;
    assert_eq!(render(source), "15");

    let snapshot = r#"
Func make() {
    v = 1
    f = Func() { v }
    v = 2
    f()
}
make()
"#;
    assert_eq!(render(snapshot), "1");
}

#[test]
fn test_function_scoping() {
    assert_eq!(render("g = 10\nFunc f() { g * 2 }\nf()"), "20");
    assert_eq!(render("Func f() { later }\nlater = 3\nf()"), "3");
    assert_eq!(render("g = 1\nFunc f() { g = 2 }\nf()\ng"), "1");

    let err = eval_err("Func f() { local = 1 }\nf()\nlocal");
    assert_eq!(err.to_string(), "undefined variable 'local'");
}

#[test]
fn test_collections_have_value_semantics() {
    assert_eq!(render("a = [1, 2]\nb = a\nb[0] = 9\na"), "[1, 2]");
    assert_eq!(render("d = {}\nd[\"k\"] = 1\nd"), r#"{"k": 1}"#);
    assert_eq!(render("g = [[0, 0], [0, 0]]\ng[1][0] = 5\ng"), "[[0, 0], [5, 0]]");
    assert_eq!(
        render("xs = [1]\nFunc f() { xs[0] = 2; xs }\n[f(), xs]"),
        "[[2], [1]]"
    );
}

#[test]
fn test_indexing() {
    assert_eq!(render(r#"{a: {b: [10, 20]}}["a"]["b"][1]"#), "20");
    assert_eq!(render(r#""héllo"[1]"#), "é");

    let err = eval_err("[1, 2][5]");
    assert_eq!(err.to_string(), "index 5 out of bounds for length 2");
    let err = eval_err(r#"{a: 1}["b"]"#);
    assert_eq!(err.to_string(), "key 'b' not found");
}

#[test]
fn test_logical_operators_short_circuit() {
    assert_eq!(render("False And missing"), "false");
    assert_eq!(render("True Or missing"), "true");
    assert_eq!(render("Null || 3"), "3");
    assert_eq!(render("1 && 2"), "2");
    assert_eq!(render("Not True"), "false");
    assert_eq!(render("!0"), "true");
}

#[test]
fn test_top_level_return_ends_program() {
    assert_eq!(render("Return 5; 6"), "5");
}

#[test]
fn test_runtime_errors() {
    let cases = [
        ("1 / 0", "division by zero"),
        ("missing + 1", "undefined variable 'missing'"),
        ("x = 1\nx()", "value of type number is not callable"),
        ("Func f(a) { a }\nf(1, 2)", "f expects 1 argument(s), got 2"),
        ("LEN()", "LEN expects 1 argument(s), got 0"),
        (r#"1 + "a""#, "type error: unsupported operand types for +: number and string"),
        ("Break", "Break outside of a loop"),
        (r#"Throw "boom""#, "thrown: boom"),
    ];
    for (source, message) in cases {
        let err = eval_err(source);
        assert_eq!(err.kind(), ErrorKind::Runtime, "{source}");
        assert_eq!(err.to_string(), message, "{source}");
    }
}

#[test]
fn test_parse_errors() {
    for source in ["(1 + 2", "1 +", "x = = 1", "If x {", "\"open", "1 @ 2", "Func (a b) {}"] {
        let err = eval_err(source);
        assert_eq!(err.kind(), ErrorKind::Parse, "{source}");
        assert!(err.render().starts_with("ParseError: "), "{source}");
    }
}

#[test]
fn test_host_globals() {
    common::init_tracing();
    let mut engine = runtime::Engine::new();
    engine.set_global("input", Value::from(21.0));
    assert_eq!(engine.eval("input * 2").unwrap(), Value::from(42.0));
    engine.eval("out = input + 1").unwrap();
    assert_eq!(engine.global("out"), Some(&Value::from(22.0)));
    assert_eq!(engine.global_names(), vec!["input", "out"]);
}

#[test]
fn test_higher_order_with_closures() {
    let source = r#"
factor = 3
scaled = MAP([1, 2, 3], Func(x) { x * factor })
REDUCE(scaled, Func(acc, x) { acc + x }, 0)
"#;
    assert_eq!(eval(source), Value::from(18.0));
}

#[test]
fn test_long_operator_chain_is_a_parse_error() {
    let err = eval_err(&format!("1{}", " + 1".repeat(10_000)));
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.render().contains("nesting deeper than"), "{}", err.render());

    let err = eval_err(&format!("True{}", " And True".repeat(10_000)));
    assert_eq!(err.kind(), ErrorKind::Parse);

    assert_eq!(render(&format!("0{}", " + 1".repeat(MAX_NESTING / 2))), "128");
}

#[test]
fn test_long_index_chain_is_a_parse_error() {
    let err = eval_err(&format!("a = [0]\na{}", "[0]".repeat(10_000)));
    assert_eq!(err.kind(), ErrorKind::Parse);

    let err = eval_err(&format!("{}1", "Not ".repeat(10_000)));
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_deeply_nested_value_is_a_runtime_error() {
    let source = r#"
a = []
i = 0
While i < 20000 {
    a = [a]
    i = i + 1
}
LEN(a)
"#;
    let err = eval_err(source);
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert_eq!(err.to_string(), "value nesting exceeds 128 levels");

    let dict = "d = {}\nWhile True { d = {inner: d} }";
    assert_eq!(eval_err(dict).to_string(), "value nesting exceeds 128 levels");

    let indexed = format!("g = [0]\ng[0]{} = 1", "[0]".repeat(MAX_VALUE_DEPTH));
    assert_eq!(eval_err(&indexed).kind(), ErrorKind::Runtime);
}

#[test]
fn test_value_at_depth_limit_still_renders() {
    let source = format!(
        "a = 0\ni = 0\nWhile i < {MAX_VALUE_DEPTH} {{ a = [a]\ni = i + 1 }}\nJSON_STRINGIFY(a)"
    );
    let text = eval(&source).to_string();
    assert_eq!(text.len(), MAX_VALUE_DEPTH * 2 + 1);
    assert!(text.starts_with("[[[") && text.ends_with("]]]"));
}

#[test]
fn test_closure_chains_are_bounded() {
    let source = r#"
Func build() {
    g = Func() { 0 }
    While True { g = Func() { g() } }
}
build()
"#;
    assert_eq!(eval_err(source).to_string(), "value nesting exceeds 128 levels");
}
