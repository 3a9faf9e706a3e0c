//! End to end tests driving source text through the whole pipeline.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use sprig::lang::ast::{Identifier, Node};
use sprig::lang::environment::Environment;
use sprig::lang::eval::{evaluate, Value};
use sprig::lang::lex::{tokenize, Token};
use sprig::lang::parse::lex_and_parse;
use sprig::lang::runtime::{run, Runtime};

fn error_kind(val: &Value) -> Option<&'static str> {
    match val {
        Value::Error(e) => Some(e.kind()),
        _ => None,
    }
}

/// Lowercase words that aren't keywords
fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z]{1,8}".prop_filter("keyword", |s| {
        !matches!(s.as_str(), "if" | "def" | "true" | "false" | "null")
    })
}

/// Expressions that fail, along with the kind of error they fail with
fn arb_failing_expr() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop_oneof![
        Just(("1+true", "TypeError")),
        Just(("null-2", "TypeError")),
        Just(("missing()", "UndefinedFunctionError")),
        Just(("iszero(1, 2)", "ArgumentsCountError")),
        Just(("lt(false, 0)", "FunctionTypeError")),
        Just(("-true", "EvaluatorError")),
    ]
}

proptest! {
    #[test]
    fn tokenize_is_deterministic(source in "\\PC{0,64}") {
        prop_assert_eq!(tokenize(&source), tokenize(&source));
    }

    #[test]
    fn tokens_print_back(source in "[a-z0-9 (){},;=+*/$-]{0,18}") {
        let tokens = tokenize(&source);
        let printed = tokens
            .iter()
            .map(Token::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        prop_assert_eq!(tokenize(&printed), tokens);
    }

    #[test]
    fn addition(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
        let (val, env) = run(&format!("{}+{};", a, b), &Environment::new());
        prop_assert_eq!(val, Value::Integer(a + b));
        prop_assert_eq!(env, Environment::new());
    }

    #[test]
    fn subtraction(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
        let (val, _) = run(&format!("{} - {};", a, b), &Environment::new());
        prop_assert_eq!(val, Value::Integer(a - b));
    }

    #[test]
    fn errors_propagate_from_either_operand(
        (expr, kind) in arb_failing_expr(),
        n in -1000i64..1000,
    ) {
        let env = Environment::with_prelude();

        let (lhs, _) = run(&format!("({})+{};", expr, n), &env);
        prop_assert_eq!(error_kind(&lhs), Some(kind));

        let (rhs, _) = run(&format!("{}+({});", n, expr), &env);
        prop_assert_eq!(error_kind(&rhs), Some(kind));
    }

    #[test]
    fn assignment_binds(name in arb_ident(), n in 0i64..=i64::MAX) {
        let (val, env) = run(&format!("{} = {};", name, n), &Environment::new());
        prop_assert_eq!(val, Value::Null);
        prop_assert_eq!(env.variable(&Identifier(name)), Some(&Value::Integer(n)));
    }

    #[test]
    fn unbound_variables_are_null(name in arb_ident()) {
        let (val, env) = run(&format!("{};", name), &Environment::new());
        prop_assert_eq!(val, Value::Null);
        prop_assert_eq!(env, Environment::new());
    }

    #[test]
    fn block_result_is_last_statement(values in prop::collection::vec(-1000i64..1000, 1..8)) {
        let body: String = values.iter().map(|v| format!("{};", v)).collect();
        let (val, _) = run(&format!("if (true) {{ {} }}", body), &Environment::new());
        prop_assert_eq!(val, Value::Integer(values[values.len() - 1]));
    }

    #[test]
    fn recursion_does_not_leak(n in 0i64..64) {
        let program = format!(
            "def countdown(n) {{ if (iszero(n)) {{ 0; }} else {{ countdown(n - 1); }} }} \
             n = {}; steps = countdown(n);",
            n
        );

        let (val, env) = run(&program, &Environment::with_prelude());
        prop_assert_eq!(val, Value::Null);
        prop_assert_eq!(env.variable(&Identifier::from("n")), Some(&Value::Integer(n)));
        prop_assert_eq!(env.variable(&Identifier::from("steps")), Some(&Value::Integer(0)));
        prop_assert_eq!(env.variables().len(), 2);
    }
}

#[test]
fn test_if_truthiness() {
    let tests = vec![
        ("true", true),
        ("false", false),
        ("null", false),
        ("0", true),
        ("-1", true),
        ("undefinedvar", false),
        ("eq(1, 1)", true),
        ("not(0)", false),
    ];

    for (cond, truthy) in tests {
        let program = format!("if ({}) {{ 1; }} else {{ 2; }}", cond);
        let (val, _) = run(&program, &Environment::with_prelude());
        let expected = Value::Integer(if truthy { 1 } else { 2 });
        assert_eq!(val, expected, "{}", cond);
    }
}

#[test]
fn test_environment_is_not_mutated() {
    let env = Environment::with_prelude();
    let before = env.clone();

    let (_, after) = run("a = 1; def f() { 2; }", &env);
    assert_eq!(env, before);
    assert_eq!(after.variable(&Identifier::from("a")), Some(&Value::Integer(1)));
    assert!(after.function(&Identifier::from("f")).is_some());
    assert!(env.function(&Identifier::from("f")).is_none());
}

#[test]
fn test_fibonacci() {
    let program = r#"
        def fib(n) {
            if (lt(n, 2)) {
                n;
            } else {
                fib(n - 1) + fib(n - 2);
            }
        }
        fib(15);
    "#;

    let (val, env) = run(program, &Environment::with_prelude());
    assert_eq!(val, Value::Integer(610));
    assert!(env.variables().is_empty());
}

#[test]
fn test_strings_are_not_evaluated() {
    let ast = lex_and_parse("x = \"hello\";");
    assert_eq!(
        ast,
        Node::SyntaxError("Unexpected tokens `Ident`, `Equal`".to_string())
    );

    match evaluate(&ast, &Environment::new()) {
        (Value::Error(e), _) => assert_eq!(e.kind(), "EvaluatorError"),
        (v, _) => assert!(false, "String evaluated to {}", v),
    }
}

#[test]
fn test_runtime_session() {
    let mut rt = Runtime::default();
    let session = vec![
        ("total = 0;", Value::Null),
        ("def add(a, b) { a + b; }", Value::Null),
        ("total = add(total, 5);", Value::Null),
        ("total = add(total, 7);", Value::Null),
        ("total;", Value::Integer(12)),
        ("gt(total, 10);", Value::Boolean(true)),
    ];

    for (input, expected) in session {
        assert_eq!(rt.eval(input).expect("eval failed"), expected, "{}", input);
    }
}

#[test]
fn test_many_assignments() {
    let count = 20_000;
    let program: String = (0..count).map(|i| format!("v{} = {};", to_word(i), i)).collect();

    let (val, env) = run(&program, &Environment::new());
    assert_eq!(val, Value::Null);
    assert_eq!(env.variables().len(), count);
    assert_eq!(
        env.variable(&Identifier(format!("v{}", to_word(count - 1)))),
        Some(&Value::Integer(count as i64 - 1))
    );
}

/// Spell `n` with lowercase letters, since identifiers can't hold digits
fn to_word(mut n: usize) -> String {
    let mut word = String::new();
    loop {
        word.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
        if n == 0 {
            return word;
        }
    }
}
