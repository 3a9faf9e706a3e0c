use log::{debug, trace};

use super::value::{EvalError, Value};
use crate::lang::ast::{Identifier, Node};
use crate::lang::environment::Environment;
use crate::lang::functions::{FunctionDef, Primitive};

/// Result of one evaluation step: the value, and the environment after the step
pub type Evaluation = (Value, Environment);

/// Evaluate `stmts` in order, stopping at the first error
///
/// The result is the last statement's value (`null` for an empty block).
fn eval_stmts(stmts: &[Node], env: &Environment) -> Evaluation {
    let mut result = Value::Null;
    let mut env = env.clone();

    for stmt in stmts {
        let (val, next) = evaluate(stmt, &env);
        if val.is_error() {
            return (val, next);
        }

        result = val;
        env = next;
    }

    (result, env)
}

fn eval_assign(ident: &Identifier, expr: &Node, env: &Environment) -> Evaluation {
    let (val, env) = evaluate(expr, env);
    if val.is_error() {
        return (val, env);
    }

    (Value::Null, env.with_variable(ident.clone(), val))
}

fn eval_if(
    cond: &Node,
    true_body: &[Node],
    false_body: Option<&[Node]>,
    env: &Environment,
) -> Evaluation {
    let (cond, env) = evaluate(cond, env);
    if cond.is_error() {
        return (cond, env);
    }

    if cond.is_truthy() {
        eval_stmts(true_body, &env)
    } else {
        match false_body {
            Some(stmts) => eval_stmts(stmts, &env),
            None => (Value::Null, env),
        }
    }
}

/// Evaluate an integer operand of `+` or `-`
///
/// `Err` holds the evaluation to hand straight back to the caller
fn eval_operand(expr: &Node, env: &Environment) -> Result<(i64, Environment), Evaluation> {
    match evaluate(expr, env) {
        (Value::Integer(i), env) => Ok((i, env)),
        (val, env) if val.is_error() => Err((val, env)),
        (val, env) => Err((
            Value::Error(EvalError::Type(format!(
                "Expected integer, got '{}'",
                val.type_str()
            ))),
            env,
        )),
    }
}

fn eval_binop(
    lhs: &Node,
    rhs: &Node,
    env: &Environment,
    op: &str,
    apply: fn(i64, i64) -> Option<i64>,
) -> Evaluation {
    let (l, env) = match eval_operand(lhs, env) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (r, env) = match eval_operand(rhs, &env) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let val = match apply(l, r) {
        Some(res) => Value::Integer(res),
        None => Value::Error(EvalError::evaluator(format!(
            "integer overflow in {} {} {}",
            l, op, r
        ))),
    };

    (val, env)
}

fn eval_unop(expr: &Node, env: &Environment, negate: bool) -> Evaluation {
    let (val, env) = evaluate(expr, env);
    let val = match val {
        Value::Integer(i) if negate => match i.checked_neg() {
            Some(res) => Value::Integer(res),
            None => Value::Error(EvalError::evaluator(format!("integer overflow in -({})", i))),
        },
        Value::Integer(i) => Value::Integer(i),
        e @ Value::Error(_) => e,
        v => Value::Error(EvalError::evaluator(format!(
            "Unary operator expects integer, got '{}'",
            v.type_str()
        ))),
    };

    (val, env)
}

fn eval_func_def(
    ident: &Identifier,
    params: &[Identifier],
    body: &[Node],
    env: &Environment,
) -> Evaluation {
    debug!("defining {}({} params)", ident, params.len());
    let func = FunctionDef::defined(params.to_vec(), body.to_vec());

    (Value::Null, env.clone().with_function(ident.clone(), func))
}

fn eval_func_call(ident: &Identifier, args: &[Node], env: &Environment) -> Evaluation {
    let func = match env.function(ident) {
        Some(f) => f.clone(),
        None => {
            return (
                Value::Error(EvalError::UndefinedFunction(ident.clone())),
                env.clone(),
            )
        }
    };

    if func.arity() != args.len() {
        return (
            Value::Error(EvalError::ArgumentsCount {
                name: ident.clone(),
                expected: func.arity(),
                actual: args.len(),
            }),
            env.clone(),
        );
    }

    // Arguments are evaluated left to right, each one seeing the environment the previous one
    // left behind
    let mut vals = Vec::with_capacity(args.len());
    let mut env = env.clone();
    for arg in args {
        let (val, next) = evaluate(arg, &env);
        if val.is_error() {
            return (val, next);
        }

        vals.push(val);
        env = next;
    }

    debug!("calling {}({} args)", ident, vals.len());
    let result = match &func {
        FunctionDef::Embedded { callback, .. } => {
            let prims: Vec<Primitive> = vals.iter().map(Value::to_primitive).collect();
            match callback(prims.as_slice()) {
                Ok(p) => Value::from(p),
                Err(e) => Value::Error(EvalError::FunctionType {
                    name: ident.clone(),
                    message: e.to_string(),
                }),
            }
        }
        FunctionDef::Defined { parameters, body } => {
            let frame = env.call_frame(parameters.iter().cloned().zip(vals));
            // The callee's environment dies here
            let (val, _) = eval_stmts(body, &frame);
            val
        }
    };

    (result, env)
}

/// Evaluate `node` against `env`
///
/// Returns the resulting value along with the environment after evaluation. `env` itself is never
/// modified. Failures are reported as `Value::Error`; when one occurs the returned environment is
/// the one in effect at the failing node.
pub fn evaluate(node: &Node, env: &Environment) -> Evaluation {
    trace!("eval {}", node.kind());

    match node {
        Node::Source(stmts) => eval_stmts(stmts, env),
        Node::FuncDef(ident, params, body) => eval_func_def(ident, params, body, env),
        Node::Assignment(ident, expr) => eval_assign(ident, expr, env),
        Node::If(cond, true_body, false_body) => {
            eval_if(cond, true_body, false_body.as_deref(), env)
        }
        Node::Add(lhs, rhs) => eval_binop(lhs, rhs, env, "+", i64::checked_add),
        Node::Sub(lhs, rhs) => eval_binop(lhs, rhs, env, "-", i64::checked_sub),
        Node::UnaryPlus(expr) => eval_unop(expr, env, false),
        Node::UnaryMinus(expr) => eval_unop(expr, env, true),
        Node::Variable(ident) => (
            env.variable(ident).cloned().unwrap_or(Value::Null),
            env.clone(),
        ),
        Node::FuncCall(ident, args) => eval_func_call(ident, args, env),
        Node::IntLiteral(i) => (Value::Integer(*i), env.clone()),
        Node::BoolLiteral(b) => (Value::Boolean(*b), env.clone()),
        Node::NullLiteral => (Value::Null, env.clone()),
        Node::SyntaxError(_) => (Value::Error(EvalError::invalid_node(node)), env.clone()),
    }
}

#[cfg(test)]
use crate::lang::parse::lex_and_parse;

#[cfg(test)]
fn run(input: &str, env: &Environment) -> Evaluation {
    evaluate(&lex_and_parse(input), env)
}

#[cfg(test)]
fn env_with(vars: Vec<(&str, Value)>) -> Environment {
    vars.into_iter().fold(Environment::new(), |env, (name, val)| {
        env.with_variable(Identifier::from(name), val)
    })
}

#[test]
fn test_expression() {
    let tests = vec![
        ("1;", Value::Integer(1)),
        ("123;", Value::Integer(123)),
        ("true;", Value::Boolean(true)),
        ("false;", Value::Boolean(false)),
        ("null;", Value::Null),
        ("non;", Value::Null),
        ("1+2;", Value::Integer(3)),
        ("1+2+3;", Value::Integer(6)),
        ("10-3;", Value::Integer(7)),
        ("10-3-2;", Value::Integer(5)),
        ("1-(3-2);", Value::Integer(0)),
        ("-5;", Value::Integer(-5)),
        ("+5;", Value::Integer(5)),
        ("--5;", Value::Integer(5)),
        ("2+-5;", Value::Integer(-3)),
        ("1;2;", Value::Integer(2)),
        ("", Value::Null),
        ("9223372036854775807;", Value::Integer(i64::MAX)),
    ];

    for (input, expected) in tests {
        let (val, env) = run(input, &Environment::new());
        assert_eq!(val, expected, "{}", input);
        assert_eq!(env, Environment::new(), "{}", input);
    }
}

#[test]
fn test_expression_errors() {
    let tests = vec![
        ("a+1;", "TypeError"),
        ("true+1;", "TypeError"),
        ("1+null;", "TypeError"),
        ("(1+non)+23;", "TypeError"),
        ("1+(non+23);", "TypeError"),
        ("1-false;", "TypeError"),
        ("-true;", "EvaluatorError"),
        ("+null;", "EvaluatorError"),
        ("-(1+true);", "TypeError"),
        ("9223372036854775807+1;", "EvaluatorError"),
        ("-9223372036854775807-2;", "EvaluatorError"),
        ("if(1+true){ }", "TypeError"),
        ("if(true){ 1+true; 1234; }", "TypeError"),
        ("f();", "UndefinedFunctionError"),
        ("1;$;", "EvaluatorError"),
    ];

    for (input, expected) in tests {
        match run(input, &Environment::new()) {
            (Value::Error(e), _) => assert_eq!(e.kind(), expected, "{}", input),
            (v, _) => assert!(false, "{} evaluated to {} instead of failing", input, v),
        }
    }
}

#[test]
fn test_unknown_node() {
    let ast = Node::Source(vec![Node::SyntaxError("bad".to_string())]);
    match evaluate(&ast, &Environment::new()) {
        (Value::Error(EvalError::Evaluator { node, .. }), _) => assert_eq!(
            node,
            Some(Box::new(Node::SyntaxError("bad".to_string())))
        ),
        _ => assert!(false, "Unknown node evaluated"),
    }
}

#[test]
fn test_assignment() {
    let tests = vec![
        ("a=1;", vec![("a", Value::Integer(1))]),
        ("a=1;a=2;", vec![("a", Value::Integer(2))]),
        ("a=1;b=a+1;", vec![("a", Value::Integer(1)), ("b", Value::Integer(2))]),
        ("a=true;", vec![("a", Value::Boolean(true))]),
        ("a=non;", vec![("a", Value::Null)]),
    ];

    for (input, vars) in tests {
        let (val, env) = run(input, &Environment::new());
        assert_eq!(val, Value::Null, "{}", input);
        assert_eq!(env, env_with(vars), "{}", input);
    }
}

#[test]
fn test_assignment_error() {
    // A failing right-hand side is reported and binds nothing
    let (val, env) = run("a=1; b=1+true; c=3;", &Environment::new());
    match val {
        Value::Error(e) => assert_eq!(e.kind(), "TypeError"),
        v => assert!(false, "Assignment evaluated to {}", v),
    }
    assert_eq!(env, env_with(vec![("a", Value::Integer(1))]));
}

#[test]
fn test_variable() {
    let env = env_with(vec![("value", Value::Integer(123))]);
    let (val, after) = run("value;", &env);
    assert_eq!(val, Value::Integer(123));
    assert_eq!(after, env);

    let (val, after) = evaluate(&Node::Variable(Identifier::from("x")), &Environment::new());
    assert_eq!(val, Value::Null);
    assert_eq!(after, Environment::new());
}

#[test]
fn test_if() {
    let tests = vec![
        ("if(true){a=1;}", Value::Null, vec![("a", Value::Integer(1))]),
        ("if(false){a=1;}", Value::Null, vec![]),
        ("if(123){a=1;}", Value::Null, vec![("a", Value::Integer(1))]),
        ("if(0){a=1;}", Value::Null, vec![("a", Value::Integer(1))]),
        ("if(null){a=1;}", Value::Null, vec![]),
        ("if(true){}", Value::Null, vec![]),
        ("if(true){ 1; }", Value::Integer(1), vec![]),
        ("if(true){ 2; 3; }", Value::Integer(3), vec![]),
        ("if(false){ 1; } else { 2; }", Value::Integer(2), vec![]),
        ("if(null){ 1; } else { }", Value::Null, vec![]),
        (
            "if(false){ a=1; } else { a=2; b=3; }",
            Value::Null,
            vec![("a", Value::Integer(2)), ("b", Value::Integer(3))],
        ),
        (
            "x=1; if(x){ if(false){ y=1; } else { y=2; } }",
            Value::Null,
            vec![("x", Value::Integer(1)), ("y", Value::Integer(2))],
        ),
    ];

    for (input, expected, vars) in tests {
        let (val, env) = run(input, &Environment::new());
        assert_eq!(val, expected, "{}", input);
        assert_eq!(env, env_with(vars), "{}", input);
    }
}

#[test]
fn test_error_stops_block() {
    let (val, env) = run("a=1; 1+true; b=2;", &Environment::new());
    assert!(val.is_error());
    assert_eq!(env, env_with(vec![("a", Value::Integer(1))]));
}

#[test]
fn test_defined_function() {
    let tests = vec![
        ("def f() { 1; } f();", Value::Integer(1)),
        ("def f() { } f();", Value::Null),
        ("def add(a, b) { a + b; } add(2, 3);", Value::Integer(5)),
        ("def f(a) { a; } f(true);", Value::Boolean(true)),
        // Last definition wins
        ("def f() { 1; } def f() { 2; } f();", Value::Integer(2)),
        // Callers' variables are not visible inside
        ("x = 5; def f() { x; } f();", Value::Null),
        // Functions defined after the caller are resolved at call time
        ("def f() { g(); } def g() { 7; } f();", Value::Integer(7)),
        (
            "def twice(x) { x + x; } def quad(x) { twice(twice(x)); } quad(3);",
            Value::Integer(12),
        ),
        // Functions defined inside a body stay inside
        ("def f() { def g() { 1; } g(); } f();", Value::Integer(1)),
    ];

    for (input, expected) in tests {
        let (val, _) = run(input, &Environment::new());
        assert_eq!(val, expected, "{}", input);
    }
}

#[test]
fn test_call_does_not_leak() {
    let (val, env) = run(
        "x = 1; def f(x) { y = x + 1; def g() { 1; } y; } r = f(10);",
        &Environment::new(),
    );
    assert_eq!(val, Value::Null);
    assert_eq!(env.variable(&Identifier::from("x")), Some(&Value::Integer(1)));
    assert_eq!(env.variable(&Identifier::from("r")), Some(&Value::Integer(11)));
    assert_eq!(env.variable(&Identifier::from("y")), None);
    assert!(env.function(&Identifier::from("g")).is_none());
}

#[test]
fn test_recursion() {
    let program = r#"
        # Sum of 1..=n
        def sum(n) {
            if (iszero(n)) { 0; } else { n + sum(n - 1); }
        }
        total = sum(10);
        total;
    "#;

    let (val, env) = run(program, &Environment::with_prelude());
    assert_eq!(val, Value::Integer(55));
    assert_eq!(env.variables().len(), 1);
    assert_eq!(env.variable(&Identifier::from("n")), None);
}

#[test]
fn test_function_call_errors() {
    let tests = vec![
        ("undefined();", "UndefinedFunctionError"),
        ("def f(a) { a; } f();", "ArgumentsCountError"),
        ("def f(a) { a; } f(1, 2);", "ArgumentsCountError"),
        ("def f(a) { a; } f(1+true);", "TypeError"),
        ("def f() { 1+true; } f();", "TypeError"),
        ("def f(a) { a; } f(g());", "UndefinedFunctionError"),
        ("1 + f();", "UndefinedFunctionError"),
        ("lt(true, 1);", "FunctionTypeError"),
    ];

    for (input, expected) in tests {
        match run(input, &Environment::with_prelude()) {
            (Value::Error(e), _) => assert_eq!(e.kind(), expected, "{}", input),
            (v, _) => assert!(false, "{} evaluated to {} instead of failing", input, v),
        }
    }
}

#[test]
fn test_arguments_count_message() {
    let (val, _) = run("def f(a, b) { a; } f(1);", &Environment::new());
    assert_eq!(
        val,
        Value::Error(EvalError::ArgumentsCount {
            name: Identifier::from("f"),
            expected: 2,
            actual: 1,
        })
    );
}

#[test]
fn test_embedded_function() {
    use std::sync::{Arc, Mutex};

    let tests = vec![
        ("embedded();", 0, vec![]),
        ("embedded(123);", 1, vec![Primitive::Integer(123)]),
        (
            "embedded(true, false);",
            2,
            vec![Primitive::Boolean(true), Primitive::Boolean(false)],
        ),
        (
            "embedded(null, 1+2);",
            2,
            vec![Primitive::None, Primitive::Integer(3)],
        ),
    ];

    for (input, arity, expected) in tests {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&calls);
        let env = Environment::new().with_function(
            Identifier::from("embedded"),
            FunctionDef::embedded(arity, move |args| {
                recorder.lock().expect("Poisoned").push(args.to_vec());
                Ok(Primitive::None)
            }),
        );

        let (val, after) = run(input, &env);
        assert_eq!(val, Value::Null, "{}", input);
        assert_eq!(after, env, "{}", input);
        assert_eq!(*calls.lock().expect("Poisoned"), vec![expected], "{}", input);
    }
}

#[test]
fn test_embedded_function_result() {
    let tests = vec![
        (Primitive::Integer(123), Value::Integer(123)),
        (Primitive::Boolean(true), Value::Boolean(true)),
        (Primitive::Boolean(false), Value::Boolean(false)),
        (Primitive::None, Value::Null),
    ];

    for (ret, expected) in tests {
        let env = Environment::new().with_function(
            Identifier::from("embedded"),
            FunctionDef::embedded(0, move |_| Ok(ret)),
        );

        let (val, after) = run("embedded();", &env);
        assert_eq!(val, expected);
        assert_eq!(after, env);
    }
}

#[test]
fn test_embedded_function_argument_error() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);
    let env = Environment::new().with_function(
        Identifier::from("func"),
        FunctionDef::embedded(1, move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(Primitive::None)
        }),
    );

    match run("func(1+null);", &env) {
        (Value::Error(e), _) => assert_eq!(e.kind(), "TypeError"),
        (v, _) => assert!(false, "Call evaluated to {}", v),
    }
    assert!(!called.load(Ordering::SeqCst));
}

#[test]
fn test_arguments_stop_at_first_error() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let env = Environment::new()
        .with_function(
            Identifier::from("tick"),
            FunctionDef::embedded(0, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Primitive::Integer(1))
            }),
        )
        .with_function(
            Identifier::from("three"),
            FunctionDef::embedded(3, |_| Ok(Primitive::None)),
        );

    let (val, _) = run("three(tick(), 1+true, tick());", &env);
    assert!(val.is_error());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
