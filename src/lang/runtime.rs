use anyhow::{bail, Result};
use log::{debug, info};

use crate::lang::ast::Node;
use crate::lang::environment::Environment;
use crate::lang::eval::{evaluate, Value};
use crate::lang::lex::tokenize;
use crate::lang::parse::parse;

/// Tokenize, parse, and evaluate `source` against `env`
///
/// A syntax error comes back as an `EvaluatorError` value, exactly as evaluating the
/// `Node::SyntaxError` would.
pub fn run(source: &str, env: &Environment) -> (Value, Environment) {
    let tokens = tokenize(source);
    debug!("{} tokens", tokens.len());

    let ast = parse(&tokens);
    evaluate(&ast, env)
}

/// Keeps one environment alive across many inputs
///
/// Each call to `eval()` sees everything earlier calls bound, including the bindings made before
/// a failing statement.
pub struct Runtime {
    env: Environment,
}

impl Runtime {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Run `source` and lift the result into a `Result`
    pub fn eval(&mut self, source: &str) -> Result<Value> {
        let ast = parse(&tokenize(source));
        if let Node::SyntaxError(msg) = &ast {
            bail!("Syntax error: {}", msg);
        }

        let (val, env) = evaluate(&ast, &self.env);
        self.env = env;
        info!(
            "{} variables, {} functions bound",
            self.env.variables().len(),
            self.env.functions().len()
        );

        Ok(val.into_result()?)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Environment::with_prelude())
    }
}

#[test]
fn test_run() {
    let tests = vec![
        ("1+2;", Value::Integer(3)),
        ("a = 2; a + a;", Value::Integer(4)),
        ("", Value::Null),
        ("def f() { true; } f();", Value::Boolean(true)),
    ];

    for (input, expected) in tests {
        let (val, _) = run(input, &Environment::new());
        assert_eq!(val, expected, "{}", input);
    }
}

#[test]
fn test_run_syntax_error() {
    match run("1 +", &Environment::new()) {
        (Value::Error(e), env) => {
            assert_eq!(e.kind(), "EvaluatorError");
            assert_eq!(env, Environment::new());
        }
        (v, _) => assert!(false, "Syntax error evaluated to {}", v),
    }
}

#[test]
fn test_runtime_keeps_state() {
    use crate::lang::ast::Identifier;

    let mut rt = Runtime::default();
    assert_eq!(rt.eval("a = 1;").expect("eval failed"), Value::Null);
    assert_eq!(rt.eval("def inc(x) { x + 1; }").expect("eval failed"), Value::Null);
    assert_eq!(rt.eval("inc(a);").expect("eval failed"), Value::Integer(2));

    // Bindings made before the failure survive it
    assert!(rt.eval("b = 2; 1 + true; c = 3;").is_err());
    assert_eq!(
        rt.environment().variable(&Identifier::from("b")),
        Some(&Value::Integer(2))
    );
    assert_eq!(rt.environment().variable(&Identifier::from("c")), None);

    // A syntax error touches nothing
    let before = rt.environment().clone();
    assert!(rt.eval("d = ;").is_err());
    assert_eq!(rt.environment(), &before);
}

#[test]
fn test_runtime_error_message() {
    let mut rt = Runtime::default();
    let err = rt.eval("nope(1);").expect_err("call succeeded");
    assert_eq!(err.to_string(), "Undefined function 'nope'");

    let err = rt.eval("1").expect_err("parse succeeded");
    assert_eq!(
        err.to_string(),
        "Syntax error: Unexpected tokens `Int`, `end of input`"
    );
}
