use std::fmt;

use thiserror::Error;

use crate::lang::ast::{Identifier, Node};
use crate::lang::functions::Primitive;

/// Runtime failures
///
/// These travel through the evaluator as ordinary values (`Value::Error`) and are never raised.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The evaluator was handed something it can't evaluate. `node` is the offending node, if
    /// there is one
    #[error("Evaluator error: {message}")]
    Evaluator {
        message: String,
        node: Option<Box<Node>>,
    },
    #[error("Type error: {0}")]
    Type(String),
    #[error("Undefined function '{0}'")]
    UndefinedFunction(Identifier),
    #[error("Function '{name}' takes {expected} arguments but {actual} were given")]
    ArgumentsCount {
        name: Identifier,
        expected: usize,
        actual: usize,
    },
    #[error("Function '{name}' rejected its arguments: {message}")]
    FunctionType { name: Identifier, message: String },
}

impl EvalError {
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Evaluator { .. } => "EvaluatorError",
            EvalError::Type(_) => "TypeError",
            EvalError::UndefinedFunction(_) => "UndefinedFunctionError",
            EvalError::ArgumentsCount { .. } => "ArgumentsCountError",
            EvalError::FunctionType { .. } => "FunctionTypeError",
        }
    }

    pub(super) fn invalid_node(node: &Node) -> Self {
        EvalError::Evaluator {
            message: format!("Cannot evaluate node '{}'", node.kind()),
            node: Some(Box::new(node.clone())),
        }
    }

    pub(super) fn evaluator(message: String) -> Self {
        EvalError::Evaluator {
            message,
            node: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Null,
    Error(EvalError),
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Only `false` and `null` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    pub fn type_str(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Error(e) => e.kind(),
        }
    }

    /// Unwrap into what an embedded function gets to see
    ///
    /// Errors never reach embedded functions; they map to `None` to keep this total.
    pub fn to_primitive(&self) -> Primitive {
        match self {
            Value::Integer(i) => Primitive::Integer(*i),
            Value::Boolean(b) => Primitive::Boolean(*b),
            Value::Null | Value::Error(_) => Primitive::None,
        }
    }

    /// Lift an error value into a `Result` for hosts that prefer `?`
    pub fn into_result(self) -> Result<Value, EvalError> {
        match self {
            Value::Error(e) => Err(e),
            v => Ok(v),
        }
    }
}

impl From<Primitive> for Value {
    fn from(p: Primitive) -> Self {
        match p {
            Primitive::Integer(i) => Value::Integer(i),
            Primitive::Boolean(b) => Value::Boolean(b),
            Primitive::None => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Null => write!(f, "null"),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}

#[test]
fn test_truthiness() {
    let tests = vec![
        (Value::Boolean(false), false),
        (Value::Null, false),
        (Value::Boolean(true), true),
        (Value::Integer(0), true),
        (Value::Integer(-1), true),
        (Value::Integer(123), true),
    ];

    for (value, expected) in tests {
        assert_eq!(value.is_truthy(), expected, "{}", value);
        assert_eq!(value.to_primitive().is_truthy(), expected, "{}", value);
    }
}

#[test]
fn test_primitive_round_trip() {
    let tests = vec![Value::Integer(42), Value::Boolean(true), Value::Null];

    for value in tests {
        assert_eq!(Value::from(value.to_primitive()), value);
    }
}

#[test]
fn test_error_display() {
    let tests = vec![
        (
            EvalError::Type("Expected integer, got 'null'".to_string()),
            "TypeError",
            "Type error: Expected integer, got 'null'",
        ),
        (
            EvalError::UndefinedFunction(Identifier::from("f")),
            "UndefinedFunctionError",
            "Undefined function 'f'",
        ),
        (
            EvalError::ArgumentsCount {
                name: Identifier::from("f"),
                expected: 2,
                actual: 1,
            },
            "ArgumentsCountError",
            "Function 'f' takes 2 arguments but 1 were given",
        ),
        (
            EvalError::invalid_node(&Node::SyntaxError("oops".to_string())),
            "EvaluatorError",
            "Evaluator error: Cannot evaluate node 'SyntaxError'",
        ),
    ];

    for (err, kind, message) in tests {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.to_string(), message);
        assert!(Value::Error(err).is_error());
    }
}
