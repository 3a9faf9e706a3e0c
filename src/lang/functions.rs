use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use lazy_static::lazy_static;

use crate::lang::ast::{Identifier, Node};

/// A value as the host sees it
///
/// Embedded functions receive their arguments as primitives and hand a primitive back.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Primitive {
    Integer(i64),
    Boolean(bool),
    None,
}

impl Primitive {
    pub fn as_integer(&self) -> Result<i64> {
        match self {
            Primitive::Integer(i) => Ok(*i),
            p => bail!("Expected integer, got '{}'", p),
        }
    }

    /// Same rule as `if`: only `false` and `null` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Primitive::Boolean(false) | Primitive::None)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Integer(i) => write!(f, "{}", i),
            Primitive::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Primitive::None => write!(f, "null"),
        }
    }
}

/// Host side implementation of an embedded function
///
/// The slice always holds exactly as many primitives as the arity the function was registered
/// with. Returning `Err` means the host refused the argument types it was given.
pub type Callback = dyn Fn(&[Primitive]) -> Result<Primitive> + Send + Sync;

#[derive(Clone)]
pub enum FunctionDef {
    /// Implemented by the host
    Embedded { arity: usize, callback: Arc<Callback> },
    /// Written in sprig with `def`
    Defined {
        parameters: Vec<Identifier>,
        body: Arc<[Node]>,
    },
}

impl FunctionDef {
    pub fn embedded<F>(arity: usize, callback: F) -> Self
    where
        F: Fn(&[Primitive]) -> Result<Primitive> + Send + Sync + 'static,
    {
        FunctionDef::Embedded {
            arity,
            callback: Arc::new(callback),
        }
    }

    pub fn defined(parameters: Vec<Identifier>, body: Vec<Node>) -> Self {
        FunctionDef::Defined {
            parameters,
            body: body.into(),
        }
    }

    /// Number of arguments a call must supply
    pub fn arity(&self) -> usize {
        match self {
            FunctionDef::Embedded { arity, .. } => *arity,
            FunctionDef::Defined { parameters, .. } => parameters.len(),
        }
    }
}

impl PartialEq for FunctionDef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                FunctionDef::Embedded { arity, callback },
                FunctionDef::Embedded {
                    arity: other_arity,
                    callback: other_callback,
                },
            ) => arity == other_arity && Arc::ptr_eq(callback, other_callback),
            (
                FunctionDef::Defined { parameters, body },
                FunctionDef::Defined {
                    parameters: other_parameters,
                    body: other_body,
                },
            ) => parameters == other_parameters && body == other_body,
            _ => false,
        }
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionDef::Embedded { arity, .. } => f
                .debug_struct("Embedded")
                .field("arity", arity)
                .finish_non_exhaustive(),
            FunctionDef::Defined { parameters, body } => f
                .debug_struct("Defined")
                .field("parameters", parameters)
                .field("body", body)
                .finish(),
        }
    }
}

fn eq(args: &[Primitive]) -> Result<Primitive> {
    Ok(Primitive::Boolean(args[0] == args[1]))
}

fn lt(args: &[Primitive]) -> Result<Primitive> {
    Ok(Primitive::Boolean(args[0].as_integer()? < args[1].as_integer()?))
}

fn gt(args: &[Primitive]) -> Result<Primitive> {
    Ok(Primitive::Boolean(args[0].as_integer()? > args[1].as_integer()?))
}

fn not(args: &[Primitive]) -> Result<Primitive> {
    Ok(Primitive::Boolean(!args[0].is_truthy()))
}

fn iszero(args: &[Primitive]) -> Result<Primitive> {
    Ok(Primitive::Boolean(args[0].as_integer()? == 0))
}

lazy_static! {
    /// Embedded functions installed by `Environment::with_prelude()`
    ///
    /// The language has no comparison operators, so these are what conditions are written with.
    pub static ref PRELUDE: Vec<(&'static str, FunctionDef)> = vec![
        ("eq", FunctionDef::embedded(2, eq)),
        ("lt", FunctionDef::embedded(2, lt)),
        ("gt", FunctionDef::embedded(2, gt)),
        ("not", FunctionDef::embedded(1, not)),
        ("iszero", FunctionDef::embedded(1, iszero)),
    ];
}

#[test]
fn test_prelude() {
    use Primitive::*;

    let tests = vec![
        ("eq", vec![Integer(1), Integer(1)], Boolean(true)),
        ("eq", vec![Integer(1), Boolean(true)], Boolean(false)),
        ("eq", vec![None, None], Boolean(true)),
        ("lt", vec![Integer(1), Integer(2)], Boolean(true)),
        ("lt", vec![Integer(2), Integer(2)], Boolean(false)),
        ("gt", vec![Integer(3), Integer(-2)], Boolean(true)),
        ("not", vec![Boolean(false)], Boolean(true)),
        ("not", vec![None], Boolean(true)),
        ("not", vec![Integer(0)], Boolean(false)),
        ("iszero", vec![Integer(0)], Boolean(true)),
        ("iszero", vec![Integer(7)], Boolean(false)),
    ];

    for (name, args, expected) in tests {
        let (_, func) = PRELUDE
            .iter()
            .find(|(n, _)| *n == name)
            .expect("Missing prelude function");
        assert_eq!(func.arity(), args.len());
        match func {
            FunctionDef::Embedded { callback, .. } => {
                assert_eq!(callback(args.as_slice()).expect("Callback failed"), expected)
            }
            _ => assert!(false, "Prelude function is not embedded"),
        }
    }
}

#[test]
fn test_prelude_rejects_types() {
    let tests = vec![
        ("lt", vec![Primitive::Boolean(true), Primitive::Integer(1)]),
        ("gt", vec![Primitive::Integer(1), Primitive::None]),
        ("iszero", vec![Primitive::Boolean(false)]),
    ];

    for (name, args) in tests {
        let (_, func) = PRELUDE
            .iter()
            .find(|(n, _)| *n == name)
            .expect("Missing prelude function");
        match func {
            FunctionDef::Embedded { callback, .. } => assert!(callback(args.as_slice()).is_err()),
            _ => assert!(false, "Prelude function is not embedded"),
        }
    }
}

#[test]
fn test_function_equality() {
    let f = FunctionDef::embedded(0, |_| Ok(Primitive::None));
    let g = FunctionDef::embedded(0, |_| Ok(Primitive::None));
    assert_eq!(f, f.clone());
    assert_ne!(f, g);

    let body = vec![Node::IntLiteral(1)];
    assert_eq!(
        FunctionDef::defined(vec![Identifier::from("x")], body.clone()),
        FunctionDef::defined(vec![Identifier::from("x")], body)
    );
}
