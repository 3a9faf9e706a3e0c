use im::OrdMap;

use crate::lang::ast::Identifier;
use crate::lang::eval::Value;
use crate::lang::functions::{FunctionDef, PRELUDE};

/// Variables and functions visible to a program
///
/// An `Environment` is a value, not a store. Binding something returns a new environment and
/// every other copy keeps seeing what it saw before. The maps are `im::OrdMap`s: cloning one is
/// O(1) and a binding only copies the path to the changed entry, never the whole map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    variables: OrdMap<Identifier, Value>,
    functions: OrdMap<Identifier, FunctionDef>,
}

impl Environment {
    /// Environment with nothing bound
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment with the embedded functions from `PRELUDE` bound
    pub fn with_prelude() -> Self {
        PRELUDE.iter().fold(Self::new(), |env, (name, func)| {
            env.with_function(Identifier::from(*name), func.clone())
        })
    }

    pub fn variable(&self, ident: &Identifier) -> Option<&Value> {
        self.variables.get(ident)
    }

    pub fn function(&self, ident: &Identifier) -> Option<&FunctionDef> {
        self.functions.get(ident)
    }

    pub fn variables(&self) -> &OrdMap<Identifier, Value> {
        &self.variables
    }

    pub fn functions(&self) -> &OrdMap<Identifier, FunctionDef> {
        &self.functions
    }

    /// Bind `ident` to `val`, replacing any earlier binding
    pub fn with_variable(mut self, ident: Identifier, val: Value) -> Self {
        self.variables.insert(ident, val);
        self
    }

    /// Bind `ident` to `func`, replacing any earlier definition
    pub fn with_function(mut self, ident: Identifier, func: FunctionDef) -> Self {
        self.functions.insert(ident, func);
        self
    }

    /// Environment a function body runs in: only `bindings` as variables, and the same functions
    /// as `self`
    pub fn call_frame<B>(&self, bindings: B) -> Self
    where
        B: IntoIterator<Item = (Identifier, Value)>,
    {
        Self {
            variables: bindings.into_iter().collect(),
            functions: self.functions.clone(),
        }
    }
}

#[test]
fn test_bindings_are_persistent() {
    let empty = Environment::new();
    let one = empty.clone().with_variable(Identifier::from("a"), Value::Integer(1));
    let two = one.clone().with_variable(Identifier::from("a"), Value::Integer(2));

    assert_eq!(empty.variable(&Identifier::from("a")), None);
    assert_eq!(
        one.variable(&Identifier::from("a")),
        Some(&Value::Integer(1))
    );
    assert_eq!(
        two.variable(&Identifier::from("a")),
        Some(&Value::Integer(2))
    );
    assert_eq!(two.variables().len(), 1);
}

#[test]
fn test_function_bindings_are_persistent() {
    let base = Environment::new();
    let f = FunctionDef::defined(vec![], vec![]);
    let defined = base.clone().with_function(Identifier::from("f"), f.clone());

    assert!(base.function(&Identifier::from("f")).is_none());
    assert_eq!(defined.function(&Identifier::from("f")), Some(&f));
    assert!(defined.variables().is_empty());
}

#[test]
fn test_call_frame() {
    let caller = Environment::with_prelude()
        .with_variable(Identifier::from("outer"), Value::Integer(1));
    let frame = caller.call_frame(vec![(Identifier::from("x"), Value::Boolean(true))]);

    assert_eq!(frame.variable(&Identifier::from("outer")), None);
    assert_eq!(
        frame.variable(&Identifier::from("x")),
        Some(&Value::Boolean(true))
    );
    assert_eq!(frame.functions(), caller.functions());

    // The frame is independent of the caller
    let frame = frame.with_variable(Identifier::from("outer"), Value::Null);
    assert_eq!(
        caller.variable(&Identifier::from("outer")),
        Some(&Value::Integer(1))
    );
    assert_eq!(
        frame.variable(&Identifier::from("outer")),
        Some(&Value::Null)
    );
}

#[test]
fn test_prelude() {
    let env = Environment::with_prelude();
    assert_eq!(env.functions().len(), PRELUDE.len());
    for (name, func) in PRELUDE.iter() {
        assert_eq!(env.function(&Identifier::from(*name)), Some(func));
    }
}

#[test]
fn test_many_bindings_share_structure() {
    let count = 20_000;
    let mut snapshots = Vec::with_capacity(count);
    let mut env = Environment::new();

    // Every intermediate environment stays alive, so each binding has to leave the older
    // versions intact
    for i in 0..count {
        snapshots.push(env.clone());
        env = env.with_variable(Identifier(format!("v{}", i)), Value::Integer(i as i64));
    }

    assert_eq!(env.variables().len(), count);
    for (i, snapshot) in snapshots.iter().enumerate().step_by(1000) {
        assert_eq!(snapshot.variables().len(), i);
        assert_eq!(
            env.variable(&Identifier(format!("v{}", i))),
            Some(&Value::Integer(i as i64))
        );
    }
}
