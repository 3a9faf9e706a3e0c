use std::fmt;

#[derive(Debug, PartialEq, Hash, PartialOrd, Ord, Eq, Clone)]
pub struct Identifier(pub String);

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(name.to_string())
    }
}

/// A node of the syntax tree
///
/// Nodes own their children outright; the tree never shares subtrees.
#[derive(Debug, PartialEq, Clone)]
pub enum Node {
    /// Top level list of statements
    Source(Vec<Node>),
    /// (name, parameters, body)
    FuncDef(Identifier, Vec<Identifier>, Vec<Node>),
    /// (name, expression)
    Assignment(Identifier, Box<Node>),
    /// (condition, true_body, false_body)
    If(Box<Node>, Vec<Node>, Option<Vec<Node>>),
    /// `+`
    Add(Box<Node>, Box<Node>),
    /// `-`
    Sub(Box<Node>, Box<Node>),
    /// Unary `+`
    UnaryPlus(Box<Node>),
    /// Unary `-`
    UnaryMinus(Box<Node>),
    Variable(Identifier),
    /// (function, arguments)
    FuncCall(Identifier, Vec<Node>),
    IntLiteral(i64),
    BoolLiteral(bool),
    NullLiteral,
    SyntaxError(String),
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Source(_) => "Source",
            Node::FuncDef(_, _, _) => "FuncDef",
            Node::Assignment(_, _) => "Assignment",
            Node::If(_, _, _) => "If",
            Node::Add(_, _) => "Add",
            Node::Sub(_, _) => "Sub",
            Node::UnaryPlus(_) => "UnaryPlus",
            Node::UnaryMinus(_) => "UnaryMinus",
            Node::Variable(_) => "Variable",
            Node::FuncCall(_, _) => "FuncCall",
            Node::IntLiteral(_) => "IntLiteral",
            Node::BoolLiteral(_) => "BoolLiteral",
            Node::NullLiteral => "NullLiteral",
            Node::SyntaxError(_) => "SyntaxError",
        }
    }
}
