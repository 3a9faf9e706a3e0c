//! Parser for the sprig language.
//!
//! The grammar is a PEG over the token stream produced by `lex::tokenize`. Each rule is a `pom`
//! parser: given the token slice and a start position it either returns the node it built along
//! with the position after the last token it consumed, or fails without consuming anything. That
//! makes it safe to try alternatives in order.
//!
//! Developer notes:
//!
//! * Rules are listed from the tightest binding (literals) to the loosest (statements). Lower
//!   precedence rules are built out of higher precedence ones, which is how `+` ends up binding
//!   after function calls and unary operators.
//!
//! * The first failing statement ends the parse. There is no error recovery: the whole program
//!   becomes a single `Node::SyntaxError`.

use log::debug;
use pom::parser::{any, call, list, sym, Parser};

use crate::lang::ast::{Identifier, Node};
use crate::lang::lex::{tokenize, Token};

fn literal<'a>() -> Parser<'a, Token, Node> {
    any().convert(|token: Token| match token {
        Token::Int(i) => Ok(Node::IntLiteral(i)),
        Token::Bool(b) => Ok(Node::BoolLiteral(b)),
        Token::Null => Ok(Node::NullLiteral),
        t => Err(t),
    })
}

fn ident<'a>() -> Parser<'a, Token, Identifier> {
    any().convert(|token: Token| match token {
        Token::Ident(name) => Ok(Identifier(name)),
        t => Err(t),
    })
}

/// `else` is not reserved, it only means something right after an `if` body
fn else_keyword<'a>() -> Parser<'a, Token, ()> {
    ident()
        .convert(|ident| if ident.0 == "else" { Ok(()) } else { Err(ident) })
}

fn value<'a>() -> Parser<'a, Token, Node> {
    ident().map(Node::Variable) | literal()
}

fn paren_expr<'a>() -> Parser<'a, Token, Node> {
    (sym(Token::LParen) * call(expr) - sym(Token::RParen)) | value()
}

fn function_call<'a>() -> Parser<'a, Token, Node> {
    let arg_list = list(call(expr), sym(Token::Comma));
    let function_call = (ident() - sym(Token::LParen) + arg_list - sym(Token::RParen))
        .map(|(name, args)| Node::FuncCall(name, args));

    function_call | paren_expr()
}

fn unary_expr<'a>() -> Parser<'a, Token, Node> {
    let plus = (sym(Token::Plus) * call(unary_expr)).map(|e| Node::UnaryPlus(Box::new(e)));
    let minus = (sym(Token::Minus) * call(unary_expr)).map(|e| Node::UnaryMinus(Box::new(e)));

    plus | minus | function_call()
}

fn add_expr<'a>() -> Parser<'a, Token, Node> {
    let ops = sym(Token::Plus) | sym(Token::Minus);
    let plus_minus = unary_expr() + (ops + unary_expr()).repeat(0..);

    // NB: `+` and `-` are left-to-right associative, so fold-left
    plus_minus.map(|(lhs, rest)| {
        rest.into_iter().fold(lhs, |lhs, (op, rhs)| match op {
            Token::Minus => Node::Sub(Box::new(lhs), Box::new(rhs)),
            _ => Node::Add(Box::new(lhs), Box::new(rhs)),
        })
    })
}

/// Parse an expression
fn expr<'a>() -> Parser<'a, Token, Node> {
    add_expr()
}

fn assignment<'a>() -> Parser<'a, Token, Node> {
    (ident() - sym(Token::Equal) + expr()).map(|(name, e)| Node::Assignment(name, Box::new(e)))
}

/// `{ stmts }`
fn block<'a>() -> Parser<'a, Token, Vec<Node>> {
    sym(Token::LBrace) * call(stmts) - sym(Token::RBrace)
}

fn if_else_stmt<'a>() -> Parser<'a, Token, Node> {
    let if_stmt = sym(Token::If) * sym(Token::LParen) * call(expr) - sym(Token::RParen) + block();
    let else_stmt = else_keyword() * block();

    (if_stmt + else_stmt.opt())
        .map(|((cond, true_body), false_body)| Node::If(Box::new(cond), true_body, false_body))
}

fn func_def<'a>() -> Parser<'a, Token, Node> {
    let params = list(ident(), sym(Token::Comma));
    let def = sym(Token::Def) * ident() - sym(Token::LParen) + params - sym(Token::RParen)
        + block();

    def.map(|((name, params), body)| Node::FuncDef(name, params, body))
}

/// Parse a statement
///
/// An expression statement is tried before an assignment: `a` on its own is a perfectly good
/// expression, and only the missing `;` sends us on to the assignment rule.
fn stmt<'a>() -> Parser<'a, Token, Node> {
    let expr_stmt = expr() - sym(Token::Semicolon);
    let assign_stmt = assignment() - sym(Token::Semicolon);

    expr_stmt | assign_stmt | if_else_stmt() | func_def()
}

fn stmts<'a>() -> Parser<'a, Token, Vec<Node>> {
    stmt().repeat(0..)
}

fn unexpected_tokens(rest: &[Token]) -> String {
    let kind = |token: Option<&Token>| token.map_or("end of input", Token::kind);

    format!(
        "Unexpected tokens `{}`, `{}`",
        kind(rest.first()),
        kind(rest.get(1))
    )
}

/// Parse a token stream into a `Node::Source`
///
/// Returns `Node::SyntaxError` if some statement can't be parsed
pub fn parse(tokens: &[Token]) -> Node {
    let stmt = stmt();
    let mut stmts = Vec::new();
    let mut pos = 0;

    while pos < tokens.len() {
        match stmt.parse_at(tokens, pos) {
            Ok((s, next)) => {
                stmts.push(s);
                pos = next;
            }
            Err(e) => {
                debug!("No statement matches at token {}: {}", pos, e);
                return Node::SyntaxError(unexpected_tokens(&tokens[pos..]));
            }
        }
    }

    Node::Source(stmts)
}

pub fn lex_and_parse(source: &str) -> Node {
    parse(&tokenize(source))
}

#[cfg(test)]
fn var(name: &str) -> Box<Node> {
    Box::new(Node::Variable(Identifier::from(name)))
}

#[cfg(test)]
fn int(i: i64) -> Box<Node> {
    Box::new(Node::IntLiteral(i))
}

#[test]
fn test_expression() {
    use pretty_assertions::assert_eq;

    let data = vec![
        ("1;", *int(1)),
        ("true;", Node::BoolLiteral(true)),
        ("false;", Node::BoolLiteral(false)),
        ("null;", Node::NullLiteral),
        ("value;", *var("value")),
        ("(1);", *int(1)),
        ("((a));", *var("a")),
        ("1+2;", Node::Add(int(1), int(2))),
        ("1-2;", Node::Sub(int(1), int(2))),
        (
            "1+2-3;",
            Node::Sub(Box::new(Node::Add(int(1), int(2))), int(3)),
        ),
        (
            "1+(2+3);",
            Node::Add(int(1), Box::new(Node::Add(int(2), int(3)))),
        ),
        ("-a;", Node::UnaryMinus(var("a"))),
        ("+1;", Node::UnaryPlus(int(1))),
        (
            "--1;",
            Node::UnaryMinus(Box::new(Node::UnaryMinus(int(1)))),
        ),
        ("1+-2;", Node::Add(int(1), Box::new(Node::UnaryMinus(int(2))))),
        ("f();", Node::FuncCall(Identifier::from("f"), vec![])),
        (
            "f(1, a, g(b));",
            Node::FuncCall(
                Identifier::from("f"),
                vec![
                    *int(1),
                    *var("a"),
                    Node::FuncCall(Identifier::from("g"), vec![*var("b")]),
                ],
            ),
        ),
        (
            "f(1)+2;",
            Node::Add(
                Box::new(Node::FuncCall(Identifier::from("f"), vec![*int(1)])),
                int(2),
            ),
        ),
    ];

    for (input, expected) in data {
        assert_eq!(lex_and_parse(input), Node::Source(vec![expected]));
    }
}

#[test]
fn test_statements() {
    use pretty_assertions::assert_eq;

    let data = vec![
        ("", vec![]),
        ("# only a comment", vec![]),
        ("1;2;", vec![*int(1), *int(2)]),
        (
            "a=1;",
            vec![Node::Assignment(Identifier::from("a"), int(1))],
        ),
        (
            "a = b + 1;",
            vec![Node::Assignment(
                Identifier::from("a"),
                Box::new(Node::Add(var("b"), int(1))),
            )],
        ),
        (
            "if(true){a=1;}",
            vec![Node::If(
                Box::new(Node::BoolLiteral(true)),
                vec![Node::Assignment(Identifier::from("a"), int(1))],
                None,
            )],
        ),
        (
            "if (x) { 1; } else { 2; 3; }",
            vec![Node::If(
                var("x"),
                vec![*int(1)],
                Some(vec![*int(2), *int(3)]),
            )],
        ),
        (
            "if (x) {} else {}",
            vec![Node::If(var("x"), vec![], Some(vec![]))],
        ),
        (
            "def f() {}",
            vec![Node::FuncDef(Identifier::from("f"), vec![], vec![])],
        ),
        (
            "def add(a, b) { a + b; }",
            vec![Node::FuncDef(
                Identifier::from("add"),
                vec![Identifier::from("a"), Identifier::from("b")],
                vec![Node::Add(var("a"), var("b"))],
            )],
        ),
        (
            "def f(x) { if (x) { def g() { 1; } } }",
            vec![Node::FuncDef(
                Identifier::from("f"),
                vec![Identifier::from("x")],
                vec![Node::If(
                    var("x"),
                    vec![Node::FuncDef(Identifier::from("g"), vec![], vec![*int(1)])],
                    None,
                )],
            )],
        ),
        ("else;", vec![*var("else")]),
    ];

    for (input, expected) in data {
        assert_eq!(lex_and_parse(input), Node::Source(expected));
    }
}

#[test]
fn test_syntax_error() {
    let data = vec![
        ("1", "Unexpected tokens `Int`, `end of input`"),
        ("a=1", "Unexpected tokens `Ident`, `Equal`"),
        ("1;$;", "Unexpected tokens `UnknownCharacter`, `Semicolon`"),
        ("1*2;", "Unexpected tokens `Int`, `Mul`"),
        ("\"str\";", "Unexpected tokens `StringLiteral`, `Semicolon`"),
        ("f(1,);", "Unexpected tokens `Ident`, `LParen`"),
        ("if(true){a=1;", "Unexpected tokens `If`, `LParen`"),
        ("1+;", "Unexpected tokens `Int`, `Plus`"),
        (";", "Unexpected tokens `Semicolon`, `end of input`"),
        (
            "9223372036854775808;",
            "Unexpected tokens `UnknownCharacter`, `Semicolon`",
        ),
    ];

    for (input, expected) in data {
        assert_eq!(
            lex_and_parse(input),
            Node::SyntaxError(expected.to_string())
        );
    }
}
