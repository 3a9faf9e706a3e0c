use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Result;
use rustyline::{Completer, Helper, Highlighter, Hinter};

use sprig::lang::lex::{tokenize, Token};

/// Line editor helper for the sprig REPL
///
/// Only the `Validator` part does anything: input keeps going onto the next line after a trailing
/// `\`, or while a `{` is still open.
#[derive(Completer, Helper, Highlighter, Hinter)]
pub struct ReplHelper {}

impl ReplHelper {
    pub fn new() -> Self {
        ReplHelper {}
    }
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> Result<ValidationResult> {
        let input = ctx.input();
        if input.ends_with('\\') || open_braces(input) > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Number of `{` not yet closed, ignoring comments and string literals
fn open_braces(input: &str) -> i64 {
    tokenize(input).iter().fold(0, |depth, token| match token {
        Token::LBrace => depth + 1,
        Token::RBrace => depth - 1,
        _ => depth,
    })
}

/// Fixup input so the parser is happy
///
/// Currently does two things:
/// * Remove the multiline escape created by `ReplHelper`
/// * Appends a `;` to expression lines so the parser recognizes them as a statement. Input whose
///   last token is a `;` or a `}` (closing `if` or `def`) is left alone, as is input with no
///   tokens at all.
pub fn fixup_input(input: &str) -> String {
    let mut ret = input.replace("\\\n", " ");
    match tokenize(&ret).last() {
        None | Some(Token::Semicolon) | Some(Token::RBrace) => (),
        // A trailing comment would swallow the `;`
        Some(_) if ret.contains('#') => ret += "\n;",
        Some(_) => ret += ";",
    }

    ret
}

#[test]
fn test_fixup_input() {
    assert_eq!(fixup_input("a + \\\n1"), "a +  1;");
    assert_eq!(fixup_input("a \\ \n1"), "a \\ \n1;");
    assert_eq!(fixup_input("a \\ \n1;"), "a \\ \n1;");
    assert_eq!(fixup_input("x = 1"), "x = 1;");
    assert_eq!(fixup_input("x = 1;"), "x = 1;");
    assert_eq!(fixup_input("f(1) ;  "), "f(1) ;  ");
    assert_eq!(fixup_input("def f() { 1; }"), "def f() { 1; }");
    assert_eq!(fixup_input("if (x) {} else {}  "), "if (x) {} else {}  ");
    assert_eq!(fixup_input(""), "");
    assert_eq!(fixup_input("   "), "   ");
    assert_eq!(fixup_input("# just a note"), "# just a note");
    assert_eq!(fixup_input("1; # done"), "1; # done");
    assert_eq!(fixup_input("a = 1 # set a"), "a = 1 # set a\n;");
}

#[test]
fn test_fixup_input_parses() {
    use sprig::lang::ast::{Identifier, Node};
    use sprig::lang::parse::lex_and_parse;

    let tests = vec![
        "a = 1",
        "a = 1 # set a",
        "a = 1; # set a",
        "a = \\\n1",
    ];

    for input in tests {
        assert_eq!(
            lex_and_parse(&fixup_input(input)),
            Node::Source(vec![Node::Assignment(
                Identifier::from("a"),
                Box::new(Node::IntLiteral(1))
            )]),
            "{}",
            input
        );
    }
}

#[test]
fn test_open_braces() {
    let tests = vec![
        ("1;", 0),
        ("def f() {", 1),
        ("def f() { if (x) {", 2),
        ("def f() { if (x) { 1; } }", 0),
        ("x; # {", 0),
        ("}", -1),
    ];

    for (input, expected) in tests {
        assert_eq!(open_braces(input), expected, "{}", input);
    }
}
