//! Lexer for the sprig language.
//!
//! The lexer is a handful of character level PEG rules (built with `pom`) that are tried in
//! order at every position. The last rule accepts any character, so tokenizing never fails:
//! characters the language doesn't know about become `Token::UnknownCharacter` and the parser
//! gets to complain about them.
//!
//! Developer notes:
//!
//! * Rule order matters. Comments and string literals must be tried before the catch-all rule,
//!   and words are reclassified into keywords after they are scanned, not before.
//!
//! * Tokens carry no position information.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;

use lazy_static::lazy_static;
use log::{error, trace};
use pom::parser::{any, end, is_a, none_of, one_of, sym, Parser};

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// `=`
    Equal,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    If,
    Def,
    Bool(bool),
    Null,
    Int(i64),
    Ident(String),
    StringLiteral(String),
    UnknownCharacter(char),
}

impl Token {
    /// Name of the token kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Equal => "Equal",
            Token::Plus => "Plus",
            Token::Minus => "Minus",
            Token::Mul => "Mul",
            Token::Div => "Div",
            Token::LParen => "LParen",
            Token::RParen => "RParen",
            Token::LBrace => "LBrace",
            Token::RBrace => "RBrace",
            Token::Comma => "Comma",
            Token::Semicolon => "Semicolon",
            Token::If => "If",
            Token::Def => "Def",
            Token::Bool(_) => "Bool",
            Token::Null => "Null",
            Token::Int(_) => "Int",
            Token::Ident(_) => "Ident",
            Token::StringLiteral(_) => "StringLiteral",
            Token::UnknownCharacter(_) => "UnknownCharacter",
        }
    }
}

/// Prints the token back in source form
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Equal => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Mul => write!(f, "*"),
            Token::Div => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::If => write!(f, "if"),
            Token::Def => write!(f, "def"),
            Token::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Token::Null => write!(f, "null"),
            Token::Int(i) => write!(f, "{}", i),
            Token::Ident(name) => write!(f, "{}", name),
            Token::StringLiteral(s) => write!(f, "\"{}\"", escape(s)),
            Token::UnknownCharacter(c) => write!(f, "{}", c),
        }
    }
}

lazy_static! {
    static ref KEYWORDS: BTreeMap<&'static str, Token> = vec![
        ("if", Token::If),
        ("def", Token::Def),
        ("true", Token::Bool(true)),
        ("false", Token::Bool(false)),
        ("null", Token::Null),
    ]
    .into_iter()
    .collect();
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            c => escaped.push(c),
        }
    }

    escaped
}

/// Translate the character following a `\` inside a string literal
///
/// Unrecognized escapes are dropped
fn unescape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        'b' => Some('\x08'),
        't' => Some('\t'),
        'v' => Some('\x0B'),
        'r' => Some('\r'),
        '0' | '\0' => Some('\0'),
        '\\' => Some('\\'),
        '"' => Some('"'),
        '\'' => Some('\''),
        _ => None,
    }
}

fn keyword_or_ident(word: String) -> Token {
    match KEYWORDS.get(word.as_str()) {
        Some(keyword) => keyword.clone(),
        None => Token::Ident(word),
    }
}

fn punctuation<'a>() -> Parser<'a, char, Token> {
    sym('=').map(|_| Token::Equal)
        | sym('+').map(|_| Token::Plus)
        | sym('-').map(|_| Token::Minus)
        | sym('*').map(|_| Token::Mul)
        | sym('/').map(|_| Token::Div)
        | sym('(').map(|_| Token::LParen)
        | sym(')').map(|_| Token::RParen)
        | sym('{').map(|_| Token::LBrace)
        | sym('}').map(|_| Token::RBrace)
        | sym(',').map(|_| Token::Comma)
        | sym(';').map(|_| Token::Semicolon)
}

/// `#` through the end of the line. The newline itself is left for `space()`
fn comment<'a>() -> Parser<'a, char, ()> {
    (sym('#') * none_of("\n").repeat(0..)).discard()
}

/// An unterminated literal runs to the end of input
fn string<'a>() -> Parser<'a, char, Token> {
    let plain_char = none_of("\\\"").map(Some);
    let escape_sequence = (sym('\\') * any().opt()).map(|c| c.and_then(unescape));
    let string = sym('"') * (plain_char | escape_sequence).repeat(0..) - sym('"').opt();

    string.map(|chars| Token::StringLiteral(chars.into_iter().flatten().collect()))
}

fn space<'a>() -> Parser<'a, char, ()> {
    one_of(" \t\n").discard()
}

fn integer<'a>() -> Parser<'a, char, Token> {
    one_of("0123456789")
        .repeat(1..)
        .collect()
        .map(|digits: &[char]| match i64::from_str(&String::from_iter(digits)) {
            Ok(i) => Token::Int(i),
            // Doesn't fit in an i64. Swallow the whole run so the parser rejects it once
            Err(_) => Token::UnknownCharacter(digits[0]),
        })
}

fn word<'a>() -> Parser<'a, char, Token> {
    is_a(|c: char| c.is_ascii_lowercase())
        .repeat(1..)
        .collect()
        .map(String::from_iter)
        .map(keyword_or_ident)
}

fn tokens<'a>() -> Parser<'a, char, Vec<Token>> {
    // NB: `None` marks input that produces no token (comments and whitespace)
    let token = punctuation().map(Some)
        | comment().map(|_| None)
        | string().map(Some)
        | space().map(|_| None)
        | integer().map(Some)
        | word().map(Some)
        | any().map(|c| Some(Token::UnknownCharacter(c)));

    (token.repeat(0..) - end()).map(|tokens| tokens.into_iter().flatten().collect())
}

/// Split `source` into tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    let input: Vec<char> = source.chars().collect();
    let parsed = tokens().parse(&input);
    match parsed {
        Ok(tokens) => {
            trace!("tokenized {} chars into {} tokens", input.len(), tokens.len());
            tokens
        }
        Err(e) => {
            // Unreachable in practice: the catch-all rule accepts every character
            error!("Lexer stopped before end of input: {}", e);
            Vec::new()
        }
    }
}

#[test]
fn test_punctuation() {
    assert_eq!(
        tokenize("=+-*/(){},;"),
        vec![
            Token::Equal,
            Token::Plus,
            Token::Minus,
            Token::Mul,
            Token::Div,
            Token::LParen,
            Token::RParen,
            Token::LBrace,
            Token::RBrace,
            Token::Comma,
            Token::Semicolon,
        ]
    );
}

#[test]
fn test_words() {
    let data = vec![
        ("if", Token::If),
        ("def", Token::Def),
        ("true", Token::Bool(true)),
        ("false", Token::Bool(false)),
        ("null", Token::Null),
        ("iff", Token::Ident("iff".to_string())),
        ("nul", Token::Ident("nul".to_string())),
        ("value", Token::Ident("value".to_string())),
    ];

    for (input, expected) in data {
        assert_eq!(tokenize(input), vec![expected]);
    }
}

#[test]
fn test_integer() {
    let data = vec![
        ("0", vec![Token::Int(0)]),
        ("123", vec![Token::Int(123)]),
        ("007", vec![Token::Int(7)]),
        (
            "9223372036854775807",
            vec![Token::Int(9_223_372_036_854_775_807)],
        ),
        ("9223372036854775808", vec![Token::UnknownCharacter('9')]),
        ("-5", vec![Token::Minus, Token::Int(5)]),
        ("12ab", vec![Token::Int(12), Token::Ident("ab".to_string())]),
    ];

    for (input, expected) in data {
        assert_eq!(tokenize(input), expected);
    }
}

#[test]
fn test_string() {
    let data = vec![
        (r#""hello world""#, "hello world"),
        (r#""""#, ""),
        (r#""hello\nworld""#, "hello\nworld"),
        (r#""\b\t\v\r""#, "\x08\t\x0B\r"),
        (r#""\\ \" \'""#, "\\ \" '"),
        (r#""nul\0""#, "nul\0"),
        ("\"raw nul\\\0\"", "raw nul\0"),
        (r#""dropped \q escape""#, "dropped  escape"),
        (r##""# is not a comment""##, "# is not a comment"),
        (r#""❤""#, "❤"),
        (r#""unterminated"#, "unterminated"),
    ];

    for (input, expected) in data {
        assert_eq!(
            tokenize(input),
            vec![Token::StringLiteral(expected.to_string())]
        );
    }
}

#[test]
fn test_comments_and_whitespace() {
    let data = vec![
        ("# nothing here", vec![]),
        (" \t\n", vec![]),
        (
            "a # comment\nb",
            vec![Token::Ident("a".to_string()), Token::Ident("b".to_string())],
        ),
        ("1;# trailing", vec![Token::Int(1), Token::Semicolon]),
    ];

    for (input, expected) in data {
        assert_eq!(tokenize(input), expected);
    }
}

#[test]
fn test_unknown_character() {
    let data = vec![
        ("$", vec![Token::UnknownCharacter('$')]),
        ("\r", vec![Token::UnknownCharacter('\r')]),
        (
            "Abc",
            vec![Token::UnknownCharacter('A'), Token::Ident("bc".to_string())],
        ),
        (
            "a_b",
            vec![
                Token::Ident("a".to_string()),
                Token::UnknownCharacter('_'),
                Token::Ident("b".to_string()),
            ],
        ),
    ];

    for (input, expected) in data {
        assert_eq!(tokenize(input), expected);
    }
}

#[test]
fn test_program() {
    assert_eq!(
        tokenize("def f(x) { x + 1; }\nif (f(2)) { a = \"s\"; }"),
        vec![
            Token::Def,
            Token::Ident("f".to_string()),
            Token::LParen,
            Token::Ident("x".to_string()),
            Token::RParen,
            Token::LBrace,
            Token::Ident("x".to_string()),
            Token::Plus,
            Token::Int(1),
            Token::Semicolon,
            Token::RBrace,
            Token::If,
            Token::LParen,
            Token::Ident("f".to_string()),
            Token::LParen,
            Token::Int(2),
            Token::RParen,
            Token::RParen,
            Token::LBrace,
            Token::Ident("a".to_string()),
            Token::Equal,
            Token::StringLiteral("s".to_string()),
            Token::Semicolon,
            Token::RBrace,
        ]
    );
}

#[test]
fn test_display_round_trip() {
    let data = vec![
        "a = 1 + (b - 2);",
        r#"s = "quote \" and backslash \\";"#,
        "def f(x, y) { if (null) { true; } }",
    ];

    for input in data {
        let tokens = tokenize(input);
        let printed = tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(tokenize(&printed), tokens);
    }
}
