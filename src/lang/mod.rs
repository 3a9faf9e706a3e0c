pub mod ast;
pub mod environment;
pub mod eval;
pub mod functions;
pub mod lex;
pub mod parse;
pub mod runtime;
