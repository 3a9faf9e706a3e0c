//! sprig: a tiny expression language.
//!
//! Source text goes through `lang::lex`, then `lang::parse`, and the resulting tree is run by
//! `lang::eval` against an immutable `lang::environment::Environment`. `lang::runtime` ties the
//! stages together for hosts.

pub mod lang;
