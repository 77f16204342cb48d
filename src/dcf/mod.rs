//! Tokenizer and parser for Debian Control File (DCF) text: the stanza
//! format `PACKAGES` and `DESCRIPTION` files are both written in.
//!
//! Parsing happens in two layers: [`lexer::Lexer`] turns bytes into a flat
//! token stream, and [`parser::Parser`] turns that stream into a flat AST
//! ([`parser::Node`]). Neither layer builds a `Repository` directly — that's
//! [`crate::Repository::read`]'s job, walking the `Vec<Node>` produced here.

mod lexer;
mod parser;
mod token;

pub use parser::{Node, Parser};
pub use token::{Span, Token, TokenTag};
