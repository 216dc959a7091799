//! The token stream shared by the builder and the iterator.

use std::sync::Arc;

use crate::value::Value;

/// One structural event.
///
/// The iterator produces these from a container and the builder consumes
/// them to assemble a tree, so decoding into a tree is an iterator feeding
/// a builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Start of an array. `count` is the number of elements; for the root
    /// scalar wrapper it is 1 and `raw_scalar` is set.
    BeginArray { count: u32, raw_scalar: bool },
    /// Start of an object with `count` pairs.
    BeginObject { count: u32 },
    /// An object key, by name.
    Key(Arc<str>),
    /// The value following a key.
    Value(Value),
    /// An array element.
    Elem(Value),
    EndArray,
    EndObject,
    /// The stream is exhausted.
    Done,
}

/// The discriminant of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    BeginArray,
    BeginObject,
    Key,
    Value,
    Elem,
    EndArray,
    EndObject,
    Done,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::BeginArray { .. } => TokenKind::BeginArray,
            Token::BeginObject { .. } => TokenKind::BeginObject,
            Token::Key(_) => TokenKind::Key,
            Token::Value(_) => TokenKind::Value,
            Token::Elem(_) => TokenKind::Elem,
            Token::EndArray => TokenKind::EndArray,
            Token::EndObject => TokenKind::EndObject,
            Token::Done => TokenKind::Done,
        }
    }

    /// Shorthand for a key token.
    pub fn key(name: &str) -> Token {
        Token::Key(Arc::from(name))
    }
}
