//! jsonbc: a dictionary-compressed binary encoding for JSON documents.
//!
//! A document is encoded into a [`Container`]: a compact byte buffer in which
//! object keys are replaced by small integer ids from a [`KeyDictionary`],
//! and every integer in the layout (headers, entries, key deltas) is
//! varbyte-packed. Containers can be walked, compared, hashed and tested for
//! containment without being decoded into a tree.
//!
//! # Pipeline
//!
//! 1. **Builder**: turns a stream of [`Token`]s into a [`Value`] tree,
//!    resolving object keys to ids and keeping the last of any duplicate key.
//!
//! 2. **Encoder**: packs a [`Value`] into a [`Container`], wrapping a bare
//!    root scalar in a one-element scalar wrapper.
//!
//! 3. **Iterator**: walks a [`Container`] and yields the same [`Token`]s the
//!    builder consumes, descending into nested containers on demand.
//!
//! On top of the iterator sit [`compare`], [`hash`], [`contains`] and the
//! [`text`] and [`json`] adapters.

mod builder;
mod compare;
mod container;
mod contains;
pub mod dict;
mod encode;
pub mod entry;
mod error;
mod iterator;
pub mod json;
mod numeric;
pub mod text;
mod token;
mod value;
pub mod varbyte;

pub use builder::Builder;
pub use compare::{compare, eq, ge, gt, hash, le, lt, ne};
pub use container::Container;
pub use contains::{contained, contains, exists, exists_all, exists_any};
pub use dict::{FileStore, KeyDictionary, KeyStore, MemoryStore};
pub use encode::encode;
pub use entry::{ContainerKind, MAX_CHILDREN, MAX_ENTRY_LENGTH};
pub use error::{Error, Result};
pub use iterator::{assemble, Assemble, Iter};
pub use numeric::Numeric;
pub use token::{Token, TokenKind};
pub use value::{Pair, Value};

/// Deepest nesting the builder, encoder, iterator and containment test will
/// follow before failing with [`Error::RecursionLimitExceeded`].
pub const MAX_DEPTH: usize = 256;

/// Version byte at the front of the transport form.
pub const FORMAT_VERSION: u8 = 1;

/// Parse JSON text and encode it, assigning key ids through `dict`.
///
/// # Example
///
/// ```
/// use libjsonbc::{parse, KeyDictionary};
///
/// let dict = KeyDictionary::in_memory();
/// let c = parse(r#"{"a": 1, "b": [true, null, "x"]}"#, &dict).unwrap();
/// assert_eq!(c.root_count(), 2);
/// ```
pub fn parse(input: &str, dict: &KeyDictionary) -> Result<Container> {
    json::parse(input, dict)
}
