//! In-memory value tree.

use std::fmt;

use crate::builder::Builder;
use crate::container::Container;
use crate::dict::KeyDictionary;
use crate::error::Result;
use crate::iterator::Iter;
use crate::numeric::Numeric;

/// A jsonbc value.
///
/// Trees are transient: they are built from tokens, encoded into a
/// [`Container`], or produced by fully decoding one.
#[derive(Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// UTF-8 string.
    String(String),
    /// Arbitrary-precision decimal.
    Numeric(Numeric),
    /// Boolean value.
    Bool(bool),
    /// Ordered elements. `raw_scalar` marks the one-element wrapper that
    /// stands in for a bare scalar at the root.
    Array { elems: Vec<Value>, raw_scalar: bool },
    /// Key/value pairs, keyed by dictionary id.
    Object(Vec<Pair>),
    /// An encoded nested container that has not been expanded.
    ///
    /// Only decoding produces this; the builder accepts it as an opaque
    /// element but never creates one.
    Binary(Container),
}

/// One member of an object.
///
/// `order` is the position the key was seen in while building, used to let
/// the last duplicate win. It does not take part in equality.
#[derive(Clone)]
pub struct Pair {
    pub key: i32,
    pub value: Value,
    pub order: u32,
}

impl Pair {
    pub fn new(key: i32, value: impl Into<Value>) -> Self {
        Pair {
            key,
            value: value.into(),
            order: 0,
        }
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {:?}", self.key, self.value)
    }
}

/// Sort pairs by key id and drop duplicates, keeping the pair with the
/// highest insertion order for each key.
pub(crate) fn uniqueify(pairs: &mut Vec<Pair>) {
    if pairs.len() < 2 {
        return;
    }
    pairs.sort_by(|a, b| a.key.cmp(&b.key).then(b.order.cmp(&a.order)));
    pairs.dedup_by_key(|p| p.key);
}

impl Value {
    /// A plain (non-wrapper) array.
    pub fn array(elems: Vec<Value>) -> Self {
        Value::Array {
            elems,
            raw_scalar: false,
        }
    }

    /// An object from pairs, sorted by key with duplicates resolved.
    pub fn object(mut pairs: Vec<Pair>) -> Self {
        uniqueify(&mut pairs);
        Value::Object(pairs)
    }

    /// Fully decode `container` back into a tree.
    ///
    /// A root scalar wrapper comes back as the bare scalar.
    pub fn from_container(container: &Container, dict: &KeyDictionary) -> Result<Value> {
        let mut iter = Iter::new(container, dict)?;
        let mut builder = Builder::new(dict);
        let mut result = Value::Null;
        for token in &mut iter {
            if let Some(v) = builder.push(token?)? {
                result = v;
            }
        }
        Ok(result.unwrap_scalar())
    }

    /// Replace a raw scalar wrapper by its element.
    pub fn unwrap_scalar(self) -> Value {
        match self {
            Value::Array {
                mut elems,
                raw_scalar: true,
            } if elems.len() == 1 => elems.swap_remove(0),
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` for null, string, numeric and boolean values.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::String(_) | Value::Numeric(_) | Value::Bool(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_numeric(&self) -> Option<&Numeric> {
        match self {
            Value::Numeric(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array { elems, .. } => Some(elems),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[Pair]> {
        match self {
            Value::Object(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Container> {
        match self {
            Value::Binary(c) => Some(c),
            _ => None,
        }
    }

    /// Look up a member of an object by key id.
    ///
    /// Assumes the pairs are sorted, which holds for anything built by the
    /// builder, [`Value::object`] or decoding.
    pub fn get(&self, key: i32) -> Option<&Value> {
        let pairs = self.as_object()?;
        pairs
            .binary_search_by_key(&key, |p| p.key)
            .ok()
            .map(|i| &pairs[i].value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Numeric(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Array {
                elems,
                raw_scalar: true,
            } => {
                write!(f, "raw")?;
                f.debug_list().entries(elems).finish()
            }
            Value::Array { elems, .. } => f.debug_list().entries(elems).finish(),
            Value::Object(pairs) => f
                .debug_map()
                .entries(pairs.iter().map(|p| (p.key, &p.value)))
                .finish(),
            Value::Binary(c) => {
                write!(f, "<")?;
                for byte in c.as_bytes() {
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, ">")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Numeric(Numeric::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Numeric(Numeric::from(i64::from(n)))
    }
}

impl From<Numeric> for Value {
    fn from(n: Numeric) -> Self {
        Value::Numeric(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(elems: Vec<Value>) -> Self {
        Value::array(elems)
    }
}

impl From<Vec<Pair>> for Value {
    fn from(pairs: Vec<Pair>) -> Self {
        Value::object(pairs)
    }
}

impl From<Container> for Value {
    fn from(c: Container) -> Self {
        Value::Binary(c)
    }
}
