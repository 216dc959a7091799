//! Encode value trees into containers.
//!
//! Children are written depth first. Once every child of a level is in the
//! buffer, the level's header and entries are inserted in front of the
//! children's data, so a nested container is complete (and its length known)
//! before its parent writes the entry that describes it.

use crate::container::Container;
use crate::entry::{ContainerKind, Entry, EntryType, Header, MAX_ENTRY_LENGTH};
use crate::error::{Error, Result};
use crate::value::{Pair, Value};
use crate::varbyte;
use crate::MAX_DEPTH;

/// Encode a value into a container.
///
/// A bare scalar is wrapped in a one-element scalar wrapper. Object pairs are
/// sorted by key id and de-duplicated (last insertion wins) before writing,
/// so the tree does not have to come from the builder.
///
/// ```
/// use libjsonbc::{encode, Value};
///
/// let c = encode(&Value::from(42)).unwrap();
/// assert!(c.is_scalar());
/// assert_eq!(c.type_of().unwrap(), "number");
/// ```
pub fn encode(value: &Value) -> Result<Container> {
    let mut out = Vec::new();
    match value {
        Value::Binary(c) => return Ok(c.clone()),
        Value::Array { .. } | Value::Object(_) => encode_container(value, &mut out, 1)?,
        scalar => {
            let wrapper = Value::Array {
                elems: vec![scalar.clone()],
                raw_scalar: true,
            };
            encode_container(&wrapper, &mut out, 1)?
        }
    }
    Container::from_bytes(out)
}

fn encode_container(value: &Value, out: &mut Vec<u8>, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        tracing::debug!(depth, "Encoder nesting limit reached");
        return Err(Error::RecursionLimitExceeded(MAX_DEPTH));
    }

    let start = out.len();
    let meta = match value {
        Value::Array { elems, raw_scalar } => {
            let kind = if *raw_scalar {
                if depth != 1 {
                    return Err(Error::malformed("scalar wrapper below the root"));
                }
                if elems.len() != 1 || !elems[0].is_scalar() {
                    return Err(Error::malformed("scalar wrapper must hold exactly one scalar"));
                }
                ContainerKind::Scalar
            } else {
                ContainerKind::Array
            };
            let header = Header::new(kind, elems.len())?;

            let mut meta = Vec::with_capacity(varbyte::size(header.to_word()) + elems.len());
            varbyte::encode(header.to_word(), &mut meta);
            for elem in elems {
                let entry = encode_child(elem, out, depth)?;
                check_level_size(out, start)?;
                varbyte::encode(entry.to_word(), &mut meta);
            }
            meta
        }
        Value::Object(pairs) => {
            let pairs = sorted_pairs(pairs);
            let header = Header::new(ContainerKind::Object, pairs.len())?;

            let mut meta = Vec::with_capacity(varbyte::size(header.to_word()) + pairs.len() * 2);
            varbyte::encode(header.to_word(), &mut meta);
            let mut prev = 0;
            for pair in pairs {
                if pair.key <= prev {
                    return Err(Error::malformed(format!(
                        "object key id {} is not a positive dictionary id",
                        pair.key
                    )));
                }
                let entry = encode_child(&pair.value, out, depth)?;
                check_level_size(out, start)?;
                varbyte::encode((pair.key - prev) as u32, &mut meta);
                varbyte::encode(entry.to_word(), &mut meta);
                prev = pair.key;
            }
            meta
        }
        _ => return Err(Error::malformed("expected an array or object")),
    };

    out.splice(start..start, meta);
    Ok(())
}

/// Write one child's payload and return the entry describing it.
fn encode_child(value: &Value, out: &mut Vec<u8>, depth: usize) -> Result<Entry> {
    let before = out.len();
    let ty = match value {
        Value::Null => return Ok(Entry::empty(EntryType::Null)),
        Value::Bool(false) => return Ok(Entry::empty(EntryType::BoolFalse)),
        Value::Bool(true) => return Ok(Entry::empty(EntryType::BoolTrue)),
        Value::String(s) => {
            if s.len() > MAX_ENTRY_LENGTH {
                return Err(Error::limit("jsonbc string length", MAX_ENTRY_LENGTH));
            }
            out.extend_from_slice(s.as_bytes());
            EntryType::String
        }
        Value::Numeric(n) => match n.small_integer() {
            Some(word) => {
                varbyte::encode(word, out);
                EntryType::SmallInteger
            }
            None => {
                out.extend_from_slice(n.payload().as_bytes());
                EntryType::Numeric
            }
        },
        Value::Array {
            raw_scalar: true, ..
        } => return Err(Error::malformed("scalar wrapper below the root")),
        Value::Array { .. } | Value::Object(_) => {
            encode_container(value, out, depth + 1)?;
            EntryType::Container
        }
        Value::Binary(c) => {
            if c.is_scalar() {
                return Err(Error::malformed("scalar wrapper nested inside a container"));
            }
            out.extend_from_slice(c.as_bytes());
            EntryType::Container
        }
    };
    Entry::new(ty, out.len() - before)
}

fn check_level_size(out: &[u8], start: usize) -> Result<()> {
    if out.len() - start > MAX_ENTRY_LENGTH {
        return Err(Error::limit("total size of jsonbc container", MAX_ENTRY_LENGTH));
    }
    Ok(())
}

fn sorted_pairs(pairs: &[Pair]) -> Vec<&Pair> {
    let mut sorted: Vec<&Pair> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.key.cmp(&b.key).then(b.order.cmp(&a.order)));
    sorted.dedup_by_key(|p| p.key);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Numeric;

    #[test]
    fn test_encode_exponent_integer_as_small() {
        let plain = encode(&Value::array(vec![Value::Numeric(Numeric::from(100i64))])).unwrap();
        let exp = encode(&Value::array(vec![Value::Numeric("1e2".parse().unwrap())])).unwrap();
        assert_eq!(exp.as_bytes(), plain.as_bytes());
        assert_eq!(exp.as_bytes(), [6, (2 << 3) | 3, 200, 1]);
    }

    #[test]
    fn test_encode_bare_scalar() {
        let c = encode(&Value::from(42)).unwrap();
        assert_eq!(c.as_bytes(), [4, (1 << 3) | 3, 84]);
        assert!(c.is_scalar());
    }

    #[test]
    fn test_encode_empty_containers() {
        assert_eq!(encode(&Value::array(vec![])).unwrap().as_bytes(), [2]);
        assert_eq!(encode(&Value::object(vec![])).unwrap().as_bytes(), [1]);
    }

    #[test]
    fn test_encode_large_numeric_as_text() {
        let n: Numeric = "12345678901.5".parse().unwrap();
        let c = encode(&Value::array(vec![n.into()])).unwrap();
        let text = b"12345678901.5";
        assert_eq!(c.as_bytes()[1], ((text.len() as u8) << 3) | 2);
        assert_eq!(&c.as_bytes()[2..], text);
    }

    #[test]
    fn test_encode_nested_header_precedes_data() {
        // [[null], "a"]
        let v = Value::array(vec![Value::array(vec![Value::Null]), "a".into()]);
        let c = encode(&v).unwrap();
        assert_eq!(
            c.as_bytes(),
            [
                (2 << 2) | 2,
                (2 << 3) | 7,
                (1 << 3) | 1,
                (1 << 2) | 2,
                6,
                b'a'
            ]
        );
    }

    #[test]
    fn test_encode_deduplicates_unsorted_pairs() {
        let v = Value::Object(vec![
            Pair {
                key: 2,
                value: Value::from(1),
                order: 0,
            },
            Pair {
                key: 1,
                value: Value::Null,
                order: 1,
            },
            Pair {
                key: 2,
                value: Value::from(2),
                order: 2,
            },
        ]);
        let c = encode(&v).unwrap();
        assert_eq!(c.root_count(), 2);
        assert_eq!(c.get(2).unwrap(), Some(Value::from(2)));
    }

    #[test]
    fn test_encode_rejects_non_positive_keys() {
        let v = Value::object(vec![Pair::new(0, true)]);
        assert!(matches!(encode(&v), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_encode_rejects_nested_wrappers() {
        let wrapper = Value::Array {
            elems: vec![Value::Null],
            raw_scalar: true,
        };
        assert!(encode(&Value::array(vec![wrapper])).is_err());

        let binary = encode(&Value::Null).unwrap();
        assert!(encode(&Value::array(vec![Value::Binary(binary)])).is_err());
    }

    #[test]
    fn test_encode_copies_binary_children() {
        let inner = encode(&Value::array(vec![Value::from("x")])).unwrap();
        let outer = encode(&Value::array(vec![Value::Binary(inner.clone())])).unwrap();
        assert_eq!(outer.index(0).unwrap(), Some(Value::Binary(inner)));
    }

    #[test]
    fn test_encode_depth_limit() {
        let mut v = Value::array(vec![]);
        for _ in 1..MAX_DEPTH {
            v = Value::array(vec![v]);
        }
        assert!(encode(&v).is_ok());

        let v = Value::array(vec![v]);
        assert!(matches!(encode(&v), Err(Error::RecursionLimitExceeded(_))));
    }
}
