//! Ordering, equality and hashing of containers.
//!
//! Both walk token streams rather than materializing trees. The ordering is
//! total and stable but not a deep lexicographic one: containers of the same
//! type are ordered by child count before their contents are looked at,
//! which is all an index needs.

use std::cmp::Ordering;

use crate::container::Container;
use crate::dict::KeyDictionary;
use crate::error::{Error, Result};
use crate::iterator::Iter;
use crate::token::Token;
use crate::value::Value;

const HASH_NULL: u32 = 0x01;
const HASH_TRUE: u32 = 0x02;
const HASH_FALSE: u32 = 0x04;
const HASH_OBJECT: u32 = 0x01;
const HASH_ARRAY: u32 = 0x02;

/// Type rank used when two values at the same position differ in type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Null,
    String,
    Numeric,
    Bool,
    Array,
    Object,
}

fn value_rank(v: &Value) -> Result<Rank> {
    Ok(match v {
        Value::Null => Rank::Null,
        Value::String(_) => Rank::String,
        Value::Numeric(_) => Rank::Numeric,
        Value::Bool(_) => Rank::Bool,
        Value::Array { .. } => Rank::Array,
        Value::Object(_) => Rank::Object,
        Value::Binary(_) => return Err(Error::malformed("unexpanded container in comparison")),
    })
}

fn token_rank(t: &Token) -> Result<Rank> {
    match t {
        Token::BeginArray { .. } => Ok(Rank::Array),
        Token::BeginObject { .. } => Ok(Rank::Object),
        Token::Value(v) | Token::Elem(v) => value_rank(v),
        other => Err(Error::malformed(format!(
            "token streams out of step at {:?}",
            other.kind()
        ))),
    }
}

/// Strings order by length first, then bytewise.
fn compare_strings(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

fn compare_scalars(a: &Value, b: &Value) -> Result<Ordering> {
    Ok(match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::String(x), Value::String(y)) => compare_strings(x, y),
        (Value::Numeric(x), Value::Numeric(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => value_rank(a)?.cmp(&value_rank(b)?),
    })
}

/// Three-way comparison of two containers.
///
/// Type ranks are `null < string < number < boolean < array < object`.
/// Arrays compare by element count, then a scalar wrapper sorts before a
/// real array; objects compare by pair count. Only when those tie are the
/// children compared, in order.
pub fn compare(a: &Container, b: &Container, dict: &KeyDictionary) -> Result<Ordering> {
    let mut ia = Iter::new(a, dict)?;
    let mut ib = Iter::new(b, dict)?;

    loop {
        let ta = ia.next_token(false)?;
        let tb = ib.next_token(false)?;

        let ord = match (&ta, &tb) {
            (Token::Done, Token::Done) => return Ok(Ordering::Equal),
            (Token::EndArray, Token::EndArray) | (Token::EndObject, Token::EndObject) => {
                Ordering::Equal
            }
            (
                Token::BeginArray {
                    count: ca,
                    raw_scalar: ra,
                },
                Token::BeginArray {
                    count: cb,
                    raw_scalar: rb,
                },
            ) => ca.cmp(cb).then_with(|| rb.cmp(ra)),
            (Token::BeginObject { count: ca }, Token::BeginObject { count: cb }) => ca.cmp(cb),
            (Token::Key(x), Token::Key(y)) => compare_strings(x, y),
            (Token::Value(x), Token::Value(y)) | (Token::Elem(x), Token::Elem(y)) => {
                compare_scalars(x, y)?
            }
            _ => token_rank(&ta)?.cmp(&token_rank(&tb)?),
        };

        if ord != Ordering::Equal {
            return Ok(ord);
        }
    }
}

pub fn eq(a: &Container, b: &Container, dict: &KeyDictionary) -> Result<bool> {
    Ok(compare(a, b, dict)? == Ordering::Equal)
}

pub fn ne(a: &Container, b: &Container, dict: &KeyDictionary) -> Result<bool> {
    Ok(compare(a, b, dict)? != Ordering::Equal)
}

pub fn lt(a: &Container, b: &Container, dict: &KeyDictionary) -> Result<bool> {
    Ok(compare(a, b, dict)? == Ordering::Less)
}

pub fn gt(a: &Container, b: &Container, dict: &KeyDictionary) -> Result<bool> {
    Ok(compare(a, b, dict)? == Ordering::Greater)
}

pub fn le(a: &Container, b: &Container, dict: &KeyDictionary) -> Result<bool> {
    Ok(compare(a, b, dict)? != Ordering::Greater)
}

pub fn ge(a: &Container, b: &Container, dict: &KeyDictionary) -> Result<bool> {
    Ok(compare(a, b, dict)? != Ordering::Less)
}

fn hash_str(s: &str) -> u32 {
    xxhash_rust::xxh32::xxh32(s.as_bytes(), 0)
}

fn hash_scalar(v: &Value) -> Result<u32> {
    Ok(match v {
        Value::Null => HASH_NULL,
        Value::Bool(true) => HASH_TRUE,
        Value::Bool(false) => HASH_FALSE,
        Value::String(s) => hash_str(s),
        Value::Numeric(n) => n.hash_value(),
        _ => return Err(Error::malformed("hashing a non-scalar value")),
    })
}

fn mix(acc: u32, h: u32) -> u32 {
    acc.rotate_left(1) ^ h
}

/// Order-sensitive hash of a container.
///
/// Containers that compare equal hash equal: keys are always written sorted,
/// so equal values always produce the same token stream. Numerics hash by
/// value. An empty root hashes to 0.
pub fn hash(c: &Container, dict: &KeyDictionary) -> Result<u32> {
    if c.root_count() == 0 {
        return Ok(0);
    }

    let mut acc: u32 = 0;
    for token in Iter::new(c, dict)? {
        match token? {
            Token::BeginArray { .. } => acc ^= HASH_ARRAY,
            Token::BeginObject { .. } => acc ^= HASH_OBJECT,
            Token::Key(name) => acc = mix(acc, hash_str(&name)),
            Token::Value(v) | Token::Elem(v) => acc = mix(acc, hash_scalar(&v)?),
            Token::EndArray | Token::EndObject | Token::Done => {}
        }
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::value::Pair;

    fn obj(dict: &KeyDictionary, pairs: &[(&str, Value)]) -> Container {
        let pairs = pairs
            .iter()
            .map(|(k, v)| Pair::new(dict.id_for(k).unwrap(), v.clone()))
            .collect();
        encode(&Value::object(pairs)).unwrap()
    }

    fn arr(elems: Vec<Value>) -> Container {
        encode(&Value::array(elems)).unwrap()
    }

    /// `depth` nested arrays with an empty one at the bottom, written
    /// byte by byte since the encoder refuses to go this deep.
    fn nested_arrays(depth: usize) -> Container {
        let mut bytes = vec![2u8];
        for _ in 1..depth {
            let mut outer = Vec::new();
            crate::varbyte::encode(6, &mut outer);
            crate::varbyte::encode(((bytes.len() as u32) << 3) | 7, &mut outer);
            outer.extend_from_slice(&bytes);
            bytes = outer;
        }
        Container::from_bytes(bytes).unwrap()
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let dict = KeyDictionary::in_memory();
        let deep = nested_arrays(300);
        assert!(matches!(
            compare(&deep, &deep, &dict),
            Err(Error::RecursionLimitExceeded(_))
        ));
        assert!(matches!(
            hash(&deep, &dict),
            Err(Error::RecursionLimitExceeded(_))
        ));
        assert!(matches!(
            crate::text::to_text(&deep, &dict),
            Err(Error::RecursionLimitExceeded(_))
        ));

        let shallow = nested_arrays(100);
        assert_eq!(compare(&shallow, &shallow, &dict).unwrap(), Ordering::Equal);
        assert_eq!(compare(&shallow, &deep, &dict).unwrap(), Ordering::Less);
    }

    #[test]
    fn fewer_pairs_sort_first() {
        let dict = KeyDictionary::in_memory();
        let a = obj(&dict, &[("a", 1.into())]);
        let b = obj(&dict, &[("a", 1.into()), ("b", 2.into())]);
        assert_eq!(compare(&a, &b, &dict).unwrap(), Ordering::Less);
        assert!(lt(&a, &b, &dict).unwrap());
        assert!(ge(&b, &a, &dict).unwrap());
    }

    #[test]
    fn type_rank_order() {
        let dict = KeyDictionary::in_memory();
        let ladder = [
            arr(vec![Value::Null]),
            arr(vec!["a".into()]),
            arr(vec![1.into()]),
            arr(vec![false.into()]),
            arr(vec![Value::array(vec![])]),
            arr(vec![Value::object(vec![])]),
        ];
        for pair in ladder.windows(2) {
            assert_eq!(
                compare(&pair[0], &pair[1], &dict).unwrap(),
                Ordering::Less,
                "{:?} < {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn strings_compare_length_first() {
        let dict = KeyDictionary::in_memory();
        let short = arr(vec!["zz".into()]);
        let long = arr(vec!["aaa".into()]);
        assert_eq!(compare(&short, &long, &dict).unwrap(), Ordering::Less);
        let a = arr(vec!["ab".into()]);
        assert_eq!(compare(&a, &short, &dict).unwrap(), Ordering::Less);
    }

    #[test]
    fn numerics_compare_by_value() {
        let dict = KeyDictionary::in_memory();
        let small = arr(vec![Value::Numeric("9".parse().unwrap())]);
        let big = arr(vec![Value::Numeric("10.5".parse().unwrap())]);
        assert_eq!(compare(&small, &big, &dict).unwrap(), Ordering::Less);

        let one = arr(vec![Value::Numeric("1".parse().unwrap())]);
        let one_point_oh = arr(vec![Value::Numeric("1.00".parse().unwrap())]);
        assert!(eq(&one, &one_point_oh, &dict).unwrap());
        assert_eq!(hash(&one, &dict).unwrap(), hash(&one_point_oh, &dict).unwrap());
    }

    #[test]
    fn element_count_before_contents() {
        let dict = KeyDictionary::in_memory();
        let a = arr(vec!["zzz".into()]);
        let b = arr(vec![Value::Null, Value::Null]);
        assert_eq!(compare(&a, &b, &dict).unwrap(), Ordering::Less);
    }

    #[test]
    fn scalar_wrapper_against_arrays() {
        let dict = KeyDictionary::in_memory();
        let scalar = encode(&Value::Null).unwrap();
        let one = arr(vec![Value::Null]);
        let empty = arr(vec![]);
        assert_eq!(compare(&scalar, &one, &dict).unwrap(), Ordering::Less);
        assert_eq!(compare(&scalar, &empty, &dict).unwrap(), Ordering::Greater);
    }

    #[test]
    fn equal_objects_equal_hash() {
        let dict = KeyDictionary::in_memory();
        let a = obj(&dict, &[("x", true.into()), ("y", "s".into())]);
        let b = obj(&dict, &[("y", "s".into()), ("x", true.into())]);
        assert!(eq(&a, &b, &dict).unwrap());
        assert!(!ne(&a, &b, &dict).unwrap());
        assert!(le(&a, &b, &dict).unwrap());
        assert!(!gt(&a, &b, &dict).unwrap());
        assert_eq!(hash(&a, &dict).unwrap(), hash(&b, &dict).unwrap());
    }

    #[test]
    fn hash_values() {
        let dict = KeyDictionary::in_memory();
        assert_eq!(hash(&arr(vec![]), &dict).unwrap(), 0);
        assert_eq!(hash(&encode(&Value::object(vec![])).unwrap(), &dict).unwrap(), 0);
        // BeginArray xors 2, then null rotates 2 to 4 and xors 1.
        assert_eq!(hash(&arr(vec![Value::Null]), &dict).unwrap(), 5);
        assert_ne!(
            hash(&arr(vec![true.into(), false.into()]), &dict).unwrap(),
            hash(&arr(vec![false.into(), true.into()]), &dict).unwrap()
        );
    }
}
