//! CBOR transcoding: convert between containers and CBOR binary data.
//!
//! Mapping from CBOR to jsonbc:
//!   - CBOR null                  -> null
//!   - CBOR bool                  -> boolean
//!   - CBOR unsigned/negative int -> numeric
//!   - CBOR float (16/32/64)      -> numeric (shortest decimal form)
//!   - CBOR text string           -> string
//!   - CBOR array (det/indet)     -> array
//!   - CBOR map (det/indet)       -> object (text string keys only)
//!   - CBOR byte string           -> error (no binary type)
//!   - CBOR tag                   -> error
//!   - CBOR NaN or infinity       -> error
//!
//! Mapping from jsonbc to CBOR:
//!   - integers -> CBOR integer (smallest encoding that fits)
//!   - other numerics -> CBOR float (nearest f64)
//!   - everything else maps to its namesake
//!
//! Integers outside CBOR's native range (-2^64 to 2^64-1) produce an error
//! rather than using bignum tags.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use ciborium::value::{Integer, Value as Cbor};
use libjsonbc::{assemble, Assemble, Container, KeyDictionary, Numeric, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::{build, float, integer, to_f64, Foreign, Node};

/// Decode CBOR bytes and encode them.
pub fn decode(input: &[u8], dict: &KeyDictionary) -> Result<Container> {
    let cbor: Cbor = ciborium::de::from_reader(input).context("CBOR decode error")?;
    build(&cbor, dict)
}

/// Render a container as CBOR bytes.
pub fn encode(container: &Container, dict: &KeyDictionary) -> Result<Vec<u8>> {
    let cbor = assemble(container, dict, &mut CborSink)?;
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&cbor, &mut buf).context("CBOR encode error")?;
    Ok(buf)
}

impl<'a> Foreign for &'a Cbor {
    fn node(&self) -> Result<Node<Self>> {
        let cbor: &'a Cbor = *self;
        Ok(match cbor {
            Cbor::Null => Node::Scalar(Value::Null),
            Cbor::Bool(b) => Node::Scalar(Value::Bool(*b)),
            Cbor::Integer(i) => {
                let n: i128 = (*i).into();
                Node::Scalar(Value::Numeric(Numeric::from(BigInt::from(n))))
            }
            Cbor::Float(f) => Node::Scalar(float(*f)?),
            Cbor::Text(s) => Node::Scalar(Value::String(s.clone())),
            Cbor::Array(arr) => Node::Array(arr.iter().collect()),
            Cbor::Map(pairs) => {
                let mut members = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    let key = match k {
                        Cbor::Text(s) => s.clone(),
                        _ => bail!("CBOR map key must be a text string, got: {:?}", k),
                    };
                    members.push((key, v));
                }
                Node::Object(members)
            }
            Cbor::Bytes(_) => bail!("CBOR byte strings have no jsonbc equivalent"),
            Cbor::Tag(tag, _) => bail!("CBOR tagged value (tag {}) has no jsonbc equivalent", tag),
            _ => bail!("CBOR value {:?} has no jsonbc equivalent", cbor),
        })
    }
}

struct CborSink;

impl Assemble for CborSink {
    type Output = Cbor;
    type Error = anyhow::Error;

    fn scalar(&mut self, value: Value) -> Result<Cbor> {
        Ok(match value {
            Value::Null => Cbor::Null,
            Value::Bool(b) => Cbor::Bool(b),
            Value::String(s) => Cbor::Text(s),
            Value::Numeric(n) => match integer(&n) {
                Some(i) => Cbor::Integer(cbor_integer(&i)?),
                None => Cbor::Float(to_f64(&n)?),
            },
            other => bail!("cannot convert {:?} to CBOR", other),
        })
    }

    fn array(&mut self, elems: Vec<Cbor>) -> Result<Cbor> {
        Ok(Cbor::Array(elems))
    }

    fn object(&mut self, members: Vec<(Arc<str>, Cbor)>) -> Result<Cbor> {
        Ok(Cbor::Map(
            members
                .into_iter()
                .map(|(k, v)| (Cbor::Text(k.to_string()), v))
                .collect(),
        ))
    }
}

fn cbor_integer(n: &BigInt) -> Result<Integer> {
    n.to_i128()
        .and_then(|i| Integer::try_from(i).ok())
        .ok_or_else(|| anyhow!("integer {} is outside the CBOR integer range", n))
}
