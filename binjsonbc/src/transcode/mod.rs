//! Transcoding between containers and other data formats.
//!
//! Every foreign format is read by describing its tree as [`Node`]s, which
//! [`build`] turns into builder tokens. Writing goes the other way through
//! [`libjsonbc::assemble`], with one sink per format.

pub mod cbor;
pub mod toml;
pub mod yaml;

use anyhow::{anyhow, bail, Context, Result};
use bigdecimal::BigDecimal;
use libjsonbc::{encode, Builder, Container, KeyDictionary, Numeric, Token, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::str::FromStr;

/// One level of a foreign document.
pub enum Node<T> {
    Scalar(Value),
    Array(Vec<T>),
    Object(Vec<(String, T)>),
}

/// A foreign document tree that can be walked one level at a time.
pub trait Foreign: Sized {
    fn node(&self) -> Result<Node<Self>>;
}

/// Encode a foreign document, assigning key ids through `dict`.
pub fn build<T: Foreign>(root: T, dict: &KeyDictionary) -> Result<Container> {
    let mut builder = Builder::new(dict);
    let tree = match root.node()? {
        Node::Scalar(value) => {
            builder.push(Token::BeginArray {
                count: 1,
                raw_scalar: true,
            })?;
            builder.push(Token::Elem(value))?;
            builder.push(Token::EndArray)?
        }
        node => feed(node, &mut builder)?,
    };
    let tree = tree.context("document did not close")?;
    Ok(encode(&tree)?)
}

fn feed<T: Foreign>(node: Node<T>, builder: &mut Builder) -> Result<Option<Value>> {
    match node {
        Node::Array(elems) => {
            builder.push(Token::BeginArray {
                count: elems.len() as u32,
                raw_scalar: false,
            })?;
            for elem in elems {
                match elem.node()? {
                    Node::Scalar(value) => {
                        builder.push(Token::Elem(value))?;
                    }
                    nested => {
                        feed(nested, builder)?;
                    }
                }
            }
            Ok(builder.push(Token::EndArray)?)
        }
        Node::Object(members) => {
            builder.push(Token::BeginObject {
                count: members.len() as u32,
            })?;
            for (key, member) in members {
                builder.push(Token::key(&key))?;
                match member.node()? {
                    Node::Scalar(value) => {
                        builder.push(Token::Value(value))?;
                    }
                    nested => {
                        feed(nested, builder)?;
                    }
                }
            }
            Ok(builder.push(Token::EndObject)?)
        }
        Node::Scalar(_) => bail!("expected an array or object"),
    }
}

/// A numeric from a binary float. NaN and the infinities have no numeric
/// form and are refused.
pub fn float(f: f64) -> Result<Value> {
    if !f.is_finite() {
        bail!("{} cannot be represented as a number", f);
    }
    Ok(Value::Numeric(Numeric::from_str(&f.to_string())?))
}

/// The value of `n` as an integer, if it has no fractional part.
pub fn integer(n: &Numeric) -> Option<BigInt> {
    let d: &BigDecimal = n.as_decimal();
    if !d.is_integer() {
        return None;
    }
    let (digits, _) = d.with_scale(0).into_bigint_and_exponent();
    Some(digits)
}

/// The nearest binary float to `n`.
pub fn to_f64(n: &Numeric) -> Result<f64> {
    n.as_decimal()
        .to_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| anyhow!("{} is out of range for a float", n))
}
