//! TOML transcoding: convert between containers and TOML text.
//!
//! Mapping from TOML to jsonbc:
//!   - TOML string         -> string
//!   - TOML integer        -> numeric
//!   - TOML float          -> numeric (nan and inf error)
//!   - TOML boolean        -> boolean
//!   - TOML array          -> array
//!   - TOML table          -> object
//!   - TOML datetime       -> string (RFC 3339 representation)
//!
//! Mapping from jsonbc to TOML:
//!   - null                -> error (TOML has no null)
//!   - integer numeric     -> TOML integer (if it fits in i64, otherwise error)
//!   - other numerics      -> TOML float (nearest f64)
//!   - object              -> TOML table (inline below the top level)
//!
//! TOML requires the top-level value to be a table, so only object
//! containers can be written.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use libjsonbc::{assemble, Assemble, Container, KeyDictionary, Numeric, Value};
use num_traits::ToPrimitive;
use toml_edit::{Array, DocumentMut, Formatted, InlineTable, Item, Table, Value as Toml};

use super::{build, float, integer, to_f64, Foreign, Node};

/// Decode a TOML string and encode it.
pub fn decode(input: &str, dict: &KeyDictionary) -> Result<Container> {
    let doc: DocumentMut = input.parse().context("TOML parse error")?;
    build(TomlNode::Table(doc.as_table()), dict)
}

/// Render an object container as a TOML document.
pub fn encode(container: &Container, dict: &KeyDictionary) -> Result<String> {
    if !container.is_object() {
        bail!("TOML requires the top-level value to be a table/object");
    }
    let root = match assemble(container, dict, &mut TomlSink)? {
        Toml::InlineTable(table) => table,
        _ => bail!("expected a table at the top level"),
    };
    let mut doc = DocumentMut::new();
    for (key, value) in root.into_iter() {
        let item = match value {
            Toml::InlineTable(table) => Item::Table(table.into_table()),
            other => Item::Value(other),
        };
        doc.insert(&key, item);
    }
    Ok(doc.to_string())
}

/// The places a TOML value can sit in a parsed document.
#[derive(Clone, Copy)]
enum TomlNode<'a> {
    Item(&'a Item),
    Value(&'a Toml),
    Table(&'a Table),
    InlineTable(&'a InlineTable),
}

impl Foreign for TomlNode<'_> {
    fn node(&self) -> Result<Node<Self>> {
        Ok(match *self {
            TomlNode::Item(Item::None) => Node::Scalar(Value::Null),
            TomlNode::Item(Item::Value(v)) => TomlNode::Value(v).node()?,
            TomlNode::Item(Item::Table(t)) => TomlNode::Table(t).node()?,
            TomlNode::Item(Item::ArrayOfTables(arr)) => {
                Node::Array(arr.iter().map(TomlNode::Table).collect())
            }
            TomlNode::Table(t) => Node::Object(
                t.iter()
                    .map(|(k, item)| (k.to_string(), TomlNode::Item(item)))
                    .collect(),
            ),
            TomlNode::InlineTable(t) => Node::Object(
                t.iter()
                    .map(|(k, v)| (k.to_string(), TomlNode::Value(v)))
                    .collect(),
            ),
            TomlNode::Value(v) => match v {
                Toml::String(s) => Node::Scalar(Value::String(s.value().clone())),
                Toml::Integer(i) => Node::Scalar(Value::Numeric(Numeric::from(*i.value()))),
                Toml::Float(f) => Node::Scalar(float(*f.value())?),
                Toml::Boolean(b) => Node::Scalar(Value::Bool(*b.value())),
                Toml::Datetime(dt) => Node::Scalar(Value::String(dt.value().to_string())),
                Toml::Array(arr) => Node::Array(arr.iter().map(TomlNode::Value).collect()),
                Toml::InlineTable(t) => TomlNode::InlineTable(t).node()?,
            },
        })
    }
}

struct TomlSink;

impl Assemble for TomlSink {
    type Output = Toml;
    type Error = anyhow::Error;

    fn scalar(&mut self, value: Value) -> Result<Toml> {
        Ok(match value {
            Value::Null => bail!("TOML has no null type"),
            Value::Bool(b) => Toml::Boolean(Formatted::new(b)),
            Value::String(s) => Toml::String(Formatted::new(s)),
            Value::Numeric(n) => match integer(&n) {
                Some(i) => {
                    let i = i
                        .to_i64()
                        .ok_or_else(|| anyhow!("Integer {} too large for TOML (i64)", i))?;
                    Toml::Integer(Formatted::new(i))
                }
                None => Toml::Float(Formatted::new(to_f64(&n)?)),
            },
            other => bail!("cannot convert {:?} to TOML", other),
        })
    }

    fn array(&mut self, elems: Vec<Toml>) -> Result<Toml> {
        let mut arr = Array::new();
        for elem in elems {
            arr.push(elem);
        }
        Ok(Toml::Array(arr))
    }

    fn object(&mut self, members: Vec<(Arc<str>, Toml)>) -> Result<Toml> {
        let mut table = InlineTable::new();
        for (k, v) in members {
            table.insert(&*k, v);
        }
        Ok(Toml::InlineTable(table))
    }
}
