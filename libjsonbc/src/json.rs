//! JSON input and output.
//!
//! JSON text is parsed by `serde_json` (with exact number text preserved)
//! and fed to the [`Builder`] as a token stream. Going the other way, a
//! container's token stream is assembled into a `serde_json::Value`.

use serde_json::{Map, Number, Value as Json};
use std::str::FromStr;
use std::sync::Arc;

use crate::builder::Builder;
use crate::container::Container;
use crate::dict::KeyDictionary;
use crate::encode::encode;
use crate::error::{Error, Result};
use crate::iterator::{assemble, Assemble};
use crate::numeric::Numeric;
use crate::token::Token;
use crate::value::Value;

/// Parse JSON text and encode it.
///
/// ```
/// use libjsonbc::{json, text, KeyDictionary};
///
/// let dict = KeyDictionary::in_memory();
/// let c = json::parse(r#"{"b": [1, 2], "a": null}"#, &dict).unwrap();
/// assert_eq!(text::to_text(&c, &dict).unwrap(), r#"{"a": null, "b": [1, 2]}"#);
/// ```
pub fn parse(input: &str, dict: &KeyDictionary) -> Result<Container> {
    let json: Json =
        serde_json::from_str(input).map_err(|e| Error::malformed(format!("invalid JSON: {}", e)))?;
    from_json(&json, dict)
}

/// Encode a parsed JSON document.
pub fn from_json(json: &Json, dict: &KeyDictionary) -> Result<Container> {
    encode(&build(json, dict)?)
}

/// Build a value tree from a parsed JSON document.
pub fn build(json: &Json, dict: &KeyDictionary) -> Result<Value> {
    let mut builder = Builder::new(dict);
    let root = match json {
        Json::Array(_) | Json::Object(_) => feed(json, &mut builder)?,
        scalar => {
            builder.push(Token::BeginArray {
                count: 1,
                raw_scalar: true,
            })?;
            builder.push(Token::Elem(scalar_value(scalar)?))?;
            builder.push(Token::EndArray)?
        }
    };
    root.ok_or_else(|| Error::malformed("JSON document did not close"))
}

/// Push the tokens for a JSON array or object. Returns the finished tree if
/// this closed the root.
fn feed(json: &Json, builder: &mut Builder) -> Result<Option<Value>> {
    match json {
        Json::Array(elems) => {
            builder.push(Token::BeginArray {
                count: elems.len() as u32,
                raw_scalar: false,
            })?;
            for elem in elems {
                match elem {
                    Json::Array(_) | Json::Object(_) => {
                        feed(elem, builder)?;
                    }
                    scalar => {
                        builder.push(Token::Elem(scalar_value(scalar)?))?;
                    }
                }
            }
            builder.push(Token::EndArray)
        }
        Json::Object(members) => {
            builder.push(Token::BeginObject {
                count: members.len() as u32,
            })?;
            for (key, value) in members {
                builder.push(Token::key(key))?;
                match value {
                    Json::Array(_) | Json::Object(_) => {
                        feed(value, builder)?;
                    }
                    scalar => {
                        builder.push(Token::Value(scalar_value(scalar)?))?;
                    }
                }
            }
            builder.push(Token::EndObject)
        }
        _ => Err(Error::malformed("expected a JSON array or object")),
    }
}

fn scalar_value(json: &Json) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::String(s) => Value::String(s.clone()),
        Json::Number(n) => Value::Numeric(Numeric::from_str(&n.to_string())?),
        _ => return Err(Error::malformed("expected a JSON scalar")),
    })
}

/// Decode a container into a JSON document.
pub fn to_json(container: &Container, dict: &KeyDictionary) -> Result<Json> {
    assemble(container, dict, &mut JsonSink)
}

struct JsonSink;

impl Assemble for JsonSink {
    type Output = Json;
    type Error = Error;

    fn scalar(&mut self, value: Value) -> Result<Json> {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(b),
            Value::String(s) => Json::String(s),
            Value::Numeric(n) => {
                let number = Number::from_str(&n.to_string())
                    .map_err(|e| Error::malformed(format!("numeric {} is not JSON: {}", n, e)))?;
                Json::Number(number)
            }
            other => {
                return Err(Error::malformed(format!(
                    "cannot convert {:?} to a JSON scalar",
                    other
                )))
            }
        })
    }

    fn array(&mut self, elems: Vec<Json>) -> Result<Json> {
        Ok(Json::Array(elems))
    }

    fn object(&mut self, members: Vec<(Arc<str>, Json)>) -> Result<Json> {
        let mut map = Map::new();
        for (k, v) in members {
            map.insert(k.to_string(), v);
        }
        Ok(Json::Object(map))
    }
}
