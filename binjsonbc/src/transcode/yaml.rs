//! YAML transcoding: convert between containers and YAML text.
//!
//! Mapping from YAML to jsonbc:
//!   - YAML null          -> null
//!   - YAML bool          -> boolean
//!   - YAML integer       -> numeric
//!   - YAML float         -> numeric (shortest decimal form; .nan and .inf error)
//!   - YAML string        -> string
//!   - YAML sequence      -> array
//!   - YAML mapping       -> object (string, number, bool or null keys, as text)
//!   - YAML !!binary tag  -> error (no binary type)
//!   - other tags         -> the tagged value
//!
//! Mapping from jsonbc to YAML:
//!   - integers that fit i64 or u64 -> YAML integer
//!   - larger integers              -> YAML string of the digits
//!   - other numerics               -> YAML float (nearest f64)
//!   - everything else maps to its namesake

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use libjsonbc::{assemble, Assemble, Container, KeyDictionary, Numeric, Value};
use num_traits::ToPrimitive;
use serde_yaml::{Mapping, Number, Value as Yaml};

use super::{build, float, integer, to_f64, Foreign, Node};

/// Decode a YAML string and encode it.
pub fn decode(input: &str, dict: &KeyDictionary) -> Result<Container> {
    let yaml: Yaml = serde_yaml::from_str(input).context("YAML parse error")?;
    build(&yaml, dict)
}

/// Render a container as YAML text.
pub fn encode(container: &Container, dict: &KeyDictionary) -> Result<String> {
    let yaml = assemble(container, dict, &mut YamlSink)?;
    serde_yaml::to_string(&yaml).context("YAML encode error")
}

impl<'a> Foreign for &'a Yaml {
    fn node(&self) -> Result<Node<Self>> {
        let yaml: &'a Yaml = *self;
        Ok(match yaml {
            Yaml::Null => Node::Scalar(Value::Null),
            Yaml::Bool(b) => Node::Scalar(Value::Bool(*b)),
            Yaml::Number(n) => Node::Scalar(number(n)?),
            Yaml::String(s) => Node::Scalar(Value::String(s.clone())),
            Yaml::Sequence(seq) => Node::Array(seq.iter().collect()),
            Yaml::Mapping(map) => {
                let mut members = Vec::with_capacity(map.len());
                for (k, v) in map {
                    let key = match k {
                        Yaml::String(s) => s.clone(),
                        Yaml::Number(n) => n.to_string(),
                        Yaml::Bool(b) => b.to_string(),
                        Yaml::Null => "null".to_string(),
                        _ => bail!("Unsupported YAML mapping key type: {:?}", k),
                    };
                    members.push((key, v));
                }
                Node::Object(members)
            }
            Yaml::Tagged(tagged) => {
                // serde_yaml normalizes the leading !'s
                let tag = tagged.tag.to_string();
                if tag.trim_start_matches('!') == "binary" {
                    bail!("YAML !!binary values have no jsonbc equivalent");
                }
                (&tagged.value).node()?
            }
        })
    }
}

fn number(n: &Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        Ok(Value::Numeric(Numeric::from(i)))
    } else if let Some(u) = n.as_u64() {
        Ok(Value::Numeric(Numeric::from(u)))
    } else if let Some(f) = n.as_f64() {
        float(f)
    } else {
        bail!("Unsupported YAML number: {}", n)
    }
}

struct YamlSink;

impl Assemble for YamlSink {
    type Output = Yaml;
    type Error = anyhow::Error;

    fn scalar(&mut self, value: Value) -> Result<Yaml> {
        Ok(match value {
            Value::Null => Yaml::Null,
            Value::Bool(b) => Yaml::Bool(b),
            Value::String(s) => Yaml::String(s),
            Value::Numeric(n) => match integer(&n) {
                Some(i) => {
                    if let Some(v) = i.to_i64() {
                        Yaml::Number(Number::from(v))
                    } else if let Some(v) = i.to_u64() {
                        Yaml::Number(Number::from(v))
                    } else {
                        // YAML has no arbitrary-precision integers
                        Yaml::String(i.to_string())
                    }
                }
                None => Yaml::Number(Number::from(to_f64(&n)?)),
            },
            other => bail!("cannot convert {:?} to YAML", other),
        })
    }

    fn array(&mut self, elems: Vec<Yaml>) -> Result<Yaml> {
        Ok(Yaml::Sequence(elems))
    }

    fn object(&mut self, members: Vec<(Arc<str>, Yaml)>) -> Result<Yaml> {
        let mut map = Mapping::new();
        for (k, v) in members {
            map.insert(Yaml::String(k.to_string()), v);
        }
        Ok(Yaml::Mapping(map))
    }
}
