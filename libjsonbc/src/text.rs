//! Compact text rendering of containers.
//!
//! Arrays render as `[e, e]` and objects as `{"k": v, "k": v}`, with one space
//! after each `:` and `,`. A bare root scalar renders as the scalar alone.
//! Object members come out in stored order, which is ascending key id, not
//! the order the keys were first written in.

use std::sync::Arc;

use crate::container::Container;
use crate::dict::KeyDictionary;
use crate::error::{Error, Result};
use crate::iterator::{assemble, Assemble};
use crate::value::Value;

/// Render `container` as compact text.
pub fn to_text(container: &Container, dict: &KeyDictionary) -> Result<String> {
    assemble(container, dict, &mut Text)
}

struct Text;

impl Assemble for Text {
    type Output = String;
    type Error = Error;

    fn scalar(&mut self, value: Value) -> Result<String> {
        Ok(match value {
            Value::Null => "null".to_string(),
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            Value::Numeric(n) => n.to_string(),
            Value::String(s) => quote(&s),
            other => {
                return Err(Error::malformed(format!(
                    "cannot render {:?} as a scalar",
                    other
                )))
            }
        })
    }

    fn array(&mut self, elems: Vec<String>) -> Result<String> {
        Ok(format!("[{}]", elems.join(", ")))
    }

    fn object(&mut self, members: Vec<(Arc<str>, String)>) -> Result<String> {
        let members: Vec<String> = members
            .into_iter()
            .map(|(k, v)| format!("{}: {}", quote(&k), v))
            .collect();
        Ok(format!("{{{}}}", members.join(", ")))
    }
}

/// Quote a string with JSON escapes.
pub fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}
