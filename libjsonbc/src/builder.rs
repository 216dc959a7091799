//! Token-driven tree builder.
//!
//! The builder keeps one [`ParseState`] per open container. Begin tokens push
//! a state, end tokens pop it and attach the finished value to the state
//! below (as an element, or as the value of the pending key). When the root
//! closes, [`Builder::push`] hands back the finished tree.

use crate::dict::KeyDictionary;
use crate::entry::MAX_CHILDREN;
use crate::error::{Error, Result};
use crate::token::Token;
use crate::value::{uniqueify, Pair, Value};
use crate::MAX_DEPTH;

const INITIAL_CAPACITY: usize = 4;

enum Frame {
    Array {
        elems: Vec<Value>,
        raw_scalar: bool,
    },
    Object {
        pairs: Vec<Pair>,
        pending: Option<i32>,
        next_order: u32,
    },
}

/// A container under construction.
struct ParseState {
    frame: Frame,
}

impl ParseState {
    fn array(capacity: usize, raw_scalar: bool) -> Self {
        ParseState {
            frame: Frame::Array {
                elems: Vec::with_capacity(capacity),
                raw_scalar,
            },
        }
    }

    fn object() -> Self {
        ParseState {
            frame: Frame::Object {
                pairs: Vec::with_capacity(INITIAL_CAPACITY),
                pending: None,
                next_order: 0,
            },
        }
    }

    /// Whether a nested container may be opened here right now.
    fn accepts_container(&self) -> bool {
        match &self.frame {
            Frame::Array { raw_scalar, .. } => !raw_scalar,
            Frame::Object { pending, .. } => pending.is_some(),
        }
    }

    fn attach(&mut self, value: Value) -> Result<()> {
        match &mut self.frame {
            Frame::Array { elems, raw_scalar } => {
                if *raw_scalar && !elems.is_empty() {
                    return Err(Error::malformed("scalar wrapper takes exactly one element"));
                }
                grow(elems, "number of jsonbc array elements")?;
                elems.push(value);
            }
            Frame::Object {
                pairs,
                pending,
                next_order,
            } => {
                let key = pending
                    .take()
                    .ok_or_else(|| Error::malformed("object value without a key"))?;
                grow(pairs, "number of jsonbc object pairs")?;
                pairs.push(Pair {
                    key,
                    value,
                    order: *next_order,
                });
                *next_order += 1;
            }
        }
        Ok(())
    }
}

/// Double the capacity of `v` when it is full, within the format's limit.
fn grow<T>(v: &mut Vec<T>, what: &'static str) -> Result<()> {
    let len = v.len();
    if len >= MAX_CHILDREN {
        return Err(Error::limit(what, MAX_CHILDREN));
    }
    if len == v.capacity() {
        let target = (len * 2).clamp(INITIAL_CAPACITY, MAX_CHILDREN);
        v.try_reserve_exact(target - len)
            .map_err(|_| Error::limit(what, len))?;
    }
    Ok(())
}

/// Assembles a [`Value`] from a token stream.
///
/// Object keys arrive as names and are resolved to ids through the
/// dictionary, assigning new ids as needed.
pub struct Builder<'d> {
    dict: &'d KeyDictionary,
    stack: Vec<ParseState>,
    finished: bool,
}

impl<'d> Builder<'d> {
    pub fn new(dict: &'d KeyDictionary) -> Self {
        Builder {
            dict,
            stack: Vec::new(),
            finished: false,
        }
    }

    /// Feed one token. Returns the finished tree when the root closes.
    ///
    /// `Value` and `Elem` carry scalars or [`Value::Binary`] only; nested
    /// containers are opened and closed with their own begin/end tokens.
    pub fn push(&mut self, token: Token) -> Result<Option<Value>> {
        if self.finished && token != Token::Done {
            return Err(Error::malformed("token after the end of the root value"));
        }

        match token {
            Token::BeginArray { count, raw_scalar } => {
                let capacity = if raw_scalar {
                    if !self.stack.is_empty() {
                        return Err(Error::malformed("scalar wrapper below the root"));
                    }
                    if count != 1 {
                        return Err(Error::malformed(format!(
                            "scalar wrapper declared with {} elements",
                            count
                        )));
                    }
                    count as usize
                } else {
                    INITIAL_CAPACITY
                };
                self.open(ParseState::array(capacity, raw_scalar))?;
                Ok(None)
            }
            Token::BeginObject { .. } => {
                self.open(ParseState::object())?;
                Ok(None)
            }
            Token::Key(name) => {
                match self.stack.last() {
                    Some(ParseState {
                        frame: Frame::Object { pending: None, .. },
                    }) => {}
                    _ => return Err(Error::malformed("key outside of an object")),
                }
                let id = self.dict.id_for(&name)?;
                if let Some(ParseState {
                    frame: Frame::Object { pending, .. },
                }) = self.stack.last_mut()
                {
                    *pending = Some(id);
                }
                Ok(None)
            }
            Token::Value(value) => {
                check_attachable(&value)?;
                match self.stack.last_mut() {
                    Some(state) if matches!(state.frame, Frame::Object { .. }) => {
                        state.attach(value)?
                    }
                    _ => return Err(Error::malformed("value outside of an object")),
                }
                Ok(None)
            }
            Token::Elem(value) => {
                check_attachable(&value)?;
                match self.stack.last_mut() {
                    Some(state) if matches!(state.frame, Frame::Array { .. }) => {
                        if matches!(state.frame, Frame::Array { raw_scalar: true, .. })
                            && !value.is_scalar()
                        {
                            return Err(Error::malformed("scalar wrapper holding a container"));
                        }
                        state.attach(value)?
                    }
                    _ => return Err(Error::malformed("element outside of an array")),
                }
                Ok(None)
            }
            Token::EndArray => match self.stack.pop() {
                Some(ParseState {
                    frame: Frame::Array { elems, raw_scalar },
                }) => {
                    if raw_scalar && elems.len() != 1 {
                        return Err(Error::malformed("scalar wrapper takes exactly one element"));
                    }
                    self.close(Value::Array { elems, raw_scalar })
                }
                _ => Err(Error::malformed("unbalanced end of array")),
            },
            Token::EndObject => match self.stack.pop() {
                Some(ParseState {
                    frame:
                        Frame::Object {
                            mut pairs,
                            pending: None,
                            ..
                        },
                }) => {
                    uniqueify(&mut pairs);
                    self.close(Value::Object(pairs))
                }
                Some(ParseState {
                    frame: Frame::Object { .. },
                }) => Err(Error::malformed("object closed after a key with no value")),
                _ => Err(Error::malformed("unbalanced end of object")),
            },
            Token::Done => {
                if self.stack.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::malformed("token stream ended inside a container"))
                }
            }
        }
    }

    fn open(&mut self, state: ParseState) -> Result<()> {
        if let Some(top) = self.stack.last() {
            if !top.accepts_container() {
                return Err(Error::malformed("container in a position that needs a key or scalar"));
            }
        }
        if self.stack.len() >= MAX_DEPTH {
            tracing::debug!(depth = self.stack.len(), "Builder nesting limit reached");
            return Err(Error::RecursionLimitExceeded(MAX_DEPTH));
        }
        self.stack.push(state);
        Ok(())
    }

    fn close(&mut self, value: Value) -> Result<Option<Value>> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.attach(value)?;
                Ok(None)
            }
            None => {
                self.finished = true;
                Ok(Some(value))
            }
        }
    }
}

fn check_attachable(value: &Value) -> Result<()> {
    match value {
        Value::Array { .. } | Value::Object(_) => Err(Error::malformed(
            "containers must be opened with a begin token, not passed as a value",
        )),
        _ => Ok(()),
    }
}
