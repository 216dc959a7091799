//! Lazy token iterator over a container.
//!
//! The iterator keeps an explicit stack of frames, one per container level
//! being walked. Entering a nested container pushes a frame; finishing one
//! pops it and resumes the parent where it left off. Abandoning the
//! iterator early simply drops the whole stack.

use std::sync::Arc;

use crate::container::{Container, ContainerView};
use crate::dict::KeyDictionary;
use crate::entry::ContainerKind;
use crate::error::{Error, Result};
use crate::token::Token;
use crate::value::Value;
use crate::MAX_DEPTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ArrayStart,
    ArrayElem,
    ObjectStart,
    ObjectKey,
    ObjectValue,
}

struct Frame {
    view: ContainerView,
    pos: usize,
    state: State,
}

impl Frame {
    fn new(view: ContainerView) -> Self {
        let state = match view.kind {
            ContainerKind::Object => State::ObjectStart,
            _ => State::ArrayStart,
        };
        Frame {
            view,
            pos: 0,
            state,
        }
    }
}

/// Walks a container and yields the same tokens the
/// [`Builder`](crate::Builder) consumes.
///
/// Object keys are resolved to names through the dictionary; an id with no
/// name stops the walk with [`Error::DictionaryLookupFailure`].
pub struct Iter<'d> {
    dict: &'d KeyDictionary,
    stack: Vec<Frame>,
}

impl<'d> Iter<'d> {
    pub fn new(container: &Container, dict: &'d KeyDictionary) -> Result<Self> {
        Ok(Iter {
            dict,
            stack: vec![Frame::new(container.view()?)],
        })
    }

    /// Produce the next token.
    ///
    /// With `skip_nested`, nested containers are returned whole as
    /// [`Value::Binary`](crate::Value::Binary) elements or values instead of
    /// being walked. Returns [`Token::Done`] once the root has closed.
    pub fn next_token(&mut self, skip_nested: bool) -> Result<Token> {
        let dict = self.dict;
        let Some(frame) = self.stack.last_mut() else {
            return Ok(Token::Done);
        };

        match frame.state {
            State::ArrayStart => {
                frame.state = State::ArrayElem;
                Ok(Token::BeginArray {
                    count: frame.view.count() as u32,
                    raw_scalar: frame.view.kind == ContainerKind::Scalar,
                })
            }
            State::ObjectStart => {
                frame.state = State::ObjectKey;
                Ok(Token::BeginObject {
                    count: frame.view.count() as u32,
                })
            }
            State::ArrayElem => {
                let Some(child) = frame.view.children.get(frame.pos) else {
                    self.stack.pop();
                    return Ok(Token::EndArray);
                };
                frame.pos += 1;
                if child.is_container() && !skip_nested {
                    let nested = child.container()?;
                    return self.descend(&nested);
                }
                Ok(Token::Elem(child.value()?))
            }
            State::ObjectKey => {
                let Some(child) = frame.view.children.get(frame.pos) else {
                    self.stack.pop();
                    return Ok(Token::EndObject);
                };
                let name = dict.name_for(child.key)?;
                frame.state = State::ObjectValue;
                Ok(Token::Key(name))
            }
            State::ObjectValue => {
                let child = frame
                    .view
                    .children
                    .get(frame.pos)
                    .ok_or_else(|| Error::malformed("object value past the last pair"))?;
                frame.pos += 1;
                frame.state = State::ObjectKey;
                if child.is_container() && !skip_nested {
                    let nested = child.container()?;
                    return self.descend(&nested);
                }
                Ok(Token::Value(child.value()?))
            }
        }
    }

    /// Push a frame for `nested` and emit its begin token.
    fn descend(&mut self, nested: &Container) -> Result<Token> {
        if self.stack.len() >= MAX_DEPTH {
            tracing::debug!(depth = self.stack.len(), "Iterator nesting limit reached");
            return Err(Error::RecursionLimitExceeded(MAX_DEPTH));
        }
        self.stack.push(Frame::new(nested.view()?));
        self.next_token(false)
    }

    /// Current nesting depth (0 once the root has closed).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Iterator for Iter<'_> {
    type Item = Result<Token>;

    /// Walks with nested containers expanded. Stops after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token(false) {
            Ok(Token::Done) => None,
            Ok(token) => Some(Ok(token)),
            Err(e) => {
                self.stack.clear();
                Some(Err(e))
            }
        }
    }
}

/// Receives a container's contents bottom up, building some other tree.
///
/// Children are always delivered before their parent. See [`assemble`].
/// Sinks that can refuse a value (say, a format without nulls) report it
/// through their own error type.
pub trait Assemble {
    type Output;
    type Error: From<Error>;

    /// A scalar: null, string, numeric or boolean.
    fn scalar(&mut self, value: Value) -> std::result::Result<Self::Output, Self::Error>;

    fn array(&mut self, elems: Vec<Self::Output>) -> std::result::Result<Self::Output, Self::Error>;

    /// Members arrive in stored order, ascending by key id.
    fn object(
        &mut self,
        members: Vec<(Arc<str>, Self::Output)>,
    ) -> std::result::Result<Self::Output, Self::Error>;
}

enum Partial<T> {
    Array(Vec<T>, bool),
    Object(Vec<(Arc<str>, T)>, Option<Arc<str>>),
}

/// Walk `container` and rebuild it through `sink`.
///
/// A root scalar wrapper is delivered as the bare scalar.
pub fn assemble<A: Assemble>(
    container: &Container,
    dict: &KeyDictionary,
    sink: &mut A,
) -> std::result::Result<A::Output, A::Error> {
    let mut stack: Vec<Partial<A::Output>> = Vec::new();

    for token in Iter::new(container, dict)? {
        let finished = match token? {
            Token::BeginArray { count, raw_scalar } => {
                stack.push(Partial::Array(Vec::with_capacity(count as usize), raw_scalar));
                continue;
            }
            Token::BeginObject { count } => {
                stack.push(Partial::Object(Vec::with_capacity(count as usize), None));
                continue;
            }
            Token::Key(name) => {
                if let Some(Partial::Object(_, pending)) = stack.last_mut() {
                    *pending = Some(name);
                }
                continue;
            }
            Token::Value(v) | Token::Elem(v) => sink.scalar(v)?,
            Token::EndArray => match stack.pop() {
                Some(Partial::Array(mut elems, true)) if elems.len() == 1 => {
                    elems.swap_remove(0)
                }
                Some(Partial::Array(elems, _)) => sink.array(elems)?,
                _ => return Err(Error::malformed("unbalanced end of array").into()),
            },
            Token::EndObject => match stack.pop() {
                Some(Partial::Object(members, None)) => sink.object(members)?,
                _ => return Err(Error::malformed("unbalanced end of object").into()),
            },
            Token::Done => break,
        };

        match stack.last_mut() {
            None => return Ok(finished),
            Some(Partial::Array(elems, _)) => elems.push(finished),
            Some(Partial::Object(members, pending)) => {
                let key = pending
                    .take()
                    .ok_or_else(|| Error::malformed("object value without a key"))?;
                members.push((key, finished));
            }
        }
    }

    Err(Error::malformed("container ended before its root closed").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::value::Pair;

    fn tokens(c: &Container, dict: &KeyDictionary, skip: bool) -> Vec<Token> {
        let mut it = Iter::new(c, dict).unwrap();
        let mut out = Vec::new();
        loop {
            let t = it.next_token(skip).unwrap();
            if t == Token::Done {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn walks_nested_containers() {
        let dict = KeyDictionary::in_memory();
        let a = dict.id_for("a").unwrap();
        let v = Value::object(vec![Pair::new(
            a,
            Value::array(vec![Value::Null, Value::from(1)]),
        )]);
        let c = encode(&v).unwrap();

        assert_eq!(
            tokens(&c, &dict, false),
            vec![
                Token::BeginObject { count: 1 },
                Token::key("a"),
                Token::BeginArray {
                    count: 2,
                    raw_scalar: false
                },
                Token::Elem(Value::Null),
                Token::Elem(Value::from(1)),
                Token::EndArray,
                Token::EndObject,
            ]
        );
    }

    #[test]
    fn skip_nested_yields_binary() {
        let dict = KeyDictionary::in_memory();
        let inner = Value::array(vec![Value::from("x")]);
        let c = encode(&Value::array(vec![inner.clone(), Value::Bool(true)])).unwrap();
        let inner_c = encode(&inner).unwrap();

        assert_eq!(
            tokens(&c, &dict, true),
            vec![
                Token::BeginArray {
                    count: 2,
                    raw_scalar: false
                },
                Token::Elem(Value::Binary(inner_c)),
                Token::Elem(Value::Bool(true)),
                Token::EndArray,
            ]
        );
    }

    #[test]
    fn raw_scalar_tokens() {
        let dict = KeyDictionary::in_memory();
        let c = encode(&Value::from("s")).unwrap();
        assert_eq!(
            tokens(&c, &dict, false),
            vec![
                Token::BeginArray {
                    count: 1,
                    raw_scalar: true
                },
                Token::Elem(Value::from("s")),
                Token::EndArray,
            ]
        );
    }

    #[test]
    fn done_is_sticky() {
        let dict = KeyDictionary::in_memory();
        let c = encode(&Value::array(vec![])).unwrap();
        let mut it = Iter::new(&c, &dict).unwrap();
        assert!(matches!(it.next_token(false).unwrap(), Token::BeginArray { .. }));
        assert_eq!(it.next_token(false).unwrap(), Token::EndArray);
        assert_eq!(it.next_token(false).unwrap(), Token::Done);
        assert_eq!(it.next_token(false).unwrap(), Token::Done);
        assert_eq!(it.depth(), 0);
    }

    #[test]
    fn unknown_key_id_fails() {
        let dict = KeyDictionary::in_memory();
        let c = encode(&Value::object(vec![Pair::new(7, true)])).unwrap();
        let mut it = Iter::new(&c, &dict).unwrap();
        it.next_token(false).unwrap();
        assert!(matches!(
            it.next_token(false),
            Err(Error::DictionaryLookupFailure(7))
        ));
    }

    struct Lisp;

    impl Assemble for Lisp {
        type Output = String;
        type Error = Error;

        fn scalar(&mut self, value: Value) -> Result<String> {
            Ok(format!("{:?}", value))
        }

        fn array(&mut self, elems: Vec<String>) -> Result<String> {
            Ok(format!("(list {})", elems.join(" ")))
        }

        fn object(&mut self, members: Vec<(Arc<str>, String)>) -> Result<String> {
            let members: Vec<String> = members
                .into_iter()
                .map(|(k, v)| format!("({} . {})", k, v))
                .collect();
            Ok(format!("(alist {})", members.join(" ")))
        }
    }

    #[test]
    fn assemble_bottom_up() {
        let dict = KeyDictionary::in_memory();
        let k = dict.id_for("k").unwrap();
        let v = Value::array(vec![
            Value::object(vec![Pair::new(k, Value::array(vec![]))]),
            Value::from(2),
        ]);
        let c = encode(&v).unwrap();
        assert_eq!(
            assemble(&c, &dict, &mut Lisp).unwrap(),
            "(list (alist (k . (list ))) 2)"
        );

        let scalar = encode(&Value::from("bare")).unwrap();
        assert_eq!(assemble(&scalar, &dict, &mut Lisp).unwrap(), "\"bare\"");
    }

    #[test]
    fn iterator_trait_stops_after_error() {
        let dict = KeyDictionary::in_memory();
        let c = encode(&Value::object(vec![Pair::new(7, true)])).unwrap();
        let results: Vec<_> = Iter::new(&c, &dict).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }
}
