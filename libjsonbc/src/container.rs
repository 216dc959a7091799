//! Encoded containers.
//!
//! A container is `header | entries | data`:
//!
//! ```text
//! header   varbyte((count << 2) | kind)
//! entries  array:  varbyte(entry) * count
//!          object: (varbyte(key_delta), varbyte(entry)) * count
//! data     child payloads, back to back, in entry order
//! ```
//!
//! Object key ids are stored as positive deltas from the previous key (the
//! first from zero), so ids come out strictly ascending. Entries carry
//! lengths only; a child's offset is the sum of the lengths before it.
//!
//! Payloads by entry type: strings are their UTF-8 bytes, numerics their
//! decimal text, small integers one varbyte word, nested containers their
//! full encoding, and null and booleans nothing at all.

use bytes::Bytes;
use std::fmt;

use crate::entry::{ContainerKind, Entry, EntryType, Header};
use crate::error::{Error, Result};
use crate::numeric::Numeric;
use crate::value::Value;
use crate::varbyte;
use crate::FORMAT_VERSION;

/// An immutable encoded container.
///
/// Cloning is cheap; nested containers handed out by decoding share the
/// parent's buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Container {
    bytes: Bytes,
    header: Header,
}

impl Container {
    /// Wrap encoded bytes, checking the header.
    ///
    /// The rest of the buffer is checked lazily, as it is read.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        let mut cursor: &[u8] = &bytes;
        let word = varbyte::decode(&mut cursor)
            .ok_or_else(|| Error::malformed("truncated container header"))?;
        let header = Header::from_word(word)?;
        Ok(Container { bytes, header })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> ContainerKind {
        self.header.kind
    }

    /// Number of children at the root: pairs for an object, elements for an
    /// array, 1 for a scalar wrapper.
    pub fn root_count(&self) -> u32 {
        self.header.count
    }

    pub fn is_object(&self) -> bool {
        self.header.kind == ContainerKind::Object
    }

    pub fn is_array(&self) -> bool {
        self.header.kind == ContainerKind::Array
    }

    /// Whether this is the wrapper around a bare root scalar.
    pub fn is_scalar(&self) -> bool {
        self.header.kind == ContainerKind::Scalar
    }

    /// Name of the root value's type: `object`, `array`, `string`, `number`,
    /// `boolean` or `null`. A scalar wrapper reports its element's type.
    pub fn type_of(&self) -> Result<&'static str> {
        Ok(match self.header.kind {
            ContainerKind::Object => "object",
            ContainerKind::Array => "array",
            ContainerKind::Scalar => {
                let view = self.view()?;
                match view.children[0].entry.ty {
                    EntryType::String => "string",
                    EntryType::Numeric | EntryType::SmallInteger => "number",
                    EntryType::BoolFalse | EntryType::BoolTrue => "boolean",
                    EntryType::Null => "null",
                    EntryType::Container => {
                        return Err(Error::malformed("scalar wrapper holding a container"))
                    }
                }
            }
        })
    }

    /// Value of the member with key id `key`, if this is an object holding it.
    ///
    /// Nested containers come back as [`Value::Binary`].
    pub fn get(&self, key: i32) -> Result<Option<Value>> {
        if !self.is_object() {
            return Ok(None);
        }
        let view = self.view()?;
        view.find(key).map(|child| child.value()).transpose()
    }

    /// Element `index` of an array (or the scalar of a wrapper).
    ///
    /// Nested containers come back as [`Value::Binary`].
    pub fn index(&self, index: usize) -> Result<Option<Value>> {
        if self.is_object() {
            return Ok(None);
        }
        let view = self.view()?;
        view.children.get(index).map(|child| child.value()).transpose()
    }

    /// The transport form: a version byte followed by the container.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len() + 1);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&self.bytes);
        out
    }

    /// Parse the transport form written by [`Container::to_wire`].
    pub fn from_wire(wire: impl Into<Bytes>) -> Result<Self> {
        let wire = wire.into();
        match wire.first() {
            None => Err(Error::malformed("empty jsonbc wire buffer")),
            Some(&FORMAT_VERSION) => Container::from_bytes(wire.slice(1..)),
            Some(&version) => Err(Error::UnsupportedVersion(version)),
        }
    }

    /// Decode the header and every entry of this level.
    pub(crate) fn view(&self) -> Result<ContainerView> {
        ContainerView::parse(self)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Container({:?}, ", self.header.kind)?;
        for byte in self.bytes.iter() {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// One child of a decoded level: its key id (0 in arrays), entry and
/// payload bytes.
#[derive(Clone)]
pub(crate) struct Child {
    pub key: i32,
    pub entry: Entry,
    pub data: Bytes,
}

impl Child {
    pub fn is_container(&self) -> bool {
        self.entry.ty == EntryType::Container
    }

    /// The nested container this child holds.
    pub fn container(&self) -> Result<Container> {
        let nested = Container::from_bytes(self.data.clone())?;
        if nested.is_scalar() {
            return Err(Error::malformed("scalar wrapper nested inside a container"));
        }
        Ok(nested)
    }

    /// Decode the payload. Containers become [`Value::Binary`].
    pub fn value(&self) -> Result<Value> {
        match self.entry.ty {
            EntryType::Null => self.empty_payload(Value::Null),
            EntryType::BoolFalse => self.empty_payload(Value::Bool(false)),
            EntryType::BoolTrue => self.empty_payload(Value::Bool(true)),
            EntryType::String => std::str::from_utf8(&self.data)
                .map(|s| Value::String(s.to_string()))
                .map_err(|_| Error::malformed("string payload is not valid UTF-8")),
            EntryType::Numeric => Numeric::from_payload(&self.data).map(Value::Numeric),
            EntryType::SmallInteger => {
                let mut cursor: &[u8] = &self.data;
                match varbyte::decode(&mut cursor) {
                    Some(word) if cursor.is_empty() => {
                        Ok(Value::Numeric(Numeric::from_small_integer(word)))
                    }
                    _ => Err(Error::malformed("bad small integer payload")),
                }
            }
            EntryType::Container => self.container().map(Value::Binary),
        }
    }

    fn empty_payload(&self, value: Value) -> Result<Value> {
        if self.data.is_empty() {
            Ok(value)
        } else {
            Err(Error::malformed(format!(
                "{:?} entry with a {} byte payload",
                self.entry.ty,
                self.data.len()
            )))
        }
    }
}

/// One level of a container with every entry decoded.
pub(crate) struct ContainerView {
    pub kind: ContainerKind,
    pub children: Vec<Child>,
}

impl ContainerView {
    fn parse(container: &Container) -> Result<Self> {
        let bytes = &container.bytes;
        let mut cursor: &[u8] = bytes;
        let truncated = || Error::malformed("truncated container entries");

        let header = Header::from_word(varbyte::decode(&mut cursor).ok_or_else(truncated)?)?;
        let count = header.count as usize;
        let is_object = header.kind == ContainerKind::Object;

        // Every entry takes at least one byte, two with a key delta.
        let min_entry_bytes = if is_object { 2 } else { 1 };
        if count > cursor.len() / min_entry_bytes {
            return Err(truncated());
        }

        let mut metas = Vec::with_capacity(count);
        let mut key: i64 = 0;
        for _ in 0..count {
            if is_object {
                let delta = varbyte::decode(&mut cursor).ok_or_else(truncated)?;
                if delta == 0 {
                    return Err(Error::malformed("object keys not strictly ascending"));
                }
                key += i64::from(delta);
                if key > i64::from(i32::MAX) {
                    return Err(Error::malformed("object key id out of range"));
                }
            }
            let entry = Entry::from_word(varbyte::decode(&mut cursor).ok_or_else(truncated)?)?;
            metas.push((key as i32, entry));
        }

        let mut offset = bytes.len() - cursor.len();
        let mut children = Vec::with_capacity(count);
        for (key, entry) in metas {
            let end = offset + entry.len as usize;
            if end > bytes.len() {
                return Err(Error::malformed("entry length runs past the end of the container"));
            }
            children.push(Child {
                key,
                entry,
                data: bytes.slice(offset..end),
            });
            offset = end;
        }
        if offset != bytes.len() {
            return Err(Error::malformed(format!(
                "{} trailing bytes after container data",
                bytes.len() - offset
            )));
        }

        Ok(ContainerView {
            kind: header.kind,
            children,
        })
    }

    pub fn count(&self) -> usize {
        self.children.len()
    }

    /// Binary search an object level by key id.
    pub fn find(&self, key: i32) -> Option<&Child> {
        self.children
            .binary_search_by_key(&key, |c| c.key)
            .ok()
            .map(|i| &self.children[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::value::Pair;

    #[test]
    fn hand_built_array_layout() {
        // [true, "ab"]
        let bytes = vec![
            (2 << 2) | 2,
            EntryType::BoolTrue as u8,
            (2 << 3) | EntryType::String as u8,
            b'a',
            b'b',
        ];
        let c = Container::from_bytes(bytes).unwrap();
        assert!(c.is_array());
        assert_eq!(c.root_count(), 2);
        assert_eq!(c.index(0).unwrap(), Some(Value::Bool(true)));
        assert_eq!(c.index(1).unwrap(), Some(Value::from("ab")));
        assert_eq!(c.index(2).unwrap(), None);
    }

    #[test]
    fn object_keys_are_deltas() {
        let obj = Value::object(vec![Pair::new(3, true), Pair::new(10, false)]);
        let c = encode(&obj).unwrap();
        assert_eq!(
            c.as_bytes(),
            [
                (2 << 2) | 1,
                3,
                EntryType::BoolTrue as u8,
                7,
                EntryType::BoolFalse as u8
            ]
        );
        assert_eq!(c.get(10).unwrap(), Some(Value::Bool(false)));
        assert_eq!(c.get(3).unwrap(), Some(Value::Bool(true)));
        assert_eq!(c.get(4).unwrap(), None);
    }

    #[test]
    fn rejects_truncation_and_trailing_bytes() {
        assert!(Container::from_bytes(Vec::new()).is_err());

        let short = Container::from_bytes(vec![(1 << 2) | 2, (5 << 3) | 1, b'a']).unwrap();
        assert!(short.index(0).is_err());

        let long = Container::from_bytes(vec![(1 << 2) | 2, EntryType::Null as u8, 0]).unwrap();
        assert!(long.index(0).is_err());

        let lying_count = Container::from_bytes(vec![(100 << 2) | 2, 0x06]).unwrap();
        assert!(lying_count.index(0).is_err());
    }

    #[test]
    fn rejects_zero_key_delta() {
        let c = Container::from_bytes(vec![(1 << 2) | 1, 0, EntryType::Null as u8]).unwrap();
        assert!(matches!(c.get(0), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn type_of_reports_wrapped_scalar() {
        assert_eq!(encode(&Value::from(42)).unwrap().type_of().unwrap(), "number");
        assert_eq!(encode(&Value::from("s")).unwrap().type_of().unwrap(), "string");
        assert_eq!(encode(&Value::Bool(false)).unwrap().type_of().unwrap(), "boolean");
        assert_eq!(encode(&Value::Null).unwrap().type_of().unwrap(), "null");
        assert_eq!(encode(&Value::array(vec![])).unwrap().type_of().unwrap(), "array");
        assert_eq!(encode(&Value::object(vec![])).unwrap().type_of().unwrap(), "object");
    }

    #[test]
    fn wire_version_tag() {
        let c = encode(&Value::array(vec![Value::Null])).unwrap();
        let wire = c.to_wire();
        assert_eq!(wire[0], FORMAT_VERSION);
        assert_eq!(Container::from_wire(wire.clone()).unwrap(), c);

        let mut bad = wire;
        bad[0] = 9;
        assert!(matches!(
            Container::from_wire(bad),
            Err(Error::UnsupportedVersion(9))
        ));
        assert!(Container::from_wire(Vec::new()).is_err());
    }
}
