//! Per-child entry words and container header words.
//!
//! An entry is a varbyte-encoded `u32`: the low 3 bits are an [`EntryType`]
//! tag and the remaining 29 bits are the byte length of the child's payload.
//! Only lengths are stored, never absolute offsets, so reaching child `n`
//! means summing the lengths of children `0..n`.
//!
//! A header is a varbyte-encoded `u32`: the low 2 bits are a
//! [`ContainerKind`] flag and the remaining bits are the child count
//! (pairs for objects, elements for arrays).

use crate::error::{Error, Result};

const ENTRY_SHIFT: u32 = 3;
const ENTRY_TYPE_MASK: u32 = 0x7;

const HEADER_SHIFT: u32 = 2;
const HEADER_KIND_MASK: u32 = 0x3;

/// Largest payload length an entry can describe.
pub const MAX_ENTRY_LENGTH: usize = (u32::MAX >> ENTRY_SHIFT) as usize;

/// Largest child count a container header can describe.
pub const MAX_CHILDREN: usize = (1 << 29) - 1;

/// Type tag stored in the low bits of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryType {
    String = 1,
    Numeric = 2,
    SmallInteger = 3,
    BoolFalse = 4,
    BoolTrue = 5,
    Null = 6,
    Container = 7,
}

impl EntryType {
    fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            1 => EntryType::String,
            2 => EntryType::Numeric,
            3 => EntryType::SmallInteger,
            4 => EntryType::BoolFalse,
            5 => EntryType::BoolTrue,
            6 => EntryType::Null,
            7 => EntryType::Container,
            other => return Err(Error::malformed(format!("unknown entry type tag {}", other))),
        })
    }
}

/// A decoded entry word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub ty: EntryType,
    pub len: u32,
}

impl Entry {
    /// Build an entry, failing if `len` does not fit the length field.
    pub fn new(ty: EntryType, len: usize) -> Result<Self> {
        if len > MAX_ENTRY_LENGTH {
            return Err(Error::limit("jsonbc entry payload length", MAX_ENTRY_LENGTH));
        }
        Ok(Entry {
            ty,
            len: len as u32,
        })
    }

    /// An entry with no payload (null, booleans).
    pub fn empty(ty: EntryType) -> Self {
        Entry { ty, len: 0 }
    }

    pub fn to_word(self) -> u32 {
        (self.len << ENTRY_SHIFT) | self.ty as u32
    }

    pub fn from_word(word: u32) -> Result<Self> {
        Ok(Entry {
            ty: EntryType::from_tag(word & ENTRY_TYPE_MASK)?,
            len: word >> ENTRY_SHIFT,
        })
    }
}

/// Container flag stored in the low bits of a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContainerKind {
    /// One-element array standing in for a bare root scalar.
    Scalar = 0,
    Object = 1,
    Array = 2,
}

/// A decoded container header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: ContainerKind,
    pub count: u32,
}

impl Header {
    pub fn new(kind: ContainerKind, count: usize) -> Result<Self> {
        if count > MAX_CHILDREN {
            let what = match kind {
                ContainerKind::Object => "number of jsonbc object pairs",
                _ => "number of jsonbc array elements",
            };
            return Err(Error::limit(what, MAX_CHILDREN));
        }
        Ok(Header {
            kind,
            count: count as u32,
        })
    }

    pub fn to_word(self) -> u32 {
        (self.count << HEADER_SHIFT) | self.kind as u32
    }

    pub fn from_word(word: u32) -> Result<Self> {
        let kind = match word & HEADER_KIND_MASK {
            0 => ContainerKind::Scalar,
            1 => ContainerKind::Object,
            2 => ContainerKind::Array,
            _ => return Err(Error::malformed("unknown type of jsonbc container")),
        };
        let count = word >> HEADER_SHIFT;
        if kind == ContainerKind::Scalar && count != 1 {
            return Err(Error::malformed(format!(
                "scalar wrapper must hold exactly one element, found {}",
                count
            )));
        }
        Ok(Header { kind, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_word_layout() {
        let e = Entry::new(EntryType::String, 5).unwrap();
        assert_eq!(e.to_word(), (5 << 3) | 1);
        assert_eq!(Entry::from_word(e.to_word()).unwrap(), e);
        assert_eq!(Entry::empty(EntryType::Null).to_word(), 6);
    }

    #[test]
    fn entry_rejects_unknown_tag() {
        assert!(matches!(
            Entry::from_word(8 << 3),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn entry_length_limit() {
        assert!(Entry::new(EntryType::String, MAX_ENTRY_LENGTH).is_ok());
        assert!(matches!(
            Entry::new(EntryType::String, MAX_ENTRY_LENGTH + 1),
            Err(Error::ResourceLimitExceeded { .. })
        ));
    }

    #[test]
    fn header_word_layout() {
        let h = Header::new(ContainerKind::Array, 3).unwrap();
        assert_eq!(h.to_word(), (3 << 2) | 2);
        assert_eq!(Header::from_word(h.to_word()).unwrap(), h);

        let obj = Header::new(ContainerKind::Object, 0).unwrap();
        assert_eq!(obj.to_word(), 1);
    }

    #[test]
    fn header_rejects_bad_scalar_wrapper() {
        assert!(Header::from_word((2 << 2) | ContainerKind::Scalar as u32).is_err());
        assert!(Header::from_word(3).is_err());
    }
}
