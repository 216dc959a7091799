//! Varbyte encoding for unsigned 32-bit integers.
//!
//! Format:
//! - Split the value into 7-bit groups, least-significant group first.
//! - Every byte except the last has its high bit set (continuation).
//! - At most 5 bytes. The 5th byte never has a continuation bit and only its
//!   low nibble is meaningful (bits 28..32 of the value).
//!
//! Headers, entries and object key deltas are all stored this way.

/// Maximum encoded size of a `u32`.
pub const MAX_SIZE: usize = 5;

/// Append the varbyte encoding of `value` to `out`, returning the number of
/// bytes written.
///
/// ```
/// let mut buf = Vec::new();
/// libjsonbc::varbyte::encode(300, &mut buf);
/// assert_eq!(buf, [0xAC, 0x02]);
/// ```
pub fn encode(mut value: u32, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    while value > 0x7F {
        out.push(0x80 | (value & 0x7F) as u8);
        value >>= 7;
    }
    out.push(value as u8);
    out.len() - start
}

/// Decode one value from the front of `buf`, advancing it past the bytes
/// consumed.
///
/// Returns `None` if the buffer ends before the value does, or if a 5th byte
/// carries bits that do not fit in 32 bits. On `None`, `buf` is left where it
/// was.
pub fn decode(buf: &mut &[u8]) -> Option<u32> {
    let bytes = *buf;
    let mut value: u32 = 0;

    for (i, &byte) in bytes.iter().enumerate().take(MAX_SIZE) {
        if i == MAX_SIZE - 1 {
            if byte > 0x0F {
                return None;
            }
            value |= (byte as u32) << 28;
            *buf = &bytes[MAX_SIZE..];
            return Some(value);
        }

        value |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            *buf = &bytes[i + 1..];
            return Some(value);
        }
    }

    None
}

/// Number of bytes [`encode`] writes for `value`, without encoding it.
pub fn size(value: u32) -> usize {
    if value < 0x80 {
        1
    } else if value < 0x4000 {
        2
    } else if value < 0x20_0000 {
        3
    } else if value < 0x1000_0000 {
        4
    } else {
        5
    }
}
