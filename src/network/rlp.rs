// src/network/rlp.rs
//! Recursive length prefix encoding
//!
//! Only the encoder side, and only what a legacy transaction needs:
//! byte strings, unsigned integers and one flat list.

/// Appends `bytes` as an RLP string
pub fn encode_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        out.push(bytes[0]);
    } else {
        encode_length(out, bytes.len(), 0x80);
        out.extend_from_slice(bytes);
    }
}

/// Appends an unsigned integer given as big-endian bytes
///
/// Leading zero bytes are stripped; zero encodes as the empty string.
pub fn encode_uint_bytes(out: &mut Vec<u8>, be_bytes: &[u8]) {
    let first = be_bytes.iter().position(|b| *b != 0).unwrap_or(be_bytes.len());
    encode_bytes(out, &be_bytes[first..]);
}

/// Appends an unsigned integer
pub fn encode_uint(out: &mut Vec<u8>, value: u128) {
    encode_uint_bytes(out, &value.to_be_bytes());
}

/// Wraps already-encoded items into a list
pub fn encode_list(items: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(items.len() + 9);
    encode_length(&mut out, items.len(), 0xc0);
    out.extend_from_slice(items);
    out
}

fn encode_length(out: &mut Vec<u8>, len: usize, offset: u8) {
    if len < 56 {
        out.push(offset + len as u8);
    } else {
        let be = (len as u64).to_be_bytes();
        let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
        let len_bytes = &be[first..];
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}
