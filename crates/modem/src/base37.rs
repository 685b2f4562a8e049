//! Base-37 callsign packing
//!
//! Bijective packing of up to nine characters from the alphabet
//! space, 0-9, A-Z into a 47-bit integer. Shorter strings are padded on the
//! right with spaces before encoding, so a round trip through
//! `decode(encode(s))` yields the space-padded callsign.

/// Characters per packed callsign.
pub const CALLSIGN_LEN: usize = 9;

/// First invalid packed value: 37^9.
pub const LIMIT: u64 = 129_961_739_795_077;

const ALPHABET: &[u8; 37] = b" 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn digit(ch: u8) -> u64 {
    match ch {
        b'0'..=b'9' => (ch - b'0') as u64 + 1,
        b'A'..=b'Z' => (ch - b'A') as u64 + 11,
        b'a'..=b'z' => (ch - b'a') as u64 + 11,
        _ => 0,
    }
}

/// Pack a callsign, truncated to nine characters and right-padded with
/// spaces. Characters outside the alphabet map to space.
pub fn encode(call_sign: &str) -> u64 {
    let bytes = call_sign.as_bytes();
    let mut value = 0u64;
    for i in 0..CALLSIGN_LEN {
        let ch = bytes.get(i).copied().unwrap_or(b' ');
        value = value * 37 + digit(ch);
    }
    value
}

/// Unpack `length` characters, most significant first.
pub fn decode(mut value: u64, length: usize) -> String {
    let mut out = vec![b' '; length];
    for i in (0..length).rev() {
        out[i] = ALPHABET[(value % 37) as usize];
        value /= 37;
    }
    String::from_utf8(out).unwrap()
}
