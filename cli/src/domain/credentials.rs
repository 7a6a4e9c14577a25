//! Secret generation for site and database accounts.

use uuid::Uuid;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// Generated password length.
pub const SECRET_LEN: usize = 24;

/// Lowercase hex encoding of `bytes`.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

/// Random alphanumeric secret of `len` characters.
///
/// Draws from the OS RNG through v4 UUIDs and rejects bytes that would bias
/// the alphabet. Ambiguous glyphs (`0`, `O`, `1`, `l`, `I`) are excluded so
/// the secret survives being read off a terminal.
#[must_use]
pub fn generate_secret(len: usize) -> String {
    // Largest multiple of the alphabet size that fits in a byte.
    let limit = 256 - (256 % ALPHABET.len());
    let mut out = String::with_capacity(len);
    while out.len() < len {
        for &b in Uuid::new_v4().as_bytes() {
            if usize::from(b) < limit {
                out.push(char::from(ALPHABET[usize::from(b) % ALPHABET.len()]));
                if out.len() == len {
                    break;
                }
            }
        }
    }
    out
}
