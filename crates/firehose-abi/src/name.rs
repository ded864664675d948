//! Antelope account/table name encoding.
//!
//! A name packs up to 13 characters of the alphabet
//! `.12345abcdefghijklmnopqrstuvwxyz` into a `u64`: twelve 5-bit symbols
//! from the most significant bit down, then one 4-bit symbol.

use thiserror::Error;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name `{name}` is longer than 13 characters")]
    TooLong { name: String },

    #[error("name `{name}` contains invalid character {ch:?}")]
    InvalidChar { name: String, ch: char },

    #[error("13th character of name `{name}` must be one of .12345abcdefghij")]
    InvalidLastChar { name: String },
}

/// Render a packed name. Trailing dots are trimmed.
pub fn name_to_string(value: u64) -> String {
    let mut chars = [b'.'; 13];
    let mut tmp = value;
    for i in 0..=12 {
        let mask = if i == 0 { 0x0f } else { 0x1f };
        chars[12 - i] = CHARMAP[(tmp & mask) as usize];
        tmp >>= if i == 0 { 4 } else { 5 };
    }
    let end = chars
        .iter()
        .rposition(|&c| c != b'.')
        .map(|p| p + 1)
        .unwrap_or(0);
    chars[..end].iter().map(|&c| c as char).collect()
}

/// Pack a name string.
pub fn string_to_name(name: &str) -> Result<u64, NameError> {
    if name.len() > 13 {
        return Err(NameError::TooLong { name: name.into() });
    }
    let mut value = 0u64;
    for (i, ch) in name.chars().enumerate() {
        let sym = char_to_symbol(ch).ok_or_else(|| NameError::InvalidChar {
            name: name.into(),
            ch,
        })?;
        if i < 12 {
            value |= (sym & 0x1f) << (64 - 5 * (i + 1));
        } else {
            if sym > 0x0f {
                return Err(NameError::InvalidLastChar { name: name.into() });
            }
            value |= sym;
        }
    }
    Ok(value)
}

/// Pack a name into its 8-byte little-endian wire form.
pub fn encode_name(name: &str) -> Result<[u8; 8], NameError> {
    string_to_name(name).map(u64::to_le_bytes)
}

fn char_to_symbol(ch: char) -> Option<u64> {
    match ch {
        'a'..='z' => Some(ch as u64 - 'a' as u64 + 6),
        '1'..='5' => Some(ch as u64 - '1' as u64 + 1),
        '.' => Some(0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names() {
        assert_eq!(string_to_name("eosio").unwrap(), 6138663577826885632);
        assert_eq!(string_to_name("eosio.token").unwrap(), 6138663591592764928);
        assert_eq!(name_to_string(3607749779137757184), "accounts");
        assert_eq!(name_to_string(0), "");
    }

    #[test]
    fn wire_form_is_little_endian() {
        assert_eq!(
            encode_name("eosio").unwrap(),
            [0x00, 0x00, 0x00, 0x00, 0x00, 0xea, 0x30, 0x55]
        );
    }

    #[test]
    fn round_trip_preserves_inner_dots() {
        for n in ["a", "alice", "eosio.token", "zzzzzzzzzzzzj", "a.b.c", "12345"] {
            assert_eq!(name_to_string(string_to_name(n).unwrap()), n);
        }
    }

    #[test]
    fn rejects_bad_names() {
        assert!(matches!(
            string_to_name("Alice"),
            Err(NameError::InvalidChar { ch: 'A', .. })
        ));
        assert!(matches!(
            string_to_name("abcdefghijklmn"),
            Err(NameError::TooLong { .. })
        ));
        assert!(matches!(
            string_to_name("aaaaaaaaaaaaz"),
            Err(NameError::InvalidLastChar { .. })
        ));
    }
}
