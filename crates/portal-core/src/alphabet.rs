//! Base-62 codec over the fixed short code alphabet.
//!
//! Sequence numbers are written in positional notation, most significant digit
//! first, using [`ALPHABET`] as the digit table. The alphabet is shuffled so
//! that consecutive sequence values do not produce visibly consecutive codes.

use crate::error::CoreError;

/// The 62 symbols of a generated short code, in digit order.
pub const ALPHABET: &[u8; 62] = b"wdmiuv5TnsEhoU6S8a2YqjtXfFbV1e7zHAD4rBlOZINJ0MK9CLWpGxgP3kyRcQ";

/// Radix of the encoding.
pub const BASE: u64 = ALPHABET.len() as u64;

/// Length of the longest code, i.e. `encode(u64::MAX)`.
pub const MAX_CODE_LENGTH: usize = 11;

const NOT_A_DIGIT: u8 = u8::MAX;

static DIGITS: [u8; 256] = digit_table();

const fn digit_table() -> [u8; 256] {
    let mut table = [NOT_A_DIGIT; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

fn digit_of(c: char) -> Option<u64> {
    if !c.is_ascii() {
        return None;
    }
    match DIGITS[c as usize] {
        NOT_A_DIGIT => None,
        digit => Some(u64::from(digit)),
    }
}

/// Encodes `n` as a short code.
///
/// Zero encodes to the first alphabet symbol, so the output is never empty.
pub fn encode(mut n: u64) -> String {
    let mut buf = [0u8; MAX_CODE_LENGTH];
    let mut start = MAX_CODE_LENGTH;
    loop {
        start -= 1;
        buf[start] = ALPHABET[(n % BASE) as usize];
        n /= BASE;
        if n == 0 {
            break;
        }
    }
    buf[start..].iter().map(|&b| char::from(b)).collect()
}

/// Decodes a short code back into its sequence number.
///
/// # Errors
///
/// * [`CoreError::Empty`] for an empty string
/// * [`CoreError::InvalidCharacter`] for any symbol outside [`ALPHABET`]
/// * [`CoreError::Overflow`] if the value does not fit in a `u64`
pub fn decode(code: &str) -> Result<u64, CoreError> {
    if code.is_empty() {
        return Err(CoreError::Empty);
    }

    code.char_indices().try_fold(0u64, |acc, (position, character)| {
        let digit = digit_of(character).ok_or(CoreError::InvalidCharacter {
            character,
            position,
        })?;
        acc.checked_mul(BASE)
            .and_then(|value| value.checked_add(digit))
            .ok_or_else(|| CoreError::Overflow(code.to_string()))
    })
}

/// Returns `true` iff every symbol of `s` belongs to [`ALPHABET`].
///
/// Used to reject caller-supplied codes (query strings, path separators,
/// whitespace) before any lookup happens.
pub fn is_valid_charset(s: &str) -> bool {
    s.bytes().all(|b| DIGITS[b as usize] != NOT_A_DIGIT)
}

/// Returns the first symbol of `s` that is not in the alphabet, with its byte offset.
pub fn first_invalid(s: &str) -> Option<(usize, char)> {
    s.char_indices().find(|(_, c)| digit_of(*c).is_none())
}
