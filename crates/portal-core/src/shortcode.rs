use crate::alphabet::{self, MAX_CODE_LENGTH};
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

/// A validated short code identifier for a shortened URL.
///
/// Short codes are 1-11 characters drawn from [`alphabet::ALPHABET`], i.e. the
/// base-62 rendering of a sequence number. They always fit inline in a
/// [`SmolStr`], so cloning one never allocates.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortCode(SmolStr);

impl ShortCode {
    /// Creates the short code for an allocated sequence number.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(SmolStr::new(alphabet::encode(sequence)))
    }

    /// Parses caller-supplied input into a `ShortCode`.
    ///
    /// Valid codes are non-empty, at most [`MAX_CODE_LENGTH`] characters and
    /// contain only alphabet symbols.
    pub fn parse(code: impl AsRef<str>) -> Result<Self, CoreError> {
        let code = code.as_ref();
        if code.is_empty() {
            return Err(CoreError::Empty);
        }

        if let Some((position, character)) = alphabet::first_invalid(code) {
            return Err(CoreError::InvalidCharacter {
                character,
                position,
            });
        }

        if code.len() > MAX_CODE_LENGTH {
            return Err(CoreError::TooLong {
                len: code.len(),
                max: MAX_CODE_LENGTH,
            });
        }

        Ok(Self(SmolStr::new(code)))
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the sequence number this code was generated from.
    pub fn sequence(&self) -> Result<u64, CoreError> {
        alphabet::decode(&self.0)
    }

    /// Generates the full shortened URL under `domain`.
    ///
    /// A `/` separator is inserted only when `domain` does not already end with one.
    pub fn to_url(&self, domain: &str) -> String {
        let mut url = String::with_capacity(domain.len() + 1 + self.0.len());
        url.push_str(domain);
        if !domain.ends_with('/') {
            url.push('/');
        }
        url.push_str(&self.0);
        url
    }
}

impl std::fmt::Debug for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortCode").field(&self.0).finish()
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ShortCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        ShortCode::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_codes() {
        assert!(ShortCode::parse("d").is_ok());
        assert!(ShortCode::parse("Abc123xyz").is_ok());
        assert!(ShortCode::parse("a".repeat(MAX_CODE_LENGTH)).is_ok());
    }

    #[test]
    fn empty() {
        assert_eq!(ShortCode::parse(""), Err(CoreError::Empty));
    }

    #[test]
    fn too_long() {
        assert!(matches!(
            ShortCode::parse("a".repeat(MAX_CODE_LENGTH + 1)),
            Err(CoreError::TooLong { len: 12, .. })
        ));
    }

    #[test]
    fn invalid_characters() {
        assert!(ShortCode::parse("abc def").is_err());
        assert!(ShortCode::parse("abc/def").is_err());
        assert!(ShortCode::parse("abc?x=1").is_err());
        assert!(ShortCode::parse("my-code").is_err());
    }

    #[test]
    fn invalid_character_wins_over_length() {
        let long_query = format!("{}?x=1", "a".repeat(20));
        assert!(matches!(
            ShortCode::parse(long_query),
            Err(CoreError::InvalidCharacter { character: '?', .. })
        ));
    }

    #[test]
    fn from_sequence_round_trips() {
        let code = ShortCode::from_sequence(1_000_000);
        assert_eq!(code.sequence().unwrap(), 1_000_000);
        assert_eq!(ShortCode::parse(code.as_str()).unwrap(), code);
    }

    #[test]
    fn display() {
        let code = ShortCode::parse("abc123").unwrap();
        assert_eq!(code.to_string(), "abc123");
        assert_eq!(format!("{code:?}"), "ShortCode(\"abc123\")");
    }

    #[test]
    fn to_url_inserts_single_separator() {
        let code = ShortCode::parse("abc123").unwrap();
        assert_eq!(code.to_url("https://por.tl"), "https://por.tl/abc123");
        assert_eq!(code.to_url("https://por.tl/"), "https://por.tl/abc123");
        assert_eq!(code.to_url("https://por.tl/s/"), "https://por.tl/s/abc123");
    }
}
