//! Document key type with validated components.

use std::fmt;

/// Errors related to key parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The key string is empty.
    #[error("invalid key: empty")]
    Empty,
    /// A character outside `[a-z0-9_]` was found.
    #[error("invalid key '{key}': character {character:?} at position {position}")]
    InvalidCharacter {
        key: String,
        character: char,
        position: usize,
    },
}

/// A validated document key.
///
/// Keys name one document in the store (`progress_json`, `settings_all_json`,
/// ...). They are restricted to ASCII lower-case letters, digits and `_` so
/// they can be used verbatim as JSON object keys and file-safe names.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocKey(String);

impl DocKey {
    /// Parse a key string, validating every character.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use studystate_doc_store::DocKey;
    ///
    /// let key = DocKey::parse("progress_json").unwrap();
    /// assert_eq!(key.as_str(), "progress_json");
    ///
    /// assert!(DocKey::parse("Progress").is_err());
    /// assert!(DocKey::parse("").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        if s.is_empty() {
            return Err(KeyError::Empty);
        }

        for (position, character) in s.chars().enumerate() {
            let valid = character.is_ascii_lowercase()
                || character.is_ascii_digit()
                || character == '_';
            if !valid {
                return Err(KeyError::InvalidCharacter {
                    key: s.to_string(),
                    character,
                    position,
                });
            }
        }

        Ok(DocKey(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Create a key from a string literal.
///
/// # Panics
///
/// Panics if the literal is not a valid key. Use `DocKey::parse` for
/// keys that come from outside the program.
#[macro_export]
macro_rules! doc_key {
    ($s:expr) => {
        $crate::DocKey::parse($s).expect("invalid document key literal")
    };
}
