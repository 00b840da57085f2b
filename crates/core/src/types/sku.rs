//! Stock-keeping unit code.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

/// Errors that can occur when parsing a [`Sku`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SkuError {
    #[error("SKU cannot be empty")]
    Empty,
    #[error("SKU must be at most {max} characters")]
    TooLong { max: usize },
    #[error("SKU contains invalid character {0:?}")]
    InvalidChar(char),
}

/// A product SKU such as `SSL-001`.
///
/// SKUs are matched exactly. [`Sku::parse`] is for configured input and
/// rejects characters outside ASCII alphanumerics, `-`, `_` and `.`;
/// [`Sku::from_store`] (and `Deserialize`) take whatever the store holds.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Maximum length accepted for a SKU.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `Sku`.
    ///
    /// # Errors
    ///
    /// Returns [`SkuError`] if the input is empty, too long or contains a
    /// character outside the allowed set.
    pub fn parse(input: &str) -> Result<Self, SkuError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(SkuError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SkuError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(SkuError::InvalidChar(bad));
        }
        Ok(Self(s.to_owned()))
    }

    /// Wrap a SKU read back from the store.
    ///
    /// Only surrounding whitespace is trimmed. A row with an unusual code
    /// such as `LIKÖR 0,5L` must still load; it just never matches a
    /// configured SKU.
    ///
    /// # Errors
    ///
    /// Returns [`SkuError::Empty`] if nothing is left after trimming.
    pub fn from_store(raw: &str) -> Result<Self, SkuError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(SkuError::Empty);
        }
        Ok(Self(s.to_owned()))
    }

    /// Wrap a compile-time SKU literal known to be valid.
    pub(crate) fn from_static(sku: &'static str) -> Self {
        Self(sku.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Sku {
    type Err = SkuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Sku {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_store(&raw).map_err(de::Error::custom)
    }
}
