//! Catalog product identifiers.
//!
//! Products live in the document store, which owns their identifiers. The
//! relational side only keeps a copy of the string, so validity is checked
//! when the product is resolved, never by a foreign key.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ProductId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductIdError {
    /// The input string is empty.
    #[error("product id cannot be empty")]
    Empty,
    /// The input string is longer than the stored column.
    #[error("product id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-]`.
    #[error("product id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// An opaque catalog product identifier.
///
/// ## Constraints
///
/// - Length: 1-100 characters
/// - Characters: ASCII letters, digits, `-` and `_`
///
/// ## Examples
///
/// ```
/// use bramble_core::ProductId;
///
/// assert!(ProductId::parse("65f1c0ffee0ddba11a5e1234").is_ok());
/// assert!(ProductId::parse("linen-shirt_02").is_ok());
///
/// assert!(ProductId::parse("").is_err());
/// assert!(ProductId::parse("../etc/passwd").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Maximum length of a product identifier.
    pub const MAX_LENGTH: usize = 100;

    /// Parse a `ProductId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains characters outside `[A-Za-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, ProductIdError> {
        if s.is_empty() {
            return Err(ProductIdError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(ProductIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ProductIdError::InvalidCharacter(bad));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ProductId {
    type Err = ProductIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductId {
    type Error = ProductIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
