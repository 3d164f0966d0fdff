//! Order lifecycle status.
//!
//! Orders are created `Pending`. Nothing in the storefront advances them;
//! the other states exist so that rows written by fulfilment tooling decode.

use serde::{Deserialize, Serialize};

/// Error returned when a stored status code is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown order status code: {0:?}")]
pub struct UnknownStatusCode(pub String);

/// Order status.
///
/// Persisted as a single-letter code (see [`OrderStatus::code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The single-letter storage code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pending => "P",
            Self::Confirmed => "C",
            Self::Shipped => "S",
            Self::Delivered => "D",
            Self::Cancelled => "X",
        }
    }

    /// Decode a storage code.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStatusCode` for anything other than `P`, `C`, `S`, `D` or `X`.
    pub fn from_code(code: &str) -> Result<Self, UnknownStatusCode> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or_else(|| UnknownStatusCode(code.to_owned()))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}
