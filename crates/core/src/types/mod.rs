//! Core types for Bramble.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod product_id;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{format_price, line_total, sum_amounts};
pub use product_id::{ProductId, ProductIdError};
pub use status::{OrderStatus, UnknownStatusCode};
