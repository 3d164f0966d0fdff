//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Email/password accounts
//! - `cart` - Cart mutations and the cart page
//! - `checkout` - Order placement and order history
//!
//! Services borrow their stores from [`crate::state::AppState`] for the
//! duration of one request.

pub mod auth;
pub mod cart;
pub mod checkout;
mod error;
mod locks;

pub use auth::{AuthError, AuthService};
pub use cart::{AddedItem, CartLine, CartService, CartView, MAX_ITEM_QUANTITY, ResolvedLine};
pub use checkout::{CheckoutReceipt, CheckoutService};
pub use error::ShopError;
pub use locks::CartLocks;
