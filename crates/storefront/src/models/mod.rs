//! Domain models for the storefront database.
//!
//! These are validated domain types, separate from the row structs used by
//! the `db` layer. Products live in the catalog module; they are never
//! stored here.

pub mod cart;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem};
pub use order::{NewOrder, Order, OrderItem};
pub use session::CurrentUser;
pub use user::User;
