//! Bramble Core - Shared types library.
//!
//! This crate provides the types shared by every Bramble component:
//! - `storefront` - Catalog browsing, cart and checkout over HTTP
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, catalog product IDs, emails, order statuses and money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
