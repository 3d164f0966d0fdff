//! Bramble storefront library.
//!
//! Product catalog browsing, a per-user cart and checkout into order
//! snapshots, served over HTTP. Built as a library so the binary, the CLI and
//! the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
