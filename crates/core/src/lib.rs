//! Zaffira Core - Shared domain types and logic.
//!
//! This crate provides the types and pure logic used across all Zaffira
//! components:
//! - `api` - REST API over PostgreSQL
//! - `cli` - Command-line tools for migrations, seeding and admin management
//!
//! # Architecture
//!
//! The core crate contains no I/O: no database access, no HTTP clients.
//! Everything the storefront derives from data (catalog filtering and
//! sorting, cart totals, booking snapshots, profile rules) lives here so it
//! can be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and enums
//! - [`product`] - Product validation and image normalization
//! - [`catalog`] - Filter, sort and paginate pipeline
//! - [`cart`] - Cart reducer and snapshots
//! - [`booking`] - Appointment booking rules
//! - [`profile`] - Account and profile field rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod booking;
pub mod cart;
pub mod catalog;
pub mod product;
pub mod profile;
pub mod types;

pub use types::*;
