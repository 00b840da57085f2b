//! Stockroom Core - Shared domain types.
//!
//! This crate provides the types shared by every Stockroom component:
//! - `web` - The staff-facing inventory server
//! - `cli` - Command-line tools for inviting staff and reporting stock
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, SKUs, quantities, ids and the catalog records
//! - [`totals`] - Per-SKU and grand totals over an inventory report

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod totals;
pub mod types;

pub use totals::{TotalsSummary, TrackedSku, TrackedSkus, TrackedSkusError};
pub use types::*;
