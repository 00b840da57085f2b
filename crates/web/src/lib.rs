//! Stockroom Web - Staff inventory server.
//!
//! Serves the stock pages to signed-in staff. Accounts and sessions live in
//! Supabase Auth (GoTrue); products, storage locations and the inventory
//! report come from Supabase PostgREST or, when a database URL is
//! configured, straight from Postgres.
//!
//! # Architecture
//!
//! - [`middleware`] - Cookie sessions and the session gate in front of every page
//! - [`identity`] - The identity provider seam and the validated-session cache
//! - [`store`] - The catalog store seam and its Postgres adapter
//! - [`supabase`] - GoTrue and PostgREST adapters
//! - [`catalog`] - Ordered, fail-fast loading of a page's catalog data
//! - [`routes`] - HTTP handlers and the router
//!
//! The binary in `main.rs` wires these together; the CLI reuses the
//! Supabase adapters and the catalog loader.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod supabase;
