//! # User Set Feed Shared Library
//!
//! Core of the `userset_create` web service: data models, persistence,
//! authentication and the user set creation flow itself. The API server in
//! `usersetfeed-api` is a thin HTTP layer over this crate.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `db`: Connection pool and migrations
//! - `auth`: Token authentication and capability checks
//! - `store`: Collaborator traits with Postgres and in-memory backends
//! - `userset`: Validation, persistence and auto-association of user sets

pub mod auth;
pub mod db;
pub mod models;
pub mod store;
pub mod userset;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
