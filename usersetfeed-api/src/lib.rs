//! # User Set Feed API Server Library
//!
//! HTTP surface of the user set feed: configuration, routing and the mapping
//! of flow errors to HTTP responses.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
