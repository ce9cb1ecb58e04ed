//! `daytask` server library.
//!
//! Exposes the HTTP API, the console progress display, and configuration
//! loading for use by the binary and by tests.

pub mod api;
pub mod config;
pub mod display;
