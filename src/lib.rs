//! Recast - File conversion service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod jobs;
pub mod registry;
pub mod results;
pub mod service;
pub mod store;

pub use error::{Error, Result};
