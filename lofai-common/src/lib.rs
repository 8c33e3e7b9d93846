//! # lofai Common Library
//!
//! Shared code for the lofai radio services:
//! - Error types
//! - Layered configuration loading (CLI > ENV > TOML > defaults)
//! - Radio event types and the EventBus
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
