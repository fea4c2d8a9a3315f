//! Core of the ferret chat bot.
//!
//! Framework-agnostic: the chat websocket and the image HTTP API live behind
//! ports (traits) implemented in adapter crates.

pub mod bot;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handler;
pub mod logging;
pub mod ports;
pub mod protocol;
pub mod rate_limit;
pub mod whitelist;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, FetchError, Result};
