//! `gym-expenses`: record gym and company expenses against categories and report totals across
//! currencies.
//!
//! The interesting part of this crate is the `fx` module, which resolves exchange rates from the
//! local datastore and converts and aggregates expenses into a single reporting currency. The
//! rest is the CLI, configuration and SQLite plumbing that feeds it.

pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
pub mod fx;
pub mod model;
mod utils;

#[cfg(test)]
mod test;

pub use config::Config;
pub use error::{Error, ErrorType, Result};
