//! Core of the shared shopping-list bot.
//!
//! This crate is framework-agnostic. The chat platform lives behind the
//! messaging port, implemented in an adapter crate.

pub mod access;
pub mod actions;
pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod notify;
pub mod ports;
pub mod router;
pub mod screens;
pub mod store;
pub mod token;

pub use errors::{Error, Result};
