//! Forum topic alert library.
//!
//! A scheduled job that watches one Discourse category, announces newly
//! created topics in a Telegram chat, and records the highest announced topic
//! ID so repeat runs stay quiet.

pub mod config;
pub mod constants;
pub mod error;
pub mod forum;
pub mod notify;
pub mod runner;
pub mod state;

pub use error::{Error, Result};
