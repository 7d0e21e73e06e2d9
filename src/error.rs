//! Crate-wide error type.
//!
//! Every failure aborts the current run; nothing here is retried. The binary
//! entry point is the only place that turns an [`Error`] into an exit code.

use thiserror::Error;

use crate::config::ConfigError;
use crate::forum::FetchError;
use crate::notify::DispatchError;
use crate::state::StateError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to fetch forum topics")]
    Fetch(#[from] FetchError),
    #[error("watermark state unavailable")]
    State(#[from] StateError),
    #[error("failed to dispatch notification")]
    Dispatch(#[from] DispatchError),
    #[error("configuration error")]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
