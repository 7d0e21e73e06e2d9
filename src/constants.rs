//! Shared constants used across the application.

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("forum-topic-alert/", env!("CARGO_PKG_VERSION"));
