//! Memboard core types and utilities
//!
//! Shared, network-free building blocks for the Memboard client crates:
//! error conventions, a clock port, client settings and tracing initialization.

pub mod clock;
pub mod error;
pub mod settings;
#[cfg(feature = "tracing")]
pub mod tracing;

pub use clock::{Clock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use settings::ClientSettings;
