//! Tracing setup shared by Memboard binaries and test harnesses
//!
//! Library code only emits events through the `tracing` macros; installing a
//! subscriber is left to the embedding application via [`init_tracing`].

pub mod config;
pub mod init;

pub use config::InstrumentationConfig;
pub use init::{init_default, init_dev, init_tracing};
