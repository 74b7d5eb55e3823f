//! Memboard API client
//!
//! Mediates every call the dashboard makes to the multi-tenant backend:
//!
//! - [`TokenStore`] keeps the volatile access/refresh token pair.
//! - [`Dispatcher`] attaches credentials, normalizes failures into
//!   [`ClientError`] and recovers from an expired access token by running a
//!   single-flight refresh ([`RefreshCoordinator`]) and retrying once.
//! - [`EntityCache`] memoizes slow-changing lookups for a bounded time.
//! - [`ApiClient`] ties these together behind typed endpoint methods.

pub mod cache;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod query;
pub mod refresh;
pub mod token_store;
pub mod types;

pub use cache::{CacheEntry, EntityCache, GetOptions};
pub use client::{ApiClient, ApiClientBuilder};
pub use dispatcher::{ApiResponse, Dispatcher, RawResponse, RequestDescriptor};
pub use error::{ClientError, ErrorKind, Result};
pub use query::{encode_path_segment, encode_query};
pub use refresh::RefreshCoordinator;
pub use token_store::{TokenPair, TokenStore};
