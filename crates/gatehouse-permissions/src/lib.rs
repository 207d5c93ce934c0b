//! Permission cache for Gatehouse.
//!
//! A [`PermissionStore`] holds the capability set of exactly one identity.
//! It answers [`has`](PermissionStore::has) synchronously and fail-closed:
//! before the first successful load, while a load is in flight, after a
//! failed load, and after the identity changed, every capability reads as
//! denied.
//!
//! # Key types
//!
//! - [`PermissionStore`]: load, check, invalidate
//! - [`PermissionSnapshot`]: what subscribers observe
//! - [`LoadOutcome`]: whether a load was applied, skipped, or discarded as
//!   stale
//! - [`PermissionConfig`] / [`RetryConfig`]: timeout and retry settings

mod config;
mod error;
mod store;

pub use config::{PermissionConfig, RetryConfig, millis};
pub use error::PermissionError;
pub use store::{LoadOutcome, PermissionSnapshot, PermissionStore};
