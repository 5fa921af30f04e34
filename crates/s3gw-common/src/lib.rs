//! Shared error taxonomy, configuration, crypto, and naming helpers for
//! the S3 gateway proxy.

pub mod config;
pub mod crypto;
pub mod error;
pub mod naming;

pub use error::{Error, Result};
