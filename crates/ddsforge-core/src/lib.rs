//! ddsforge Core Library
//!
//! This crate provides the error type and the option bitset shared
//! across all ddsforge components.

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result, ResultExt};
pub use types::*;
