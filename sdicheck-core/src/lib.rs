#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

/// Consistency checkers and their reports
pub mod check;

/// Environment access
pub mod config;

/// Per-host Basic authentication credentials
pub mod credentials;

/// Catalog search and record retrieval
pub mod csw;

pub mod http;

pub mod inconsistency;
pub use inconsistency::Inconsistency;

mod logger;
pub use logger::Logger;

/// OGC web services
pub mod ows;

#[cfg(test)]
mod test_utils;
