#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod args;
pub mod config;
pub mod logging;

mod error;
pub use error::{SdiCheckError, SdiCheckResult};

mod run;
pub use run::run_check;
