#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod file;
pub mod permissions;
pub mod retrieve;
pub mod window;

pub use connection::{Client, ConnectionParams, Protocol, PutOutcome};
pub use error::{Error, ParseError, Result};
pub use file::{File, FileInfo};
pub use window::{Lookback, Since};
