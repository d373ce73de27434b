//! Core building blocks for the Flex Plugins toolkit.
//!
//! This crate defines the configuration, command grammar, API error shape,
//! the polling primitive and the REST plumbing shared across the workspace.

pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod package;
pub mod poll;
pub mod rest;

pub use command::{CommandRef, PrimaryCommand};
pub use config::{Credentials, FlexConfig};
pub use error::ApiError;
pub use poll::{Clock, Exhaustion, PollError, PollPolicy, ProbeError, SystemClock};
pub use rest::{RestClient, RestError};
