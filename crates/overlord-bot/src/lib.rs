//! # Overlord Bot
//!
//! Chat bot runtime for a flight simulation stream: reads chat from Twitch
//! IRC or a local console, admits commands in arrival order, runs them
//! concurrently and writes replies through one rate-limited writer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod console;
pub mod error;
pub mod irc;
pub mod runtime;
pub mod transport;

pub use console::*;
pub use error::*;
pub use irc::*;
pub use runtime::*;
pub use transport::*;
