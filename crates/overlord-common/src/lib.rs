//! # Overlord Common
//!
//! Shared types, utilities, and common functionality for Overlord Bot.
//!
//! This crate provides the foundational types (user identity, permission
//! tiers, inbound chat messages), the shared error type, and the logging
//! bootstrap used across all other crates in the workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::*;
pub use logging::*;
pub use types::*;
pub use utils::*;
