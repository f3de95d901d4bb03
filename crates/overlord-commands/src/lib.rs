//! # Overlord Commands
//!
//! The command dispatch and rate-control engine for Overlord Bot.
//!
//! Every inbound chat line passes through the [`Dispatcher`]: pre-filtering,
//! the spam filter, alias resolution against the [`CommandRegistry`], the
//! permission and cooldown gate, the handler execution shell and finally the
//! output formatter that splits replies into chat-safe chunks.
//!
//! Slow or stateful dependencies (flight data, language model, speech,
//! channel management, persistence) are reached through the collaborator
//! traits in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod builtins;
pub mod command;
pub mod context;
pub mod cooldown;
pub mod dispatcher;
pub mod engagement;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod loyalty;
pub mod metrics;
pub mod permissions;
pub mod registry;
pub mod spam;
pub mod store;
pub mod template;
#[cfg(any(test, feature = "testing"))]
pub mod test_support;
pub mod traits;

pub use command::*;
pub use context::*;
pub use cooldown::*;
pub use dispatcher::*;
pub use engagement::*;
pub use error::*;
pub use executor::*;
pub use formatter::*;
pub use loyalty::*;
pub use metrics::*;
pub use permissions::*;
pub use registry::*;
pub use spam::*;
pub use store::*;
pub use template::*;
pub use traits::*;
