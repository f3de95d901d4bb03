//! # Overlord Config
//!
//! Configuration management for Overlord Bot.
//!
//! This crate provides YAML loading with environment overrides, validation,
//! an atomically swappable cache and file-change hot reloading.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validator;
pub mod watcher;

pub use cache::*;
pub use loader::*;
pub use schema::*;
pub use watcher::*;
