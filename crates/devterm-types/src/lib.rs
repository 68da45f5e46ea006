//! Foundation types and traits for devterm.
//!
//! This crate contains the types shared by every devterm crate: the error
//! enum, terminal output entries, export formats, the persistence port used
//! by history and session storage, and the engine configuration.

pub mod config;
pub mod error;
pub mod format;
pub mod output;
pub mod store;
pub mod time;
