//! Core types and trait definitions for Popular, a per-day deduplicated
//! interaction ledger with popularity ranking.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::InteractionStore`]; host applications
//! talk to the ledger through a [`tracker::Tracker`].

pub mod clock;
pub mod error;
pub mod interaction;
pub mod ranking;
pub mod registry;
pub mod store;
pub mod subject;
pub mod tracker;
pub mod visitor;
pub mod window;

pub use error::{Error, Result};
