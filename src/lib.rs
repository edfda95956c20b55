//! stockpick: daily and weekly stock pattern scanner.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line surface in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
