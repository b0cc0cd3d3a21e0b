//! Converts GnuCash SQLite books into Beancount ledgers.
//!
//! The pipeline reads the book, renames accounts, builds transactions, derives the surrounding
//! directives, writes the ledger and re-parses it to make sure Beancount accepts it.

pub mod assemble;
pub mod book;
pub mod config;
pub mod convert;
pub mod currency;
pub mod error;
pub mod header;
pub mod rename;
pub mod transactions;
pub mod verify;

pub use config::Config;
pub use convert::Converter;
pub use error::{ConversionError, Result};
