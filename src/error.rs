use std::io;

use beancount_core::InvalidAccountName;
use beancount_render::BasicRendererError;
use thiserror::Error;

/// Everything that can make a conversion fail.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Error while parsing config file: {0}")]
    Config(String),

    #[error("File does not exist or wrong format exception: {0}")]
    Book(String),

    #[error("invalid account: {0}")]
    Account(#[from] InvalidAccountName),

    #[error("invalid amount '{0}' in source book")]
    Amount(String),

    #[error("could not write output: {0}")]
    Io(#[from] io::Error),

    #[error("could not render output: {0}")]
    Render(#[from] BasicRendererError),

    #[error("verification of the output failed:\n{}", .0.join("\n"))]
    Verification(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
