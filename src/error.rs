//! Errors for handling one received datagram.
//!
//! None of these is fatal: the router drops the offending datagram, logs
//! the error and carries on with the next one.

use std::io;

use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::rip::FormatError;

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
#[error("The header checksum {stored:#06x} does not match the calculated checksum {computed:#06x}")]
pub struct ChecksumError {
    pub stored: u16,
    pub computed: u16,
}

#[derive(Debug, ThisError)]
pub enum RouterError {
    #[error("{0}")]
    Checksum(#[from] ChecksumError),
    #[error("Malformed datagram: {0}")]
    Format(#[from] FormatError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("Link error: {0}")]
    Io(#[from] io::Error),
}
