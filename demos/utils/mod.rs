//! Host-side setup for the router demo.

pub mod network;

pub use network::*;
