//! Network interface abstraction layer
//!
//! This module provides the router's view of its devices:
//! - the [`LinkLayer`] and [`Clock`] collaborator traits
//! - a TUN-device implementation for running on a Linux host

pub mod link;
pub mod tun;

// Re-export commonly used items
pub use link::*;
pub use tun::TunLink;
