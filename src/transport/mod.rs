//! Transport layer protocols implementation
//!
//! Only UDP is needed: it carries RIP.

pub mod udp;

// Re-export commonly used items
pub use udp::{create_udp_packet, UdpHeader, UDP_HEADER_LEN};
