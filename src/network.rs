//! Network address helpers for jail creation
//!
//! Provides:
//! - Dotted-decimal IPv4 encoding to and from the 32-bit kernel value
//! - The `in_addr` layout used by the `jail(2)` request and `ip4.addr`

pub mod ip;

pub use ip::{InAddr, decode, encode};
