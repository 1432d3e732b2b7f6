//! IPv4 address encoding
//!
//! [`encode`] and [`decode`] work on the host-order numeric value of an
//! address (`a.b.c.d` is `a << 24 | b << 16 | c << 8 | d`). The kernel's
//! `struct in_addr` holds the same address in network byte order; [`InAddr`]
//! does that conversion so callers never handle swapped values.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use std::net::Ipv4Addr;

/// Size of one `struct in_addr`
pub const IN_ADDR_LEN: usize = 4;

/// Parse a dotted-decimal literal into its numeric value
pub fn encode(dotted: &str) -> Result<u32> {
    dotted
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| Error::InvalidIpv4(dotted.to_string()))
}

/// Format a numeric address as dotted-decimal
pub fn decode(value: u32) -> String {
    Ipv4Addr::from(value).to_string()
}

/// `struct in_addr`: one IPv4 address, network byte order in memory
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InAddr {
    pub s_addr: u32,
}

impl InAddr {
    /// Build from a host-order numeric value
    pub fn from_host(value: u32) -> Self {
        let mut octets = [0u8; IN_ADDR_LEN];
        NetworkEndian::write_u32(&mut octets, value);
        InAddr {
            s_addr: u32::from_ne_bytes(octets),
        }
    }

    /// Host-order numeric value
    pub fn to_host(self) -> u32 {
        NetworkEndian::read_u32(&self.s_addr.to_ne_bytes())
    }

    pub fn parse(dotted: &str) -> Result<Self> {
        encode(dotted).map(Self::from_host)
    }
}

impl From<Ipv4Addr> for InAddr {
    fn from(addr: Ipv4Addr) -> Self {
        InAddr::from_host(u32::from(addr))
    }
}

impl From<InAddr> for Ipv4Addr {
    fn from(addr: InAddr) -> Self {
        Ipv4Addr::from(addr.to_host())
    }
}

/// Serialize addresses as consecutive `in_addr` values
pub fn write_in_addrs(addrs: &[Ipv4Addr], buf: &mut Vec<u8>) -> Result<()> {
    buf.reserve(addrs.len() * IN_ADDR_LEN);
    for addr in addrs {
        buf.write_u32::<NetworkEndian>(u32::from(*addr))?;
    }
    Ok(())
}

/// Read consecutive `in_addr` values written by the kernel
pub fn read_in_addrs(bytes: &[u8]) -> Result<Vec<Ipv4Addr>> {
    if bytes.len() % IN_ADDR_LEN != 0 {
        return Err(Error::MalformedResult(format!(
            "ip4 buffer length {} is not a multiple of {}",
            bytes.len(),
            IN_ADDR_LEN
        )));
    }

    let mut cursor = Cursor::new(bytes);
    let mut addrs = Vec::with_capacity(bytes.len() / IN_ADDR_LEN);
    for _ in 0..bytes.len() / IN_ADDR_LEN {
        addrs.push(Ipv4Addr::from(cursor.read_u32::<NetworkEndian>()?));
    }
    Ok(addrs)
}
