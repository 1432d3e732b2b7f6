//! Marshaling of parameter sets into the `jail_set(2)`/`jail_get(2)` iovec array
//!
//! The kernel takes a flat array of `struct iovec` in which even slots hold a
//! NUL-terminated parameter name and odd slots hold that parameter's value.
//! [`IoVecArena`] owns every buffer those slots point at. The iovecs
//! themselves are only materialized inside [`IoVecArena::with_iovecs`], so
//! no raw pointer outlives the buffers it refers to.
//!
//! The `iovec!` macro is adapted from libjail-rs (https://github.com/fubarnetes/libjail-rs)
//! Original authors: Fabian Freyer <fabian.freyer@physik.tu-berlin.de>
//! License: BSD-3-Clause
//!
//! Copyright (c) 2018, Fabian Freyer <fabian.freyer@physik.tu-berlin.de>
//! All rights reserved.
//!
//! Redistribution and use in source and binary forms, with or without
//! modification, are permitted provided that the following conditions are met:
//!
//! 1. Redistributions of source code must retain the above copyright notice, this
//!    list of conditions and the following disclaimer.
//!
//! 2. Redistributions in binary form must reproduce the above copyright notice,
//!    this list of conditions and the following disclaimer in the documentation
//!    and/or other materials provided with the distribution.
//!
//! 3. Neither the name of the copyright holder nor the names of its
//!    contributors may be used to endorse or promote products derived from
//!    this software without specific prior written permission.

use crate::error::{Error, Result};
use crate::network::ip;
use byteorder::{ByteOrder, NativeEndian};
use std::ffi::{CStr, CString};
use std::mem;
use std::ptr;

use super::params::ParamSet;
use super::types::{ParamKind, ParamValue};

/// Size of the kernel's error message buffer
pub const ERRMSG_LEN: usize = 1024;

/// Minimum room given to a string slot on `jail_get(2)` (MAXPATHLEN)
pub const STRING_SLOT_LEN: usize = 1024;

/// Addresses an `ip4.addr` slot can receive on `jail_get(2)`
pub const IPV4_SLOT_ADDRS: usize = 64;

const INT_LEN: usize = mem::size_of::<libc::c_int>();

/// Build `libc::iovec` values for jail syscalls
macro_rules! iovec {
    (mut $buf:expr) => {
        iovec!($buf.as_mut_ptr(), $buf.len())
    };
    ($value:expr, $size:expr) => {
        libc::iovec {
            iov_base: $value as *mut libc::c_void,
            iov_len: $size,
        }
    };
    ($buf:expr) => {
        iovec!($buf.as_ptr(), $buf.len())
    };
    () => {
        iovec!(ptr::null_mut::<libc::c_void>(), 0)
    };
}

/// Whether the vector feeds `jail_set(2)` or receives from `jail_get(2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Set,
    Get,
}

#[derive(Debug)]
struct Slot {
    name: CString,
    /// None is passed as a null pointer with zero length
    value: Option<Vec<u8>>,
    /// Length the kernel reported back for the value
    value_len: usize,
    /// Position and kind in the originating set; None for internal slots
    origin: Option<(usize, ParamKind)>,
}

impl Slot {
    fn new(name: CString, value: Option<Vec<u8>>, origin: Option<(usize, ParamKind)>) -> Self {
        let value_len = value.as_ref().map_or(0, Vec::len);
        Self {
            name,
            value,
            value_len,
            origin,
        }
    }

    fn reported(&self) -> &[u8] {
        match &self.value {
            Some(buf) => &buf[..self.value_len.min(buf.len())],
            None => &[],
        }
    }
}

/// Owned buffers for one jail_set/jail_get call
#[derive(Debug)]
pub struct IoVecArena {
    direction: Direction,
    slots: Vec<Slot>,
}

impl IoVecArena {
    /// Marshal a parameter set, followed by an internal `errmsg` slot
    ///
    /// Every name and value kind is checked before any buffer is allocated.
    pub fn marshal(params: &ParamSet<'_>, direction: Direction) -> Result<Self> {
        for (name, value) in params.iter() {
            let expected = params
                .registry()
                .kind_of(name)
                .ok_or_else(|| Error::InvalidParameterName(name.to_string()))?;
            if value.kind() != expected {
                return Err(Error::UnsupportedParameterType {
                    name: name.to_string(),
                    expected: expected.to_string(),
                    actual: value.kind().to_string(),
                });
            }
        }

        let mut slots = Vec::with_capacity(params.len() + 1);
        for (index, (name, value)) in params.iter().enumerate() {
            let origin = Some((index, value.kind()));
            let slot = match direction {
                Direction::Set => set_slot(name, value, origin)?,
                Direction::Get => Slot::new(CString::new(name)?, Some(get_buffer(value)?), origin),
            };
            slots.push(slot);
        }
        slots.push(Slot::new(
            CString::new("errmsg")?,
            Some(vec![0u8; ERRMSG_LEN]),
            None,
        ));

        Ok(Self { direction, slots })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of iovec elements (two per parameter)
    pub fn iov_len(&self) -> usize {
        self.slots.len() * 2
    }

    /// Parameter names in vector order
    pub fn names(&self) -> Vec<&str> {
        self.slots
            .iter()
            .map(|s| s.name.to_str().unwrap_or_default())
            .collect()
    }

    /// Expose the iovec array for the duration of `f`
    ///
    /// Value lengths written back by the kernel are recorded once `f`
    /// returns.
    pub fn with_iovecs<R>(&mut self, f: impl FnOnce(&mut [libc::iovec]) -> R) -> R {
        let mut iov: Vec<libc::iovec> = Vec::with_capacity(self.iov_len());
        for slot in self.slots.iter_mut() {
            iov.push(iovec!(slot.name.as_bytes_with_nul()));
            iov.push(match slot.value.as_mut() {
                Some(buf) => iovec!(mut buf),
                None => iovec!(),
            });
        }

        let result = f(&mut iov);

        for (slot, pair) in self.slots.iter_mut().zip(iov.chunks(2)) {
            if let Some(buf) = &slot.value {
                slot.value_len = pair[1].iov_len.min(buf.len());
            }
        }
        result
    }

    /// The kernel's error message, if it wrote one
    pub fn errmsg(&self) -> Option<String> {
        let slot = self.slots.last()?;
        let buf = slot.value.as_ref()?;
        let text = CStr::from_bytes_until_nul(buf)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(buf).into_owned());
        if text.is_empty() { None } else { Some(text) }
    }

    /// Copy the values `jail_get(2)` wrote back into the set they came from
    pub fn read_back(&self, params: &mut ParamSet<'_>) -> Result<()> {
        if self.direction != Direction::Get {
            return Ok(());
        }

        for slot in &self.slots {
            let Some((index, kind)) = slot.origin else {
                continue;
            };
            let name = slot.name.to_string_lossy();
            let bytes = slot.reported();
            let value = match kind {
                ParamKind::Int => ParamValue::Int(read_int(&name, bytes)?),
                ParamKind::Bool => ParamValue::Bool(read_int(&name, bytes)? != 0),
                ParamKind::String => {
                    let text = CStr::from_bytes_until_nul(bytes)
                        .map(CStr::to_bytes)
                        .unwrap_or(bytes);
                    ParamValue::String(String::from_utf8(text.to_vec()).map_err(|_| {
                        Error::MalformedResult(format!("parameter '{}' is not valid UTF-8", name))
                    })?)
                }
                ParamKind::Ipv4 => ParamValue::Ipv4(ip::read_in_addrs(bytes)?),
            };
            params.replace_at(index, value);
        }
        Ok(())
    }
}

fn set_slot(name: &str, value: &ParamValue, origin: Option<(usize, ParamKind)>) -> Result<Slot> {
    let slot = match value {
        ParamValue::String(s) => Slot::new(
            CString::new(name)?,
            Some(CString::new(s.as_str())?.into_bytes_with_nul()),
            origin,
        ),
        ParamValue::Int(v) => Slot::new(CString::new(name)?, Some(int_bytes(*v)), origin),
        // Boolean flags are named, not valued: "persist" sets, "nopersist" clears.
        ParamValue::Bool(true) => Slot::new(CString::new(name)?, None, origin),
        ParamValue::Bool(false) => Slot::new(CString::new(negate(name))?, None, origin),
        ParamValue::Ipv4(addrs) => {
            let mut buf = Vec::new();
            ip::write_in_addrs(addrs, &mut buf)?;
            Slot::new(CString::new(name)?, Some(buf), origin)
        }
    };
    Ok(slot)
}

fn get_buffer(value: &ParamValue) -> Result<Vec<u8>> {
    let buf = match value {
        ParamValue::String(s) => {
            let mut buf = CString::new(s.as_str())?.into_bytes_with_nul();
            let len = buf.len().max(STRING_SLOT_LEN);
            buf.resize(len, 0);
            buf
        }
        ParamValue::Int(v) => int_bytes(*v),
        ParamValue::Bool(b) => int_bytes(i32::from(*b)),
        ParamValue::Ipv4(addrs) => {
            let mut buf = Vec::new();
            ip::write_in_addrs(addrs, &mut buf)?;
            let len = buf.len().max(IPV4_SLOT_ADDRS * ip::IN_ADDR_LEN);
            buf.resize(len, 0);
            buf
        }
    };
    Ok(buf)
}

fn int_bytes(v: i32) -> Vec<u8> {
    let mut buf = vec![0u8; INT_LEN];
    NativeEndian::write_i32(&mut buf, v);
    buf
}

fn read_int(name: &str, bytes: &[u8]) -> Result<i32> {
    if bytes.len() != INT_LEN {
        return Err(Error::MalformedResult(format!(
            "parameter '{}' returned {} bytes, expected {}",
            name,
            bytes.len(),
            INT_LEN
        )));
    }
    Ok(NativeEndian::read_i32(bytes))
}

/// "persist" <-> "nopersist", "allow.mount" <-> "allow.nomount"
///
/// Only the last dotted component carries the prefix.
fn negate(name: &str) -> String {
    let (prefix, leaf) = match name.rfind('.') {
        Some(dot) => name.split_at(dot + 1),
        None => ("", name),
    };
    match leaf.strip_prefix("no") {
        Some(base) => format!("{}{}", prefix, base),
        None => format!("{}no{}", prefix, leaf),
    }
}
