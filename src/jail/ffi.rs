//! Kernel boundary for the FreeBSD jail syscalls
//!
//! Holds the syscall numbers, the `struct jail` layout consumed by `jail(2)`,
//! the jail_set/jail_get flags, and the [`Kernel`] trait through which every
//! operation reaches the kernel. [`HostKernel`] issues the real syscalls on
//! FreeBSD and reports `ENOSYS` everywhere else.

use bitflags::bitflags;
use nix::errno::Errno;
use std::ffi::{CStr, c_char};
use std::marker::PhantomData;
use std::ptr;

use crate::network::InAddr;

/// Jail identifier assigned by the kernel
pub type Jid = i32;

/// `jail(2)` API version understood by the kernel
pub const JAIL_API_VERSION: u32 = 2;

pub const SYS_JAIL: i32 = 338;
pub const SYS_JAIL_ATTACH: i32 = 436;
pub const SYS_JAIL_GET: i32 = 506;
pub const SYS_JAIL_SET: i32 = 507;
pub const SYS_JAIL_REMOVE: i32 = 508;

bitflags! {
    /// Flags for jail_set and jail_get syscalls
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct JailFlags: i32 {
        /// Create the jail if it doesn't exist
        const CREATE = 0x01;
        /// Update parameters of existing jail
        const UPDATE = 0x02;
        /// Attach to jail upon creation
        const ATTACH = 0x04;
        /// Allow getting a dying jail
        const DYING = 0x08;
    }
}

impl JailFlags {
    /// Flags `jail_set(2)` accepts
    pub const SET_MASK: Self = Self::from_bits_retain(0x0f);
    /// Flags `jail_get(2)` accepts
    pub const GET_MASK: Self = Self::DYING;
}

/// `struct jail` from `<sys/jail.h>`, version 2
///
/// The lifetime ties the string and address pointers to the buffers they
/// were borrowed from.
#[repr(C)]
#[derive(Debug)]
pub struct RawJail<'a> {
    pub version: u32,
    pub path: *const c_char,
    pub hostname: *const c_char,
    pub jailname: *const c_char,
    pub ip4s: u32,
    pub ip6s: u32,
    pub ip4: *const InAddr,
    pub ip6: *const libc::c_void,
    _borrow: PhantomData<&'a ()>,
}

impl<'a> RawJail<'a> {
    pub fn new(
        version: u32,
        path: &'a CStr,
        hostname: &'a CStr,
        jailname: &'a CStr,
        ip4: &'a [InAddr],
    ) -> Self {
        Self {
            version,
            path: path.as_ptr(),
            hostname: hostname.as_ptr(),
            jailname: jailname.as_ptr(),
            ip4s: ip4.len() as u32,
            ip6s: 0,
            ip4: if ip4.is_empty() { ptr::null() } else { ip4.as_ptr() },
            ip6: ptr::null(),
            _borrow: PhantomData,
        }
    }
}

/// The five jail syscalls
///
/// Each method is a single, non-retrying call. Errors are the raw errno;
/// translation into call-family conditions happens in the caller.
pub trait Kernel {
    /// `jail(2)`: create a jail and attach the calling process to it
    fn jail(&self, request: &RawJail<'_>) -> Result<Jid, Errno>;

    /// `jail_set(2)`
    fn jail_set(&self, iov: &mut [libc::iovec], flags: JailFlags) -> Result<Jid, Errno>;

    /// `jail_get(2)`
    fn jail_get(&self, iov: &mut [libc::iovec], flags: JailFlags) -> Result<Jid, Errno>;

    /// `jail_attach(2)`
    fn jail_attach(&self, jid: Jid) -> Result<(), Errno>;

    /// `jail_remove(2)`
    fn jail_remove(&self, jid: Jid) -> Result<(), Errno>;
}

/// The running kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct HostKernel;

#[cfg(target_os = "freebsd")]
fn check(ret: libc::c_int) -> Result<libc::c_int, Errno> {
    if ret < 0 { Err(Errno::last()) } else { Ok(ret) }
}

#[cfg(target_os = "freebsd")]
impl Kernel for HostKernel {
    fn jail(&self, request: &RawJail<'_>) -> Result<Jid, Errno> {
        check(unsafe { libc::syscall(SYS_JAIL, request as *const RawJail<'_>) })
    }

    fn jail_set(&self, iov: &mut [libc::iovec], flags: JailFlags) -> Result<Jid, Errno> {
        check(unsafe {
            libc::syscall(
                SYS_JAIL_SET,
                iov.as_mut_ptr(),
                iov.len() as libc::c_uint,
                flags.bits(),
            )
        })
    }

    fn jail_get(&self, iov: &mut [libc::iovec], flags: JailFlags) -> Result<Jid, Errno> {
        check(unsafe {
            libc::syscall(
                SYS_JAIL_GET,
                iov.as_mut_ptr(),
                iov.len() as libc::c_uint,
                flags.bits(),
            )
        })
    }

    fn jail_attach(&self, jid: Jid) -> Result<(), Errno> {
        check(unsafe { libc::syscall(SYS_JAIL_ATTACH, jid) }).map(drop)
    }

    fn jail_remove(&self, jid: Jid) -> Result<(), Errno> {
        check(unsafe { libc::syscall(SYS_JAIL_REMOVE, jid) }).map(drop)
    }
}

#[cfg(not(target_os = "freebsd"))]
impl Kernel for HostKernel {
    fn jail(&self, _request: &RawJail<'_>) -> Result<Jid, Errno> {
        Err(Errno::ENOSYS)
    }

    fn jail_set(&self, _iov: &mut [libc::iovec], _flags: JailFlags) -> Result<Jid, Errno> {
        Err(Errno::ENOSYS)
    }

    fn jail_get(&self, _iov: &mut [libc::iovec], _flags: JailFlags) -> Result<Jid, Errno> {
        Err(Errno::ENOSYS)
    }

    fn jail_attach(&self, _jid: Jid) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    fn jail_remove(&self, _jid: Jid) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }
}
