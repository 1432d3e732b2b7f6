//! Jail management module
//!
//! This module provides:
//! - FFI bindings to FreeBSD jail syscalls
//! - Type-safe parameter handling and marshaling
//! - Lifecycle operations: create, clone, set, get, attach, remove
//! - Name/JID lookup

pub mod ffi;
pub mod marshal;
pub mod ops;
pub mod options;
pub mod params;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use ffi::{HostKernel, JAIL_API_VERSION, JailFlags, Jid, Kernel, RawJail};
pub use marshal::{Direction, IoVecArena};
pub use ops::{Jailer, attach, clone, create, get, remove, resolve_id, resolve_name, set};
pub use options::{JailHandle, JailOptions};
pub use params::{BUILTIN_PARAMS, ParamRegistry, ParamSet};
pub use types::{ParamKind, ParamValue};
