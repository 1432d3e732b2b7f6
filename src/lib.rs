//! jailbind - typed bindings to the FreeBSD jail syscalls
//!
//! Creates, clones, queries, attaches to, and removes jails. Named, typed
//! parameters are marshaled into the iovec convention `jail_set(2)` and
//! `jail_get(2)` expect, and kernel errno values are translated into
//! per-call-family error conditions.
//!
//! ```no_run
//! use jailbind::jail::{JailOptions, Jailer};
//!
//! let jailer = Jailer::host();
//! let opts = JailOptions::new("/zroot/jails/build", "build")
//!     .hostname("build.local")
//!     .ipv4("192.168.0.200");
//! let handle = jailer.create(&opts)?;
//! assert_eq!(jailer.resolve_id("build")?, handle.jid());
//! # Ok::<(), jailbind::Error>(())
//! ```

pub mod error;
pub mod jail;
pub mod manifest;
pub mod network;

pub use error::{CallFamily, Error, KernelError, Result, translate, translate_raw};
