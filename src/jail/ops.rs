//! Jail lifecycle operations
//!
//! Every operation is one synchronous syscall. Inputs are validated and
//! marshaled first; kernel failures are translated with the errno table of
//! the call family that produced them. Nothing is retried and no jail
//! state is cached between calls.

use crate::error::{CallFamily, Error, Result, translate};
use nix::errno::Errno;

use super::ffi::{HostKernel, JailFlags, Jid, Kernel};
use super::marshal::{Direction, IoVecArena};
use super::options::{CreateRequest, JailHandle, JailOptions};
use super::params::ParamSet;
use super::types::ParamValue;

/// Jail operations bound to a kernel implementation
#[derive(Debug, Clone, Default)]
pub struct Jailer<K: Kernel = HostKernel> {
    kernel: K,
}

impl Jailer<HostKernel> {
    /// Operations against the running kernel
    pub fn host() -> Self {
        Self { kernel: HostKernel }
    }
}

impl<K: Kernel> Jailer<K> {
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Create a jail and attach the calling process to it
    ///
    /// With `chdir_on_success` set, the process working directory moves to
    /// the jail root afterwards. That is a process-wide side effect.
    pub fn create(&self, opts: &JailOptions) -> Result<JailHandle> {
        let request = CreateRequest::from_options(opts)?;
        let jid = self.create_request(&request)?;

        if opts.chdir_on_success {
            nix::unistd::chdir("/").map_err(|source| Error::Chdir { jid, source })?;
        }

        tracing::debug!(jid, name = %opts.name, "jail created");
        Ok(JailHandle::new(jid, request))
    }

    /// Create a new, independent jail from an existing handle's version,
    /// path, name, and hostname
    pub fn clone_jail(&self, handle: &JailHandle) -> Result<JailHandle> {
        let request = handle.request().clone_identity();
        let jid = self.create_request(&request)?;

        tracing::debug!(jid, source = handle.jid(), "jail cloned");
        Ok(JailHandle::new(jid, request))
    }

    fn create_request(&self, request: &CreateRequest) -> Result<Jid> {
        tracing::debug!(
            version = request.version,
            path = ?request.path,
            name = ?request.name,
            ip4s = request.ip4.len(),
            "jail(2)"
        );
        let raw = request.raw();
        self.kernel
            .jail(&raw)
            .map_err(|errno| kernel_failure(CallFamily::Create, errno, None))
    }

    /// Create or modify a jail with `jail_set(2)`
    ///
    /// Returns the JID of the jail that was created or updated.
    pub fn set(&self, params: &ParamSet<'_>, flags: JailFlags) -> Result<Jid> {
        check_flags(CallFamily::Set, flags, JailFlags::SET_MASK)?;
        let mut arena = IoVecArena::marshal(params, Direction::Set)?;
        tracing::debug!(flags = flags.bits(), params = params.len(), "jail_set(2)");

        let result = arena.with_iovecs(|iov| self.kernel.jail_set(iov, flags));
        result.map_err(|errno| kernel_failure(CallFamily::Set, errno, arena.errmsg()))
    }

    /// Query a jail with `jail_get(2)`
    ///
    /// The jail is selected by the `jid` or `name` entry. On success every
    /// value in `params` is replaced with what the kernel returned, and the
    /// matched JID (which the kernel reports as the call result) is
    /// recorded under `jid`.
    pub fn get(&self, params: &mut ParamSet<'_>, flags: JailFlags) -> Result<Jid> {
        check_flags(CallFamily::Get, flags, JailFlags::GET_MASK)?;
        let mut arena = IoVecArena::marshal(params, Direction::Get)?;
        tracing::debug!(flags = flags.bits(), params = params.len(), "jail_get(2)");

        let jid = arena
            .with_iovecs(|iov| self.kernel.jail_get(iov, flags))
            .map_err(|errno| kernel_failure(CallFamily::Get, errno, arena.errmsg()))?;

        arena.read_back(params)?;
        params.record_jid(jid);
        Ok(jid)
    }

    /// Attach the calling process to a jail
    pub fn attach(&self, jid: Jid) -> Result<()> {
        tracing::debug!(jid, "jail_attach(2)");
        self.kernel
            .jail_attach(jid)
            .map_err(|errno| kernel_failure(CallFamily::AttachRemove, errno, None))
    }

    /// Remove a jail, killing all of its processes
    pub fn remove(&self, jid: Jid) -> Result<()> {
        tracing::debug!(jid, "jail_remove(2)");
        self.kernel
            .jail_remove(jid)
            .map_err(|errno| kernel_failure(CallFamily::AttachRemove, errno, None))
    }

    /// Clear the persist flag so the jail goes away with its last process
    pub fn clear_persist(&self, jid: Jid) -> Result<()> {
        let mut params = ParamSet::new();
        params.add("jid", jid)?;
        params.add("persist", false)?;
        self.set(&params, JailFlags::UPDATE).map(drop)
    }

    /// JID of the jail with the given name
    pub fn resolve_id(&self, name: &str) -> Result<Jid> {
        let mut params = ParamSet::new();
        params.add("name", name)?;
        self.get(&mut params, JailFlags::empty())?;

        match params.get("jid") {
            Some(ParamValue::Int(jid)) if *jid > 0 => Ok(*jid),
            other => Err(Error::MalformedResult(format!(
                "no jid returned for jail '{}': {:?}",
                name, other
            ))),
        }
    }

    /// Name of the jail with the given JID
    pub fn resolve_name(&self, jid: Jid) -> Result<String> {
        let mut params = ParamSet::new();
        params.add("jid", jid)?;
        // output slot; the kernel only fills parameters that are present
        params.add("name", "")?;
        self.get(&mut params, JailFlags::empty())?;

        match params.get("name") {
            Some(ParamValue::String(name)) if !name.is_empty() => Ok(name.clone()),
            other => Err(Error::MalformedResult(format!(
                "no name returned for jid {}: {:?}",
                jid, other
            ))),
        }
    }

    /// Resolve a jail given either its JID or its name
    ///
    /// Numeric strings are taken as a JID directly.
    pub fn lookup(&self, jail: &str) -> Result<Jid> {
        match jail.parse::<Jid>() {
            Ok(jid) => Ok(jid),
            Err(_) => self.resolve_id(jail),
        }
    }
}

fn check_flags(family: CallFamily, flags: JailFlags, mask: JailFlags) -> Result<()> {
    let extra = flags.difference(mask);
    if extra.is_empty() {
        Ok(())
    } else {
        Err(Error::UnsupportedFlags {
            family,
            flags: extra.bits(),
        })
    }
}

fn kernel_failure(family: CallFamily, errno: Errno, message: Option<String>) -> Error {
    tracing::debug!(%family, %errno, message = message.as_deref(), "jail syscall failed");
    translate(family, errno).with_message(message).into()
}

/// Create a jail on the running kernel and return its JID
pub fn create(opts: &JailOptions) -> Result<Jid> {
    Jailer::host().create(opts).map(|handle| handle.jid())
}

/// Create a copy of an existing jail on the running kernel
pub fn clone(handle: &JailHandle) -> Result<Jid> {
    Jailer::host().clone_jail(handle).map(|handle| handle.jid())
}

pub fn set(params: &ParamSet<'_>, flags: JailFlags) -> Result<Jid> {
    Jailer::host().set(params, flags)
}

pub fn get(params: &mut ParamSet<'_>, flags: JailFlags) -> Result<Jid> {
    Jailer::host().get(params, flags)
}

pub fn attach(jid: Jid) -> Result<()> {
    Jailer::host().attach(jid)
}

pub fn remove(jid: Jid) -> Result<()> {
    Jailer::host().remove(jid)
}

pub fn resolve_id(name: &str) -> Result<Jid> {
    Jailer::host().resolve_id(name)
}

pub fn resolve_name(jid: Jid) -> Result<String> {
    Jailer::host().resolve_name(jid)
}
