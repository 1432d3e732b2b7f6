//! Error types for jailbind
//!
//! Two classes of failure exist. Local validation errors are raised before
//! any system call and never reach the kernel. Kernel errors carry a
//! condition scoped to the call family that produced them, because the
//! jail syscalls reuse the same errno values for unrelated conditions
//! (`ENOENT` is a missing path for `jail(2)` but a missing jail for
//! `jail_get(2)`).

use nix::errno::Errno;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::jail::Jid;

/// Main error type for jailbind operations
#[derive(Error, Debug)]
pub enum Error {
    // Local validation
    #[error("Invalid jail options: {0}")]
    InvalidOptions(String),

    #[error("Invalid parameter name: {0}")]
    InvalidParameterName(String),

    #[error("Parameter '{0}' is already set")]
    DuplicateParameter(String),

    #[error("Unsupported value for parameter '{name}': expected {expected}, got {actual}")]
    UnsupportedParameterType {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid IPv4 address '{0}'")]
    InvalidIpv4(String),

    #[error("Flags {flags:#x} are not accepted by {family}")]
    UnsupportedFlags { family: CallFamily, flags: i32 },

    #[error("String contains an interior NUL byte: {0}")]
    InteriorNul(#[from] std::ffi::NulError),

    // Kernel
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("Malformed result from jail_get: {0}")]
    MalformedResult(String),

    #[error("Jail {jid} created but chdir to its root failed: {source}")]
    Chdir { jid: Jid, source: Errno },

    // Config
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation failed: {0}")]
    ConfigValidation(String),

    #[error("Parameter allow-list has already been installed")]
    RegistryInstalled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// True for failures detected locally, before any system call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidOptions(_)
                | Error::InvalidParameterName(_)
                | Error::DuplicateParameter(_)
                | Error::UnsupportedParameterType { .. }
                | Error::InvalidIpv4(_)
                | Error::UnsupportedFlags { .. }
                | Error::InteriorNul(_)
        )
    }

    /// The kernel error, if this failure came from a system call
    pub fn kernel(&self) -> Option<&KernelError> {
        match self {
            Error::Kernel(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for jailbind operations
pub type Result<T> = std::result::Result<T, Error>;

/// The syscall family whose errno table applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallFamily {
    /// `jail(2)`
    Create,
    /// `jail_set(2)`
    Set,
    /// `jail_get(2)`
    Get,
    /// `jail_attach(2)` and `jail_remove(2)`
    AttachRemove,
}

impl fmt::Display for CallFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFamily::Create => write!(f, "jail"),
            CallFamily::Set => write!(f, "jail_set"),
            CallFamily::Get => write!(f, "jail_get"),
            CallFamily::AttachRemove => write!(f, "jail_attach/jail_remove"),
        }
    }
}

/// Failure conditions of `jail(2)`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateFailure {
    /// [EPERM] Not the super-user, or children.max would be exceeded.
    #[error("not permitted to create a jail")]
    PermissionDenied,
    /// [EFAULT] The request points outside the process address space.
    #[error("request points outside the allocated address space")]
    Fault,
    /// [EINVAL] The request's version number is not correct.
    #[error("invalid jail API version")]
    InvalidVersion,
    /// [EAGAIN] No free JID could be found.
    #[error("no free JID found")]
    NoFreeJid,
    /// [ENOENT] A component of the path does not exist, or the path is empty.
    #[error("no such file or directory")]
    NoSuchFileOrDirectory,
    /// [EEXIST] A jail with the requested name already exists.
    #[error("a jail with this name already exists")]
    AlreadyExists,
}

/// Failure conditions of `jail_set(2)`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetFailure {
    /// [EPERM] Not allowed, or a parameter is less restrictive than the current environment.
    #[error("not allowed or restricted")]
    NotAllowed,
    /// [EFAULT]
    #[error("iovec points outside the allocated address space")]
    Fault,
    /// [ENOENT] The referenced jail does not exist (and CREATE is not set) or is not accessible.
    #[error("jail does not exist or is not accessible")]
    NoSuchJail,
    /// [EEXIST] The referenced jail exists and UPDATE is not set.
    #[error("jail exists and the update flag is not set")]
    UpdateFlagNotSet,
    /// [EINVAL] Wrong size, out of range, unterminated, unknown, or neither CREATE nor UPDATE.
    #[error("invalid parameter")]
    InvalidParameter,
    /// [ENAMETOOLONG]
    #[error("string parameter too long")]
    NameTooLong,
    /// [EAGAIN]
    #[error("no JIDs left")]
    NoIdsLeft,
}

/// Failure conditions of `jail_get(2)`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetFailure {
    /// [EFAULT]
    #[error("iovec points outside the allocated address space")]
    Fault,
    /// [ENOENT] No such jail, not accessible, or lastjid beyond the highest JID.
    #[error("jail does not exist or is inaccessible")]
    NoSuchJail,
    /// [EINVAL] Wrong size or unknown parameter name.
    #[error("invalid parameter")]
    InvalidParameter,
}

/// Failure conditions of `jail_attach(2)` and `jail_remove(2)`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachFailure {
    /// [EPERM]
    #[error("unprivileged user")]
    Unprivileged,
    /// [EINVAL]
    #[error("JID does not exist")]
    NoSuchJid,
}

/// A failed jail system call, scoped to its call family
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("jail: {condition} ({errno})")]
    Create {
        condition: CreateFailure,
        errno: Errno,
    },

    #[error("jail_set: {condition} ({errno}){}", message_suffix(.message))]
    Set {
        condition: SetFailure,
        errno: Errno,
        message: Option<String>,
    },

    #[error("jail_get: {condition} ({errno}){}", message_suffix(.message))]
    Get {
        condition: GetFailure,
        errno: Errno,
        message: Option<String>,
    },

    #[error("jail_attach/jail_remove: {condition} ({errno})")]
    AttachRemove {
        condition: AttachFailure,
        errno: Errno,
    },

    #[error("{family}: kernel error {}{}", raw(.errno), message_suffix(.message))]
    Other {
        family: CallFamily,
        errno: Errno,
        message: Option<String>,
    },
}

fn raw(errno: &Errno) -> i32 {
    *errno as i32
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(": {}", m),
        _ => String::new(),
    }
}

impl KernelError {
    /// The errno the kernel reported
    pub fn errno(&self) -> Errno {
        match self {
            KernelError::Create { errno, .. }
            | KernelError::Set { errno, .. }
            | KernelError::Get { errno, .. }
            | KernelError::AttachRemove { errno, .. }
            | KernelError::Other { errno, .. } => *errno,
        }
    }

    /// The raw errno number
    pub fn raw_code(&self) -> i32 {
        self.errno() as i32
    }

    pub fn family(&self) -> CallFamily {
        match self {
            KernelError::Create { .. } => CallFamily::Create,
            KernelError::Set { .. } => CallFamily::Set,
            KernelError::Get { .. } => CallFamily::Get,
            KernelError::AttachRemove { .. } => CallFamily::AttachRemove,
            KernelError::Other { family, .. } => *family,
        }
    }

    /// The `errmsg` text the kernel wrote, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            KernelError::Set { message, .. }
            | KernelError::Get { message, .. }
            | KernelError::Other { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Attach the kernel's `errmsg` text.
    ///
    /// Only the set/get families (and unrecognized codes) carry one; `jail(2)`
    /// and `jail_attach(2)`/`jail_remove(2)` have no errmsg channel.
    pub fn with_message(mut self, text: Option<String>) -> Self {
        match &mut self {
            KernelError::Set { message, .. }
            | KernelError::Get { message, .. }
            | KernelError::Other { message, .. } => *message = text.filter(|t| !t.is_empty()),
            _ => {}
        }
        self
    }
}

/// Map an errno to the named condition of the given call family
pub fn translate(family: CallFamily, errno: Errno) -> KernelError {
    let other = KernelError::Other {
        family,
        errno,
        message: None,
    };

    match family {
        CallFamily::Create => {
            let condition = match errno {
                Errno::EPERM => CreateFailure::PermissionDenied,
                Errno::EFAULT => CreateFailure::Fault,
                Errno::EINVAL => CreateFailure::InvalidVersion,
                Errno::EAGAIN => CreateFailure::NoFreeJid,
                Errno::ENOENT => CreateFailure::NoSuchFileOrDirectory,
                Errno::EEXIST => CreateFailure::AlreadyExists,
                _ => return other,
            };
            KernelError::Create { condition, errno }
        }
        CallFamily::Set => {
            let condition = match errno {
                Errno::EPERM => SetFailure::NotAllowed,
                Errno::EFAULT => SetFailure::Fault,
                Errno::ENOENT => SetFailure::NoSuchJail,
                Errno::EEXIST => SetFailure::UpdateFlagNotSet,
                Errno::EINVAL => SetFailure::InvalidParameter,
                Errno::ENAMETOOLONG => SetFailure::NameTooLong,
                Errno::EAGAIN => SetFailure::NoIdsLeft,
                _ => return other,
            };
            KernelError::Set {
                condition,
                errno,
                message: None,
            }
        }
        CallFamily::Get => {
            let condition = match errno {
                Errno::EFAULT => GetFailure::Fault,
                Errno::ENOENT => GetFailure::NoSuchJail,
                Errno::EINVAL => GetFailure::InvalidParameter,
                _ => return other,
            };
            KernelError::Get {
                condition,
                errno,
                message: None,
            }
        }
        CallFamily::AttachRemove => {
            let condition = match errno {
                Errno::EPERM => AttachFailure::Unprivileged,
                Errno::EINVAL => AttachFailure::NoSuchJid,
                _ => return other,
            };
            KernelError::AttachRemove { condition, errno }
        }
    }
}

/// Same as [`translate`], starting from a raw errno number
pub fn translate_raw(family: CallFamily, code: i32) -> KernelError {
    translate(family, Errno::from_raw(code))
}
