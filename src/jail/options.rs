//! Jail creation options and the handle returned by a successful create

use crate::error::{Error, Result};
use crate::network::InAddr;
use serde::Deserialize;
use std::ffi::CString;

use super::ffi::{JAIL_API_VERSION, Jid, RawJail};

fn default_version() -> u32 {
    JAIL_API_VERSION
}

/// Options for creating a jail with `jail(2)`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JailOptions {
    /// API version embedded in the request
    #[serde(default = "default_version")]
    pub version: u32,
    /// Root directory of the jail
    pub path: String,
    /// Jail name
    pub name: String,
    /// Hostname inside the jail
    #[serde(default)]
    pub hostname: String,
    /// Single IPv4 address in dotted-decimal form
    #[serde(default)]
    pub ipv4: Option<String>,
    /// chdir("/") after the jail is created
    #[serde(default, alias = "chdir")]
    pub chdir_on_success: bool,
}

impl JailOptions {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            version: JAIL_API_VERSION,
            path: path.into(),
            name: name.into(),
            hostname: String::new(),
            ipv4: None,
            chdir_on_success: false,
        }
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn ipv4(mut self, addr: impl Into<String>) -> Self {
        self.ipv4 = Some(addr.into());
        self
    }

    pub fn chdir(mut self, chdir: bool) -> Self {
        self.chdir_on_success = chdir;
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Check the fields that must be present before calling the kernel
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::InvalidOptions("missing path".into()));
        }
        if self.name.is_empty() {
            return Err(Error::InvalidOptions("missing name".into()));
        }
        Ok(())
    }
}

/// Owned copy of everything a `jail(2)` request points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CreateRequest {
    pub version: u32,
    pub path: CString,
    pub name: CString,
    pub hostname: CString,
    pub ip4: Vec<InAddr>,
}

impl CreateRequest {
    pub fn from_options(opts: &JailOptions) -> Result<Self> {
        opts.validate()?;

        let ip4 = match opts.ipv4.as_deref() {
            Some(addr) if !addr.is_empty() => vec![InAddr::parse(addr)?],
            _ => Vec::new(),
        };

        Ok(Self {
            version: opts.version,
            path: CString::new(opts.path.as_str())?,
            name: CString::new(opts.name.as_str())?,
            hostname: CString::new(opts.hostname.as_str())?,
            ip4,
        })
    }

    /// Same version, path, name, and hostname; no addresses
    pub fn clone_identity(&self) -> Self {
        Self {
            version: self.version,
            path: self.path.clone(),
            name: self.name.clone(),
            hostname: self.hostname.clone(),
            ip4: Vec::new(),
        }
    }

    pub fn raw(&self) -> RawJail<'_> {
        RawJail::new(
            self.version,
            &self.path,
            &self.hostname,
            &self.name,
            &self.ip4,
        )
    }
}

/// A jail created through this crate
///
/// Holds the JID together with the request that produced it, so the jail
/// can be cloned. The handle is not kept in sync with the kernel; query
/// with `get` for current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailHandle {
    jid: Jid,
    request: CreateRequest,
}

impl JailHandle {
    pub(crate) fn new(jid: Jid, request: CreateRequest) -> Self {
        Self { jid, request }
    }

    pub fn jid(&self) -> Jid {
        self.jid
    }

    pub fn version(&self) -> u32 {
        self.request.version
    }

    pub fn path(&self) -> &str {
        self.request.path.to_str().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.request.name.to_str().unwrap_or_default()
    }

    pub fn hostname(&self) -> &str {
        self.request.hostname.to_str().unwrap_or_default()
    }

    pub(crate) fn request(&self) -> &CreateRequest {
        &self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_path_and_name() {
        assert!(JailOptions::new("/jails/a", "a").validate().is_ok());
        assert!(matches!(
            JailOptions::new("", "a").validate(),
            Err(Error::InvalidOptions(ref m)) if m == "missing path"
        ));
        assert!(matches!(
            JailOptions::new("/jails/a", "").validate(),
            Err(Error::InvalidOptions(ref m)) if m == "missing name"
        ));
    }

    #[test]
    fn test_request_encodes_single_address() {
        let opts = JailOptions::new("/jails/a", "a")
            .hostname("a.local")
            .ipv4("192.168.0.200");
        let request = CreateRequest::from_options(&opts).unwrap();
        assert_eq!(request.ip4, vec![InAddr::parse("192.168.0.200").unwrap()]);

        let raw = request.raw();
        assert_eq!(raw.version, JAIL_API_VERSION);
        assert_eq!(raw.ip4s, 1);
        assert_eq!(raw.hostname, request.hostname.as_ptr());
        assert_eq!(raw.jailname, request.name.as_ptr());
    }

    #[test]
    fn test_request_rejects_bad_address() {
        let opts = JailOptions::new("/jails/a", "a").ipv4("300.1.1.1");
        assert!(matches!(
            CreateRequest::from_options(&opts),
            Err(Error::InvalidIpv4(_))
        ));
    }

    #[test]
    fn test_clone_identity_drops_addresses() {
        let opts = JailOptions::new("/jails/a", "a").ipv4("10.0.0.1");
        let request = CreateRequest::from_options(&opts).unwrap();
        let copy = request.clone_identity();
        assert_eq!(copy.name, request.name);
        assert!(copy.ip4.is_empty());
        assert_ne!(copy.path.as_ptr(), request.path.as_ptr());
    }

    #[test]
    fn test_options_from_toml() {
        let opts: JailOptions = toml::from_str(
            r#"
            path = "/zroot/jails/build"
            name = "jailname"
            hostname = "hostname"
            ipv4 = "192.168.0.200"
            chdir = true
            "#,
        )
        .unwrap();
        assert_eq!(opts.version, JAIL_API_VERSION);
        assert!(opts.chdir_on_success);
        assert_eq!(opts.ipv4.as_deref(), Some("192.168.0.200"));
    }
}
