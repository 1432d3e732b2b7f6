//! In-memory stand-in for the jail syscalls
//!
//! Understands the same request layout and iovec conventions as the real
//! kernel for the parameters this crate allows, and counts every call.

use nix::errno::Errno;
use std::cell::RefCell;
use std::collections::HashSet;
use std::ffi::{CStr, c_char};
use std::ptr;
use std::slice;

use super::ffi::{JAIL_API_VERSION, JailFlags, Jid, Kernel, RawJail};
use crate::network::InAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FakeJail {
    pub jid: Jid,
    pub name: String,
    pub path: String,
    pub hostname: String,
    pub ip4: Vec<InAddr>,
    pub persist: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Calls {
    pub jail: usize,
    pub set: usize,
    pub get: usize,
    pub attach: usize,
    pub remove: usize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.jail + self.set + self.get + self.attach + self.remove
    }
}

/// How `jail_get` fills the slots of a jail it found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum GetReply {
    #[default]
    Full,
    /// Succeed, but report JID 0 and empty strings
    Empty,
    /// Succeed, but write only two bytes into int slots
    ShortInts,
}

#[derive(Debug)]
struct State {
    jails: Vec<FakeJail>,
    next_jid: Jid,
    paths: HashSet<String>,
    privileged: bool,
    attached: Option<Jid>,
    get_reply: GetReply,
    calls: Calls,
}

#[derive(Debug)]
pub(crate) struct FakeKernel {
    state: RefCell<State>,
}

impl FakeKernel {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                jails: Vec::new(),
                next_jid: 1,
                paths: HashSet::new(),
                privileged: true,
                attached: None,
                get_reply: GetReply::Full,
                calls: Calls::default(),
            }),
        }
    }

    /// Make a directory "exist" for jail(2)
    pub fn with_path(self, path: &str) -> Self {
        self.state.borrow_mut().paths.insert(path.to_string());
        self
    }

    pub fn unprivileged(self) -> Self {
        self.state.borrow_mut().privileged = false;
        self
    }

    pub fn get_reply(self, reply: GetReply) -> Self {
        self.state.borrow_mut().get_reply = reply;
        self
    }

    pub fn calls(&self) -> Calls {
        self.state.borrow().calls
    }

    pub fn jail(&self, jid: Jid) -> Option<FakeJail> {
        self.state
            .borrow()
            .jails
            .iter()
            .find(|j| j.jid == jid)
            .cloned()
    }

    pub fn attached(&self) -> Option<Jid> {
        self.state.borrow().attached
    }
}

struct Pair<'a> {
    name: String,
    iov: &'a mut libc::iovec,
}

fn pairs(iov: &mut [libc::iovec]) -> Result<Vec<Pair<'_>>, Errno> {
    if iov.len() % 2 != 0 {
        return Err(Errno::EINVAL);
    }
    let mut out = Vec::new();
    for chunk in iov.chunks_mut(2) {
        let [key, value] = chunk else {
            return Err(Errno::EINVAL);
        };
        if key.iov_base.is_null() {
            return Err(Errno::EFAULT);
        }
        let name = unsafe { CStr::from_ptr(key.iov_base as *const c_char) }
            .to_string_lossy()
            .into_owned();
        out.push(Pair { name, iov: value });
    }
    Ok(out)
}

fn bytes<'a>(iov: &libc::iovec) -> &'a [u8] {
    if iov.iov_base.is_null() {
        return &[];
    }
    unsafe { slice::from_raw_parts(iov.iov_base as *const u8, iov.iov_len) }
}

fn write(iov: &mut libc::iovec, data: &[u8]) -> Result<(), Errno> {
    if iov.iov_base.is_null() || iov.iov_len < data.len() {
        return Err(Errno::EINVAL);
    }
    unsafe { ptr::copy_nonoverlapping(data.as_ptr(), iov.iov_base as *mut u8, data.len()) };
    iov.iov_len = data.len();
    Ok(())
}

fn report(pairs: &mut [Pair<'_>], message: &str) {
    if let Some(slot) = pairs.iter_mut().find(|p| p.name == "errmsg") {
        let mut text = message.as_bytes().to_vec();
        text.push(0);
        let _ = write(slot.iov, &text);
    }
}

fn read_int(data: &[u8]) -> Result<i32, Errno> {
    let raw: [u8; 4] = data.try_into().map_err(|_| Errno::EINVAL)?;
    Ok(i32::from_ne_bytes(raw))
}

fn read_str(data: &[u8]) -> Result<String, Errno> {
    let text = CStr::from_bytes_until_nul(data).map_err(|_| Errno::EINVAL)?;
    Ok(text.to_string_lossy().into_owned())
}

impl State {
    /// Find the jail named by a `jid` or `name` key, as jail_get/jail_set do
    fn lookup(&self, pairs: &[Pair<'_>]) -> Result<Option<usize>, Errno> {
        if let Some(p) = pairs.iter().find(|p| p.name == "jid") {
            let jid = read_int(bytes(&*p.iov))?;
            if jid != 0 {
                return Ok(self.jails.iter().position(|j| j.jid == jid));
            }
        }
        if let Some(p) = pairs.iter().find(|p| p.name == "name") {
            let name = read_str(bytes(&*p.iov))?;
            return Ok(self.jails.iter().position(|j| j.name == name));
        }
        Err(Errno::ENOENT)
    }
}

impl Kernel for FakeKernel {
    fn jail(&self, request: &RawJail<'_>) -> Result<Jid, Errno> {
        let mut state = self.state.borrow_mut();
        state.calls.jail += 1;

        if !state.privileged {
            return Err(Errno::EPERM);
        }
        if request.version != JAIL_API_VERSION {
            return Err(Errno::EINVAL);
        }
        if request.path.is_null() || request.jailname.is_null() || request.hostname.is_null() {
            return Err(Errno::EFAULT);
        }
        let text = |p: *const c_char| unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned();
        let path = text(request.path);
        let name = text(request.jailname);
        let hostname = text(request.hostname);
        let ip4 = if request.ip4s == 0 {
            Vec::new()
        } else {
            unsafe { slice::from_raw_parts(request.ip4, request.ip4s as usize) }.to_vec()
        };

        if path.is_empty() || !state.paths.contains(&path) {
            return Err(Errno::ENOENT);
        }
        if state.jails.iter().any(|j| j.name == name) {
            return Err(Errno::EEXIST);
        }

        let jid = state.next_jid;
        state.next_jid += 1;
        state.jails.push(FakeJail {
            jid,
            name,
            path,
            hostname,
            ip4,
            persist: false,
        });
        state.attached = Some(jid);
        Ok(jid)
    }

    fn jail_set(&self, iov: &mut [libc::iovec], flags: JailFlags) -> Result<Jid, Errno> {
        let mut state = self.state.borrow_mut();
        state.calls.set += 1;

        if !state.privileged {
            return Err(Errno::EPERM);
        }
        let mut pairs = pairs(iov)?;
        let unknown = pairs
            .iter()
            .find(|p| !matches!(p.name.as_str(), "jid" | "name" | "persist" | "nopersist" | "errmsg"))
            .map(|p| p.name.clone());
        if let Some(name) = unknown {
            report(&mut pairs, &format!("unknown parameter: {}", name));
            return Err(Errno::EINVAL);
        }
        if !flags.intersects(JailFlags::CREATE | JailFlags::UPDATE) {
            return Err(Errno::EINVAL);
        }

        let index = match state.lookup(&pairs)? {
            Some(index) if flags.contains(JailFlags::UPDATE) => index,
            Some(_) => return Err(Errno::EEXIST),
            None => {
                report(&mut pairs, "jail not found");
                return Err(Errno::ENOENT);
            }
        };

        for p in &pairs {
            match p.name.as_str() {
                "persist" => state.jails[index].persist = true,
                "nopersist" => state.jails[index].persist = false,
                _ => {}
            }
        }
        if flags.contains(JailFlags::ATTACH) {
            state.attached = Some(state.jails[index].jid);
        }
        Ok(state.jails[index].jid)
    }

    fn jail_get(&self, iov: &mut [libc::iovec], _flags: JailFlags) -> Result<Jid, Errno> {
        let mut state = self.state.borrow_mut();
        state.calls.get += 1;

        let mut pairs = pairs(iov)?;
        let Some(index) = state.lookup(&pairs)? else {
            report(&mut pairs, "jail not found");
            return Err(Errno::ENOENT);
        };
        let mut jail = state.jails[index].clone();
        let reply = state.get_reply;
        if reply == GetReply::Empty {
            jail.jid = 0;
            jail.name.clear();
        }
        let int = |v: i32| {
            let bytes = v.to_ne_bytes();
            match reply {
                GetReply::ShortInts => bytes[..2].to_vec(),
                _ => bytes.to_vec(),
            }
        };

        for p in pairs.iter_mut() {
            match p.name.as_str() {
                "jid" => write(p.iov, &int(jail.jid))?,
                "name" => {
                    let mut text = jail.name.as_bytes().to_vec();
                    text.push(0);
                    write(p.iov, &text)?
                }
                "persist" => write(p.iov, &int(i32::from(jail.persist)))?,
                "nopersist" => write(p.iov, &int(i32::from(!jail.persist)))?,
                "dying" => write(p.iov, &int(0))?,
                "errmsg" => {}
                _ => return Err(Errno::EINVAL),
            }
        }
        Ok(jail.jid)
    }

    fn jail_attach(&self, jid: Jid) -> Result<(), Errno> {
        let mut state = self.state.borrow_mut();
        state.calls.attach += 1;

        if !state.privileged {
            return Err(Errno::EPERM);
        }
        if !state.jails.iter().any(|j| j.jid == jid) {
            return Err(Errno::EINVAL);
        }
        state.attached = Some(jid);
        Ok(())
    }

    fn jail_remove(&self, jid: Jid) -> Result<(), Errno> {
        let mut state = self.state.borrow_mut();
        state.calls.remove += 1;

        if !state.privileged {
            return Err(Errno::EPERM);
        }
        let Some(index) = state.jails.iter().position(|j| j.jid == jid) else {
            return Err(Errno::EINVAL);
        };
        state.jails.remove(index);
        Ok(())
    }
}
