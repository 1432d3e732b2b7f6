//! Parameter allow-list and insertion-ordered parameter sets
//!
//! Only parameters named in a [`ParamRegistry`] may be passed to
//! `jail_set(2)`/`jail_get(2)`. The process-wide registry is built once,
//! either from the compiled-in defaults or from configuration installed at
//! startup, and is read-only afterwards.

use crate::error::{Error, Result};
use once_cell::sync::OnceCell;

use super::types::{ParamKind, ParamValue};

/// Parameters every registry accepts
pub const BUILTIN_PARAMS: &[(&str, ParamKind)] = &[
    ("jid", ParamKind::Int),
    ("name", ParamKind::String),
    ("dying", ParamKind::Bool),
    ("persist", ParamKind::Bool),
    ("nopersist", ParamKind::Bool),
];

static GLOBAL_REGISTRY: OnceCell<ParamRegistry> = OnceCell::new();

/// An allow-list of parameter names with their value kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRegistry {
    entries: Vec<(String, ParamKind)>,
}

impl ParamRegistry {
    /// The compiled-in allow-list
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_PARAMS
                .iter()
                .map(|(name, kind)| (name.to_string(), *kind))
                .collect(),
        }
    }

    /// Add a parameter to the allow-list
    ///
    /// Consumes the registry so extension only happens while it is being
    /// built, never after it has been shared.
    pub fn with_param(mut self, name: impl Into<String>, kind: ParamKind) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.contains('\0') {
            return Err(Error::InvalidParameterName(name));
        }
        if self.kind_of(&name).is_some() {
            return Err(Error::DuplicateParameter(name));
        }
        self.entries.push((name, kind));
        Ok(self)
    }

    /// Declared kind of a parameter, or None if it is not allowed
    pub fn kind_of(&self, name: &str) -> Option<ParamKind> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Install this registry as the process-wide allow-list.
    ///
    /// Fails if a registry was already installed or the built-in one was
    /// already handed out.
    pub fn install(self) -> Result<()> {
        GLOBAL_REGISTRY
            .set(self)
            .map_err(|_| Error::RegistryInstalled)
    }

    /// The process-wide allow-list
    pub fn global() -> &'static ParamRegistry {
        GLOBAL_REGISTRY.get_or_init(ParamRegistry::builtin)
    }
}

impl Default for ParamRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Named values passed to `jail_set(2)` or filled in by `jail_get(2)`
///
/// Keys keep their insertion order; the kernel correlates names and values
/// positionally, so the marshaled vector follows the same order.
#[derive(Debug, Clone)]
pub struct ParamSet<'r> {
    registry: &'r ParamRegistry,
    entries: Vec<(String, ParamValue)>,
}

impl ParamSet<'static> {
    /// An empty set checked against the process-wide allow-list
    pub fn new() -> Self {
        Self::with_registry(ParamRegistry::global())
    }
}

impl Default for ParamSet<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> ParamSet<'r> {
    pub fn with_registry(registry: &'r ParamRegistry) -> Self {
        Self {
            registry,
            entries: Vec::new(),
        }
    }

    /// Insert a new parameter
    ///
    /// Fails without touching the set if the name is not allowed or is
    /// already present.
    pub fn add(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<()> {
        if !self.registry.contains(name) {
            return Err(Error::InvalidParameterName(name.to_string()));
        }
        if self.contains(name) {
            return Err(Error::DuplicateParameter(name.to_string()));
        }
        self.entries.push((name.to_string(), value.into()));
        Ok(())
    }

    /// Insert a parameter from its textual form, using the declared kind
    pub fn add_parsed(&mut self, name: &str, raw: &str) -> Result<()> {
        let kind = self
            .registry
            .kind_of(name)
            .ok_or_else(|| Error::InvalidParameterName(name.to_string()))?;
        let value = kind.parse_value(name, raw)?;
        self.add(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn registry(&self) -> &ParamRegistry {
        self.registry
    }

    /// Overwrite the value at a position with what the kernel returned
    pub(crate) fn replace_at(&mut self, index: usize, value: ParamValue) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.1 = value;
        }
    }

    /// Record the JID a successful `jail_get(2)` matched
    pub(crate) fn record_jid(&mut self, jid: i32) {
        match self.entries.iter_mut().find(|(n, _)| n == "jid") {
            Some(entry) => entry.1 = ParamValue::Int(jid),
            None => self.entries.push(("jid".to_string(), ParamValue::Int(jid))),
        }
    }
}
