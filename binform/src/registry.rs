//! Process-*local* (never process-wide — see §9's design note against hidden
//! global state) mapping from `(type-name, endian?)` to a constructor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::params::AcceptedParameters;
use crate::params::SanitizedParameters;
use crate::tree::{Document, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn parse(s: &str) -> Result<Endian> {
        match s {
            "little" => Ok(Endian::Little),
            "big" => Ok(Endian::Big),
            other => Err(Error::UnknownEndian(other.to_owned())),
        }
    }
}

pub type BuildFn =
    dyn Fn(&mut Document, Option<NodeId>, SanitizedParameters) -> Result<NodeId> + Send + Sync;

/// A registered type: its accepted-parameter declarations, plus the function
/// that allocates a live node for it in a [`Document`].
pub struct TypeConstructor {
    pub name: String,
    pub endian: Option<Endian>,
    pub accepted: AcceptedParameters,
    pub build: Arc<BuildFn>,
}

#[derive(Default, Clone)]
pub struct Registry {
    entries: HashMap<(String, Option<Endian>), Arc<TypeConstructor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, ctor: TypeConstructor) {
        self.entries
            .insert((ctor.name.clone(), ctor.endian), Arc::new(ctor));
    }

    pub fn lookup(&self, name: &str, endian: Option<Endian>) -> Result<Arc<TypeConstructor>> {
        self.entries
            .get(&(name.to_owned(), endian))
            .or_else(|| self.entries.get(&(name.to_owned(), None)))
            .cloned()
            .ok_or_else(|| Error::UnknownType(name.to_owned()))
    }

    /// Builds a registry pre-populated with this crate's reference codec
    /// set: byte/bit integers, floats, fixed and zero-terminated strings,
    /// plus the `skip`/`rest` leaves from §4.10.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::primitive::register_builtins(&mut reg);
        crate::leaves::register_builtins(&mut reg);
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_the_endian_agnostic_entry() {
        let reg = Registry::with_builtins();
        // "u8" is registered with endian = None; asking for it under a
        // specific endian should still resolve via the fallback.
        assert!(reg.lookup("u8", Some(Endian::Little)).is_ok());
        assert!(reg.lookup("u8", None).is_ok());
    }

    #[test]
    fn lookup_does_not_fall_back_across_unrelated_names() {
        let reg = Registry::with_builtins();
        let err = reg.lookup("u32", None).unwrap_err();
        assert!(matches!(err, Error::UnknownType(_)));
    }

    #[test]
    fn endian_parse_rejects_unknown_strings() {
        assert!(matches!(Endian::parse("middle"), Err(Error::UnknownEndian(_))));
        assert_eq!(Endian::parse("little").unwrap(), Endian::Little);
    }
}
