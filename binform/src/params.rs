//! The parameter system: accepted-parameter declarations and the sanitized
//! bundle that comes out the other end of the [`crate::sanitize`] pass.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::eval::EvalContext;
use crate::value::Value;
use crate::{Error, Result};

/// Names that are never valid as a user parameter because they would shadow
/// a method the lazy evaluator or the node model exposes universally.
/// `type` is the one universally-permitted exception spec.md calls out.
pub const RESERVED_NAMES: &[&str] = &[
    "index", "parent", "offset", "read", "write", "assign", "clear", "snapshot", "num_bytes",
];

pub fn is_reserved(name: &str) -> bool {
    name != "type" && RESERVED_NAMES.contains(&name)
}

/// A parameter value before or after sanitization: either a literal, a
/// symbolic reference resolved against the live parent chain, or a deferred
/// expression evaluated in a node's context.
#[derive(Clone)]
pub enum ParamValue {
    Literal(Value),
    Symbol(String),
    Deferred(DeferredExpr),
}

/// A closure representing a user expression that references sibling fields.
/// This is the Rust realization of "an expression builder, or a function
/// object that takes a lookup environment" called for by the design notes:
/// bare names inside resolve through the [`EvalContext`] passed in.
#[derive(Clone)]
pub struct DeferredExpr(pub Arc<dyn Fn(&EvalContext) -> Result<Value> + Send + Sync>);

impl DeferredExpr {
    pub fn new(f: impl Fn(&EvalContext) -> Result<Value> + Send + Sync + 'static) -> Self {
        DeferredExpr(Arc::new(f))
    }
}

impl ParamValue {
    pub fn literal(v: impl Into<Value>) -> Self {
        ParamValue::Literal(v.into())
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        ParamValue::Symbol(name.into())
    }

    pub fn deferred(f: impl Fn(&EvalContext) -> Result<Value> + Send + Sync + 'static) -> Self {
        ParamValue::Deferred(DeferredExpr::new(f))
    }
}

/// A per-class declaration of the four disjoint parameter sets from
/// spec.md §4.1.
#[derive(Clone, Default)]
pub struct AcceptedParameters {
    pub mandatory: HashSet<&'static str>,
    pub optional: HashSet<&'static str>,
    pub defaults: BTreeMap<&'static str, ParamValue>,
    pub mutually_exclusive: Vec<(&'static str, &'static str)>,
}

impl AcceptedParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a mandatory parameter. Fails at schema-definition time if the
    /// name shadows a reserved identifier.
    pub fn mandatory(mut self, name: &'static str) -> Result<Self> {
        if is_reserved(name) {
            return Err(Error::InvalidName(name.to_owned()));
        }
        self.mandatory.insert(name);
        Ok(self)
    }

    pub fn optional(mut self, name: &'static str) -> Result<Self> {
        if is_reserved(name) {
            return Err(Error::InvalidName(name.to_owned()));
        }
        self.optional.insert(name);
        Ok(self)
    }

    pub fn default_value(mut self, name: &'static str, value: ParamValue) -> Result<Self> {
        if is_reserved(name) {
            return Err(Error::InvalidName(name.to_owned()));
        }
        self.optional.insert(name);
        self.defaults.insert(name, value);
        Ok(self)
    }

    pub fn mutually_exclusive(mut self, a: &'static str, b: &'static str) -> Self {
        self.mutually_exclusive.push((a, b));
        self
    }

    /// Inheritance: a subclass starts with the parent's four sets copied,
    /// then accumulates its own additions. Sets are deduplicated by virtue
    /// of being backed by `HashSet`/`BTreeMap`.
    pub fn extend_from(mut self, parent: &AcceptedParameters) -> Self {
        self.mandatory.extend(parent.mandatory.iter().copied());
        self.optional.extend(parent.optional.iter().copied());
        for (k, v) in &parent.defaults {
            self.defaults.entry(k).or_insert_with(|| v.clone());
        }
        for pair in &parent.mutually_exclusive {
            if !self.mutually_exclusive.contains(pair) {
                self.mutually_exclusive.push(*pair);
            }
        }
        self
    }
}

/// The standard parameter surface every node kind accepts, per spec.md
/// §4.4/§6: `initial_value`, `value`, `check_value`, `onlyif`,
/// `check_offset`, `adjust_offset`.
pub fn common_parameters() -> AcceptedParameters {
    AcceptedParameters::new()
        .optional("initial_value")
        .and_then(|p| p.optional("value"))
        .and_then(|p| p.optional("check_value"))
        .and_then(|p| p.optional("onlyif"))
        .and_then(|p| p.optional("check_offset"))
        .and_then(|p| p.optional("adjust_offset"))
        .map(|p| p.mutually_exclusive("check_offset", "adjust_offset"))
        .expect("common parameter names are not reserved")
}

/// The output of sanitization: a closed, validated parameter bundle. Every
/// value is either a literal, a symbol, or a deferred expression — nil is
/// never a valid entry, enforced by the sanitizer before this type is built.
#[derive(Clone, Default)]
pub struct SanitizedParameters {
    pub all_sanitized: bool,
    values: BTreeMap<String, ParamValue>,
}

impl SanitizedParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|s| s.as_str())
    }
}
