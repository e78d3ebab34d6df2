//! The sanitizer: the five-step validation pass from spec.md §4.2 that turns
//! a raw parameter declaration plus a [`TypeConstructor`] into a
//! [`SanitizedPrototype`] ready to be instantiated, possibly many times,
//! wherever the schema references it.

use std::sync::Arc;

use crate::params::{AcceptedParameters, ParamValue, SanitizedParameters};
use crate::registry::{Endian, Registry, TypeConstructor};
use crate::tree::{Document, NodeId};
use crate::value::Value;
use crate::{Error, Result};

/// Tracks the ambient endianness a nested declaration inherits, restored
/// around every `with_endian` scope regardless of how that scope exits.
pub struct Sanitizer<'a> {
    pub registry: &'a Registry,
    current_endian: Option<Endian>,
}

impl<'a> Sanitizer<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Sanitizer { registry, current_endian: None }
    }

    pub fn current_endian(&self) -> Option<Endian> {
        self.current_endian
    }

    /// Runs `f` with `endian` as the ambient context, then restores whatever
    /// was ambient before — on every exit path, including an `Err` return.
    pub fn with_endian<T>(&mut self, endian: Endian, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let prev = self.current_endian;
        self.current_endian = Some(endian);
        let result = f(self);
        self.current_endian = prev;
        result
    }

    /// The five-step pipeline: resolve the type name (honoring ambient
    /// endian), check declared parameter names are accepted and not
    /// reserved, check mandatory parameters are present and non-nil, check
    /// mutual exclusion pairs, then fill in defaults for anything optional
    /// and unspecified.
    pub fn sanitize(
        &self,
        type_name: &str,
        explicit_endian: Option<Endian>,
        given: Vec<(&'static str, ParamValue)>,
    ) -> Result<SanitizedPrototype> {
        let endian = explicit_endian.or(self.current_endian);
        let ctor = self.registry.lookup(type_name, endian)?;
        self.sanitize_ctor(ctor, given)
    }

    /// Same five-step pipeline, but against an already-resolved constructor
    /// rather than a registry lookup by name — how a nested struct/array/
    /// choice prototype built separately gets its own per-usage common
    /// parameters (`onlyif`, `check_offset`, ...) applied.
    pub fn sanitize_ctor(
        &self,
        ctor: Arc<TypeConstructor>,
        given: Vec<(&'static str, ParamValue)>,
    ) -> Result<SanitizedPrototype> {
        check_names(&ctor.accepted, &given)?;
        check_mandatory(&ctor.accepted, &given)?;
        check_non_nil(&given)?;
        check_mutual_exclusion(&ctor.accepted, &given)?;

        let mut params = SanitizedParameters::new();
        for (name, value) in given {
            params.insert(name, value);
        }
        for (name, default) in &ctor.accepted.defaults {
            if !params.contains(name) {
                params.insert(*name, default.clone());
            }
        }
        params.all_sanitized = true;

        Ok(SanitizedPrototype { constructor: ctor, params })
    }
}

fn check_names(accepted: &AcceptedParameters, given: &[(&'static str, ParamValue)]) -> Result<()> {
    for (name, _) in given {
        if *name != "type"
            && !accepted.mandatory.contains(name)
            && !accepted.optional.contains(name)
        {
            return Err(Error::ReservedName((*name).to_owned()));
        }
    }
    Ok(())
}

fn check_mandatory(accepted: &AcceptedParameters, given: &[(&'static str, ParamValue)]) -> Result<()> {
    for name in &accepted.mandatory {
        if !given.iter().any(|(n, _)| n == name) {
            return Err(Error::MissingParameter((*name).to_owned()));
        }
    }
    Ok(())
}

/// Rejects a declared parameter given a nil value outright, per spec.md §4.2
/// step 1 — `Value::Unit` is the nil case in this engine's value model.
fn check_non_nil(given: &[(&'static str, ParamValue)]) -> Result<()> {
    for (name, value) in given {
        if matches!(value, ParamValue::Literal(Value::Unit)) {
            return Err(Error::NilParameter((*name).to_owned()));
        }
    }
    Ok(())
}

fn check_mutual_exclusion(accepted: &AcceptedParameters, given: &[(&'static str, ParamValue)]) -> Result<()> {
    for (a, b) in &accepted.mutually_exclusive {
        let has_a = given.iter().any(|(n, _)| n == a);
        let has_b = given.iter().any(|(n, _)| n == b);
        if has_a && has_b {
            return Err(Error::MutualExclusionViolation((*a).to_owned(), (*b).to_owned()));
        }
    }
    Ok(())
}

/// A sanitized, reusable field declaration: a constructor plus its closed
/// parameter bundle. Cheap to clone and instantiate repeatedly with
/// different parents — e.g. once per array element.
#[derive(Clone)]
pub struct SanitizedPrototype {
    pub constructor: Arc<TypeConstructor>,
    pub params: SanitizedParameters,
}

impl SanitizedPrototype {
    /// Parameter values are symbols/deferred expressions resolved lazily
    /// against whatever live parent they end up under, so instantiating a
    /// prototype under a new parent is just a clone of the already-closed
    /// bundle — no re-evaluation happens here.
    pub fn instantiate_params(&self, _doc: &Document, _parent: NodeId) -> Result<SanitizedParameters> {
        Ok(self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        primitive::register_builtins(&mut reg);
        crate::leaves::register_builtins(&mut reg);
        reg
    }

    #[test]
    fn missing_mandatory_parameter_is_rejected() {
        let reg = registry();
        let sanitizer = Sanitizer::new(&reg);
        let err = sanitizer.sanitize("skip", None, vec![]);
        assert!(matches!(err, Err(Error::MissingParameter(_))));
    }

    #[test]
    fn unknown_parameter_name_is_rejected() {
        let reg = registry();
        let sanitizer = Sanitizer::new(&reg);
        let err = sanitizer.sanitize("u8", None, vec![("bogus", ParamValue::literal(1u64))]);
        assert!(matches!(err, Err(Error::ReservedName(_))));
    }

    #[test]
    fn nil_valued_parameter_is_rejected() {
        let reg = registry();
        let sanitizer = Sanitizer::new(&reg);
        let err = sanitizer.sanitize("u8", None, vec![("check_value", ParamValue::Literal(Value::Unit))]);
        assert!(matches!(err, Err(Error::NilParameter(_))));
    }

    #[test]
    fn with_endian_restores_prior_context_after_an_error() {
        let reg = registry();
        let mut sanitizer = Sanitizer::new(&reg);
        sanitizer.current_endian = Some(Endian::Little);
        let _ = sanitizer.with_endian(Endian::Big, |s| {
            assert_eq!(s.current_endian(), Some(Endian::Big));
            s.sanitize("does-not-exist", None, vec![])
        });
        assert_eq!(sanitizer.current_endian(), Some(Endian::Little));
    }
}
