//! The fluent builder API from SPEC_FULL.md §6: `StructBuilder`,
//! `ArrayBuilder`, `ChoiceBuilder` compose [`SanitizedPrototype`]s against an
//! explicit [`Registry`] without ever touching process-wide state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::array::{self, ArraySchema};
use crate::choice::{self, ChoiceKey, ChoiceSchema};
use crate::eval::EvalContext;
use crate::leaves;
use crate::params::{common_parameters, is_reserved, ParamValue};
use crate::registry::{Endian, Registry, TypeConstructor};
use crate::sanitize::{SanitizedPrototype, Sanitizer};
use crate::struct_::{self, MethodFn, StructSchema};
use crate::value::Value;
use crate::{Error, Result};

type GivenParams = Vec<(&'static str, ParamValue)>;

enum FieldSource {
    Named(&'static str, GivenParams),
    Prebuilt(SanitizedPrototype, GivenParams),
}

pub struct StructBuilder {
    endian: Option<Endian>,
    fields: Vec<(String, FieldSource)>,
    hidden: HashSet<String>,
    methods: HashMap<String, MethodFn>,
}

impl Default for StructBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StructBuilder {
    pub fn new() -> Self {
        StructBuilder { endian: None, fields: Vec::new(), hidden: HashSet::new(), methods: HashMap::new() }
    }

    pub fn endian(mut self, e: Endian) -> Self {
        self.endian = Some(e);
        self
    }

    fn check_field_name(&self, name: &str) -> Result<()> {
        if is_reserved(name) {
            return Err(Error::ReservedName(name.to_owned()));
        }
        if self.fields.iter().any(|(n, _)| n == name) || self.methods.contains_key(name) {
            return Err(Error::DuplicateField(name.to_owned()));
        }
        Ok(())
    }

    /// A field whose type is looked up by name in the registry at `build()`
    /// time (inheriting the struct's ambient endian unless overridden).
    pub fn field(
        mut self,
        name: &str,
        type_name: &'static str,
        params: impl IntoIterator<Item = (&'static str, ParamValue)>,
    ) -> Result<Self> {
        self.check_field_name(name)?;
        self.fields.push((name.to_owned(), FieldSource::Named(type_name, params.into_iter().collect())));
        Ok(self)
    }

    /// A field whose type is an already-built prototype — how a struct
    /// nests another struct, an array, or a choice.
    pub fn field_with(
        mut self,
        name: &str,
        prototype: SanitizedPrototype,
        params: impl IntoIterator<Item = (&'static str, ParamValue)>,
    ) -> Result<Self> {
        self.check_field_name(name)?;
        self.fields.push((name.to_owned(), FieldSource::Prebuilt(prototype, params.into_iter().collect())));
        Ok(self)
    }

    pub fn hide(mut self, name: &str) -> Self {
        self.hidden.insert(name.to_owned());
        self
    }

    pub fn method(
        mut self,
        name: &str,
        f: impl Fn(&EvalContext) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<Self> {
        self.check_field_name(name)?;
        self.methods.insert(name.to_owned(), MethodFn::new(f));
        Ok(self)
    }

    pub fn build(self, registry: &Registry) -> Result<SanitizedPrototype> {
        let mut sanitizer = Sanitizer::new(registry);
        let fields = sanitize_fields(&mut sanitizer, self.endian, self.fields)?;
        let schema = Arc::new(StructSchema { fields, hidden: self.hidden, methods: self.methods });
        let ctor = Arc::new(TypeConstructor {
            name: "<struct>".to_owned(),
            endian: self.endian,
            accepted: common_parameters(),
            build: Arc::new(move |doc, parent, params| struct_::build_instance(doc, parent, params, schema.clone())),
        });
        Ok(SanitizedPrototype { constructor: ctor, params: crate::params::SanitizedParameters::new() })
    }
}

fn sanitize_fields(
    sanitizer: &mut Sanitizer,
    endian: Option<Endian>,
    fields: Vec<(String, FieldSource)>,
) -> Result<Vec<(String, SanitizedPrototype)>> {
    let sanitize_one = |s: &mut Sanitizer, source: FieldSource| -> Result<SanitizedPrototype> {
        match source {
            FieldSource::Named(type_name, params) => s.sanitize(type_name, None, params),
            FieldSource::Prebuilt(proto, params) => s.sanitize_ctor(proto.constructor, params),
        }
    };
    match endian {
        Some(e) => sanitizer.with_endian(e, |s| {
            fields
                .into_iter()
                .map(|(name, src)| Ok((name, sanitize_one(s, src)?)))
                .collect()
        }),
        None => fields
            .into_iter()
            .map(|(name, src)| Ok((name, sanitize_one(sanitizer, src)?)))
            .collect(),
    }
}

pub struct ArrayBuilder {
    endian: Option<Endian>,
    element: Option<FieldSource>,
    params: GivenParams,
}

impl Default for ArrayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayBuilder {
    pub fn new() -> Self {
        ArrayBuilder { endian: None, element: None, params: Vec::new() }
    }

    pub fn endian(mut self, e: Endian) -> Self {
        self.endian = Some(e);
        self
    }

    pub fn element(mut self, type_name: &'static str, params: impl IntoIterator<Item = (&'static str, ParamValue)>) -> Self {
        self.element = Some(FieldSource::Named(type_name, params.into_iter().collect()));
        self
    }

    pub fn element_with(mut self, prototype: SanitizedPrototype, params: impl IntoIterator<Item = (&'static str, ParamValue)>) -> Self {
        self.element = Some(FieldSource::Prebuilt(prototype, params.into_iter().collect()));
        self
    }

    /// A fixed element count, evaluated lazily against the array's parent.
    pub fn initial_length(mut self, len: ParamValue) -> Self {
        self.params.push(("initial_length", len));
        self
    }

    /// Read elements until the stream runs dry at an element boundary.
    pub fn read_until_eof(mut self) -> Self {
        self.params.push(("read_until_eof", ParamValue::literal(true)));
        self
    }

    /// Read elements until `expr` (evaluated with `index`/`element`
    /// overrides bound to the element just read) becomes true.
    pub fn read_until(mut self, expr: ParamValue) -> Self {
        self.params.push(("read_until", expr));
        self
    }

    pub fn build(self, registry: &Registry) -> Result<SanitizedPrototype> {
        let element_source = self
            .element
            .ok_or_else(|| Error::MissingParameter("type".into()))?;
        let mut sanitizer = Sanitizer::new(registry);
        let element = match self.endian {
            Some(e) => sanitizer.with_endian(e, |s| match element_source {
                FieldSource::Named(type_name, params) => s.sanitize(type_name, None, params),
                FieldSource::Prebuilt(proto, params) => s.sanitize_ctor(proto.constructor, params),
            })?,
            None => match element_source {
                FieldSource::Named(type_name, params) => sanitizer.sanitize(type_name, None, params)?,
                FieldSource::Prebuilt(proto, params) => sanitizer.sanitize_ctor(proto.constructor, params)?,
            },
        };
        let schema = Arc::new(ArraySchema { element });
        let mut accepted = common_parameters();
        accepted = accepted
            .optional("initial_length")?
            .optional("read_until_eof")?
            .optional("read_until")?
            .mutually_exclusive("initial_length", "read_until_eof")
            .mutually_exclusive("initial_length", "read_until")
            .mutually_exclusive("read_until_eof", "read_until");
        let ctor = Arc::new(TypeConstructor {
            name: "<array>".to_owned(),
            endian: self.endian,
            accepted,
            build: Arc::new(move |doc, parent, params| array::build_instance(doc, parent, params, schema.clone())),
        });
        sanitizer.sanitize_ctor(ctor, self.params)
    }
}

pub struct ChoiceBuilder {
    selection: Option<ParamValue>,
    options: Vec<(ChoiceKey, FieldSource)>,
    default: Option<FieldSource>,
    copy_on_change: bool,
}

impl Default for ChoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChoiceBuilder {
    pub fn new() -> Self {
        ChoiceBuilder { selection: None, options: Vec::new(), default: None, copy_on_change: false }
    }

    pub fn selection(mut self, expr: ParamValue) -> Self {
        self.selection = Some(expr);
        self
    }

    pub fn option_int(mut self, key: i64, type_name: &'static str, params: impl IntoIterator<Item = (&'static str, ParamValue)>) -> Self {
        self.options.push((ChoiceKey::Int(key), FieldSource::Named(type_name, params.into_iter().collect())));
        self
    }

    pub fn option_str(mut self, key: &str, type_name: &'static str, params: impl IntoIterator<Item = (&'static str, ParamValue)>) -> Self {
        self.options.push((ChoiceKey::Str(key.to_owned()), FieldSource::Named(type_name, params.into_iter().collect())));
        self
    }

    /// An option whose type is an already-built prototype, e.g. a nested
    /// struct — mirrors `StructBuilder::field_with`.
    pub fn option_int_with(mut self, key: i64, prototype: SanitizedPrototype, params: impl IntoIterator<Item = (&'static str, ParamValue)>) -> Self {
        self.options.push((ChoiceKey::Int(key), FieldSource::Prebuilt(prototype, params.into_iter().collect())));
        self
    }

    pub fn option_str_with(mut self, key: &str, prototype: SanitizedPrototype, params: impl IntoIterator<Item = (&'static str, ParamValue)>) -> Self {
        self.options.push((ChoiceKey::Str(key.to_owned()), FieldSource::Prebuilt(prototype, params.into_iter().collect())));
        self
    }

    pub fn default(mut self, type_name: &'static str, params: impl IntoIterator<Item = (&'static str, ParamValue)>) -> Self {
        self.default = Some(FieldSource::Named(type_name, params.into_iter().collect()));
        self
    }

    pub fn default_with(mut self, prototype: SanitizedPrototype, params: impl IntoIterator<Item = (&'static str, ParamValue)>) -> Self {
        self.default = Some(FieldSource::Prebuilt(prototype, params.into_iter().collect()));
        self
    }

    pub fn copy_on_change(mut self, v: bool) -> Self {
        self.copy_on_change = v;
        self
    }

    pub fn build(self, registry: &Registry) -> Result<SanitizedPrototype> {
        let selection = self
            .selection
            .ok_or_else(|| Error::MissingParameter("selection".into()))?;
        let sanitizer = Sanitizer::new(registry);
        let mut options = Vec::with_capacity(self.options.len());
        for (key, src) in self.options {
            let proto = match src {
                FieldSource::Named(type_name, params) => sanitizer.sanitize(type_name, None, params)?,
                FieldSource::Prebuilt(proto, params) => sanitizer.sanitize_ctor(proto.constructor, params)?,
            };
            options.push((key, proto));
        }
        let default = match self.default {
            Some(FieldSource::Named(type_name, params)) => Some(sanitizer.sanitize(type_name, None, params)?),
            Some(FieldSource::Prebuilt(proto, params)) => Some(sanitizer.sanitize_ctor(proto.constructor, params)?),
            None => None,
        };
        let schema = Arc::new(ChoiceSchema { options, default, copy_on_change: self.copy_on_change });
        let mut accepted = common_parameters();
        accepted = accepted.mandatory("selection")?;
        let ctor = Arc::new(TypeConstructor {
            name: "<choice>".to_owned(),
            endian: None,
            accepted,
            build: Arc::new(move |doc, parent, params| choice::build_instance(doc, parent, params, schema.clone())),
        });
        sanitizer.sanitize_ctor(ctor, vec![("selection", selection)])
    }
}

/// Builds a `Wrapper` around an already-built prototype: no wire shape of
/// its own, delegating straight through to the child (SPEC_FULL.md §4.10).
pub struct WrapperBuilder {
    inner: Option<SanitizedPrototype>,
    params: GivenParams,
}

impl Default for WrapperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WrapperBuilder {
    pub fn new() -> Self {
        WrapperBuilder { inner: None, params: Vec::new() }
    }

    pub fn inner(mut self, prototype: SanitizedPrototype) -> Self {
        self.inner = Some(prototype);
        self
    }

    pub fn build(self, registry: &Registry) -> Result<SanitizedPrototype> {
        let inner = self.inner.ok_or_else(|| Error::MissingParameter("type".into()))?;
        let sanitizer = Sanitizer::new(registry);
        let ctor = Arc::new(TypeConstructor {
            name: "<wrapper>".to_owned(),
            endian: None,
            accepted: common_parameters(),
            build: Arc::new(move |doc, parent, params| leaves::build_wrapper(doc, parent, params, inner.clone())),
        });
        sanitizer.sanitize_ctor(ctor, self.params)
    }
}
