//! Choice: picks one of several field prototypes at runtime by evaluating a
//! `selection` expression against a table of options, per spec.md §4.7.

use std::collections::HashMap;
use std::sync::Arc;

use crate::driver;
use crate::io::IoWrapper;
use crate::params::SanitizedParameters;
use crate::sanitize::SanitizedPrototype;
use crate::tree::{Document, NodeId, NodeKind};
use crate::value::Value;
use crate::{Error, Result};

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ChoiceKey {
    Int(i64),
    Str(String),
}

impl ChoiceKey {
    fn from_value(v: &Value) -> Option<ChoiceKey> {
        match v {
            Value::Int(i) => Some(ChoiceKey::Int(*i)),
            Value::UInt(u) => Some(ChoiceKey::Int(*u as i64)),
            Value::Bool(b) => Some(ChoiceKey::Int(*b as i64)),
            Value::Str(s) => Some(ChoiceKey::Str(s.clone())),
            Value::Bytes(b) => String::from_utf8(b.clone()).ok().map(ChoiceKey::Str),
            _ => None,
        }
    }
}

pub struct ChoiceSchema {
    pub options: Vec<(ChoiceKey, SanitizedPrototype)>,
    pub default: Option<SanitizedPrototype>,
    /// When the selector changes, whether the previously read value is
    /// carried over into the newly selected type (attempted via its
    /// `assign`) rather than reset to that type's default.
    pub copy_on_change: bool,
}

pub struct ChoiceState {
    pub schema: Arc<ChoiceSchema>,
    pub selected: Option<ChoiceKey>,
    pub current: Option<NodeId>,
}

pub fn build_instance(
    doc: &mut Document,
    parent: Option<NodeId>,
    params: SanitizedParameters,
    schema: Arc<ChoiceSchema>,
) -> Result<NodeId> {
    Ok(doc.alloc(
        parent,
        params,
        NodeKind::Choice(ChoiceState { schema, selected: None, current: None }),
    ))
}

fn selection_value(doc: &Document, id: NodeId) -> Result<Value> {
    let pv = doc
        .params(id)
        .get("selection")
        .cloned()
        .ok_or_else(|| Error::MissingParameter("selection".into()))?;
    crate::eval::evaluate(doc, id, &pv, &HashMap::new())
}

fn proto_for(schema: &ChoiceSchema, key: &ChoiceKey) -> Option<SanitizedPrototype> {
    schema
        .options
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, p)| p.clone())
        .or_else(|| schema.default.clone())
}

/// (Re)selects the active option for the current `selection` value,
/// building a fresh child node if the selector changed since last time.
fn ensure_selected(doc: &mut Document, id: NodeId) -> Result<NodeId> {
    let value = selection_value(doc, id)?;
    let key = ChoiceKey::from_value(&value)
        .ok_or_else(|| Error::UnknownChoice(format!("{value:?}")))?;

    let (schema, already, prior) = match doc.kind(id) {
        NodeKind::Choice(c) => (c.schema.clone(), c.selected.as_ref() == Some(&key), c.current),
        _ => unreachable!(),
    };
    if already {
        return Ok(prior.expect("selected choice always has a current node"));
    }

    let proto = proto_for(&schema, &key)
        .ok_or_else(|| Error::UnknownChoice(format!("{value:?}")))?;
    let carry = if schema.copy_on_change {
        match prior {
            Some(p) => Some(driver::snapshot(doc, p)?),
            None => None,
        }
    } else {
        None
    };

    let params = proto.instantiate_params(doc, id)?;
    let child = (proto.constructor.build)(doc, Some(id), params)?;
    if let Some(v) = carry {
        driver::assign(doc, child, v)?;
    }

    if let NodeKind::Choice(c) = doc.kind_mut(id) {
        c.selected = Some(key);
        c.current = Some(child);
    }
    Ok(child)
}

pub(crate) fn read(doc: &mut Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let child = ensure_selected(doc, id)?;
    driver::read(doc, io, child)
}

pub(crate) fn write(doc: &Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let child = match doc.kind(id) {
        NodeKind::Choice(c) => c.current,
        _ => unreachable!(),
    }
    .ok_or_else(|| Error::ValidityError("choice has no selected value to write".into()))?;
    driver::write(doc, io, child)
}

pub(crate) fn clear(doc: &mut Document, id: NodeId) {
    let child = match doc.kind(id) {
        NodeKind::Choice(c) => c.current,
        _ => unreachable!(),
    };
    if let Some(child) = child {
        driver::clear(doc, child);
    }
    if let NodeKind::Choice(c) = doc.kind_mut(id) {
        c.selected = None;
        c.current = None;
    }
}

pub(crate) fn num_bits(doc: &Document, id: NodeId) -> Result<u64> {
    let child = match doc.kind(id) {
        NodeKind::Choice(c) => c.current,
        _ => unreachable!(),
    };
    match child {
        Some(child) => driver::num_bits(doc, child),
        None => Ok(0),
    }
}

pub(crate) fn snapshot(doc: &Document, id: NodeId) -> Result<Value> {
    let child = match doc.kind(id) {
        NodeKind::Choice(c) => c.current,
        _ => unreachable!(),
    };
    match child {
        Some(child) => driver::snapshot(doc, child),
        None => Ok(Value::Unit),
    }
}
