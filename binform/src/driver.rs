//! The read/write driver: dispatches the handful of universal operations
//! (`read`, `write`, `assign`, `clear`, `snapshot`, `offset`) across node
//! kinds, and enforces the common parameters every kind shares (`onlyif`,
//! `check_offset`, `adjust_offset`, `value`, `check_value`) before handing
//! off to the kind-specific logic in `struct_`/`array`/`choice`/`leaves`.

use std::collections::HashMap;

use crate::eval::evaluate;
use crate::io::IoWrapper;
use crate::params::ParamValue;
use crate::primitive::BitWidth;
use crate::tree::{Document, NodeId, NodeKind};
use crate::value::Value;
use crate::{array, choice, leaves, struct_};
use crate::{Error, Result};

enum Tag {
    Primitive,
    Struct,
    Array,
    Choice,
    Skip,
    Rest,
    Wrapper,
}

fn tag(doc: &Document, id: NodeId) -> Tag {
    match doc.kind(id) {
        NodeKind::Primitive(_) => Tag::Primitive,
        NodeKind::Struct(_) => Tag::Struct,
        NodeKind::Array(_) => Tag::Array,
        NodeKind::Choice(_) => Tag::Choice,
        NodeKind::Skip(_) => Tag::Skip,
        NodeKind::Rest(_) => Tag::Rest,
        NodeKind::Wrapper(_) => Tag::Wrapper,
    }
}

fn onlyif_true(doc: &Document, id: NodeId) -> Result<bool> {
    match doc.params(id).get("onlyif").cloned() {
        Some(pv) => Ok(evaluate(doc, id, &pv, &HashMap::new())?.is_truthy()),
        None => Ok(true),
    }
}

pub fn read(doc: &mut Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    if !onlyif_true(doc, id)? {
        return Ok(());
    }

    if let Some(pv) = doc.params(id).get("adjust_offset").cloned() {
        let target = evaluate(doc, id, &pv, &HashMap::new())?
            .as_u64()
            .ok_or_else(|| Error::ValidityError("adjust_offset must be an integer".into()))?;
        let current = io.pos();
        if target > current {
            io.read_bytes((target - current) as usize)?;
        } else if target < current {
            return Err(Error::OffsetMismatch(format!(
                "adjust_offset {target} is behind the current stream position {current}"
            )));
        }
    }
    if let Some(pv) = doc.params(id).get("check_offset").cloned() {
        let expected = evaluate(doc, id, &pv, &HashMap::new())?
            .as_u64()
            .ok_or_else(|| Error::ValidityError("check_offset must be an integer".into()))?;
        let actual = io.pos();
        if actual != expected {
            return Err(Error::OffsetMismatch(format!("expected offset {expected}, got {actual}")));
        }
    }

    match tag(doc, id) {
        Tag::Primitive => read_primitive(doc, io, id)?,
        Tag::Struct => struct_::read(doc, io, id)?,
        Tag::Array => array::read(doc, io, id)?,
        Tag::Choice => choice::read(doc, io, id)?,
        Tag::Skip => leaves::read_skip(doc, io, id)?,
        Tag::Rest => leaves::read_rest(doc, io, id)?,
        Tag::Wrapper => leaves::read_wrapper(doc, io, id)?,
    }
    doc.set_mutated(id, true);
    Ok(())
}

pub fn write(doc: &Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    if !onlyif_true(doc, id)? {
        return Ok(());
    }
    match tag(doc, id) {
        Tag::Primitive => write_primitive(doc, io, id),
        Tag::Struct => struct_::write(doc, io, id),
        Tag::Array => array::write(doc, io, id),
        Tag::Choice => choice::write(doc, io, id),
        Tag::Skip => leaves::write_skip(doc, io, id),
        Tag::Rest => leaves::write_rest(doc, io, id),
        Tag::Wrapper => leaves::write_wrapper(doc, io, id),
    }
}

/// `(Bits(n), Bytes(n))` both measure `n` in bits; `Bits` packs with
/// neighboring bit-level fields, `Bytes` forces byte alignment first.
pub(crate) enum BitFootprint {
    Bits(u32),
    Bytes(u32),
}

pub(crate) fn bit_footprint(doc: &Document, id: NodeId) -> Result<BitFootprint> {
    if !onlyif_true(doc, id)? {
        return Ok(BitFootprint::Bytes(0));
    }
    match doc.kind(id) {
        NodeKind::Primitive(state) => match state.codec.bit_width() {
            BitWidth::Bits(n) => Ok(BitFootprint::Bits(n)),
            BitWidth::Bytes(n) => Ok(BitFootprint::Bytes(n * 8)),
            BitWidth::Unbounded => {
                let bytes = state.value.as_ref().and_then(Value::as_bytes).map(|b| b.len()).unwrap_or(0);
                Ok(BitFootprint::Bytes((bytes as u32) * 8))
            }
        },
        NodeKind::Struct(_) => Ok(BitFootprint::Bytes(struct_::num_bits(doc, id)? as u32)),
        NodeKind::Array(_) => Ok(BitFootprint::Bytes(array::num_bits(doc, id)? as u32)),
        NodeKind::Choice(_) => Ok(BitFootprint::Bytes(choice::num_bits(doc, id)? as u32)),
        NodeKind::Skip(_) => Ok(BitFootprint::Bytes(leaves::num_bits_skip(doc, id)? as u32)),
        NodeKind::Rest(s) => Ok(BitFootprint::Bytes((s.buf.len() as u32) * 8)),
        NodeKind::Wrapper(_) => Ok(BitFootprint::Bytes(leaves::num_bits_wrapper(doc, id)? as u32)),
    }
}

pub fn num_bits(doc: &Document, id: NodeId) -> Result<u64> {
    match bit_footprint(doc, id)? {
        BitFootprint::Bits(n) | BitFootprint::Bytes(n) => Ok(n as u64),
    }
}

pub fn num_bytes(doc: &Document, id: NodeId) -> Result<u64> {
    Ok((num_bits(doc, id)? + 7) / 8)
}

pub fn snapshot(doc: &Document, id: NodeId) -> Result<Value> {
    if !onlyif_true(doc, id)? {
        return Ok(Value::Unit);
    }
    match doc.kind(id) {
        NodeKind::Primitive(state) => Ok(state.value.clone().unwrap_or_else(|| state.codec.default_value())),
        NodeKind::Struct(_) => struct_::snapshot(doc, id),
        NodeKind::Array(_) => array::snapshot(doc, id),
        NodeKind::Choice(_) => choice::snapshot(doc, id),
        NodeKind::Skip(_) => Ok(Value::Unit),
        NodeKind::Rest(s) => Ok(Value::Bytes(s.buf.clone())),
        NodeKind::Wrapper(_) => leaves::snapshot_wrapper(doc, id),
    }
}

pub fn assign(doc: &mut Document, id: NodeId, value: Value) -> Result<()> {
    match tag(doc, id) {
        Tag::Primitive => {
            check_value(doc, id, &value)?;
            if let NodeKind::Primitive(state) = doc.kind_mut(id) {
                state.value = Some(value);
            }
        }
        Tag::Struct => {
            let fields = value
                .as_map()
                .ok_or_else(|| Error::ValidityError("struct assign requires a map value".into()))?
                .to_vec();
            for (name, v) in fields {
                if let Some(fid) = struct_::field_node(doc, id, &name) {
                    assign(doc, fid, v)?;
                }
            }
        }
        Tag::Array => {
            let items = value
                .as_list()
                .ok_or_else(|| Error::ValidityError("array assign requires a list value".into()))?
                .to_vec();
            array::grow_to(doc, id, items.len())?;
            let elems: Vec<NodeId> = match doc.kind(id) {
                NodeKind::Array(a) => a.elements.clone(),
                _ => unreachable!(),
            };
            for (fid, v) in elems.into_iter().zip(items) {
                assign(doc, fid, v)?;
            }
        }
        Tag::Choice => {
            let child = choice_current_or_select(doc, id)?;
            assign(doc, child, value)?;
        }
        Tag::Skip => {}
        Tag::Rest => {
            let bytes = value
                .as_bytes()
                .ok_or_else(|| Error::ValidityError("rest assign requires bytes".into()))?
                .to_vec();
            if let NodeKind::Rest(state) = doc.kind_mut(id) {
                state.buf = bytes;
            }
        }
        Tag::Wrapper => {
            let child = match doc.kind(id) {
                NodeKind::Wrapper(w) => w.child,
                _ => unreachable!(),
            };
            assign(doc, child, value)?;
        }
    }
    doc.set_mutated(id, true);
    Ok(())
}

fn choice_current_or_select(doc: &mut Document, id: NodeId) -> Result<NodeId> {
    match doc.kind(id) {
        NodeKind::Choice(c) if c.current.is_some() => Ok(c.current.unwrap()),
        _ => Err(Error::ValidityError(
            "choice must be read or have its selector resolved before assignment".into(),
        )),
    }
}

pub fn clear(doc: &mut Document, id: NodeId) {
    match tag(doc, id) {
        Tag::Primitive => {
            if let NodeKind::Primitive(state) = doc.kind_mut(id) {
                state.value = None;
            }
        }
        Tag::Struct => struct_::clear(doc, id),
        Tag::Array => array::clear(doc, id),
        Tag::Choice => choice::clear(doc, id),
        Tag::Skip => {}
        Tag::Rest => {
            if let NodeKind::Rest(state) = doc.kind_mut(id) {
                state.buf.clear();
            }
        }
        Tag::Wrapper => leaves::clear_wrapper(doc, id),
    }
    doc.set_mutated(id, false);
}

/// Has this node been read or assigned since it (or the document) was
/// constructed, or since its last `clear`?
pub fn is_clear(doc: &Document, id: NodeId) -> bool {
    !doc.is_mutated(id)
}

/// A literal `check_value` is compared against the decoded value directly —
/// `evaluate`'s `Literal` case just returns the literal unchanged, so routing
/// it through `is_truthy()` would test the literal itself rather than the
/// equality bindata's `:check_value => 0x00` style declaration means. A
/// symbol or deferred expression still resolves through `evaluate` with
/// `value` bound in its overrides, and its truthiness is the check's result.
fn check_value(doc: &Document, id: NodeId, value: &Value) -> Result<()> {
    if let Some(pv) = doc.params(id).get("check_value").cloned() {
        let ok = match &pv {
            ParamValue::Literal(lit) => value == lit,
            _ => {
                let mut overrides = HashMap::new();
                overrides.insert("value".to_owned(), value.clone());
                evaluate(doc, id, &pv, &overrides)?.is_truthy()
            }
        };
        if !ok {
            return Err(Error::ValidityError(format!("check_value failed for {value:?}")));
        }
    }
    Ok(())
}

fn read_primitive(doc: &mut Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let codec = match doc.kind(id) {
        NodeKind::Primitive(state) => state.codec.clone(),
        _ => unreachable!(),
    };
    let params = resolve_prim_params(doc, id)?;
    let mut value = codec.decode(io, &params)?;
    check_value(doc, id, &value)?;
    if let Some(pv) = doc.params(id).get("value").cloned() {
        value = evaluate(doc, id, &pv, &HashMap::new())?;
    }
    if let NodeKind::Primitive(state) = doc.kind_mut(id) {
        state.value = Some(value);
    }
    Ok(())
}

fn write_primitive(doc: &Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let (codec, current) = match doc.kind(id) {
        NodeKind::Primitive(state) => (state.codec.clone(), state.value.clone()),
        _ => unreachable!(),
    };
    let params = resolve_prim_params(doc, id)?;
    let value = if let Some(pv) = doc.params(id).get("value").cloned() {
        evaluate(doc, id, &pv, &HashMap::new())?
    } else if let Some(v) = current {
        v
    } else if let Some(pv) = doc.params(id).get("initial_value").cloned() {
        evaluate(doc, id, &pv, &HashMap::new())?
    } else {
        codec.default_value()
    };
    codec.encode(&value, io, &params)
}

fn resolve_prim_params(doc: &Document, id: NodeId) -> Result<crate::primitive::PrimParams> {
    let mut p = crate::primitive::PrimParams::default();
    if let Some(pv) = doc.params(id).get("length").cloned() {
        p.length = Some(
            evaluate(doc, id, &pv, &HashMap::new())?
                .as_u64()
                .ok_or_else(|| Error::ValidityError("length must be an integer".into()))?,
        );
    }
    if let Some(pv) = doc.params(id).get("max_length").cloned() {
        p.max_length = Some(
            evaluate(doc, id, &pv, &HashMap::new())?
                .as_u64()
                .ok_or_else(|| Error::ValidityError("max_length must be an integer".into()))?,
        );
    }
    if let Some(pv) = doc.params(id).get("pad_byte").cloned() {
        p.pad_byte = evaluate(doc, id, &pv, &HashMap::new())?.as_u64().unwrap_or(0) as u8;
    }
    Ok(p)
}

fn children_of(doc: &Document, id: NodeId) -> Vec<NodeId> {
    match doc.kind(id) {
        NodeKind::Struct(s) => s.field_ids.iter().map(|(_, n)| *n).collect(),
        NodeKind::Array(a) => a.elements.clone(),
        NodeKind::Choice(c) => c.current.into_iter().collect(),
        NodeKind::Wrapper(w) => vec![w.child],
        _ => Vec::new(),
    }
}

/// Byte offset of `id` relative to its immediate parent's start.
pub fn rel_offset(doc: &Document, id: NodeId) -> Result<u64> {
    let parent = match doc.parent_of(id) {
        Some(p) => p,
        None => return Ok(0),
    };
    let mut acc = 0u64;
    for sib in children_of(doc, parent) {
        if sib == id {
            break;
        }
        acc += num_bytes(doc, sib)?;
    }
    Ok(acc)
}

/// Absolute byte offset of `id` from the document root.
pub fn offset(doc: &Document, id: NodeId) -> Result<u64> {
    let rel = rel_offset(doc, id)?;
    match doc.parent_of(id) {
        Some(p) => Ok(rel + offset(doc, p)?),
        None => Ok(rel),
    }
}

/// A multi-line indented dump of a node and its descendants, in the style of
/// bindata's `inspect` — useful for debugging a schema interactively.
pub fn inspect(doc: &Document, id: NodeId) -> Result<String> {
    let mut out = String::new();
    inspect_into(doc, id, &mut out)?;
    Ok(out)
}

fn inspect_into(doc: &Document, id: NodeId, out: &mut String) -> Result<()> {
    let indent = "  ".repeat(doc.depth(id));
    let value = snapshot(doc, id)?;
    out.push_str(&format!("{indent}{value:?}\n"));
    for child in children_of(doc, id) {
        inspect_into(doc, child, out)?;
    }
    Ok(())
}
