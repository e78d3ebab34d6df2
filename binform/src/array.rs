//! Array: a homogeneous, ordered sequence of element nodes, per spec.md §4.6.
//!
//! Length is declared one of three ways: a fixed `initial_length` count, a
//! `read_until_eof` flag (stop cleanly the instant a new element would start
//! past the end of the stream), or a `read_until` expression evaluated
//! against the element just read. Declaring none of the three means reading
//! drives straight into `EndOfStream` and fails — there is no default
//! "read forever" behavior.

use crate::driver;
use crate::io::IoWrapper;
use crate::params::SanitizedParameters;
use crate::sanitize::SanitizedPrototype;
use crate::tree::{Document, NodeId, NodeKind};
use crate::value::Value;
use crate::{Error, Result};
use std::collections::HashMap;

pub struct ArraySchema {
    pub element: SanitizedPrototype,
}

pub struct ArrayState {
    pub schema: std::sync::Arc<ArraySchema>,
    pub elements: Vec<NodeId>,
}

pub fn build_instance(
    doc: &mut Document,
    parent: Option<NodeId>,
    params: SanitizedParameters,
    schema: std::sync::Arc<ArraySchema>,
) -> Result<NodeId> {
    Ok(doc.alloc(parent, params, NodeKind::Array(ArrayState { schema, elements: Vec::new() })))
}

fn elements_of(doc: &Document, id: NodeId) -> Vec<NodeId> {
    match doc.kind(id) {
        NodeKind::Array(a) => a.elements.clone(),
        _ => unreachable!("array:: called on a non-array node"),
    }
}

fn alloc_element(doc: &mut Document, id: NodeId) -> Result<NodeId> {
    let (proto, parent) = match doc.kind(id) {
        NodeKind::Array(a) => (a.schema.element.clone(), id),
        _ => unreachable!(),
    };
    let params = proto.instantiate_params(doc, parent)?;
    let child = (proto.constructor.build)(doc, Some(parent), params)?;
    Ok(child)
}

fn push_element(doc: &mut Document, id: NodeId, child: NodeId) {
    if let NodeKind::Array(a) = doc.kind_mut(id) {
        a.elements.push(child);
    }
}

pub(crate) fn read(doc: &mut Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let initial_length = doc.params(id).get("initial_length").cloned();
    let read_until_eof = doc.params(id).get("read_until_eof").cloned();
    let read_until = doc.params(id).get("read_until").cloned();

    if let Some(pv) = initial_length {
        let count = crate::eval::evaluate(doc, id, &pv, &HashMap::new())?
            .as_u64()
            .ok_or_else(|| Error::ValidityError("initial_length must be an integer".into()))?;
        for _ in 0..count {
            let child = alloc_element(doc, id)?;
            driver::read(doc, io, child)?;
            push_element(doc, id, child);
        }
        return Ok(());
    }

    let stop_on_eof = match &read_until_eof {
        Some(pv) => crate::eval::evaluate(doc, id, pv, &HashMap::new())?.is_truthy(),
        None => false,
    };

    loop {
        let before = io.pos();
        let child = alloc_element(doc, id)?;
        match driver::read(doc, io, child) {
            Ok(()) => {}
            Err(Error::EndOfStream { .. }) if stop_on_eof && io.pos() == before => break,
            Err(e) => return Err(e),
        }
        push_element(doc, id, child);

        if let Some(pv) = &read_until {
            let elements = elements_of(doc, id);
            let mut overrides = HashMap::new();
            overrides.insert("index".to_owned(), Value::UInt((elements.len() - 1) as u64));
            overrides.insert("element".to_owned(), driver::snapshot(doc, child)?);
            let snapshots: Result<Vec<Value>> = elements.iter().map(|c| driver::snapshot(doc, *c)).collect();
            overrides.insert("array".to_owned(), Value::List(snapshots?));
            if crate::eval::evaluate(doc, id, pv, &overrides)?.is_truthy() {
                break;
            }
        } else if !stop_on_eof {
            // No length policy was declared at all: keep reading until the
            // stream runs out, at which point the next `driver::read` call
            // above returns `EndOfStream` and propagates as an error.
            continue;
        }
    }
    Ok(())
}

pub(crate) fn write(doc: &Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    for child in elements_of(doc, id) {
        driver::write(doc, io, child)?;
    }
    Ok(())
}

pub(crate) fn clear(doc: &mut Document, id: NodeId) {
    let elements = elements_of(doc, id);
    for child in &elements {
        driver::clear(doc, *child);
    }
    if let NodeKind::Array(a) = doc.kind_mut(id) {
        a.elements.clear();
    }
}

pub(crate) fn num_bits(doc: &Document, id: NodeId) -> Result<u64> {
    let mut total: u64 = 0;
    let mut pending_bits: u64 = 0;
    for child in elements_of(doc, id) {
        match driver::bit_footprint(doc, child)? {
            driver::BitFootprint::Bits(n) => pending_bits += n as u64,
            driver::BitFootprint::Bytes(n) => {
                total += (pending_bits + 7) / 8 * 8;
                pending_bits = 0;
                total += n as u64;
            }
        }
    }
    total += (pending_bits + 7) / 8 * 8;
    Ok(total)
}

pub(crate) fn snapshot(doc: &Document, id: NodeId) -> Result<Value> {
    let mut out = Vec::new();
    for child in elements_of(doc, id) {
        out.push(driver::snapshot(doc, child)?);
    }
    Ok(Value::List(out))
}

/// Grows the array by appending freshly constructed elements until it has
/// `len` of them, matching bindata's indexed-assignment-past-the-end growth.
pub(crate) fn grow_to(doc: &mut Document, id: NodeId, len: usize) -> Result<()> {
    while elements_of(doc, id).len() < len {
        let child = alloc_element(doc, id)?;
        push_element(doc, id, child);
    }
    Ok(())
}
