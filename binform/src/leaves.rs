//! Skip, Rest, and Wrapper: the node kinds spec.md §3 names in its list of
//! field kinds but gives component-level detail for only in passing (§6's
//! `skip (length)` and the `Plain`/`WithFramedSource`-style passthrough
//! wrappers bindata itself supports). See SPEC_FULL.md §4.10.

use std::sync::Arc;

use crate::driver;
use crate::io::IoWrapper;
use crate::params::{common_parameters, SanitizedParameters};
use crate::registry::Registry;
use crate::sanitize::SanitizedPrototype;
use crate::tree::{Document, NodeId, NodeKind};
use crate::value::Value;
use crate::Result;

// --- Skip --------------------------------------------------------------------

pub struct SkipState;

pub(crate) fn read_skip(doc: &mut Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let len = resolve_length(doc, id)?;
    io.read_bytes(len as usize)?;
    Ok(())
}

pub(crate) fn write_skip(doc: &Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let len = resolve_length(doc, id)?;
    io.write_bytes(&vec![0u8; len as usize])
}

pub(crate) fn num_bits_skip(doc: &Document, id: NodeId) -> Result<u64> {
    Ok(resolve_length(doc, id)? * 8)
}

fn resolve_length(doc: &Document, id: NodeId) -> Result<u64> {
    let pv = doc
        .params(id)
        .get("length")
        .cloned()
        .ok_or_else(|| crate::Error::MissingParameter("length".into()))?;
    let v = crate::eval::evaluate(doc, id, &pv, &std::collections::HashMap::new())?;
    v.as_u64()
        .ok_or_else(|| crate::Error::ValidityError("length must be an integer".into()))
}

// --- Rest ----------------------------------------------------------------------

#[derive(Default)]
pub struct RestState {
    pub buf: Vec<u8>,
}

pub(crate) fn read_rest(doc: &mut Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let buf = io.read_to_end()?;
    if let NodeKind::Rest(state) = doc.kind_mut(id) {
        state.buf = buf;
    }
    Ok(())
}

pub(crate) fn write_rest(doc: &Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let buf = match doc.kind(id) {
        NodeKind::Rest(s) => &s.buf,
        _ => unreachable!(),
    };
    io.write_bytes(buf)
}

// --- Wrapper -------------------------------------------------------------------

/// Wraps a single child prototype with no wire footprint of its own,
/// grounded on `worker_op.rs`'s `Plain<T>`/`WithFramedSource<T>` newtypes,
/// which add a marker but delegate the actual (de)serialization straight to
/// their inner value.
pub struct WrapperState {
    pub child: NodeId,
}

pub fn build_wrapper(
    doc: &mut Document,
    parent: Option<NodeId>,
    params: SanitizedParameters,
    inner: SanitizedPrototype,
) -> Result<NodeId> {
    let id = doc.alloc(parent, params, NodeKind::Wrapper(WrapperState { child: NodeId(usize::MAX) }));
    let child_params = inner.instantiate_params(doc, id)?;
    let child = (inner.constructor.build)(doc, Some(id), child_params)?;
    if let NodeKind::Wrapper(state) = doc.kind_mut(id) {
        state.child = child;
    }
    Ok(id)
}

pub(crate) fn read_wrapper(doc: &mut Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let child = wrapper_child(doc, id);
    driver::read(doc, io, child)
}

pub(crate) fn write_wrapper(doc: &Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    let child = wrapper_child(doc, id);
    driver::write(doc, io, child)
}

pub(crate) fn clear_wrapper(doc: &mut Document, id: NodeId) {
    let child = wrapper_child(doc, id);
    driver::clear(doc, child);
}

pub(crate) fn num_bits_wrapper(doc: &Document, id: NodeId) -> Result<u64> {
    driver::num_bits(doc, wrapper_child(doc, id))
}

pub(crate) fn snapshot_wrapper(doc: &Document, id: NodeId) -> Result<Value> {
    driver::snapshot(doc, wrapper_child(doc, id))
}

fn wrapper_child(doc: &Document, id: NodeId) -> NodeId {
    match doc.kind(id) {
        NodeKind::Wrapper(w) => w.child,
        _ => unreachable!("leaves::wrapper_child called on a non-wrapper node"),
    }
}

// --- registration ----------------------------------------------------------

pub fn register_builtins(reg: &mut Registry) {
    let mut skip_params = common_parameters();
    skip_params = skip_params.mandatory("length").expect("length is not reserved");
    reg.register(crate::registry::TypeConstructor {
        name: "skip".to_owned(),
        endian: None,
        accepted: skip_params,
        build: Arc::new(|doc, parent, params| Ok(doc.alloc(parent, params, NodeKind::Skip(SkipState)))),
    });

    let rest_params = common_parameters();
    reg.register(crate::registry::TypeConstructor {
        name: "rest".to_owned(),
        endian: None,
        accepted: rest_params,
        build: Arc::new(|doc, parent, params| {
            Ok(doc.alloc(parent, params, NodeKind::Rest(RestState::default())))
        }),
    });
}
