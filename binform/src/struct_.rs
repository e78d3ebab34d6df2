//! Struct: an ordered sequence of named fields, each its own child node,
//! plus named methods, per spec.md §4.5.

use std::collections::HashSet;
use std::sync::Arc;

use crate::driver;
use crate::eval::EvalContext;
use crate::io::IoWrapper;
use crate::params::SanitizedParameters;
use crate::sanitize::SanitizedPrototype;
use crate::tree::{Document, NodeId, NodeKind};
use crate::value::Value;
use crate::Result;

/// A struct-level named method: a computed field that isn't backed by wire
/// bytes, resolved the same way a deferred parameter expression is. Grounded
/// on spec.md §8 scenario 7 (`method include? { flag.nonzero? }`).
pub struct MethodFn(pub Arc<dyn Fn(&EvalContext) -> Result<Value> + Send + Sync>);

impl MethodFn {
    pub fn new(f: impl Fn(&EvalContext) -> Result<Value> + Send + Sync + 'static) -> Self {
        MethodFn(Arc::new(f))
    }
}

/// A struct's fixed shape, built once via `StructBuilder` and shared (via
/// `Arc`) across every instance — e.g. every element of an array of structs.
pub struct StructSchema {
    pub fields: Vec<(String, SanitizedPrototype)>,
    pub hidden: HashSet<String>,
    pub methods: std::collections::HashMap<String, MethodFn>,
}

pub struct StructState {
    pub schema: Arc<StructSchema>,
    pub field_ids: Vec<(String, NodeId)>,
}

pub fn field_node(doc: &Document, id: NodeId, name: &str) -> Option<NodeId> {
    match doc.kind(id) {
        NodeKind::Struct(s) => s.field_ids.iter().find(|(n, _)| n == name).map(|(_, fid)| *fid),
        _ => None,
    }
}

pub fn method(doc: &Document, id: NodeId, name: &str) -> Option<&MethodFn> {
    match doc.kind(id) {
        NodeKind::Struct(s) => s.schema.methods.get(name),
        _ => None,
    }
}

/// Declared field names, in declaration order, excluding hidden ones —
/// spec.md §4.5's Runtime API `field_names` operation.
pub fn field_names(doc: &Document, id: NodeId) -> Vec<String> {
    match doc.kind(id) {
        NodeKind::Struct(s) => s
            .field_ids
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| !s.schema.hidden.contains(name))
            .collect(),
        _ => Vec::new(),
    }
}

/// Allocates a struct node, then recursively allocates one child node per
/// declared field, in declaration order — satisfying §3's "forward-only
/// dependency" invariant, since every field is constructed only after its
/// predecessors already have `NodeId`s to reference.
pub fn build_instance(
    doc: &mut Document,
    parent: Option<NodeId>,
    params: SanitizedParameters,
    schema: Arc<StructSchema>,
) -> Result<NodeId> {
    let id = doc.alloc(
        parent,
        params,
        NodeKind::Struct(StructState { schema: schema.clone(), field_ids: Vec::new() }),
    );
    let mut field_ids = Vec::with_capacity(schema.fields.len());
    for (name, proto) in &schema.fields {
        let child_params = proto.instantiate_params(doc, id)?;
        let child = (proto.constructor.build)(doc, Some(id), child_params)?;
        field_ids.push((name.clone(), child));
    }
    if let NodeKind::Struct(state) = doc.kind_mut(id) {
        state.field_ids = field_ids;
    }
    Ok(id)
}

fn fields_of(doc: &Document, id: NodeId) -> Vec<(String, NodeId)> {
    match doc.kind(id) {
        NodeKind::Struct(s) => s.field_ids.clone(),
        _ => unreachable!("struct_:: called on a non-struct node"),
    }
}

pub(crate) fn read(doc: &mut Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    for (_, fid) in fields_of(doc, id) {
        driver::read(doc, io, fid)?;
    }
    Ok(())
}

pub(crate) fn write(doc: &Document, io: &mut IoWrapper, id: NodeId) -> Result<()> {
    for (_, fid) in fields_of(doc, id) {
        driver::write(doc, io, fid)?;
    }
    Ok(())
}

pub(crate) fn clear(doc: &mut Document, id: NodeId) {
    for (_, fid) in fields_of(doc, id) {
        driver::clear(doc, fid);
    }
}

/// Sums children's bit footprints, flushing (rounding up to a byte) whenever
/// a byte-level field follows a run of bit-level ones, then rounding the
/// total up to a byte at the end — spec.md §4.9/§6's bit-packing rules.
pub(crate) fn num_bits(doc: &Document, id: NodeId) -> Result<u64> {
    let mut total: u64 = 0;
    let mut pending_bits: u64 = 0;
    for (_, fid) in fields_of(doc, id) {
        let w = driver::bit_footprint(doc, fid)?;
        match w {
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
    let hidden = match doc.kind(id) {
        NodeKind::Struct(s) => s.schema.hidden.clone(),
        _ => unreachable!(),
    };
    let mut out = Vec::new();
    for (name, fid) in fields_of(doc, id) {
        if hidden.contains(&name) {
            continue;
        }
        out.push((name, driver::snapshot(doc, fid)?));
    }
    Ok(Value::Map(out))
}
