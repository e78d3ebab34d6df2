//! The lazy evaluator: resolves a [`ParamValue`] against a live node's
//! parent chain, per spec.md §4.3.

use std::collections::HashMap;

use crate::driver;
use crate::params::ParamValue;
use crate::struct_;
use crate::tree::{Document, NodeId, NodeKind};
use crate::value::Value;
use crate::{Error, Result};

/// The environment handed to a [`crate::params::DeferredExpr`] closure: the
/// Rust realization of "a function object that takes a lookup environment."
pub struct EvalContext<'a> {
    pub doc: &'a Document,
    pub node: NodeId,
    pub overrides: &'a HashMap<String, Value>,
}

impl<'a> EvalContext<'a> {
    /// Resolves a bare name the way a deferred expression's free variables
    /// resolve: check the overrides first, then walk `self.node`'s own
    /// scope and ancestors.
    pub fn get(&self, name: &str) -> Result<Value> {
        if let Some(v) = self.overrides.get(name) {
            return Ok(v.clone());
        }
        resolve_symbol(self.doc, self.node, name, self.overrides)
    }

    /// The position of the nearest containing array element: walks ancestors
    /// looking for the first `Array` node and reports where its immediate
    /// child in that chain sits among the array's elements.
    pub fn index(&self) -> Result<i64> {
        if let Some(v) = self.overrides.get("index") {
            return v.as_i64().ok_or_else(|| Error::UnresolvedSymbol("index".into()));
        }
        let mut child = self.node;
        let mut cur = self.node;
        while let Some(parent) = self.doc.parent_of(cur) {
            if let NodeKind::Array(a) = self.doc.kind(parent) {
                if let Some(pos) = a.elements.iter().position(|e| *e == child) {
                    return Ok(pos as i64);
                }
            }
            child = parent;
            cur = parent;
        }
        Err(Error::UnresolvedSymbol("index".into()))
    }

    /// An evaluator bound to `self.node`'s parent.
    pub fn parent(&self) -> Result<EvalContext<'a>> {
        let p = self
            .doc
            .parent_of(self.node)
            .ok_or_else(|| Error::UnresolvedSymbol("parent".into()))?;
        Ok(EvalContext { doc: self.doc, node: p, overrides: self.overrides })
    }

    /// Byte offset from the root at the current field.
    pub fn offset(&self) -> Result<u64> {
        driver::offset(self.doc, self.node)
    }
}

/// Evaluates `v` in the context of node `n`, with overrides taking priority
/// over any parent-chain lookup. Recursion is bounded by the ancestor
/// chain's length, so no cycle detection is needed.
pub fn evaluate(
    doc: &Document,
    n: NodeId,
    v: &ParamValue,
    overrides: &HashMap<String, Value>,
) -> Result<Value> {
    match v {
        ParamValue::Literal(val) => Ok(val.clone()),
        ParamValue::Symbol(s) => {
            if let Some(val) = overrides.get(s) {
                return Ok(val.clone());
            }
            let parent = doc
                .parent_of(n)
                .ok_or_else(|| Error::UnresolvedSymbol(s.clone()))?;
            resolve_symbol(doc, parent, s, overrides)
        }
        ParamValue::Deferred(expr) => {
            let ctx = EvalContext { doc, node: n, overrides };
            (expr.0)(&ctx)
        }
    }
}

/// Walks from `start` up through ancestors looking for a binding named `s`:
/// first as a sibling field (if `start` is a struct), then as the struct's
/// own declared parameter of that name, then as a named method. Stops at
/// the first ancestor that has one.
pub(crate) fn resolve_symbol(
    doc: &Document,
    start: NodeId,
    s: &str,
    overrides: &HashMap<String, Value>,
) -> Result<Value> {
    let mut cur = start;
    loop {
        if let Some(child) = struct_::field_node(doc, cur, s) {
            return driver::snapshot(doc, child);
        }
        if let Some(method) = struct_::method(doc, cur, s) {
            let ctx = EvalContext { doc, node: cur, overrides };
            return (method.0)(&ctx);
        }
        if let Some(pv) = doc.params(cur).get(s) {
            let pv = pv.clone();
            return evaluate(doc, cur, &pv, overrides);
        }
        match doc.parent_of(cur) {
            Some(p) => cur = p,
            None => return Err(Error::UnresolvedSymbol(s.to_owned())),
        }
    }
}
