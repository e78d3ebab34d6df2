//! binform — a declarative binary-data framework.
//!
//! Describe a binary record's layout once (fields, types, endianness,
//! conditionals, length dependencies) against a [`Registry`], and get a
//! parser, a serializer, and an in-memory model of it for free. Modeled on
//! Ruby's `bindata` gem.
//!
//! ```no_run
//! use binform::builder::StructBuilder;
//! use binform::registry::Registry;
//!
//! let registry = Registry::with_builtins();
//! let schema = StructBuilder::new()
//!     .field("magic", "u32be", []).unwrap()
//!     .field("len", "u16be", []).unwrap()
//!     .build(&registry)
//!     .unwrap();
//! let _ = schema;
//! ```

pub mod array;
pub mod builder;
pub mod choice;
pub mod driver;
mod error;
pub mod eval;
pub mod io;
pub mod leaves;
pub mod params;
pub mod primitive;
pub mod registry;
pub mod sanitize;
pub mod struct_;
pub mod tree;
pub mod value;

pub use error::{Error, Result};
pub use registry::{Endian, Registry};
pub use tree::{Document, NodeId};
pub use value::Value;

use std::io::{Read, Write};

/// A live instance of a schema: owns the [`Document`] arena plus the
/// registry it was built against, and exposes the top-level operations
/// spec.md §6 calls the "Runtime API".
pub struct Record {
    doc: Document,
    root_proto: sanitize::SanitizedPrototype,
}

impl Record {
    /// Builds a fresh, unread instance of `proto` as the document root.
    pub fn new(proto: sanitize::SanitizedPrototype) -> Result<Self> {
        let mut doc = Document::new();
        let params = proto.params.clone();
        let root = (proto.constructor.build)(&mut doc, None, params)?;
        doc.set_root(root);
        Ok(Record { doc, root_proto: proto })
    }

    /// Reads and fully populates this instance from `r`, class-method style:
    /// `Record::read_new(&proto, &mut bytes)`.
    pub fn read_new(proto: sanitize::SanitizedPrototype, r: &mut dyn Read) -> Result<Self> {
        let mut rec = Self::new(proto)?;
        rec.read(r)?;
        Ok(rec)
    }

    fn endian(&self) -> Endian {
        self.root_proto.constructor.endian.unwrap_or(Endian::Big)
    }

    #[tracing::instrument(skip(self, r), err)]
    pub fn read(&mut self, r: &mut dyn Read) -> Result<()> {
        let mut io = io::IoWrapper::for_read(r, self.endian());
        driver::read(&mut self.doc, &mut io, self.doc.root())
    }

    #[tracing::instrument(skip(self, w), err)]
    pub fn write(&self, w: &mut dyn Write) -> Result<()> {
        let mut io = io::IoWrapper::for_write(w, self.endian());
        driver::write(&self.doc, &mut io, self.doc.root())
    }

    /// Serializes to an in-memory buffer, the direct analogue of bindata's
    /// `to_binary_s`.
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    pub fn assign(&mut self, value: Value) -> Result<()> {
        driver::assign(&mut self.doc, self.doc.root(), value)
    }

    pub fn clear(&mut self) {
        driver::clear(&mut self.doc, self.doc.root());
    }

    pub fn is_clear(&self) -> bool {
        driver::is_clear(&self.doc, self.doc.root())
    }

    pub fn snapshot(&self) -> Result<Value> {
        driver::snapshot(&self.doc, self.doc.root())
    }

    pub fn num_bytes(&self) -> Result<u64> {
        driver::num_bytes(&self.doc, self.doc.root())
    }

    pub fn offset(&self) -> Result<u64> {
        driver::offset(&self.doc, self.doc.root())
    }

    pub fn inspect(&self) -> Result<String> {
        driver::inspect(&self.doc, self.doc.root())
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn root_prototype(&self) -> &sanitize::SanitizedPrototype {
        &self.root_proto
    }
}
