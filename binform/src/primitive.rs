//! BasePrimitive and its reference codec set, per spec.md §4.4.
//!
//! A primitive node pairs a [`Codec`] (how many bits, how to decode/encode)
//! with the common parameter surface (`value`, `check_value`, `onlyif`, ...)
//! every node kind shares. Concrete codecs here are the pluggable leaves
//! spec.md explicitly puts out of the hard core's scope, but a declarative
//! framework needs a reference set to be usable at all.

use std::sync::Arc;

use crate::io::IoWrapper;
use crate::registry::{Endian, Registry, TypeConstructor};
use crate::params::common_parameters;
use crate::tree::NodeKind;
use crate::value::Value;
use crate::{Error, Result};

/// How many bits a primitive occupies, and whether it forces byte alignment.
/// `Bits` fields (the `bitN` family) pack with their neighbors at the bit
/// level; `Bytes` fields are always byte-aligned and force any pending bit
/// buffer to flush first (spec.md §6's "any byte-level field forces
/// alignment to the next byte boundary"); `Unbounded` fields (strings) are
/// byte-level but only know their width once read or assigned.
#[derive(Clone, Copy)]
pub enum BitWidth {
    Bits(u32),
    Bytes(u32),
    Unbounded,
}

/// Parameters resolved (lazily evaluated, then handed over as plain values)
/// before a codec runs — the things a codec needs but which vary per
/// instance rather than per type, e.g. a byte string's declared `length`.
#[derive(Default, Clone)]
pub struct PrimParams {
    pub length: Option<u64>,
    pub max_length: Option<u64>,
    pub pad_byte: u8,
}

pub trait Codec: Send + Sync {
    fn decode(&self, io: &mut IoWrapper, p: &PrimParams) -> Result<Value>;
    fn encode(&self, value: &Value, io: &mut IoWrapper, p: &PrimParams) -> Result<()>;
    fn default_value(&self) -> Value;
    fn bit_width(&self) -> BitWidth;
}

pub struct PrimitiveState {
    pub codec: Arc<dyn Codec>,
    pub value: Option<Value>,
}

// --- byte-aligned integers -------------------------------------------------

macro_rules! int_codec {
    ($name:ident, $ty:ty, $nbytes:expr, $signed:expr, $to_bytes:ident, $from_bytes:ident) => {
        struct $name;
        impl Codec for $name {
            fn decode(&self, io: &mut IoWrapper, _p: &PrimParams) -> Result<Value> {
                let bytes = io.read_bytes($nbytes)?;
                let mut buf = [0u8; $nbytes];
                buf.copy_from_slice(&bytes);
                let v = match io.endian() {
                    Endian::Big => <$ty>::from_be_bytes(buf),
                    Endian::Little => <$ty>::from_le_bytes(buf),
                };
                Ok(if $signed { Value::Int(v as i64) } else { Value::UInt(v as u64) })
            }
            fn encode(&self, value: &Value, io: &mut IoWrapper, _p: &PrimParams) -> Result<()> {
                let v = if $signed {
                    value
                        .as_i64()
                        .ok_or_else(|| Error::ValidityError(format!("expected integer, got {value:?}")))?
                        as $ty
                } else {
                    value
                        .as_u64()
                        .ok_or_else(|| Error::ValidityError(format!("expected integer, got {value:?}")))?
                        as $ty
                };
                let bytes = match io.endian() {
                    Endian::Big => v.to_be_bytes(),
                    Endian::Little => v.to_le_bytes(),
                };
                io.write_bytes(&bytes)
            }
            fn default_value(&self) -> Value {
                if $signed { Value::Int(0) } else { Value::UInt(0) }
            }
            fn bit_width(&self) -> BitWidth {
                BitWidth::Bytes($nbytes as u32)
            }
        }
    };
}

int_codec!(U8Codec, u8, 1, false, to_be_bytes, from_be_bytes);
int_codec!(U16Codec, u16, 2, false, to_be_bytes, from_be_bytes);
int_codec!(U32Codec, u32, 4, false, to_be_bytes, from_be_bytes);
int_codec!(U64Codec, u64, 8, false, to_be_bytes, from_be_bytes);
int_codec!(I8Codec, i8, 1, true, to_be_bytes, from_be_bytes);
int_codec!(I16Codec, i16, 2, true, to_be_bytes, from_be_bytes);
int_codec!(I32Codec, i32, 4, true, to_be_bytes, from_be_bytes);
int_codec!(I64Codec, i64, 8, true, to_be_bytes, from_be_bytes);

// --- bit-packed integers ----------------------------------------------------

struct BitCodec {
    nbits: u32,
}

impl Codec for BitCodec {
    fn decode(&self, io: &mut IoWrapper, _p: &PrimParams) -> Result<Value> {
        Ok(Value::UInt(io.read_bits(self.nbits)?))
    }
    fn encode(&self, value: &Value, io: &mut IoWrapper, _p: &PrimParams) -> Result<()> {
        let v = value
            .as_u64()
            .ok_or_else(|| Error::ValidityError(format!("expected integer, got {value:?}")))?;
        io.write_bits(self.nbits, v)
    }
    fn default_value(&self) -> Value {
        Value::UInt(0)
    }
    fn bit_width(&self) -> BitWidth {
        BitWidth::Bits(self.nbits)
    }
}

// --- IEEE-754 floats ---------------------------------------------------------

struct F32Codec;
impl Codec for F32Codec {
    fn decode(&self, io: &mut IoWrapper, _p: &PrimParams) -> Result<Value> {
        let bytes = io.read_bytes(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes);
        let v = match io.endian() {
            Endian::Big => f32::from_be_bytes(buf),
            Endian::Little => f32::from_le_bytes(buf),
        };
        Ok(Value::Float(v as f64))
    }
    fn encode(&self, value: &Value, io: &mut IoWrapper, _p: &PrimParams) -> Result<()> {
        let v = match value {
            Value::Float(f) => *f as f32,
            other => {
                return Err(Error::ValidityError(format!("expected float, got {other:?}")))
            }
        };
        let bytes = match io.endian() {
            Endian::Big => v.to_be_bytes(),
            Endian::Little => v.to_le_bytes(),
        };
        io.write_bytes(&bytes)
    }
    fn default_value(&self) -> Value {
        Value::Float(0.0)
    }
    fn bit_width(&self) -> BitWidth {
        BitWidth::Bytes(4)
    }
}

struct F64Codec;
impl Codec for F64Codec {
    fn decode(&self, io: &mut IoWrapper, _p: &PrimParams) -> Result<Value> {
        let bytes = io.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes);
        let v = match io.endian() {
            Endian::Big => f64::from_be_bytes(buf),
            Endian::Little => f64::from_le_bytes(buf),
        };
        Ok(Value::Float(v))
    }
    fn encode(&self, value: &Value, io: &mut IoWrapper, _p: &PrimParams) -> Result<()> {
        let v = match value {
            Value::Float(f) => *f,
            other => {
                return Err(Error::ValidityError(format!("expected float, got {other:?}")))
            }
        };
        let bytes = match io.endian() {
            Endian::Big => v.to_be_bytes(),
            Endian::Little => v.to_le_bytes(),
        };
        io.write_bytes(&bytes)
    }
    fn default_value(&self) -> Value {
        Value::Float(0.0)
    }
    fn bit_width(&self) -> BitWidth {
        BitWidth::Bytes(8)
    }
}

// --- strings ------------------------------------------------------------------

/// A fixed-length byte string: `length` is mandatory and supplied via
/// [`PrimParams`] at read/write time (it is usually itself a lazy
/// expression over a sibling field, resolved by the driver before the codec
/// runs).
struct FixedStringCodec;
impl Codec for FixedStringCodec {
    fn decode(&self, io: &mut IoWrapper, p: &PrimParams) -> Result<Value> {
        let len = p
            .length
            .ok_or_else(|| Error::MissingParameter("length".into()))?;
        Ok(Value::Bytes(io.read_bytes(len as usize)?))
    }
    fn encode(&self, value: &Value, io: &mut IoWrapper, p: &PrimParams) -> Result<()> {
        let len = p
            .length
            .ok_or_else(|| Error::MissingParameter("length".into()))? as usize;
        let mut bytes = value.as_bytes().unwrap_or(&[]).to_vec();
        bytes.resize(len, p.pad_byte);
        bytes.truncate(len);
        io.write_bytes(&bytes)
    }
    fn default_value(&self) -> Value {
        Value::Bytes(Vec::new())
    }
    fn bit_width(&self) -> BitWidth {
        BitWidth::Unbounded
    }
}

/// A NUL-terminated string, with an optional `max_length` truncation on
/// write per spec.md §6's wire-compatibility note.
struct ZeroTerminatedStringCodec;
impl Codec for ZeroTerminatedStringCodec {
    fn decode(&self, io: &mut IoWrapper, _p: &PrimParams) -> Result<Value> {
        let mut out = Vec::new();
        loop {
            let byte = io.read_bytes(1)?[0];
            if byte == 0 {
                break;
            }
            out.push(byte);
        }
        Ok(Value::Bytes(out))
    }
    fn encode(&self, value: &Value, io: &mut IoWrapper, p: &PrimParams) -> Result<()> {
        let mut bytes = value.as_bytes().unwrap_or(&[]).to_vec();
        if let Some(max) = p.max_length {
            // `max_length` bounds the whole wire footprint, terminator
            // included, so the content itself is truncated to `max - 1`.
            bytes.truncate(max.saturating_sub(1) as usize);
        }
        bytes.push(0);
        io.write_bytes(&bytes)
    }
    fn default_value(&self) -> Value {
        Value::Bytes(Vec::new())
    }
    fn bit_width(&self) -> BitWidth {
        BitWidth::Unbounded
    }
}

fn reg_simple(reg: &mut Registry, name: &str, endian: Option<Endian>, codec: Arc<dyn Codec>) {
    let accepted = common_parameters();
    reg.register(TypeConstructor {
        name: name.to_owned(),
        endian,
        accepted,
        build: Arc::new(move |doc, parent, params| {
            let state = PrimitiveState { codec: codec.clone(), value: None };
            Ok(doc.alloc(parent, params, NodeKind::Primitive(state)))
        }),
    });
}

fn reg_string(reg: &mut Registry, name: &str, codec: Arc<dyn Codec>, extra: &'static [&'static str]) {
    let mut accepted = common_parameters();
    for n in extra {
        accepted = accepted.optional(n).expect("string codec parameter names are not reserved");
    }
    reg.register(TypeConstructor {
        name: name.to_owned(),
        endian: None,
        accepted,
        build: Arc::new(move |doc, parent, params| {
            let state = PrimitiveState { codec: codec.clone(), value: None };
            Ok(doc.alloc(parent, params, NodeKind::Primitive(state)))
        }),
    });
}

pub fn register_builtins(reg: &mut Registry) {
    reg_simple(reg, "u8", None, Arc::new(U8Codec));
    reg_simple(reg, "i8", None, Arc::new(I8Codec));
    for (suffix, endian) in [("le", Endian::Little), ("be", Endian::Big)] {
        reg_simple(reg, &format!("u16{suffix}"), Some(endian), Arc::new(U16Codec));
        reg_simple(reg, &format!("u32{suffix}"), Some(endian), Arc::new(U32Codec));
        reg_simple(reg, &format!("u64{suffix}"), Some(endian), Arc::new(U64Codec));
        reg_simple(reg, &format!("i16{suffix}"), Some(endian), Arc::new(I16Codec));
        reg_simple(reg, &format!("i32{suffix}"), Some(endian), Arc::new(I32Codec));
        reg_simple(reg, &format!("i64{suffix}"), Some(endian), Arc::new(I64Codec));
        reg_simple(reg, &format!("f32{suffix}"), Some(endian), Arc::new(F32Codec));
        reg_simple(reg, &format!("f64{suffix}"), Some(endian), Arc::new(F64Codec));
    }
    for nbits in 1..=64u32 {
        reg_simple(reg, &format!("bit{nbits}"), None, Arc::new(BitCodec { nbits }));
    }
    reg_string(reg, "string", Arc::new(FixedStringCodec), &["length", "pad_byte"]);
    reg_string(reg, "stringz", Arc::new(ZeroTerminatedStringCodec), &["max_length"]);
}
