//! The plain-value projection used for parameters, snapshots, and deferred
//! expression results.
//!
//! Strings are byte sequences per spec's Non-goals (no character-encoding
//! awareness); [`Value::Str`] exists only as a convenience for schemas that
//! know their bytes are UTF-8-ish text, mirroring how the teacher's
//! `NixString`/`ByteBuf` types stay byte-oriented while `Debug` renders them
//! lossily as text.

use std::fmt;

#[derive(Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    List(Vec<Value>),
    /// An ordered name→value map; struct snapshots use this to preserve
    /// declaration order instead of a `HashMap`'s arbitrary iteration order.
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::Bool(b) => Some(*b as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::UInt(v) => Some(*v != 0),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Unit => false,
            Value::UInt(v) => *v != 0,
            Value::Int(v) => *v != 0,
            _ => true,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_map()?.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(l) => f.debug_list().entries(l).finish(),
            Value::Map(m) => f.debug_map().entries(m.iter().map(|(k, v)| (k, v))).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_looks_up_by_name_in_a_map() {
        let v = Value::Map(vec![("a".to_owned(), Value::UInt(1)), ("b".to_owned(), Value::UInt(2))]);
        assert_eq!(v.field("b").unwrap().as_u64(), Some(2));
        assert!(v.field("c").is_none());
    }

    #[test]
    fn is_truthy_matches_common_falsy_cases() {
        assert!(!Value::Unit.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::UInt(0).is_truthy());
        assert!(Value::UInt(1).is_truthy());
        assert!(Value::Bytes(vec![]).is_truthy());
    }

    #[test]
    fn as_u64_widens_bool_and_signed_int() {
        assert_eq!(Value::Bool(true).as_u64(), Some(1));
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::Int(5).as_u64(), Some(5));
    }
}
