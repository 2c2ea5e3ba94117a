use std::convert::TryInto;
use std::fmt;

use crate::error::{schema_mismatch, DbResult};

pub const DEFAULT_STRING_LENGTH: usize = 128;

/// A column type. `Str` carries the fixed on-disk payload length (the
/// schema-fixed byte length from spec.md §3, default
/// [`DEFAULT_STRING_LENGTH`]).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Type {
    Int,
    Str(usize),
}

impl Type {
    /// Bytes this type occupies on disk: 4 for `Int`; for `Str`, a 4-byte
    /// big-endian length prefix plus the fixed payload region.
    pub fn byte_length(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Str(fixed_len) => 4 + fixed_len,
        }
    }

    fn parse(s: &str) -> Option<Type> {
        match s {
            "int" => Some(Type::Int),
            "string" => Some(Type::Str(DEFAULT_STRING_LENGTH)),
            _ => None,
        }
    }
}

impl std::str::FromStr for Type {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Type::parse(s).ok_or(())
    }
}

/// A single typed value. Immutable once constructed.
#[derive(Clone, Debug)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.partial_cmp(other), Some(std::cmp::Ordering::Equal))
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a.partial_cmp(b),
            (Field::Str(a), Field::Str(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Field {
    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            // the fixed length isn't recoverable from the value alone;
            // callers compare against the schema's declared type instead
            // of `field_type()` when the exact fixed length matters.
            Field::Str(s) => Type::Str(s.len()),
        }
    }

    pub fn matches_type(&self, t: Type) -> bool {
        match (self, t) {
            (Field::Int(_), Type::Int) => true,
            (Field::Str(_), Type::Str(_)) => true,
            _ => false,
        }
    }

    pub fn compare(&self, op: Op, other: &Field) -> DbResult<bool> {
        use std::cmp::Ordering::*;
        let ord = self
            .partial_cmp(other)
            .ok_or_else(|| schema_mismatch("cannot compare fields of different types"))?;
        Ok(match op {
            Op::LessThan => ord == Less,
            Op::LessThanOrEq => ord != Greater,
            Op::Equal => ord == Equal,
            Op::GreaterThanOrEq => ord != Less,
            Op::GreaterThan => ord == Greater,
            Op::NotEqual => ord != Equal,
        })
    }

    pub(crate) fn encode(&self, fixed_len: usize, out: &mut Vec<u8>) {
        match self {
            Field::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Field::Str(s) => {
                let bytes = s.as_bytes();
                debug_assert!(bytes.len() <= fixed_len, "string exceeds fixed field length");
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
                out.resize(out.len() + (fixed_len - bytes.len()), 0u8);
            }
        }
    }

    pub(crate) fn decode(t: Type, bytes: &[u8]) -> Field {
        match t {
            Type::Int => {
                let arr: [u8; 4] = bytes[0..4].try_into().unwrap();
                Field::Int(i32::from_be_bytes(arr))
            }
            Type::Str(fixed_len) => {
                let len_arr: [u8; 4] = bytes[0..4].try_into().unwrap();
                let len = u32::from_be_bytes(len_arr) as usize;
                let payload = &bytes[4..4 + fixed_len];
                let s = String::from_utf8_lossy(&payload[..len.min(fixed_len)]).into_owned();
                Field::Str(s)
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Ordered comparison operators, ported from the teacher's `Predicate`/`Op`
/// machinery (`src/predicate.rs`) and named explicitly by spec.md §3.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Op {
    LessThan,
    LessThanOrEq,
    Equal,
    GreaterThanOrEq,
    GreaterThan,
    NotEqual,
}
