//! Dense record packing.
//!
//! Values are supplied and returned in user (logical) order but stored in
//! dense order, fixed-width little-endian with no per-value framing. The
//! permutation comes from [`FormatSpec`]; packing and unpacking are exact
//! inverses for any well-typed record.

use crate::error::{Result, StoreError};
use crate::format::{FieldType, FormatSpec};

/// A single typed field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Single byte character.
    Char(u8),
    /// Boolean.
    Bool(bool),
    /// Signed 16-bit integer.
    Short(i16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// 32-bit float.
    Float32(f32),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 64-bit float.
    Float64(f64),
}

impl Value {
    /// Returns the field type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Char(_) => FieldType::Char,
            Self::Bool(_) => FieldType::Bool,
            Self::Short(_) => FieldType::Short,
            Self::Int32(_) => FieldType::Int32,
            Self::Float32(_) => FieldType::Float32,
            Self::UInt64(_) => FieldType::UInt64,
            Self::Float64(_) => FieldType::Float64,
        }
    }

    /// Returns the inner `i32` if this is an `Int32`.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner `f32` if this is a `Float32`.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner `f64` if this is a `Float64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner `u64` if this is a `UInt64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner `i16` if this is a `Short`.
    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Self::Short(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner byte if this is a `Char`.
    pub fn as_char(&self) -> Option<u8> {
        match self {
            Self::Char(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner `bool` if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Serializes the value little-endian at its declared width.
    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Char(v) => out.push(*v),
            Self::Bool(v) => out.push(*v as u8),
            Self::Short(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Float32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::UInt64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Float64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    /// Deserializes a value of the given type from the front of `bytes`.
    ///
    /// The caller guarantees `bytes.len() >= field_type.width()`.
    fn read_from(field_type: FieldType, bytes: &[u8]) -> Self {
        match field_type {
            FieldType::Char => Self::Char(bytes[0]),
            FieldType::Bool => Self::Bool(bytes[0] != 0),
            FieldType::Short => Self::Short(i16::from_le_bytes([bytes[0], bytes[1]])),
            FieldType::Int32 => Self::Int32(i32::from_le_bytes(
                bytes[..4].try_into().expect("length checked"),
            )),
            FieldType::Float32 => Self::Float32(f32::from_le_bytes(
                bytes[..4].try_into().expect("length checked"),
            )),
            FieldType::UInt64 => Self::UInt64(u64::from_le_bytes(
                bytes[..8].try_into().expect("length checked"),
            )),
            FieldType::Float64 => Self::Float64(f64::from_le_bytes(
                bytes[..8].try_into().expect("length checked"),
            )),
        }
    }
}

/// Packs and unpacks fixed-width records in dense order.
///
/// # Examples
/// ```rust,ignore
/// use strata::packer::{DensePacker, Value};
///
/// let packer = DensePacker::new("icfc")?;
/// let record = vec![
///     Value::Int32(32),
///     Value::Char(b'f'),
///     Value::Float32(8.9),
///     Value::Char(b'p'),
/// ];
/// let bytes = packer.pack(&record)?;
/// assert_eq!(packer.unpack(&bytes)?, record);
/// ```
#[derive(Debug, Clone)]
pub struct DensePacker {
    spec: FormatSpec,
}

impl DensePacker {
    /// Creates a packer for the given user format string.
    pub fn new(user_format: &str) -> Result<Self> {
        Ok(Self {
            spec: FormatSpec::parse(user_format)?,
        })
    }

    /// Creates a packer from an already-parsed format.
    pub fn from_spec(spec: FormatSpec) -> Self {
        Self { spec }
    }

    /// The underlying format specification.
    pub fn spec(&self) -> &FormatSpec {
        &self.spec
    }

    /// Fixed byte length of one packed record.
    pub fn record_len(&self) -> usize {
        self.spec.record_len()
    }

    /// Packs values given in user order into dense-order bytes.
    ///
    /// Arity or type mismatches are contract violations and reported as
    /// [`StoreError::RecordMismatch`]; nothing is partially encoded.
    pub fn pack(&self, values: &[Value]) -> Result<Vec<u8>> {
        if values.len() != self.spec.arity() {
            return Err(StoreError::RecordMismatch(format!(
                "expected {} values, got {}",
                self.spec.arity(),
                values.len()
            )));
        }
        for (value, expected) in values.iter().zip(self.spec.user()) {
            if value.field_type() != *expected {
                return Err(StoreError::RecordMismatch(format!(
                    "expected {:?}, got {:?}",
                    expected,
                    value.field_type()
                )));
            }
        }

        let mut bytes = Vec::with_capacity(self.spec.record_len());
        for &user_index in self.spec.user_dense_map() {
            values[user_index].write_to(&mut bytes);
        }
        Ok(bytes)
    }

    /// Unpacks dense-order bytes into values in user order.
    pub fn unpack(&self, bytes: &[u8]) -> Result<Vec<Value>> {
        if bytes.len() != self.spec.record_len() {
            return Err(StoreError::RecordMismatch(format!(
                "expected {} bytes, got {}",
                self.spec.record_len(),
                bytes.len()
            )));
        }

        let mut values = vec![Value::Bool(false); self.spec.arity()];
        let mut offset = 0;
        for (dense_index, field_type) in self.spec.dense().iter().enumerate() {
            let value = Value::read_from(*field_type, &bytes[offset..]);
            values[self.spec.user_dense_map()[dense_index]] = value;
            offset += field_type.width();
        }
        Ok(values)
    }
}
