//! Purpose: Typed cell values and the primitive value types a column can declare.
//! Exports: `ValueType`, `Value`, `Scalar`.
//! Role: Payload model shared by the schema, row codec, pools and accessors.
//! Invariants: Only the active variant's storage exists; `Empty` marks placeholder slots.
//! Invariants: Fallible copies report allocation failure as `ErrorKind::Alloc`.
//! Invariants: String cells hold the pool's raw bytes; UTF-8 is checked only when read as `&str`.

use bstr::{BStr, BString, ByteSlice};

use crate::core::error::{Error, ErrorKind};
use crate::core::format::{
    TYPE_BLOB, TYPE_F32, TYPE_SIGNED_BIT, TYPE_STRING, TYPE_U16, TYPE_U32, TYPE_U64, TYPE_U8,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueType {
    U8,
    U16,
    U32,
    U64,
    F32,
    String,
    Blob,
}

impl ValueType {
    /// Encoded width inside a row or an inline constant. Strings are a pool
    /// offset; blobs are an (offset, size) pair.
    pub fn width(self) -> usize {
        match self {
            ValueType::U8 => 1,
            ValueType::U16 => 2,
            ValueType::U32 | ValueType::F32 | ValueType::String => 4,
            ValueType::U64 | ValueType::Blob => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::U8 => "u8",
            ValueType::U16 => "u16",
            ValueType::U32 => "u32",
            ValueType::U64 => "u64",
            ValueType::F32 => "f32",
            ValueType::String => "string",
            ValueType::Blob => "blob",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ValueType::U8 | ValueType::U16 | ValueType::U32 | ValueType::U64
        )
    }

    pub(crate) fn code(self, signed: bool) -> u8 {
        let base = match self {
            ValueType::U8 => TYPE_U8,
            ValueType::U16 => TYPE_U16,
            ValueType::U32 => TYPE_U32,
            ValueType::U64 => TYPE_U64,
            ValueType::F32 => TYPE_F32,
            ValueType::String => TYPE_STRING,
            ValueType::Blob => TYPE_BLOB,
        };
        if signed && self.is_integer() {
            base | TYPE_SIGNED_BIT
        } else {
            base
        }
    }

    /// Maps a type nibble to its value type and signedness.
    pub(crate) fn from_code(code: u8) -> Result<(Self, bool), Error> {
        let signed = code & TYPE_SIGNED_BIT != 0;
        match code {
            0x00 | 0x01 => Ok((ValueType::U8, signed)),
            0x02 | 0x03 => Ok((ValueType::U16, signed)),
            0x04 | 0x05 => Ok((ValueType::U32, signed)),
            0x06 | 0x07 => Ok((ValueType::U64, signed)),
            TYPE_F32 => Ok((ValueType::F32, false)),
            TYPE_STRING => Ok((ValueType::String, false)),
            TYPE_BLOB => Ok((ValueType::Blob, false)),
            other => Err(Error::new(ErrorKind::UnsupportedValueType)
                .with_message(format!("unknown value type code {other:#x}"))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Empty,
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    String(BString),
    Blob(Vec<u8>),
}

impl Value {
    /// Zero value of `value_type`, used to initialize fresh per-row slots.
    pub fn default_for(value_type: ValueType) -> Self {
        match value_type {
            ValueType::U8 => Value::U8(0),
            ValueType::U16 => Value::U16(0),
            ValueType::U32 => Value::U32(0),
            ValueType::U64 => Value::U64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::String => Value::String(BString::default()),
            ValueType::Blob => Value::Blob(Vec::new()),
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Empty => None,
            Value::U8(_) => Some(ValueType::U8),
            Value::U16(_) => Some(ValueType::U16),
            Value::U32(_) => Some(ValueType::U32),
            Value::U64(_) => Some(ValueType::U64),
            Value::F32(_) => Some(ValueType::F32),
            Value::String(_) => Some(ValueType::String),
            Value::Blob(_) => Some(ValueType::Blob),
        }
    }

    /// The string cell as text; `None` for other variants and for non-UTF-8 bytes.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bstr().and_then(|text| text.to_str().ok())
    }

    pub fn as_bstr(&self) -> Option<&BStr> {
        match self {
            Value::String(text) => Some(text.as_bstr()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Deep copy that reports allocation failure instead of aborting.
    pub fn try_clone(&self) -> Result<Self, Error> {
        match self {
            Value::String(text) => copy_bytes(text).map(|bytes| Value::String(BString::from(bytes))),
            Value::Blob(bytes) => copy_bytes(bytes).map(Value::Blob),
            other => Ok(other.clone()),
        }
    }
}

pub(crate) fn copy_str(text: &str) -> Result<String, Error> {
    let mut copy = String::new();
    copy.try_reserve_exact(text.len()).map_err(alloc_error)?;
    copy.push_str(text);
    Ok(copy)
}

pub(crate) fn copy_bytes(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(bytes.len()).map_err(alloc_error)?;
    copy.extend_from_slice(bytes);
    Ok(copy)
}

pub(crate) fn alloc_error(err: std::collections::TryReserveError) -> Error {
    Error::new(ErrorKind::Alloc)
        .with_message("allocation failed while copying value")
        .with_source(err)
}

/// Fixed-width values readable and writable through the typed accessors.
pub trait Scalar: Copy {
    const VALUE_TYPE: ValueType;

    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

macro_rules! impl_scalar {
    ($ty:ty, $variant:ident) => {
        impl Scalar for $ty {
            const VALUE_TYPE: ValueType = ValueType::$variant;

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(*inner),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_scalar!(u8, U8);
impl_scalar!(u16, U16);
impl_scalar!(u32, U32);
impl_scalar!(u64, U64);
impl_scalar!(f32, F32);
