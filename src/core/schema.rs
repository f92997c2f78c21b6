//! Purpose: Column schema model plus the column-array and cell codecs.
//! Exports: `StorageClass`, `Column`, `row_stride`, `decode_columns`, `encode_columns`.
//! Role: Single owner of the storage-class rule shared by rows and accessors.
//! Invariants: A flags byte of zero or an unknown storage nibble never decodes.
//! Invariants: Only `Constant` columns carry a value; it always matches `value_type`.

use bstr::BString;

use crate::core::cursor::{Reader, Writer};
use crate::core::error::{Error, ErrorKind};
use crate::core::format::{
    COLUMN_ENTRY_LEN, STORAGE_ABSENT, STORAGE_CONSTANT, STORAGE_MASK, STORAGE_PER_ROW,
    STORAGE_ZERO, TYPE_MASK,
};
use crate::core::pool::{BlobRef, DataPoolRef, StringPool, StringPoolRef};
use crate::core::value::{copy_str, Value, ValueType};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StorageClass {
    /// Never stored; reads report no value.
    Absent,
    /// Reserved by the format; behaves like `Absent`.
    Zero,
    /// One inline value shared by every row.
    Constant,
    /// A fixed-width slot in every row.
    PerRow,
}

impl StorageClass {
    pub fn is_per_row(self) -> bool {
        self == StorageClass::PerRow
    }

    pub fn name(self) -> &'static str {
        match self {
            StorageClass::Absent => "absent",
            StorageClass::Zero => "zero",
            StorageClass::Constant => "constant",
            StorageClass::PerRow => "per_row",
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            StorageClass::Absent => STORAGE_ABSENT,
            StorageClass::Zero => STORAGE_ZERO,
            StorageClass::Constant => STORAGE_CONSTANT,
            StorageClass::PerRow => STORAGE_PER_ROW,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            STORAGE_ABSENT => Some(StorageClass::Absent),
            STORAGE_ZERO => Some(StorageClass::Zero),
            STORAGE_CONSTANT => Some(StorageClass::Constant),
            STORAGE_PER_ROW => Some(StorageClass::PerRow),
            _ => None,
        }
    }
}

/// Splits a column flags byte into storage class, value type and signedness.
pub fn parse_flags(flags: u8) -> Result<(StorageClass, ValueType, bool), Error> {
    if flags == 0 {
        return Err(Error::new(ErrorKind::UnsupportedColumnFlags)
            .with_message("column flags byte is zero"));
    }
    let storage = StorageClass::from_code(flags & STORAGE_MASK).ok_or_else(|| {
        Error::new(ErrorKind::UnsupportedColumnFlags)
            .with_message(format!("unknown storage class in flags {flags:#04x}"))
    })?;
    let (value_type, signed) = ValueType::from_code(flags & TYPE_MASK)?;
    Ok((storage, value_type, signed))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    storage: StorageClass,
    value_type: ValueType,
    signed: bool,
    constant: Value,
}

impl Column {
    pub fn per_row(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::bare(name, StorageClass::PerRow, value_type)
    }

    pub fn absent(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::bare(name, StorageClass::Absent, value_type)
    }

    pub fn zero(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::bare(name, StorageClass::Zero, value_type)
    }

    /// A column whose type is taken from `value`; `Value::Empty` is rejected.
    pub fn constant(name: impl Into<String>, value: Value) -> Result<Self, Error> {
        let name = name.into();
        let value_type = value.value_type().ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("constant column needs a typed value")
                .with_column(name.as_str())
        })?;
        Ok(Self {
            name,
            storage: StorageClass::Constant,
            value_type,
            signed: false,
            constant: value,
        })
    }

    fn bare(name: impl Into<String>, storage: StorageClass, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            storage,
            value_type,
            signed: false,
            constant: Value::Empty,
        }
    }

    /// Marks an integer column as using the signed type code on disk.
    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed && self.value_type.is_integer();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> StorageClass {
        self.storage
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn constant_value(&self) -> Option<&Value> {
        match self.storage {
            StorageClass::Constant => Some(&self.constant),
            _ => None,
        }
    }

    pub(crate) fn constant_slot_mut(&mut self) -> &mut Value {
        &mut self.constant
    }

    pub fn flags(&self) -> u8 {
        self.storage.code() | self.value_type.code(self.signed)
    }

    /// Bytes this column occupies in every row.
    pub fn row_width(&self) -> usize {
        if self.storage.is_per_row() {
            self.value_type.width()
        } else {
            0
        }
    }

    /// Bytes this column occupies in the column array.
    pub fn entry_width(&self) -> usize {
        match self.storage {
            StorageClass::Constant => COLUMN_ENTRY_LEN + self.value_type.width(),
            _ => COLUMN_ENTRY_LEN,
        }
    }

    pub fn try_clone(&self) -> Result<Self, Error> {
        Ok(Self {
            name: copy_str(&self.name)?,
            storage: self.storage,
            value_type: self.value_type,
            signed: self.signed,
            constant: self.constant.try_clone()?,
        })
    }
}

/// Fixed row width derived from the schema alone.
pub fn row_stride(columns: &[Column]) -> usize {
    columns.iter().map(Column::row_width).sum()
}

/// Decodes `count` column entries starting at the reader's position.
pub fn decode_columns(
    reader: &mut Reader<'_>,
    count: usize,
    strings: StringPoolRef<'_>,
    data: DataPoolRef<'_>,
) -> Result<Vec<Column>, Error> {
    let mut columns = Vec::with_capacity(count);
    for index in 0..count {
        let entry_offset = reader.position();
        let flags = reader.read_u8()?;
        let (storage, value_type, signed) =
            parse_flags(flags).map_err(|err| err.with_offset(entry_offset as u64))?;
        let name_offset = reader.read_u32()?;
        let name = strings.get(name_offset).map_err(|err| {
            err.with_message(format!("column {index} name offset {name_offset} is invalid"))
        })?;
        let constant = if storage == StorageClass::Constant {
            let value_offset = reader.position();
            let value = read_cell(reader, value_offset, value_type, strings, data)
                .map_err(|err| err.with_column(name))?;
            reader.seek(value_offset + value_type.width());
            value
        } else {
            Value::Empty
        };
        columns.push(Column {
            name: name.to_string(),
            storage,
            value_type,
            signed,
            constant,
        });
    }
    Ok(columns)
}

/// Writes the column array at the writer's position. `name_offsets` is
/// index-aligned with `columns`; blob constants consume `blobs` in order.
pub fn encode_columns<'b>(
    writer: &mut Writer<'_>,
    columns: &[Column],
    name_offsets: &[u32],
    strings: &StringPool,
    blobs: &mut impl Iterator<Item = &'b BlobRef>,
) -> Result<(), Error> {
    for (column, name_offset) in columns.iter().zip(name_offsets) {
        writer.write_u8(column.flags())?;
        writer.write_u32(*name_offset)?;
        if column.storage == StorageClass::Constant {
            let value_offset = writer.position();
            write_cell(writer, value_offset, &column.constant, strings, blobs)
                .map_err(|err| err.with_column(column.name.as_str()))?;
            writer.seek(value_offset + column.value_type.width());
        }
    }
    Ok(())
}

/// Reads one value of `value_type` at `offset`, resolving pool references.
pub(crate) fn read_cell(
    reader: &Reader<'_>,
    offset: usize,
    value_type: ValueType,
    strings: StringPoolRef<'_>,
    data: DataPoolRef<'_>,
) -> Result<Value, Error> {
    let value = match value_type {
        ValueType::U8 => Value::U8(reader.u8_at(offset)?),
        ValueType::U16 => Value::U16(reader.u16_at(offset)?),
        ValueType::U32 => Value::U32(reader.u32_at(offset)?),
        ValueType::U64 => Value::U64(reader.u64_at(offset)?),
        ValueType::F32 => Value::F32(reader.f32_at(offset)?),
        ValueType::String => {
            let text = strings.get_bytes(reader.u32_at(offset)?)?;
            Value::String(BString::from(text.to_vec()))
        }
        ValueType::Blob => {
            let blob = BlobRef {
                offset: reader.u32_at(offset)?,
                size: reader.u32_at(offset + 4)?,
            };
            Value::Blob(data.get(blob)?.to_vec())
        }
    };
    Ok(value)
}

/// Writes `value` at `offset`. Strings must already be interned in `strings`.
pub(crate) fn write_cell<'b>(
    writer: &mut Writer<'_>,
    offset: usize,
    value: &Value,
    strings: &StringPool,
    blobs: &mut impl Iterator<Item = &'b BlobRef>,
) -> Result<(), Error> {
    match value {
        Value::U8(inner) => writer.put_u8_at(offset, *inner),
        Value::U16(inner) => writer.put_u16_at(offset, *inner),
        Value::U32(inner) => writer.put_u32_at(offset, *inner),
        Value::U64(inner) => writer.put_u64_at(offset, *inner),
        Value::F32(inner) => writer.put_f32_at(offset, *inner),
        Value::String(text) => {
            let pooled = strings.offset_of(text).ok_or_else(|| {
                Error::new(ErrorKind::Internal).with_message("string missing from planned pool")
            })?;
            writer.put_u32_at(offset, pooled)
        }
        Value::Blob(_) => {
            let blob = blobs.next().ok_or_else(|| {
                Error::new(ErrorKind::Internal).with_message("blob missing from planned pool")
            })?;
            writer.put_u32_at(offset, blob.offset)?;
            writer.put_u32_at(offset + 4, blob.size)
        }
        Value::Empty => Err(Error::new(ErrorKind::Usage).with_message("stored slot has no value")),
    }
}
