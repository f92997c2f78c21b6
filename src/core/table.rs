//! Purpose: In-memory table model and the typed accessor API over it.
//! Exports: `Table`, `Row`.
//! Role: What `decode` produces, what `encode` consumes, and what callers edit.
//! Invariants: Every row holds exactly one slot per column, positionally aligned.
//! Invariants: Lookups use the first column with a matching name; `resolve` is the only
//! place that turns (name, row) into a slot, so reads and writes share one rule.
//! Invariants: Absent/Zero columns never yield values; Constant columns ignore the row index.

use std::borrow::Cow;

use bstr::BStr;

use crate::core::codec;
use crate::core::cursor::Endian;
use crate::core::error::{Error, ErrorKind};
use crate::core::schema::{Column, StorageClass};
use crate::core::value::{copy_bytes, copy_str, Scalar, Value, ValueType};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn try_clone(&self) -> Result<Self, Error> {
        let values = self
            .values
            .iter()
            .map(Value::try_clone)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub name: String,
    /// Opaque header field carried through decode and encode.
    pub header_flag: u16,
    /// Emit `"<NULL>"` as the first string pool entry.
    pub uses_null_sentinel: bool,
    pub endian: Endian,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header_flag: 0,
            uses_null_sentinel: false,
            endian: Endian::Big,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_null_sentinel(mut self, enabled: bool) -> Self {
        self.uses_null_sentinel = enabled;
        self
    }

    pub fn with_header_flag(mut self, flag: u16) -> Self {
        self.header_flag = flag;
        self
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub(crate) fn from_parts(
        name: String,
        header_flag: u16,
        uses_null_sentinel: bool,
        endian: Endian,
        columns: Vec<Column>,
        rows: Vec<Row>,
    ) -> Self {
        Self {
            name,
            header_flag,
            uses_null_sentinel,
            endian,
            columns,
            rows,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|index| &self.columns[index])
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Appends a column; existing rows get a default slot for it.
    pub fn add_column(&mut self, column: Column) -> usize {
        let slot = slot_for(&column);
        for row in &mut self.rows {
            row.values.push(slot.clone());
        }
        self.columns.push(column);
        self.columns.len() - 1
    }

    /// Appends a row with type-initialized per-row slots and returns its index.
    pub fn create_row(&mut self) -> usize {
        let values = self.columns.iter().map(slot_for).collect();
        self.rows.push(Row { values });
        self.rows.len() - 1
    }

    /// The slot `name` resolves to at `row`.
    pub fn value(&self, name: &str, row: usize) -> Result<&Value, Error> {
        self.resolve(name, row)
    }

    fn resolve(&self, name: &str, row: usize) -> Result<&Value, Error> {
        let index = self
            .column_index(name)
            .ok_or_else(|| column_not_found(name))?;
        let column = &self.columns[index];
        match column.storage() {
            StorageClass::Absent | StorageClass::Zero => Err(no_value(column)),
            StorageClass::Constant => Ok(column.constant_value().unwrap_or(&Value::Empty)),
            StorageClass::PerRow => self
                .rows
                .get(row)
                .and_then(|slots| slots.values.get(index))
                .ok_or_else(|| row_out_of_range(name, row, self.rows.len())),
        }
    }

    fn resolve_mut(
        &mut self,
        name: &str,
        row: usize,
        affect_constant: bool,
    ) -> Result<(ValueType, &mut Value), Error> {
        let index = self
            .column_index(name)
            .ok_or_else(|| column_not_found(name))?;
        let row_total = self.rows.len();
        let column = &mut self.columns[index];
        let value_type = column.value_type();
        match column.storage() {
            StorageClass::Absent | StorageClass::Zero => Err(no_value(column)),
            StorageClass::Constant if !affect_constant => Err(column_not_found(name)
                .with_message("constant column is read-only without affect_constant")),
            StorageClass::Constant => Ok((value_type, column.constant_slot_mut())),
            StorageClass::PerRow => {
                let slot = self
                    .rows
                    .get_mut(row)
                    .and_then(|slots| slots.values.get_mut(index))
                    .ok_or_else(|| row_out_of_range(name, row, row_total))?;
                Ok((value_type, slot))
            }
        }
    }

    /// Stores `value` into the slot `name` resolves to, checking its type.
    pub fn try_set(
        &mut self,
        name: &str,
        value: Value,
        row: usize,
        affect_constant: bool,
    ) -> Result<(), Error> {
        let (value_type, slot) = self.resolve_mut(name, row, affect_constant)?;
        if value.value_type() != Some(value_type) {
            return Err(Error::new(ErrorKind::TypeMismatch)
                .with_message(format!(
                    "column holds {}, value is {}",
                    value_type.name(),
                    value.value_type().map_or("empty", ValueType::name)
                ))
                .with_column(name)
                .with_row(row));
        }
        *slot = value;
        Ok(())
    }

    pub fn get<T: Scalar>(&self, name: &str, row: usize) -> Option<T> {
        self.value(name, row).ok().and_then(T::from_value)
    }

    pub fn set<T: Scalar>(&mut self, name: &str, value: T, row: usize, affect_constant: bool) -> bool {
        self.try_set(name, value.into_value(), row, affect_constant)
            .is_ok()
    }

    pub fn get_u8(&self, name: &str, row: usize) -> Option<u8> {
        self.get(name, row)
    }

    pub fn get_u16(&self, name: &str, row: usize) -> Option<u16> {
        self.get(name, row)
    }

    pub fn get_u32(&self, name: &str, row: usize) -> Option<u32> {
        self.get(name, row)
    }

    pub fn get_u64(&self, name: &str, row: usize) -> Option<u64> {
        self.get(name, row)
    }

    pub fn get_f32(&self, name: &str, row: usize) -> Option<f32> {
        self.get(name, row)
    }

    pub fn get_string(&self, name: &str, row: usize) -> Option<&str> {
        self.value(name, row).ok().and_then(Value::as_str)
    }

    /// String cell as stored in the pool, including bytes that are not UTF-8.
    pub fn get_string_bytes(&self, name: &str, row: usize) -> Option<&BStr> {
        self.value(name, row).ok().and_then(Value::as_bstr)
    }

    /// Borrows the blob when `copy` is false, returns an owned copy otherwise.
    pub fn get_blob(&self, name: &str, row: usize, copy: bool) -> Option<Cow<'_, [u8]>> {
        if copy {
            return self.blob_copy(name, row).ok().map(Cow::Owned);
        }
        self.value(name, row)
            .ok()
            .and_then(Value::as_bytes)
            .map(Cow::Borrowed)
    }

    /// Owned copy of a blob cell; allocation failure is reported, not fatal.
    pub fn blob_copy(&self, name: &str, row: usize) -> Result<Vec<u8>, Error> {
        let value = self.value(name, row)?;
        let bytes = value.as_bytes().ok_or_else(|| type_mismatch(name, row, ValueType::Blob))?;
        copy_bytes(bytes)
    }

    pub fn set_u8(&mut self, name: &str, value: u8, row: usize, affect_constant: bool) -> bool {
        self.set(name, value, row, affect_constant)
    }

    pub fn set_u16(&mut self, name: &str, value: u16, row: usize, affect_constant: bool) -> bool {
        self.set(name, value, row, affect_constant)
    }

    pub fn set_u32(&mut self, name: &str, value: u32, row: usize, affect_constant: bool) -> bool {
        self.set(name, value, row, affect_constant)
    }

    pub fn set_u64(&mut self, name: &str, value: u64, row: usize, affect_constant: bool) -> bool {
        self.set(name, value, row, affect_constant)
    }

    pub fn set_f32(&mut self, name: &str, value: f32, row: usize, affect_constant: bool) -> bool {
        self.set(name, value, row, affect_constant)
    }

    pub fn set_string(
        &mut self,
        name: &str,
        value: &str,
        row: usize,
        affect_constant: bool,
    ) -> bool {
        self.try_set(name, Value::String(value.into()), row, affect_constant)
            .is_ok()
    }

    pub fn set_blob(&mut self, name: &str, value: &[u8], row: usize, affect_constant: bool) -> bool {
        match copy_bytes(value) {
            Ok(bytes) => self
                .try_set(name, Value::Blob(bytes), row, affect_constant)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Decodes a blob cell that holds a container of its own.
    pub fn nested_table(&self, name: &str, row: usize) -> Result<Table, Error> {
        let value = self.value(name, row)?;
        let bytes = value.as_bytes().ok_or_else(|| type_mismatch(name, row, ValueType::Blob))?;
        codec::decode(bytes).map_err(|err| err.with_column(name).with_row(row))
    }

    /// Encodes `table` into a blob cell.
    pub fn set_nested_table(
        &mut self,
        name: &str,
        table: &Table,
        row: usize,
        affect_constant: bool,
    ) -> Result<(), Error> {
        let bytes = codec::encode(table)?;
        self.try_set(name, Value::Blob(bytes), row, affect_constant)
    }

    pub fn try_clone(&self) -> Result<Self, Error> {
        let columns = self
            .columns
            .iter()
            .map(Column::try_clone)
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(Row::try_clone)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: copy_str(&self.name)?,
            header_flag: self.header_flag,
            uses_null_sentinel: self.uses_null_sentinel,
            endian: self.endian,
            columns,
            rows,
        })
    }
}

fn slot_for(column: &Column) -> Value {
    if column.storage().is_per_row() {
        Value::default_for(column.value_type())
    } else {
        Value::Empty
    }
}

fn column_not_found(name: &str) -> Error {
    Error::new(ErrorKind::ColumnNotFound)
        .with_message("no column with this name")
        .with_column(name)
}

fn no_value(column: &Column) -> Error {
    Error::new(ErrorKind::NoValue)
        .with_message(format!(
            "{} column stores no value",
            column.storage().name()
        ))
        .with_column(column.name())
}

fn row_out_of_range(name: &str, row: usize, row_count: usize) -> Error {
    Error::new(ErrorKind::RowOutOfRange)
        .with_message(format!("table has {row_count} rows"))
        .with_column(name)
        .with_row(row)
}

fn type_mismatch(name: &str, row: usize, wanted: ValueType) -> Error {
    Error::new(ErrorKind::TypeMismatch)
        .with_message(format!("column does not hold {}", wanted.name()))
        .with_column(name)
        .with_row(row)
}
