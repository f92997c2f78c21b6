// Table invariant checks run before encode, plus debug-only output assertions.
// Encode refuses a table these checks reject; nothing is partially written.
use crate::core::error::{Error, ErrorKind};
use crate::core::format::MAX_STRIDELESS_ROWS;
use crate::core::header::TableHeader;
use crate::core::schema::{Column, StorageClass};
use crate::core::table::Table;

pub fn validate_column(column: &Column) -> Result<(), Error> {
    if column.flags() == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("absent unsigned u8 column encodes as flags 0")
            .with_column(column.name())
            .with_hint("Mark the column signed or give it another value type."));
    }
    if column.storage() == StorageClass::Constant {
        let held = column.constant_value().and_then(|value| value.value_type());
        if held != Some(column.value_type()) {
            return Err(Error::new(ErrorKind::TypeMismatch)
                .with_message(format!(
                    "constant does not hold a {} value",
                    column.value_type().name()
                ))
                .with_column(column.name()));
        }
    }
    Ok(())
}

/// Checks every column and every per-row slot against the schema.
pub fn validate_table(table: &Table) -> Result<(), Error> {
    let columns = table.columns();
    for column in columns {
        validate_column(column)?;
    }
    let has_stride = columns.iter().any(|column| column.storage().is_per_row());
    if !has_stride && table.row_count() > MAX_STRIDELESS_ROWS {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!(
                "{} rows without per-row columns exceeds the limit of {MAX_STRIDELESS_ROWS}",
                table.row_count()
            ))
            .with_hint("Add a per-row column or drop rows."));
    }
    for (index, row) in table.rows().iter().enumerate() {
        if row.values().len() != columns.len() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "row has {} values for {} columns",
                    row.values().len(),
                    columns.len()
                ))
                .with_row(index));
        }
        for (column, value) in columns.iter().zip(row.values()) {
            if !column.storage().is_per_row() {
                continue;
            }
            if value.value_type() != Some(column.value_type()) {
                return Err(Error::new(ErrorKind::TypeMismatch)
                    .with_message(format!(
                        "slot does not hold a {} value",
                        column.value_type().name()
                    ))
                    .with_column(column.name())
                    .with_row(index));
            }
        }
    }
    Ok(())
}

/// Re-reads the header from freshly encoded bytes and compares it to the plan.
pub fn debug_assert_encoded(planned: &TableHeader, bytes: &[u8]) {
    if !cfg!(debug_assertions) {
        return;
    }
    let written = TableHeader::decode(bytes)
        .unwrap_or_else(|err| panic!("encoded header does not decode: {err}"));
    if written != *planned {
        panic!("encoded header {written:?} differs from plan {planned:?}");
    }
    if written.container_len() != bytes.len() {
        panic!(
            "encoded container is {} bytes, header declares {}",
            bytes.len(),
            written.container_len()
        );
    }
}
