//! Purpose: Compute the exact byte layout of a table before anything is written.
//! Exports: `plan_layout`, `Layout`.
//! Role: Pure planning layer; `codec::encode` allocates and writes from its output.
//! Invariants: No side effects; output depends only on the table.
//! Invariants: Pool visitation order is constants in column order, then rows row-major.
//! Invariants: Header fields that would overflow their width are a `Usage` error.
use serde::Serialize;
use tracing::trace;

use crate::core::error::{Error, ErrorKind};
use crate::core::format::{align32, NULL_SENTINEL, TABLE_BASE, TABLE_HEADER_LEN};
use crate::core::header::TableHeader;
use crate::core::pool::{DataPool, StringPool};
use crate::core::schema::{row_stride, Column, StorageClass};
use crate::core::table::Table;
use crate::core::validate;
use crate::core::value::Value;

/// Section sizes and header-relative offsets of an encoded table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Layout {
    pub columns_size: usize,
    pub row_stride: usize,
    pub row_count: usize,
    pub rows_size: usize,
    pub strings_size: usize,
    pub string_entries: usize,
    pub data_size: usize,
    pub blob_count: usize,
    pub rows_offset: usize,
    pub strings_offset: usize,
    pub data_offset: usize,
    pub table_size: usize,
    pub total_len: usize,
}

#[derive(Debug)]
pub(crate) struct EncodePlan {
    pub layout: Layout,
    pub header: TableHeader,
    pub strings: StringPool,
    pub data: DataPool,
    /// Index-aligned with the table's columns.
    pub column_name_offsets: Vec<u32>,
}

pub fn plan_layout(table: &Table) -> Result<Layout, Error> {
    plan_encode(table).map(|plan| plan.layout)
}

pub(crate) fn plan_encode(table: &Table) -> Result<EncodePlan, Error> {
    validate::validate_table(table)?;
    let columns = table.columns();

    let mut strings = StringPool::new();
    if table.uses_null_sentinel {
        strings.intern(NULL_SENTINEL)?;
    }
    let table_name = strings.intern(&table.name)?;
    let mut column_name_offsets = Vec::with_capacity(columns.len());
    for column in columns {
        let offset = strings
            .append_unshared(column.name())
            .map_err(|err| err.with_column(column.name()))?;
        column_name_offsets.push(offset);
    }

    let mut data = DataPool::new();
    for (column, value) in pooled_values(table) {
        match value {
            Value::String(text) => {
                strings
                    .intern(text)
                    .map_err(|err| err.with_column(column.name()))?;
            }
            Value::Blob(bytes) => {
                data.push(bytes)
                    .map_err(|err| err.with_column(column.name()))?;
            }
            _ => {}
        }
    }

    let columns_size: usize = columns.iter().map(Column::entry_width).sum();
    let stride = row_stride(columns);
    let row_count = table.row_count();
    let rows_size = stride
        .checked_mul(row_count)
        .ok_or_else(|| overflow("row array size", usize::MAX))?;
    let rows_offset = TABLE_HEADER_LEN + columns_size;
    let strings_offset = rows_offset + rows_size;
    let data_start = align32(TABLE_BASE + strings_offset + strings.len());
    let data_offset = data_start - TABLE_BASE;
    let total_len = data_start + data.len();
    let table_size = total_len - TABLE_BASE;

    let header = TableHeader {
        endian: table.endian,
        table_size: fit_u32("table size", table_size)?,
        header_flag: table.header_flag,
        rows_offset: fit_u16("rows offset", rows_offset)?,
        strings_offset: fit_u32("strings offset", strings_offset)?,
        data_offset: fit_u32("data offset", data_offset)?,
        table_name,
        column_count: fit_u16("column count", columns.len())?,
        row_stride: fit_u16("row stride", stride)?,
        row_count: fit_u32("row count", row_count)?,
    };

    let layout = Layout {
        columns_size,
        row_stride: stride,
        row_count,
        rows_size,
        strings_size: strings.len(),
        string_entries: strings.entry_count(),
        data_size: data.len(),
        blob_count: data.refs().len(),
        rows_offset,
        strings_offset,
        data_offset,
        table_size,
        total_len,
    };
    trace!(
        table = %table.name,
        rows_offset,
        strings_offset,
        data_offset,
        total_len,
        "planned table layout"
    );

    Ok(EncodePlan {
        layout,
        header,
        strings,
        data,
        column_name_offsets,
    })
}

/// Every value that lands in a pool, in the order the encoder writes them.
fn pooled_values(table: &Table) -> impl Iterator<Item = (&Column, &Value)> {
    let columns = table.columns();
    let constants = columns.iter().filter_map(|column| {
        if column.storage() == StorageClass::Constant {
            column.constant_value().map(|value| (column, value))
        } else {
            None
        }
    });
    let cells = table.rows().iter().flat_map(move |row| {
        columns
            .iter()
            .zip(row.values())
            .filter(|(column, _)| column.storage().is_per_row())
    });
    constants.chain(cells)
}

fn fit_u16(field: &str, value: usize) -> Result<u16, Error> {
    u16::try_from(value).map_err(|_| overflow(field, value))
}

fn fit_u32(field: &str, value: usize) -> Result<u32, Error> {
    u32::try_from(value).map_err(|_| overflow(field, value))
}

fn overflow(field: &str, value: usize) -> Error {
    Error::new(ErrorKind::Usage).with_message(format!("{field} {value} does not fit its header field"))
}

#[cfg(test)]
mod tests {
    use super::{plan_encode, plan_layout};
    use crate::core::error::ErrorKind;
    use crate::core::schema::Column;
    use crate::core::table::Table;
    use crate::core::value::{Value, ValueType};

    fn cue_table() -> Table {
        let mut table = Table::new("CueTable")
            .with_column(Column::per_row("Id", ValueType::U32))
            .with_column(Column::per_row("Label", ValueType::String));
        for id in [1u32, 2] {
            let row = table.create_row();
            assert!(table.set_u32("Id", id, row, false));
            assert!(table.set_string("Label", "Intro", row, false));
        }
        table
    }

    #[test]
    fn cue_table_layout() {
        let layout = plan_layout(&cue_table()).expect("layout");
        assert_eq!(layout.columns_size, 10);
        assert_eq!(layout.row_stride, 8);
        assert_eq!(layout.rows_offset, 34);
        assert_eq!(layout.strings_offset, 50);
        assert_eq!(layout.string_entries, 4);
        assert_eq!(layout.strings_size, "CueTable\0Id\0Label\0Intro\0".len());
        assert_eq!(layout.data_offset, 88);
        assert_eq!(layout.data_size, 0);
        assert_eq!(layout.total_len, 96);
        assert_eq!(layout.table_size, 88);
    }

    #[test]
    fn repeated_row_strings_share_an_entry() {
        let mut table = Table::new("T").with_column(Column::per_row("Name", ValueType::String));
        for _ in 0..3 {
            let row = table.create_row();
            assert!(table.set_string("Name", "Foo", row, false));
        }
        let plan = plan_encode(&table).expect("plan");
        assert_eq!(plan.layout.string_entries, 3);
        assert_eq!(plan.strings.as_bytes(), b"T\0Name\0Foo\0");
    }

    #[test]
    fn column_names_are_never_shared() {
        let mut table = Table::new("T").with_column(Column::per_row("Foo", ValueType::String));
        let row = table.create_row();
        assert!(table.set_string("Foo", "Foo", row, false));
        let plan = plan_encode(&table).expect("plan");
        assert_eq!(plan.strings.as_bytes(), b"T\0Foo\0Foo\0");
        assert_eq!(plan.column_name_offsets, vec![2]);
    }

    #[test]
    fn table_name_can_be_shared_by_values() {
        let table = Table::new("Same")
            .with_column(Column::constant("Tag", Value::String("Same".into())).expect("constant"));
        let plan = plan_encode(&table).expect("plan");
        assert_eq!(plan.layout.string_entries, 2);
    }

    #[test]
    fn null_sentinel_comes_first() {
        let table = Table::new("Named").with_null_sentinel(true);
        let plan = plan_encode(&table).expect("plan");
        assert_eq!(plan.header.table_name, 7);
        assert!(plan.strings.as_bytes().starts_with(b"<NULL>\0Named\0"));
    }

    #[test]
    fn blobs_are_padded_per_blob() {
        let mut table = Table::new("B").with_column(Column::per_row("Data", ValueType::Blob));
        for size in [5usize, 40, 1] {
            let row = table.create_row();
            assert!(table.set_blob("Data", &vec![0xAB; size], row, false));
        }
        let plan = plan_encode(&table).expect("plan");
        let offsets: Vec<u32> = plan.data.refs().iter().map(|blob| blob.offset).collect();
        assert_eq!(offsets, vec![0, 32, 96]);
        assert_eq!(plan.layout.data_size, 128);
        assert_eq!(plan.layout.data_offset % 32, 24);
        assert_eq!(plan.layout.total_len % 32, 0);
    }

    #[test]
    fn constant_blobs_come_before_row_blobs() {
        let mut table = Table::new("B")
            .with_column(Column::per_row("Data", ValueType::Blob))
            .with_column(Column::constant("Shared", Value::Blob(vec![1; 3])).expect("constant"));
        let row = table.create_row();
        assert!(table.set_blob("Data", &[2; 3], row, false));
        let plan = plan_encode(&table).expect("plan");
        assert_eq!(plan.data.as_bytes()[0], 1);
        assert_eq!(plan.data.as_bytes()[32], 2);
    }

    #[test]
    fn oversized_column_array_is_usage_error() {
        let mut table = Table::new("Wide");
        for index in 0..13_200 {
            table.add_column(Column::absent(format!("c{index}"), ValueType::U32));
        }
        let err = plan_layout(&table).expect_err("rows offset overflow");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn invalid_tables_are_not_planned() {
        let table = Table::new("T").with_column(Column::absent("Pad", ValueType::U8));
        let err = plan_layout(&table).expect_err("flags 0");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
