//! Purpose: Decode containers into tables and encode tables into containers.
//! Exports: `decode`, `encode`, `read_header`.
//! Role: Orchestrates header, column, row and pool codecs in section order.
//! Invariants: Decode is all-or-nothing; no partial table escapes an error.
//! Invariants: Encode plans the full layout first and writes into one buffer of exactly that size.
use tracing::debug;

use crate::core::cursor::{Reader, Writer};
use crate::core::error::{Error, ErrorKind};
use crate::core::format::{COLUMNS_START, MAX_STRIDELESS_ROWS, NULL_SENTINEL};
use crate::core::header::TableHeader;
use crate::core::plan;
use crate::core::pool::{DataPoolRef, StringPoolRef};
use crate::core::row::{self, RowLayout};
use crate::core::schema::{self, row_stride};
use crate::core::table::Table;
use crate::core::validate;
use crate::core::value::alloc_error;

/// Rows with a stride are bounded by the header check; rows without one
/// cost no bytes, so their count is capped before allocation.
fn check_row_count(layout: RowLayout) -> Result<(), Error> {
    if layout.stride > 0 || layout.count <= MAX_STRIDELESS_ROWS {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Corrupt)
        .with_message(format!(
            "{} rows without per-row columns exceeds the limit of {MAX_STRIDELESS_ROWS}",
            layout.count
        ))
        .with_offset(28))
}

/// Reads and structurally checks the headers without decoding columns or rows.
pub fn read_header(bytes: &[u8]) -> Result<TableHeader, Error> {
    let header = TableHeader::decode(bytes)?;
    header.validate()?;
    Ok(header)
}

pub fn decode(bytes: &[u8]) -> Result<Table, Error> {
    let header = read_header(bytes)?;
    decode_with_header(bytes, &header)
}

pub(crate) fn decode_with_header(bytes: &[u8], header: &TableHeader) -> Result<Table, Error> {
    let container = &bytes[..header.container_len()];
    let reader = Reader::new(container, header.endian);
    let strings = StringPoolRef::new(&container[header.strings_range()]);
    let data = DataPoolRef::new(&container[header.data_range()]);

    let mut columns_reader = reader;
    columns_reader.seek(COLUMNS_START);
    let columns = schema::decode_columns(
        &mut columns_reader,
        header.column_count as usize,
        strings,
        data,
    )?;
    if columns_reader.position() > header.rows_start() {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message("column array runs into the rows section")
            .with_offset(columns_reader.position() as u64));
    }

    let stride = row_stride(&columns);
    if stride != header.row_stride as usize {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!(
                "declared row stride {} disagrees with schema stride {stride}",
                header.row_stride
            ))
            .with_offset(26));
    }
    let layout = RowLayout {
        start: header.rows_start(),
        stride,
        count: header.row_count as usize,
    };
    check_row_count(layout)?;
    let rows = row::decode_rows(&reader, &columns, layout, strings, data)?;

    let name = strings
        .get(header.table_name)
        .map_err(|err| err.with_message("table name offset is invalid"))?;
    let table = Table::from_parts(
        name.to_string(),
        header.header_flag,
        strings.starts_with_entry(NULL_SENTINEL),
        header.endian,
        columns,
        rows,
    );
    debug!(
        table = %table.name,
        columns = table.column_count(),
        rows = table.row_count(),
        bytes = container.len(),
        "decoded table"
    );
    Ok(table)
}

pub fn encode(table: &Table) -> Result<Vec<u8>, Error> {
    let plan = plan::plan_encode(table)?;
    let layout = plan.layout;

    let mut buf = Vec::new();
    buf.try_reserve_exact(layout.total_len).map_err(|err| {
        alloc_error(err).with_message(format!("cannot allocate {} byte container", layout.total_len))
    })?;
    buf.resize(layout.total_len, 0);

    {
        let mut writer = Writer::new(&mut buf, table.endian);
        plan.header.encode(&mut writer)?;

        let mut blobs = plan.data.refs().iter();
        writer.seek(COLUMNS_START);
        schema::encode_columns(
            &mut writer,
            table.columns(),
            &plan.column_name_offsets,
            &plan.strings,
            &mut blobs,
        )?;
        let rows = RowLayout {
            start: plan.header.rows_start(),
            stride: layout.row_stride,
            count: layout.row_count,
        };
        row::encode_rows(
            &mut writer,
            table.columns(),
            table.rows(),
            rows,
            &plan.strings,
            &mut blobs,
        )?;
        writer.put_bytes_at(plan.header.strings_range().start, plan.strings.as_bytes())?;
        writer.put_bytes_at(plan.header.data_range().start, plan.data.as_bytes())?;
        if blobs.next().is_some() {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("planned blobs left unwritten"));
        }
    }

    validate::debug_assert_encoded(&plan.header, &buf);
    debug!(
        table = %table.name,
        columns = table.column_count(),
        rows = table.row_count(),
        bytes = buf.len(),
        "encoded table"
    );
    Ok(buf)
}
