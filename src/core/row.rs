// Row array codec: only per-row columns occupy bytes, in column order.
use crate::core::cursor::{Reader, Writer};
use crate::core::error::{Error, ErrorKind};
use crate::core::pool::{BlobRef, DataPoolRef, StringPool, StringPoolRef};
use crate::core::schema::{read_cell, write_cell, Column};
use crate::core::table::Row;
use crate::core::value::{alloc_error, Value};

/// Where the row array sits and how it is shaped.
#[derive(Clone, Copy, Debug)]
pub struct RowLayout {
    /// Absolute offset of row 0.
    pub start: usize,
    pub stride: usize,
    pub count: usize,
}

impl RowLayout {
    fn row_base(&self, row: usize) -> usize {
        self.start + row * self.stride
    }
}

pub fn decode_rows(
    reader: &Reader<'_>,
    columns: &[Column],
    layout: RowLayout,
    strings: StringPoolRef<'_>,
    data: DataPoolRef<'_>,
) -> Result<Vec<Row>, Error> {
    let mut rows = Vec::new();
    rows.try_reserve_exact(layout.count).map_err(|err| {
        alloc_error(err).with_message(format!("cannot allocate {} rows", layout.count))
    })?;

    for row in 0..layout.count {
        let mut offset = layout.row_base(row);
        let mut values = Vec::new();
        values.try_reserve_exact(columns.len()).map_err(alloc_error)?;
        for column in columns {
            if !column.storage().is_per_row() {
                values.push(Value::Empty);
                continue;
            }
            let value = read_cell(reader, offset, column.value_type(), strings, data)
                .map_err(|err| err.with_column(column.name()).with_row(row))?;
            values.push(value);
            offset += column.value_type().width();
        }
        rows.push(Row::from_values(values));
    }
    Ok(rows)
}

/// Writes every row; blob slots consume `blobs` in row-major order.
pub fn encode_rows<'b>(
    writer: &mut Writer<'_>,
    columns: &[Column],
    rows: &[Row],
    layout: RowLayout,
    strings: &StringPool,
    blobs: &mut impl Iterator<Item = &'b BlobRef>,
) -> Result<(), Error> {
    for (index, row) in rows.iter().enumerate() {
        if row.values().len() != columns.len() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "row has {} values for {} columns",
                    row.values().len(),
                    columns.len()
                ))
                .with_row(index));
        }
        let mut offset = layout.row_base(index);
        for (column, value) in columns.iter().zip(row.values()) {
            if !column.storage().is_per_row() {
                continue;
            }
            write_cell(writer, offset, value, strings, blobs)
                .map_err(|err| err.with_column(column.name()).with_row(index))?;
            offset += column.value_type().width();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{decode_rows, encode_rows, RowLayout};
    use crate::core::cursor::{Endian, Reader, Writer};
    use crate::core::error::ErrorKind;
    use crate::core::pool::{DataPool, DataPoolRef, StringPool, StringPoolRef};
    use crate::core::schema::{row_stride, Column};
    use crate::core::table::Row;
    use crate::core::value::{Value, ValueType};

    fn columns() -> Vec<Column> {
        vec![
            Column::per_row("Id", ValueType::U16),
            Column::constant("Kind", Value::U8(1)).expect("constant"),
            Column::per_row("Label", ValueType::String),
            Column::per_row("Gain", ValueType::F32),
        ]
    }

    #[test]
    fn rows_round_trip_with_placeholders() {
        let columns = columns();
        let rows = vec![
            Row::from_values(vec![
                Value::U16(7),
                Value::Empty,
                Value::String("a".into()),
                Value::F32(0.25),
            ]),
            Row::from_values(vec![
                Value::U16(8),
                Value::Empty,
                Value::String("b".into()),
                Value::F32(-1.0),
            ]),
        ];
        let mut strings = StringPool::new();
        strings.intern("a").expect("intern");
        strings.intern("b").expect("intern");
        let stride = row_stride(&columns);
        assert_eq!(stride, 10);
        let layout = RowLayout {
            start: 4,
            stride,
            count: rows.len(),
        };

        let mut buf = vec![0u8; 4 + stride * rows.len()];
        let mut writer = Writer::new(&mut buf, Endian::Big);
        let data = DataPool::new();
        encode_rows(&mut writer, &columns, &rows, layout, &strings, &mut data.refs().iter())
            .expect("encode");
        assert_eq!(&buf[4..6], &[0, 7]);
        assert_eq!(&buf[14..16], &[0, 8]);

        let reader = Reader::new(&buf, Endian::Big);
        let decoded = decode_rows(
            &reader,
            &columns,
            layout,
            StringPoolRef::new(strings.as_bytes()),
            DataPoolRef::new(data.as_bytes()),
        )
        .expect("decode");
        assert_eq!(decoded, rows);
    }

    #[test]
    fn short_rows_are_refused() {
        let columns = columns();
        let rows = vec![Row::from_values(vec![Value::U16(1)])];
        let layout = RowLayout {
            start: 0,
            stride: row_stride(&columns),
            count: 1,
        };
        let mut buf = vec![0u8; 10];
        let mut writer = Writer::new(&mut buf, Endian::Big);
        let err = encode_rows(
            &mut writer,
            &columns,
            &rows,
            layout,
            &StringPool::new(),
            &mut std::iter::empty(),
        )
        .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.row(), Some(0));
    }

    #[test]
    fn bad_string_offsets_name_the_cell() {
        let columns = vec![Column::per_row("Label", ValueType::String)];
        let buf = [0u8, 0, 0, 99];
        let reader = Reader::new(&buf, Endian::Big);
        let layout = RowLayout {
            start: 0,
            stride: 4,
            count: 1,
        };
        let err = decode_rows(
            &reader,
            &columns,
            layout,
            StringPoolRef::new(b"x\0"),
            DataPoolRef::new(&[]),
        )
        .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.column(), Some("Label"));
        assert_eq!(err.row(), Some(0));
    }
}
