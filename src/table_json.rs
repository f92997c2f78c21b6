//! Purpose: Render headers, layouts and decoded tables as JSON for `utftool`.
//! Exports: `header_json`, `layout_json`, `table_json`.
//! Role: Pure formatting helpers; no I/O and no decoding beyond nested blobs.
//! Invariants: Rows render only per-row columns; shared values appear once under `columns`.
//! Invariants: Duplicate column names render the first column, matching accessor lookup.
//! Invariants: `--nested` descends at most `MAX_NESTED_DEPTH` blob levels; deeper blobs stay hex.
use std::fmt::Write as _;

use serde_json::{Map, Value as Json, json};
use utftable::api::{self, Endian, Layout, StorageClass, Table, TableHeader, Value};

pub fn endian_name(endian: Endian) -> &'static str {
    match endian {
        Endian::Big => "big",
        Endian::Little => "little",
    }
}

pub fn header_json(header: &TableHeader) -> Json {
    json!({
        "endian": endian_name(header.endian),
        "table_size": header.table_size,
        "header_flag": header.header_flag,
        "rows_offset": header.rows_offset,
        "strings_offset": header.strings_offset,
        "data_offset": header.data_offset,
        "table_name_offset": header.table_name,
        "column_count": header.column_count,
        "row_stride": header.row_stride,
        "row_count": header.row_count,
    })
}

pub fn layout_json(layout: &Layout) -> Json {
    serde_json::to_value(layout).unwrap_or(Json::Null)
}

pub const MAX_NESTED_DEPTH: usize = 16;

pub fn table_json(table: &Table, nested: bool) -> Json {
    render_table(table, if nested { MAX_NESTED_DEPTH } else { 0 })
}

/// `depth` is how many more blob levels may be decoded as tables.
fn render_table(table: &Table, depth: usize) -> Json {
    let columns: Vec<Json> = table
        .columns()
        .iter()
        .map(|column| {
            let mut entry = Map::new();
            entry.insert("name".to_string(), json!(column.name()));
            entry.insert("storage".to_string(), json!(column.storage().name()));
            entry.insert("type".to_string(), json!(column.value_type().name()));
            if column.is_signed() {
                entry.insert("signed".to_string(), json!(true));
            }
            if column.storage() == StorageClass::Constant {
                if let Some(value) = column.constant_value() {
                    entry.insert("value".to_string(), value_json(value, depth));
                }
            }
            Json::Object(entry)
        })
        .collect();

    let rows: Vec<Json> = table
        .rows()
        .iter()
        .map(|row| {
            let mut cells = Map::new();
            for (column, value) in table.columns().iter().zip(row.values()) {
                if !column.storage().is_per_row() {
                    continue;
                }
                cells
                    .entry(column.name().to_string())
                    .or_insert_with(|| value_json(value, depth));
            }
            Json::Object(cells)
        })
        .collect();

    json!({
        "name": table.name,
        "endian": endian_name(table.endian),
        "header_flag": table.header_flag,
        "uses_null_sentinel": table.uses_null_sentinel,
        "columns": columns,
        "rows": rows,
    })
}

fn value_json(value: &Value, depth: usize) -> Json {
    match value {
        Value::Empty => Json::Null,
        Value::U8(inner) => json!(inner),
        Value::U16(inner) => json!(inner),
        Value::U32(inner) => json!(inner),
        Value::U64(inner) => json!(inner),
        Value::F32(inner) => json!(inner),
        Value::String(text) => match value.as_str() {
            Some(text) => json!(text),
            None => json!({ "hex": hex(text) }),
        },
        Value::Blob(bytes) => blob_json(bytes, depth),
    }
}

fn blob_json(bytes: &[u8], depth: usize) -> Json {
    if depth > 0 {
        if let Ok(table) = api::decode(bytes) {
            return json!({ "size": bytes.len(), "table": render_table(&table, depth - 1) });
        }
    }
    json!({ "size": bytes.len(), "hex": hex(bytes) })
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{MAX_NESTED_DEPTH, hex, table_json};
    use bstr::BString;
    use utftable::api::{self, Column, Table, Value, ValueType};

    #[test]
    fn rows_hold_only_per_row_cells() {
        let mut table = Table::new("T")
            .with_column(Column::per_row("Id", ValueType::U8))
            .with_column(Column::constant("Kind", Value::U8(4)).expect("constant"));
        let row = table.create_row();
        assert!(table.set_u8("Id", 9, row, false));
        let json = table_json(&table, false);
        assert_eq!(json["rows"][0]["Id"], 9);
        assert!(json["rows"][0].get("Kind").is_none());
        assert_eq!(json["columns"][1]["value"], 4);
        assert_eq!(json["columns"][1]["storage"], "constant");
    }

    #[test]
    fn blobs_render_as_hex_or_nested_tables() {
        let inner = Table::new("Inner");
        let mut outer = Table::new("Outer").with_column(Column::per_row("Data", ValueType::Blob));
        let row = outer.create_row();
        outer
            .set_nested_table("Data", &inner, row, false)
            .expect("nested");
        let bytes = api::encode(&inner).expect("encode");

        let flat = table_json(&outer, false);
        assert_eq!(flat["rows"][0]["Data"]["size"], bytes.len());
        assert_eq!(flat["rows"][0]["Data"]["hex"].as_str().map(str::len), Some(bytes.len() * 2));

        let nested = table_json(&outer, true);
        assert_eq!(nested["rows"][0]["Data"]["table"]["name"], "Inner");
    }

    #[test]
    fn nested_rendering_stops_at_the_depth_cap() {
        let mut table = Table::new("L0");
        for level in 1..=MAX_NESTED_DEPTH + 1 {
            let mut outer =
                Table::new(format!("L{level}")).with_column(Column::per_row("Data", ValueType::Blob));
            let row = outer.create_row();
            outer
                .set_nested_table("Data", &table, row, false)
                .expect("nested");
            table = outer;
        }

        let mut node = table_json(&table, true);
        for _ in 0..MAX_NESTED_DEPTH {
            node = node["rows"][0]["Data"]["table"].clone();
            assert!(node.is_object());
        }
        assert_eq!(node["name"], "L1");
        assert!(node["rows"][0]["Data"]["hex"].is_string());
        assert!(node["rows"][0]["Data"].get("table").is_none());
    }

    #[test]
    fn non_utf8_strings_render_as_hex() {
        let mut table = Table::new("T").with_column(Column::per_row("Name", ValueType::String));
        let row = table.create_row();
        table
            .try_set("Name", Value::String(BString::from(&b"\x83B"[..])), row, false)
            .expect("set");
        let json = table_json(&table, false);
        assert_eq!(json["rows"][0]["Name"]["hex"], "8342");
    }

    #[test]
    fn hex_is_lowercase_pairs() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
