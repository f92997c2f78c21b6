// Codec properties over generated and hand-built tables, through the public API only.
use std::collections::HashSet;

use bstr::BString;

use utftable::api::{
    self, Column, Endian, ErrorKind, StorageClass, Table, ValidationStatus, Value, ValueType,
};

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }

    fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }
}

const TYPES: [ValueType; 7] = [
    ValueType::U8,
    ValueType::U16,
    ValueType::U32,
    ValueType::U64,
    ValueType::F32,
    ValueType::String,
    ValueType::Blob,
];

const WORDS: [&str; 7] = ["", "Foo", "Bar", "c0", "c1", "Table", "<NULL>"];

fn random_value(rng: &mut XorShift64, value_type: ValueType) -> Value {
    match value_type {
        ValueType::U8 => Value::U8(rng.next_u64() as u8),
        ValueType::U16 => Value::U16(rng.next_u64() as u16),
        ValueType::U32 => Value::U32(rng.next_u64() as u32),
        ValueType::U64 => Value::U64(rng.next_u64()),
        ValueType::F32 => Value::F32(rng.next_range(4096) as f32 / 8.0),
        ValueType::String => match rng.next_range(WORDS.len() + 1) {
            // Shift-JIS bytes that are not valid UTF-8.
            0 => Value::String(BString::from(vec![0x83, 0x42, 0x83, 0x5e])),
            pick => Value::String(WORDS[pick - 1].into()),
        },
        ValueType::Blob => {
            let len = rng.next_range(70);
            Value::Blob((0..len).map(|_| rng.next_u64() as u8).collect())
        }
    }
}

fn random_table(rng: &mut XorShift64) -> Table {
    let endian = if rng.next_bool() {
        Endian::Big
    } else {
        Endian::Little
    };
    let mut table = Table::new("Table")
        .with_endian(endian)
        .with_null_sentinel(rng.next_bool())
        .with_header_flag(rng.next_u64() as u16);

    for index in 0..rng.next_range(9) {
        let name = format!("c{index}");
        let value_type = TYPES[rng.next_range(TYPES.len())];
        let signed = rng.next_bool();
        let column = match rng.next_range(4) {
            0 => Column::absent(name, value_type).with_signed(true),
            1 => Column::zero(name, value_type),
            2 => Column::constant(name, random_value(rng, value_type))
                .expect("typed constant")
                .with_signed(signed),
            _ => Column::per_row(name, value_type).with_signed(signed),
        };
        table.add_column(column);
    }

    for _ in 0..rng.next_range(7) {
        let row = table.create_row();
        let targets: Vec<(String, ValueType)> = table
            .columns()
            .iter()
            .filter(|column| column.storage() == StorageClass::PerRow)
            .map(|column| (column.name().to_string(), column.value_type()))
            .collect();
        for (name, value_type) in targets {
            let value = random_value(rng, value_type);
            table.try_set(&name, value, row, false).expect("typed set");
        }
    }
    table
}

fn pooled(table: &Table) -> Vec<&Value> {
    let constants = table
        .columns()
        .iter()
        .filter_map(|column| column.constant_value());
    let cells = table.rows().iter().flat_map(|row| {
        table
            .columns()
            .iter()
            .zip(row.values())
            .filter(|(column, _)| column.storage() == StorageClass::PerRow)
            .map(|(_, value)| value)
    });
    constants.chain(cells).collect()
}

fn expected_string_entries(table: &Table) -> usize {
    let mut shared = HashSet::new();
    if table.uses_null_sentinel {
        shared.insert(b"<NULL>".to_vec());
    }
    shared.insert(table.name.clone().into_bytes());
    for value in pooled(table) {
        if let Some(text) = value.as_bstr() {
            shared.insert(text.to_vec());
        }
    }
    shared.len() + table.column_count()
}

fn expected_data_size(table: &Table) -> usize {
    pooled(table)
        .into_iter()
        .filter_map(Value::as_bytes)
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| bytes.len().div_ceil(32) * 32)
        .sum()
}

#[test]
fn prop_round_trip_and_size_fidelity() {
    for seed in [1u64, 7, 42, 99, 1234, 0xDEAD_BEEF] {
        let mut rng = XorShift64::new(seed);
        for _ in 0..40 {
            let table = random_table(&mut rng);
            let layout = api::plan_layout(&table).expect("layout");
            let bytes = api::encode(&table).expect("encode");
            assert_eq!(bytes.len(), layout.total_len, "seed {seed}");
            assert_eq!(bytes.len() % 32, 0);
            assert_eq!(layout.string_entries, expected_string_entries(&table));
            assert_eq!(layout.data_size, expected_data_size(&table));

            let decoded = api::decode(&bytes).expect("decode");
            assert_eq!(decoded, table, "seed {seed}");

            let header = api::read_header(&bytes).expect("header");
            let rederived = api::plan_layout(&decoded).expect("layout");
            assert_eq!(rederived.table_size, header.table_size as usize);
            assert_eq!(rederived.rows_offset, header.rows_offset as usize);
            assert_eq!(rederived.strings_offset, header.strings_offset as usize);
            assert_eq!(rederived.data_offset, header.data_offset as usize);
            assert_eq!(rederived.row_stride, header.row_stride as usize);

            assert_eq!(api::encode(&decoded).expect("re-encode"), bytes);
            assert_eq!(
                api::validate_container(&bytes).status,
                ValidationStatus::Ok
            );
        }
    }
}

#[test]
fn prop_truncated_containers_never_decode() {
    let mut rng = XorShift64::new(5);
    for _ in 0..20 {
        let table = random_table(&mut rng);
        let bytes = api::encode(&table).expect("encode");
        let cut = rng.next_range(bytes.len());
        let err = api::decode(&bytes[..cut]).expect_err("truncated");
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }
}

#[test]
fn cue_table_end_to_end() {
    let mut table = Table::new("CueTable")
        .with_column(Column::per_row("Id", ValueType::U32))
        .with_column(Column::per_row("Label", ValueType::String));
    for id in [1u32, 2] {
        let row = table.create_row();
        assert!(table.set_u32("Id", id, row, false));
        assert!(table.set_string("Label", "Intro", row, false));
    }

    let layout = api::plan_layout(&table).expect("layout");
    assert_eq!(layout.string_entries, 4);
    let bytes = api::encode(&table).expect("encode");
    let decoded = api::decode(&bytes).expect("decode");
    assert_eq!(decoded.name, "CueTable");
    assert_eq!(decoded.get_u32("Id", 1), Some(2));
    assert_eq!(decoded.get_string("Label", 0), Some("Intro"));
    assert_eq!(decoded.get_string("Id", 0), None);
}

#[test]
fn storage_classes_survive_decode() {
    let mut table = Table::new("Classes")
        .with_column(Column::constant("Version", Value::U32(7)).expect("constant"))
        .with_column(Column::absent("Gone", ValueType::U32))
        .with_column(Column::zero("Reserved", ValueType::U16))
        .with_column(Column::per_row("Id", ValueType::U8));
    for _ in 0..3 {
        table.create_row();
    }
    let mut decoded = api::decode(&api::encode(&table).expect("encode")).expect("decode");
    for row in 0..3 {
        assert_eq!(decoded.get_u32("Version", row), Some(7));
        assert_eq!(decoded.get_u32("Gone", row), None);
        assert_eq!(decoded.get_u16("Reserved", row), None);
    }
    assert!(!decoded.set_u32("Version", 8, 0, false));
    assert!(decoded.set_u32("Version", 8, 0, true));
    assert!(!decoded.set_u32("Gone", 1, 0, true));
    let again = api::decode(&api::encode(&decoded).expect("encode")).expect("decode");
    for row in 0..3 {
        assert_eq!(again.get_u32("Version", row), Some(8));
    }
}

#[test]
fn blob_successors_are_aligned() {
    let mut table = Table::new("Blobs").with_column(Column::per_row("Data", ValueType::Blob));
    for size in [5usize, 40, 3] {
        let row = table.create_row();
        assert!(table.set_blob("Data", &vec![0x5A; size], row, false));
    }
    let bytes = api::encode(&table).expect("encode");
    let header = api::read_header(&bytes).expect("header");
    let data_start = 8 + header.data_offset as usize;
    let rows_start = 8 + header.rows_offset as usize;
    let offsets: Vec<u32> = (0..3)
        .map(|row| {
            let at = rows_start + row * 8;
            u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        })
        .collect();
    assert_eq!(offsets, vec![0, 32, 96]);
    assert_eq!(&bytes[data_start + 32..data_start + 72], &[0x5A; 40][..]);
    assert!(bytes[data_start + 72..data_start + 96].iter().all(|byte| *byte == 0));
}
