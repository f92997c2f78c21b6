// Container and table header layout plus structural validation of section offsets.
use std::ops::Range;

use crate::core::cursor::{Endian, Reader, Writer};
use crate::core::error::{Error, ErrorKind};
use crate::core::format::{
    self, COLUMN_ENTRY_LEN, CONTAINER_HEADER_LEN, TABLE_BASE, TABLE_HEADER_LEN,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TableHeader {
    pub endian: Endian,
    /// Bytes following the 8-byte container header.
    pub table_size: u32,
    pub header_flag: u16,
    pub rows_offset: u16,
    pub strings_offset: u32,
    pub data_offset: u32,
    pub table_name: u32,
    pub column_count: u16,
    pub row_stride: u16,
    pub row_count: u32,
}

impl TableHeader {
    pub fn encode(&self, writer: &mut Writer<'_>) -> Result<(), Error> {
        writer.seek(0);
        writer.write_bytes(&format::magic_for(self.endian))?;
        writer.write_u32(self.table_size)?;
        writer.write_u16(self.header_flag)?;
        writer.write_u16(self.rows_offset)?;
        writer.write_u32(self.strings_offset)?;
        writer.write_u32(self.data_offset)?;
        writer.write_u32(self.table_name)?;
        writer.write_u16(self.column_count)?;
        writer.write_u16(self.row_stride)?;
        writer.write_u32(self.row_count)
    }

    /// Reads both headers and checks the declared size against `buf`.
    /// Section offsets are checked separately by `validate`.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let endian = format::detect_endian(buf)?;
        let mut reader = Reader::new(buf, endian);
        let table_size = reader.u32_at(4)?;
        let available = buf.len() - CONTAINER_HEADER_LEN;
        if table_size as usize > available {
            return Err(Error::new(ErrorKind::Truncated)
                .with_message(format!(
                    "declared table size {table_size} exceeds the {available} bytes after the header"
                ))
                .with_offset(4));
        }
        if (table_size as usize) < TABLE_HEADER_LEN {
            return Err(Error::new(ErrorKind::Truncated)
                .with_message("declared table size cannot hold the table header")
                .with_offset(4));
        }

        reader.seek(TABLE_BASE);
        Ok(Self {
            endian,
            table_size,
            header_flag: reader.read_u16()?,
            rows_offset: reader.read_u16()?,
            strings_offset: reader.read_u32()?,
            data_offset: reader.read_u32()?,
            table_name: reader.read_u32()?,
            column_count: reader.read_u16()?,
            row_stride: reader.read_u16()?,
            row_count: reader.read_u32()?,
        })
    }

    pub fn validate(&self) -> Result<(), Error> {
        let min_rows = TABLE_HEADER_LEN + self.column_count as usize * COLUMN_ENTRY_LEN;
        if (self.rows_offset as usize) < min_rows {
            return Err(corrupt("rows section overlaps the column array", 10));
        }
        if self.strings_offset < self.rows_offset as u32 {
            return Err(corrupt("string pool starts before the rows section", 12));
        }
        if self.data_offset < self.strings_offset {
            return Err(corrupt("data pool starts before the string pool", 16));
        }
        if self.data_offset > self.table_size {
            return Err(corrupt("data pool starts past the declared table size", 16));
        }
        let rows_len = self.row_stride as u64 * self.row_count as u64;
        if self.rows_offset as u64 + rows_len > self.strings_offset as u64 {
            return Err(corrupt("rows section overruns the string pool", 28));
        }
        Ok(())
    }

    pub fn container_len(&self) -> usize {
        CONTAINER_HEADER_LEN + self.table_size as usize
    }

    pub fn rows_start(&self) -> usize {
        TABLE_BASE + self.rows_offset as usize
    }

    pub fn strings_range(&self) -> Range<usize> {
        TABLE_BASE + self.strings_offset as usize..TABLE_BASE + self.data_offset as usize
    }

    pub fn data_range(&self) -> Range<usize> {
        TABLE_BASE + self.data_offset as usize..self.container_len()
    }
}

fn corrupt(message: &str, offset: u64) -> Error {
    Error::new(ErrorKind::Corrupt)
        .with_message(message)
        .with_offset(offset)
}
