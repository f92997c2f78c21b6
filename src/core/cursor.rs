// Bounds-checked, endian-aware reads and writes over container buffers.
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

impl Endian {
    fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        }
    }

    fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Big => u32::from_be_bytes(bytes),
            Endian::Little => u32::from_le_bytes(bytes),
        }
    }

    fn u64_from(self, bytes: [u8; 8]) -> u64 {
        match self {
            Endian::Big => u64::from_be_bytes(bytes),
            Endian::Little => u64::from_le_bytes(bytes),
        }
    }

    fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    fn u64_bytes(self, value: u64) -> [u8; 8] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }
}

/// Read side. Absolute `*_at` reads never move the position; `read_*` reads advance it.
#[derive(Clone, Copy, Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    endian: Endian,
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self {
            buf,
            endian,
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn bytes_at(&self, offset: usize, len: usize) -> Result<&'a [u8], Error> {
        let end = offset.checked_add(len).ok_or_else(|| out_of_bounds(offset, len))?;
        if end > self.buf.len() {
            return Err(Error::new(ErrorKind::Truncated)
                .with_message(format!(
                    "read of {len} bytes exceeds buffer of {} bytes",
                    self.buf.len()
                ))
                .with_offset(offset as u64));
        }
        Ok(&self.buf[offset..end])
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes_at(offset, N)?);
        Ok(out)
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8, Error> {
        Ok(self.array_at::<1>(offset)?[0])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16, Error> {
        Ok(self.endian.u16_from(self.array_at(offset)?))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32, Error> {
        Ok(self.endian.u32_from(self.array_at(offset)?))
    }

    pub fn u64_at(&self, offset: usize) -> Result<u64, Error> {
        Ok(self.endian.u64_from(self.array_at(offset)?))
    }

    pub fn f32_at(&self, offset: usize) -> Result<f32, Error> {
        Ok(f32::from_bits(self.u32_at(offset)?))
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let value = self.u8_at(self.pos)?;
        self.pos += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let value = self.u16_at(self.pos)?;
        self.pos += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let value = self.u32_at(self.pos)?;
        self.pos += 4;
        Ok(value)
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        let value = self.u64_at(self.pos)?;
        self.pos += 8;
        Ok(value)
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        let value = self.f32_at(self.pos)?;
        self.pos += 4;
        Ok(value)
    }
}

/// Write side over a preallocated buffer. Writing past the end means the size
/// plan and the encoder disagree, which is reported as `Internal`.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    endian: Endian,
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8], endian: Endian) -> Self {
        Self {
            buf,
            endian,
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn put_bytes_at(&mut self, offset: usize, bytes: &[u8]) -> Result<(), Error> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                Error::new(ErrorKind::Internal)
                    .with_message(format!(
                        "write of {} bytes exceeds planned buffer of {} bytes",
                        bytes.len(),
                        self.buf.len()
                    ))
                    .with_offset(offset as u64)
            })?;
        self.buf[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn put_u8_at(&mut self, offset: usize, value: u8) -> Result<(), Error> {
        self.put_bytes_at(offset, &[value])
    }

    pub fn put_u16_at(&mut self, offset: usize, value: u16) -> Result<(), Error> {
        let bytes = self.endian.u16_bytes(value);
        self.put_bytes_at(offset, &bytes)
    }

    pub fn put_u32_at(&mut self, offset: usize, value: u32) -> Result<(), Error> {
        let bytes = self.endian.u32_bytes(value);
        self.put_bytes_at(offset, &bytes)
    }

    pub fn put_u64_at(&mut self, offset: usize, value: u64) -> Result<(), Error> {
        let bytes = self.endian.u64_bytes(value);
        self.put_bytes_at(offset, &bytes)
    }

    pub fn put_f32_at(&mut self, offset: usize, value: f32) -> Result<(), Error> {
        self.put_u32_at(offset, value.to_bits())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.put_bytes_at(self.pos, bytes)?;
        self.pos += bytes.len();
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.put_u8_at(self.pos, value)?;
        self.pos += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), Error> {
        self.put_u16_at(self.pos, value)?;
        self.pos += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        self.put_u32_at(self.pos, value)?;
        self.pos += 4;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), Error> {
        self.put_u64_at(self.pos, value)?;
        self.pos += 8;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), Error> {
        self.put_f32_at(self.pos, value)?;
        self.pos += 4;
        Ok(())
    }
}

fn out_of_bounds(offset: usize, len: usize) -> Error {
    Error::new(ErrorKind::Truncated)
        .with_message(format!("range of {len} bytes overflows"))
        .with_offset(offset as u64)
}
