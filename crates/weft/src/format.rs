// Binary format primitives: little-endian scalar and string I/O, magic
// numbers. All container and table formats are little-endian on disk; the
// magic numbers double as endianness probes.

use std::io::{self, Read, Write};

/// Magic number of the FST container format ("WFST" as LE bytes).
pub const FST_MAGIC: i32 = 0x5453_4657;

/// Magic number identifying stream data as an encode table.
pub const ENCODE_TABLE_MAGIC: i32 = 2129983209;

/// Magic number of a serialized symbol table.
pub const SYMBOL_TABLE_MAGIC: i32 = 2125658996;

pub fn write_i32<W: Write>(w: &mut W, value: i32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_i64<W: Write>(w: &mut W, value: i64) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_u64<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Single-byte boolean presence flag.
pub fn write_u8_flag<W: Write>(w: &mut W, value: bool) -> io::Result<()> {
    w.write_all(&[u8::from(value)])
}

pub fn read_u8_flag<R: Read>(r: &mut R) -> io::Result<bool> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0] != 0)
}

/// Length-prefixed UTF-8 string.
pub fn write_string<W: Write>(w: &mut W, value: &str) -> io::Result<()> {
    write_u32(w, value.len() as u32)?;
    w.write_all(value.as_bytes())
}

pub fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trips() {
        let mut buf = Vec::new();
        write_i32(&mut buf, -7).unwrap();
        write_u32(&mut buf, 0xDEAD_BEEF).unwrap();
        write_i64(&mut buf, i64::MIN).unwrap();
        write_u64(&mut buf, u64::MAX).unwrap();

        let mut r = buf.as_slice();
        assert_eq!(read_i32(&mut r).unwrap(), -7);
        assert_eq!(read_u32(&mut r).unwrap(), 0xDEAD_BEEF);
        assert_eq!(read_i64(&mut r).unwrap(), i64::MIN);
        assert_eq!(read_u64(&mut r).unwrap(), u64::MAX);
    }

    #[test]
    fn string_round_trip() {
        let mut buf = Vec::new();
        write_string(&mut buf, "standard").unwrap();
        write_string(&mut buf, "").unwrap();
        let mut r = buf.as_slice();
        assert_eq!(read_string(&mut r).unwrap(), "standard");
        assert_eq!(read_string(&mut r).unwrap(), "");
    }

    #[test]
    fn truncated_read_fails() {
        let buf = [0u8; 2];
        assert!(read_i32(&mut buf.as_ref()).is_err());
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 2).unwrap();
        buf.extend_from_slice(&[0xFF, 0xFE]);
        assert!(read_string(&mut buf.as_slice()).is_err());
    }
}
