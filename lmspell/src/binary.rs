//! Schema-implied binary encoding shared by the model and cache files.
//!
//! Fixed-size primitives are written as little-endian raw bytes. Containers
//! (strings, vectors, maps) are written as a `u32` element count followed by
//! each element; map entries are the key immediately followed by the value.
//! Nothing is self-describing: every type lists its fields explicitly, in
//! wire order, inside its [`BinaryFormat`] implementation.

use std::hash::Hash;
use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hashbrown::HashMap;
use smol_str::SmolStr;

/// Upper bound for speculative preallocation while decoding untrusted counts.
const MAX_PREALLOCATION: usize = 1 << 16;

pub trait BinaryFormat: Sized {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()>;
    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self>;
}

pub(crate) fn invalid_data<S: Into<String>>(msg: S) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

pub(crate) fn write_len<W: Write + ?Sized>(out: &mut W, len: usize) -> io::Result<()> {
    let len = u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("container of {} elements exceeds u32 length prefix", len),
        )
    })?;
    out.write_u32::<LittleEndian>(len)
}

pub(crate) fn read_len<R: Read + ?Sized>(input: &mut R) -> io::Result<usize> {
    Ok(input.read_u32::<LittleEndian>()? as usize)
}

/// Encodes `value` into a fresh buffer.
pub fn to_bytes<T: BinaryFormat>(value: &T) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.write_to(&mut buf)?;
    Ok(buf)
}

impl BinaryFormat for u8 {
    #[inline(always)]
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(*self)
    }

    #[inline(always)]
    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        input.read_u8()
    }
}

macro_rules! little_endian {
    ($ty:ty, $write:ident, $read:ident) => {
        impl BinaryFormat for $ty {
            #[inline(always)]
            fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
                out.$write::<LittleEndian>(*self)
            }

            #[inline(always)]
            fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
                input.$read::<LittleEndian>()
            }
        }
    };
}

little_endian!(u16, write_u16, read_u16);
little_endian!(u32, write_u32, read_u32);
little_endian!(u64, write_u64, read_u64);
little_endian!(f64, write_f64, read_f64);

impl BinaryFormat for char {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        (*self as u32).write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let raw = u32::read_from(input)?;
        char::from_u32(raw).ok_or_else(|| invalid_data(format!("invalid code point {:#x}", raw)))
    }
}

impl BinaryFormat for String {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write_len(out, self.len())?;
        out.write_all(self.as_bytes())
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let len = read_len(input)?;
        let mut buf = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        input.take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "string shorter than its length prefix",
            ));
        }
        String::from_utf8(buf).map_err(|e| invalid_data(e.to_string()))
    }
}

impl BinaryFormat for SmolStr {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write_len(out, self.len())?;
        out.write_all(self.as_bytes())
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        String::read_from(input).map(SmolStr::from)
    }
}

impl<T: BinaryFormat> BinaryFormat for Vec<T> {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write_len(out, self.len())?;
        for item in self {
            item.write_to(out)?;
        }
        Ok(())
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let len = read_len(input)?;
        let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        for _ in 0..len {
            items.push(T::read_from(input)?);
        }
        Ok(items)
    }
}

impl<A: BinaryFormat, B: BinaryFormat> BinaryFormat for (A, B) {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.0.write_to(out)?;
        self.1.write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let a = A::read_from(input)?;
        let b = B::read_from(input)?;
        Ok((a, b))
    }
}

impl<K, V> BinaryFormat for HashMap<K, V>
where
    K: BinaryFormat + Eq + Hash,
    V: BinaryFormat,
{
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write_len(out, self.len())?;
        for (key, value) in self {
            key.write_to(out)?;
            value.write_to(out)?;
        }
        Ok(())
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let len = read_len(input)?;
        let mut map = HashMap::with_capacity(len.min(MAX_PREALLOCATION));
        for _ in 0..len {
            let key = K::read_from(input)?;
            let value = V::read_from(input)?;
            if map.insert(key, value).is_some() {
                return Err(invalid_data("duplicate map key"));
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn containers_are_count_prefixed() {
        let value: Vec<u16> = vec![1, 2, 3];
        let bytes = to_bytes(&value).unwrap();

        assert_eq!(bytes, vec![3, 0, 0, 0, 1, 0, 2, 0, 3, 0]);
    }

    #[test]
    fn strings_are_utf8_bytes() {
        let bytes = to_bytes(&SmolStr::new("añ")).unwrap();

        assert_eq!(bytes, vec![3, 0, 0, 0, b'a', 0xc3, 0xb1]);
    }

    #[test]
    fn map_entries_are_key_then_value() {
        let mut map: HashMap<u8, u32> = HashMap::new();
        map.insert(7, 9);
        let bytes = to_bytes(&map).unwrap();

        assert_eq!(bytes, vec![1, 0, 0, 0, 7, 9, 0, 0, 0]);
    }

    #[test]
    fn truncated_string_is_eof() {
        let mut cursor = Cursor::new(vec![5, 0, 0, 0, b'a', b'b']);
        let err = String::read_from(&mut cursor).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn invalid_char_is_rejected() {
        let mut cursor = Cursor::new(0xd800u32.to_le_bytes().to_vec());
        let err = char::read_from(&mut cursor).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn nested_vectors_read_back() {
        let value: Vec<(u32, SmolStr)> = vec![(1, "one".into()), (2, "two".into())];
        let bytes = to_bytes(&value).unwrap();
        let decoded = Vec::<(u32, SmolStr)>::read_from(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(decoded, value);
    }
}
