/// Codec Reader
///
/// Big-endian primitive reads for the linear codec used by P-Chain blocks.
/// Slices carry a u32 length prefix, strings a u16 length prefix, fixed-size
/// arrays carry none.
use super::ids::{Id, ShortId};
use super::CodecError;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

pub trait CodecRead: std::io::Read {
    /// Bytes left to read
    fn remaining(&self) -> usize;

    /// Current offset from the start of the input
    fn offset(&self) -> usize;

    #[inline]
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        Ok(ReadBytesExt::read_u8(self)?)
    }

    #[inline]
    fn read_u16_be(&mut self) -> Result<u16, CodecError> {
        Ok(ReadBytesExt::read_u16::<BigEndian>(self)?)
    }

    #[inline]
    fn read_u32_be(&mut self) -> Result<u32, CodecError> {
        Ok(ReadBytesExt::read_u32::<BigEndian>(self)?)
    }

    #[inline]
    fn read_u64_be(&mut self) -> Result<u64, CodecError> {
        Ok(ReadBytesExt::read_u64::<BigEndian>(self)?)
    }

    #[inline]
    fn read_i64_be(&mut self) -> Result<i64, CodecError> {
        Ok(ReadBytesExt::read_i64::<BigEndian>(self)?)
    }

    #[inline]
    fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut arr = [0u8; N];
        self.read_exact(&mut arr)?;
        Ok(arr)
    }

    #[inline]
    fn read_id(&mut self) -> Result<Id, CodecError> {
        Ok(Id::from(self.read_fixed::<32>()?))
    }

    #[inline]
    fn read_short_id(&mut self) -> Result<ShortId, CodecError> {
        Ok(ShortId::from(self.read_fixed::<20>()?))
    }

    /// Read a u32 length prefix, rejecting lengths that cannot fit in the rest
    /// of the input when every element takes at least `min_elem_size` bytes
    fn read_len(&mut self, min_elem_size: usize) -> Result<usize, CodecError> {
        let len = self.read_u32_be()? as usize;
        let needed = len.saturating_mul(min_elem_size.max(1));
        if needed > self.remaining() {
            return Err(CodecError::LengthOverflow { len, remaining: self.remaining() });
        }
        Ok(len)
    }

    /// Length-prefixed byte slice
    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_len(1)?;
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// u16 length-prefixed UTF-8 string
    fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u16_be()? as usize;
        if len > self.remaining() {
            return Err(CodecError::LengthOverflow { len, remaining: self.remaining() });
        }
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|_| CodecError::InvalidString)
    }

    /// Length-prefixed sequence where each element is read by `read_one`
    fn read_vec<T, F>(&mut self, min_elem_size: usize, mut read_one: F) -> Result<Vec<T>, CodecError>
    where
        Self: Sized,
        F: FnMut(&mut Self) -> Result<T, CodecError>,
    {
        let len = self.read_len(min_elem_size)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(read_one(self)?);
        }
        Ok(items)
    }
}

impl CodecRead for Cursor<&[u8]> {
    fn remaining(&self) -> usize {
        self.get_ref().len().saturating_sub(self.position() as usize)
    }

    fn offset(&self) -> usize {
        self.position() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian() {
        let data = [0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0xff];
        let mut cursor = Cursor::new(&data[..]);

        assert_eq!(cursor.read_u16_be().unwrap(), 1);
        assert_eq!(cursor.read_u32_be().unwrap(), 2);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.offset(), 6);
        assert_eq!(cursor.read_byte().unwrap(), 0xff);
        assert!(matches!(cursor.read_byte(), Err(CodecError::UnexpectedEof)));
    }

    #[test]
    fn test_read_bytes_and_string() {
        let data = [0, 0, 0, 3, b'a', b'b', b'c', 0, 2, b'h', b'i'];
        let mut cursor = Cursor::new(&data[..]);

        assert_eq!(cursor.read_bytes().unwrap(), b"abc".to_vec());
        assert_eq!(cursor.read_string().unwrap(), "hi");
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_length_prefix_larger_than_input_is_rejected() {
        // Claims 1000 elements of at least 4 bytes but only 4 bytes follow
        let data = [0, 0, 0x03, 0xe8, 0, 0, 0, 1];
        let mut cursor = Cursor::new(&data[..]);

        let err = cursor.read_vec(4, |c| c.read_u32_be()).unwrap_err();
        assert!(matches!(err, CodecError::LengthOverflow { len: 1000, remaining: 4 }));
    }

    #[test]
    fn test_read_vec() {
        let data = [0, 0, 0, 2, 0, 0, 0, 7, 0, 0, 0, 9];
        let mut cursor = Cursor::new(&data[..]);

        let values = cursor.read_vec(4, |c| c.read_u32_be()).unwrap();
        assert_eq!(values, vec![7, 9]);
    }
}
