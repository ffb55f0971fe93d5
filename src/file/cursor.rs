//! Bounds-checked reader over an immutable dex buffer.
//!
//! A [`Cursor`] owns a position into the buffer. Components read themselves
//! sequentially from it, and jump to absolute offsets for data that is only
//! reachable through offsets stored elsewhere in the file. Setting the
//! position never fails; a bad position surfaces as
//! [`DexError::OutOfBounds`] on the next read, and a failed read leaves the
//! position where it was.

use plain::Plain;

use crate::{
    dex_err,
    error::DexError,
    leb128::{self, Leb128Error},
    Result,
};

use super::Span;

pub struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, position: 0 }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the current position and the end of the buffer.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    #[inline(always)]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline(always)]
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// The span covered from `start` up to the current position.
    #[inline]
    pub fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.position.saturating_sub(start))
    }

    /// Runs `f` with the cursor moved to `offset` and restores the previous
    /// position afterwards, regardless of the outcome.
    pub fn with_position<T, F>(&mut self, offset: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved = self.position;
        self.position = offset;
        let result = f(self);
        self.position = saved;
        result
    }

    #[inline]
    fn out_of_bounds(&self, len: usize) -> DexError {
        DexError::OutOfBounds {
            offset: self.position,
            len,
            size: self.data.len(),
        }
    }

    #[inline]
    fn leb128_error(&self, err: Leb128Error, kind: &'static str) -> DexError {
        match err {
            Leb128Error::Truncated => self.out_of_bounds(self.remaining() + 1),
            Leb128Error::Overflow => DexError::MalformedEncoding {
                offset: self.position,
                kind,
            },
        }
    }

    pub fn read_fixed_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = match self.position.checked_add(len) {
            Some(end) if end <= self.data.len() => end,
            _ => return Err(self.out_of_bounds(len)),
        };
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut value = [0u8; N];
        value.copy_from_slice(self.read_fixed_bytes(N)?);
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    #[inline]
    fn rest(&self) -> &'a [u8] {
        self.data.get(self.position..).unwrap_or_default()
    }

    pub fn read_uleb128(&mut self) -> Result<u32> {
        match leb128::decode_leb128::<u32>(self.rest()) {
            Ok((value, size)) => {
                self.position += size;
                Ok(value)
            }
            Err(err) => Err(self.leb128_error(err, "uleb128")),
        }
    }

    pub fn read_uleb128p1(&mut self) -> Result<i32> {
        match leb128::decode_leb128p1(self.rest()) {
            Ok((value, size)) => {
                self.position += size;
                Ok(value)
            }
            Err(err) => Err(self.leb128_error(err, "uleb128p1")),
        }
    }

    pub fn read_sleb128(&mut self) -> Result<i32> {
        match leb128::decode_sleb128(self.rest()) {
            Ok((value, size)) => {
                self.position += size;
                Ok(value)
            }
            Err(err) => Err(self.leb128_error(err, "sleb128")),
        }
    }

    /// Reads up to the first byte matching `terminator`. The returned slice
    /// excludes the terminator, which is consumed as well.
    pub fn read_until<P>(&mut self, terminator: P) -> Result<&'a [u8]>
    where
        P: Fn(u8) -> bool,
    {
        let rest = self.rest();
        match rest.iter().position(|b| terminator(*b)) {
            Some(pos) => {
                self.position += pos + 1;
                Ok(&rest[..pos])
            }
            None => dex_err!(OutOfBounds {
                offset: self.position,
                len: rest.len() + 1,
                size: self.data.len(),
            }),
        }
    }

    /// Copies a fixed-layout little-endian record out of the buffer.
    pub fn read_plain<T: Plain + Default>(&mut self) -> Result<T> {
        let start = self.position;
        let bytes = self.read_fixed_bytes(std::mem::size_of::<T>())?;
        let mut value = T::default();
        if plain::copy_from_bytes(&mut value, bytes).is_err() {
            self.position = start;
            return Err(self.out_of_bounds(std::mem::size_of::<T>()));
        }
        Ok(value)
    }
}
