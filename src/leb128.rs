use varint_simd::{self, VarIntTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leb128Error {
    /// The input ended before the terminating byte.
    Truncated,
    /// The value does not fit into the target type.
    Overflow,
}

#[inline(always)]
const fn max_encoded_len(bits: usize) -> usize {
    (bits + 6) / 7
}

/// Returns the number of bytes the LEB128 value at the start of `data_in`
/// occupies when decoded into a `bits` wide integer.
#[inline]
fn encoded_len(data_in: &[u8], bits: usize, unsigned: bool) -> Result<usize, Leb128Error> {
    let max_len = max_encoded_len(bits);
    let len = match data_in.iter().take(max_len).position(|b| b & 0x80 == 0) {
        Some(pos) => pos + 1,
        None if data_in.len() < max_len => return Err(Leb128Error::Truncated),
        None => return Err(Leb128Error::Overflow),
    };

    // the last group of a full-width encoding may only carry the remaining bits
    if unsigned && len == max_len {
        let spare_bits = bits - 7 * (max_len - 1);
        if (data_in[len - 1] as u32) >= (1 << spare_bits) {
            return Err(Leb128Error::Overflow);
        }
    }
    Ok(len)
}

#[inline(always)]
pub fn decode_leb128<T: VarIntTarget>(data_in: &[u8]) -> Result<(T, usize), Leb128Error> {
    let len = encoded_len(data_in, std::mem::size_of::<T>() * 8, true)?;
    match varint_simd::decode::<T>(&data_in[..len]) {
        Ok((value, size)) => Ok((value, size)),
        Err(_) => Err(Leb128Error::Overflow),
    }
}

#[inline(always)]
pub fn decode_leb128p1(data_in: &[u8]) -> Result<(i32, usize), Leb128Error> {
    let (result, size) = decode_leb128::<u32>(data_in)?;
    Ok((result.wrapping_sub(1) as i32, size))
}

pub fn decode_sleb128(data_in: &[u8]) -> Result<(i32, usize), Leb128Error> {
    let len = encoded_len(data_in, 32, false)?;
    let mut value: i32 = 0;
    let mut shift: u32 = 0;
    for byte in &data_in[..len] {
        value |= ((byte & 0x7F) as i32) << shift;
        shift += 7;
    }

    // sign extend from the last group
    if shift < 32 && data_in[len - 1] & 0x40 != 0 {
        value |= -1 << shift;
    }
    Ok((value, len))
}
