use crate::{dex_err, Result};

/// Decodes MUTF-8 data into a `String`. Decoding stops at the first NUL byte
/// if there is one.
///
/// A multi-byte sequence cut short by the end of the input is an error;
/// unpaired surrogates are replaced with U+FFFD.
pub fn mutf8_to_str(utf8_data_in: &[u8]) -> Result<String> {
    let mut utf16_data = Vec::with_capacity(mutf8_len(utf8_data_in));
    if let Err(offset) = convert_mutf8_to_utf16(utf8_data_in, &mut utf16_data) {
        return dex_err!(MalformedMUTF8Sequence { offset });
    }
    Ok(String::from_utf16_lossy(&utf16_data))
}

/// Like [`mutf8_to_str`], but a truncated trailing sequence is replaced with
/// U+FFFD instead of failing.
pub fn mutf8_to_str_lossy(utf8_data_in: &[u8]) -> String {
    let mut utf16_data = Vec::with_capacity(mutf8_len(utf8_data_in));
    if convert_mutf8_to_utf16(utf8_data_in, &mut utf16_data).is_err() {
        utf16_data.push(0xFFFD);
    }
    String::from_utf16_lossy(&utf16_data)
}

pub fn str_to_mutf8(str_data_in: &str) -> Vec<u8> {
    let utf16_data_in: Vec<u16> = str_data_in.encode_utf16().collect();
    utf16_to_mutf8(&utf16_data_in, &Options::new())
}

pub fn str_to_mutf8_lossy(str_data_in: &str) -> Vec<u8> {
    let utf16_data_in: Vec<u16> = str_data_in.encode_utf16().collect();
    let options = Options::new().replace_bad_surrogates(true);
    utf16_to_mutf8(&utf16_data_in, &options)
}

/// Decodes one character starting at `offset`. Four byte sequences are
/// returned as a surrogate pair packed into the result (lead in the low half).
#[inline]
fn utf16_from_utf8(utf8_data_in: &[u8], offset: &mut usize) -> Option<u32> {
    let mut next = || {
        let byte = utf8_data_in.get(*offset).copied();
        *offset += 1;
        byte
    };

    let one = next()?;
    if one & 0x80 == 0 {
        return Some(one as u32);
    }

    let two = next()?;
    if one & 0x20 == 0 {
        return Some(((one & 0x1f) as u32) << 6 | (two & 0x3F) as u32);
    }

    let three = next()?;
    if one & 0x10 == 0 {
        return Some(
            ((one & 0x0f) as u32) << 12 | ((two & 0x3F) as u32) << 6 | (three & 0x3F) as u32,
        );
    }

    let four = next()?;
    let code_point = ((one & 0x07) as u32) << 18
        | ((two & 0x3F) as u32) << 12
        | ((three & 0x3F) as u32) << 6
        | (four & 0x3F) as u32;

    let mut surrogate_pair: u32 = 0x00;
    surrogate_pair |= ((code_point >> 10) + 0xd7c0) & 0xFFFF;
    surrogate_pair |= ((code_point & 0x03FF) + 0xdc00) << 16;
    Some(surrogate_pair)
}

#[inline(always)]
fn trailing_utf16_char(maybe_pair: u32) -> u16 {
    (maybe_pair >> 16) as u16
}

#[inline(always)]
fn leading_utf16_char(maybe_pair: u32) -> u16 {
    (maybe_pair & 0x0000FFFF) as u16
}

#[inline(always)]
fn is_lead(ch: u16) -> bool {
    ch & 0xFC00 == 0xD800
}

#[inline(always)]
fn is_trail(ch: u16) -> bool {
    ch & 0xFC00 == 0xDC00
}

#[inline(always)]
fn get_supplementary(lead: u16, trail: u16) -> u32 {
    const OFFSET: u32 = (0xd800 << 10) + 0xdc00 - 0x10000;
    ((lead as u32) << 10) + (trail as u32) - OFFSET
}

/// Number of UTF-16 code units the MUTF-8 input decodes to, up to the first
/// NUL byte.
pub fn mutf8_len(utf8_data_in: &[u8]) -> usize {
    let mut len = 0;
    let mut in_idx = 0;
    while in_idx < utf8_data_in.len() {
        let ic = utf8_data_in[in_idx];
        if ic == 0 {
            break;
        }
        in_idx += 1;
        len += 1;
        if ic & 0x80 == 0 {
            continue; // one byte encoding
        }

        in_idx += 1;
        if ic & 0x20 == 0 {
            continue; // two byte encoding
        }

        in_idx += 1;
        if ic & 0x10 == 0 {
            continue;
        }

        // four byte encoding, becomes a surrogate pair
        in_idx += 1;
        len += 1;
    }
    len
}

/// Appends the decoded code units to `utf16_data_out`; on a truncated
/// sequence returns the offset the sequence started at.
fn convert_mutf8_to_utf16(
    utf8_data_in: &[u8],
    utf16_data_out: &mut Vec<u16>,
) -> std::result::Result<(), usize> {
    let end = utf8_data_in
        .iter()
        .position(|x| *x == 0)
        .unwrap_or(utf8_data_in.len());
    let utf8_data_in = &utf8_data_in[..end];

    if utf8_data_in.is_ascii() {
        // common case where all chars are ASCII
        utf16_data_out.extend(utf8_data_in.iter().map(|i| *i as u16));
        return Ok(());
    }

    let mut in_idx = 0x00;
    while in_idx < utf8_data_in.len() {
        let start = in_idx;
        let ch = utf16_from_utf8(utf8_data_in, &mut in_idx).ok_or(start)?;
        utf16_data_out.push(leading_utf16_char(ch));
        let trailing = trailing_utf16_char(ch);
        if trailing != 0 {
            utf16_data_out.push(trailing);
        }
    }
    Ok(())
}

fn utf16_to_mutf8(utf16_in: &[u16], options: &Options) -> Vec<u8> {
    let mut mutf8_out = Vec::with_capacity(utf16_in.len() + 1);
    convert_utf16_to_mutf8(utf16_in, options, |ch| mutf8_out.push(ch));

    // append trailing null
    mutf8_out.push(0x00);
    mutf8_out
}

pub struct Options {
    pub short_zero: bool,
    pub replace_bad_surrogates: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    pub fn new() -> Options {
        Options {
            short_zero: false,
            replace_bad_surrogates: false,
        }
    }

    pub fn use_short_zero(mut self, enable: bool) -> Self {
        self.short_zero = enable;
        self
    }

    pub fn replace_bad_surrogates(mut self, enable: bool) -> Self {
        self.replace_bad_surrogates = enable;
        self
    }
}

fn convert_utf16_to_mutf8<Append>(utf16_in: &[u16], options: &Options, mut append: Append)
where
    Append: FnMut(u8),
{
    let mut in_idx = 0;
    while in_idx < utf16_in.len() {
        let ch = utf16_in[in_idx];
        let next = utf16_in.get(in_idx + 1).copied();
        if ch < 0x80 && (options.short_zero || ch != 0) {
            append(ch as u8);
        } else if ch < 0x800 {
            append(((ch >> 6) | 0xC0) as u8);
            append(((ch & 0x3F) | 0x80) as u8);
        } else if is_lead(ch) && next.is_some_and(is_trail) {
            let code_point = get_supplementary(ch, next.unwrap_or_default());
            in_idx += 1;
            append(((code_point >> 18) | 0xf0) as u8);
            append((((code_point >> 12) & 0x3f) | 0x80) as u8);
            append((((code_point >> 6) & 0x3f) | 0x80) as u8);
            append(((code_point & 0x3f) | 0x80) as u8);
        } else if options.replace_bad_surrogates && (is_lead(ch) || is_trail(ch)) {
            append(b'?');
        } else {
            append(((ch >> 12) | 0xE0) as u8);
            append((((ch >> 6) & 0x3F) | 0x80) as u8);
            append(((ch & 0x3F) | 0x80) as u8);
        }

        in_idx += 1;
    }
}
