use crate::{dex_err, error::DexError, Result};

use super::{
    Cursor, DexFile, Header, Issue, MapItemType, DEX_ENDIAN_CONSTANT, DEX_MAGIC,
    DEX_MAGIC_VERSIONS,
};

/// Which header checks [`DexFile::open`] runs before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyPreset {
    #[default]
    None,
    /// Structural checks and the Adler-32 checksum.
    All,
    /// Structural checks only.
    NoChecksum,
    /// Only the checksum (and that the header fits).
    ChecksumOnly,
}

impl VerifyPreset {
    /// The preset matching a pair of `verify`/`verify_checksum` switches.
    pub fn from_flags(verify: bool, verify_checksum: bool) -> Self {
        match (verify, verify_checksum) {
            (true, true) => VerifyPreset::All,
            (true, false) => VerifyPreset::NoChecksum,
            (false, true) => VerifyPreset::ChecksumOnly,
            (false, false) => VerifyPreset::None,
        }
    }

    #[inline]
    fn structural(&self) -> bool {
        matches!(self, VerifyPreset::All | VerifyPreset::NoChecksum)
    }

    #[inline]
    fn checksum(&self) -> bool {
        matches!(self, VerifyPreset::All | VerifyPreset::ChecksumOnly)
    }
}

pub fn is_magic_valid(header: &Header) -> bool {
    &header.get_magic()[..4] == DEX_MAGIC
}

pub fn is_version_valid(header: &Header) -> bool {
    let version_raw = &header.get_magic()[4..];
    DEX_MAGIC_VERSIONS.contains(&version_raw)
}

/// Adler-32 of everything after the magic and the checksum field, up to the
/// declared file size (clamped to the buffer).
pub fn calculate_checksum(data: &[u8], header: &Header) -> u32 {
    let end = (header.file_size as usize).min(data.len());
    match data.get(12..end) {
        Some(rest) => adler32::adler32(rest).unwrap_or_default(),
        None => 1,
    }
}

/// Runs the header checks selected by `preset`.
pub fn check_header(data: &[u8], preset: VerifyPreset) -> Result<()> {
    let size = data.len();
    if size < std::mem::size_of::<Header>() {
        return dex_err!(TruncatedFile);
    }
    let header: Header = Cursor::new(data).read_plain()?;

    if preset.structural() {
        check_header_layout(&header, size)?;
    }

    if preset.checksum() {
        let checksum = calculate_checksum(data, &header);
        if checksum != header.checksum {
            return dex_err!(BadChecksum {
                actual: checksum,
                expected: header.checksum
            });
        }
    }
    Ok(())
}

fn check_header_layout(header: &Header, size: usize) -> Result<()> {
    if !is_magic_valid(header) {
        return dex_err!(BadFileMagic);
    }

    if !is_version_valid(header) {
        return dex_err!(UnknownDexVersion {
            version: header.get_version()
        });
    }

    // check file size from header
    let file_size = header.file_size as usize;
    let header_size = header.expected_size();
    if file_size < header_size {
        return dex_err!(FileSizeAtLeast {
            actual: file_size,
            expected: header_size
        });
    }
    if file_size > size {
        return dex_err!(FileSizeAtMost {
            actual: file_size,
            expected: size
        });
    }

    if header.header_size as usize != header_size {
        return dex_err!(BadHeaderSize {
            size: header.header_size,
            expected: header_size as u32
        });
    }

    if header.endian_tag != DEX_ENDIAN_CONSTANT {
        return dex_err!(UnexpectedEndianess, header.endian_tag);
    }

    // an absent map list has no size to check
    let map_size = match header.map_off {
        0 => 0,
        _ => std::mem::size_of::<u32>() as u32,
    };
    let sections = [
        (header.link_off, header.link_size, "link"),
        (header.map_off, map_size, "map"),
        (header.string_ids_off, header.string_ids_size, "string-ids"),
        (header.type_ids_off, header.type_ids_size, "type-ids"),
        (header.proto_ids_off, header.proto_ids_size, "proto-ids"),
        (header.field_ids_off, header.field_ids_size, "field-ids"),
        (header.method_ids_off, header.method_ids_size, "method-ids"),
        (header.class_defs_off, header.class_defs_size, "class-defs"),
        (header.data_off, header.data_size, "data"),
    ];
    for (offset, section_size, label) in sections {
        check_valid_offset_and_size(offset, section_size, file_size, label)?;
    }
    Ok(())
}

fn check_valid_offset_and_size(
    offset: u32,
    size: u32,
    file_size: usize,
    label: &'static str,
) -> Result<()> {
    if size == 0 {
        if offset != 0 {
            return dex_err!(BadOffsetNoSize {
                offset,
                section: label
            });
        }

        return Ok(());
    }

    let header_offset = std::mem::size_of::<Header>() as u32;
    if offset < header_offset {
        return dex_err!(BadOffsetInHeader {
            offset,
            header_size: header_offset as usize,
            section: label
        });
    }
    if offset as usize > file_size {
        return dex_err!(BadOffsetTooLarge {
            offset,
            size: file_size,
            section: label
        });
    }

    if (file_size - offset as usize) < size as usize {
        return dex_err!(BadSection {
            offset: offset.saturating_add(size),
            size: file_size,
            section: label
        });
    }
    Ok(())
}

/// Cross-checks the map list against the header and the file size. Every
/// disagreement becomes an [`Issue`] on the offending map item.
pub fn check_map_list(dex: &DexFile) -> Vec<Issue> {
    let header = dex.header();
    let file_size = dex.file_size();
    let mut issues = Vec::new();

    for item in dex.map_list().iter() {
        let mut flag = |error: DexError| {
            issues.push(Issue {
                offset: item.offset(),
                component: "map_item",
                error,
            })
        };

        if item.size != 0 && item.off as usize >= file_size {
            flag(DexError::BadOffsetTooLarge {
                offset: item.off,
                size: file_size,
                section: "map_item",
            });
            continue;
        }

        let expected = match item.item_type() {
            Some(MapItemType::HeaderItem) => Some(("header", 1, 0)),
            Some(MapItemType::MapList) => Some(("map", 1, header.map_off)),
            Some(MapItemType::StringIdItem) => Some((
                "string-ids",
                header.string_ids_size,
                header.string_ids_off,
            )),
            Some(MapItemType::TypeIdItem) => {
                Some(("type-ids", header.type_ids_size, header.type_ids_off))
            }
            Some(MapItemType::ProtoIdItem) => {
                Some(("proto-ids", header.proto_ids_size, header.proto_ids_off))
            }
            Some(MapItemType::FieldIdItem) => {
                Some(("field-ids", header.field_ids_size, header.field_ids_off))
            }
            Some(MapItemType::MethodIdItem) => {
                Some(("method-ids", header.method_ids_size, header.method_ids_off))
            }
            Some(MapItemType::ClassDefItem) => {
                Some(("class-defs", header.class_defs_size, header.class_defs_off))
            }
            _ => None,
        };

        if let Some((section, header_size, header_off)) = expected {
            if item.size != header_size || item.off != header_off {
                flag(DexError::MapMismatch {
                    section,
                    map_size: item.size,
                    map_off: item.off,
                    header_size,
                    header_off,
                });
            }
        }
    }
    issues
}
