use super::{RawItem, Resolver};

/// The fixed-layout `header_item` at the start of every dex file. It is the
/// only source of truth for where the other tables begin.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct Header {
    /// magic value
    magic: [u8; 8],

    /// Taken from Android docs:
    ///
    /// Adler32 checksum of the rest of the file (everything but `magic` and this
    /// field); used to detect file corruption.
    pub checksum: u32,

    /// Android docs:
    ///
    /// SHA-1 signature (hash) of the rest of the file (everything but `magic`,
    /// `checksum`, and this field); used to uniquely identify files.
    signature: [u8; 20],

    /// Size of the entire file including the header.
    pub file_size: u32,

    /// Size of the header (this struct), in bytes. It is always 0x70.
    pub header_size: u32,

    /// Endian contant - ART source code only supports one byte order
    pub endian_tag: u32,

    // unused {
    /// size of the link section, or 0 if this file isn't statically linked
    pub link_size: u32,

    /// offset from the start of the file to the link section, or `0` if
    /// `link_size == 0`. The offset, if non-zero, should be to an offset
    /// into the `link_data` section.
    pub link_off: u32,
    // } unused
    /// offset from the start of the file to the map item. The offset, which
    /// must be non-zero, should be to an offset into the `data` section.
    pub map_off: u32,

    /// count of strings in the string identifiers list
    pub string_ids_size: u32,

    /// offset from the start of the file to the string identifiers list, or
    /// `0` if `string_ids_size == 0`.
    pub string_ids_off: u32,

    /// count of elements in the type identifiers list, at most `65535`
    pub type_ids_size: u32,

    /// offset from the start of the file to the type identifiers list, or
    /// `0` if `type_ids_size == 0`.
    pub type_ids_off: u32,

    /// count of elements in the proto identifiers list, at most `65535`
    pub proto_ids_size: u32,

    /// offset from the start of the file to the proto identifiers list, or
    /// `0` if `proto_ids_size == 0`.
    pub proto_ids_off: u32,

    /// count of elements in the field identifiers list
    pub field_ids_size: u32,

    /// offset from the start of the file to the field identifiers list, or
    /// `0` if `field_ids_size == 0`.
    pub field_ids_off: u32,

    /// count of elements in the method identifiers list
    pub method_ids_size: u32,

    /// offset from the start of the file to the method identifiers list, or
    /// `0` if `method_ids_size == 0`.
    pub method_ids_off: u32,

    /// count of elements in the class definitions list
    pub class_defs_size: u32,

    /// offset from the start of the file to the class definitions list, or
    /// `0` if `class_defs_size == 0`.
    pub class_defs_off: u32,

    /// size of the data section (in bytes)
    pub data_size: u32,

    /// offset from the start of the file to the data section
    pub data_off: u32,
}

unsafe impl plain::Plain for Header {}

impl Header {
    pub fn get_magic(&self) -> &[u8; 8] {
        &self.magic
    }

    pub fn get_signature(&self) -> &[u8; 20] {
        &self.signature
    }

    /// The numeric version from the magic, `0` if it is not a number.
    pub fn get_version(&self) -> u32 {
        let version_raw = &self.magic[4..7];
        std::str::from_utf8(version_raw)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Header size a file of this version is expected to declare.
    pub fn expected_size(&self) -> usize {
        if self.get_version() >= 41 {
            std::mem::size_of::<HeaderV41>()
        } else {
            std::mem::size_of::<Header>()
        }
    }
}

impl RawItem for Header {
    const NAME: &'static str = "header_item";

    fn describe(&self, _resolver: &mut Resolver<'_>) -> Option<String> {
        Some(format!(
            "dex version {:03}, {} bytes",
            self.get_version(),
            self.file_size
        ))
    }
}

/// Header layout of version 041 files, which may share one container.
/// Only its size is used; the extra fields are not decoded.
#[repr(C)]
#[derive(Debug)]
pub struct HeaderV41 {
    pub inner: Header,
    pub container_size: u32, // total size of all dex files in the container.
    pub header_off: u32,     // offset of this dex's header in the container.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_from_magic() {
        let mut header = Header::default();
        header.magic = *b"dex\n039\0";
        assert_eq!(header.get_version(), 39);
        assert_eq!(header.expected_size(), 0x70);

        header.magic = *b"dex\n041\0";
        assert_eq!(header.expected_size(), 0x78);

        header.magic = *b"dex\nabc\0";
        assert_eq!(header.get_version(), 0);
    }

    #[test]
    fn test_layout_size() {
        assert_eq!(std::mem::size_of::<Header>(), 0x70);
    }
}
