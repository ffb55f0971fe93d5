use std::fmt::{self, Debug, Display};

use thiserror::Error;

/// Orchestrator stage a fatal error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Header,
    StringIds,
    TypeIds,
    ProtoIds,
    FieldIds,
    MethodIds,
    ClassDefs,
    MapList,
    StringData,
    ClassData,
    TypeLists,
}

impl DecodeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeStage::Header => "header",
            DecodeStage::StringIds => "string-ids",
            DecodeStage::TypeIds => "type-ids",
            DecodeStage::ProtoIds => "proto-ids",
            DecodeStage::FieldIds => "field-ids",
            DecodeStage::MethodIds => "method-ids",
            DecodeStage::ClassDefs => "class-defs",
            DecodeStage::MapList => "map-list",
            DecodeStage::StringData => "string-data",
            DecodeStage::ClassData => "class-data",
            DecodeStage::TypeLists => "type-lists",
        }
    }
}

impl Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error)]
pub enum DexError {
    #[error("Read of {len} byte(s) at offset {offset} exceeds buffer size {size}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("Failed to read {item_ty}[{index}] at offset {offset}: {source}")]
    TruncatedList {
        item_ty: &'static str,
        index: usize,
        offset: usize,
        #[source]
        source: Box<DexError>,
    },

    #[error("Index({index}) to {item_ty} should be less than {max}")]
    DanglingReference {
        index: u32,
        max: usize,
        item_ty: &'static str,
    },

    #[error("Offset({offset}) does not point to a decoded {item_ty}")]
    DanglingOffset { offset: u32, item_ty: &'static str },

    #[error("Malformed {kind} at offset {offset}")]
    MalformedEncoding { offset: usize, kind: &'static str },

    #[error("Encountered invalid encoded index that would overflow: index({index}) + next index({next_index}) > u32::MAX for {item_ty}")]
    BadEncodedIndex {
        index: u32,
        next_index: u32,
        item_ty: &'static str,
    },

    #[error("Got invalid mUTF8 encoded string at offset {offset}: truncated multi-byte sequence")]
    MalformedMUTF8Sequence { offset: usize },

    #[error("Failed to decode {stage} at offset {offset}: {source}")]
    Stage {
        stage: DecodeStage,
        offset: u32,
        #[source]
        source: Box<DexError>,
    },

    #[error("Empty or truncated file")]
    TruncatedFile,

    #[error("Bad file magic")]
    BadFileMagic,

    #[error("Unknown dex version: {version}")]
    UnknownDexVersion { version: u32 },

    #[error("Bad file size ({actual}, expected at least {expected})")]
    FileSizeAtLeast { actual: usize, expected: usize },

    #[error("Bad file size ({actual}, expected at most {expected})")]
    FileSizeAtMost { actual: usize, expected: usize },

    #[error("Bad header size: {size}, expected {expected}")]
    BadHeaderSize { size: u32, expected: u32 },

    #[error("Unexpected endian tag: {0:x}")]
    UnexpectedEndianess(u32),

    #[error("Bad checksum: {actual:#08x}, expected {expected:#08x}")]
    BadChecksum { actual: u32, expected: u32 },

    #[error("Offset({offset}) should be within file size {size} for {section}")]
    BadOffsetTooLarge {
        offset: u32,
        size: usize,
        section: &'static str,
    },

    #[error("Offset({offset}) should be after header({header_size}) for {section}")]
    BadOffsetInHeader {
        offset: u32,
        header_size: usize,
        section: &'static str,
    },

    #[error("Offset({offset}) should be zero when size is zero for {section}")]
    BadOffsetNoSize { offset: u32, section: &'static str },

    #[error("Section end({offset}) should be within file size {size} for {section}")]
    BadSection {
        offset: u32,
        size: usize,
        section: &'static str,
    },

    #[error("Map item for {section} ({map_size} @ {map_off:#x}) disagrees with header ({header_size} @ {header_off:#x})")]
    MapMismatch {
        section: &'static str,
        map_size: u32,
        map_off: u32,
        header_size: u32,
        header_off: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DexError {
    /// Wraps `self` as the top-level error of a fatal orchestrator stage.
    pub fn in_stage(self, stage: DecodeStage, offset: u32) -> DexError {
        DexError::Stage {
            stage,
            offset,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, unwrapping stage and list context.
    pub fn root_cause(&self) -> &DexError {
        match self {
            DexError::Stage { source, .. } | DexError::TruncatedList { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

#[macro_export]
macro_rules! dex_err {
    ($name:ident) => {
        Err($crate::error::DexError::$name)
    };
    ($name:ident { $($arg:tt)* }) => {
        Err($crate::error::DexError::$name { $($arg)* })
    };
    ($name:ident, $($arg:tt)*) => {
        Err($crate::error::DexError::$name($($arg)*))
    };
}

impl Debug for DexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_context() {
        let err = DexError::OutOfBounds {
            offset: 4,
            len: 4,
            size: 6,
        };
        let err = DexError::TruncatedList {
            item_ty: "string_ids",
            index: 1,
            offset: 4,
            source: Box::new(err),
        }
        .in_stage(DecodeStage::StringIds, 0x70);

        assert!(matches!(err, DexError::Stage { stage: DecodeStage::StringIds, .. }));
        assert!(matches!(err.root_cause(), DexError::OutOfBounds { offset: 4, .. }));
    }

    #[test]
    fn test_display_names_stage() {
        let err = DexError::TruncatedFile.in_stage(DecodeStage::Header, 0);
        assert_eq!(
            err.to_string(),
            "Failed to decode header at offset 0: Empty or truncated file"
        );
    }
}
