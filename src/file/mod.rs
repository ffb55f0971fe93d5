use std::fmt::{self, Display};

pub mod cursor;
pub use cursor::*;
pub mod component;
pub use component::*;
pub mod list;
pub use list::*;
pub mod offsets;
pub use offsets::*;
pub mod structs;
pub use structs::*;
pub mod header;
pub use header::*;
pub mod data;
pub use data::*;
pub mod modifiers;
pub use modifiers::*;
pub mod verifier;
pub use verifier::VerifyPreset;
pub mod container;
pub use container::*;
pub mod dump;

use crate::{dex_err, error::DecodeStage, Result};

pub const DEX_MAGIC: &[u8] = b"dex\n";
pub const DEX_MAGIC_VERSIONS: &[&[u8]] = &[
    b"035\0", b"037\0", // Dex version 038: Android "O" and beyond.
    b"038\0", // Dex version 039: Android "P" and beyond.
    b"039\0", // Dex version 040: Android "Q" and beyond (aka Android 10).
    b"040\0", // Dex version 041: Android "V" and beyond (aka Android 15).
    b"041\0",
];

pub const DEX_ENDIAN_CONSTANT: u32 = 0x12345678;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DexLocation {
    #[default]
    InMemory,
    Path(String),
}

impl From<&str> for DexLocation {
    fn from(s: &str) -> Self {
        DexLocation::Path(s.to_string())
    }
}

impl Display for DexLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DexLocation::InMemory => f.write_str("[in-memory]"),
            DexLocation::Path(path) => f.write_str(path),
        }
    }
}

pub type IdTable<T> = FixedList<Item<T>>;

/// A fully decoded dex file.
///
/// The file owns every decoded component. Index tables and class defs only
/// carry indices and offsets; the data-pool collections are the arenas
/// those offsets point into.
#[derive(Debug, Default)]
pub struct DexFile {
    location: DexLocation,
    file_size: usize,

    header: Item<Header>,
    string_ids: IdTable<StringId>,
    type_ids: IdTable<TypeId>,
    proto_ids: IdTable<ProtoId>,
    field_ids: IdTable<FieldId>,
    method_ids: IdTable<MethodId>,
    class_defs: IdTable<ClassDef>,
    map_list: MapList,

    string_data: OffsetList<StringDataItem>,
    class_data: OffsetList<ClassDataItem>,
    type_lists: OffsetList<TypeList>,

    issues: Vec<Issue>,
}

macro_rules! check_lt_result {
    ($idx:expr, $count:expr, $item_ty:tt) => {
        if ($idx as usize) >= ($count as usize) {
            return dex_err!(DanglingReference {
                index: $idx as u32,
                item_ty: stringify!($item_ty),
                max: $count as usize,
            });
        }
    };
}

// Resolves one part of the file at a time. The part is moved out while it
// resolves so the rest of the file can be borrowed for lookups; no part ever
// needs to look itself up.
macro_rules! resolve_parts {
    ($dex:ident, $($part:ident),+ $(,)?) => {
        $(
            let mut part = std::mem::take(&mut $dex.$part);
            let mut resolver = Resolver::new(&*$dex);
            part.resolve(&mut resolver);
            let issues = resolver.finish();
            $dex.$part = part;
            $dex.issues.extend(issues);
        )+
    };
}

fn read_id_table<T: RawItem>(
    cursor: &mut Cursor<'_>,
    stage: DecodeStage,
    name: &'static str,
    offset: u32,
    count: u32,
) -> Result<IdTable<T>> {
    log::debug!("{stage}: {count} item(s) at {offset:#x}");
    cursor.set_position(offset as usize);
    cursor
        .read_fixed_list(name, count as usize, Item::default)
        .map_err(|err| err.in_stage(stage, offset))
}

impl DexFile {
    /// Decodes `data` without verifying it.
    ///
    /// Header, index tables, class defs and the map list must decode or the
    /// whole file is rejected. Data-pool blocks that fail are recorded and
    /// available through [`DexFile::failures`].
    pub fn from_raw_parts(data: &[u8], location: DexLocation) -> Result<DexFile> {
        let mut dex = DexFile {
            location,
            ..DexFile::default()
        };
        let mut cursor = Cursor::new(data);
        dex.read(&mut cursor)?;
        dex.resolve_references();
        Ok(dex)
    }

    /// Verifies the header according to `preset`, decodes the file and
    /// cross-checks the map list against the header.
    pub fn open(data: &[u8], location: DexLocation, preset: VerifyPreset) -> Result<DexFile> {
        if preset != VerifyPreset::None {
            verifier::check_header(data, preset)?;
        }

        let mut dex = DexFile::from_raw_parts(data, location)?;
        if preset != VerifyPreset::None {
            let issues = verifier::check_map_list(&dex);
            for issue in &issues {
                log::warn!("{}: {}", dex.location, issue.error);
            }
            dex.issues.extend(issues);
        }
        Ok(dex)
    }

    fn resolve_references(&mut self) {
        let dex = self;
        resolve_parts!(
            dex,
            header,
            string_ids,
            type_ids,
            proto_ids,
            field_ids,
            method_ids,
            class_defs,
            map_list,
            string_data,
            class_data,
            type_lists,
        );
        for issue in &dex.issues {
            log::debug!(
                "unresolved reference in {} at {:#x}: {}",
                issue.component,
                issue.offset,
                issue.error
            );
        }
    }

    /// Offsets of every type list referenced by class interfaces and method
    /// prototypes, in table order. Absent offsets are skipped.
    fn type_list_offsets(&self) -> Vec<u32> {
        let interfaces = self.class_defs.iter().map(|c| c.interfaces_off);
        let parameters = self.proto_ids.iter().map(|p| p.parameters_off);
        interfaces
            .chain(parameters)
            .filter(|off| *off != NO_OFFSET)
            .collect()
    }

    #[inline(always)]
    pub fn location(&self) -> &DexLocation {
        &self.location
    }

    #[inline(always)]
    pub fn file_size(&self) -> usize {
        self.file_size
    }

    #[inline(always)]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline(always)]
    pub fn header_item(&self) -> &Item<Header> {
        &self.header
    }

    #[inline(always)]
    pub fn string_ids(&self) -> &IdTable<StringId> {
        &self.string_ids
    }

    #[inline(always)]
    pub fn type_ids(&self) -> &IdTable<TypeId> {
        &self.type_ids
    }

    #[inline(always)]
    pub fn proto_ids(&self) -> &IdTable<ProtoId> {
        &self.proto_ids
    }

    #[inline(always)]
    pub fn field_ids(&self) -> &IdTable<FieldId> {
        &self.field_ids
    }

    #[inline(always)]
    pub fn method_ids(&self) -> &IdTable<MethodId> {
        &self.method_ids
    }

    #[inline(always)]
    pub fn class_defs(&self) -> &IdTable<ClassDef> {
        &self.class_defs
    }

    #[inline(always)]
    pub fn map_list(&self) -> &MapList {
        &self.map_list
    }

    #[inline(always)]
    pub fn string_data(&self) -> &OffsetList<StringDataItem> {
        &self.string_data
    }

    #[inline(always)]
    pub fn class_data(&self) -> &OffsetList<ClassDataItem> {
        &self.class_data
    }

    #[inline(always)]
    pub fn type_lists(&self) -> &OffsetList<TypeList> {
        &self.type_lists
    }

    // -- strings
    #[inline]
    pub fn get_string_id(&self, idx: u32) -> Result<&StringId> {
        check_lt_result!(idx, self.string_ids.len(), StringId);
        Ok(&self.string_ids[idx as usize])
    }

    /// The decoded string for string id `idx`.
    pub fn get_string(&self, idx: u32) -> Result<&str> {
        let string_id = self.get_string_id(idx)?;
        match self.string_data.get(idx as usize) {
            Some(item) => Ok(item.as_str()),
            None => dex_err!(DanglingOffset {
                offset: string_id.string_data_off,
                item_ty: "string_data_item",
            }),
        }
    }

    pub fn get_string_at_offset(&self, offset: u32) -> Result<&str> {
        match self.string_data.get_by_offset(offset) {
            Some(item) => Ok(item.as_str()),
            None => dex_err!(DanglingOffset {
                offset,
                item_ty: "string_data_item",
            }),
        }
    }

    // -- types
    #[inline]
    pub fn get_type_id(&self, idx: TypeIndex) -> Result<&TypeId> {
        check_lt_result!(idx, self.type_ids.len(), TypeId);
        Ok(&self.type_ids[idx as usize])
    }

    /// The raw descriptor of type `idx`, e.g. `Ljava/lang/String;`.
    pub fn get_type_desc(&self, idx: TypeIndex) -> Result<&str> {
        let type_id = self.get_type_id(idx)?;
        self.get_string(type_id.descriptor_idx)
    }

    // -- protos, fields, methods
    #[inline]
    pub fn get_proto_id(&self, idx: ProtoIndex) -> Result<&ProtoId> {
        check_lt_result!(idx, self.proto_ids.len(), ProtoId);
        Ok(&self.proto_ids[idx as usize])
    }

    #[inline]
    pub fn get_field_id(&self, idx: u32) -> Result<&FieldId> {
        check_lt_result!(idx, self.field_ids.len(), FieldId);
        Ok(&self.field_ids[idx as usize])
    }

    #[inline]
    pub fn get_method_id(&self, idx: u32) -> Result<&MethodId> {
        check_lt_result!(idx, self.method_ids.len(), MethodId);
        Ok(&self.method_ids[idx as usize])
    }

    // -- class defs
    #[inline]
    pub fn get_class_def(&self, idx: u32) -> Result<&ClassDef> {
        check_lt_result!(idx, self.class_defs.len(), ClassDef);
        Ok(&self.class_defs[idx as usize])
    }

    /// The class data of `class_def`, `None` if the class has none.
    pub fn get_class_data(&self, class_def: &ClassDef) -> Result<Option<&ClassDataItem>> {
        let offset = class_def.class_data_off;
        if offset == NO_OFFSET {
            return Ok(None);
        }
        match self.class_data.get_by_offset(offset) {
            Some(item) => Ok(Some(item)),
            None => dex_err!(DanglingOffset {
                offset,
                item_ty: "class_data_item",
            }),
        }
    }

    // -- type lists
    pub fn get_type_list(&self, offset: u32) -> Result<Option<&TypeList>> {
        if offset == NO_OFFSET {
            return Ok(None);
        }
        match self.type_lists.get_by_offset(offset) {
            Some(list) => Ok(Some(list)),
            None => dex_err!(DanglingOffset {
                offset,
                item_ty: "type_list",
            }),
        }
    }

    #[inline]
    pub fn get_interfaces(&self, class_def: &ClassDef) -> Result<Option<&TypeList>> {
        self.get_type_list(class_def.interfaces_off)
    }

    #[inline]
    pub fn get_parameters(&self, proto_id: &ProtoId) -> Result<Option<&TypeList>> {
        self.get_type_list(proto_id.parameters_off)
    }

    // -- diagnostics
    /// Every data-pool block that could not be decoded, with the stage that
    /// requested it.
    pub fn failures(&self) -> Vec<(DecodeStage, &BlockFailure)> {
        let string_data = self.string_data.failures().iter();
        let class_data = self.class_data.failures().iter();
        let type_lists = self.type_lists.failures().iter();
        string_data
            .map(|f| (DecodeStage::StringData, f))
            .chain(class_data.map(|f| (DecodeStage::ClassData, f)))
            .chain(type_lists.map(|f| (DecodeStage::TypeLists, f)))
            .collect()
    }

    /// Unresolved references and map-list inconsistencies.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn is_flagged(&self) -> bool {
        !self.issues.is_empty()
            || !self.string_data.failures().is_empty()
            || !self.class_data.failures().is_empty()
            || !self.type_lists.failures().is_empty()
    }
}

impl Component for DexFile {
    fn read(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        self.file_size = cursor.len();

        cursor.set_position(0);
        self.header
            .read(cursor)
            .map_err(|err| err.in_stage(DecodeStage::Header, 0))?;
        let header = self.header.raw().clone();
        log::debug!(
            "{}: dex version {:03}, {} bytes",
            self.location,
            header.get_version(),
            self.file_size
        );

        self.string_ids = read_id_table(
            cursor,
            DecodeStage::StringIds,
            "string_ids",
            header.string_ids_off,
            header.string_ids_size,
        )?;
        self.type_ids = read_id_table(
            cursor,
            DecodeStage::TypeIds,
            "type_ids",
            header.type_ids_off,
            header.type_ids_size,
        )?;
        self.proto_ids = read_id_table(
            cursor,
            DecodeStage::ProtoIds,
            "proto_ids",
            header.proto_ids_off,
            header.proto_ids_size,
        )?;
        self.field_ids = read_id_table(
            cursor,
            DecodeStage::FieldIds,
            "field_ids",
            header.field_ids_off,
            header.field_ids_size,
        )?;
        self.method_ids = read_id_table(
            cursor,
            DecodeStage::MethodIds,
            "method_ids",
            header.method_ids_off,
            header.method_ids_size,
        )?;
        self.class_defs = read_id_table(
            cursor,
            DecodeStage::ClassDefs,
            "class_defs",
            header.class_defs_off,
            header.class_defs_size,
        )?;

        self.map_list = map_list();
        if header.map_off == NO_OFFSET {
            log::warn!("{}: no map list", self.location);
        } else {
            log::debug!("{}: at {:#x}", DecodeStage::MapList, header.map_off);
            cursor.set_position(header.map_off as usize);
            self.map_list
                .read(cursor)
                .map_err(|err| err.in_stage(DecodeStage::MapList, header.map_off))?;
        }

        let string_offsets: Vec<u32> = self.string_ids.iter().map(|s| s.string_data_off).collect();
        log::debug!("{}: {} offset(s)", DecodeStage::StringData, string_offsets.len());
        self.string_data =
            cursor.read_offset_list("string_data", string_offsets, StringDataItem::default);

        let class_data_offsets: Vec<u32> = self
            .class_defs
            .iter()
            .map(|c| c.class_data_off)
            .filter(|off| *off != NO_OFFSET)
            .collect();
        log::debug!("{}: {} offset(s)", DecodeStage::ClassData, class_data_offsets.len());
        self.class_data =
            cursor.read_offset_list("class_data", class_data_offsets, ClassDataItem::default);

        let type_list_offsets = self.type_list_offsets();
        log::debug!("{}: {} offset(s)", DecodeStage::TypeLists, type_list_offsets.len());
        self.type_lists = cursor.read_offset_list("type_lists", type_list_offsets, type_list);

        for (stage, failure) in self.failures() {
            log::warn!(
                "{}: {stage} block at {:#x} failed: {}",
                self.location,
                failure.offset,
                failure.error
            );
        }
        cursor.set_position(self.file_size);
        Ok(())
    }

    fn children(&self) -> Vec<&dyn Component> {
        vec![
            &self.header,
            &self.string_ids,
            &self.type_ids,
            &self.proto_ids,
            &self.field_ids,
            &self.method_ids,
            &self.class_defs,
            &self.map_list,
            &self.string_data,
            &self.class_data,
            &self.type_lists,
        ]
    }

    fn name(&self) -> &'static str {
        "dex_file"
    }

    fn span(&self) -> Span {
        Span::new(0, self.file_size)
    }
}
