use crate::desc_names::pretty_desc;

use super::{access_flags_str, AccessKind, Item, RawItem, Resolver, SizedList};

/// Offset value meaning "no associated data block".
pub const NO_OFFSET: u32 = 0;

/// 16-bit index value meaning "no reference", e.g. the superclass of
/// `java.lang.Object`.
pub const NO_INDEX16: u16 = 0xFFFF;

pub type StringIndex = u32;

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct StringId {
    pub string_data_off: u32,
}

unsafe impl plain::Plain for StringId {}

impl StringId {
    #[inline]
    pub const fn offset(&self) -> usize {
        self.string_data_off as usize
    }
}

impl RawItem for StringId {
    const NAME: &'static str = "string_id_item";

    fn describe(&self, resolver: &mut Resolver<'_>) -> Option<String> {
        let dex = resolver.dex();
        resolver.check(dex.get_string_at_offset(self.string_data_off).map(str::to_string))
    }
}

pub type TypeIndex = u16;

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct TypeId {
    pub descriptor_idx: StringIndex,
}

unsafe impl plain::Plain for TypeId {}

impl RawItem for TypeId {
    const NAME: &'static str = "type_id_item";

    fn describe(&self, resolver: &mut Resolver<'_>) -> Option<String> {
        resolver.string(self.descriptor_idx)
    }
}

pub type FieldIndex = u32;

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct FieldId {
    pub class_idx: TypeIndex,  // index into type_ids_ array for defining class
    pub type_idx: TypeIndex,   // index into type_ids_ array for field type
    pub name_idx: StringIndex, // index into string_ids_ array for field name
}

unsafe impl plain::Plain for FieldId {}

impl RawItem for FieldId {
    const NAME: &'static str = "field_id_item";

    fn describe(&self, resolver: &mut Resolver<'_>) -> Option<String> {
        let dex = resolver.dex();
        resolver.check(dex.pretty_field_opt(self))
    }
}

pub type ProtoIndex = u16;

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct ProtoId {
    pub shorty_idx: StringIndex, // index into string_ids array for shorty descriptor
    pub return_type_idx: TypeIndex, // index into type_ids array for return type
    pad_: u16,                   // padding = 0
    pub parameters_off: u32,     // file offset to type_list for parameter types
}

unsafe impl plain::Plain for ProtoId {}

impl RawItem for ProtoId {
    const NAME: &'static str = "proto_id_item";

    fn describe(&self, resolver: &mut Resolver<'_>) -> Option<String> {
        let dex = resolver.dex();
        resolver.check(dex.pretty_proto_opt(self))
    }
}

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct MethodId {
    pub class_idx: TypeIndex,  // index into type_ids_ array for defining class
    pub proto_idx: ProtoIndex, // index into proto_ids_ array for method signature
    pub name_idx: StringIndex, // index into string_ids_ array for method name
}

unsafe impl plain::Plain for MethodId {}

impl RawItem for MethodId {
    const NAME: &'static str = "method_id_item";

    fn describe(&self, resolver: &mut Resolver<'_>) -> Option<String> {
        let dex = resolver.dex();
        resolver.check(dex.pretty_method_opt(self))
    }
}

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    pub class_idx: TypeIndex, // index into type_ids_ array for this class
    pad1_: u16,               // padding = 0
    pub access_flags: u32,
    pub superclass_idx: TypeIndex, // index into type_ids_ array for superclass
    pad2_: u16,                    // padding = 0
    pub interfaces_off: u32,       // file offset to TypeList
    pub source_file_idx: StringIndex, // index into string_ids_ for source file name
    pub annotations_off: u32,      // file offset to annotations_directory_item
    pub class_data_off: u32,       // file offset to class_data_item
    pub static_values_off: u32,    // file offset to EncodedArray
}

unsafe impl plain::Plain for ClassDef {}

impl ClassDef {
    #[inline]
    pub fn has_superclass(&self) -> bool {
        self.superclass_idx != NO_INDEX16
    }
}

impl RawItem for ClassDef {
    const NAME: &'static str = "class_def_item";

    fn describe(&self, resolver: &mut Resolver<'_>) -> Option<String> {
        let class_name = pretty_desc(&resolver.type_desc(self.class_idx)?);
        let flags = access_flags_str(self.access_flags, AccessKind::Class);
        let mut desc = if flags.is_empty() {
            class_name
        } else {
            format!("{flags} {class_name}")
        };

        if self.has_superclass() {
            // a dangling superclass is recorded as an issue and left out
            if let Some(superclass) = resolver.type_desc(self.superclass_idx) {
                desc.push_str(" extends ");
                desc.push_str(&pretty_desc(&superclass));
            }
        }
        Some(desc)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct TypeItem {
    pub type_idx: TypeIndex, // index into type_ids section
}

unsafe impl plain::Plain for TypeItem {}

impl RawItem for TypeItem {
    const NAME: &'static str = "type_item";

    fn describe(&self, resolver: &mut Resolver<'_>) -> Option<String> {
        resolver.type_desc(self.type_idx)
    }
}

/// A `type_list` block from the data section, shared by class interfaces
/// and method parameters.
pub type TypeList = SizedList<Item<TypeItem>>;

pub fn type_list() -> TypeList {
    SizedList::new("type_list", Item::default)
}

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct MapItem {
    pub type_: u16,
    unused_: u16,
    pub size: u32,
    pub off: u32,
}

unsafe impl plain::Plain for MapItem {}

impl MapItem {
    /// The decoded item type, `None` for type codes this crate does not know.
    pub fn item_type(&self) -> Option<MapItemType> {
        MapItemType::from_raw(self.type_)
    }
}

impl RawItem for MapItem {
    const NAME: &'static str = "map_item";

    fn describe(&self, _resolver: &mut Resolver<'_>) -> Option<String> {
        let name = match self.item_type() {
            Some(ty) => ty.as_str().to_string(),
            None => format!("unknown({:#06x})", self.type_),
        };
        Some(format!("{name}: {} @ {:#x}", self.size, self.off))
    }
}

pub type MapList = SizedList<Item<MapItem>>;

pub fn map_list() -> MapList {
    SizedList::new("map_list", Item::default)
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapItemType {
    HeaderItem = 0x0000,
    StringIdItem = 0x0001,
    TypeIdItem = 0x0002,
    ProtoIdItem = 0x0003,
    FieldIdItem = 0x0004,
    MethodIdItem = 0x0005,
    ClassDefItem = 0x0006,
    CallSiteIdItem = 0x0007,
    MethodHandleItem = 0x0008,
    MapList = 0x1000,
    TypeList = 0x1001,
    AnnotationSetRefList = 0x1002,
    AnnotationSetItem = 0x1003,
    ClassDataItem = 0x2000,
    CodeItem = 0x2001,
    StringDataItem = 0x2002,
    DebugInfoItem = 0x2003,
    AnnotationItem = 0x2004,
    EncodedArrayItem = 0x2005,
    AnnotationsDirectoryItem = 0x2006,
    HiddenapiClassData = 0xF000,
}

impl MapItemType {
    pub fn from_raw(value: u16) -> Option<MapItemType> {
        Some(match value {
            0x0000 => MapItemType::HeaderItem,
            0x0001 => MapItemType::StringIdItem,
            0x0002 => MapItemType::TypeIdItem,
            0x0003 => MapItemType::ProtoIdItem,
            0x0004 => MapItemType::FieldIdItem,
            0x0005 => MapItemType::MethodIdItem,
            0x0006 => MapItemType::ClassDefItem,
            0x0007 => MapItemType::CallSiteIdItem,
            0x0008 => MapItemType::MethodHandleItem,
            0x1000 => MapItemType::MapList,
            0x1001 => MapItemType::TypeList,
            0x1002 => MapItemType::AnnotationSetRefList,
            0x1003 => MapItemType::AnnotationSetItem,
            0x2000 => MapItemType::ClassDataItem,
            0x2001 => MapItemType::CodeItem,
            0x2002 => MapItemType::StringDataItem,
            0x2003 => MapItemType::DebugInfoItem,
            0x2004 => MapItemType::AnnotationItem,
            0x2005 => MapItemType::EncodedArrayItem,
            0x2006 => MapItemType::AnnotationsDirectoryItem,
            0xF000 => MapItemType::HiddenapiClassData,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MapItemType::HeaderItem => "header_item",
            MapItemType::StringIdItem => "string_id_item",
            MapItemType::TypeIdItem => "type_id_item",
            MapItemType::ProtoIdItem => "proto_id_item",
            MapItemType::FieldIdItem => "field_id_item",
            MapItemType::MethodIdItem => "method_id_item",
            MapItemType::ClassDefItem => "class_def_item",
            MapItemType::CallSiteIdItem => "call_site_id_item",
            MapItemType::MethodHandleItem => "method_handle_item",
            MapItemType::MapList => "map_list",
            MapItemType::TypeList => "type_list",
            MapItemType::AnnotationSetRefList => "annotation_set_ref_list",
            MapItemType::AnnotationSetItem => "annotation_set_item",
            MapItemType::ClassDataItem => "class_data_item",
            MapItemType::CodeItem => "code_item",
            MapItemType::StringDataItem => "string_data_item",
            MapItemType::DebugInfoItem => "debug_info_item",
            MapItemType::AnnotationItem => "annotation_item",
            MapItemType::EncodedArrayItem => "encoded_array_item",
            MapItemType::AnnotationsDirectoryItem => "annotations_directory_item",
            MapItemType::HiddenapiClassData => "hiddenapi_class_data_item",
        }
    }
}
