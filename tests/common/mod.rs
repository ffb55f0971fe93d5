//! Builds small, well-formed dex images for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;

use dextree::utf::str_to_mutf8;

pub const MAP_OFF: usize = 52;
pub const STRING_IDS: usize = 56;
pub const TYPE_IDS: usize = 64;
pub const PROTO_IDS: usize = 72;
pub const FIELD_IDS: usize = 80;
pub const METHOD_IDS: usize = 88;
pub const CLASS_DEFS: usize = 96;
pub const DATA: usize = 104;

pub const HEADER_SIZE: usize = 0x70;
pub const NO_INDEX: u32 = 0xFFFF_FFFF;

pub fn uleb128(mut value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

pub fn get_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(data[at..at + 4].try_into().unwrap())
}

pub fn put_u32(data: &mut [u8], at: usize, value: u32) {
    data[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u16(data: &mut [u8], at: usize, value: u16) {
    data[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

/// Recomputes the Adler-32 checksum after the image was patched.
pub fn fix_checksum(data: &mut [u8]) {
    let checksum = adler32::adler32(&data[12..]).unwrap();
    put_u32(data, 8, checksum);
}

#[derive(Default, Clone)]
pub struct ClassSpec {
    pub class_idx: u16,
    pub access_flags: u32,
    pub superclass_idx: u16,
    pub interfaces: Option<Vec<u16>>,
    /// `(field_idx, access_flags)`
    pub static_fields: Vec<(u32, u32)>,
    pub instance_fields: Vec<(u32, u32)>,
    /// `(method_idx, access_flags, code_off)`
    pub direct_methods: Vec<(u32, u32, u32)>,
    pub virtual_methods: Vec<(u32, u32, u32)>,
}

impl ClassSpec {
    fn has_data(&self) -> bool {
        !(self.static_fields.is_empty()
            && self.instance_fields.is_empty()
            && self.direct_methods.is_empty()
            && self.virtual_methods.is_empty())
    }
}

/// Declarative dex image. Identical type lists are written once and shared,
/// the way dex compilers emit them.
#[derive(Default, Clone)]
pub struct DexBuilder {
    pub strings: Vec<&'static str>,
    /// descriptor string index per type
    pub types: Vec<u32>,
    /// `(shorty_idx, return_type_idx, parameters)`
    pub protos: Vec<(u32, u16, Option<Vec<u16>>)>,
    /// `(class_idx, type_idx, name_idx)`
    pub fields: Vec<(u16, u16, u32)>,
    /// `(class_idx, proto_idx, name_idx)`
    pub methods: Vec<(u16, u16, u32)>,
    pub classes: Vec<ClassSpec>,
    pub without_map: bool,
}

struct Image {
    data: Vec<u8>,
}

impl Image {
    fn offset(&self) -> u32 {
        self.data.len() as u32
    }

    fn align(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    fn reserve(&mut self, len: usize) -> u32 {
        let offset = self.offset();
        self.data.resize(self.data.len() + len, 0);
        offset
    }

    fn push(&mut self, bytes: &[u8]) -> u32 {
        let offset = self.offset();
        self.data.extend_from_slice(bytes);
        offset
    }

    fn section(&mut self, at: usize, size: usize, offset: u32) {
        put_u32(&mut self.data, at, size as u32);
        put_u32(&mut self.data, at + 4, if size == 0 { 0 } else { offset });
    }
}

impl DexBuilder {
    pub fn build(&self) -> Vec<u8> {
        let mut image = Image {
            data: vec![0; HEADER_SIZE],
        };
        let mut map = vec![(0x0000u16, 1u32, 0u32)];

        // index tables
        let string_ids_off = image.reserve(self.strings.len() * 4);
        let type_ids_off = image.offset();
        for descriptor_idx in &self.types {
            image.push(&descriptor_idx.to_le_bytes());
        }
        let proto_ids_off = image.reserve(self.protos.len() * 12);
        let field_ids_off = image.offset();
        for (class_idx, type_idx, name_idx) in &self.fields {
            image.push(&class_idx.to_le_bytes());
            image.push(&type_idx.to_le_bytes());
            image.push(&name_idx.to_le_bytes());
        }
        let method_ids_off = image.offset();
        for (class_idx, proto_idx, name_idx) in &self.methods {
            image.push(&class_idx.to_le_bytes());
            image.push(&proto_idx.to_le_bytes());
            image.push(&name_idx.to_le_bytes());
        }
        let class_defs_off = image.reserve(self.classes.len() * 32);

        for (ty, size, off) in [
            (0x0001, self.strings.len(), string_ids_off),
            (0x0002, self.types.len(), type_ids_off),
            (0x0003, self.protos.len(), proto_ids_off),
            (0x0004, self.fields.len(), field_ids_off),
            (0x0005, self.methods.len(), method_ids_off),
            (0x0006, self.classes.len(), class_defs_off),
        ] {
            if size > 0 {
                map.push((ty, size as u32, off));
            }
        }

        // data section
        let data_off = image.offset();
        for (i, string) in self.strings.iter().enumerate() {
            let mut bytes = uleb128(string.encode_utf16().count() as u32);
            bytes.extend(str_to_mutf8(string));
            let offset = image.push(&bytes);
            put_u32(&mut image.data, string_ids_off as usize + i * 4, offset);
        }
        if !self.strings.is_empty() {
            let first = get_u32(&image.data, string_ids_off as usize);
            map.push((0x2002, self.strings.len() as u32, first));
        }

        let mut type_lists: HashMap<Vec<u16>, u32> = HashMap::new();
        let mut first_type_list = None;
        let mut type_list = |image: &mut Image, types: &Option<Vec<u16>>| -> u32 {
            let Some(types) = types else { return 0 };
            if let Some(offset) = type_lists.get(types) {
                return *offset;
            }
            image.align();
            let offset = image.push(&(types.len() as u32).to_le_bytes());
            for type_idx in types {
                image.push(&type_idx.to_le_bytes());
            }
            type_lists.insert(types.clone(), offset);
            first_type_list.get_or_insert(offset);
            offset
        };

        for (i, (shorty_idx, return_type_idx, params)) in self.protos.iter().enumerate() {
            let parameters_off = type_list(&mut image, params);
            let at = proto_ids_off as usize + i * 12;
            put_u32(&mut image.data, at, *shorty_idx);
            put_u16(&mut image.data, at + 4, *return_type_idx);
            put_u32(&mut image.data, at + 8, parameters_off);
        }
        let interfaces: Vec<u32> = self
            .classes
            .iter()
            .map(|class| type_list(&mut image, &class.interfaces))
            .collect();
        let num_type_lists = type_lists.len();
        if let Some(offset) = first_type_list {
            map.push((0x1001, num_type_lists as u32, offset));
        }

        let mut first_class_data = None;
        let mut num_class_data = 0;
        for (i, class) in self.classes.iter().enumerate() {
            let class_data_off = if class.has_data() {
                let offset = image.push(&class_data_bytes(class));
                first_class_data.get_or_insert(offset);
                num_class_data += 1;
                offset
            } else {
                0
            };

            let at = class_defs_off as usize + i * 32;
            put_u16(&mut image.data, at, class.class_idx);
            put_u32(&mut image.data, at + 4, class.access_flags);
            put_u16(&mut image.data, at + 8, class.superclass_idx);
            put_u32(&mut image.data, at + 12, interfaces[i]);
            put_u32(&mut image.data, at + 16, NO_INDEX);
            put_u32(&mut image.data, at + 24, class_data_off);
        }
        if let Some(offset) = first_class_data {
            map.push((0x2000, num_class_data, offset));
        }

        let map_off = if self.without_map {
            0
        } else {
            image.align();
            let map_off = image.offset();
            map.push((0x1000, 1, map_off));
            image.push(&(map.len() as u32).to_le_bytes());
            for (ty, size, off) in &map {
                image.push(&ty.to_le_bytes());
                image.push(&[0, 0]);
                image.push(&size.to_le_bytes());
                image.push(&off.to_le_bytes());
            }
            map_off
        };

        // header
        let file_size = image.data.len();
        image.data[..8].copy_from_slice(b"dex\n035\0");
        put_u32(&mut image.data, 32, file_size as u32);
        put_u32(&mut image.data, 36, HEADER_SIZE as u32);
        put_u32(&mut image.data, 40, 0x12345678);
        put_u32(&mut image.data, MAP_OFF, map_off);
        image.section(STRING_IDS, self.strings.len(), string_ids_off);
        image.section(TYPE_IDS, self.types.len(), type_ids_off);
        image.section(PROTO_IDS, self.protos.len(), proto_ids_off);
        image.section(FIELD_IDS, self.fields.len(), field_ids_off);
        image.section(METHOD_IDS, self.methods.len(), method_ids_off);
        image.section(CLASS_DEFS, self.classes.len(), class_defs_off);
        image.section(DATA, file_size - data_off as usize, data_off);

        let mut data = image.data;
        fix_checksum(&mut data);
        data
    }
}

fn class_data_bytes(class: &ClassSpec) -> Vec<u8> {
    let mut out = Vec::new();
    for size in [
        class.static_fields.len(),
        class.instance_fields.len(),
        class.direct_methods.len(),
        class.virtual_methods.len(),
    ] {
        out.extend(uleb128(size as u32));
    }

    for fields in [&class.static_fields, &class.instance_fields] {
        let mut prev = 0;
        for (field_idx, access_flags) in fields {
            out.extend(uleb128(field_idx - prev));
            out.extend(uleb128(*access_flags));
            prev = *field_idx;
        }
    }
    for methods in [&class.direct_methods, &class.virtual_methods] {
        let mut prev = 0;
        for (method_idx, access_flags, code_off) in methods {
            out.extend(uleb128(method_idx - prev));
            out.extend(uleb128(*access_flags));
            out.extend(uleb128(*code_off));
            prev = *method_idx;
        }
    }
    out
}

/// A file with one class:
///
/// ```text
/// public class Foo extends java.lang.Object implements java.lang.Runnable {
///     private int count;
///     public Foo(int) {}
///     public void run() {}
/// }
/// ```
pub fn sample() -> DexBuilder {
    DexBuilder {
        strings: vec![
            "<init>",               // 0
            "I",                    // 1
            "LFoo;",                // 2
            "Ljava/lang/Object;",   // 3
            "Ljava/lang/Runnable;", // 4
            "V",                    // 5
            "VI",                   // 6
            "count",                // 7
            "run",                  // 8
        ],
        // I, LFoo;, Object, Runnable, V
        types: vec![1, 2, 3, 4, 5],
        // ()V, (I)V
        protos: vec![(5, 4, None), (6, 4, Some(vec![0]))],
        fields: vec![(1, 0, 7)],
        // Foo.<init>(I)V, Foo.run()V
        methods: vec![(1, 1, 0), (1, 0, 8)],
        classes: vec![ClassSpec {
            class_idx: 1,
            access_flags: 0x0001,
            superclass_idx: 2,
            interfaces: Some(vec![3]),
            instance_fields: vec![(0, 0x0002)],
            direct_methods: vec![(0, 0x10001, 0)],
            virtual_methods: vec![(1, 0x0001, 0)],
            ..ClassSpec::default()
        }],
        without_map: false,
    }
}

/// Offset of the string id entry `idx`.
pub fn string_id_at(data: &[u8], idx: usize) -> usize {
    get_u32(data, STRING_IDS + 4) as usize + idx * 4
}
