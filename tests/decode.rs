mod common;

use common::*;
use dextree::{
    error::{DecodeStage, DexError},
    file::{type_list, Component, Cursor, DexFile, DexLocation, VerifyPreset},
};

fn decode(data: &[u8]) -> DexFile {
    DexFile::from_raw_parts(data, DexLocation::InMemory).unwrap()
}

fn class_defs_off(data: &[u8]) -> usize {
    get_u32(data, CLASS_DEFS + 4) as usize
}

#[test]
fn test_sample_decodes_cleanly() {
    let data = sample().build();
    let dex = decode(&data);

    assert_eq!(dex.file_size(), data.len());
    assert_eq!(dex.string_ids().len(), 9);
    assert_eq!(dex.type_ids().len(), 5);
    assert_eq!(dex.proto_ids().len(), 2);
    assert_eq!(dex.field_ids().len(), 1);
    assert_eq!(dex.method_ids().len(), 2);
    assert_eq!(dex.class_defs().len(), 1);
    assert_eq!(dex.string_data().len(), 9);
    assert_eq!(dex.class_data().len(), 1);
    assert_eq!(dex.type_lists().len(), 2);

    assert!(dex.failures().is_empty());
    assert!(dex.issues().is_empty());
    assert!(!dex.is_flagged());
}

#[test]
fn test_decoding_is_deterministic() {
    let data = sample().build();
    let first = decode(&data).tree(None);
    let second = decode(&data).tree(None);
    assert_eq!(first, second);
}

#[test]
fn test_children_follow_read_order() {
    let data = sample().build();
    let dex = decode(&data);
    let names: Vec<_> = dex.children().iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        [
            "header_item",
            "string_ids",
            "type_ids",
            "proto_ids",
            "field_ids",
            "method_ids",
            "class_defs",
            "map_list",
            "string_data",
            "class_data",
            "type_lists",
        ]
    );
}

#[test]
fn test_offset_list_visits_blocks_in_ascending_order() {
    let data = sample().build();
    let dex = decode(&data);

    // class interfaces are requested before proto parameters but were
    // written after them
    let requested = dex.type_lists().requested();
    assert_eq!(requested.len(), 2);
    assert!(requested[0] > requested[1]);

    let offsets: Vec<u32> = dex.type_lists().entries().map(|(off, _)| off).collect();
    assert_eq!(offsets, [requested[1], requested[0]]);
    let first = dex.type_lists().iter().next().unwrap();
    assert_eq!(first.span().offset, requested[1] as usize);

    // the same holds for a list read directly off the image
    let mut cursor = Cursor::new(&data);
    cursor.set_position(7);
    let list = cursor.read_offset_list("type_lists", requested.to_vec(), type_list);
    assert_eq!(cursor.position(), 7);
    assert_eq!(list.get(0).unwrap()[0].type_idx, 3);
    assert_eq!(list.get(1).unwrap()[0].type_idx, 0);
    assert_eq!(list.iter().next().unwrap()[0].type_idx, 0);
}

#[test]
fn test_shared_type_list_is_decoded_once() {
    let mut builder = sample();
    // `<init>(int, Runnable)` on a class implementing the same two types
    builder.protos[1].2 = Some(vec![0, 3]);
    builder.classes[0].interfaces = Some(vec![0, 3]);
    let data = builder.build();
    let dex = decode(&data);

    assert_eq!(dex.type_lists().num_requests(), 2);
    assert_eq!(dex.type_lists().len(), 1);
    assert_eq!(dex.type_lists().get(0).unwrap().len(), 2);
    assert_eq!(
        dex.method_ids()[0].desc(),
        Some("LFoo;-><init>(ILjava/lang/Runnable;)V")
    );

    let class_def = dex.get_class_def(0).unwrap();
    let proto_id = dex.get_proto_id(1).unwrap();
    let interfaces = dex.get_interfaces(class_def).unwrap().unwrap();
    let parameters = dex.get_parameters(proto_id).unwrap().unwrap();
    assert!(std::ptr::eq(interfaces, parameters));
    assert!(std::ptr::eq(
        dex.type_lists().get(0).unwrap(),
        dex.type_lists().get(1).unwrap()
    ));
}

#[test]
fn test_absurd_table_count_is_fatal() {
    let mut data = sample().build();
    put_u32(&mut data, STRING_IDS, 0x4000_0000);

    let err = DexFile::from_raw_parts(&data, DexLocation::InMemory)
        .err()
        .unwrap();
    match &err {
        DexError::Stage { stage, source, .. } => {
            assert_eq!(*stage, DecodeStage::StringIds);
            assert!(matches!(**source, DexError::TruncatedList { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root_cause(), DexError::OutOfBounds { .. }));
}

#[test]
fn test_table_offset_past_end_is_fatal() {
    let mut data = sample().build();
    let past_end = data.len() as u32 + 100;
    put_u32(&mut data, TYPE_IDS + 4, past_end);

    let err = DexFile::from_raw_parts(&data, DexLocation::InMemory)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        DexError::Stage {
            stage: DecodeStage::TypeIds,
            ..
        }
    ));
}

#[test]
fn test_empty_file() {
    let data = DexBuilder::default().build();
    let dex = decode(&data);

    assert!(dex.string_ids().is_empty());
    assert!(dex.class_defs().is_empty());
    assert!(dex.string_data().is_empty());
    assert!(dex.class_data().is_empty());
    assert!(dex.type_lists().is_empty());
    // header and map list itself
    assert_eq!(dex.map_list().len(), 2);
    assert!(!dex.is_flagged());
}

#[test]
fn test_empty_map_list() {
    let mut data = DexBuilder::default().build();
    let map_off = get_u32(&data, MAP_OFF) as usize;
    put_u32(&mut data, map_off, 0);

    let dex = decode(&data);
    assert!(dex.map_list().is_empty());
    assert_eq!(dex.map_list().span().offset, map_off);
    assert_eq!(dex.map_list().span().len, 4);

    assert!(dex.string_ids().is_empty());
    assert!(dex.type_ids().is_empty());
    assert!(dex.proto_ids().is_empty());
    assert!(dex.field_ids().is_empty());
    assert!(dex.method_ids().is_empty());
    assert!(dex.class_defs().is_empty());
    assert!(dex.string_data().is_empty());
    assert!(dex.class_data().is_empty());
    assert!(dex.type_lists().is_empty());
    assert!(!dex.is_flagged());
}

#[test]
fn test_missing_map_list() {
    let builder = DexBuilder {
        without_map: true,
        ..sample()
    };
    let data = builder.build();
    assert_eq!(get_u32(&data, MAP_OFF), 0);

    let dex = DexFile::open(&data, DexLocation::InMemory, VerifyPreset::All).unwrap();
    assert!(dex.map_list().is_empty());
    assert_eq!(dex.class_defs().len(), 1);
    assert!(!dex.is_flagged());
}

#[test]
fn test_string_ids_share_string_data() {
    let builder = DexBuilder {
        strings: vec!["ab", "cd"],
        ..DexBuilder::default()
    };
    let mut data = builder.build();
    let first = get_u32(&data, string_id_at(&data, 0));
    let second_at = string_id_at(&data, 1);
    put_u32(&mut data, second_at, first);

    let dex = decode(&data);
    assert_eq!(dex.string_data().num_requests(), 2);
    assert_eq!(dex.string_data().len(), 1);
    assert_eq!(dex.get_string(0).unwrap(), "ab");
    assert_eq!(dex.get_string(1).unwrap(), "ab");
    assert!(std::ptr::eq(
        dex.string_data().get(0).unwrap(),
        dex.string_data().get(1).unwrap()
    ));
    assert_eq!(dex.string_ids()[1].desc(), Some("ab"));
}

#[test]
fn test_string_past_end_fails_alone() {
    let mut data = sample().build();
    let at = string_id_at(&data, 8);
    let past_end = data.len() as u32;
    put_u32(&mut data, at, past_end);

    let dex = decode(&data);
    let failures = dex.failures();
    assert_eq!(failures.len(), 1);
    let (stage, failure) = failures[0];
    assert_eq!(stage, DecodeStage::StringData);
    assert_eq!(failure.offset, past_end);
    assert_eq!(failure.requests, [8]);

    // every other string survived
    assert_eq!(dex.string_data().len(), 8);
    assert_eq!(dex.get_string(7).unwrap(), "count");
    assert!(matches!(
        dex.get_string(8),
        Err(DexError::DanglingOffset { .. })
    ));
    assert!(dex.is_flagged());

    // `run` can no longer be described
    assert!(dex.method_ids()[1].desc().is_none());
    assert!(dex.method_ids()[0].desc().is_some());
}

#[test]
fn test_resolved_descriptions() {
    let data = sample().build();
    let dex = decode(&data);

    assert_eq!(dex.string_ids()[2].desc(), Some("LFoo;"));
    assert_eq!(dex.type_ids()[1].desc(), Some("LFoo;"));
    assert_eq!(dex.proto_ids()[0].desc(), Some("()V"));
    assert_eq!(dex.proto_ids()[1].desc(), Some("(I)V"));
    assert_eq!(dex.field_ids()[0].desc(), Some("LFoo;->count:I"));
    assert_eq!(dex.method_ids()[0].desc(), Some("LFoo;-><init>(I)V"));
    assert_eq!(dex.method_ids()[1].desc(), Some("LFoo;->run()V"));
    assert_eq!(
        dex.class_defs()[0].desc(),
        Some("public Foo extends java.lang.Object")
    );

    let class_data = dex.get_class_data(&dex.class_defs()[0]).unwrap().unwrap();
    let field = class_data.fields().next().unwrap();
    assert_eq!(field.desc(), Some("private LFoo;->count:I"));
}

#[test]
fn test_dangling_descriptor_is_an_issue() {
    let mut data = sample().build();
    let type_ids_off = get_u32(&data, TYPE_IDS + 4) as usize;
    put_u32(&mut data, type_ids_off, 99);

    let dex = decode(&data);
    assert!(dex.type_ids()[0].desc().is_none());
    assert!(dex.is_flagged());

    let issue = dex
        .issues()
        .iter()
        .find(|issue| issue.component == "type_id_item")
        .unwrap();
    assert_eq!(issue.offset, type_ids_off);
    assert!(matches!(
        issue.error,
        DexError::DanglingReference {
            index: 99,
            max: 9,
            ..
        }
    ));
}

#[test]
fn test_open_verifies_sample() {
    let data = sample().build();
    let dex = DexFile::open(&data, DexLocation::from("sample.dex"), VerifyPreset::All).unwrap();
    assert!(dex.issues().is_empty());
    assert_eq!(dex.location().to_string(), "sample.dex");
}

#[test]
fn test_open_rejects_bad_checksum() {
    let mut data = sample().build();
    let last = data.len() - 1;
    data[last] ^= 0xff;

    assert!(matches!(
        DexFile::open(&data, DexLocation::InMemory, VerifyPreset::All),
        Err(DexError::BadChecksum { .. })
    ));
    assert!(DexFile::open(&data, DexLocation::InMemory, VerifyPreset::NoChecksum).is_ok());
}

#[test]
fn test_open_flags_map_mismatch() {
    let mut data = sample().build();
    let map_off = get_u32(&data, MAP_OFF) as usize;
    // header, string ids, type ids
    let type_ids_item = map_off + 4 + 2 * 12;
    assert_eq!(u16::from_le_bytes([data[type_ids_item], data[type_ids_item + 1]]), 2);
    put_u32(&mut data, type_ids_item + 4, 7);
    fix_checksum(&mut data);

    let dex = DexFile::open(&data, DexLocation::InMemory, VerifyPreset::All).unwrap();
    assert_eq!(dex.issues().len(), 1);
    assert_eq!(dex.issues()[0].component, "map_item");
    assert!(matches!(
        dex.issues()[0].error,
        DexError::MapMismatch {
            section: "type-ids",
            map_size: 7,
            header_size: 5,
            ..
        }
    ));

    // not cross-checked without verification
    let dex = DexFile::open(&data, DexLocation::InMemory, VerifyPreset::None).unwrap();
    assert!(dex.issues().is_empty());
}

#[test]
fn test_class_data_indices() {
    let data = sample().build();
    let dex = decode(&data);
    let class_def = dex.get_class_def(0).unwrap();
    let class_data = dex.get_class_data(class_def).unwrap().unwrap();

    assert_eq!(class_data.num_fields(), 1);
    assert_eq!(class_data.num_methods(), 2);
    let fields: Vec<u32> = class_data.fields().map(|f| f.field_idx).collect();
    let methods: Vec<u32> = class_data.methods().map(|m| m.method_idx).collect();
    assert_eq!(fields, [0]);
    assert_eq!(methods, [0, 1]);
}

#[test]
fn test_bad_class_data_offset() {
    let mut data = sample().build();
    let bad = data.len() as u32 + 10;
    let at = class_defs_off(&data) + 24;
    put_u32(&mut data, at, bad);

    let dex = decode(&data);
    assert!(dex.class_data().is_empty());
    let failures = dex.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, DecodeStage::ClassData);
    assert_eq!(failures[0].1.offset, bad);

    assert!(matches!(
        dex.get_class_data(&dex.class_defs()[0]),
        Err(DexError::DanglingOffset { offset, .. }) if offset == bad
    ));
    // the class itself still resolves
    assert!(dex.class_defs()[0].desc().is_some());
}

#[test]
fn test_dex_file_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DexFile>();
}

#[test]
fn test_forged_class_def_count_is_fatal() {
    let mut data = sample().build();
    put_u32(&mut data, CLASS_DEFS, u32::MAX);

    let err = DexFile::from_raw_parts(&data, DexLocation::InMemory)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        DexError::Stage {
            stage: DecodeStage::ClassDefs,
            ..
        }
    ));
    assert!(matches!(err.root_cause(), DexError::OutOfBounds { .. }));
}

#[test]
fn test_dangling_superclass_keeps_class_description() {
    let mut data = sample().build();
    let at = class_defs_off(&data) + 8;
    put_u16(&mut data, at, 77);

    let dex = decode(&data);
    assert_eq!(dex.class_defs()[0].desc(), Some("public Foo"));

    let issue = dex
        .issues()
        .iter()
        .find(|issue| issue.component == "class_def_item")
        .unwrap();
    assert!(matches!(
        issue.error,
        DexError::DanglingReference {
            index: 77,
            max: 5,
            ..
        }
    ));
}
