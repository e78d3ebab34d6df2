//! The seven concrete scenarios from the bit-packing/string/array design
//! notes, reproduced as literal byte arrays since this crate's schemas are
//! built in Rust rather than loaded from schema files.

use binform::builder::{ArrayBuilder, StructBuilder, WrapperBuilder};
use binform::params::ParamValue;
use binform::sanitize::Sanitizer;
use binform::value::Value;
use binform::{Endian, Record, Registry};

fn registry() -> Registry {
    Registry::with_builtins()
}

#[test]
fn zero_terminated_string_round_trips() {
    let reg = registry();
    let proto = StructBuilder::new().field("name", "stringz", []).unwrap().build(&reg).unwrap();
    let mut rec = Record::new(proto).unwrap();
    rec.read(&mut &b"hello\0trailing garbage"[..]).unwrap();
    let snap = rec.snapshot().unwrap();
    assert_eq!(snap.field("name").unwrap().as_bytes().unwrap(), b"hello");
}

#[test]
fn zero_terminated_string_truncates_on_write_with_max_length() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("name", "stringz", [("max_length", ParamValue::literal(3u64))])
        .unwrap()
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(proto).unwrap();
    rec.assign(Value::Map(vec![("name".to_owned(), Value::Bytes(b"abcdef".to_vec()))])).unwrap();
    // `max_length` bounds the terminator too, so 3 bytes total means 2 bytes
    // of content plus the trailing NUL.
    assert_eq!(rec.to_binary().unwrap(), b"ab\0");
}

#[test]
fn pascal_style_string_length_depends_on_sibling_field() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("len", "u8", [])
        .unwrap()
        .field("text", "string", [("length", ParamValue::symbol("len"))])
        .unwrap()
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(proto).unwrap();
    rec.read(&mut &[5u8, b'h', b'e', b'l', b'l', b'o'][..]).unwrap();
    let snap = rec.snapshot().unwrap();
    assert_eq!(snap.field("text").unwrap().as_bytes().unwrap(), b"hello");
    assert_eq!(rec.to_binary().unwrap(), vec![5, b'h', b'e', b'l', b'l', b'o']);
}

#[test]
fn array_read_until_eof_stops_cleanly_at_the_boundary() {
    let reg = registry();
    let element = ArrayBuilder::new().element("u8", []).read_until_eof().build(&reg).unwrap();
    let mut rec = Record::new(element).unwrap();
    rec.read(&mut &[1u8, 2, 3][..]).unwrap();
    let snap = rec.snapshot().unwrap();
    assert_eq!(snap.as_list().unwrap().len(), 3);
}

#[test]
fn array_read_until_can_inspect_all_elements_read_so_far() {
    let reg = registry();
    let element = ArrayBuilder::new()
        .element("u8", [])
        .read_until(ParamValue::deferred(|ctx| {
            let running: u64 = ctx
                .get("array")?
                .as_list()
                .expect("array override is always a list")
                .iter()
                .filter_map(Value::as_u64)
                .sum();
            Ok(Value::Bool(running >= 10))
        }))
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(element).unwrap();
    rec.read(&mut &[3u8, 4, 5, 1][..]).unwrap();
    assert_eq!(rec.to_binary().unwrap(), vec![3, 4, 5]);
}

#[test]
fn array_with_no_length_policy_fails_at_end_of_stream() {
    let reg = registry();
    let element = ArrayBuilder::new().element("u8", []).build(&reg).unwrap();
    let mut rec = Record::new(element).unwrap();
    let err = rec.read(&mut &[1u8, 2, 3][..]).unwrap_err();
    assert!(matches!(err, binform::Error::EndOfStream { .. }));
}

#[test]
fn bit_packed_fields_share_a_byte_and_byte_fields_force_alignment() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("flag", "bit1", [])
        .unwrap()
        .field("kind", "bit3", [])
        .unwrap()
        .field("rest_of_byte", "bit4", [])
        .unwrap()
        .field("trailer", "u8", [])
        .unwrap()
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(proto).unwrap();
    // 1_011_0101 -> flag=1, kind=0b011=3, rest_of_byte=0b0101=5; trailer=0xAA
    rec.read(&mut &[0b1_011_0101u8, 0xAA][..]).unwrap();
    let snap = rec.snapshot().unwrap();
    assert_eq!(snap.field("flag").unwrap().as_u64(), Some(1));
    assert_eq!(snap.field("kind").unwrap().as_u64(), Some(3));
    assert_eq!(snap.field("rest_of_byte").unwrap().as_u64(), Some(5));
    assert_eq!(snap.field("trailer").unwrap().as_u64(), Some(0xAA));
    assert_eq!(rec.num_bytes().unwrap(), 2);
    assert_eq!(rec.to_binary().unwrap(), vec![0b1_011_0101, 0xAA]);
}

#[test]
fn check_offset_mismatch_is_reported() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("a", "u8", [])
        .unwrap()
        .field("b", "u8", [("check_offset", ParamValue::literal(5u64))])
        .unwrap()
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(proto).unwrap();
    let err = rec.read(&mut &[0u8, 1][..]).unwrap_err();
    assert!(matches!(err, binform::Error::OffsetMismatch(_)));
}

#[test]
fn struct_method_resolves_against_sibling_fields() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("flag", "u8", [])
        .unwrap()
        .method("include_payload", |ctx| Ok(Value::Bool(ctx.get("flag")?.is_truthy())))
        .unwrap()
        .field("payload", "u8", [("onlyif", ParamValue::deferred(|ctx| ctx.parent()?.get("include_payload")))])
        .unwrap()
        .build(&reg)
        .unwrap();

    let mut rec = Record::new(proto.clone()).unwrap();
    rec.read(&mut &[0u8, 0xFF][..]).unwrap();
    assert_eq!(rec.snapshot().unwrap().field("payload").unwrap().as_u64(), Some(0));
    assert_eq!(rec.num_bytes().unwrap(), 1);

    let mut rec2 = Record::new(proto).unwrap();
    rec2.read(&mut &[1u8, 0xFF][..]).unwrap();
    assert_eq!(rec2.snapshot().unwrap().field("payload").unwrap().as_u64(), Some(0xFF));
    assert_eq!(rec2.num_bytes().unwrap(), 2);
}

#[test]
fn wrapper_delegates_read_write_and_snapshot_to_its_child() {
    let reg = registry();
    let inner = Sanitizer::new(&reg).sanitize("u8", None, vec![]).unwrap();
    let wrapped = WrapperBuilder::new().inner(inner).build(&reg).unwrap();
    let proto = StructBuilder::new().field_with("val", wrapped, []).unwrap().build(&reg).unwrap();
    let mut rec = Record::new(proto).unwrap();
    rec.read(&mut &[0x2Au8][..]).unwrap();
    assert_eq!(rec.snapshot().unwrap().field("val").unwrap().as_u64(), Some(0x2A));
    assert_eq!(rec.to_binary().unwrap(), vec![0x2A]);
}

#[test]
fn endian_is_honored_for_multi_byte_integers() {
    let reg = registry();
    let little = StructBuilder::new()
        .endian(Endian::Little)
        .field("v", "u32le", [])
        .unwrap()
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(little).unwrap();
    rec.read(&mut &[1u8, 0, 0, 0][..]).unwrap();
    assert_eq!(rec.snapshot().unwrap().field("v").unwrap().as_u64(), Some(1));
}
