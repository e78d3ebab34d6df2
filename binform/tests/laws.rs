//! Round-trip, idempotence, and offset-law tests that hold across any schema,
//! not just a single worked example.

use binform::builder::{ArrayBuilder, ChoiceBuilder, StructBuilder};
use binform::params::ParamValue;
use binform::value::Value;
use binform::{Record, Registry};

fn registry() -> Registry {
    Registry::with_builtins()
}

#[test]
fn read_then_write_reproduces_the_original_bytes() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("a", "u16be", [])
        .unwrap()
        .field("b", "u8", [])
        .unwrap()
        .field("c", "u32be", [])
        .unwrap()
        .build(&reg)
        .unwrap();
    let input = vec![0x01, 0x02, 0x03, 0xDE, 0xAD, 0xBE, 0xEF];
    let mut rec = Record::new(proto).unwrap();
    rec.read(&mut input.as_slice()).unwrap();
    assert_eq!(rec.to_binary().unwrap(), input);
}

#[test]
fn clear_resets_every_field_to_an_unmutated_default() {
    let reg = registry();
    let proto = StructBuilder::new().field("a", "u8", []).unwrap().build(&reg).unwrap();
    let mut rec = Record::new(proto).unwrap();
    rec.read(&mut &[7u8][..]).unwrap();
    assert!(!rec.is_clear());
    rec.clear();
    assert!(rec.is_clear());
    assert_eq!(rec.snapshot().unwrap().field("a").unwrap().as_u64(), Some(0));
}

#[test]
fn offset_of_a_field_equals_the_sum_of_its_preceding_siblings() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("a", "u32be", [])
        .unwrap()
        .field("b", "u16be", [])
        .unwrap()
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(proto).unwrap();
    rec.read(&mut &[0u8, 0, 0, 0, 0, 0][..]).unwrap();
    assert_eq!(rec.num_bytes().unwrap(), 6);

    let doc = rec.document();
    let root = doc.root();
    let a = binform::struct_::field_node(doc, root, "a").unwrap();
    let b = binform::struct_::field_node(doc, root, "b").unwrap();
    assert_eq!(binform::driver::offset(doc, a).unwrap(), 0);
    assert_eq!(binform::driver::offset(doc, b).unwrap(), 4);
}

#[test]
fn value_parameter_forces_both_the_read_and_write_side() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("magic", "u8", [("value", ParamValue::literal(0x42u64))])
        .unwrap()
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(proto).unwrap();
    // even though the stream holds a different byte, `value` overrides it.
    rec.read(&mut &[0x99u8][..]).unwrap();
    assert_eq!(rec.snapshot().unwrap().field("magic").unwrap().as_u64(), Some(0x42));
    assert_eq!(rec.to_binary().unwrap(), vec![0x42]);
}

#[test]
fn literal_check_value_compares_equality_not_truthiness() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("magic", "u8", [("check_value", ParamValue::literal(0x00u64))])
        .unwrap()
        .build(&reg)
        .unwrap();

    let mut ok = Record::new(proto.clone()).unwrap();
    ok.read(&mut &[0x00u8][..]).unwrap();
    assert_eq!(ok.snapshot().unwrap().field("magic").unwrap().as_u64(), Some(0));

    let mut bad = Record::new(proto).unwrap();
    let err = bad.read(&mut &[0x01u8][..]).unwrap_err();
    assert!(matches!(err, binform::Error::ValidityError(_)));
}

#[test]
fn check_value_failure_is_reported_as_a_validity_error() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field(
            "magic",
            "u8",
            [("check_value", ParamValue::deferred(|ctx| Ok(Value::Bool(ctx.get("value")?.as_u64() == Some(0xAB)))))],
        )
        .unwrap()
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(proto).unwrap();
    let err = rec.read(&mut &[0x00u8][..]).unwrap_err();
    assert!(matches!(err, binform::Error::ValidityError(_)));
}

#[test]
fn field_names_excludes_hidden_fields() {
    let reg = registry();
    let proto = StructBuilder::new()
        .field("a", "u8", [])
        .unwrap()
        .field("b", "u8", [])
        .unwrap()
        .hide("b")
        .build(&reg)
        .unwrap();
    let rec = Record::new(proto).unwrap();
    let doc = rec.document();
    let root = doc.root();
    assert_eq!(binform::struct_::field_names(doc, root), vec!["a".to_owned()]);
}

#[test]
fn bare_index_symbol_resolves_through_a_struct_nested_in_an_array() {
    let reg = registry();
    let element = StructBuilder::new()
        .field("tag", "u8", [("value", ParamValue::deferred(|ctx| Ok(Value::UInt(ctx.index()? as u64))))])
        .unwrap()
        .build(&reg)
        .unwrap();
    let array = ArrayBuilder::new()
        .element_with(element, [])
        .initial_length(ParamValue::literal(3u64))
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(array).unwrap();
    rec.read(&mut &[0u8, 0, 0][..]).unwrap();
    let snap = rec.snapshot().unwrap();
    let list = snap.as_list().unwrap();
    assert_eq!(list[0].field("tag").unwrap().as_u64(), Some(0));
    assert_eq!(list[1].field("tag").unwrap().as_u64(), Some(1));
    assert_eq!(list[2].field("tag").unwrap().as_u64(), Some(2));
}

#[test]
fn choice_copy_on_change_propagates_an_incompatible_carry_as_an_error() {
    let reg = registry();
    let boxed_struct = StructBuilder::new().field("y", "u8", []).unwrap().build(&reg).unwrap();
    let choice_ty = ChoiceBuilder::new()
        .selection(ParamValue::symbol("kind"))
        .option_int(0, "u8", [])
        .option_int_with(1, boxed_struct, [])
        .copy_on_change(true)
        .build(&reg)
        .unwrap();
    let proto = StructBuilder::new()
        .field("kind", "u8", [])
        .unwrap()
        .field_with("payload", choice_ty, [])
        .unwrap()
        .build(&reg)
        .unwrap();

    let mut rec = Record::new(proto).unwrap();
    rec.read(&mut &[0u8, 5][..]).unwrap();
    assert_eq!(rec.snapshot().unwrap().field("payload").unwrap().as_u64(), Some(5));

    // Switching `kind` to the struct variant carries the prior primitive
    // snapshot (`UInt(5)`) into an assign that requires a map — the shape
    // mismatch must surface, not vanish.
    let err = rec.read(&mut &[1u8, 9][..]).unwrap_err();
    assert!(matches!(err, binform::Error::ValidityError(_)));
}

#[test]
fn array_assign_past_the_end_grows_with_the_element_prototype() {
    let reg = registry();
    let array = binform::builder::ArrayBuilder::new()
        .element("u8", [])
        .initial_length(ParamValue::literal(0u64))
        .build(&reg)
        .unwrap();
    let mut rec = Record::new(array).unwrap();
    rec.read(&mut &[][..]).unwrap();
    rec.assign(Value::List(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)])).unwrap();
    assert_eq!(rec.to_binary().unwrap(), vec![1, 2, 3]);
}
