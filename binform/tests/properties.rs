//! Property-based round-trip coverage, grounded on the teacher's own
//! `arbtest`-driven `test_roundtrip` for `WorkerOp`: generate arbitrary field
//! values, write them through a fixed schema, and check that reading the
//! result back reproduces the same values and the same bytes.

use arbtest::arbtest;

use binform::builder::StructBuilder;
use binform::value::Value;
use binform::{Record, Registry};

fn header_schema(reg: &Registry) -> binform::sanitize::SanitizedPrototype {
    StructBuilder::new()
        .endian(binform::Endian::Big)
        .field("a", "u32be", [])
        .unwrap()
        .field("b", "u16be", [])
        .unwrap()
        .field("c", "u8", [])
        .unwrap()
        .build(reg)
        .unwrap()
}

#[test]
fn struct_of_integers_round_trips_for_arbitrary_values() {
    let reg = Registry::with_builtins();
    arbtest(|u| {
        let a: u32 = u.arbitrary()?;
        let b: u16 = u.arbitrary()?;
        let c: u8 = u.arbitrary()?;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&a.to_be_bytes());
        bytes.extend_from_slice(&b.to_be_bytes());
        bytes.push(c);

        let mut rec = Record::new(header_schema(&reg)).unwrap();
        rec.read(&mut bytes.as_slice()).unwrap();

        let snap = rec.snapshot().unwrap();
        assert_eq!(snap.field("a").unwrap().as_u64(), Some(a as u64));
        assert_eq!(snap.field("b").unwrap().as_u64(), Some(b as u64));
        assert_eq!(snap.field("c").unwrap().as_u64(), Some(c as u64));
        assert_eq!(rec.to_binary().unwrap(), bytes);

        Ok(())
    });
}

#[test]
fn assigning_a_snapshot_back_reproduces_the_same_wire_bytes() {
    let reg = Registry::with_builtins();
    arbtest(|u| {
        let a: u32 = u.arbitrary()?;
        let b: u16 = u.arbitrary()?;
        let c: u8 = u.arbitrary()?;

        let mut first = Record::new(header_schema(&reg)).unwrap();
        first
            .assign(Value::Map(vec![
                ("a".to_owned(), Value::UInt(a as u64)),
                ("b".to_owned(), Value::UInt(b as u64)),
                ("c".to_owned(), Value::UInt(c as u64)),
            ]))
            .unwrap();
        let first_bytes = first.to_binary().unwrap();

        let mut second = Record::new(header_schema(&reg)).unwrap();
        second.read(&mut first_bytes.as_slice()).unwrap();
        let second_bytes = second.to_binary().unwrap();

        assert_eq!(first_bytes, second_bytes);
        Ok(())
    });
}
