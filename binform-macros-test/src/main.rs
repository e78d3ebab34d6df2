use binform::builder::StructBuilder;
use binform::params::ParamValue;
use binform::{Record, Registry};
use binform_macros::BinRecord;

// `BinRecord` only reads field names and `#[binform(...)]` attributes; the
// field types themselves are unused markers, since the actual value lives in
// the `Record`/`Document` the schema builds, not in a Rust struct instance.
#[derive(BinRecord)]
#[binform(endian = "big")]
struct Header {
    #[binform(type = "u32be")]
    magic: (),
    #[binform(type = "u16be")]
    len: (),
}

fn main() {
    let registry = Registry::with_builtins();

    let derived = Header::binform_schema(&registry).unwrap();
    let mut derived_rec = Record::new(derived).unwrap();
    derived_rec.read(&mut &[0, 0, 0, 7, 0, 3][..]).unwrap();
    assert_eq!(derived_rec.to_binary().unwrap(), vec![0, 0, 0, 7, 0, 3]);

    // The same shape built by hand with the builder API should round-trip
    // identically — the macro is sugar over `StructBuilder`, nothing more.
    let built = StructBuilder::new()
        .endian(binform::Endian::Big)
        .field("magic", "u32be", [])
        .unwrap()
        .field("len", "u16be", [])
        .unwrap()
        .build(&registry)
        .unwrap();
    let mut built_rec = Record::new(built).unwrap();
    built_rec.read(&mut &[0, 0, 0, 7, 0, 3][..]).unwrap();
    assert_eq!(built_rec.to_binary().unwrap(), derived_rec.to_binary().unwrap());

    let _ = ParamValue::literal(0u64);
    println!("ok");
}
