//! A thin demo binary over `binform`: builds one of a couple of built-in
//! sample schemas, reads a file against it, and dumps the result. Grounded
//! on the teacher's old `src/main.rs` (`clap::Parser`-derived `Args`) wired
//! up with `tracing-subscriber`, the way `nix-remote-simple-proxy` declares
//! (but never installs) the same pair of dependencies.

use std::fs;
use std::path::PathBuf;

use binform::builder::StructBuilder;
use binform::params::ParamValue;
use binform::{Record, Registry};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(about = "Read a file against a built-in binform schema and dump it")]
struct Args {
    /// Which built-in schema to parse the input against.
    #[arg(long, value_enum, default_value = "header")]
    schema: Schema,

    /// Path to the input bytes. Reads stdin if omitted.
    input: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Schema {
    /// `magic: u32be`, `len: u16be`, `payload: string(length = len)`.
    Header,
    /// `count: u8`, then `count` `u16be` elements.
    CountedArray,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let bytes = match &args.input {
        Some(path) => fs::read(path)?,
        None => {
            use std::io::Read;
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let registry = Registry::with_builtins();
    let proto = build_schema(args.schema, &registry)?;
    let mut record = Record::new(proto)?;
    record.read(&mut bytes.as_slice())?;

    println!("{}", record.inspect()?);
    println!("num_bytes: {}", record.num_bytes()?);
    Ok(())
}

#[tracing::instrument(skip(registry), err)]
fn build_schema(schema: Schema, registry: &Registry) -> anyhow::Result<binform::sanitize::SanitizedPrototype> {
    let proto = match schema {
        Schema::Header => StructBuilder::new()
            .endian(binform::Endian::Big)
            .field("magic", "u32be", [])?
            .field("len", "u16be", [])?
            .field("payload", "string", [("length", ParamValue::symbol("len"))])?
            .build(registry)?,
        Schema::CountedArray => {
            let elements = binform::builder::ArrayBuilder::new()
                .endian(binform::Endian::Big)
                .element("u16be", [])
                .initial_length(ParamValue::symbol("count"))
                .build(registry)?;
            StructBuilder::new()
                .field("count", "u8", [])?
                .field_with("elements", elements, [])?
                .build(registry)?
        }
    };
    Ok(proto)
}
