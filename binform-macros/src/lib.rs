//! `#[derive(BinRecord)]`: reads a plain Rust struct annotated with
//! `#[binform(type = "...", ...)]` per field (and an optional struct-level
//! `#[binform(endian = "little")]`) and emits a `binform_schema` associated
//! function that builds the equivalent `StructBuilder` call. The attribute
//! parsing here follows the same shape as `tagged_serde`'s derive: find the
//! relevant attribute by path, pull out its name-value pairs.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

#[proc_macro_derive(BinRecord, attributes(binform))]
pub fn derive_bin_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input).unwrap_or_else(|e| e.to_compile_error()).into()
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = input.ident;

    let Data::Struct(data) = input.data else {
        return Err(syn::Error::new_spanned(ident, "BinRecord can only be derived for structs"));
    };
    let Fields::Named(fields) = data.fields else {
        return Err(syn::Error::new_spanned(ident, "BinRecord requires named fields"));
    };

    let endian = struct_endian(&input.attrs)?;
    let endian_call = match endian {
        Some(e) => quote! { builder = builder.endian(#e); },
        None => quote! {},
    };

    let mut field_calls = Vec::new();
    for field in &fields.named {
        let name = field.ident.as_ref().expect("named field").to_string();
        let spec = field_spec(&field.attrs)?;
        let type_name = spec.type_name.ok_or_else(|| {
            syn::Error::new_spanned(field, format!("field `{name}` is missing #[binform(type = \"...\")]"))
        })?;
        let params = spec.extra.iter().map(|(k, expr)| quote! { (#k, #expr) });
        field_calls.push(quote! {
            builder = builder.field(#name, #type_name, [#(#params),*])?;
        });
    }

    Ok(quote! {
        impl #ident {
            /// Builds this record's schema against an explicit registry —
            /// never a process-wide global, per binform's design notes.
            pub fn binform_schema(
                registry: &::binform::Registry,
            ) -> ::binform::Result<::binform::sanitize::SanitizedPrototype> {
                let mut builder = ::binform::builder::StructBuilder::new();
                #endian_call
                #( #field_calls )*
                builder.build(registry)
            }
        }
    })
}

fn struct_endian(attrs: &[syn::Attribute]) -> syn::Result<Option<proc_macro2::TokenStream>> {
    for attr in attrs {
        if !attr.path().is_ident("binform") {
            continue;
        }
        let mut found = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("endian") {
                let value: syn::LitStr = meta.value()?.parse()?;
                found = Some(match value.value().as_str() {
                    "little" => quote! { ::binform::Endian::Little },
                    "big" => quote! { ::binform::Endian::Big },
                    other => return Err(meta.error(format!("unknown endian `{other}`"))),
                });
            }
            Ok(())
        })?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

struct FieldSpec {
    type_name: Option<String>,
    extra: Vec<(String, proc_macro2::TokenStream)>,
}

fn field_spec(attrs: &[syn::Attribute]) -> syn::Result<FieldSpec> {
    let mut spec = FieldSpec { type_name: None, extra: Vec::new() };
    for attr in attrs {
        if !attr.path().is_ident("binform") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let name = meta
                .path
                .get_ident()
                .ok_or_else(|| meta.error("expected an identifier"))?
                .to_string();
            let value: syn::LitStr = meta.value()?.parse()?;
            if name == "type" {
                spec.type_name = Some(value.value());
            } else {
                let expr = param_expr(&value.value());
                spec.extra.push((name, expr));
            }
            Ok(())
        })?;
    }
    Ok(spec)
}

/// A field parameter's textual value is either an integer literal or a
/// sibling field's name — the latter becomes a lazy symbol reference
/// resolved against the live parent chain at read/write time.
fn param_expr(raw: &str) -> proc_macro2::TokenStream {
    match raw.parse::<i64>() {
        Ok(n) => quote! { ::binform::params::ParamValue::literal(#n as u64) },
        Err(_) => quote! { ::binform::params::ParamValue::symbol(#raw) },
    }
}
