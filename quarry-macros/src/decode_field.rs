use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Field, Ident, Lit, LitStr, Type, parse::ParseBuffer};

/// Attribute keys taking a string, `#[quarry(col = "ID")]`.
const TEXT_KEYS: &[&str] = &[
    "col",
    "table",
    "table_alias",
    "col_as",
    "filter",
    "join",
    "json",
    "json_merge",
    "json_merge_preserve",
    "json_merge_patch",
    "json_array_append",
    "self_expr",
    "schema_field",
    "schema_table",
    "count_on",
];

/// Attribute keys taking a literal of the field type, `#[quarry(alt = 1)]`.
const LITERAL_KEYS: &[&str] = &["alt", "as_null", "as_clear"];

/// Flags, `#[quarry(index)]`.
const FLAG_KEYS: &[&str] = &["index", "json_cast", "raw", "no_from", "init", "pass_update"];

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) omit: bool,
    /// Explicit `FieldDef` members, the others take the default.
    pub(crate) members: Vec<(Ident, TokenStream)>,
}

impl FieldMetadata {
    /// `FieldDef` initializer of this field.
    pub(crate) fn field_def(&self) -> TokenStream {
        let name = self.ident.to_string();
        let ty = &self.ty;
        let members = self.members.iter().map(|(k, v)| quote!(#k: #v,));
        quote! {
            ::quarry::FieldDef {
                name: #name,
                kind: <#ty as ::quarry::AsValue>::KIND,
                nullable: <#ty as ::quarry::AsValue>::NULLABLE,
                #(#members)*
                ..::quarry::FieldDef::DEFAULT
            }
        }
    }
}

fn literal_text(lit: &Lit) -> Option<String> {
    Some(match lit {
        Lit::Str(v) => v.value(),
        Lit::Int(v) => v.base10_digits().to_string(),
        Lit::Float(v) => v.base10_digits().to_string(),
        Lit::Bool(v) => v.value.to_string(),
        _ => return None,
    })
}

pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Model can only be derived on structs with named fields");
    let mut metadata = FieldMetadata {
        ident,
        ty: field.ty.clone(),
        omit: false,
        members: Vec::new(),
    };
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("quarry") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `quarry`, use it like: `#[quarry(attribute = value, ...)]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            let Some(key) = arg.path.get_ident().map(ToString::to_string) else {
                panic!("Error while parsing `quarry`, attributes are plain identifiers");
            };
            let member = format_ident!("{}", key);
            if key == "omit" {
                metadata.omit = true;
            } else if TEXT_KEYS.contains(&key.as_str()) {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!(
                        "Error while parsing `{key}`, use it like: `#[quarry({key} = \"text\")]`"
                    );
                };
                let v = v.value();
                metadata.members.push((member, quote!(Some(#v))));
            } else if LITERAL_KEYS.contains(&key.as_str()) {
                let Some(v) = arg
                    .value()
                    .and_then(ParseBuffer::parse::<Lit>)
                    .ok()
                    .as_ref()
                    .and_then(literal_text)
                else {
                    panic!("Error while parsing `{key}`, use it like: `#[quarry({key} = 0)]`");
                };
                metadata.members.push((member, quote!(Some(#v))));
            } else if FLAG_KEYS.contains(&key.as_str()) {
                let Err(..) = arg.value() else {
                    panic!("Error while parsing `{key}`, use it like: `#[quarry({key})]`");
                };
                metadata.members.push((member, quote!(true)));
            } else {
                panic!("Unknown attribute `{key}` on field `{}`", metadata.ident);
            }
            Ok(())
        });
    }
    metadata
}
