mod decode_field;
mod table_name;

use decode_field::decode_field;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};
use table_name::table_name;

/// Registers the fields of a struct as a `quarry::Model`.
///
/// ```rust,ignore
/// #[derive(Model, Default)]
/// #[quarry(table = "PERSON")]
/// struct Person {
///     #[quarry(col = "ID", index)]
///     id: u64,
///     #[quarry(col = "NAME")]
///     name: String,
///     #[quarry(json = "DATA.age")]
///     age: i32,
///     #[quarry(omit)]
///     cached: bool,
/// }
/// ```
#[proc_macro_derive(Model, attributes(quarry))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let name = &item.ident;
    let table_name = table_name(&item);
    let fields: Vec<_> = item
        .fields
        .iter()
        .map(decode_field)
        .filter(|f| !f.omit)
        .collect();
    let field_defs = fields.iter().map(|f| f.field_def());
    let slots = 0..fields.len();
    let values = fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        quote!(<#ty as ::quarry::AsValue>::as_value(&self.#ident))
    });
    let decodes = fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        quote!(self.#ident = <#ty as ::quarry::AsValue>::decode(raw, config)?)
    });
    let value_slots = slots.clone();
    quote! {
        impl ::quarry::Model for #name {
            fn table_name() -> &'static str {
                #table_name
            }

            fn fields() -> &'static [::quarry::FieldDef] {
                static FIELDS: ::std::sync::LazyLock<Box<[::quarry::FieldDef]>> =
                    ::std::sync::LazyLock::new(|| vec![#(#field_defs),*].into_boxed_slice());
                &FIELDS
            }

            fn value(&self, slot: usize) -> ::quarry::Value {
                match slot {
                    #(#value_slots => #values,)*
                    _ => ::quarry::Value::Null,
                }
            }

            fn decode(
                &mut self,
                slot: usize,
                raw: ::std::option::Option<&[u8]>,
                config: &::quarry::Config,
            ) -> ::quarry::Result<()> {
                match slot {
                    #(#slots => #decodes,)*
                    _ => {
                        return Err(::quarry::Error::Extraction(format!(
                            "`{}` has no field at slot {}",
                            #table_name, slot
                        )));
                    }
                }
                Ok(())
            }
        }

        impl<'r> ::quarry::IntoRecords<'r> for &'r #name {
            type Model = #name;
            fn into_records(self) -> ::quarry::Result<::quarry::Records<'r, #name>> {
                Ok(::quarry::Records {
                    storage: ::quarry::Storage::Shared(::std::slice::from_ref(self)),
                    growable: false,
                })
            }
        }

        impl<'r> ::quarry::IntoRecords<'r> for &'r mut #name {
            type Model = #name;
            fn into_records(self) -> ::quarry::Result<::quarry::Records<'r, #name>> {
                Ok(::quarry::Records {
                    storage: ::quarry::Storage::Exclusive(::std::slice::from_mut(self)),
                    growable: false,
                })
            }
        }
    }
    .into()
}
