use syn::{ItemStruct, LitStr, parse::ParseBuffer};

pub(crate) fn table_name(item: &ItemStruct) -> String {
    let mut result = item.ident.to_string();
    for attr in &item.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("quarry") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `quarry`, use it like: `#[quarry(table = \"my_table\")]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("table") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!(
                        "Error while parsing `table`, use it like: `#[quarry(table = \"my_table\")]`"
                    );
                };
                result = v.value();
            } else {
                panic!(
                    "Unknown attribute `{}` on `{}`, only `table` is accepted on the struct",
                    arg.path
                        .get_ident()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    item.ident,
                );
            }
            Ok(())
        });
    }
    result
}
