use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, Lit, LitStr, Meta, Type};

/// Derive macro describing the CSV columns of a flat record struct.
///
/// For each field:
/// - column name (honours `#[serde(rename = "...")]`)
/// - required (false for `Option<T>` or `#[serde(default)]` fields)
/// - description (from doc comments)
///
/// Generates `csv_schema() -> &'static [CsvField]` and
/// `csv_columns() -> &'static [&'static str]`. A `CsvField` type must be in
/// scope where the derive is used.
#[proc_macro_derive(CsvSchema, attributes(serde))]
pub fn derive_csv_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "CsvSchema only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "CsvSchema only supports structs")),
    };

    let mut columns = Vec::new();
    for field in fields {
        let Some(column) = describe_field(field)? else {
            continue;
        };
        columns.push(column);
    }

    let names = columns.iter().map(|c| &c.name);
    let entries = columns.iter().map(|c| {
        let Column {
            name,
            required,
            description,
        } = c;
        quote! {
            CsvField {
                name: #name,
                required: #required,
                description: #description,
            }
        }
    });

    Ok(quote! {
        impl #name {
            pub fn csv_schema() -> &'static [CsvField] {
                static SCHEMA: &[CsvField] = &[
                    #(#entries),*
                ];
                SCHEMA
            }

            pub fn csv_columns() -> &'static [&'static str] {
                static COLUMNS: &[&str] = &[#(#names),*];
                COLUMNS
            }
        }
    })
}

struct Column {
    name: String,
    required: bool,
    description: String,
}

/// Returns `None` for `#[serde(skip)]` fields.
fn describe_field(field: &Field) -> syn::Result<Option<Column>> {
    let mut name = field
        .ident
        .as_ref()
        .map(|ident| ident.to_string())
        .unwrap_or_default();
    let mut has_default = false;
    let mut skipped = false;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                name = value.value();
            } else if meta.path.is_ident("default") {
                has_default = true;
                // `default = "path"` form
                if meta.input.peek(syn::Token![=]) {
                    let _: LitStr = meta.value()?.parse()?;
                }
            } else if meta.path.is_ident("skip") {
                skipped = true;
            } else if meta.input.peek(syn::Token![=]) {
                let _: proc_macro2::TokenStream = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }

    if skipped {
        return Ok(None);
    }

    Ok(Some(Column {
        name,
        required: !has_default && !is_option_type(&field.ty),
        description: doc_comment(&field.attrs),
    }))
}

fn doc_comment(attrs: &[syn::Attribute]) -> String {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => match &meta.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: Lit::Str(lit), ..
                }) => Some(lit.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_option_type(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
