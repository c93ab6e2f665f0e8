//! # Garden Derive Macros
//!
//! This crate provides the `Columns` derive macro for garden records.  The macro reads the
//! named fields of a record struct and emits a `garden::Columns` implementation whose
//! `COLUMNS` constant describes every field: its name, a coarse field type, whether a
//! client must supply it and whether it accepts null.
//!
//! ### Rules
//!
//! - The column name is the field name (a leading `r#` is stripped).
//! - `Option<T>` fields are optional and nullable; their type is taken from `T`.
//! - Fields carrying a `#[serde(default ...)]` attribute are optional.
//! - Everything else is required.
//!
//! ### Example
//!
//! ```ignore
//! use garden::{Columns, FieldType};
//!
//! #[derive(garden_derive::Columns)]
//! struct Herbarium {
//!     id: uuid::Uuid,
//!     depart: String,
//!     region: Option<String>,
//! }
//!
//! assert_eq!(Herbarium::COLUMNS.len(), 3);
//! assert_eq!(Herbarium::COLUMNS[1].name, "depart");
//! assert_eq!(Herbarium::COLUMNS[1].field_type, FieldType::Text);
//! assert!(!Herbarium::COLUMNS[2].required);
//! ```

#![recursion_limit = "128"]

extern crate proc_macro;
#[macro_use]
extern crate quote;
extern crate syn;

use proc_macro2::TokenStream;
use syn::{DeriveInput, parse_macro_input};

use derive_util::StructVisitor;

/// Derive the Columns trait for a struct with named fields.
#[proc_macro_derive(Columns, attributes())]
pub fn derive_columns(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ty_name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let columns = match input.data {
        syn::Data::Struct(ref ds) => {
            let mut csv = ColumnsStructVisitor;
            csv.visit_struct(&ty_name, ds)
        }
        syn::Data::Enum(_) => {
            panic!("enums are not supported");
        }
        syn::Data::Union(_) => {
            panic!("unions are not supported");
        }
    };

    let generated = quote! {
        impl #impl_generics garden::Columns for #ty_name #ty_generics #where_clause {
            const COLUMNS: &'static [garden::Column] = &[#columns];
        }
    };
    generated.into()
}

////////////////////////////////////////// ColumnsStructVisitor /////////////////////////////////////////

struct ColumnsStructVisitor;

impl StructVisitor for ColumnsStructVisitor {
    type Output = TokenStream;

    fn visit_struct_named_fields(
        &mut self,
        _ty_name: &syn::Ident,
        _ds: &syn::DataStruct,
        fields: &syn::FieldsNamed,
    ) -> Self::Output {
        let mut result = quote! {};
        for field in fields.named.iter() {
            if let Some(field_ident) = &field.ident {
                let field_ident = field_ident.to_string();
                let column_name = if let Some(stripped) = field_ident.strip_prefix("r#") {
                    stripped.to_string()
                } else {
                    field_ident.clone()
                };
                let (inner, optional) = unwrap_option(&field.ty);
                let required = !optional && !has_serde_default(field);
                let field_type = field_type_tokens(inner);
                result = quote! {
                    #result
                    garden::Column {
                        name: #column_name,
                        field_type: #field_type,
                        required: #required,
                        nullable: #optional,
                    },
                };
            }
        }
        result
    }
}

///////////////////////////////////////////////// helpers ////////////////////////////////////////////////

fn last_segment(ty: &syn::Type) -> Option<&syn::PathSegment> {
    match ty {
        syn::Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}

fn unwrap_option(ty: &syn::Type) -> (&syn::Type, bool) {
    if let Some(segment) = last_segment(ty) {
        if segment.ident == "Option" {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return (inner, true);
                }
            }
        }
    }
    (ty, false)
}

fn has_serde_default(field: &syn::Field) -> bool {
    field
        .attrs
        .iter()
        .any(|attr| attr.path.is_ident("serde") && attr.tokens.to_string().contains("default"))
}

fn field_type_tokens(ty: &syn::Type) -> TokenStream {
    let ident = match last_segment(ty) {
        Some(segment) => segment.ident.to_string(),
        None => return quote! { garden::FieldType::Other("unknown") },
    };
    match ident.as_str() {
        "String" => quote! { garden::FieldType::Text },
        "bool" => quote! { garden::FieldType::Boolean },
        "f32" | "f64" => quote! { garden::FieldType::Float },
        "i16" | "i32" | "i64" | "u16" | "u32" | "u64" => quote! { garden::FieldType::Integer },
        "Uuid" => quote! { garden::FieldType::Uuid },
        "DateTime" => quote! { garden::FieldType::DateTime },
        "NaiveDate" => quote! { garden::FieldType::Date },
        other => quote! { garden::FieldType::Other(#other) },
    }
}
