//! Procedural macros for action-dispatch

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any, struct_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, darling::util::Ignored>,

    /// Explicit name for struct actions
    #[darling(default)]
    name: Option<String>,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<darling::util::Ignored>,

    /// Explicit name override
    #[darling(default)]
    name: Option<String>,
}

/// Derive macro for the Action trait
///
/// Generates `name()` from the variant identifier for enums and from the
/// type identifier for structs. `#[action(name = "...")]` overrides the
/// generated name, on a variant or on a struct.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// enum NetAction {
///     Ping,
///     Pong { seq: u32 },
///     #[action(name = "net.reset")]
///     Reset,
/// }
///
/// #[derive(Action, Clone, Debug)]
/// struct Tick(u64);
///
/// assert_eq!(NetAction::Pong { seq: 1 }.name(), "Pong");
/// assert_eq!(NetAction::Reset.name(), "net.reset");
/// assert_eq!(Tick(3).name(), "Tick");
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let body: TokenStream2 = match &opts.data {
        darling::ast::Data::Enum(variants) => {
            if opts.name.is_some() {
                return syn::Error::new_spanned(
                    &input.ident,
                    "#[action(name = ...)] on an enum must be set per variant",
                )
                .to_compile_error()
                .into();
            }
            if variants.is_empty() {
                quote! { match *self {} }
            } else {
                let arms = variants.iter().map(|v| {
                    let variant_name = &v.ident;
                    let variant_str = v.name.clone().unwrap_or_else(|| variant_name.to_string());

                    match &v.fields.style {
                        darling::ast::Style::Unit => quote! {
                            #name::#variant_name => #variant_str
                        },
                        darling::ast::Style::Tuple => quote! {
                            #name::#variant_name(..) => #variant_str
                        },
                        darling::ast::Style::Struct => quote! {
                            #name::#variant_name { .. } => #variant_str
                        },
                    }
                });
                quote! {
                    match self {
                        #(#arms),*
                    }
                }
            }
        }
        darling::ast::Data::Struct(_) => {
            let struct_str = opts.name.clone().unwrap_or_else(|| name.to_string());
            quote! { #struct_str }
        }
    };

    let expanded = quote! {
        impl #impl_generics action_dispatch::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                #body
            }
        }
    };

    TokenStream::from(expanded)
}
