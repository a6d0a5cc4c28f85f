//! Procedural macros for svcpool.
//!
//! - `#[service]` - Registers a struct as a service implementation at link time

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Expr, Ident, ItemStruct, LitStr, Path, Token, Type, parenthesized,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// Register a struct as a service implementation.
///
/// The struct is collected by `InventorySource`. Without `factory`, instances are
/// built with `Default::default()`.
///
/// # Arguments
///
/// - `contracts(dyn A, dyn B)`: contracts the struct provides
/// - `priority = <expr>`: resolution priority, higher wins
/// - `scope = global | new_instance`: instance lifecycle
/// - `tag = "..."`: free-form tag
/// - `path = "..."`: registration path for path lookups
/// - `factory = <path>`: `fn() -> Result<Self, BoxError>` used to build instances
///
/// # Example
///
/// ```rust,ignore
/// #[service(contracts(dyn Printer), priority = 10, path = "printers/console")]
/// #[derive(Default)]
/// struct ConsolePrinter;
/// ```
#[proc_macro_attribute]
pub fn service(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ServiceArgs);
    let input = parse_macro_input!(item as ItemStruct);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "#[service] cannot register a generic struct",
        )
        .to_compile_error()
        .into();
    }

    let name = &input.ident;
    let register_fn = format_ident!("__svcpool_service_descriptor_{}", name);

    let start: proc_macro2::TokenStream = match &args.factory {
        Some(factory) => quote! { ::svcpool::ServiceDescriptor::builder::<#name, _>(#factory) },
        None => quote! { ::svcpool::ServiceDescriptor::with_default::<#name>() },
    };

    let provides = args.contracts.iter().map(|contract| {
        quote! {
            .provides::<#contract>(|service| service as ::std::sync::Arc<#contract>)
        }
    });

    let priority = args.priority.as_ref().map(|p| quote! { .priority(#p) });

    let scope = args.scope.as_ref().map(|scope| {
        let variant = match scope.to_string().as_str() {
            "global" => quote! { Global },
            _ => quote! { NewInstance },
        };
        quote! { .scope(::svcpool::Scope::#variant) }
    });

    let tag = args.tag.as_ref().map(|t| quote! { .tag(#t) });
    let path = args.path.as_ref().map(|p| quote! { .path(#p) });

    let expanded = quote! {
        #input

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #register_fn() -> ::svcpool::ServiceDescriptor {
            #start
                #(#provides)*
                #priority
                #scope
                #tag
                #path
                .build()
        }

        ::svcpool::inventory::submit! {
            ::svcpool::ServiceRegistration::new(#register_fn)
        }
    };

    TokenStream::from(expanded)
}

struct ServiceArgs {
    contracts: Vec<Type>,
    priority: Option<Expr>,
    scope: Option<Ident>,
    tag: Option<LitStr>,
    path: Option<LitStr>,
    factory: Option<Path>,
}

impl Parse for ServiceArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut contracts = Vec::new();
        let mut priority = None;
        let mut scope = None;
        let mut tag = None;
        let mut path = None;
        let mut factory = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;

            if ident == "contracts" {
                let content;
                parenthesized!(content in input);
                let types = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
                contracts.extend(types);
            } else {
                input.parse::<Token![=]>()?;
                match ident.to_string().as_str() {
                    "priority" => priority = Some(input.parse()?),
                    "scope" => {
                        let value: Ident = input.parse()?;
                        if value != "global" && value != "new_instance" {
                            return Err(syn::Error::new(
                                value.span(),
                                "scope must be `global` or `new_instance`",
                            ));
                        }
                        scope = Some(value);
                    }
                    "tag" => tag = Some(input.parse()?),
                    "path" => path = Some(input.parse()?),
                    "factory" => factory = Some(input.parse()?),
                    other => {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("unknown attribute: {}", other),
                        ));
                    }
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(ServiceArgs {
            contracts,
            priority,
            scope,
            tag,
            path,
            factory,
        })
    }
}
