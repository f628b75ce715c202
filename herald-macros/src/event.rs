//! Event-related macros.
//!
//! This module contains:
//! - `#[derive(Event)]` - Derive macro for implementing the `Event` trait

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Fields, GenericParam, Index, Member, Token, Type, punctuated::Punctuated,
    spanned::Spanned,
};

/// Implementation of `#[derive(Event)]`.
pub(crate) fn derive_event_impl(mut input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;

    let mut views: Vec<Type> = Vec::new();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                let content;
                syn::parenthesized!(content in meta.input);
                let types = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
                views.extend(types);
                Ok(())
            } else {
                Err(meta.error("unknown event attribute, expected `implements(...)`"))
            }
        })?;
    }

    let mut parents: Vec<(Member, Type)> = Vec::new();
    match &input.data {
        Data::Struct(data) => {
            let fields = match &data.fields {
                Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
                Fields::Unnamed(unnamed) => unnamed.unnamed.iter().collect::<Vec<_>>(),
                Fields::Unit => Vec::new(),
            };
            for (index, field) in fields.into_iter().enumerate() {
                if !has_extends(&field.attrs)? {
                    continue;
                }
                let member = match &field.ident {
                    Some(ident) => Member::Named(ident.clone()),
                    None => Member::Unnamed(Index {
                        index: index as u32,
                        span: field.span(),
                    }),
                };
                parents.push((member, field.ty.clone()));
            }
        }
        Data::Enum(data) => {
            for variant in &data.variants {
                for field in variant.fields.iter() {
                    if has_extends(&field.attrs)? {
                        return Err(syn::Error::new_spanned(
                            field,
                            "`#[event(extends)]` is only supported on struct fields",
                        ));
                    }
                }
            }
        }
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "Event cannot be derived for unions",
            ));
        }
    }

    // Events are shared across threads for the life of the bus.
    let type_params: Vec<_> = input
        .generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(ty) => Some(ty.ident.clone()),
            _ => None,
        })
        .collect();
    if !type_params.is_empty() {
        let where_clause = input.generics.make_where_clause();
        for ident in &type_params {
            where_clause.predicates.push(syn::parse_quote! {
                #ident: ::core::marker::Send + ::core::marker::Sync + 'static
            });
        }
    }
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut helpers = Vec::new();
    let mut declarations = Vec::new();

    for (index, (member, parent)) in parents.iter().enumerate() {
        let helper = format_ident!("__herald_extends_{}", index);
        helpers.push(quote! {
            #[doc(hidden)]
            fn #helper(event: &Self) -> &#parent {
                &event.#member
            }
        });
        declarations.push(quote! {
            types.extends::<#parent>(Self::#helper);
        });
    }

    for (index, view) in views.iter().enumerate() {
        let view = with_static_bound(view);
        let helper = format_ident!("__herald_implements_{}", index);
        helpers.push(quote! {
            #[doc(hidden)]
            fn #helper(event: &Self) -> &#view {
                event
            }
        });
        declarations.push(quote! {
            types.implements::<#view>(Self::#helper);
        });
    }

    let helper_impl = if helpers.is_empty() {
        None
    } else {
        Some(quote! {
            impl #impl_generics #name #ty_generics #where_clause {
                #(#helpers)*
            }
        })
    };

    let types_arg = if declarations.is_empty() {
        quote! { _types }
    } else {
        quote! { types }
    };

    Ok(quote! {
        #helper_impl

        impl #impl_generics ::herald::Event for #name #ty_generics #where_clause {
            fn supertypes(#types_arg: &mut ::herald::Supertypes<Self>) {
                #(#declarations)*
            }
        }
    })
}

fn has_extends(attrs: &[syn::Attribute]) -> syn::Result<bool> {
    let mut found = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("extends") {
                found = true;
                Ok(())
            } else {
                Err(meta.error("unknown field attribute, expected `extends`"))
            }
        })?;
    }
    Ok(found)
}

/// Gives bare trait objects an explicit `'static` bound, so `&dyn Trait` in
/// generated signatures names one type instead of one per lifetime.
pub(crate) fn with_static_bound(ty: &Type) -> Type {
    match ty {
        Type::TraitObject(object) => {
            let has_lifetime = object
                .bounds
                .iter()
                .any(|bound| matches!(bound, syn::TypeParamBound::Lifetime(_)));
            let mut object = object.clone();
            if !has_lifetime {
                object.bounds.push(syn::parse_quote!('static));
            }
            Type::Paren(syn::TypeParen {
                paren_token: Default::default(),
                elem: Box::new(Type::TraitObject(object)),
            })
        }
        Type::Paren(paren) => with_static_bound(&paren.elem),
        Type::Group(group) => with_static_bound(&group.elem),
        other => other.clone(),
    }
}

#[cfg(test)]
fn parse_derive(tokens: TokenStream) -> syn::Result<TokenStream> {
    derive_event_impl(syn::parse2(tokens)?)
}
