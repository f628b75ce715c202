//! Subscriber-related macros.
//!
//! This module contains:
//! - `#[subscribers]` - Attribute macro for implementing `Subscribe` from an
//!   impl block whose handler methods are marked with `#[subscribe]`

use crate::event::with_static_bound;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, FnArg, GenericParam, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Token, Type,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

/// Arguments for the `#[subscribers]` macro.
pub(crate) struct SubscribersArgs {
    /// `extends(field: Type, ...)`: inherit the handlers of embedded listeners.
    pub extends: Vec<(Ident, Type)>,
}

impl Parse for SubscribersArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut extends = Vec::new();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            match ident.to_string().as_str() {
                "extends" => {
                    let content;
                    syn::parenthesized!(content in input);
                    while !content.is_empty() {
                        let field: Ident = content.parse()?;
                        content.parse::<Token![:]>()?;
                        let ty: Type = content.parse()?;
                        extends.push((field, ty));
                        if content.peek(Token![,]) {
                            content.parse::<Token![,]>()?;
                        }
                    }
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(SubscribersArgs { extends })
    }
}

/// Handler options collected from a method's attributes.
#[derive(Default)]
struct HandlerAttrs {
    subscribe: bool,
    subject: Option<LitStr>,
    concurrent: bool,
}

impl HandlerAttrs {
    /// Reads and strips the handler attributes of one method.
    fn take(attrs: &mut Vec<Attribute>) -> syn::Result<Self> {
        let mut parsed = HandlerAttrs::default();
        let mut kept = Vec::with_capacity(attrs.len());

        for attr in attrs.drain(..) {
            let path = attr.path();
            if path.is_ident("subscribe") {
                parsed.subscribe = true;
                if matches!(attr.meta, syn::Meta::List(_)) {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("subject") {
                            parsed.subject = Some(meta.value()?.parse()?);
                            Ok(())
                        } else if meta.path.is_ident("concurrent") {
                            parsed.concurrent = true;
                            Ok(())
                        } else {
                            Err(meta.error("unknown subscribe option, expected `subject` or `concurrent`"))
                        }
                    })?;
                }
            } else if path.is_ident("par_subscribe") {
                parsed.subscribe = true;
                parsed.concurrent = true;
            } else if path.is_ident("subject") {
                parsed.subject = Some(attr.parse_args()?);
            } else if path.is_ident("allow_concurrent_events") {
                parsed.concurrent = true;
            } else {
                kept.push(attr);
            }
        }
        *attrs = kept;

        Ok(parsed)
    }
}

/// Implementation of the `#[subscribers]` attribute macro.
pub(crate) fn subscribers_impl(args: SubscribersArgs, mut input: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[subscribers] must be placed on an inherent impl block",
        ));
    }

    let mut declarations = Vec::new();
    let mut errors: Option<syn::Error> = None;

    for item in input.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let attrs = match HandlerAttrs::take(&mut method.attrs) {
            Ok(attrs) => attrs,
            Err(err) => {
                combine(&mut errors, err);
                continue;
            }
        };
        if !attrs.subscribe {
            if attrs.subject.is_some() || attrs.concurrent {
                combine(
                    &mut errors,
                    syn::Error::new_spanned(
                        &method.sig.ident,
                        "`#[subject]` and `#[allow_concurrent_events]` require `#[subscribe]`",
                    ),
                );
            }
            continue;
        }
        match declaration(method, &attrs) {
            Ok(tokens) => declarations.push(tokens),
            Err(err) => combine(&mut errors, err),
        }
    }

    if let Some(err) = errors {
        return Err(err);
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    let mut helpers = Vec::new();
    let mut extends = Vec::new();
    for (field, parent) in &args.extends {
        let helper = format_ident!("__herald_extends_{}", field);
        helpers.push(quote! {
            #[doc(hidden)]
            fn #helper(this: &Self) -> &#parent {
                &this.#field
            }
        });
        extends.push(quote! {
            handlers.extend::<#parent>(Self::#helper);
        });
    }

    let helper_impl = if helpers.is_empty() {
        None
    } else {
        Some(quote! {
            impl #impl_generics #self_ty #where_clause {
                #(#helpers)*
            }
        })
    };

    // Subscribe requires Send + Sync + 'static listeners.
    let mut bounded = input.generics.clone();
    let type_params: Vec<Ident> = bounded
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(ty) => Some(ty.ident.clone()),
            _ => None,
        })
        .collect();
    if !type_params.is_empty() {
        let where_clause = bounded.make_where_clause();
        for ident in &type_params {
            where_clause.predicates.push(syn::parse_quote! {
                #ident: ::core::marker::Send + ::core::marker::Sync + 'static
            });
        }
    }
    let (subscribe_generics, _, subscribe_where) = bounded.split_for_impl();

    let handlers_arg = if extends.is_empty() && declarations.is_empty() {
        quote! { _handlers }
    } else {
        quote! { handlers }
    };

    Ok(quote! {
        #input

        #helper_impl

        impl #subscribe_generics ::herald::Subscribe for #self_ty #subscribe_where {
            fn handlers(#handlers_arg: &mut ::herald::Handlers<Self>) {
                #(#extends)*
                #(#declarations)*
            }
        }
    })
}

fn declaration(method: &ImplItemFn, attrs: &HandlerAttrs) -> syn::Result<TokenStream> {
    let sig = &method.sig;
    let name = &sig.ident;

    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                sig,
                "subscriber methods must take `&self`",
            ));
        }
    }

    let params: Vec<_> = sig.inputs.iter().skip(1).collect();
    if params.len() != 1 {
        return Err(syn::Error::new(
            sig.inputs.span(),
            format!(
                "subscriber methods must have exactly 1 parameter, but `{}` has {}",
                name,
                params.len()
            ),
        ));
    }

    let event_type = match params[0] {
        FnArg::Typed(pat_type) => match &*pat_type.ty {
            Type::Reference(reference) if reference.mutability.is_none() => {
                with_static_bound(&reference.elem)
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "subscriber parameter must be a shared reference (&Event)",
                ));
            }
        },
        FnArg::Receiver(receiver) => {
            return Err(syn::Error::new_spanned(receiver, "unexpected receiver"));
        }
    };

    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "subscriber methods cannot be generic",
        ));
    }

    let name_str = name.to_string();
    let subject = attrs.subject.as_ref().map(|subject| quote! { .subject(#subject) });
    let concurrent = attrs.concurrent.then(|| quote! { .allow_concurrent() });

    Ok(quote! {
        handlers
            .on::<#event_type, _, _>(#name_str, |this: &Self, event: &#event_type| {
                Self::#name(this, event)
            })
            #subject
            #concurrent;
    })
}

fn combine(errors: &mut Option<syn::Error>, err: syn::Error) {
    match errors {
        Some(existing) => existing.combine(err),
        None => *errors = Some(err),
    }
}
