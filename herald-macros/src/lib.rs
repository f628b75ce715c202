//! Procedural macros for Herald.
//!
//! - `#[derive(Event)]` declares an event type and its supertypes
//! - `#[subscribers]` implements `Subscribe` from annotated handler methods

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemImpl, parse_macro_input};

mod event;
mod subscribe;

/// Derive macro for implementing the `Event` trait.
///
/// Supertypes are declared with the `event` attribute:
///
/// - `#[event(implements(dyn Shape, str))]` on the type: the event can also be
///   delivered as each listed view. The type must coerce to it, either by
///   unsizing (trait objects) or through `Deref`.
/// - `#[event(extends)]` on a field: the event is also delivered as the
///   field's event type and, transitively, everything that type extends.
///
/// Parents are declared before views, each in source order.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Event)]
/// struct Figure { id: u32 }
///
/// #[derive(Event)]
/// #[event(implements(dyn Shape))]
/// struct Circle {
///     #[event(extends)]
///     figure: Figure,
///     radius: f64,
/// }
/// ```
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    event::derive_event_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `Subscribe` for the type of an inherent impl block.
///
/// Every method marked `#[subscribe]` becomes a handler. Handler methods take
/// `&self` and exactly one `&Event` parameter, and return `()` or
/// `Result<(), E>`.
///
/// Method attributes:
/// - `#[subscribe]`, or `#[subscribe(subject = "...", concurrent)]`
/// - `#[par_subscribe]`: shorthand for `#[subscribe]` plus `#[allow_concurrent_events]`
/// - `#[subject("...")]`: listen on a subject other than the default
/// - `#[allow_concurrent_events]`: the method may run on several threads at once
///
/// Block arguments:
/// - `extends(field: Type, ...)`: inherit the handlers of listeners embedded in
///   the given fields. A handler with the same name and event type declared in
///   this block overrides the inherited one.
///
/// # Usage
///
/// ```rust,ignore
/// #[herald::subscribers]
/// impl Audit {
///     #[subscribe]
///     fn on_login(&self, event: &Login) {
///         self.log.record(event.user.clone());
///     }
///
///     #[subscribe]
///     #[subject("billing")]
///     #[allow_concurrent_events]
///     fn on_invoice(&self, event: &Invoice) -> Result<(), AuditError> {
///         self.store(event)
///     }
/// }
///
/// #[herald::subscribers(extends(audit: Audit))]
/// impl StrictAudit {
///     #[subscribe]
///     fn on_login(&self, event: &Login) { /* overrides Audit::on_login */ }
/// }
/// ```
#[proc_macro_attribute]
pub fn subscribers(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as subscribe::SubscribersArgs);
    let input = parse_macro_input!(item as ItemImpl);
    subscribe::subscribers_impl(args, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
