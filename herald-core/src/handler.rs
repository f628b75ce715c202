//! Handler declarations and the registration metadata cache.
//!
//! A listener type implements [`Subscribe`] and lists its handler methods in
//! [`Subscribe::handlers`]. Each declaration names the method, the event type
//! it accepts, an optional subject and whether it may run concurrently:
//!
//! ```rust,ignore
//! struct Audit;
//!
//! impl Audit {
//!     fn on_login(&self, event: &Login) { /* ... */ }
//! }
//!
//! impl Subscribe for Audit {
//!     fn handlers(handlers: &mut Handlers<Self>) {
//!         handlers.on("on_login", Self::on_login).subject("auth").allow_concurrent();
//!     }
//! }
//! ```
//!
//! `#[herald::subscribers]` writes this implementation from annotated methods.
//!
//! The declarations of a type are collected into a [`HandlerSet`] the first time
//! the type is registered and cached for the life of the process, so later
//! registrations of the same type, on any bus, reuse it.

use crate::{
    error::{BoxError, RegistrationError, SubscriberError},
    event::{AnyEvent, TypeKey},
    subject::DEFAULT_SUBJECT,
};
use bitflags::bitflags;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

bitflags! {
    /// Delivery flags of a declared handler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HandlerFlags: u8 {
        /// The handler is safe to invoke from several threads at once.
        const ALLOW_CONCURRENT = 1;
        /// The handler was inherited through [`Handlers::extend`].
        const INHERITED = 1 << 1;
    }
}

/// Conversion of handler return values into a delivery outcome.
///
/// Implemented for `()` and for `Result<(), E>` where `E` converts into
/// [`BoxError`]; an `Err` is reported to the bus's exception handler.
pub trait IntoHandlerOutcome {
    /// Convert into the outcome the subscriber reports.
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl IntoHandlerOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoHandlerOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// A listener type with declared handler methods.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not declare any event handlers",
    label = "missing `Subscribe` implementation",
    note = "Annotate the impl block with `#[herald::subscribers]` or implement `Subscribe` by hand."
)]
pub trait Subscribe: Sized + Send + Sync + 'static {
    /// Declares the handler methods of this type.
    fn handlers(handlers: &mut Handlers<Self>);
}

type Invoker<L> = Arc<dyn Fn(&L, &AnyEvent) -> Result<(), SubscriberError> + Send + Sync>;

/// Metadata of one declared handler method of listener type `L`.
pub struct HandlerMeta<L> {
    name: &'static str,
    event_type: TypeKey,
    subject: Option<Arc<str>>,
    flags: HandlerFlags,
    invoker: Invoker<L>,
}

impl<L> HandlerMeta<L> {
    /// The declared method name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The event type the method accepts.
    pub fn event_type(&self) -> TypeKey {
        self.event_type
    }

    /// The subject the method listens on; the default subject when none was declared.
    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or(DEFAULT_SUBJECT)
    }

    /// Delivery flags.
    pub fn flags(&self) -> HandlerFlags {
        self.flags
    }

    /// Whether the method may be invoked concurrently.
    pub fn allows_concurrent(&self) -> bool {
        self.flags.contains(HandlerFlags::ALLOW_CONCURRENT)
    }

    /// Invoke the method on `listener` with `event`.
    pub fn invoke(&self, listener: &L, event: &AnyEvent) -> Result<(), SubscriberError> {
        (self.invoker)(listener, event)
    }

    fn same_method(&self, other: &HandlerMeta<L>) -> bool {
        self.name == other.name && self.event_type == other.event_type
    }
}

impl<L> Clone for HandlerMeta<L> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            event_type: self.event_type,
            subject: self.subject.clone(),
            flags: self.flags,
            invoker: Arc::clone(&self.invoker),
        }
    }
}

impl<L> fmt::Debug for HandlerMeta<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMeta")
            .field("name", &self.name)
            .field("event_type", &self.event_type)
            .field("subject", &self.subject())
            .field("flags", &self.flags)
            .finish()
    }
}

// ============================================================================
// Handlers - declaration builder
// ============================================================================

/// Collects the handler declarations of listener type `L`.
pub struct Handlers<L> {
    declared: Vec<HandlerMeta<L>>,
    inherited: Vec<HandlerMeta<L>>,
    error: Option<RegistrationError>,
}

impl<L: Subscribe> Handlers<L> {
    fn new() -> Self {
        Self {
            declared: Vec::new(),
            inherited: Vec::new(),
            error: None,
        }
    }

    /// Declare `method` as a handler for events of type `T`.
    ///
    /// `T` may be any member of an event's hierarchy, including unsized views
    /// such as `str` or `dyn Trait`.
    pub fn on<T, F, R>(&mut self, name: &'static str, method: F) -> HandlerOptions<'_, L>
    where
        T: ?Sized + 'static,
        F: Fn(&L, &T) -> R + Send + Sync + 'static,
        R: IntoHandlerOutcome,
    {
        let invoker: Invoker<L> = Arc::new(move |listener: &L, event: &AnyEvent| {
            let Some(view) = event.view::<T>() else {
                return Err(SubscriberError::TypeMismatch {
                    expected: TypeKey::of::<T>(),
                    found: event.type_key(),
                });
            };
            method(listener, view)
                .into_outcome()
                .map_err(SubscriberError::Failed)
        });

        self.declared.push(HandlerMeta {
            name,
            event_type: TypeKey::of::<T>(),
            subject: None,
            flags: HandlerFlags::empty(),
            invoker,
        });
        let index = self.declared.len() - 1;
        HandlerOptions {
            meta: &mut self.declared[index],
        }
    }

    /// Inherit every handler of `P`, reached through `project`.
    ///
    /// A handler declared on `L` itself with the same method name and event
    /// type overrides the inherited one.
    pub fn extend<P: Subscribe>(&mut self, project: fn(&L) -> &P) -> &mut Self {
        match HandlerSet::<P>::of() {
            Ok(parent) => {
                for meta in parent.iter() {
                    let inner = Arc::clone(&meta.invoker);
                    self.inherited.push(HandlerMeta {
                        name: meta.name,
                        event_type: meta.event_type,
                        subject: meta.subject.clone(),
                        flags: meta.flags | HandlerFlags::INHERITED,
                        invoker: Arc::new(move |listener: &L, event: &AnyEvent| {
                            inner(project(listener), event)
                        }),
                    });
                }
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    fn finish(self) -> Result<Vec<HandlerMeta<L>>, RegistrationError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let listener = std::any::type_name::<L>();
        let mut handlers: Vec<HandlerMeta<L>> = Vec::with_capacity(self.declared.len());
        for meta in self.declared {
            if meta.name.is_empty() {
                return Err(RegistrationError::InvalidHandler {
                    listener,
                    method: meta.name,
                    reason: "handler name must not be empty".to_string(),
                });
            }
            if handlers.iter().any(|existing| existing.same_method(&meta)) {
                return Err(RegistrationError::InvalidHandler {
                    listener,
                    method: meta.name,
                    reason: format!(
                        "declared more than once for event type `{}`",
                        meta.event_type.name()
                    ),
                });
            }
            handlers.push(meta);
        }

        for meta in self.inherited {
            if !handlers.iter().any(|existing| existing.same_method(&meta)) {
                handlers.push(meta);
            }
        }
        Ok(handlers)
    }
}

/// Options of the handler just declared with [`Handlers::on`].
pub struct HandlerOptions<'a, L> {
    meta: &'a mut HandlerMeta<L>,
}

impl<L> HandlerOptions<'_, L> {
    /// Listen on `subject` instead of the default subject. An empty subject
    /// keeps the default.
    pub fn subject(self, subject: &str) -> Self {
        self.meta.subject = if subject.is_empty() {
            None
        } else {
            Some(Arc::from(subject))
        };
        self
    }

    /// Mark the handler as safe to invoke concurrently.
    pub fn allow_concurrent(self) -> Self {
        self.meta.flags |= HandlerFlags::ALLOW_CONCURRENT;
        self
    }
}

// ============================================================================
// HandlerSet - cached per listener type
// ============================================================================

lazy_static! {
    /// Listener type to its handler set. Shared across all buses; the content
    /// only depends on the type.
    static ref HANDLER_SETS: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>> =
        RwLock::new(HashMap::new());
}

/// The resolved handlers of listener type `L`, declared and inherited.
pub struct HandlerSet<L> {
    listener: TypeKey,
    handlers: Vec<HandlerMeta<L>>,
}

impl<L: Subscribe> HandlerSet<L> {
    /// Returns the cached handler set of `L`, resolving it on first use.
    ///
    /// Invalid declarations are not cached; every attempt reports them again.
    pub fn of() -> Result<Arc<Self>, RegistrationError> {
        let id = TypeId::of::<L>();
        let cached = HANDLER_SETS.read().get(&id).cloned();
        if let Some(found) = cached {
            if let Ok(set) = found.downcast::<Self>() {
                return Ok(set);
            }
        }

        let mut handlers = Handlers::<L>::new();
        L::handlers(&mut handlers);
        let built = Arc::new(Self {
            listener: TypeKey::of::<L>(),
            handlers: handlers.finish()?,
        });

        let cached = Arc::clone(
            HANDLER_SETS
                .write()
                .entry(id)
                .or_insert_with(|| Arc::clone(&built) as Arc<dyn Any + Send + Sync>),
        );
        Ok(cached.downcast::<Self>().unwrap_or(built))
    }
}

impl<L> HandlerSet<L> {
    /// The listener type.
    pub fn listener(&self) -> TypeKey {
        self.listener
    }

    /// Iterate the handlers, own declarations first.
    pub fn iter(&self) -> impl Iterator<Item = &HandlerMeta<L>> {
        self.handlers.iter()
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the type declares no handlers.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
