//! Event model and type hierarchy.
//!
//! An event is any `Send + Sync + 'static` value implementing [`Event`]. Besides
//! its own type, an event may declare supertypes it can be viewed as:
//!
//! - [`Supertypes::extends`] names a parent event embedded in the value. The
//!   parent's own supertypes are inherited transitively.
//! - [`Supertypes::implements`] names an arbitrary view, usually a trait object
//!   (`dyn Shape`) or an unsized type (`str`).
//!
//! The flattened set of all these types is computed once per concrete type and
//! cached in a process-wide [`Hierarchy`] table. Subscribers declared for any
//! member of the set receive the event.
//!
//! ```rust,ignore
//! trait Shape: Send + Sync { fn area(&self) -> f64; }
//!
//! struct Circle { r: f64 }
//! impl Shape for Circle { fn area(&self) -> f64 { 3.14 * self.r * self.r } }
//!
//! impl Event for Circle {
//!     fn supertypes(types: &mut Supertypes<Self>) {
//!         types.implements::<dyn Shape>(|circle| circle);
//!     }
//! }
//! ```

use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
};

/// Runtime identity of a type, with its name kept for diagnostics.
///
/// Equality and hashing only consider the [`TypeId`].
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key of `T`. Works for unsized types such as `str` or `dyn Trait`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type name, as reported by [`std::any::type_name`].
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A value that can be posted to a bus.
///
/// Override [`Event::supertypes`] to make the event visible to subscribers of
/// other types. `#[derive(Event)]` generates the implementation.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Event",
    label = "missing `Event` implementation",
    note = "Events must be `Send + Sync + 'static`; add `#[derive(Event)]` or `impl Event for {Self} {{}}`."
)]
pub trait Event: Sized + Send + Sync + 'static {
    /// Declares the supertypes this event can be delivered as.
    fn supertypes(types: &mut Supertypes<Self>) {
        let _ = types;
    }
}

// ============================================================================
// Projections
// ============================================================================

/// Turns the erased concrete event into a reference to one of its views.
trait Project<T: ?Sized>: Send + Sync {
    fn project<'a>(&self, value: &'a dyn Any) -> Option<&'a T>;
}

/// One `extends` hop: concrete event to embedded parent event.
trait Step: Send + Sync {
    fn step<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any>;
}

struct Concrete<E>(PhantomData<fn() -> E>);

impl<E: Event> Project<E> for Concrete<E> {
    fn project<'a>(&self, value: &'a dyn Any) -> Option<&'a E> {
        value.downcast_ref::<E>()
    }
}

struct Interface<E, T: ?Sized> {
    view: fn(&E) -> &T,
}

impl<E: Event, T: ?Sized + 'static> Project<T> for Interface<E, T> {
    fn project<'a>(&self, value: &'a dyn Any) -> Option<&'a T> {
        value.downcast_ref::<E>().map(self.view)
    }
}

struct Parent<E, P> {
    parent: fn(&E) -> &P,
}

impl<E: Event, P: Event> Step for Parent<E, P> {
    fn step<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        value
            .downcast_ref::<E>()
            .map(|event| (self.parent)(event) as &dyn Any)
    }
}

struct Through<T: ?Sized> {
    step: Arc<dyn Step>,
    inner: Arc<dyn Project<T>>,
}

impl<T: ?Sized + 'static> Project<T> for Through<T> {
    fn project<'a>(&self, value: &'a dyn Any) -> Option<&'a T> {
        self.inner.project(self.step.step(value)?)
    }
}

struct View<T: ?Sized> {
    key: TypeKey,
    project: Arc<dyn Project<T>>,
}

/// Type-erased [`View`], so views of different target types share one list.
trait ErasedView: Send + Sync {
    fn key(&self) -> TypeKey;
    fn through(&self, step: Arc<dyn Step>) -> Arc<dyn ErasedView>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: ?Sized + 'static> ErasedView for View<T> {
    fn key(&self) -> TypeKey {
        self.key
    }

    fn through(&self, step: Arc<dyn Step>) -> Arc<dyn ErasedView> {
        Arc::new(View::<T> {
            key: self.key,
            project: Arc::new(Through {
                step,
                inner: Arc::clone(&self.project),
            }),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Supertypes - declaration builder
// ============================================================================

/// Collects the supertype declarations of event type `E`.
///
/// The concrete type itself is always the first entry. Duplicate declarations
/// keep the first occurrence.
pub struct Supertypes<E> {
    views: Vec<Arc<dyn ErasedView>>,
    _event: PhantomData<fn() -> E>,
}

impl<E: Event> Supertypes<E> {
    fn new() -> Self {
        let own: Arc<dyn ErasedView> = Arc::new(View::<E> {
            key: TypeKey::of::<E>(),
            project: Arc::new(Concrete::<E>(PhantomData)),
        });
        Self {
            views: vec![own],
            _event: PhantomData,
        }
    }

    /// Declares that `E` embeds the parent event `P`.
    ///
    /// Every type in `P`'s hierarchy becomes part of `E`'s hierarchy.
    pub fn extends<P: Event>(&mut self, parent: fn(&E) -> &P) -> &mut Self {
        let step: Arc<dyn Step> = Arc::new(Parent { parent });
        let inherited = Hierarchy::of::<P>();
        for view in &inherited.views {
            self.push(view.through(Arc::clone(&step)));
        }
        self
    }

    /// Declares that `E` can be viewed as `T`.
    pub fn implements<T: ?Sized + 'static>(&mut self, view: fn(&E) -> &T) -> &mut Self {
        self.push(Arc::new(View::<T> {
            key: TypeKey::of::<T>(),
            project: Arc::new(Interface { view }),
        }));
        self
    }

    fn push(&mut self, view: Arc<dyn ErasedView>) {
        let key = view.key();
        if !self.views.iter().any(|existing| existing.key() == key) {
            self.views.push(view);
        }
    }
}

// ============================================================================
// Hierarchy - flattened, cached type closure
// ============================================================================

lazy_static! {
    /// Global cache of event types to their flattened hierarchy. Shared by all
    /// buses since the hierarchy is a pure function of the type.
    static ref HIERARCHIES: RwLock<HashMap<TypeId, Arc<Hierarchy>>> = RwLock::new(HashMap::new());
}

/// The flattened set of types an event type can be delivered as.
pub struct Hierarchy {
    concrete: TypeKey,
    views: Vec<Arc<dyn ErasedView>>,
}

impl Hierarchy {
    /// Returns the cached hierarchy of `E`, building it on first use.
    pub fn of<E: Event>() -> Arc<Hierarchy> {
        let id = TypeId::of::<E>();
        if let Some(found) = HIERARCHIES.read().get(&id) {
            return Arc::clone(found);
        }

        // Built outside the lock: `extends` recurses into `of::<P>()`.
        let mut types = Supertypes::<E>::new();
        E::supertypes(&mut types);
        let built = Arc::new(Hierarchy {
            concrete: TypeKey::of::<E>(),
            views: types.views,
        });

        Arc::clone(HIERARCHIES.write().entry(id).or_insert(built))
    }

    /// The concrete event type.
    pub fn concrete(&self) -> TypeKey {
        self.concrete
    }

    /// All member types, concrete type first, then declaration order.
    pub fn types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.views.iter().map(|view| view.key())
    }

    /// Whether `key` is part of this hierarchy.
    pub fn contains(&self, key: TypeKey) -> bool {
        self.views.iter().any(|view| view.key() == key)
    }

    /// Number of member types.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Always false: the concrete type is a member.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    fn project<'a, T: ?Sized + 'static>(&self, value: &'a dyn Any) -> Option<&'a T> {
        let key = TypeKey::of::<T>();
        let view = self.views.iter().find(|view| view.key() == key)?;
        let view = view.as_any().downcast_ref::<View<T>>()?;
        view.project.project(value)
    }
}

impl fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.types()).finish()
    }
}

// ============================================================================
// AnyEvent - shared, type-erased event
// ============================================================================

/// A posted event, shared between the poster and every subscriber receiving it.
#[derive(Clone)]
pub struct AnyEvent {
    value: Arc<dyn Any + Send + Sync>,
    hierarchy: Arc<Hierarchy>,
}

impl AnyEvent {
    /// Wraps an event value.
    pub fn new<E: Event>(event: E) -> Self {
        Self::from_arc(Arc::new(event))
    }

    /// Wraps an already shared event value.
    pub fn from_arc<E: Event>(event: Arc<E>) -> Self {
        Self {
            value: event,
            hierarchy: Hierarchy::of::<E>(),
        }
    }

    /// The concrete type of the event.
    pub fn type_key(&self) -> TypeKey {
        self.hierarchy.concrete()
    }

    /// The flattened hierarchy of the event's concrete type.
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Whether the concrete type is `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.value.is::<E>()
    }

    /// The event as its concrete type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.value.downcast_ref::<E>()
    }

    /// The event as any member of its hierarchy, e.g. `view::<dyn Shape>()`.
    pub fn view<T: ?Sized + 'static>(&self) -> Option<&T> {
        let value: &dyn Any = &*self.value;
        self.hierarchy.project(value)
    }

    /// Whether both handles share the same event value.
    pub fn ptr_eq(&self, other: &AnyEvent) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for AnyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyEvent").field(&self.type_key()).finish()
    }
}

// Common Event implementations
macro_rules! impl_event {
    ($($ty:ty),* $(,)?) => {
        $(impl Event for $ty {})*
    };
}

impl_event!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl Event for String {
    fn supertypes(types: &mut Supertypes<Self>) {
        types.implements::<str>(String::as_str);
    }
}

fn static_str<'a>(value: &'a &'static str) -> &'a str {
    value
}

impl Event for &'static str {
    fn supertypes(types: &mut Supertypes<Self>) {
        types.implements::<str>(static_str);
    }
}
