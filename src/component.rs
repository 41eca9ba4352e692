//! Singleton component capability and the registries that supply them.

use core::fmt;
use std::sync::Arc;

/// A process-wide component whose state is derived once from a configuration.
///
/// `C` is the configuration type presented on every call, `E` the error type
/// shared by every component in one registry.
///
/// The initializer guarantees `initialize` runs at most once per component.
/// Calling it a second time is a contract violation; implementations need not
/// handle it gracefully.
pub trait SingletonComponent<C: ?Sized, E>: Send + Sync {
   /// Fixes the component's state from `config`.
   fn initialize(&self, config: &C) -> Result<(), E>;

   /// Checks that `config` is compatible with the state fixed by `initialize`.
   ///
   /// Must be free of side effects and safe to call concurrently.
   fn validate(&self, config: &C) -> Result<(), E>;

   /// Name used in diagnostics.
   fn name(&self) -> &str {
      core::any::type_name::<Self>()
   }
}

/// Shared handle to a registered component.
pub type SharedComponent<C, E> = Arc<dyn SingletonComponent<C, E>>;

/// Lookup of the current component set.
///
/// Called on every initializer call, so it should be cheap. The slice may be
/// a different allocation each time but must always name the same singleton
/// objects, in a stable order.
pub trait Registry<C: ?Sized, E> {
   fn components(&self) -> &[SharedComponent<C, E>];
}

impl<C: ?Sized, E> Registry<C, E> for [SharedComponent<C, E>] {
   #[inline]
   fn components(&self) -> &[SharedComponent<C, E>] {
      self
   }
}

impl<C: ?Sized, E> Registry<C, E> for Vec<SharedComponent<C, E>> {
   #[inline]
   fn components(&self) -> &[SharedComponent<C, E>] {
      self
   }
}

impl<C: ?Sized, E, R> Registry<C, E> for Arc<R>
where
   R: Registry<C, E> + ?Sized,
{
   #[inline]
   fn components(&self) -> &[SharedComponent<C, E>] {
      (**self).components()
   }
}

/// Ordered set of registered singleton components.
pub struct ComponentSet<C: ?Sized, E> {
   components: Vec<SharedComponent<C, E>>,
}

impl<C: ?Sized, E> ComponentSet<C, E> {
   /// Creates an empty set.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         components: Vec::new(),
      }
   }

   /// Appends a component. Registration order is initialization and
   /// validation order.
   pub fn register<S>(&mut self, component: S) -> &mut Self
   where
      S: SingletonComponent<C, E> + 'static,
   {
      self.components.push(Arc::new(component));
      self
   }

   /// Appends a component that is also held elsewhere.
   pub fn register_shared(&mut self, component: SharedComponent<C, E>) -> &mut Self {
      self.components.push(component);
      self
   }

   /// Builder form of [`register`](Self::register).
   #[must_use]
   pub fn with<S>(mut self, component: S) -> Self
   where
      S: SingletonComponent<C, E> + 'static,
   {
      self.register(component);
      self
   }

   #[inline]
   pub fn len(&self) -> usize {
      self.components.len()
   }

   #[inline]
   pub fn is_empty(&self) -> bool {
      self.components.is_empty()
   }

   /// Iterates components in registration order.
   pub fn iter(&self) -> impl Iterator<Item = &dyn SingletonComponent<C, E>> + '_ {
      self.components.iter().map(|c| &**c)
   }
}

impl<C: ?Sized, E> Registry<C, E> for ComponentSet<C, E> {
   #[inline]
   fn components(&self) -> &[SharedComponent<C, E>] {
      &self.components
   }
}

impl<C: ?Sized, E> Default for ComponentSet<C, E> {
   fn default() -> Self {
      Self::new()
   }
}

impl<C: ?Sized, E> FromIterator<SharedComponent<C, E>> for ComponentSet<C, E> {
   fn from_iter<I: IntoIterator<Item = SharedComponent<C, E>>>(iter: I) -> Self {
      Self {
         components: iter.into_iter().collect(),
      }
   }
}

impl<C: ?Sized, E> fmt::Debug for ComponentSet<C, E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_list().entries(self.iter().map(|c| c.name())).finish()
   }
}
