//! Exactly-once initialization of singleton components, validation on every call.
//!
//! [`SingletonInitializer`] owns a one-shot gate. The first caller to find the
//! gate unset takes the gate's lock, re-checks it, and runs `initialize` on
//! every registered component in registry order. Only after all of them
//! succeed is the gate set. Every call, including the one that initialized,
//! then runs `validate` on every component and stops at the first failure.
//!
//! Once the gate is set callers never touch the lock again: the fast path is a
//! single acquire load.

use core::fmt;

use tracing::{debug, trace, warn};

use crate::component::{Registry, SharedComponent};
use crate::state::{Gate, GateGuard};

/// Coordinator running one-time initialization and per-call validation.
///
/// Construct it once per process (it is `const`, so a `static` works) and
/// share it by reference.
pub struct SingletonInitializer {
   gate: Gate,
}

impl SingletonInitializer {
   /// Creates an initializer whose gate is unset.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self { gate: Gate::new() }
   }

   /// Whether initialization has completed. Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.gate.is_set()
   }

   /// Initializes every component of `registry` from `config` unless already
   /// done, then validates `config` against every component.
   ///
   /// Blocks while another thread is running initialization. Errors from
   /// `initialize` leave the gate unset so a later call retries from scratch;
   /// errors from `validate` stop the remaining validations. Both are returned
   /// unchanged.
   pub fn ensure_initialized<C, E, R>(&self, registry: &R, config: &C) -> Result<(), E>
   where
      C: ?Sized,
      R: Registry<C, E> + ?Sized,
   {
      if !self.gate.is_set() {
         self.initialize(registry, config)?;
      }
      validate_all(registry.components(), config)
   }

   /// Non-blocking form of [`ensure_initialized`](Self::ensure_initialized).
   ///
   /// Returns `None` without doing anything if another thread (or the current
   /// one, re-entrantly) holds the initialization lock.
   pub fn try_ensure_initialized<C, E, R>(&self, registry: &R, config: &C) -> Option<Result<(), E>>
   where
      C: ?Sized,
      R: Registry<C, E> + ?Sized,
   {
      if !self.gate.is_set() {
         match self.gate.try_lock() {
            Err(()) => {
               trace!("initialization in progress elsewhere");
               return None;
            }
            Ok(None) => {}
            Ok(Some(guard)) => {
               if let Err(err) = run_initialize(guard, registry.components(), config) {
                  return Some(Err(err));
               }
            }
         }
      }
      Some(validate_all(registry.components(), config))
   }

   /// Async form of [`ensure_initialized`](Self::ensure_initialized).
   ///
   /// Waits for a contended initialization lock by yielding to the runtime
   /// instead of parking the worker thread. Component calls stay synchronous.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn ensure_initialized_async<C, E, R>(&self, registry: &R, config: &C) -> Result<(), E>
   where
      C: ?Sized,
      R: Registry<C, E> + ?Sized,
   {
      if !self.gate.is_set() {
         debug!("initialization gate unset, taking slow path");
         if let Some(guard) = self.gate.lock_async().await {
            run_initialize(guard, registry.components(), config)?;
         }
      }
      validate_all(registry.components(), config)
   }

   #[cold]
   fn initialize<C, E, R>(&self, registry: &R, config: &C) -> Result<(), E>
   where
      C: ?Sized,
      R: Registry<C, E> + ?Sized,
   {
      debug!("initialization gate unset, taking slow path");
      match self.gate.lock() {
         // Fetched only after the re-check under the lock.
         Some(guard) => run_initialize(guard, registry.components(), config),
         None => {
            trace!("initialized by another caller while waiting");
            Ok(())
         }
      }
   }
}

/// Runs `initialize` on each component while holding `guard`, then sets the
/// gate. Dropping the guard on error or panic leaves the gate unset.
fn run_initialize<C, E>(guard: GateGuard<'_>, components: &[SharedComponent<C, E>], config: &C) -> Result<(), E>
where
   C: ?Sized,
{
   for component in components {
      trace!(component = component.name(), "initializing singleton component");
      if let Err(err) = component.initialize(config) {
         debug!(
            component = component.name(),
            "singleton component failed to initialize, gate left unset"
         );
         return Err(err);
      }
   }
   guard.commit();
   debug!(components = components.len(), "singleton components initialized");
   Ok(())
}

fn validate_all<C, E>(components: &[SharedComponent<C, E>], config: &C) -> Result<(), E>
where
   C: ?Sized,
{
   for component in components {
      trace!(component = component.name(), "validating singleton component");
      if let Err(err) = component.validate(config) {
         warn!(
            component = component.name(),
            "configuration rejected by singleton component"
         );
         return Err(err);
      }
   }
   Ok(())
}

impl Default for SingletonInitializer {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl fmt::Debug for SingletonInitializer {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("SingletonInitializer")
         .field("initialized", &self.is_initialized())
         .finish()
   }
}

/// A [`SingletonInitializer`] paired with the registry it serves.
///
/// Convenient when one registry and one initializer live for the whole
/// process: callers then only pass the configuration.
pub struct BoundInitializer<R> {
   registry: R,
   initializer: SingletonInitializer,
}

impl<R> BoundInitializer<R> {
   /// Creates an initializer with an unset gate serving `registry`.
   #[must_use]
   pub const fn new(registry: R) -> Self {
      Self {
         registry,
         initializer: SingletonInitializer::new(),
      }
   }

   /// The registry whose components this initializer drives.
   #[inline]
   pub fn registry(&self) -> &R {
      &self.registry
   }

   /// Whether initialization has completed. Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.initializer.is_initialized()
   }

   /// See [`SingletonInitializer::ensure_initialized`].
   pub fn ensure_initialized_and_valid<C, E>(&self, config: &C) -> Result<(), E>
   where
      C: ?Sized,
      R: Registry<C, E>,
   {
      self.initializer.ensure_initialized(&self.registry, config)
   }

   /// See [`SingletonInitializer::try_ensure_initialized`].
   pub fn try_ensure_initialized_and_valid<C, E>(&self, config: &C) -> Option<Result<(), E>>
   where
      C: ?Sized,
      R: Registry<C, E>,
   {
      self.initializer.try_ensure_initialized(&self.registry, config)
   }

   /// See [`SingletonInitializer::ensure_initialized_async`].
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn ensure_initialized_and_valid_async<C, E>(&self, config: &C) -> Result<(), E>
   where
      C: ?Sized,
      R: Registry<C, E>,
   {
      self.initializer.ensure_initialized_async(&self.registry, config).await
   }
}

impl<R: fmt::Debug> fmt::Debug for BoundInitializer<R> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("BoundInitializer")
         .field("registry", &self.registry)
         .field("initialized", &self.is_initialized())
         .finish()
   }
}
