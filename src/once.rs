//! Write-once cell for state fixed at initialization.
//!
//! [`Once<T>`] stores state that must never change once written. It shares
//! the gate state machine with [`SingletonInitializer`](crate::SingletonInitializer):
//! reads are a single acquire load, writers serialize on the gate's lock.
//!
//! A component that writes a `Once` from `initialize` must do so only after
//! everything that can fail, or it cannot take part in a retried
//! initialization. State captured early belongs in an overwritable slot, as
//! [`SingletonOption`](crate::SingletonOption) does.

use core::cell::UnsafeCell;
use core::{fmt, mem};

use crate::state::Gate;

/// A thread-safe cell which can be written to only once.
pub struct Once<T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   gate: Gate,
}

impl<T> Once<T> {
   /// Creates a new, empty cell.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         gate: Gate::new(),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
      }
   }

   /// Creates a cell that already holds `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         gate: Gate::set(),
         value: UnsafeCell::new(mem::MaybeUninit::new(value)),
      }
   }

   /// Checks whether the cell holds a value. Never blocks.
   #[inline]
   pub fn is_done(&self) -> bool {
      self.gate.is_set()
   }

   /// Returns the value if the cell has been written. Never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_done() {
         // SAFETY: the gate is set, so the value was written and published.
         Some(unsafe { (*self.value.get()).assume_init_ref() })
      } else {
         None
      }
   }

   /// Writes `value`, blocking while another thread is writing.
   ///
   /// Returns `Err(value)` if the cell was already written.
   pub fn set(&self, value: T) -> Result<(), T> {
      let Some(guard) = self.gate.lock() else {
         return Err(value);
      };
      // SAFETY: the lock gives exclusive access to the slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }

   /// Writes `value` without blocking.
   ///
   /// Returns `Err(value)` if the cell is written or being written.
   pub fn try_set(&self, value: T) -> Result<(), T> {
      let Ok(Some(guard)) = self.gate.try_lock() else {
         return Err(value);
      };
      // SAFETY: the lock gives exclusive access to the slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }

   /// Returns the value, computing it with `f` if the cell is empty.
   ///
   /// Concurrent callers block until the single running `f` finishes.
   pub fn get_or_init<F>(&self, f: F) -> &T
   where
      F: FnOnce() -> T,
   {
      match self.get_or_try_init(|| Ok::<T, core::convert::Infallible>(f())) {
         Ok(value) => value,
         Err(never) => match never {},
      }
   }

   /// Returns the value, computing it with the fallible `f` if the cell is empty.
   ///
   /// On `Err` the cell stays empty and a later call may try again.
   pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.try_initialize(f)?;
      debug_assert!(self.is_done());
      // SAFETY: `try_initialize` returned Ok, so the gate is set.
      Ok(unsafe { (*self.value.get()).assume_init_ref() })
   }

   #[cold]
   fn try_initialize<F, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      let Some(guard) = self.gate.lock() else {
         return Ok(());
      };
      // On error the guard drops and the cell goes back to empty.
      let value = f()?;
      // SAFETY: the lock gives exclusive access to the slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }
}

// SAFETY: readers on other threads get `&T` (needs `T: Sync`) and the value may
// be written on one thread and dropped on another (needs `T: Send`).
unsafe impl<T: Sync + Send> Sync for Once<T> {}
// SAFETY: moving the cell moves the `T` it owns.
unsafe impl<T: Send> Send for Once<T> {}

impl<T> Default for Once<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T: fmt::Debug> fmt::Debug for Once<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Once");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}

impl<T> Drop for Once<T> {
   #[inline]
   fn drop(&mut self) {
      if self.is_done() {
         // SAFETY: the cell is written and we have exclusive access.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
