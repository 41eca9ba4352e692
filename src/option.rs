//! Components that pin one configuration value for the process lifetime.
//!
//! A [`SingletonOption`] projects a value out of the configuration.
//! `initialize` captures it; every `validate` projects again and rejects a
//! configuration whose value differs from the captured one.
//!
//! `initialize` overwrites whatever an earlier, abandoned initialization
//! attempt captured, so a registry whose later component failed can be
//! initialized again from scratch.

use std::borrow::Cow;
use std::fmt;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::component::SingletonComponent;
use crate::error::OptionError;

type Projection<C, T> = Box<dyn Fn(&C) -> T + Send + Sync>;

/// Singleton component fixing the value `project(config)` at initialization.
///
/// ```
/// use singleton_gate::{ComponentSet, OptionError, SingletonInitializer, SingletonOption};
///
/// struct Options {
///    detailed_errors: bool,
/// }
///
/// let registry = ComponentSet::<Options, OptionError>::new()
///    .with(SingletonOption::new("detailed_errors", |o: &Options| o.detailed_errors));
/// let init = SingletonInitializer::new();
///
/// init.ensure_initialized(&registry, &Options { detailed_errors: true }).unwrap();
/// let err = init
///    .ensure_initialized(&registry, &Options { detailed_errors: false })
///    .unwrap_err();
/// assert!(matches!(err, OptionError::Changed { .. }));
/// ```
pub struct SingletonOption<C: ?Sized, T> {
   name: Cow<'static, str>,
   project: Projection<C, T>,
   fixed: RwLock<Option<T>>,
}

impl<C: ?Sized, T> SingletonOption<C, T> {
   pub fn new<F>(name: impl Into<Cow<'static, str>>, project: F) -> Self
   where
      F: Fn(&C) -> T + Send + Sync + 'static,
   {
      Self {
         name: name.into(),
         project: Box::new(project),
         fixed: RwLock::new(None),
      }
   }

   #[inline]
   pub fn option_name(&self) -> &str {
      &self.name
   }

   /// The captured value, once initialized.
   ///
   /// Holds a read lock on the slot while the returned guard lives.
   pub fn value(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
      RwLockReadGuard::try_map(self.fixed.read(), |slot| slot.as_ref()).ok()
   }
}

impl<C, T, E> SingletonComponent<C, E> for SingletonOption<C, T>
where
   C: ?Sized,
   T: PartialEq + fmt::Debug + Send + Sync,
   E: From<OptionError>,
{
   fn initialize(&self, config: &C) -> Result<(), E> {
      // Project outside the lock; the closure is user code.
      let value = (self.project)(config);
      *self.fixed.write() = Some(value);
      Ok(())
   }

   fn validate(&self, config: &C) -> Result<(), E> {
      let supplied = (self.project)(config);
      let slot = self.fixed.read();
      let fixed = slot.as_ref().ok_or_else(|| OptionError::NotInitialized {
         option: self.name.to_string(),
      })?;
      if *fixed != supplied {
         return Err(OptionError::Changed {
            option: self.name.to_string(),
            fixed: format!("{fixed:?}"),
            supplied: format!("{supplied:?}"),
         }
         .into());
      }
      Ok(())
   }

   fn name(&self) -> &str {
      &self.name
   }
}

impl<C: ?Sized, T: fmt::Debug> fmt::Debug for SingletonOption<C, T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("SingletonOption")
         .field("name", &self.name)
         .field("fixed", &*self.fixed.read())
         .finish()
   }
}
