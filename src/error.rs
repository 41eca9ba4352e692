//! Errors raised by the option components shipped with this crate.
//!
//! The initializer itself never creates errors; it returns whatever the
//! components return. Registries built from [`SingletonOption`](crate::SingletonOption)
//! use an error type implementing `From<OptionError>`, or `OptionError` itself.

use thiserror::Error;

/// Failure of a [`SingletonOption`](crate::SingletonOption).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionError {
   /// The configuration changes an option that was fixed when the singletons
   /// were initialized.
   #[error("option `{option}` must stay constant for the singleton components: fixed at {fixed}, supplied {supplied}")]
   Changed {
      option: String,
      /// Debug rendering of the value captured at initialization.
      fixed: String,
      /// Debug rendering of the value in the rejected configuration.
      supplied: String,
   },

   /// Validation ran before the option captured a value.
   #[error("option `{option}` validated before initialization")]
   NotInitialized { option: String },
}
