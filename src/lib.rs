//! Exactly-once initialization of configuration-derived singleton components.
//!
//! Runtimes hosting pluggable singleton components often need those components
//! to derive state from the first configuration they see, and then to refuse
//! any later configuration that disagrees with it. This crate provides the
//! coordinator for that pattern:
//!
//! - [`SingletonInitializer`]: a one-shot gate. The first caller runs
//!   `initialize` on every component; every caller runs `validate` on every
//!   component.
//! - [`SingletonComponent`] / [`Registry`]: the capability implemented by
//!   components and the lookup that supplies them.
//! - [`SingletonOption`]: a ready-made component pinning one configuration
//!   value.
//! - [`Once<T>`]: the write-once cell components use for their fixed state.
//!
//! The gate is a single atomic with acquire/release ordering, so the fast path
//! after initialization is lock-free. Contended initialization parks on
//! `parking_lot`'s futex-based queues.
//!
//! # Features
//!
//! - **At-most-once**: `initialize` runs once per component, however many
//!   threads race.
//! - **Retry after failure**: a failed or panicking initialization leaves the
//!   gate unset; the next call starts over.
//! - **Fail-fast validation**: the first `validate` error stops the call.
//! - **Async support**: `ensure_initialized_async` with the `async-tokio*`
//!   features.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use singleton_gate::{ComponentSet, Once, SingletonComponent, SingletonInitializer};
//!
//! struct Options {
//!    max_batch: usize,
//! }
//!
//! #[derive(Default)]
//! struct BatchPlanner {
//!    max_batch: Once<usize>,
//!    validations: AtomicUsize,
//! }
//!
//! impl SingletonComponent<Options, String> for BatchPlanner {
//!    fn initialize(&self, config: &Options) -> Result<(), String> {
//!       self.max_batch.set(config.max_batch).map_err(|_| "initialized twice".to_string())
//!    }
//!
//!    fn validate(&self, config: &Options) -> Result<(), String> {
//!       self.validations.fetch_add(1, Ordering::Relaxed);
//!       match self.max_batch.get() {
//!          Some(&fixed) if fixed == config.max_batch => Ok(()),
//!          _ => Err(format!("max_batch changed to {}", config.max_batch)),
//!       }
//!    }
//! }
//!
//! static INIT: SingletonInitializer = SingletonInitializer::new();
//!
//! let registry = ComponentSet::new().with(BatchPlanner::default());
//! INIT.ensure_initialized(&registry, &Options { max_batch: 64 }).unwrap();
//! INIT.ensure_initialized(&registry, &Options { max_batch: 64 }).unwrap();
//! assert!(INIT.ensure_initialized(&registry, &Options { max_batch: 32 }).is_err());
//! ```

/// Singleton component capability and registries.
mod component;

/// Errors of the bundled option components.
mod error;

/// Initialization coordinator.
mod initializer;

/// Write-once cell.
mod once;

/// Components pinning a single configuration value.
mod option;

/// Internal gate state machine.
mod state;

pub use component::{ComponentSet, Registry, SharedComponent, SingletonComponent};
pub use error::OptionError;
pub use initializer::{BoundInitializer, SingletonInitializer};
pub use once::Once;
pub use option::SingletonOption;
