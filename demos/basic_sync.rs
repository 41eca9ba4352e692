use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use singleton_gate::{ComponentSet, OptionError, SingletonInitializer, SingletonOption};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct SessionOptions {
   pool_size: usize,
   detailed_errors: bool,
}

static INIT: SingletonInitializer = SingletonInitializer::new();
static SESSIONS: AtomicUsize = AtomicUsize::new(0);

fn open_session(registry: &ComponentSet<SessionOptions, OptionError>, options: &SessionOptions) -> Result<usize, OptionError> {
   INIT.ensure_initialized(registry, options)?;
   Ok(SESSIONS.fetch_add(1, Ordering::Relaxed))
}

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .init();

   let registry = Arc::new(
      ComponentSet::new()
         .with(SingletonOption::new("pool_size", |o: &SessionOptions| o.pool_size))
         .with(SingletonOption::new("detailed_errors", |o: &SessionOptions| o.detailed_errors)),
   );
   let options = SessionOptions { pool_size: 16, detailed_errors: true };

   let threads: Vec<_> = (0..5)
      .map(|_| {
         let registry = Arc::clone(&registry);
         let options = options.clone();
         std::thread::spawn(move || open_session(&registry, &options))
      })
      .collect();

   for t in threads {
      let id = t.join().unwrap().unwrap();
      println!("Opened session {id}");
   }
   assert!(INIT.is_initialized());

   // Same singletons, incompatible options.
   let changed = SessionOptions { pool_size: 32, ..options };
   match open_session(&registry, &changed) {
      Ok(_) => panic!("pool size change must be rejected"),
      Err(e) => println!("Rejected: {e}"),
   }
}
