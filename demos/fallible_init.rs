use std::sync::atomic::{AtomicUsize, Ordering};

use singleton_gate::{BoundInitializer, ComponentSet, Once, SingletonComponent};
use tracing_subscriber::EnvFilter;

struct Options {
   cache_dir: &'static str,
}

/// Fails to initialize the first time, as if the cache directory was not
/// ready yet.
#[derive(Default)]
struct QueryCache {
   attempts: AtomicUsize,
   dir: Once<&'static str>,
}

impl SingletonComponent<Options, String> for QueryCache {
   fn initialize(&self, config: &Options) -> Result<(), String> {
      let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
      println!("Initializing query cache (attempt {attempt})...");
      if attempt == 1 {
         return Err(format!("{} is not ready", config.cache_dir));
      }
      self.dir.set(config.cache_dir).map_err(|_| "query cache initialized twice".to_string())
   }

   fn validate(&self, config: &Options) -> Result<(), String> {
      match self.dir.get() {
         Some(dir) if *dir == config.cache_dir => Ok(()),
         Some(dir) => Err(format!("cache dir is fixed to {dir}")),
         None => Err("query cache not initialized".to_string()),
      }
   }
}

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .init();

   let init = BoundInitializer::new(ComponentSet::new().with(QueryCache::default()));
   let options = Options { cache_dir: "/var/cache/app" };

   // First attempt fails and leaves the gate unset
   match init.ensure_initialized_and_valid(&options) {
      Ok(()) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert!(!init.is_initialized());

   // Second attempt runs initialization again and succeeds
   init.ensure_initialized_and_valid(&options).unwrap();
   assert!(init.is_initialized());

   // Later calls only validate
   init.ensure_initialized_and_valid(&options).unwrap();
   let err = init
      .ensure_initialized_and_valid(&Options { cache_dir: "/tmp" })
      .unwrap_err();
   println!("Rejected: {err}");
}
