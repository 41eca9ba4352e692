#![cfg(feature = "async-tokio-mt")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use singleton_gate::{BoundInitializer, ComponentSet, SingletonComponent, SingletonInitializer};

#[derive(Debug, Clone, PartialEq)]
struct Cfg {
   region: &'static str,
}

#[derive(Default)]
struct Counting {
   inits: AtomicUsize,
   validations: AtomicUsize,
   failures_left: AtomicUsize,
}

impl SingletonComponent<Cfg, String> for Counting {
   fn initialize(&self, config: &Cfg) -> Result<(), String> {
      self.inits.fetch_add(1, Ordering::SeqCst);
      // Long enough for other tasks to pile up on the lock
      thread::sleep(Duration::from_millis(20));
      if self.failures_left.load(Ordering::SeqCst) > 0 {
         self.failures_left.fetch_sub(1, Ordering::SeqCst);
         return Err(format!("{} unavailable", config.region));
      }
      Ok(())
   }

   fn validate(&self, _config: &Cfg) -> Result<(), String> {
      self.validations.fetch_add(1, Ordering::SeqCst);
      Ok(())
   }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_initialize_once() {
   let component = Arc::new(Counting::default());
   let registry = Arc::new(vec![
      Arc::clone(&component) as singleton_gate::SharedComponent<Cfg, String>
   ]);
   let init = Arc::new(SingletonInitializer::new());

   let tasks: Vec<_> = (0..16)
      .map(|_| {
         let registry = Arc::clone(&registry);
         let init = Arc::clone(&init);
         tokio::spawn(async move {
            let cfg = Cfg { region: "eu" };
            init.ensure_initialized_async(&*registry, &cfg).await
         })
      })
      .collect();

   for task in tasks {
      assert_eq!(task.await.unwrap(), Ok(()));
   }
   assert!(init.is_initialized());
   assert_eq!(component.inits.load(Ordering::SeqCst), 1);
   assert_eq!(component.validations.load(Ordering::SeqCst), 16);
}

#[tokio::test]
async fn test_async_retry_after_failure() {
   let bound = BoundInitializer::new(ComponentSet::new().with(Counting {
      failures_left: AtomicUsize::new(1),
      ..Default::default()
   }));
   let cfg = Cfg { region: "us" };

   assert_eq!(
      bound.ensure_initialized_and_valid_async(&cfg).await,
      Err("us unavailable".to_string())
   );
   assert!(!bound.is_initialized());
   assert_eq!(bound.ensure_initialized_and_valid_async(&cfg).await, Ok(()));
   assert!(bound.is_initialized());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_and_blocking_callers_share_the_gate() {
   let component = Arc::new(Counting::default());
   let registry = Arc::new(vec![
      Arc::clone(&component) as singleton_gate::SharedComponent<Cfg, String>
   ]);
   let init = Arc::new(SingletonInitializer::new());

   let blocking = {
      let registry = Arc::clone(&registry);
      let init = Arc::clone(&init);
      thread::spawn(move || init.ensure_initialized(&*registry, &Cfg { region: "ap" }))
   };
   let asynchronous = {
      let registry = Arc::clone(&registry);
      let init = Arc::clone(&init);
      tokio::spawn(async move { init.ensure_initialized_async(&*registry, &Cfg { region: "ap" }).await })
   };

   assert_eq!(asynchronous.await.unwrap(), Ok(()));
   assert_eq!(blocking.join().unwrap(), Ok(()));
   assert_eq!(component.inits.load(Ordering::SeqCst), 1);
   assert_eq!(component.validations.load(Ordering::SeqCst), 2);
}
