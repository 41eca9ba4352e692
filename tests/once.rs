use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use singleton_gate::Once;

#[test]
fn test_new_is_not_done() {
   let once: Once<i32> = Once::new();
   assert!(!once.is_done());
   assert_eq!(once.get(), None);
}

#[test]
fn test_with_value_is_done() {
   let once = Once::with_value(42);
   assert!(once.is_done());
   assert_eq!(once.get(), Some(&42));
}

#[test]
fn test_set() {
   let once: Once<i32> = Once::new();
   assert_eq!(once.set(42), Ok(()));
   assert!(once.is_done());

   // Second set is refused and the first value stays
   assert_eq!(once.set(24), Err(24));
   assert_eq!(once.get(), Some(&42));
}

#[test]
fn test_try_set_while_initializing() {
   // The initializing closure holds the lock, so try_set cannot get in.
   let once: Once<i32> = Once::new();
   once.get_or_init(|| {
      assert!(matches!(once.try_set(44), Err(44)));
      42
   });
   assert_eq!(once.get(), Some(&42));
   assert_eq!(once.try_set(7), Err(7));
}

#[test]
fn test_try_set_and_set_report_alike() {
   let once: Once<i32> = Once::new();
   assert_eq!(once.try_set(1), Ok(()));
   assert_eq!(once.set(2), Err(2));

   let other: Once<i32> = Once::new();
   assert_eq!(other.set(1), Ok(()));
   assert_eq!(other.try_set(2), Err(2));
   assert_eq!((once.get(), other.get()), (Some(&1), Some(&1)));
}

#[test]
fn test_get_or_init_runs_once() {
   let once: Once<i32> = Once::new();
   let counter = AtomicUsize::new(0);
   let value = once.get_or_init(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      42
   });
   assert_eq!(value, &42);

   let value = once.get_or_init(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      panic!("Should not be called")
   });
   assert_eq!(value, &42);
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_get_or_try_init_retries_after_error() {
   let once: Once<i32> = Once::new();
   let counter = AtomicUsize::new(0);

   let result = once.get_or_try_init(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      Err::<i32, _>("init error")
   });
   assert_eq!(result, Err("init error"));
   assert!(!once.is_done());

   let result = once.get_or_try_init(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok::<_, &str>(55)
   });
   assert_eq!(result, Ok(&55));
   assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_panic_in_initializer_leaves_cell_empty() {
   let once = Arc::new(Once::<String>::new());
   let once_clone = Arc::clone(&once);
   let result = thread::spawn(move || {
      once_clone.get_or_init(|| panic!("initializer panicked"));
   })
   .join();
   assert!(result.is_err());
   assert!(!once.is_done());
   assert_eq!(once.get_or_init(|| "recovered".to_string()), "recovered");
}

#[test]
fn test_multi_thread_get_or_init() {
   let once = Arc::new(Once::new());
   let init_counter = Arc::new(AtomicUsize::new(0));
   let threads: Vec<_> = (0..10)
      .map(|_| {
         let once_clone = Arc::clone(&once);
         let counter_clone = Arc::clone(&init_counter);
         thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            *once_clone.get_or_init(|| {
               counter_clone.fetch_add(1, Ordering::SeqCst);
               thread::sleep(Duration::from_millis(20));
               42
            })
         })
      })
      .collect();

   for handle in threads {
      assert_eq!(handle.join().unwrap(), 42);
   }
   assert_eq!(init_counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_multi_thread_set_race() {
   let once = Arc::new(Once::new());
   let successes = Arc::new(AtomicUsize::new(0));
   let threads: Vec<_> = (0..10)
      .map(|i| {
         let once_clone = Arc::clone(&once);
         let successes_clone = Arc::clone(&successes);
         thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            if once_clone.set(i).is_ok() {
               successes_clone.fetch_add(1, Ordering::SeqCst);
            }
         })
      })
      .collect();

   for handle in threads {
      handle.join().unwrap();
   }
   assert_eq!(successes.load(Ordering::SeqCst), 1);
   assert!(once.get().is_some());
}

#[test]
fn test_drop_runs_value_destructor() {
   struct Tracked(Arc<AtomicUsize>);
   impl Drop for Tracked {
      fn drop(&mut self) {
         self.0.fetch_add(1, Ordering::SeqCst);
      }
   }

   let drops = Arc::new(AtomicUsize::new(0));
   {
      let once = Once::new();
      assert!(once.set(Tracked(Arc::clone(&drops))).is_ok());
      if let Err(rejected) = once.set(Tracked(Arc::clone(&drops))) {
         drop(rejected);
      }
      assert_eq!(drops.load(Ordering::SeqCst), 1);
   }
   assert_eq!(drops.load(Ordering::SeqCst), 2);

   // Empty cells drop nothing
   let empty: Once<Tracked> = Once::new();
   drop(empty);
   assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn test_debug() {
   let once: Once<i32> = Once::new();
   assert_eq!(format!("{once:?}"), "Once(<uninit>)");
   once.set(3).unwrap();
   assert_eq!(format!("{once:?}"), "Once(3)");
}
