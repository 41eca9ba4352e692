use std::sync::Arc;

use singleton_gate::{BoundInitializer, ComponentSet, OptionError, SingletonOption};
use tracing_subscriber::EnvFilter;

struct Options {
   tenant: String,
}

#[tokio::main]
async fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .init();

   let init: Arc<BoundInitializer<ComponentSet<Options, OptionError>>> = Arc::new(BoundInitializer::new(
      ComponentSet::new().with(SingletonOption::new("tenant", |o: &Options| o.tenant.clone())),
   ));

   let tasks: Vec<_> = (0..5)
      .map(|i| {
         let init = Arc::clone(&init);
         tokio::spawn(async move {
            let options = Options { tenant: "acme".to_string() };
            init.ensure_initialized_and_valid_async(&options).await?;
            println!("Task {i} ready");
            Ok::<_, OptionError>(())
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap().unwrap();
   }
   assert!(init.is_initialized());

   let other = Options { tenant: "globex".to_string() };
   match init.ensure_initialized_and_valid_async(&other).await {
      Ok(()) => panic!("tenant change must be rejected"),
      Err(e) => println!("Rejected: {e}"),
   }
}
