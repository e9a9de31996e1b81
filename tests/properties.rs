//! Property tests for construction order and dispatch order.

use std::sync::{Arc, Mutex};

use onion::{BoxedHandler, BoxedMiddleware, Context, Error, Middleware, Next, Onion, middleware};
use proptest::prelude::*;
use serde_json::{Value, json};

/// A layer that appends its name to a shared log on the way in and on the
/// way out.
struct Named {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl Middleware<Value> for Named {
    fn handler(&self) -> BoxedHandler<Value> {
        let name = self.name.clone();
        let log = Arc::clone(&self.log);
        onion::boxed_handler(move |cx: Context<Value>, next: Next<Value>| {
            let name = name.clone();
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name}>"));
                cx.update(|c| {
                    let n = c["counter"].as_i64().unwrap_or(0);
                    c["counter"] = json!(n + 1);
                });
                next.run().await?;
                log.lock().unwrap().push(format!("<{name}"));
                Ok::<_, Error>(())
            }
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn arb_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}", 0..12)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// Property: construction stores layers in the order given.
    #[test]
    fn proptest_construction_preserves_order(names in arb_names()) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let layers: Vec<BoxedMiddleware<Value>> = names
            .iter()
            .map(|name| middleware::boxed(Named { name: name.clone(), log: Arc::clone(&log) }))
            .collect();

        let onion = Onion::with_middlewares(layers);
        let stored: Vec<&str> = onion.middlewares().iter().map(|m| m.name()).collect();

        prop_assert_eq!(stored, names.iter().map(String::as_str).collect::<Vec<_>>());
    }

    /// Property: every layer runs exactly once, in order on the way in and in
    /// reverse on the way out.
    #[test]
    fn proptest_dispatch_is_a_strict_onion(names in arb_names(), start in -1000_i64..1000) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut onion = Onion::<Value>::new();
        for name in &names {
            onion.use_middleware(Named { name: name.clone(), log: Arc::clone(&log) });
        }

        let out = runtime().block_on(onion.execute(&json!({ "counter": start }))).unwrap();

        let expected: Vec<String> = names
            .iter()
            .map(|n| format!("{n}>"))
            .chain(names.iter().rev().map(|n| format!("<{n}")))
            .collect();
        prop_assert_eq!(out, json!({ "counter": start + names.len() as i64 }));
        prop_assert_eq!(&*log.lock().unwrap(), &expected);
    }

    /// Property: a rejected registration never changes the list.
    #[test]
    fn proptest_rejected_use_keeps_the_list(len in 0_usize..6, junk in any::<i64>()) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut onion = Onion::with_middlewares((0..len).map(|i| {
            middleware::boxed(Named { name: i.to_string(), log: Arc::clone(&log) })
        }));

        prop_assert!(onion.try_use(&junk).is_err());
        prop_assert_eq!(onion.len(), len);
    }
}
