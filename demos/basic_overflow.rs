//! Walkthrough of refusable eviction, the overflow budget and limit raises.
//!
//! Run with: RUST_LOG=overflow_lru=debug cargo run --example basic_overflow

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use overflow_lru::builder::CacheBuilder;
use overflow_lru::stats::StatsRecorder;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overflow_lru=debug,basic_overflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Documents that are open in an editor refuse release.
    let open: Rc<RefCell<HashSet<&'static str>>> = Rc::new(RefCell::new(HashSet::new()));
    let busy = Rc::clone(&open);

    let mut cache = CacheBuilder::new(100)
        .overflow_budget(30)
        .eviction_headroom(0.1)
        .cost_fn(|text: &String| text.len())
        .evictor(move |name: &&'static str, _text: &String| !busy.borrow().contains(name))
        .build::<&'static str, String>();

    println!("1. Weighted puts");
    cache.put("readme", Arc::new("r".repeat(40)));
    cache.put("notes", Arc::new("n".repeat(40)));
    println!("   {}", cache);

    println!("2. Busy entries refuse release");
    open.borrow_mut().insert("readme");
    open.borrow_mut().insert("notes");
    cache.put("draft", Arc::new("d".repeat(40)));
    println!(
        "   draft cached? {} (overflow {} of budget {})",
        cache.contains(&"draft"),
        cache.overflow(),
        cache.overflow_budget()
    );

    cache.put("huge", Arc::new("h".repeat(40)));
    println!("   huge cached? {} (budget exhausted)", cache.contains(&"huge"));

    println!("3. Overflow drains once entries accept");
    open.borrow_mut().clear();
    cache.put("later", Arc::new("l".repeat(10)));
    println!("   keys {:?}, overflow {}", cache.keys(), cache.overflow());

    println!("4. Scoped limit raise");
    cache.put("project", Arc::new("p".repeat(5)));
    cache.ensure_space_limit(&"project", 300);
    for chapter in ["ch1", "ch2", "ch3", "ch4", "ch5"] {
        cache.put(chapter, Arc::new("c".repeat(50)));
    }
    info!(limit = cache.space_limit(), len = cache.len(), "children loaded under raise");
    cache.remove_key(&"project");
    println!(
        "   limit back to {}, space {}",
        cache.space_limit(),
        cache.current_space()
    );

    println!("5. Staleness report");
    let mut stats = StatsRecorder::new();
    stats.snapshot(&cache);
    print!("{}", stats.print_stats(&cache));
}
