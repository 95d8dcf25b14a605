#![no_main]

use libfuzzer_sys::fuzz_target;
use overflow_lru::OverflowLruCache;
use std::sync::Arc;

// Fuzz arbitrary operation sequences on OverflowLruCache
//
// Keys with the high bit set refuse release. Covers put, get, peek,
// remove_key, set_space_limit, set_overflow_budget and flush, checking the
// full invariant set after every step.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let limit = usize::from(data[0] % 32);
    let budget = usize::from(data[1] % 8);
    let mut cache = OverflowLruCache::with_capabilities(
        limit,
        budget,
        |value: &u8| usize::from(*value % 5),
        |key: &u8, _value: &u8| key & 0x80 == 0,
    );

    let mut idx = 2;
    while idx + 1 < data.len() {
        let op = data[idx] % 8;
        let arg = data[idx + 1];

        match op {
            0 | 1 => {
                let cost = usize::from(arg % 5);
                let limit = cache.space_limit();
                let returned = cache.put(arg, Arc::new(arg));
                assert_eq!(*returned, arg);
                if cost > limit {
                    assert!(!cache.contains(&arg));
                } else if cache.contains(&arg) {
                    assert_eq!(cache.cost_of(&arg), Some(cost));
                    assert_eq!(cache.keys().first(), Some(&arg));
                }
            }
            2 => {
                let counter = cache.timestamp_counter();
                if let Some(value) = cache.get(&arg) {
                    assert_eq!(*value, arg);
                    assert_eq!(cache.keys().first(), Some(&arg));
                    assert!(cache.timestamp_counter() > counter);
                }
            }
            3 => {
                let before = cache.keys();
                let _ = cache.peek(&arg);
                assert_eq!(cache.keys(), before);
            }
            4 => {
                let was_present = cache.contains(&arg);
                assert_eq!(cache.remove_key(&arg).is_some(), was_present);
                assert!(!cache.contains(&arg));
            }
            5 => {
                cache.set_space_limit(usize::from(arg % 32));
            }
            6 => {
                cache.set_overflow_budget(usize::from(arg % 8));
            }
            7 => {
                if arg % 16 == 0 {
                    cache.flush();
                    assert!(cache.is_empty());
                    assert_eq!(cache.current_space(), 0);
                }
            }
            _ => unreachable!(),
        }

        if let Err(err) = cache.check_invariants() {
            panic!("{err}");
        }
        idx += 2;
    }
});
