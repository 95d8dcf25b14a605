#![no_main]

use libfuzzer_sys::fuzz_target;
use overflow_lru::OverflowLruCache;
use std::sync::Arc;

// Fuzz scoped limit raises
//
// Interleaves ensure_space_limit and reset_space_limit with puts and removals
// of the raising parents. Once every parent is gone the limit must be back at
// its base value.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let base = usize::from(data[0] % 16) + 1;
    let mut cache: OverflowLruCache<u8, u8> = OverflowLruCache::with_overflow_budget(base, 0);
    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 5;
        let key = data[idx + 1] % 16;

        match op {
            0 => {
                cache.put(key, Arc::new(key));
            }
            1 => {
                let before = cache.space_limit();
                let required = before + usize::from(data[idx + 1] >> 4) + 1;
                if cache.ensure_space_limit(&key, required) {
                    assert_eq!(cache.space_limit(), required);
                    assert!(cache.raised_limit_for(&key).is_some());
                } else {
                    assert_eq!(cache.space_limit(), before);
                }
            }
            2 => {
                cache.reset_space_limit(&key);
                assert!(cache.raised_limit_for(&key).is_none());
            }
            3 => {
                cache.remove_key(&key);
                assert!(cache.raised_limit_for(&key).is_none());
            }
            4 => {
                let _ = cache.get(&key);
            }
            _ => unreachable!(),
        }

        assert_eq!(cache.space_limit(), base + cache.total_raised());
        if let Err(err) = cache.check_invariants() {
            panic!("{err}");
        }
        idx += 2;
    }

    cache.flush();
    assert_eq!(cache.space_limit(), base);
    assert_eq!(cache.total_raised(), 0);
});
