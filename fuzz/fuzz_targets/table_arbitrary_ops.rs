#![no_main]

use libfuzzer_sys::fuzz_target;

use framekit::index::extendible::ExtendibleHashTable;

// Arbitrary op-sequence fuzzing for the extendible hash table.
//
// Interprets the input as (bucket_size, [op, key] ...) and revalidates the
// directory invariants after every step:
// - |directory| == 2^global_depth
// - every bucket referenced by exactly 2^(global_depth - local_depth) slots
// - keys stay inside their bucket's hash prefix
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let bucket_size = (data[0] % 8) as usize + 1;
    let mut table: ExtendibleHashTable<u64, u64> = ExtendibleHashTable::new(bucket_size);
    let mut expected_len = 0usize;

    for chunk in data[1..].chunks_exact(2) {
        let op = chunk[0] % 4;
        let key = u64::from(chunk[1]);

        match op {
            0 | 1 => {
                if table.insert(key, key).is_none() {
                    expected_len += 1;
                }
            }
            2 => {
                if table.remove(&key).is_some() {
                    expected_len -= 1;
                }
            }
            _ => {
                // Values always equal their key, so any hit must agree.
                if let Some(value) = table.get(&key) {
                    assert_eq!(*value, key);
                }
            }
        }

        assert_eq!(table.len(), expected_len);
        table.check_invariants().expect("table invariants violated");
    }
});
