// ==============================================
// EXTENDIBLE HASH TABLE INVARIANT TESTS (integration)
// ==============================================
//
// Exercises the table through its public surface and checks the structural
// invariants after every step: the directory is always 2^global_depth slots,
// every bucket is shared by exactly 2^(global_depth - local_depth) of them,
// and the table behaves as a plain map regardless of splits.

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use framekit::index::extendible::ExtendibleHashTable;

/// Hasher whose output is the raw integer key; lets tests place keys into
/// chosen directory slots by picking their low bits.
#[derive(Default)]
struct TransparentHasher {
    state: u64,
}

impl Hasher for TransparentHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate().take(8) {
            self.state |= u64::from(*byte) << (8 * i);
        }
    }

    fn write_u64(&mut self, value: u64) {
        self.state = value;
    }
}

type TransparentBuild = BuildHasherDefault<TransparentHasher>;

mod map_semantics {
    use super::*;

    #[test]
    fn table_mirrors_a_reference_map_under_random_ops() {
        let mut rng = StdRng::seed_from_u64(0xf0cacc1a);
        let mut table: ExtendibleHashTable<u64, u64> = ExtendibleHashTable::new(3);
        let mut reference: HashMap<u64, u64> = HashMap::new();

        for step in 0..20_000u64 {
            let key = rng.gen_range(0..512u64);
            match rng.gen_range(0..10) {
                0..=5 => {
                    assert_eq!(table.insert(key, step), reference.insert(key, step));
                }
                6..=7 => {
                    assert_eq!(table.remove(&key), reference.remove(&key));
                }
                _ => {
                    assert_eq!(table.get(&key), reference.get(&key));
                }
            }
            assert_eq!(table.len(), reference.len());
        }

        table.check_invariants().unwrap();
        for (key, value) in &reference {
            assert_eq!(table.get(key), Some(value));
        }
    }

    #[test]
    fn insert_find_round_trip_survives_growth() {
        let mut table: ExtendibleHashTable<u64, String> = ExtendibleHashTable::new(2);
        for key in 0..1_000u64 {
            table.insert(key, format!("value-{key}"));
            assert_eq!(table.get(&key), Some(&format!("value-{key}")));
        }
        table.check_invariants().unwrap();
        assert_eq!(table.len(), 1_000);
    }
}

mod directory_structure {
    use super::*;

    #[test]
    fn depth_accounting_after_every_insert() {
        let mut table: ExtendibleHashTable<u64, u64, TransparentBuild> =
            ExtendibleHashTable::with_hasher(2, TransparentBuild::default());

        for key in 0..128u64 {
            table.insert(key, key);

            // |directory| == 2^global_depth, checked along with reference
            // counts and hash-prefix agreement.
            table.check_invariants().unwrap();
            assert!(table.global_depth() >= table.local_depth(0));
        }
    }

    #[test]
    fn colliding_keys_cascade_directory_doubling() {
        // 0, 4 and 8 agree on their low two bits; a two-entry bucket needs
        // depth 3 before 0/8 and 4 separate.
        let mut table: ExtendibleHashTable<u64, &str, TransparentBuild> =
            ExtendibleHashTable::with_hasher(2, TransparentBuild::default());
        table.insert(0, "a");
        table.insert(4, "b");
        table.insert(8, "c");

        assert_eq!(table.global_depth(), 3);
        assert_eq!(table.num_buckets(), 4);
        assert_eq!(table.get(&0), Some(&"a"));
        assert_eq!(table.get(&4), Some(&"b"));
        assert_eq!(table.get(&8), Some(&"c"));
        table.check_invariants().unwrap();
    }

    #[test]
    fn num_buckets_counts_only_reachable_buckets() {
        let mut table: ExtendibleHashTable<u64, u64, TransparentBuild> =
            ExtendibleHashTable::with_hasher(1, TransparentBuild::default());
        assert_eq!(table.num_buckets(), 1);

        table.insert(0, 0);
        table.insert(1, 1);
        assert_eq!(table.num_buckets(), 2);

        table.insert(2, 2);
        assert_eq!(table.num_buckets(), 3);
        table.check_invariants().unwrap();
    }

    #[test]
    fn removal_changes_contents_not_shape() {
        let mut table: ExtendibleHashTable<u64, u64, TransparentBuild> =
            ExtendibleHashTable::with_hasher(2, TransparentBuild::default());
        for key in 0..64u64 {
            table.insert(key, key);
        }
        let shape = (table.global_depth(), table.num_buckets());

        for key in (0..64u64).filter(|k| k % 2 == 0) {
            assert_eq!(table.remove(&key), Some(key));
        }
        assert_eq!((table.global_depth(), table.num_buckets()), shape);
        assert_eq!(table.len(), 32);
        table.check_invariants().unwrap();
    }
}

mod instantiations {
    use std::sync::Arc;

    use super::*;

    // Stand-in for the page object the buffer pool would hand out.
    #[derive(Debug, Clone, PartialEq)]
    struct PageHandle {
        page_id: u64,
        dirty: bool,
    }

    #[test]
    fn page_id_to_page_handle() {
        let mut table: ExtendibleHashTable<u64, Arc<PageHandle>> = ExtendibleHashTable::new(4);
        for page_id in 0..32u64 {
            table.insert(
                page_id,
                Arc::new(PageHandle {
                    page_id,
                    dirty: false,
                }),
            );
        }
        assert_eq!(table.get(&11).unwrap().page_id, 11);
        table.check_invariants().unwrap();
    }

    #[test]
    fn handle_to_slot_cursor() {
        // Free-list bookkeeping: a handle keyed to its position in a list.
        let mut table: ExtendibleHashTable<usize, usize> = ExtendibleHashTable::new(4);
        for slot in 0..16usize {
            table.insert(slot * 7, slot);
        }
        assert_eq!(table.get(&21), Some(&3));
    }

    #[test]
    fn int_to_string_and_int_to_int() {
        let mut names: ExtendibleHashTable<i32, String> = ExtendibleHashTable::new(2);
        names.insert(-3, "negative".to_string());
        names.insert(3, "positive".to_string());
        assert_eq!(names.get(&-3).map(String::as_str), Some("negative"));

        let mut counts: ExtendibleHashTable<i32, i32> = ExtendibleHashTable::new(2);
        for i in 0..100 {
            counts.insert(i, i * i);
        }
        assert_eq!(counts.get(&9), Some(&81));
        counts.check_invariants().unwrap();
    }
}
