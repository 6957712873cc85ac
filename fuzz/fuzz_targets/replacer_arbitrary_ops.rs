#![no_main]

use libfuzzer_sys::fuzz_target;

use framekit::replacer::lru_k::LrukReplacer;
use framekit::replacer::FrameId;

// Arbitrary op-sequence fuzzing for the LRU-K replacer.
//
// Interprets the input as (num_frames, k, [op, frame] ...) and revalidates
// the accounting invariants after every step:
// - size() == number of tracked frames with the evictable flag set
// - queues partition the tracked frames
// - histories stay bounded and ordered
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let num_frames = (data[0] % 32) as usize + 1;
    let k = (data[1] % 4) as usize + 1;
    let mut replacer = LrukReplacer::new(num_frames, k);

    for chunk in data[2..].chunks_exact(2) {
        let op = chunk[0] % 5;
        let frame = (chunk[1] as FrameId) % num_frames;

        match op {
            0 | 1 => replacer.record_access(frame),
            2 => replacer.set_evictable(frame, chunk[1] % 2 == 0),
            3 => {
                let before = replacer.size();
                if let Some(victim) = replacer.evict() {
                    assert_eq!(replacer.size(), before - 1);
                    assert!(!replacer.is_evictable(victim));
                } else {
                    assert_eq!(before, 0);
                }
            }
            _ => {
                let evictable = replacer.is_evictable(frame);
                match replacer.remove(frame) {
                    Ok(removed) => assert_eq!(removed, evictable),
                    Err(err) => {
                        assert!(!evictable);
                        assert_eq!(err.frame_id(), frame);
                    }
                }
            }
        }

        replacer.check_invariants().expect("replacer invariants violated");
    }
});
