//! Latest BPM shared between the sampling thread and its readers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Lock-free view of the most recently published BPM.
///
/// Clones share the same cell. The value is stored as the bit pattern of an
/// `f32` so a reader never observes a torn write.
#[derive(Debug, Clone, Default)]
pub struct BpmReader {
    bits: Arc<AtomicU32>,
}

impl BpmReader {
    /// The last published value, or 0 when there is none.
    #[must_use]
    pub fn bpm(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub(crate) fn publish(&self, bpm: f32) {
        self.bits.store(bpm.to_bits(), Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.publish(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_created_it_reads_zero() {
        assert_relative_eq!(BpmReader::default().bpm(), 0.0);
    }

    #[test]
    fn when_published_all_clones_observe_it() {
        let cell = BpmReader::default();
        let reader = cell.clone();
        cell.publish(72.5);
        assert_relative_eq!(reader.bpm(), 72.5);
        cell.reset();
        assert_relative_eq!(reader.bpm(), 0.0);
    }

    #[test]
    fn when_read_from_other_threads_it_is_never_torn() {
        let cell = BpmReader::default();
        let reader = cell.clone();
        let handle = std::thread::spawn(move || {
            for _ in 0..10_000 {
                let bpm = reader.bpm();
                assert!(bpm == 0.0 || bpm == 61.0 || bpm == 123.25);
            }
        });
        for i in 0..10_000 {
            cell.publish(if i % 2 == 0 { 61.0 } else { 123.25 });
        }
        handle.join().unwrap();
    }
}
