//! Fixed-length history of inter-beat intervals.

/// Ring of the most recent intervals, in milliseconds.
///
/// Writing into a full history evicts the oldest interval. The average is
/// taken only over intervals that were actually written, so a partially
/// filled history is not dragged towards zero.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalHistory<const N: usize> {
    buffer: [u64; N],
    pointer: usize,
    len: usize,
}

impl<const N: usize> Default for IntervalHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> IntervalHistory<N> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: [0; N],
            pointer: 0,
            len: 0,
        }
    }

    pub fn write(&mut self, interval: u64) {
        self.buffer[self.pointer] = interval;
        self.pointer = (self.pointer + 1) % N;
        self.len = usize::min(self.len + 1, N);
    }

    /// Fill every slot with the given interval.
    pub fn seed(&mut self, interval: u64) {
        self.buffer = [interval; N];
        self.pointer = 0;
        self.len = N;
    }

    pub fn reset(&mut self) {
        self.buffer = [0; N];
        self.pointer = 0;
        self.len = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Iterate stored intervals from the oldest to the newest.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        let start = (self.pointer + N - self.len) % N;
        (0..self.len).map(move |i| self.buffer[(start + i) % N])
    }

    /// Mean of the stored intervals, `None` while nothing was written.
    #[must_use]
    pub fn average(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let sum: u64 = self.iter().sum();
        Some(sum as f32 / self.len as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[test]
    fn when_nothing_was_written_it_has_no_average() {
        let history: IntervalHistory<4> = IntervalHistory::new();
        assert!(history.is_empty());
        assert!(history.average().is_none());
        assert_eq!(history.iter().next(), None);
    }

    #[test]
    fn when_partially_filled_it_averages_only_written_intervals() {
        let mut history: IntervalHistory<4> = IntervalHistory::new();
        history.write(600);
        history.write(800);
        assert_eq!(history.len(), 2);
        assert_relative_eq!(history.average().unwrap(), 700.0);
    }

    #[test]
    fn when_written_past_capacity_it_evicts_the_oldest() {
        let mut history: IntervalHistory<10> = IntervalHistory::new();
        for interval in 1..=11 {
            history.write(interval * 100);
        }
        assert_eq!(history.len(), 10);
        assert_eq!(
            history.iter().collect::<Vec<_>>(),
            (2..=11).map(|i| i * 100).collect::<Vec<_>>()
        );
        assert_relative_eq!(history.average().unwrap(), 650.0);
    }

    #[test]
    fn when_seeded_every_slot_holds_the_interval() {
        let mut history: IntervalHistory<10> = IntervalHistory::new();
        history.write(300);
        history.seed(800);
        assert!(history.is_full());
        assert!(history.iter().all(|interval| interval == 800));
        assert_relative_eq!(history.average().unwrap(), 800.0);

        history.write(600);
        assert_eq!(history.iter().next(), Some(800));
        assert_eq!(history.iter().last(), Some(600));
        assert_relative_eq!(history.average().unwrap(), 780.0);
    }

    #[test]
    fn when_reset_it_forgets_all_intervals() {
        let mut history: IntervalHistory<4> = IntervalHistory::new();
        history.seed(500);
        history.reset();
        assert!(history.is_empty());
        assert!(history.average().is_none());
    }
}
