use crate::ring::RingBuffer;
use crate::IndicatorValue;

/// Default number of (input, result) pairs an indicator retains.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Bounded ring of committed (input, result) pairs.
///
/// Only final samples land here; previews never do. Lookback is by
/// recency: index 0 is the most recent pair. When the ring is full the
/// oldest pair is evicted on append.
#[derive(Debug)]
pub struct History {
    ring: RingBuffer<(IndicatorValue, IndicatorValue)>,
}

impl History {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
        }
    }

    /// The (input, result) pair `index` steps back; 0 is most recent.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<(&IndicatorValue, &IndicatorValue)> {
        self.ring.recent(index).map(|(input, result)| (input, result))
    }

    /// The (input, result) pair `index` steps back; 0 is most recent.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds; use [`get`](Self::get) for
    /// a checked lookup.
    #[must_use]
    pub fn at(&self, index: usize) -> (&IndicatorValue, &IndicatorValue) {
        self.get(index).unwrap_or_else(|| {
            panic!(
                "history index {index} out of bounds (len {len})",
                len = self.ring.len()
            )
        })
    }

    /// Most recent committed result.
    #[must_use]
    pub fn current(&self) -> Option<&IndicatorValue> {
        self.get(0).map(|(_, result)| result)
    }

    /// Oldest committed result still retained.
    #[must_use]
    pub fn first(&self) -> Option<&IndicatorValue> {
        self.ring.get(0).map(|(_, result)| result)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub(crate) fn push(&mut self, input: IndicatorValue, result: IndicatorValue) {
        self.ring.push((input, result));
    }

    pub(crate) fn clear(&mut self) {
        self.ring.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndicatorId;
    use rust_decimal_macros::dec;

    fn pair(id: IndicatorId, input: i64, result: i64, time: u64) -> (IndicatorValue, IndicatorValue) {
        (
            IndicatorValue::scalar(id, input.into(), time),
            IndicatorValue::scalar(id, result.into(), time),
        )
    }

    #[test]
    fn index_zero_is_most_recent() {
        let id = IndicatorId::next();
        let mut history = History::new(4);
        let (i1, r1) = pair(id, 1, 10, 1);
        let (i2, r2) = pair(id, 2, 20, 2);
        history.push(i1, r1);
        history.push(i2.clone(), r2.clone());

        let (input, result) = history.at(0);
        assert_eq!((input, result), (&i2, &r2));
        assert_eq!(history.at(1).1.to_decimal(), dec!(10));
    }

    #[test]
    fn current_and_first() {
        let id = IndicatorId::next();
        let mut history = History::new(4);
        assert!(history.current().is_none());

        let (i1, r1) = pair(id, 1, 10, 1);
        let (i2, r2) = pair(id, 2, 20, 2);
        history.push(i1, r1);
        history.push(i2, r2);

        assert_eq!(history.current().unwrap().to_decimal(), dec!(20));
        assert_eq!(history.first().unwrap().to_decimal(), dec!(10));
    }

    #[test]
    fn bounded_eviction() {
        let id = IndicatorId::next();
        let mut history = History::new(2);
        for n in 1..=3 {
            let (input, result) = pair(id, n, n * 10, u64::try_from(n).unwrap());
            history.push(input, result);
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.first().unwrap().to_decimal(), dec!(20));
        assert_eq!(history.current().unwrap().to_decimal(), dec!(30));
    }

    #[test]
    fn get_out_of_bounds_is_none() {
        let history = History::new(2);
        assert!(history.get(0).is_none());
    }

    #[test]
    #[should_panic(expected = "history index 5 out of bounds")]
    fn at_out_of_bounds_panics() {
        let history = History::new(2);
        let _ = history.at(5);
    }
}
