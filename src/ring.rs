use rust_decimal::Decimal;

use std::collections::VecDeque;

/// Fixed-capacity ring that evicts its oldest element on overflow.
///
/// Index 0 is the oldest retained element; [`recent`](RingBuffer::recent)
/// counts from the newest end. Changing the capacity always clears the
/// buffer: a resized window never tries to preserve partial history.
#[derive(Clone, Debug, PartialEq)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a ring with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "ring capacity must be at least 1");
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `value`, returning the evicted oldest element when full.
    #[inline]
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.buf.len() == self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(value);
        evicted
    }

    /// Element count, `<=` capacity.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether the ring holds `capacity` elements.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Element by age: `get(0)` is the oldest retained element.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.buf.get(index)
    }

    /// Element by recency: `recent(0)` is the newest element.
    #[inline]
    #[must_use]
    pub fn recent(&self, index: usize) -> Option<&T> {
        self.buf.len().checked_sub(index + 1).and_then(|i| self.buf.get(i))
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    /// Replaces the capacity, clearing all contents.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn set_capacity(&mut self, capacity: usize) {
        assert!(capacity >= 1, "ring capacity must be at least 1");
        self.buf.clear();
        self.capacity = capacity;
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Rolling scalar window with pluggable incremental aggregates.
///
/// Tracks whichever of sum / max / min were requested at construction.
/// [`push_stat`](StatWindow::push_stat) performs the push and the
/// aggregate maintenance in one step: O(1) per push, except when the
/// evicted element ties the tracked extreme, which forces one full
/// rescan of the window. Aggregates therefore always equal a direct
/// scan over the current contents.
///
/// The `preview_*` family computes "as if `candidate` were the next
/// committed element" overlays without mutating anything: the window
/// with its oldest element rotated out (when full) and the candidate
/// appended.
#[derive(Clone, Debug)]
pub struct StatWindow {
    ring: RingBuffer<Decimal>,
    track_sum: bool,
    track_max: bool,
    track_min: bool,
    sum: Decimal,
    max: Option<Decimal>,
    min: Option<Decimal>,
}

impl StatWindow {
    /// Window with no aggregates tracked.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            track_sum: false,
            track_max: false,
            track_min: false,
            sum: Decimal::ZERO,
            max: None,
            min: None,
        }
    }

    /// Enables the running-sum aggregate.
    #[must_use]
    pub fn with_sum(mut self) -> Self {
        self.track_sum = true;
        self
    }

    /// Enables the running-max aggregate.
    #[must_use]
    pub fn with_max(mut self) -> Self {
        self.track_max = true;
        self
    }

    /// Enables the running-min aggregate.
    #[must_use]
    pub fn with_min(mut self) -> Self {
        self.track_min = true;
        self
    }

    /// Pushes `value` and maintains every tracked aggregate.
    pub fn push_stat(&mut self, value: Decimal) {
        let evicted = self.ring.push(value);

        if let Some(old) = evicted {
            if self.track_sum {
                self.sum -= old;
            }
            // Evicting the tracked extreme invalidates it; rescan once.
            if self.track_max && self.max == Some(old) {
                self.max = self.ring.iter().copied().max();
            } else if self.track_max {
                self.max = self.max.map(|m| m.max(value)).or(Some(value));
            }
            if self.track_min && self.min == Some(old) {
                self.min = self.ring.iter().copied().min();
            } else if self.track_min {
                self.min = self.min.map(|m| m.min(value)).or(Some(value));
            }
        } else {
            if self.track_max {
                self.max = self.max.map(|m| m.max(value)).or(Some(value));
            }
            if self.track_min {
                self.min = self.min.map(|m| m.min(value)).or(Some(value));
            }
        }

        if self.track_sum {
            self.sum += value;
        }
    }

    /// Running sum of the current contents.
    ///
    /// # Panics
    ///
    /// Panics if the sum aggregate was not requested at construction.
    #[inline]
    #[must_use]
    pub fn sum(&self) -> Decimal {
        assert!(self.track_sum, "sum is not tracked by this window");
        self.sum
    }

    /// Largest element currently in the window, `None` when empty.
    ///
    /// # Panics
    ///
    /// Panics if the max aggregate was not requested at construction.
    #[inline]
    #[must_use]
    pub fn max(&self) -> Option<Decimal> {
        assert!(self.track_max, "max is not tracked by this window");
        self.max
    }

    /// Smallest element currently in the window, `None` when empty.
    ///
    /// # Panics
    ///
    /// Panics if the min aggregate was not requested at construction.
    #[inline]
    #[must_use]
    pub fn min(&self) -> Option<Decimal> {
        assert!(self.track_min, "min is not tracked by this window");
        self.min
    }

    /// Sum as if `candidate` were pushed next; commits nothing.
    ///
    /// # Panics
    ///
    /// Panics if the sum aggregate was not requested at construction.
    #[must_use]
    pub fn preview_sum(&self, candidate: Decimal) -> Decimal {
        assert!(self.track_sum, "sum is not tracked by this window");
        let mut sum = self.sum;
        if self.ring.is_full() {
            sum -= *self
                .ring
                .get(0)
                .expect("a full window holds at least one element");
        }
        sum + candidate
    }

    /// Max as if `candidate` were pushed next; commits nothing.
    #[must_use]
    pub fn preview_max(&self, candidate: Decimal) -> Decimal {
        self.preview_iter(candidate)
            .max()
            .expect("preview window always contains the candidate")
    }

    /// Min as if `candidate` were pushed next; commits nothing.
    #[must_use]
    pub fn preview_min(&self, candidate: Decimal) -> Decimal {
        self.preview_iter(candidate)
            .min()
            .expect("preview window always contains the candidate")
    }

    /// The window contents as if `candidate` were pushed next: oldest
    /// element rotated out when full, candidate appended last.
    pub fn preview_iter(&self, candidate: Decimal) -> impl Iterator<Item = Decimal> + '_ {
        let rotate = usize::from(self.ring.is_full());
        self.ring
            .iter()
            .copied()
            .skip(rotate)
            .chain(std::iter::once(candidate))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Element by age: `get(0)` is the oldest retained element.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Decimal> {
        self.ring.get(index).copied()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.ring.iter().copied()
    }

    /// Replaces the capacity, clearing contents and aggregates.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.ring.set_capacity(capacity);
        self.reset_aggregates();
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.reset_aggregates();
    }

    fn reset_aggregates(&mut self) {
        self.sum = Decimal::ZERO;
        self.max = None;
        self.min = None;
    }
}
