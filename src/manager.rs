use parking_lot::Mutex;
use rust_decimal::Decimal;

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Weak};

use crate::{Candle, Indicator, IndicatorId, IndicatorValue, Timestamp};

/// An indicator shared between its owner and the manager.
pub type SharedIndicator = Arc<Mutex<dyn Indicator>>;

/// Identity of a sample source.
///
/// The manager only needs to tell sources apart: equal keys mean the
/// same source, and (indicator, source) pairs deduplicate on it.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SourceKey(String);

impl SourceKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for SourceKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sample pushed by a source.
///
/// Preview by default, like [`IndicatorValue`];
/// [`into_final`](Self::into_final) commits it. Only final samples are
/// buffered for replay — previews are transient by definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    data: SampleData,
    time: Timestamp,
    is_final: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum SampleData {
    Scalar(Decimal),
    Candle(Candle),
    Pair(Decimal, Decimal),
}

impl Sample {
    /// Scalar tick.
    #[must_use]
    pub fn scalar(value: Decimal, time: Timestamp) -> Self {
        Self {
            data: SampleData::Scalar(value),
            time,
            is_final: false,
        }
    }

    /// Candle bar; the sample time is the bar's.
    #[must_use]
    pub fn candle(candle: Candle) -> Self {
        Self {
            time: candle.time,
            data: SampleData::Candle(candle),
            is_final: false,
        }
    }

    /// Scalar pair.
    #[must_use]
    pub fn pair(first: Decimal, second: Decimal, time: Timestamp) -> Self {
        Self {
            data: SampleData::Pair(first, second),
            time,
            is_final: false,
        }
    }

    /// Marks the sample as final.
    #[must_use]
    pub fn into_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> Timestamp {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    fn to_value(&self, indicator: IndicatorId) -> IndicatorValue {
        let value = match &self.data {
            SampleData::Scalar(value) => IndicatorValue::scalar(indicator, *value, self.time),
            SampleData::Candle(candle) => IndicatorValue::candle(indicator, *candle),
            SampleData::Pair(first, second) => {
                IndicatorValue::pair(indicator, *first, *second, self.time)
            }
        };
        if self.is_final {
            value.into_final()
        } else {
            value
        }
    }
}

/// Identity of an (indicator, source) registration.
///
/// Registering an equal pair again yields an equal token backed by the
/// same arena slot; the slot's reference count tracks how many
/// registrations share it.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct RegistrationToken {
    slot: usize,
    indicator: IndicatorId,
    source: SourceKey,
}

impl RegistrationToken {
    #[must_use]
    pub fn indicator(&self) -> IndicatorId {
        self.indicator
    }

    #[must_use]
    pub fn source(&self) -> &SourceKey {
        &self.source
    }
}

struct TokenSlot {
    indicator: SharedIndicator,
    indicator_id: IndicatorId,
    source: SourceKey,
    refcount: usize,
    order: u64,
}

type BatchFn = Box<dyn FnMut(&SourceKey, &Sample) + Send>;

struct ManagerInner {
    slots: Vec<Option<TokenSlot>>,
    free: Vec<usize>,
    index: HashMap<(IndicatorId, SourceKey), usize>,
    buffers: HashMap<SourceKey, Vec<Sample>>,
    batch_watchers: Vec<(u64, BatchFn)>,
    next_order: u64,
    next_watcher: u64,
}

impl ManagerInner {
    fn slot_for(&mut self, token: &RegistrationToken) -> &mut TokenSlot {
        let slot = self
            .slots
            .get_mut(token.slot)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("token for {} is no longer active", token.indicator));
        assert!(
            slot.indicator_id == token.indicator && slot.source == token.source,
            "token for {} is no longer active",
            token.indicator
        );
        slot
    }

    fn alloc(&mut self, slot: TokenSlot) -> usize {
        if let Some(index) = self.free.pop() {
            self.slots[index] = Some(slot);
            index
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }
}

/// Removes its batch watcher when dropped.
///
/// Returned by [`IndicatorManager::watch_batches`]; dropping the guard
/// is the only way to unsubscribe.
#[must_use = "dropping the guard immediately unsubscribes the watcher"]
pub struct BatchGuard {
    inner: Weak<Mutex<ManagerInner>>,
    id: u64,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().batch_watchers.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Multiplexes indicators over shared sample sources.
///
/// Tracks (indicator, source) registrations in an arena of
/// reference-counted token slots with a hash index for dedup. A source
/// pushes through [`push`](Self::push): the sample fans out to every
/// indicator registered against that source in registration order,
/// final samples are buffered, and batch watchers are notified once
/// per push.
///
/// A late registration replays the source's buffered final samples
/// through the new indicator before the token becomes visible, so the
/// indicator is fully caught up before any live sample reaches it.
/// The interior mutex serializes registration, teardown and pushes;
/// register and unregister racing on the same pair always observe a
/// consistent reference count.
///
/// # Example
///
/// ```
/// use tideflow_ta::{Indicator, IndicatorManager, Sample, Sma};
/// use parking_lot::Mutex;
/// use rust_decimal::Decimal;
/// use std::sync::Arc;
///
/// let manager = IndicatorManager::new();
/// let sma: Arc<Mutex<dyn Indicator>> = Arc::new(Mutex::new(Sma::new(2)));
///
/// let token = manager.register(&sma, "BTCUSD@1m");
/// for (t, price) in [(1, 10), (2, 20)] {
///     manager.push("BTCUSD@1m", Sample::scalar(Decimal::from(price), t).into_final());
/// }
///
/// assert_eq!(
///     sma.lock().history().current().unwrap().to_decimal(),
///     Decimal::from(15),
/// );
/// manager.unregister(&token);
/// ```
pub struct IndicatorManager {
    inner: Arc<Mutex<ManagerInner>>,
}

impl Default for IndicatorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManagerInner {
                slots: Vec::new(),
                free: Vec::new(),
                index: HashMap::new(),
                buffers: HashMap::new(),
                batch_watchers: Vec::new(),
                next_order: 0,
                next_watcher: 0,
            })),
        }
    }

    /// Registers `indicator` against `source`.
    ///
    /// First registration of the pair subscribes it and replays every
    /// buffered final sample from that source through the indicator in
    /// arrival order. Registering an equal pair again only increments
    /// the shared slot's reference count and returns an equal token.
    pub fn register(
        &self,
        indicator: &SharedIndicator,
        source: impl Into<SourceKey>,
    ) -> RegistrationToken {
        let source = source.into();
        let indicator_id = indicator.lock().id();
        let mut inner = self.inner.lock();

        if let Some(&slot) = inner.index.get(&(indicator_id, source.clone())) {
            let entry = inner.slots[slot]
                .as_mut()
                .expect("indexed slots are always live");
            entry.refcount += 1;
            tracing::trace!(%indicator_id, %source, refcount = entry.refcount, "shared registration");
            return RegistrationToken {
                slot,
                indicator: indicator_id,
                source,
            };
        }

        // Catch the newcomer up before the token becomes visible to
        // pushes; the lock keeps live samples out until replay is done.
        if let Some(buffered) = inner.buffers.get(&source) {
            let mut target = indicator.lock();
            for sample in buffered {
                target.process(&sample.to_value(indicator_id));
            }
            tracing::debug!(%indicator_id, %source, replayed = buffered.len(), "replayed history");
        }

        let order = inner.next_order;
        inner.next_order += 1;
        let slot = inner.alloc(TokenSlot {
            indicator: Arc::clone(indicator),
            indicator_id,
            source: source.clone(),
            refcount: 1,
            order,
        });
        inner.index.insert((indicator_id, source.clone()), slot);
        tracing::debug!(%indicator_id, %source, "registered");

        RegistrationToken {
            slot,
            indicator: indicator_id,
            source,
        }
    }

    /// Releases one registration of `token`.
    ///
    /// When the last registration goes, the pair is unsubscribed and
    /// the indicator's committed history is purged.
    ///
    /// # Panics
    ///
    /// Panics when the token was already fully unregistered — a
    /// release without a matching registration is a caller bug.
    pub fn unregister(&self, token: &RegistrationToken) {
        let mut inner = self.inner.lock();
        let slot = inner.slot_for(token);
        slot.refcount -= 1;

        if slot.refcount == 0 {
            let indicator = Arc::clone(&slot.indicator);
            inner.slots[token.slot] = None;
            inner.free.push(token.slot);
            inner.index.remove(&(token.indicator, token.source.clone()));
            indicator.lock().core_mut().clear_history();
            tracing::debug!(indicator_id = %token.indicator, source = %token.source, "torn down");
        } else {
            tracing::trace!(
                indicator_id = %token.indicator,
                source = %token.source,
                "released shared registration"
            );
        }
    }

    /// Whether `token` still has at least one live registration.
    #[must_use]
    pub fn is_active(&self, token: &RegistrationToken) -> bool {
        let inner = self.inner.lock();
        inner
            .slots
            .get(token.slot)
            .and_then(Option::as_ref)
            .is_some_and(|slot| {
                slot.indicator_id == token.indicator && slot.source == token.source
            })
    }

    /// Delivers `sample` from `source` to every indicator registered
    /// against it, in registration order, then notifies batch watchers.
    ///
    /// Final samples are appended to the source's replay buffer first.
    pub fn push(&self, source: impl Into<SourceKey>, sample: Sample) {
        let source = source.into();
        let mut inner = self.inner.lock();

        if sample.is_final {
            inner
                .buffers
                .entry(source.clone())
                .or_default()
                .push(sample.clone());
        }

        let mut targets: Vec<(u64, IndicatorId, SharedIndicator)> = inner
            .slots
            .iter()
            .flatten()
            .filter(|slot| slot.source == source)
            .map(|slot| (slot.order, slot.indicator_id, Arc::clone(&slot.indicator)))
            .collect();
        targets.sort_by_key(|(order, ..)| *order);

        for (_, indicator_id, indicator) in targets {
            indicator.lock().process(&sample.to_value(indicator_id));
        }

        for (_, watcher) in &mut inner.batch_watchers {
            watcher(&source, &sample);
        }
    }

    /// Registers a callback invoked after every [`push`](Self::push),
    /// keyed by source. The returned guard unsubscribes on drop.
    ///
    /// The callback runs while the manager is locked; it must not call
    /// back into the manager.
    pub fn watch_batches(
        &self,
        watcher: impl FnMut(&SourceKey, &Sample) + Send + 'static,
    ) -> BatchGuard {
        let mut inner = self.inner.lock();
        inner.next_watcher += 1;
        let id = inner.next_watcher;
        inner.batch_watchers.push((id, Box::new(watcher)));
        BatchGuard {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of final samples buffered for `source`.
    #[must_use]
    pub fn buffered(&self, source: impl Into<SourceKey>) -> usize {
        let source = source.into();
        self.inner
            .lock()
            .buffers
            .get(&source)
            .map_or(0, Vec::len)
    }

    /// Drops `source`'s replay buffer and resets every indicator
    /// registered against it.
    pub fn reset_source(&self, source: impl Into<SourceKey>) {
        let source = source.into();
        let mut inner = self.inner.lock();
        inner.buffers.remove(&source);

        let targets: Vec<SharedIndicator> = inner
            .slots
            .iter()
            .flatten()
            .filter(|slot| slot.source == source)
            .map(|slot| Arc::clone(&slot.indicator))
            .collect();

        for indicator in targets {
            indicator.lock().reset();
        }
        tracing::debug!(%source, "source reset");
    }
}
