use rust_decimal::Decimal;

use std::cell::Cell;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::{Candle, History, IndicatorError, IndicatorValue, Settings, Timestamp};

/// Process-unique indicator identity.
///
/// Assigned at construction, never reused. Composite results and
/// registration tokens key on it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct IndicatorId(u64);

impl IndicatorId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for IndicatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "indicator#{}", self.0)
    }
}

/// Handle for a registered change or reset callback.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ListenerId(u64);

type ChangeFn = Box<dyn FnMut(&IndicatorValue, &IndicatorValue) + Send>;
type ResetFn = Box<dyn FnMut() + Send>;

/// State shared by every indicator: identity, display name, the
/// formation latch, committed history, and notification listeners.
///
/// Concrete indicators embed one of these and hand it out through
/// [`Indicator::core`] / [`Indicator::core_mut`]; the provided driver
/// methods on [`Indicator`] do the rest.
pub struct IndicatorCore {
    id: IndicatorId,
    name: String,
    formed: Cell<bool>,
    history: History,
    change_listeners: Vec<(ListenerId, ChangeFn)>,
    reset_listeners: Vec<(ListenerId, ResetFn)>,
    next_listener: u64,
}

impl IndicatorCore {
    /// Core with the default history capacity.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or whitespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_history_capacity(name, DEFAULT_HISTORY_CAPACITY)
    }

    /// Core retaining at most `capacity` committed (input, result) pairs.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or `name` is empty.
    #[must_use]
    pub fn with_history_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let name = name.into();
        assert!(!name.trim().is_empty(), "indicator name must not be empty");
        Self {
            id: IndicatorId::next(),
            name,
            formed: Cell::new(false),
            history: History::new(capacity),
            change_listeners: Vec::new(),
            reset_listeners: Vec::new(),
            next_listener: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> IndicatorId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the display name.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::EmptyName`] when `name` is empty or whitespace;
    /// the previous name is kept.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), IndicatorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IndicatorError::EmptyName);
        }
        self.name = name;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Registers a callback invoked with (input, result) for every
    /// non-empty result, preview or final.
    pub fn watch_change(
        &mut self,
        listener: impl FnMut(&IndicatorValue, &IndicatorValue) + Send + 'static,
    ) -> ListenerId {
        let id = self.next_listener_id();
        self.change_listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a change callback; returns whether it was registered.
    pub fn unwatch_change(&mut self, id: ListenerId) -> bool {
        let before = self.change_listeners.len();
        self.change_listeners.retain(|(lid, _)| *lid != id);
        self.change_listeners.len() != before
    }

    /// Registers a callback invoked after every reset.
    pub fn watch_reset(&mut self, listener: impl FnMut() + Send + 'static) -> ListenerId {
        let id = self.next_listener_id();
        self.reset_listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a reset callback; returns whether it was registered.
    pub fn unwatch_reset(&mut self, id: ListenerId) -> bool {
        let before = self.reset_listeners.len();
        self.reset_listeners.retain(|(lid, _)| *lid != id);
        self.reset_listeners.len() != before
    }

    fn next_listener_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }

    pub(crate) fn formed_latched(&self) -> bool {
        self.formed.get()
    }

    pub(crate) fn latch_formed(&self) {
        self.formed.set(true);
    }

    pub(crate) fn push_history(&mut self, input: IndicatorValue, result: IndicatorValue) {
        self.history.push(input, result);
    }

    pub(crate) fn clear_history(&mut self) {
        self.history.clear();
    }

    pub(crate) fn clear_core(&mut self) {
        self.formed.set(false);
        self.history.clear();
    }

    pub(crate) fn notify_change(&mut self, input: &IndicatorValue, result: &IndicatorValue) {
        for (_, listener) in &mut self.change_listeners {
            listener(input, result);
        }
    }

    pub(crate) fn notify_reset(&mut self) {
        for (_, listener) in &mut self.reset_listeners {
            listener();
        }
    }
}

impl std::fmt::Debug for IndicatorCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("formed", &self.formed.get())
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

/// Re-entrancy guard threaded through a reset cascade.
///
/// Each indicator enters the scope once; a second visit in the same
/// cascade is a no-op. The scope lives on the call chain, never in
/// ambient state, so overlapping cascades cannot interfere.
#[derive(Debug, Default)]
pub struct ResetScope {
    visited: Vec<IndicatorId>,
}

impl ResetScope {
    /// Marks `id` visited; returns `false` when it already was.
    pub fn enter(&mut self, id: IndicatorId) -> bool {
        if self.visited.contains(&id) {
            false
        } else {
            self.visited.push(id);
            true
        }
    }
}

/// A streaming, stateful transform over time-ordered samples.
///
/// Implementations supply the transform ([`calc`](Indicator::calc)),
/// the formation predicate, a state-clearing hook, and persistence;
/// the provided methods drive the shared lifecycle:
///
/// - [`process`](Indicator::process) wraps `calc` with the engine
///   contract — empty inputs short-circuit, result ownership is
///   checked, finality propagates, committed pairs land in history,
///   non-empty results notify change listeners.
/// - [`reset`](Indicator::reset) clears the formation latch, history
///   and subclass state, then cascades to owned children through a
///   [`ResetScope`].
/// - [`is_formed`](Indicator::is_formed) evaluates the predicate
///   lazily and latches once true; only a reset clears it.
///
/// # Dual-mode evaluation
///
/// `calc` sees the input's [`is_final`](IndicatorValue::is_final) flag
/// and keeps two paths: the final path commits to buffers and
/// accumulators, the preview path computes the same answer from a
/// non-mutating overlay. Committed state must come out identical no
/// matter how many previews ran in between.
///
/// # Example
///
/// ```
/// use tideflow_ta::{Indicator, Sma};
/// use rust_decimal::Decimal;
///
/// let mut sma = Sma::new(2);
/// sma.process_scalar(Decimal::from(10), 1, true);
/// sma.process_scalar(Decimal::from(20), 2, true);
///
/// // Preview: "what if the next close were 40?" — nothing commits.
/// let preview = sma.process_scalar(Decimal::from(40), 3, false);
/// assert_eq!(preview.to_decimal(), Decimal::from(30));
///
/// let committed = sma.process_scalar(Decimal::from(60), 3, true);
/// assert_eq!(committed.to_decimal(), Decimal::from(40));
/// ```
pub trait Indicator: Send {
    /// Shared lifecycle state.
    fn core(&self) -> &IndicatorCore;

    /// Shared lifecycle state, mutable.
    fn core_mut(&mut self) -> &mut IndicatorCore;

    /// Exact number of final samples required before formation.
    fn num_values_to_initialize(&self) -> usize;

    /// The transform. Never called with an empty input; must return a
    /// value owned by this indicator.
    fn calc(&mut self, input: &IndicatorValue) -> IndicatorValue;

    /// Formation predicate, evaluated only while still unformed.
    fn calc_is_formed(&self) -> bool;

    /// Clears subclass state (buffers, seeds); the driver has already
    /// cleared the formation latch and history when this runs.
    fn clear_state(&mut self);

    /// Cascades a reset into owned children. Leaf indicators keep the
    /// default no-op.
    fn reset_children(&mut self, scope: &mut ResetScope) {
        let _ = scope;
    }

    /// Writes every configuration property into `settings`.
    fn save(&self, settings: &mut Settings);

    /// Restores configuration from `settings` through the validated
    /// setters, then resets.
    ///
    /// # Errors
    ///
    /// Propagates missing or invalid settings; state is untouched on
    /// error.
    fn load(&mut self, settings: &Settings) -> Result<(), IndicatorError>;

    /// The indicator's identity.
    fn id(&self) -> IndicatorId {
        self.core().id()
    }

    /// Display name.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Replaces the display name.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::EmptyName`] when `name` is empty or whitespace.
    fn set_name(&mut self, name: String) -> Result<(), IndicatorError> {
        self.core_mut().set_name(name)
    }

    /// Committed (input, result) pairs, most recent first.
    fn history(&self) -> &History {
        self.core().history()
    }

    /// Whether enough history has accumulated for meaningful output.
    ///
    /// Latched: once `true` it stays `true` until [`reset`](Self::reset).
    fn is_formed(&self) -> bool {
        if self.core().formed_latched() {
            return true;
        }
        let formed = self.calc_is_formed();
        if formed {
            self.core().latch_formed();
        }
        formed
    }

    /// Runs the transform on `input` under the engine contract.
    ///
    /// Empty inputs return an empty result without invoking the
    /// transform. Only a final input commits: its (input, result) pair
    /// is appended to history and the result is stamped final. Every
    /// non-empty result notifies change listeners, preview or not.
    ///
    /// # Panics
    ///
    /// Panics when the transform returns a value owned by a different
    /// indicator.
    fn process(&mut self, input: &IndicatorValue) -> IndicatorValue {
        if input.is_empty() {
            let mut result = IndicatorValue::empty(self.id(), input.time());
            result.stamp_final(input.is_final());
            result.stamp_formed(self.is_formed());
            return result;
        }

        let mut result = self.calc(input);
        assert_eq!(
            result.indicator(),
            self.id(),
            "calc returned a value owned by a different indicator"
        );

        result.stamp_final(input.is_final());
        result.stamp_formed(self.is_formed());
        result.link_input(input.clone());

        if input.is_final() {
            let input = input.clone();
            let committed = result.clone();
            self.core_mut().push_history(input, committed);
        }
        if !result.is_empty() {
            self.core_mut().notify_change(input, &result);
        }

        result
    }

    /// Convenience: wraps a scalar into an input value and processes it.
    fn process_scalar(
        &mut self,
        value: Decimal,
        time: Timestamp,
        is_final: bool,
    ) -> IndicatorValue {
        let mut input = IndicatorValue::scalar(self.id(), value, time);
        if is_final {
            input = input.into_final();
        }
        self.process(&input)
    }

    /// Convenience: wraps a candle into an input value and processes it.
    fn process_candle(&mut self, candle: Candle, is_final: bool) -> IndicatorValue {
        let mut input = IndicatorValue::candle(self.id(), candle);
        if is_final {
            input = input.into_final();
        }
        self.process(&input)
    }

    /// Convenience: wraps a scalar pair into an input value and
    /// processes it.
    fn process_pair(
        &mut self,
        first: Decimal,
        second: Decimal,
        time: Timestamp,
        is_final: bool,
    ) -> IndicatorValue {
        let mut input = IndicatorValue::pair(self.id(), first, second, time);
        if is_final {
            input = input.into_final();
        }
        self.process(&input)
    }

    /// Clears all accumulated state and notifies reset listeners,
    /// cascading through owned children.
    fn reset(&mut self) {
        let mut scope = ResetScope::default();
        self.reset_in(&mut scope);
    }

    /// Reset step inside an ongoing cascade; re-entry is a no-op.
    fn reset_in(&mut self, scope: &mut ResetScope) {
        if !scope.enter(self.id()) {
            return;
        }
        tracing::trace!(indicator = %self.core().name(), "reset");
        self.core_mut().clear_core();
        self.clear_state();
        self.reset_children(scope);
        self.core_mut().notify_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    /// Doubles its input once it has seen `length` final samples.
    struct Doubler {
        core: IndicatorCore,
        length: usize,
        seen: usize,
    }

    impl Doubler {
        fn new(length: usize) -> Self {
            Self {
                core: IndicatorCore::new("Doubler"),
                length,
                seen: 0,
            }
        }
    }

    impl Indicator for Doubler {
        fn core(&self) -> &IndicatorCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut IndicatorCore {
            &mut self.core
        }

        fn num_values_to_initialize(&self) -> usize {
            self.length
        }

        fn calc(&mut self, input: &IndicatorValue) -> IndicatorValue {
            if input.is_final() {
                self.seen += 1;
            }
            if self.calc_is_formed() {
                IndicatorValue::scalar(self.id(), input.to_decimal() * dec!(2), input.time())
            } else {
                IndicatorValue::empty(self.id(), input.time())
            }
        }

        fn calc_is_formed(&self) -> bool {
            self.seen >= self.length
        }

        fn clear_state(&mut self) {
            self.seen = 0;
        }

        fn save(&self, settings: &mut Settings) {
            settings.put("length", &self.length);
        }

        fn load(&mut self, settings: &Settings) -> Result<(), IndicatorError> {
            self.length = settings.get("length")?;
            self.reset();
            Ok(())
        }
    }

    /// Returns values owned by somebody else.
    struct Disowned {
        core: IndicatorCore,
        other: IndicatorId,
    }

    impl Indicator for Disowned {
        fn core(&self) -> &IndicatorCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut IndicatorCore {
            &mut self.core
        }
        fn num_values_to_initialize(&self) -> usize {
            1
        }
        fn calc(&mut self, input: &IndicatorValue) -> IndicatorValue {
            IndicatorValue::scalar(self.other, input.to_decimal(), input.time())
        }
        fn calc_is_formed(&self) -> bool {
            true
        }
        fn clear_state(&mut self) {}
        fn save(&self, _settings: &mut Settings) {}
        fn load(&mut self, _settings: &Settings) -> Result<(), IndicatorError> {
            Ok(())
        }
    }

    mod process_contract {
        use super::*;

        #[test]
        fn empty_input_short_circuits() {
            let mut ind = Doubler::new(1);
            let input = IndicatorValue::empty(ind.id(), 1).into_final();
            let result = ind.process(&input);

            assert!(result.is_empty());
            assert_eq!(ind.seen, 0, "transform must not run on empty input");
            assert!(ind.history().is_empty(), "empty inputs never commit");
        }

        #[test]
        fn final_input_commits_to_history() {
            let mut ind = Doubler::new(1);
            ind.process_scalar(dec!(3), 1, true);

            assert_eq!(ind.history().len(), 1);
            let (input, result) = ind.history().at(0);
            assert_eq!(input.to_decimal(), dec!(3));
            assert_eq!(result.to_decimal(), dec!(6));
            assert!(result.is_final());
        }

        #[test]
        fn preview_input_does_not_commit() {
            let mut ind = Doubler::new(0);
            let result = ind.process_scalar(dec!(3), 1, false);

            assert_eq!(result.to_decimal(), dec!(6));
            assert!(!result.is_final());
            assert!(ind.history().is_empty());
        }

        #[test]
        fn result_links_its_input() {
            let mut ind = Doubler::new(1);
            let result = ind.process_scalar(dec!(3), 7, true);
            let input = result.input().expect("result must carry provenance");
            assert_eq!(input.to_decimal(), dec!(3));
            assert_eq!(input.time(), 7);
        }

        #[test]
        fn result_snapshots_formation() {
            let mut ind = Doubler::new(2);
            let unformed = ind.process_scalar(dec!(1), 1, true);
            assert!(!unformed.is_formed());

            let formed = ind.process_scalar(dec!(2), 2, true);
            assert!(formed.is_formed());
        }

        #[test]
        #[should_panic(expected = "owned by a different indicator")]
        fn disowned_result_is_a_bug() {
            let other = IndicatorCore::new("other");
            let mut ind = Disowned {
                core: IndicatorCore::new("Disowned"),
                other: other.id(),
            };
            let _ = ind.process_scalar(dec!(1), 1, true);
        }
    }

    mod notifications {
        use super::*;

        #[test]
        fn change_fires_for_non_empty_results_only() {
            let hits = Arc::new(AtomicUsize::new(0));
            let mut ind = Doubler::new(2);
            let count = Arc::clone(&hits);
            ind.core_mut().watch_change(move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
            });

            ind.process_scalar(dec!(1), 1, true); // warming up: empty result
            assert_eq!(hits.load(Ordering::SeqCst), 0);

            ind.process_scalar(dec!(2), 2, true); // formed
            ind.process_scalar(dec!(3), 3, false); // preview also notifies
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }

        #[test]
        fn unwatch_change_stops_delivery() {
            let hits = Arc::new(AtomicUsize::new(0));
            let mut ind = Doubler::new(0);
            let count = Arc::clone(&hits);
            let listener = ind.core_mut().watch_change(move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
            });

            ind.process_scalar(dec!(1), 1, true);
            assert!(ind.core_mut().unwatch_change(listener));
            ind.process_scalar(dec!(2), 2, true);
            assert_eq!(hits.load(Ordering::SeqCst), 1);

            assert!(!ind.core_mut().unwatch_change(listener));
        }

        #[test]
        fn reset_notifies() {
            let hits = Arc::new(AtomicUsize::new(0));
            let mut ind = Doubler::new(1);
            let count = Arc::clone(&hits);
            ind.core_mut().watch_reset(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });

            ind.reset();
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }
    }

    mod formation {
        use super::*;

        #[test]
        fn latched_once_true() {
            let mut ind = Doubler::new(2);
            assert!(!ind.is_formed());
            ind.process_scalar(dec!(1), 1, true);
            ind.process_scalar(dec!(2), 2, true);
            assert!(ind.is_formed());

            // Manually regress the predicate; the latch must hold.
            ind.seen = 0;
            assert!(ind.is_formed());
        }

        #[test]
        fn previews_never_form() {
            let mut ind = Doubler::new(2);
            for i in 0..10 {
                ind.process_scalar(dec!(5), i, false);
            }
            assert!(!ind.is_formed());
        }

        #[test]
        fn reset_clears_the_latch() {
            let mut ind = Doubler::new(1);
            ind.process_scalar(dec!(1), 1, true);
            assert!(ind.is_formed());

            ind.reset();
            assert!(!ind.is_formed());
            assert!(ind.history().is_empty());
        }

        #[test]
        fn reset_twice_equals_reset_once() {
            let mut ind = Doubler::new(1);
            ind.process_scalar(dec!(1), 1, true);
            ind.reset();
            ind.reset();
            assert!(!ind.is_formed());
            assert!(ind.history().is_empty());
            assert_eq!(ind.seen, 0);
        }
    }

    mod reset_scope {
        use super::*;

        #[test]
        fn re_entry_is_a_no_op() {
            let mut ind = Doubler::new(1);
            let hits = Arc::new(AtomicUsize::new(0));
            let count = Arc::clone(&hits);
            ind.core_mut().watch_reset(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });

            let mut scope = ResetScope::default();
            ind.reset_in(&mut scope);
            ind.reset_in(&mut scope);
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn enter_reports_first_visit() {
            let mut scope = ResetScope::default();
            let id = IndicatorId::next();
            assert!(scope.enter(id));
            assert!(!scope.enter(id));
        }
    }

    mod naming {
        use super::*;

        #[test]
        fn default_and_renamed() {
            let mut ind = Doubler::new(1);
            assert_eq!(ind.name(), "Doubler");
            ind.set_name("My Doubler".into()).unwrap();
            assert_eq!(ind.name(), "My Doubler");
        }

        #[test]
        fn blank_name_is_rejected() {
            let mut ind = Doubler::new(1);
            assert_eq!(ind.set_name("  ".into()), Err(IndicatorError::EmptyName));
            assert_eq!(ind.name(), "Doubler");
        }

        #[test]
        fn ids_are_unique() {
            let a = Doubler::new(1);
            let b = Doubler::new(1);
            assert_ne!(a.id(), b.id());
        }
    }

    mod persistence {
        use super::*;

        #[test]
        fn save_load_round_trip_resets() {
            let mut ind = Doubler::new(3);
            ind.process_scalar(dec!(1), 1, true);

            let mut settings = Settings::new();
            ind.save(&mut settings);

            let mut restored = Doubler::new(1);
            restored.process_scalar(dec!(9), 1, true);
            restored.load(&settings).unwrap();

            assert_eq!(restored.length, 3);
            assert!(!restored.is_formed());
            assert!(restored.history().is_empty());
        }
    }
}
