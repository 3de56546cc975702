use std::fmt::Display;

use crate::{
    ComplexIndicator, Highest, Indicator, IndicatorCore, IndicatorError, IndicatorValue, Lowest,
    ResetScope, Settings,
};

/// Price Channel.
///
/// Parallel composite of a [`Highest`] over bar highs and a [`Lowest`]
/// over bar lows: the channel's upper and lower bounds over the last
/// `length` bars. Both children consume every input independently, so
/// one side forming never depends on the other.
pub struct PriceChannel {
    inner: ComplexIndicator,
    length: usize,
}

impl PriceChannel {
    /// Channel over `length` bars.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn new(length: usize) -> Self {
        assert!(length >= 1, "length must be at least 1");
        Self {
            inner: ComplexIndicator::parallel("PriceChannel", Self::children(length)),
            length,
        }
    }

    fn children(length: usize) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Highest::new(length)),
            Box::new(Lowest::new(length)),
        ]
    }

    /// The configured period.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Replaces the period, rebuilding both bounds and resetting.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::InvalidLength`] when `length` is zero; state is
    /// untouched.
    pub fn set_length(&mut self, length: usize) -> Result<(), IndicatorError> {
        if length == 0 {
            return Err(IndicatorError::InvalidLength(length));
        }
        self.length = length;
        self.inner.replace_children(Self::children(length));
        Ok(())
    }

    /// The upper bound (highest high).
    #[must_use]
    pub fn upper(&self) -> &dyn Indicator {
        self.inner.child(0)
    }

    /// The lower bound (lowest low).
    #[must_use]
    pub fn lower(&self) -> &dyn Indicator {
        self.inner.child(1)
    }
}

impl Indicator for PriceChannel {
    fn core(&self) -> &IndicatorCore {
        self.inner.core()
    }

    fn core_mut(&mut self) -> &mut IndicatorCore {
        self.inner.core_mut()
    }

    fn num_values_to_initialize(&self) -> usize {
        self.inner.num_values_to_initialize()
    }

    fn calc(&mut self, input: &IndicatorValue) -> IndicatorValue {
        self.inner.calc(input)
    }

    fn calc_is_formed(&self) -> bool {
        self.inner.calc_is_formed()
    }

    fn clear_state(&mut self) {
        self.inner.clear_state();
    }

    fn reset_children(&mut self, scope: &mut ResetScope) {
        self.inner.reset_children(scope);
    }

    fn save(&self, settings: &mut Settings) {
        settings.put("length", &self.length);
    }

    fn load(&mut self, settings: &Settings) -> Result<(), IndicatorError> {
        let length: usize = settings.get("length")?;
        self.set_length(length)
    }
}

impl Display for PriceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PriceChannel({})", self.length)
    }
}
