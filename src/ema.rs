use rust_decimal::Decimal;

use std::fmt::Display;

use crate::window::WindowCore;
use crate::{
    CandleField, Indicator, IndicatorCore, IndicatorError, IndicatorValue, Settings,
};

/// Exponential Moving Average.
///
/// Seeded with the SMA of the first `length` committed samples, then
/// runs recursively with `α = 2 / (length + 1)`:
///
/// ```text
/// EMA = α × value + (1 − α) × prev_EMA
/// ```
///
/// After seeding no window is needed; previews recompute from the
/// committed previous EMA without advancing it, so any number of
/// previews between two final samples leaves the series unchanged.
///
/// # Example
///
/// ```
/// use tideflow_ta::{Ema, Indicator};
/// use rust_decimal::Decimal;
///
/// let mut ema = Ema::new(3);
/// for (t, price) in [(1, 2), (2, 4), (3, 6)] {
///     ema.process_scalar(Decimal::from(price), t, true);
/// }
/// // Seed = (2 + 4 + 6) / 3 = 4; next: 8 × 0.5 + 4 × 0.5 = 6
/// let out = ema.process_scalar(Decimal::from(8), 4, true);
/// assert_eq!(out.to_decimal(), Decimal::from(6));
/// ```
pub struct Ema {
    core: IndicatorCore,
    seed: WindowCore,
    field: CandleField,
    alpha: Decimal,
    divisor: Decimal,
    prev: Option<Decimal>,
}

impl Ema {
    /// EMA over `length` samples of the closing price.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self::with_field(length, CandleField::Close)
    }

    /// EMA over `length` projections of `field`.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn with_field(length: usize, field: CandleField) -> Self {
        Self {
            core: IndicatorCore::new("EMA"),
            seed: WindowCore::with_sum(length),
            field,
            alpha: Self::alpha_for(length),
            divisor: Decimal::from(length),
            prev: None,
        }
    }

    fn alpha_for(length: usize) -> Decimal {
        Decimal::TWO / Decimal::from(length + 1)
    }

    /// The configured period.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.seed.length()
    }

    /// Replaces the period and resets.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::InvalidLength`] when `length` is zero; state is
    /// untouched.
    pub fn set_length(&mut self, length: usize) -> Result<(), IndicatorError> {
        self.seed.set_length(length)?;
        self.alpha = Self::alpha_for(length);
        self.divisor = Decimal::from(length);
        self.reset();
        Ok(())
    }

    /// The configured candle projection.
    #[inline]
    #[must_use]
    pub fn field(&self) -> CandleField {
        self.field
    }

    /// Replaces the candle projection and resets.
    pub fn set_field(&mut self, field: CandleField) {
        self.field = field;
        self.reset();
    }

    fn next_value(&self, prev: Decimal, value: Decimal) -> Decimal {
        self.alpha * value + (Decimal::ONE - self.alpha) * prev
    }
}

impl Indicator for Ema {
    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IndicatorCore {
        &mut self.core
    }

    fn num_values_to_initialize(&self) -> usize {
        self.seed.length()
    }

    fn calc(&mut self, input: &IndicatorValue) -> IndicatorValue {
        let value = input.to_decimal_with(self.field);

        if input.is_final() {
            let next = if let Some(prev) = self.prev {
                self.next_value(prev, value)
            } else {
                self.seed.window_mut().push_stat(value);
                if !self.seed.is_full() {
                    return IndicatorValue::empty(self.id(), input.time());
                }
                let seeded = self.seed.window().sum() / self.divisor;
                // The seed window is done once the recursion takes over.
                self.seed.clear();
                seeded
            };
            self.prev = Some(next);
            IndicatorValue::scalar(self.id(), next, input.time())
        } else {
            match self.prev {
                Some(prev) => {
                    IndicatorValue::scalar(self.id(), self.next_value(prev, value), input.time())
                }
                None => IndicatorValue::empty(self.id(), input.time()),
            }
        }
    }

    fn calc_is_formed(&self) -> bool {
        self.prev.is_some()
    }

    fn clear_state(&mut self) {
        self.seed.clear();
        self.prev = None;
    }

    fn save(&self, settings: &mut Settings) {
        settings.put("length", &self.length());
        settings.put("field", &self.field);
    }

    fn load(&mut self, settings: &Settings) -> Result<(), IndicatorError> {
        let length: usize = settings.get("length")?;
        let field: CandleField = settings.get("field")?;
        self.seed.set_length(length)?;
        self.alpha = Self::alpha_for(length);
        self.divisor = Decimal::from(length);
        self.field = field;
        self.reset();
        Ok(())
    }
}

impl Display for Ema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EMA({}, {})", self.length(), self.field)
    }
}
