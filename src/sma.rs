use rust_decimal::Decimal;

use std::fmt::Display;

use crate::window::WindowCore;
use crate::{
    CandleField, Indicator, IndicatorCore, IndicatorError, IndicatorValue, Settings,
};

/// Simple Moving Average.
///
/// Unweighted mean of the last `length` committed samples, maintained
/// with a running sum for O(1) updates per final sample. A preview
/// sample answers "what would the mean be if this committed next":
/// the sum overlay rotates the oldest committed element out and the
/// candidate in, without persisting either.
///
/// Candle inputs project the configured [`CandleField`]; scalar inputs
/// are used as-is.
///
/// # Example
///
/// ```
/// use tideflow_ta::{Indicator, Sma};
/// use rust_decimal::Decimal;
///
/// let mut sma = Sma::new(3);
/// for (t, price) in [(1, 10), (2, 20), (3, 30)] {
///     sma.process_scalar(Decimal::from(price), t, true);
/// }
/// assert_eq!(sma.history().current().unwrap().to_decimal(), Decimal::from(20));
/// ```
pub struct Sma {
    core: IndicatorCore,
    win: WindowCore,
    field: CandleField,
    divisor: Decimal,
}

impl Sma {
    /// SMA over `length` samples of the closing price.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self::with_field(length, CandleField::Close)
    }

    /// SMA over `length` projections of `field`.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn with_field(length: usize, field: CandleField) -> Self {
        Self {
            core: IndicatorCore::new("SMA"),
            win: WindowCore::with_sum(length),
            field,
            divisor: Decimal::from(length),
        }
    }

    /// The configured period.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.win.length()
    }

    /// Replaces the period and resets.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::InvalidLength`] when `length` is zero; state is
    /// untouched.
    pub fn set_length(&mut self, length: usize) -> Result<(), IndicatorError> {
        self.win.set_length(length)?;
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
}

impl Indicator for Sma {
    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IndicatorCore {
        &mut self.core
    }

    fn num_values_to_initialize(&self) -> usize {
        self.win.length()
    }

    fn calc(&mut self, input: &IndicatorValue) -> IndicatorValue {
        let value = input.to_decimal_with(self.field);

        let sum = if input.is_final() {
            self.win.window_mut().push_stat(value);
            if !self.win.is_full() {
                return IndicatorValue::empty(self.id(), input.time());
            }
            self.win.window().sum()
        } else {
            if !self.win.is_full() {
                return IndicatorValue::empty(self.id(), input.time());
            }
            self.win.window().preview_sum(value)
        };

        IndicatorValue::scalar(self.id(), sum / self.divisor, input.time())
    }

    fn calc_is_formed(&self) -> bool {
        self.win.is_full()
    }

    fn clear_state(&mut self) {
        self.win.clear();
    }

    fn save(&self, settings: &mut Settings) {
        settings.put("length", &self.length());
        settings.put("field", &self.field);
    }

    fn load(&mut self, settings: &Settings) -> Result<(), IndicatorError> {
        let length: usize = settings.get("length")?;
        let field: CandleField = settings.get("field")?;
        self.win.set_length(length)?;
        self.divisor = Decimal::from(length);
        self.field = field;
        self.reset();
        Ok(())
    }
}

impl Display for Sma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMA({}, {})", self.length(), self.field)
    }
}
