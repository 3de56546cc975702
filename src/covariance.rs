use rust_decimal::Decimal;

use std::fmt::Display;

use crate::ring::RingBuffer;
use crate::{Indicator, IndicatorCore, IndicatorError, IndicatorValue, Settings};

/// Rolling covariance of two series.
///
/// Consumes pair inputs (see
/// [`process_pair`](crate::Indicator::process_pair)) and computes the
/// population covariance over the last `length` committed pairs:
///
/// ```text
/// cov(a, b) = E[ab] − E[a] × E[b]
/// ```
///
/// A preview pair is evaluated over the window with its oldest pair
/// rotated out and the candidate appended, committing nothing.
pub struct Covariance {
    core: IndicatorCore,
    window: RingBuffer<(Decimal, Decimal)>,
    divisor: Decimal,
}

impl Covariance {
    /// Covariance over `length` pairs.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn new(length: usize) -> Self {
        assert!(length >= 1, "length must be at least 1");
        Self {
            core: IndicatorCore::new("Covariance"),
            window: RingBuffer::new(length),
            divisor: Decimal::from(length),
        }
    }

    /// The configured period.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.window.capacity()
    }

    /// Replaces the period and resets.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::InvalidLength`] when `length` is zero; state is
    /// untouched.
    pub fn set_length(&mut self, length: usize) -> Result<(), IndicatorError> {
        if length == 0 {
            return Err(IndicatorError::InvalidLength(length));
        }
        self.window.set_capacity(length);
        self.divisor = Decimal::from(length);
        self.reset();
        Ok(())
    }

    fn covariance(&self, pairs: impl Iterator<Item = (Decimal, Decimal)>) -> Decimal {
        let mut sum_a = Decimal::ZERO;
        let mut sum_b = Decimal::ZERO;
        let mut sum_ab = Decimal::ZERO;
        for (a, b) in pairs {
            sum_a += a;
            sum_b += b;
            sum_ab += a * b;
        }
        sum_ab / self.divisor - (sum_a / self.divisor) * (sum_b / self.divisor)
    }
}

impl Indicator for Covariance {
    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IndicatorCore {
        &mut self.core
    }

    fn num_values_to_initialize(&self) -> usize {
        self.window.capacity()
    }

    fn calc(&mut self, input: &IndicatorValue) -> IndicatorValue {
        let pair = input.to_pair();

        let cov = if input.is_final() {
            self.window.push(pair);
            if !self.window.is_full() {
                return IndicatorValue::empty(self.id(), input.time());
            }
            self.covariance(self.window.iter().copied())
        } else {
            if !self.window.is_full() {
                return IndicatorValue::empty(self.id(), input.time());
            }
            let rotated = self.window.iter().copied().skip(1);
            self.covariance(rotated.chain(std::iter::once(pair)))
        };

        IndicatorValue::scalar(self.id(), cov, input.time())
    }

    fn calc_is_formed(&self) -> bool {
        self.window.is_full()
    }

    fn clear_state(&mut self) {
        self.window.clear();
    }

    fn save(&self, settings: &mut Settings) {
        settings.put("length", &self.length());
    }

    fn load(&mut self, settings: &Settings) -> Result<(), IndicatorError> {
        let length: usize = settings.get("length")?;
        self.set_length(length)
    }
}

impl Display for Covariance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Covariance({})", self.length())
    }
}
