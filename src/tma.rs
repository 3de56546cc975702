use std::fmt::Display;

use crate::{
    ComplexIndicator, Indicator, IndicatorCore, IndicatorError, IndicatorValue, ResetScope,
    Settings, Sma,
};

/// Triangular Moving Average.
///
/// A double-smoothed SMA: a base SMA feeds a second SMA, composed as a
/// sequential chain. With period `n`, the base runs over `⌈n / 2⌉`
/// samples and the smoother over `⌊n / 2⌋ + 1` of the base's outputs —
/// the classical triangular weighting.
///
/// The second link only starts consuming once the base is formed, so
/// the whole indicator needs `⌈n / 2⌉ + ⌊n / 2⌋` final samples.
pub struct Tma {
    inner: ComplexIndicator,
    length: usize,
}

impl Tma {
    /// TMA with period `length`.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn new(length: usize) -> Self {
        assert!(length >= 1, "length must be at least 1");
        Self {
            inner: ComplexIndicator::sequence("TMA", Self::children(length)),
            length,
        }
    }

    fn children(length: usize) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Sma::new(length.div_ceil(2))),
            Box::new(Sma::new(length / 2 + 1)),
        ]
    }

    /// The configured period.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Replaces the period, rebuilding both links and resetting.
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

    /// The base SMA link.
    #[must_use]
    pub fn base(&self) -> &dyn Indicator {
        self.inner.child(0)
    }

    /// The smoothing SMA link.
    #[must_use]
    pub fn smoothing(&self) -> &dyn Indicator {
        self.inner.child(1)
    }
}

impl Indicator for Tma {
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

impl Display for Tma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TMA({})", self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::scalars;
    use rust_decimal_macros::dec;

    #[test]
    fn link_lengths_follow_triangular_weighting() {
        let tma = Tma::new(5);
        // base ⌈5/2⌉ = 3, smoother ⌊5/2⌋ + 1 = 3, overlap of one
        assert_eq!(tma.num_values_to_initialize(), 5);

        let tma = Tma::new(4);
        // base 2, smoother 3
        assert_eq!(tma.num_values_to_initialize(), 4);
    }

    #[test]
    fn smooths_the_base_series() {
        // TMA(3): base SMA(2), smoother SMA(2).
        // Base outputs: 15, 25, 35; smoother: (15+25)/2 = 20, (25+35)/2 = 30.
        let mut tma = Tma::new(3);
        scalars(&mut tma, &[10, 20, 30]);
        assert!(tma.is_formed());

        let out = tma.process_scalar(dec!(40), 4, true);
        assert_eq!(out.inner(tma.smoothing().id()).to_decimal(), dec!(30));
        assert_eq!(out.inner(tma.base().id()).to_decimal(), dec!(35));
    }

    #[test]
    fn unformed_until_both_links_fill() {
        let mut tma = Tma::new(3);
        scalars(&mut tma, &[10, 20]);
        assert!(tma.base().is_formed());
        assert!(!tma.smoothing().is_formed());
        assert!(!tma.is_formed());
    }

    #[test]
    fn set_length_rebuilds_and_resets() {
        let mut tma = Tma::new(3);
        scalars(&mut tma, &[10, 20, 30]);
        assert!(tma.is_formed());

        tma.set_length(5).unwrap();
        assert_eq!(tma.length(), 5);
        assert!(!tma.is_formed());
        assert!(tma.history().is_empty());
    }

    #[test]
    fn zero_length_is_rejected() {
        let mut tma = Tma::new(3);
        assert_eq!(tma.set_length(0), Err(IndicatorError::InvalidLength(0)));
        assert_eq!(tma.length(), 3);
    }

    #[test]
    fn round_trips_length() {
        let tma = Tma::new(7);
        let mut settings = Settings::new();
        tma.save(&mut settings);

        let mut restored = Tma::new(2);
        restored.load(&settings).unwrap();
        assert_eq!(restored.length(), 7);
    }

    #[test]
    fn displays_period() {
        assert_eq!(Tma::new(7).to_string(), "TMA(7)");
    }
}
