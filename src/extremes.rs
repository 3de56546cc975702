use std::fmt::Display;

use crate::window::WindowCore;
use crate::{
    CandleField, Indicator, IndicatorCore, IndicatorError, IndicatorValue, Settings,
};

/// Highest value over the window.
///
/// Tracks the running maximum incrementally; evicting the tracked
/// maximum itself triggers one rescan of the window, every other push
/// is O(1). Candle inputs default to the bar's high.
pub struct Highest {
    core: IndicatorCore,
    win: WindowCore,
    field: CandleField,
}

/// Lowest value over the window.
///
/// Mirror of [`Highest`] tracking the running minimum; candle inputs
/// default to the bar's low.
pub struct Lowest {
    core: IndicatorCore,
    win: WindowCore,
    field: CandleField,
}

macro_rules! impl_extreme {
    ($type:ty, $name:literal, $with:ident, $default_field:ident, $committed:ident, $preview:ident) => {
        impl $type {
            /// Extreme over `length` samples of the default field.
            ///
            /// # Panics
            ///
            /// Panics if `length` is zero.
            #[must_use]
            pub fn new(length: usize) -> Self {
                Self::with_field(length, CandleField::$default_field)
            }

            /// Extreme over `length` projections of `field`.
            ///
            /// # Panics
            ///
            /// Panics if `length` is zero.
            #[must_use]
            pub fn with_field(length: usize, field: CandleField) -> Self {
                Self {
                    core: IndicatorCore::new($name),
                    win: WindowCore::$with(length),
                    field,
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
            /// [`IndicatorError::InvalidLength`] when `length` is zero;
            /// state is untouched.
            pub fn set_length(&mut self, length: usize) -> Result<(), IndicatorError> {
                self.win.set_length(length)?;
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

        impl Indicator for $type {
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

                let extreme = if input.is_final() {
                    self.win.window_mut().push_stat(value);
                    if !self.win.is_full() {
                        return IndicatorValue::empty(self.id(), input.time());
                    }
                    self.win
                        .window()
                        .$committed()
                        .expect("a full window always has an extreme")
                } else {
                    if !self.win.is_full() {
                        return IndicatorValue::empty(self.id(), input.time());
                    }
                    self.win.window().$preview(value)
                };

                IndicatorValue::scalar(self.id(), extreme, input.time())
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
                self.field = field;
                self.reset();
                Ok(())
            }
        }

        impl Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($name, "({}, {})"), self.length(), self.field)
            }
        }
    };
}

impl_extreme!(Highest, "Highest", with_max, High, max, preview_max);
impl_extreme!(Lowest, "Lowest", with_min, Low, min, preview_min);
