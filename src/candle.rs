use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use std::fmt::Display;

/// Bar open timestamp or sequence number.
///
/// The engine only compares timestamps for ordering inside result
/// values; any monotonically assigned unit (epoch seconds, bar index)
/// works.
pub type Timestamp = u64;

/// An OHLCV bar.
///
/// Owned value type: indicator values that carry a candle payload store
/// a copy, so the bar must be cheap to duplicate (`Decimal` is `Copy`).
///
/// # Example
///
/// ```
/// use tideflow_ta::{Candle, CandleField};
/// use rust_decimal::Decimal;
///
/// let candle = Candle::new(
///     Decimal::from(10),
///     Decimal::from(30),
///     Decimal::from(5),
///     Decimal::from(20),
///     7,
/// );
/// assert_eq!(CandleField::Close.project(&candle), Decimal::from(20));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Candle {
    /// Opening price of the bar.
    pub open: Decimal,
    /// Highest price during the bar.
    pub high: Decimal,
    /// Lowest price during the bar.
    pub low: Decimal,
    /// Closing (or latest) price of the bar.
    pub close: Decimal,
    /// Trade volume during the bar.
    pub volume: Decimal,
    /// Bar open timestamp or sequence number.
    pub time: Timestamp,
}

impl Candle {
    /// Candle without volume.
    #[must_use]
    pub fn new(open: Decimal, high: Decimal, low: Decimal, close: Decimal, time: Timestamp) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume: Decimal::ZERO,
            time,
        }
    }

    /// Sets the volume.
    #[must_use]
    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = volume;
        self
    }
}

impl Display for Candle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Candle(o: {}, h: {}, l: {}, c: {} @ {})",
            self.open, self.high, self.low, self.close, self.time
        )
    }
}

/// Scalar projection from a [`Candle`].
///
/// Indicators that consume candles are configured with a `CandleField`
/// that determines which value (or derived value) to compute on. The
/// projection is pure: it reads a single bar and keeps no state.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug, Serialize, Deserialize)]
pub enum CandleField {
    /// Opening price.
    Open,
    /// Highest price.
    High,
    /// Lowest price.
    Low,
    /// Closing price.
    #[default]
    Close,
    /// Median price: `(high + low) / 2`.
    HL2,
    /// Typical price: `(high + low + close) / 3`.
    HLC3,
    /// Average price: `(open + high + low + close) / 4`.
    OHLC4,
    /// Weighted close: `(high + low + close + close) / 4`.
    HLCC4,
    /// Trade volume.
    Volume,
}

impl Display for CandleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl CandleField {
    /// Extracts the configured scalar from a candle.
    #[inline]
    #[must_use]
    pub fn project(self, candle: &Candle) -> Decimal {
        match self {
            Self::Open => candle.open,
            Self::High => candle.high,
            Self::Low => candle.low,
            Self::Close => candle.close,
            Self::HL2 => (candle.high + candle.low) / Decimal::TWO,
            Self::HLC3 => (candle.high + candle.low + candle.close) / Decimal::from(3),
            Self::OHLC4 => {
                (candle.open + candle.high + candle.low + candle.close) / Decimal::from(4)
            }
            Self::HLCC4 => {
                (candle.high + candle.low + candle.close + candle.close) / Decimal::from(4)
            }
            Self::Volume => candle.volume,
        }
    }
}
