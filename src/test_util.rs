// src/test_util.rs

use rust_decimal::Decimal;

use crate::{Candle, Indicator, Timestamp};

/// Candle from integer OHLC parts, volume zero.
pub fn candle(open: i64, high: i64, low: i64, close: i64, time: Timestamp) -> Candle {
    Candle::new(open.into(), high.into(), low.into(), close.into(), time)
}

/// Feeds `values` as final scalar samples at times 1, 2, 3, …
pub fn scalars(indicator: &mut impl Indicator, values: &[i64]) {
    for (i, &value) in values.iter().enumerate() {
        let time = u64::try_from(i).expect("test feed fits in u64") + 1;
        indicator.process_scalar(Decimal::from(value), time, true);
    }
}
