use rust_decimal::Decimal;

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::{Candle, CandleField, IndicatorId, Timestamp};

/// The data carried by an [`IndicatorValue`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// No data; produced during warm-up or from an empty input.
    Empty,
    /// A single scalar.
    Scalar(Decimal),
    /// A full bar; scalars are projected lazily via [`CandleField`].
    Candle(Candle),
    /// Two related scalars (covariance-style inputs).
    Pair(Decimal, Decimal),
    /// Child results of a composite indicator, keyed by child identity.
    Complex(BTreeMap<IndicatorId, IndicatorValue>),
}

/// Input to — and result of — an indicator computation.
///
/// Every value knows its owning indicator, whether the producer was
/// formed when the value was created, and whether the originating
/// sample was final. Results additionally link back to the input that
/// produced them, so provenance can be walked across composed
/// pipelines.
///
/// Values are preview by default; [`into_final`](Self::into_final)
/// marks the one committed value per point in time. The flag is stamped
/// once and never changes afterwards.
///
/// # Example
///
/// ```
/// use tideflow_ta::{Indicator, Sma};
/// use rust_decimal::Decimal;
///
/// let mut sma = Sma::new(2);
/// sma.process_scalar(Decimal::from(10), 1, true);
/// let out = sma.process_scalar(Decimal::from(20), 2, true);
///
/// assert!(out.is_final());
/// assert_eq!(out.to_decimal(), Decimal::from(15));
/// assert_eq!(out.input().unwrap().to_decimal(), Decimal::from(20));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorValue {
    indicator: IndicatorId,
    time: Timestamp,
    payload: Payload,
    is_formed: bool,
    is_final: bool,
    input: Option<Box<IndicatorValue>>,
}

impl IndicatorValue {
    fn new(indicator: IndicatorId, time: Timestamp, payload: Payload) -> Self {
        Self {
            indicator,
            time,
            payload,
            is_formed: false,
            is_final: false,
            input: None,
        }
    }

    /// Preview scalar value owned by `indicator`.
    #[must_use]
    pub fn scalar(indicator: IndicatorId, value: Decimal, time: Timestamp) -> Self {
        Self::new(indicator, time, Payload::Scalar(value))
    }

    /// Preview candle value owned by `indicator`; time is the bar's.
    #[must_use]
    pub fn candle(indicator: IndicatorId, candle: Candle) -> Self {
        Self::new(indicator, candle.time, Payload::Candle(candle))
    }

    /// Preview pair value owned by `indicator`.
    #[must_use]
    pub fn pair(indicator: IndicatorId, first: Decimal, second: Decimal, time: Timestamp) -> Self {
        Self::new(indicator, time, Payload::Pair(first, second))
    }

    /// Value with no payload.
    #[must_use]
    pub fn empty(indicator: IndicatorId, time: Timestamp) -> Self {
        Self::new(indicator, time, Payload::Empty)
    }

    pub(crate) fn complex(indicator: IndicatorId, time: Timestamp) -> Self {
        Self::new(indicator, time, Payload::Complex(BTreeMap::new()))
    }

    /// Marks the value as final: committed to the producing indicator's
    /// state at this point in time.
    #[must_use]
    pub fn into_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// The indicator this value belongs to.
    #[inline]
    #[must_use]
    pub fn indicator(&self) -> IndicatorId {
        self.indicator
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> Timestamp {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether the value carries no payload.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.payload, Payload::Empty)
    }

    /// Finality of the sample this value originated from.
    #[inline]
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Formation state of the producer, snapshot at creation.
    #[inline]
    #[must_use]
    pub fn is_formed(&self) -> bool {
        self.is_formed
    }

    /// The input this result was computed from, when it is a result.
    #[inline]
    #[must_use]
    pub fn input(&self) -> Option<&IndicatorValue> {
        self.input.as_deref()
    }

    /// The scalar payload; candles project their closing price.
    ///
    /// # Panics
    ///
    /// Panics when the value is empty or carries a pair or composite
    /// payload — reading those as one scalar is a caller bug.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        self.to_decimal_with(CandleField::Close)
    }

    /// The scalar payload; candles project the requested field.
    ///
    /// # Panics
    ///
    /// Panics when the value is empty or carries a pair or composite
    /// payload.
    #[must_use]
    pub fn to_decimal_with(&self, field: CandleField) -> Decimal {
        match &self.payload {
            Payload::Scalar(value) => *value,
            Payload::Candle(candle) => field.project(candle),
            Payload::Empty => panic!("an empty indicator value has no payload to read"),
            Payload::Pair(..) => panic!("a pair value has no single scalar; use to_pair"),
            Payload::Complex(_) => {
                panic!("a composite value has no single scalar; look up a child value")
            }
        }
    }

    /// The pair payload.
    ///
    /// # Panics
    ///
    /// Panics when the payload is not a pair.
    #[must_use]
    pub fn to_pair(&self) -> (Decimal, Decimal) {
        match &self.payload {
            Payload::Pair(first, second) => (*first, *second),
            Payload::Empty => panic!("an empty indicator value has no payload to read"),
            other => panic!("expected a pair payload, found {other:?}"),
        }
    }

    /// The candle payload.
    ///
    /// # Panics
    ///
    /// Panics when the payload is not a candle.
    #[must_use]
    pub fn to_candle(&self) -> &Candle {
        match &self.payload {
            Payload::Candle(candle) => candle,
            Payload::Empty => panic!("an empty indicator value has no payload to read"),
            other => panic!("expected a candle payload, found {other:?}"),
        }
    }

    /// Looks up a child result inside a composite payload.
    #[must_use]
    pub fn get(&self, child: IndicatorId) -> Option<&IndicatorValue> {
        match &self.payload {
            Payload::Complex(inner) => inner.get(&child),
            _ => None,
        }
    }

    /// Child result inside a composite payload.
    ///
    /// # Panics
    ///
    /// Panics when the payload is not composite or the child produced
    /// no value this cycle.
    #[must_use]
    pub fn inner(&self, child: IndicatorId) -> &IndicatorValue {
        self.get(child)
            .unwrap_or_else(|| panic!("no inner value for indicator {child}"))
    }

    pub(crate) fn stamp_final(&mut self, is_final: bool) {
        self.is_final = is_final;
    }

    pub(crate) fn stamp_formed(&mut self, is_formed: bool) {
        self.is_formed = is_formed;
    }

    pub(crate) fn link_input(&mut self, input: IndicatorValue) {
        self.input = Some(Box::new(input));
    }

    pub(crate) fn insert_inner(&mut self, child: IndicatorId, value: IndicatorValue) {
        match &mut self.payload {
            Payload::Complex(inner) => {
                inner.insert(child, value);
            }
            _ => panic!("inner values can only be added to a composite payload"),
        }
    }
}

impl Display for IndicatorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.payload {
            Payload::Empty => write!(f, "Empty"),
            Payload::Scalar(value) => write!(f, "{value}"),
            Payload::Candle(candle) => write!(f, "{candle}"),
            Payload::Pair(first, second) => write!(f, "({first}, {second})"),
            Payload::Complex(inner) => {
                write!(f, "{{")?;
                for (i, (id, value)) in inner.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{id}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
