//! Dual-mode streaming indicator engine for Rust.
//!
//! Indicators consume one sample at a time and keep just enough state
//! to avoid recomputing from full history. Every sample is either
//! *final* — committed to the indicator's state — or a *preview*: a
//! "what would the output be if this committed next" query that must
//! leave committed state untouched. That lets a still-forming bar be
//! displayed and chained through dependent computations without
//! corrupting the series.
//!
//! The building blocks:
//!
//! - [`Indicator`] — the lifecycle contract: identity, naming,
//!   [`process`](Indicator::process), [`reset`](Indicator::reset),
//!   formation tracking, change/reset notifications, history.
//! - [`IndicatorValue`] — tagged input/result values with formation
//!   and finality flags plus a provenance link to their input.
//! - [`RingBuffer`] / [`StatWindow`] — rolling windows with O(1)
//!   amortized sum/max/min maintenance and non-mutating preview
//!   overlays.
//! - [`ComplexIndicator`] — composite trees evaluated in parallel or
//!   in sequence, producing tree-shaped results.
//! - [`IndicatorManager`] — registers (indicator, source) pairs with
//!   reference-counted deduplication, fans out pushed samples, and
//!   replays buffered history into late registrations.
//!
//! A small set of indicators ([`Sma`], [`Ema`], [`Highest`],
//! [`Lowest`], [`Tma`], [`PriceChannel`], [`Covariance`]) exercises
//! every engine contract and serves as the template for new ones.
//!
//! # Example
//!
//! ```
//! use tideflow_ta::{Indicator, Sma};
//! use rust_decimal::Decimal;
//!
//! let mut sma = Sma::new(3);
//! for (t, price) in [(1, 10), (2, 20), (3, 30)] {
//!     sma.process_scalar(Decimal::from(price), t, true);
//! }
//!
//! // A live, still-forming sample: preview without committing.
//! let preview = sma.process_scalar(Decimal::from(60), 4, false);
//! assert_eq!(preview.to_decimal(), Decimal::from(110) / Decimal::from(3));
//!
//! // The bar closes at a different price; committed state never saw
//! // the preview.
//! let closed = sma.process_scalar(Decimal::from(45), 4, true);
//! assert_eq!(closed.to_decimal(), Decimal::from(95) / Decimal::from(3));
//! ```

mod candle;
mod complex;
mod covariance;
mod ema;
mod error;
mod extremes;
mod history;
mod indicator;
mod manager;
mod price_channel;
mod ring;
mod settings;
mod sma;
mod tma;
mod value;
mod window;

pub use crate::candle::{Candle, CandleField, Timestamp};
pub use crate::complex::{ComplexIndicator, ComplexMode};
pub use crate::error::IndicatorError;
pub use crate::history::{History, DEFAULT_HISTORY_CAPACITY};
pub use crate::indicator::{
    Indicator, IndicatorCore, IndicatorId, ListenerId, ResetScope,
};
pub use crate::manager::{
    BatchGuard, IndicatorManager, RegistrationToken, Sample, SharedIndicator, SourceKey,
};
pub use crate::ring::{RingBuffer, StatWindow};
pub use crate::settings::Settings;
pub use crate::value::{IndicatorValue, Payload};
pub use crate::window::WindowCore;

pub use crate::covariance::Covariance;
pub use crate::ema::Ema;
pub use crate::extremes::{Highest, Lowest};
pub use crate::price_channel::PriceChannel;
pub use crate::sma::Sma;
pub use crate::tma::Tma;

#[cfg(test)]
mod test_util;
