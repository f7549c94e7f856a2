//! Decimals-aware interval arithmetic over reported numeric values.

use crate::model::Fact;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Places shown by [`format_interval`] when decimals are infinite or unknown.
pub const DEFAULT_DISPLAY_DECIMALS: u32 = 4;

/// `Decimal` carries at most 28 fractional digits; anything finer is exact.
const MAX_SCALE: i32 = 28;

/// Rounding accuracy implied by a fact's `decimals` or `precision`.
///
/// Ordered from least to most accurate, so `max` picks the most precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum InferredDecimals {
    Unknown,
    Finite(i32),
    Infinite,
}

impl InferredDecimals {
    pub fn display_places(&self) -> u32 {
        match self {
            InferredDecimals::Finite(d) => (*d).max(0) as u32,
            _ => DEFAULT_DISPLAY_DECIMALS,
        }
    }
}

impl fmt::Display for InferredDecimals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredDecimals::Unknown => f.write_str("unknown"),
            InferredDecimals::Finite(d) => write!(f, "{}", d),
            InferredDecimals::Infinite => f.write_str("INF"),
        }
    }
}

pub fn parse_decimal(lexical: &str) -> Option<Decimal> {
    let trimmed = lexical.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

pub fn parse_value(fact: &Fact) -> Option<Decimal> {
    fact.value.as_deref().and_then(parse_decimal)
}

/// `floor(log10(|v|))` for a non-zero value.
fn magnitude(value: Decimal) -> i32 {
    let abs = value.abs();
    if abs >= Decimal::ONE {
        let digits = abs.trunc().normalize().to_string().len() as i32;
        return digits - 1;
    }
    let mut exponent = 0;
    let mut scaled = abs;
    while scaled < Decimal::ONE && exponent > -MAX_SCALE - 1 {
        scaled *= Decimal::TEN;
        exponent -= 1;
    }
    exponent
}

/// Decimals implied by a fact: `INF` in either attribute is infinite, precision
/// is converted through the magnitude of the value, otherwise `decimals` is
/// parsed as an integer.
pub fn inferred_decimals(fact: &Fact) -> InferredDecimals {
    let decimals = fact.decimals.as_deref().map(str::trim);
    let precision = fact.precision.as_deref().map(str::trim);
    if decimals == Some("INF") || precision == Some("INF") {
        return InferredDecimals::Infinite;
    }

    if let Some(p) = precision.filter(|p| !p.is_empty()) {
        let Ok(p) = p.parse::<i32>() else {
            return InferredDecimals::Unknown;
        };
        if p <= 0 {
            return InferredDecimals::Unknown;
        }
        return match parse_value(fact) {
            Some(v) if v.is_zero() => InferredDecimals::Infinite,
            Some(v) => match p.checked_sub(magnitude(v) + 1) {
                Some(d) if d < MAX_SCALE => InferredDecimals::Finite(d),
                _ => InferredDecimals::Infinite,
            },
            None => InferredDecimals::Unknown,
        };
    }

    match decimals.filter(|d| !d.is_empty()).map(str::parse::<i32>) {
        Some(Ok(d)) if d >= MAX_SCALE => InferredDecimals::Infinite,
        Some(Ok(d)) => InferredDecimals::Finite(d),
        _ => InferredDecimals::Unknown,
    }
}

/// Closed or half-open range of possible true values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub low: Decimal,
    pub high: Decimal,
    pub low_inclusive: bool,
    pub high_inclusive: bool,
}

impl Interval {
    pub fn exact(value: Decimal) -> Self {
        Self::closed(value, value)
    }

    pub fn closed(low: Decimal, high: Decimal) -> Self {
        Self {
            low,
            high,
            low_inclusive: true,
            high_inclusive: true,
        }
    }

    pub fn zero() -> Self {
        Self::exact(Decimal::ZERO)
    }

    fn below(&self, other: &Interval) -> bool {
        self.high < other.low
            || (self.high == other.low && !(self.high_inclusive && other.low_inclusive))
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        !self.below(other) && !other.below(self)
    }

    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        if !self.overlaps(other) {
            return None;
        }
        let (low, low_inclusive) = if self.low > other.low {
            (self.low, self.low_inclusive)
        } else if other.low > self.low {
            (other.low, other.low_inclusive)
        } else {
            (self.low, self.low_inclusive && other.low_inclusive)
        };
        let (high, high_inclusive) = if self.high < other.high {
            (self.high, self.high_inclusive)
        } else if other.high < self.high {
            (other.high, other.high_inclusive)
        } else {
            (self.high, self.high_inclusive && other.high_inclusive)
        };
        Some(Interval {
            low,
            high,
            low_inclusive,
            high_inclusive,
        })
    }

    /// `weight × self`; a negative weight swaps the bounds.
    pub fn scale(&self, weight: Decimal) -> Interval {
        let a = self.low.saturating_mul(weight);
        let b = self.high.saturating_mul(weight);
        if weight.is_sign_negative() && !weight.is_zero() {
            Interval {
                low: b,
                high: a,
                low_inclusive: self.high_inclusive,
                high_inclusive: self.low_inclusive,
            }
        } else {
            Interval {
                low: a,
                high: b,
                ..*self
            }
        }
    }

    pub fn add(&self, other: &Interval) -> Interval {
        Interval {
            low: self.low.saturating_add(other.low),
            high: self.high.saturating_add(other.high),
            low_inclusive: self.low_inclusive && other.low_inclusive,
            high_inclusive: self.high_inclusive && other.high_inclusive,
        }
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        Interval {
            low: self.low.saturating_sub(other.high),
            high: self.high.saturating_sub(other.low),
            low_inclusive: self.low_inclusive && other.high_inclusive,
            high_inclusive: self.high_inclusive && other.low_inclusive,
        }
    }
}

/// Half of one unit in the last reported place: `0.5 × 10^-d`.
fn half_unit(d: i32) -> Option<Decimal> {
    if d >= MAX_SCALE {
        return Some(Decimal::ZERO);
    }
    if d >= -1 {
        return Some(Decimal::new(5, (d + 1) as u32));
    }
    // below 10^28 the half unit no longer fits a Decimal
    if d < -MAX_SCALE {
        return None;
    }
    let exponent = (-d - 1) as u32;
    Some(Decimal::from_i128_with_scale(5 * 10i128.pow(exponent), 0))
}

/// Range of true values implied by `value` reported to `decimals`.
/// Bounds are inclusive; infinite or unknown decimals give the exact value.
pub fn range_value(value: Decimal, decimals: InferredDecimals) -> Interval {
    match decimals {
        InferredDecimals::Finite(d) => match half_unit(d) {
            Some(half) => Interval::closed(value.saturating_sub(half), value.saturating_add(half)),
            None => Interval::closed(Decimal::MIN, Decimal::MAX),
        },
        InferredDecimals::Infinite | InferredDecimals::Unknown => Interval::exact(value),
    }
}

/// A value bound to a calculation tree node: a reported nil or a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoundValue {
    Nil,
    Range(Interval),
}

impl BoundValue {
    pub fn zero() -> Self {
        BoundValue::Range(Interval::zero())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, BoundValue::Nil)
    }

    pub fn interval(&self) -> Option<&Interval> {
        match self {
            BoundValue::Range(interval) => Some(interval),
            BoundValue::Nil => None,
        }
    }

    /// `self + weight × term`. Nil on either side makes the result nil.
    pub fn add_weighted(&self, weight: Decimal, term: &BoundValue) -> BoundValue {
        match (self, term) {
            (BoundValue::Range(acc), BoundValue::Range(t)) => {
                BoundValue::Range(acc.add(&t.scale(weight)))
            }
            _ => BoundValue::Nil,
        }
    }

    pub fn sub(&self, other: &BoundValue) -> BoundValue {
        match (self, other) {
            (BoundValue::Range(a), BoundValue::Range(b)) => BoundValue::Range(a.sub(b)),
            _ => BoundValue::Nil,
        }
    }
}

/// `Σ weight × term`, nil if any term is nil.
pub fn weighted_sum<'a>(terms: impl IntoIterator<Item = (Decimal, &'a BoundValue)>) -> BoundValue {
    terms
        .into_iter()
        .fold(BoundValue::zero(), |acc, (weight, term)| {
            acc.add_weighted(weight, term)
        })
}

/// Bound value of a fact at its inferred decimals; `None` when a non-nil
/// value is not a number.
pub fn fact_value(fact: &Fact) -> Option<BoundValue> {
    if fact.is_nil() {
        return Some(BoundValue::Nil);
    }
    parse_value(fact).map(|v| BoundValue::Range(range_value(v, inferred_decimals(fact))))
}

/// Two reported values are consistent when both are nil or their ranges overlap.
pub fn is_consistent(a: &BoundValue, b: &BoundValue) -> bool {
    match (a, b) {
        (BoundValue::Nil, BoundValue::Nil) => true,
        (BoundValue::Range(x), BoundValue::Range(y)) => x.overlaps(y),
        _ => false,
    }
}

/// A group of duplicates is consistent when all agree on nil-ness and their
/// ranges share at least one point.
pub fn duplicates_consistent(values: &[BoundValue]) -> bool {
    let Some(first) = values.first() else {
        return true;
    };
    if values.iter().any(BoundValue::is_nil) {
        return values.iter().all(BoundValue::is_nil);
    }
    let mut common = match first {
        BoundValue::Range(interval) => *interval,
        BoundValue::Nil => return false,
    };
    for value in &values[1..] {
        let Some(interval) = value.interval() else {
            return false;
        };
        match common.intersect(interval) {
            Some(intersection) => common = intersection,
            None => return false,
        }
    }
    true
}

fn format_number(value: Decimal, places: u32) -> String {
    value.round_dp(places).to_string()
}

/// Renders a reported or computed value for messages: a single number when
/// the bounds coincide at the display precision, otherwise `[low, high]`.
pub fn format_interval(low: Decimal, high: Decimal, decimals: InferredDecimals) -> String {
    let places = decimals.display_places();
    let low = format_number(low, places);
    let high = format_number(high, places);
    if low == high {
        return low;
    }
    format!("[{}, {}]", low, high)
}

pub fn format_bound_value(value: &BoundValue, decimals: InferredDecimals) -> String {
    match value {
        BoundValue::Nil => "nil".to_string(),
        BoundValue::Range(interval) => format_interval(interval.low, interval.high, decimals),
    }
}
